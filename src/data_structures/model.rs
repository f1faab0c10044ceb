//! CPU-side geometry and material data handed to the renderer.

use std::sync::Arc;

use crate::data_structures::texture::Texture;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    /// Only back faces are drawn, used for geometry seen from the inside (sky boxes).
    Back,
    Double,
}

/// An unlit material: a colour map and the faces it applies to.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub map: Option<Arc<Texture>>,
    pub side: Side,
}

impl Material {
    pub fn basic(name: &str, map: Arc<Texture>, side: Side) -> Self {
        Self {
            name: name.to_string(),
            map: Some(map),
            side,
        }
    }

    pub fn untextured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            map: None,
            side: Side::Front,
        }
    }
}

/**
 * A range of the index buffer drawn with one material.
 *
 * Box geometry uses one group per face so that each face can carry its own
 * material.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshGroup {
    pub start: usize,
    pub count: usize,
    pub material: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub groups: Vec<MeshGroup>,
    /// Index into the owning model's material list when `groups` is empty.
    pub material: usize,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /**
     * An axis-aligned box centred on the origin, with one group per face in
     * the order +x, -x, +y, -y, +z, -z.
     */
    pub fn cuboid(name: &str, width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        // (normal, u axis, v axis) per face; u x v points along the normal
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let half = [hx, hy, hz];
        let mut mesh = Mesh {
            name: name.to_string(),
            ..Default::default()
        };
        for (face_idx, (normal, u, v)) in faces.iter().enumerate() {
            let base = mesh.positions.len() as u32;
            for (su, sv) in [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)] {
                let position = [0, 1, 2].map(|axis| {
                    (normal[axis] + su * u[axis] + sv * v[axis]) * half[axis]
                });
                mesh.positions.push(position);
                mesh.normals.push(*normal);
                mesh.tex_coords.push([(su + 1.0) / 2.0, (1.0 - sv) / 2.0]);
            }
            let start = mesh.indices.len();
            mesh.indices
                .extend_from_slice(&[base, base + 2, base + 1, base + 2, base + 3, base + 1]);
            mesh.groups.push(MeshGroup {
                start,
                count: 6,
                material: face_idx,
            });
        }
        mesh
    }
}

/// Meshes sharing one material list.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

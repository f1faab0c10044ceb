//! Binary FBX import (7.x files as exported by Mixamo).
//!
//! FBX stores a flat object list plus a connection table. Models become scene
//! nodes (`LimbNode`s are bones), mesh geometry is triangulated as fans and
//! every animation stack becomes an [`AnimationClip`] whose tracks target the
//! sanitized model names, the same way the glTF importer names them.

use std::{
    collections::{HashMap, HashSet},
    io::Cursor,
    sync::Arc,
};

use cgmath::{Deg, One, Quaternion, Vector3};
use fbxcel::{
    low::v7400::AttributeValue,
    tree::{
        any::AnyTree,
        v7400::{NodeHandle, Tree},
    },
};

use crate::{
    data_structures::{
        instance::{EulerOrder, Instance, euler_to_quaternion},
        model::{Material, Mesh, MeshGroup, Model},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::Texture,
    },
    error::LoadError,
    resources::{
        LoaderRegistry, SceneImporter,
        animation::{AnimationClip, AnimationTrack, Interpolation, Keyframes},
        manager::{LoadFuture, boxed_load, join_relative},
        scene::sanitize_node_name,
        texture::extension_of,
    },
};

/// FBX time unit: ticks per second.
const TICKS_PER_SECOND: f64 = 46_186_158_000.0;

pub struct FbxImporter;

impl SceneImporter for FbxImporter {
    fn import<'a>(
        &'a self,
        registry: &'a LoaderRegistry,
        url: &'a str,
    ) -> LoadFuture<'a, Box<dyn SceneNode>> {
        boxed_load(load_model_fbx(registry, url))
    }
}

pub async fn load_model_fbx(
    registry: &LoaderRegistry,
    url: &str,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let invalid = |reason: String| LoadError::InvalidAsset {
        url: url.to_string(),
        reason,
    };
    let bytes = registry.manager().fetch(url).await?;
    let tree = match AnyTree::from_seekable_reader(Cursor::new(bytes))
        .map_err(|e| invalid(format!("malformed FBX: {e}")))?
    {
        AnyTree::V7400(_, tree, _footer) => tree,
        #[allow(unreachable_patterns)]
        _ => return Err(invalid("unsupported FBX version".to_string()).into()),
    };

    let sources = {
        let document = FbxDocument::new(&tree);
        document.texture_sources()
    };
    let mut textures = HashMap::with_capacity(sources.len());
    for (texture_id, source) in sources {
        let texture = match source {
            TextureSource::Embedded { name, bytes } => {
                let label = format!("{url}#{name}");
                Arc::new(Texture::from_bytes(&bytes, &label, extension_of(&name))?)
            }
            TextureSource::File(path) => registry.load_texture(&join_relative(url, &path)).await?,
        };
        textures.insert(texture_id, texture);
    }

    let document = FbxDocument::new(&tree);
    let animations = document.animations();
    let mut root = ContainerNode::new(None).with_animations(animations);
    let mut visited = HashSet::new();
    for &model in document.children_of(0) {
        if document.kind(model) == Some("Model") {
            root.add_child(document.scene_node(model, &textures, &mut visited, url)?);
        }
    }
    log::debug!(
        "imported {url}: {} top-level nodes, {} clips",
        root.get_children().len(),
        root.get_animation().len()
    );
    Ok(Box::new(root))
}

enum TextureSource {
    Embedded { name: String, bytes: Vec<u8> },
    File(String),
}

struct Connection {
    child: i64,
    parent: i64,
    property: Option<String>,
}

/// Objects by id plus the connection table, borrowed from a parsed tree.
struct FbxDocument<'a> {
    objects: HashMap<i64, NodeHandle<'a>>,
    connections: Vec<Connection>,
    children: HashMap<i64, Vec<i64>>,
}

impl<'a> FbxDocument<'a> {
    fn new(tree: &'a Tree) -> Self {
        let root = tree.root();
        let mut objects: HashMap<i64, NodeHandle<'a>> = HashMap::new();
        if let Some(list) = root.first_child_by_name("Objects") {
            for object in list.children() {
                if let Some(id) = attr_i64(object, 0) {
                    objects.insert(id, object);
                }
            }
        }
        // "OO" links object to object, "OP" links an object to a property of its parent
        let mut connections = Vec::new();
        if let Some(list) = root.first_child_by_name("Connections") {
            for c in list.children_by_name("C") {
                if let (Some(child), Some(parent)) = (attr_i64(c, 1), attr_i64(c, 2)) {
                    connections.push(Connection {
                        child,
                        parent,
                        property: attr_str(c, 3).map(str::to_string),
                    });
                }
            }
        }
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for connection in &connections {
            children.entry(connection.parent).or_default().push(connection.child);
        }
        Self {
            objects,
            connections,
            children,
        }
    }

    fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map_or(&[][..], Vec::as_slice)
    }

    /// Node name of the object, such as `Model`, `Geometry` or `AnimationCurve`.
    fn kind(&self, id: i64) -> Option<&'a str> {
        self.objects.get(&id).map(|object| object.name())
    }

    fn children_of_kind(&self, id: i64, kind: &'a str) -> impl Iterator<Item = i64> + '_ {
        self.children_of(id)
            .iter()
            .copied()
            .filter(move |&child| self.kind(child) == Some(kind))
    }

    /// The parent `child` is connected to through `property`, such as `Lcl Rotation`.
    fn property_parent(&self, child: i64) -> Option<(i64, &str)> {
        self.connections
            .iter()
            .find(|c| c.child == child && c.property.is_some())
            .and_then(|c| Some((c.parent, c.property.as_deref()?)))
    }

    fn texture_sources(&self) -> Vec<(i64, TextureSource)> {
        let mut sources = Vec::new();
        for (&id, &texture) in &self.objects {
            if texture.name() != "Texture" {
                continue;
            }
            let embedded = self.children_of_kind(id, "Video").find_map(|video| {
                let video = self.objects.get(&video)?;
                let content = match video.first_child_by_name("Content")?.attributes().first()? {
                    AttributeValue::Binary(bytes) if !bytes.is_empty() => bytes.clone(),
                    _ => return None,
                };
                let name = child_str(*video, "RelativeFilename")
                    .or_else(|| child_str(*video, "Filename"))
                    .unwrap_or("embedded");
                Some(TextureSource::Embedded {
                    name: name.replace('\\', "/"),
                    bytes: content,
                })
            });
            let source = embedded.or_else(|| {
                child_str(texture, "RelativeFilename")
                    .or_else(|| child_str(texture, "FileName"))
                    .filter(|path| !path.is_empty())
                    .map(|path| TextureSource::File(path.replace('\\', "/")))
            });
            match source {
                Some(source) => sources.push((id, source)),
                None => log::warn!("texture {id} has neither embedded content nor a file name"),
            }
        }
        sources
    }

    fn material(&self, id: i64, textures: &HashMap<i64, Arc<Texture>>) -> Material {
        let name = self
            .objects
            .get(&id)
            .map(|object| object_name(*object))
            .unwrap_or_else(|| "material".to_string());
        let map = self.children_of(id).iter().find_map(|&child| {
            let diffuse = self
                .connections
                .iter()
                .any(|c| c.child == child && c.parent == id && c.property.as_deref() == Some("DiffuseColor"));
            diffuse.then(|| textures.get(&child).cloned()).flatten()
        });
        Material {
            map,
            ..Material::untextured(&name)
        }
    }

    fn scene_node(
        &self,
        id: i64,
        textures: &HashMap<i64, Arc<Texture>>,
        visited: &mut HashSet<i64>,
        url: &str,
    ) -> anyhow::Result<Box<dyn SceneNode>> {
        let invalid = |reason: String| LoadError::InvalidAsset {
            url: url.to_string(),
            reason,
        };
        if !visited.insert(id) {
            return Err(invalid(format!("model {id} is connected more than once")).into());
        }
        let object = *self
            .objects
            .get(&id)
            .ok_or_else(|| invalid(format!("connection to missing model {id}")))?;
        let name = sanitize_node_name(&object_name(object));

        let mut node: Box<dyn SceneNode> = match attr_str(object, 2) {
            Some("Mesh") => {
                let mut materials: Vec<Material> = self
                    .children_of_kind(id, "Material")
                    .map(|material| self.material(material, textures))
                    .collect();
                materials.push(Material::untextured("default"));
                let mut meshes = Vec::new();
                for geometry in self.children_of_kind(id, "Geometry") {
                    if let Some(&geometry) = self.objects.get(&geometry) {
                        let mesh = read_geometry(geometry, &name, materials.len() - 1)
                            .map_err(|reason| invalid(format!("{name}: {reason}")))?;
                        meshes.push(mesh);
                    }
                }
                Box::new(ModelNode::from_model(Some(name.as_str()), Model { meshes, materials }))
            }
            Some("LimbNode") => Box::new(ContainerNode::bone(Some(name.as_str()))),
            _ => Box::new(ContainerNode::new(Some(name.as_str()))),
        };
        *node.local_transform_mut() = local_transform(object);

        let children: Vec<i64> = self.children_of_kind(id, "Model").collect();
        for child in children {
            node.add_child(self.scene_node(child, textures, visited, url)?);
        }
        Ok(node)
    }

    fn animations(&self) -> Vec<Arc<AnimationClip>> {
        let mut stacks: Vec<(i64, NodeHandle<'a>)> = self
            .objects
            .iter()
            .filter(|(_, object)| object.name() == "AnimationStack")
            .map(|(&id, &object)| (id, object))
            .collect();
        stacks.sort_by_key(|(id, _)| *id);

        stacks
            .into_iter()
            .map(|(id, stack)| {
                let tracks = self
                    .children_of_kind(id, "AnimationLayer")
                    .flat_map(|layer| self.children_of_kind(layer, "AnimationCurveNode").collect::<Vec<_>>())
                    .filter_map(|curve_node| self.track(curve_node))
                    .collect();
                Arc::new(AnimationClip::new(object_name(stack), tracks))
            })
            .collect()
    }

    fn track(&self, curve_node: i64) -> Option<AnimationTrack> {
        let (model_id, property) = self.property_parent(curve_node)?;
        let model = *self.objects.get(&model_id)?;
        let node = *self.objects.get(&curve_node)?;
        let target = sanitize_node_name(&object_name(model));

        let mut axes: [Curve; 3] = ["d|X", "d|Y", "d|Z"].map(|axis| Curve {
            times: Vec::new(),
            values: Vec::new(),
            default: property_values(node, axis)
                .and_then(|values| values.first())
                .and_then(attr_f64_value)
                .unwrap_or(0.0),
        });
        for curve in self.children_of_kind(curve_node, "AnimationCurve") {
            let axis = match self.property_parent_of(curve, curve_node) {
                Some("d|X") => 0,
                Some("d|Y") => 1,
                Some("d|Z") => 2,
                _ => continue,
            };
            let curve_object = *self.objects.get(&curve)?;
            let times = child_array_i64(curve_object, "KeyTime").unwrap_or_default();
            let values = child_array_f64(curve_object, "KeyValueFloat").unwrap_or_default();
            let len = times.len().min(values.len());
            axes[axis].times = times[..len].to_vec();
            axes[axis].values = values[..len].to_vec();
        }

        let mut ticks: Vec<i64> = axes.iter().flat_map(|axis| axis.times.iter().copied()).collect();
        ticks.sort_unstable();
        ticks.dedup();
        if ticks.is_empty() {
            return None;
        }
        let samples: Vec<[f64; 3]> = ticks
            .iter()
            .map(|&tick| [0, 1, 2].map(|axis| axes[axis].sample(tick)))
            .collect();
        let keyframes = match property {
            "Lcl Translation" => Keyframes::Translation(samples.iter().map(|&v| to_vector(v)).collect()),
            "Lcl Scaling" => Keyframes::Scale(samples.iter().map(|&v| to_vector(v)).collect()),
            "Lcl Rotation" => Keyframes::Rotation(
                samples
                    .iter()
                    .map(|&euler| model_rotation(model, euler))
                    .collect(),
            ),
            other => {
                log::warn!("{target}: animated property {other} is not supported, skipped");
                return None;
            }
        };
        Some(AnimationTrack {
            target,
            keyframes,
            timestamps: ticks
                .iter()
                .map(|&tick| (tick as f64 / TICKS_PER_SECOND) as f32)
                .collect(),
            interpolation: Interpolation::Linear,
        })
    }

    fn property_parent_of(&self, child: i64, parent: i64) -> Option<&str> {
        self.connections
            .iter()
            .find(|c| c.child == child && c.parent == parent)
            .and_then(|c| c.property.as_deref())
    }
}

/// Keys of one curve axis; `default` applies when the axis has no keys.
struct Curve {
    times: Vec<i64>,
    values: Vec<f64>,
    default: f64,
}

impl Curve {
    fn sample(&self, tick: i64) -> f64 {
        if self.times.is_empty() {
            return self.default;
        }
        let next = self.times.partition_point(|&t| t <= tick);
        if next == 0 {
            return self.values[0];
        }
        if next >= self.times.len() {
            return self.values[self.times.len() - 1];
        }
        let (t0, t1) = (self.times[next - 1], self.times[next]);
        let (v0, v1) = (self.values[next - 1], self.values[next]);
        let t = (tick - t0) as f64 / (t1 - t0) as f64;
        v0 + (v1 - v0) * t
    }
}

/// How a layer element (normals, UVs, materials) maps onto the geometry.
struct LayerElement {
    mapping: Mapping,
    values: Vec<f64>,
    index: Option<Vec<i32>>,
    width: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mapping {
    PolygonVertex,
    ControlPoint,
    Polygon,
    AllSame,
}

impl LayerElement {
    fn read(geometry: NodeHandle<'_>, layer: &str, values: &str, index: &str, width: usize) -> Option<Self> {
        let element = geometry.first_child_by_name(layer)?;
        let mapping = match child_str(element, "MappingInformationType")? {
            "ByPolygonVertex" => Mapping::PolygonVertex,
            "ByVertice" | "ByVertex" | "ByControlPoint" => Mapping::ControlPoint,
            "ByPolygon" => Mapping::Polygon,
            "AllSame" => Mapping::AllSame,
            other => {
                log::warn!("{layer}: mapping {other} is not supported, ignored");
                return None;
            }
        };
        let index = match child_str(element, "ReferenceInformationType") {
            Some("IndexToDirect") | Some("Index") => Some(child_array_i32(element, index)?),
            _ => None,
        };
        let values = match child_array_f64(element, values) {
            Some(values) => values,
            // material layers carry only indices
            None if width == 0 => Vec::new(),
            None => return None,
        };
        Some(Self {
            mapping,
            values,
            index,
            width,
        })
    }

    fn slot(&self, polygon: usize, polygon_vertex: usize, control_point: usize) -> usize {
        match self.mapping {
            Mapping::PolygonVertex => polygon_vertex,
            Mapping::ControlPoint => control_point,
            Mapping::Polygon => polygon,
            Mapping::AllSame => 0,
        }
    }

    fn value(&self, polygon: usize, polygon_vertex: usize, control_point: usize) -> Option<&[f64]> {
        let slot = self.slot(polygon, polygon_vertex, control_point);
        let idx = match &self.index {
            Some(index) => usize::try_from(*index.get(slot)?).ok()?,
            None => slot,
        };
        self.values.get(idx * self.width..(idx + 1) * self.width)
    }
}

/**
 * Builds a mesh with one vertex per polygon corner.
 *
 * `PolygonVertexIndex` lists control points polygon by polygon; the last
 * corner of each polygon is stored bitwise negated. Polygons are split into
 * fans. Per-polygon materials become [`MeshGroup`]s.
 */
fn read_geometry(geometry: NodeHandle<'_>, name: &str, default_material: usize) -> Result<Mesh, String> {
    let control_points: Vec<[f32; 3]> = child_array_f64(geometry, "Vertices")
        .unwrap_or_default()
        .chunks_exact(3)
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();
    let polygon_vertices = child_array_i32(geometry, "PolygonVertexIndex").unwrap_or_default();
    let normal_layer = LayerElement::read(geometry, "LayerElementNormal", "Normals", "NormalsIndex", 3);
    let uv_layer = LayerElement::read(geometry, "LayerElementUV", "UV", "UVIndex", 2);
    let material_layer = LayerElement::read(geometry, "LayerElementMaterial", "", "Materials", 0);

    let mut mesh = Mesh {
        name: name.to_string(),
        material: default_material,
        ..Default::default()
    };
    let mut normals = Vec::with_capacity(polygon_vertices.len());
    let mut tex_coords = Vec::with_capacity(polygon_vertices.len());
    let mut triangle_materials = Vec::new();
    let mut corners: Vec<u32> = Vec::new();
    let mut polygon = 0;
    for (polygon_vertex, &raw) in polygon_vertices.iter().enumerate() {
        let control_point = (if raw < 0 { !raw } else { raw }) as usize;
        let position = control_points
            .get(control_point)
            .ok_or_else(|| format!("control point {control_point} out of range"))?;
        corners.push(mesh.positions.len() as u32);
        mesh.positions.push(*position);
        if let Some(n) = normal_layer
            .as_ref()
            .and_then(|layer| layer.value(polygon, polygon_vertex, control_point))
        {
            normals.push([n[0] as f32, n[1] as f32, n[2] as f32]);
        }
        if let Some(uv) = uv_layer
            .as_ref()
            .and_then(|layer| layer.value(polygon, polygon_vertex, control_point))
        {
            // FBX puts v = 0 at the bottom of the image
            tex_coords.push([uv[0] as f32, 1.0 - uv[1] as f32]);
        }

        if raw < 0 {
            let material = material_layer
                .as_ref()
                .and_then(|layer| layer.index.as_ref()?.get(layer.slot(polygon, 0, 0)).copied())
                .and_then(|idx| usize::try_from(idx).ok())
                .filter(|&idx| idx < default_material)
                // the first material, or the default when the model has none
                .unwrap_or(0);
            for i in 1..corners.len().saturating_sub(1) {
                mesh.indices.extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                triangle_materials.push(material);
            }
            corners.clear();
            polygon += 1;
        }
    }
    if normals.len() == mesh.positions.len() {
        mesh.normals = normals;
    }
    if tex_coords.len() == mesh.positions.len() {
        mesh.tex_coords = tex_coords;
    }

    let uniform = triangle_materials.windows(2).all(|pair| pair[0] == pair[1]);
    match triangle_materials.first() {
        Some(&material) if uniform => mesh.material = material,
        Some(_) => {
            for (triangle, &material) in triangle_materials.iter().enumerate() {
                match mesh.groups.last_mut() {
                    Some(group) if group.material == material => group.count += 3,
                    _ => mesh.groups.push(MeshGroup {
                        start: triangle * 3,
                        count: 3,
                        material,
                    }),
                }
            }
        }
        None => {}
    }
    Ok(mesh)
}

fn local_transform(model: NodeHandle<'_>) -> Instance {
    let vector = |name: &str, default: [f64; 3]| vec3_property(model, name).unwrap_or(default);
    Instance {
        position: to_vector(vector("Lcl Translation", [0.0; 3])),
        rotation: model_rotation(model, vector("Lcl Rotation", [0.0; 3])),
        scale: to_vector(vector("Lcl Scaling", [1.0; 3])),
    }
}

/// `Lcl Rotation` (degrees) combined with the model's pre- and post-rotation.
fn model_rotation(model: NodeHandle<'_>, euler: [f64; 3]) -> Quaternion<f32> {
    let order = property_values(model, "RotationOrder")
        .and_then(|values| values.first())
        .and_then(attr_f64_value)
        .map_or(0, |order| order as i64);
    let pre = vec3_property(model, "PreRotation").map_or(Quaternion::one(), |e| fbx_euler(e, 0));
    let post = vec3_property(model, "PostRotation").map_or(Quaternion::one(), |e| fbx_euler(e, 0));
    pre * fbx_euler(euler, order) * post.conjugate()
}

/// FBX rotation orders are extrinsic, so `eEulerXYZ` is intrinsic `ZYX`.
fn fbx_euler([x, y, z]: [f64; 3], order: i64) -> Quaternion<f32> {
    let order = match order {
        1 => EulerOrder::YZX,
        2 => EulerOrder::XZY,
        3 => EulerOrder::ZXY,
        4 => EulerOrder::YXZ,
        5 => EulerOrder::XYZ,
        _ => EulerOrder::ZYX,
    };
    euler_to_quaternion(
        Deg(x as f32).into(),
        Deg(y as f32).into(),
        Deg(z as f32).into(),
        order,
    )
}

fn to_vector([x, y, z]: [f64; 3]) -> Vector3<f32> {
    Vector3::new(x as f32, y as f32, z as f32)
}

/// `Name\0\x01Class` in binary files, `Class::Name` in converted ones.
fn object_name(object: NodeHandle<'_>) -> String {
    let raw = attr_str(object, 1).unwrap_or_default();
    let name = match raw.split_once("\u{0}\u{1}") {
        Some((name, _)) => name,
        None => raw.split_once("::").map_or(raw, |(_, name)| name),
    };
    name.to_string()
}

/// Values of the `Properties70` entry `name`, after its type and flag columns.
fn property_values<'a>(node: NodeHandle<'a>, name: &str) -> Option<&'a [AttributeValue]> {
    node.first_child_by_name("Properties70")?
        .children_by_name("P")
        .find(|p| attr_str(*p, 0) == Some(name))
        .and_then(|p| p.attributes().get(4..))
}

fn vec3_property(node: NodeHandle<'_>, name: &str) -> Option<[f64; 3]> {
    let values = property_values(node, name)?;
    Some([
        attr_f64_value(values.first()?)?,
        attr_f64_value(values.get(1)?)?,
        attr_f64_value(values.get(2)?)?,
    ])
}

fn attr_i64(node: NodeHandle<'_>, idx: usize) -> Option<i64> {
    match node.attributes().get(idx)? {
        AttributeValue::I64(v) => Some(*v),
        AttributeValue::I32(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn attr_str<'a>(node: NodeHandle<'a>, idx: usize) -> Option<&'a str> {
    match node.attributes().get(idx)? {
        AttributeValue::String(s) => Some(s.as_str()),
        _ => None,
    }
}

fn attr_f64_value(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::F64(v) => Some(*v),
        AttributeValue::F32(v) => Some(f64::from(*v)),
        AttributeValue::I32(v) => Some(f64::from(*v)),
        AttributeValue::I64(v) => Some(*v as f64),
        AttributeValue::I16(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn child_str<'a>(node: NodeHandle<'a>, name: &str) -> Option<&'a str> {
    attr_str(node.first_child_by_name(name)?, 0)
}

fn child_array_f64(node: NodeHandle<'_>, name: &str) -> Option<Vec<f64>> {
    match node.first_child_by_name(name)?.attributes().first()? {
        AttributeValue::ArrF64(values) => Some(values.clone()),
        AttributeValue::ArrF32(values) => Some(values.iter().map(|&v| f64::from(v)).collect()),
        _ => None,
    }
}

fn child_array_i32(node: NodeHandle<'_>, name: &str) -> Option<Vec<i32>> {
    match node.first_child_by_name(name)?.attributes().first()? {
        AttributeValue::ArrI32(values) => Some(values.clone()),
        _ => None,
    }
}

fn child_array_i64(node: NodeHandle<'_>, name: &str) -> Option<Vec<i64>> {
    match node.first_child_by_name(name)?.attributes().first()? {
        AttributeValue::ArrI64(values) => Some(values.clone()),
        AttributeValue::ArrI32(values) => Some(values.iter().map(|&v| i64::from(v)).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Rotation3;

    use super::*;

    #[test]
    fn curves_interpolate_between_keys_and_clamp() {
        let curve = Curve {
            times: vec![0, 10, 20],
            values: vec![0.0, 1.0, 3.0],
            default: 7.0,
        };
        assert_eq!(curve.sample(-5), 0.0);
        assert_eq!(curve.sample(5), 0.5);
        assert_eq!(curve.sample(15), 2.0);
        assert_eq!(curve.sample(99), 3.0);

        let empty = Curve {
            times: Vec::new(),
            values: Vec::new(),
            default: 7.0,
        };
        assert_eq!(empty.sample(3), 7.0);
    }

    #[test]
    fn default_rotation_order_applies_x_first() {
        let q = fbx_euler([90.0, 0.0, 90.0], 0);
        let expected = Quaternion::from_angle_z(Deg(90.0_f32)) * Quaternion::from_angle_x(Deg(90.0_f32));
        assert!((q.s - expected.s).abs() < 1e-5);
        assert!((q.v.x - expected.v.x).abs() < 1e-5);
        assert!((q.v.z - expected.v.z).abs() < 1e-5);
    }
}

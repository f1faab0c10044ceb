use cgmath::{Rad, Vector3};

use crate::{
    config::GroundAssets,
    data_structures::{instance::EulerOrder, scene_graph::SceneNode},
    resources::LoaderRegistry,
};

pub struct GroundMeshes {
    pub ground: Box<dyn SceneNode>,
}

pub struct MeshGround {
    pub mesh: GroundMeshes,
}

/// Loads the golf course and places it under the character's feet.
pub async fn create_mesh_ground(
    registry: &LoaderRegistry,
    assets: &GroundAssets,
) -> anyhow::Result<MeshGround> {
    let mut ground = registry.load_scene(&assets.model).await?;

    let transform = ground.local_transform_mut();
    transform.set_rotation_from_euler(Rad(0.05), Rad(-0.6), Rad(0.0), EulerOrder::XYZ);
    transform.position = Vector3::new(40.0, 78.65, 120.0);
    transform.set_scalar_scale(2.0);
    ground.update_world_transform_all();

    Ok(MeshGround {
        mesh: GroundMeshes { ground },
    })
}

use cgmath::{Rad, Vector3};
use golf_scene::{
    SceneConfig,
    data_structures::{
        instance::{EulerOrder, euler_to_quaternion},
        scene_graph::find_by_name,
    },
    meshes::ground::create_mesh_ground,
};

use crate::common::test_utils::{MemorySource, mesh_glb, registry};

mod common;

#[tokio::test]
async fn ground_is_placed_at_its_fixed_transform() {
    let config = SceneConfig::default();
    let (registry, source) = registry(MemorySource::new().with(&config.ground.model, mesh_glb("golfplatz")));

    let ground = create_mesh_ground(&registry, &config.ground).await.unwrap();

    let transform = ground.mesh.ground.get_local_transform();
    assert_eq!(transform.position, Vector3::new(40.0, 78.65, 120.0));
    assert_eq!(transform.scale, Vector3::new(2.0, 2.0, 2.0));
    assert_eq!(
        transform.rotation,
        euler_to_quaternion(Rad(0.05), Rad(-0.6), Rad(0.0), EulerOrder::XYZ)
    );
    assert_eq!(ground.mesh.ground.get_world_transform(), transform);
    assert!(find_by_name(ground.mesh.ground.as_ref(), "golfplatz").is_some());
    assert_eq!(source.fetched(), vec![config.ground.model.clone()]);
}

#[tokio::test]
async fn missing_course_fails_the_factory() {
    let config = SceneConfig::default();
    let (registry, _) = registry(MemorySource::new());

    assert!(create_mesh_ground(&registry, &config.ground).await.is_err());
}

//! Factories for the objects of the golf scene.
//!
//! Each factory loads its assets through the shared [`LoaderRegistry`], puts
//! them at their fixed place in the world and returns a small bundle. They are
//! independent of each other and can run concurrently.

use std::sync::Arc;

use crate::{config::SceneConfig, resources::LoaderRegistry};

pub mod boy;
pub mod ground;
pub mod sky;

pub use boy::{MeshBoy, create_mesh_boy};
pub use ground::{MeshGround, create_mesh_ground};
pub use sky::{MeshSky, create_mesh_sky};

pub struct GolfScene {
    pub boy: MeshBoy,
    pub ground: MeshGround,
    pub sky: MeshSky,
}

impl GolfScene {
    /// Runs all three factories at once; the first failure aborts the others.
    pub async fn load(registry: Arc<LoaderRegistry>, config: &SceneConfig) -> anyhow::Result<Self> {
        let (boy, ground, sky) = futures::try_join!(
            create_mesh_boy(&registry, &config.boy),
            create_mesh_ground(&registry, &config.ground),
            create_mesh_sky(registry.clone(), &config.sky),
        )?;
        Ok(Self { boy, ground, sky })
    }
}

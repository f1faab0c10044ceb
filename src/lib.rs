//! golf-scene
//!
//! CPU-side assembly of a small 3D golf scene that runs natively and on the
//! web. Assets are fetched and decoded through one shared loader registry;
//! rendering is left to the embedding application.
//!
//! High-level modules
//! - `animation`: clip playback (mixer and actions) over a scene graph
//! - `config`: asset locations and runtime switches, loadable from TOML
//! - `data_structures`: scene graph, transforms, meshes, materials, textures
//! - `error`: the crate's own failure cases
//! - `meshes`: factories for the golfer, the course and the sky box
//! - `resources`: asset manager, loader registry and the glTF/texture/DRACO loaders
//! - `simplify`: offline weld and simplification of GLB files
//!

pub mod animation;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod meshes;
pub mod resources;
pub mod simplify;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use config::SceneConfig;
pub use error::LoadError;
pub use resources::LoaderRegistry;

/// Routes `log` output to stderr natively (filtered by `RUST_LOG`) or to the browser console.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        // fails only when a logger is already installed
        let _ = console_log::init_with_level(log::Level::Info);
    }
}

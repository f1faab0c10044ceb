//! Scene data structures: transforms, meshes, textures and the scene graph.
//!
//! - `instance` holds the local/world transformation of a node
//! - `model` contains mesh and material definitions
//! - `texture` is a decoded RGBA image
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;

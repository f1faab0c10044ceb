//! Everything that turns URLs into CPU-side assets.
//!
//! A single [`LoaderRegistry`] is created per scene and handed to every mesh
//! factory. It owns the shared [`AssetManager`] and one loader per asset kind,
//! so URL overrides, progress tracking and the cached DRACO decoder are shared
//! by all of them.

use std::{collections::HashMap, sync::Arc};

use crate::{
    config::SceneConfig,
    data_structures::{scene_graph::SceneNode, texture::Texture},
    error::LoadError,
    resources::{
        draco::{DRACO_DECODER_FILE, DRACO_WRAPPER_FILE, DracoBackend, DracoLoader},
        manager::{AssetManager, LoadFuture},
        fbx::FbxImporter,
        scene::GltfImporter,
        texture::{TextureLoader, extension_of},
    },
};

pub mod animation;
pub mod draco;
pub mod fbx;
pub mod manager;
pub mod scene;
pub mod texture;

/**
 * Turns the bytes behind a URL into a scene graph.
 *
 * The registry picks an importer by the URL's file extension. glTF, GLB and
 * binary FBX are built in; other formats are plugged in (or the built-in ones
 * replaced) with [`LoaderRegistry::register_importer`].
 */
pub trait SceneImporter: Send + Sync {
    fn import<'a>(
        &'a self,
        registry: &'a LoaderRegistry,
        url: &'a str,
    ) -> LoadFuture<'a, Box<dyn SceneNode>>;
}

pub struct LoaderRegistry {
    manager: Arc<AssetManager>,
    textures: TextureLoader,
    draco: DracoLoader,
    importers: HashMap<String, Arc<dyn SceneImporter>>,
}

impl LoaderRegistry {
    pub fn new(manager: Arc<AssetManager>) -> Self {
        let gltf: Arc<dyn SceneImporter> = Arc::new(GltfImporter);
        let importers = HashMap::from([
            ("glb".to_string(), gltf.clone()),
            ("gltf".to_string(), gltf),
            ("fbx".to_string(), Arc::new(FbxImporter) as Arc<dyn SceneImporter>),
        ]);
        Self {
            textures: TextureLoader::new(manager.clone()),
            manager,
            draco: DracoLoader::new(),
            importers,
        }
    }

    /// Builds the manager from `config`: its asset root and the DRACO helper file locations.
    pub fn from_config(config: &SceneConfig) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let source = Arc::new(manager::FileSource::new(&config.asset_root));
        #[cfg(target_arch = "wasm32")]
        let source = Arc::new(manager::HttpSource::new(
            (!config.asset_root.is_empty()).then(|| config.asset_root.clone()),
        ));
        let manager = AssetManager::new(source)
            .with_url_override(DRACO_WRAPPER_FILE, config.draco.wrapper_url.clone())
            .with_url_override(DRACO_DECODER_FILE, config.draco.decoder_url.clone());
        Self::new(Arc::new(manager))
    }

    pub fn with_draco_backend(mut self, backend: Arc<dyn DracoBackend>) -> Self {
        self.draco = DracoLoader::with_backend(backend);
        self
    }

    /// Registers `importer` for URLs ending in `.{extension}` (case-insensitive).
    pub fn register_importer(&mut self, extension: &str, importer: Arc<dyn SceneImporter>) {
        self.importers.insert(extension.to_ascii_lowercase(), importer);
    }

    pub fn manager(&self) -> &Arc<AssetManager> {
        &self.manager
    }

    pub fn draco(&self) -> &DracoLoader {
        &self.draco
    }

    pub fn textures(&self) -> &TextureLoader {
        &self.textures
    }

    pub async fn load_scene(&self, url: &str) -> anyhow::Result<Box<dyn SceneNode>> {
        let extension = extension_of(url).unwrap_or_default().to_ascii_lowercase();
        let Some(importer) = self.importers.get(&extension) else {
            return Err(LoadError::NoImporter {
                extension,
                url: url.to_string(),
            }
            .into());
        };
        importer.import(self, url).await
    }

    pub async fn load_texture(&self, url: &str) -> anyhow::Result<Arc<Texture>> {
        self.textures.load(url).await
    }
}

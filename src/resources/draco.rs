//! Support for `KHR_draco_mesh_compression`.
//!
//! Decoding itself is done by an external DRACO decoder module. This module
//! knows the two helper files that decoder is made of, fetches them through
//! the shared [`AssetManager`] (whose URL overrides point them at the
//! bundler-provided locations) and hands compressed primitives to a
//! [`DracoBackend`].

use std::{collections::BTreeMap, sync::Arc};

use crate::resources::manager::AssetManager;

pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";
pub const DRACO_WRAPPER_FILE: &str = "draco_wasm_wrapper.js";
pub const DRACO_DECODER_FILE: &str = "draco_decoder.wasm";

/// The fetched decoder files.
#[derive(Debug)]
pub struct DecoderModule {
    pub wrapper: Vec<u8>,
    pub wasm: Vec<u8>,
}

/// A compressed primitive: the DRACO bitstream and the attribute ids per glTF semantic.
#[derive(Debug)]
pub struct DracoPrimitive<'a> {
    pub data: &'a [u8],
    pub attributes: BTreeMap<String, u32>,
}

#[derive(Clone, Debug, Default)]
pub struct DecodedPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

pub trait DracoBackend: Send + Sync {
    fn decode(
        &self,
        module: &DecoderModule,
        primitive: &DracoPrimitive<'_>,
    ) -> anyhow::Result<DecodedPrimitive>;
}

#[derive(Default)]
pub struct DracoLoader {
    backend: Option<Arc<dyn DracoBackend>>,
    module: futures::lock::Mutex<Option<Arc<DecoderModule>>>,
}

impl DracoLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(backend: Arc<dyn DracoBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Default::default()
        }
    }

    pub fn backend(&self) -> Option<&Arc<dyn DracoBackend>> {
        self.backend.as_ref()
    }

    /// Fetches the decoder files on first use; later calls share the result.
    pub async fn decoder_module(&self, manager: &AssetManager) -> anyhow::Result<Arc<DecoderModule>> {
        let mut module = self.module.lock().await;
        if let Some(module) = module.as_ref() {
            return Ok(module.clone());
        }
        let (wrapper, wasm) = futures::try_join!(
            manager.fetch(DRACO_WRAPPER_FILE),
            manager.fetch(DRACO_DECODER_FILE)
        )?;
        let loaded = Arc::new(DecoderModule { wrapper, wasm });
        *module = Some(loaded.clone());
        Ok(loaded)
    }
}

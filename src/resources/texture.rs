use std::sync::Arc;

use crate::{data_structures::texture::Texture, resources::manager::AssetManager};

/// Fetches and decodes colour maps through the shared [`AssetManager`].
pub struct TextureLoader {
    manager: Arc<AssetManager>,
}

impl TextureLoader {
    pub fn new(manager: Arc<AssetManager>) -> Self {
        Self { manager }
    }

    pub async fn load(&self, url: &str) -> anyhow::Result<Arc<Texture>> {
        self.load_with_format(url, extension_of(url)).await
    }

    /// Like [`TextureLoader::load`] with an explicit format hint, e.g. from a MIME type.
    pub async fn load_with_format(&self, url: &str, format: Option<&str>) -> anyhow::Result<Arc<Texture>> {
        let data = self.manager.fetch(url).await?;
        let texture = Texture::from_bytes(&data, url, format)?;
        Ok(Arc::new(texture))
    }
}

/// File extension of a URL as written, ignoring query strings and fragments.
pub fn extension_of(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.').map(|(_, ext)| ext).filter(|ext| !ext.is_empty())
}

/// The image format hint carried by a glTF `mimeType` such as `image/png`.
pub fn format_from_mime(mime_type: &str) -> Option<&str> {
    mime_type.split('/').next_back()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_ignores_query_and_directories() {
        assert_eq!(extension_of("models/sky/dark_ft.png?v=2"), Some("png"));
        assert_eq!(extension_of("/models.v2/readme"), None);
        assert_eq!(extension_of("club.GLB"), Some("GLB"));
    }
}

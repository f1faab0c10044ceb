/// Failures raised by this crate itself.
///
/// They travel inside `anyhow::Error` like every other loader error; use
/// `err.downcast_ref::<LoadError>()` to tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no scene importer registered for '.{extension}' ({url})")]
    NoImporter { extension: String, url: String },

    #[error("'{url}' requires the unsupported extension {extension}")]
    UnsupportedExtension { extension: String, url: String },

    #[error("node '{name}' not found below '{root}'")]
    NodeNotFound { name: String, root: String },

    #[error("'{url}' contains no animation clip")]
    NoAnimation { url: String },

    #[error("unknown sky theme '{0}'")]
    UnknownTheme(String),

    #[error("invalid asset '{url}': {reason}")]
    InvalidAsset { url: String, reason: String },
}

//! URL resolution, byte fetching and load progress shared by all loaders.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Boxed loader future. It is `Send` natively; on the web everything runs on one thread.
#[cfg(not(target_arch = "wasm32"))]
pub type LoadFuture<'a, T> = futures::future::BoxFuture<'a, anyhow::Result<T>>;
#[cfg(target_arch = "wasm32")]
pub type LoadFuture<'a, T> = futures::future::LocalBoxFuture<'a, anyhow::Result<T>>;

pub type FetchFuture<'a> = LoadFuture<'a, Vec<u8>>;

#[cfg(not(target_arch = "wasm32"))]
pub fn boxed_load<'a, T>(
    fut: impl Future<Output = anyhow::Result<T>> + Send + 'a,
) -> LoadFuture<'a, T> {
    Box::pin(fut)
}

#[cfg(target_arch = "wasm32")]
pub fn boxed_load<'a, T>(fut: impl Future<Output = anyhow::Result<T>> + 'a) -> LoadFuture<'a, T> {
    Box::pin(fut)
}

/// Where asset bytes come from: the file system natively, the page origin on the web.
pub trait AssetSource: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// Reads assets below a root directory. A leading `/` in a URL is relative to that root.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Debug)]
pub struct FileSource {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileSource {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetSource for FileSource {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        use anyhow::Context;

        let path = self.root.join(url.trim_start_matches('/'));
        boxed_load(async move {
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read asset {}", path.display()))
        })
    }
}

/// Fetches assets over HTTP relative to `base`, or to the page origin when no base is set.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug, Default)]
pub struct HttpSource {
    base: Option<String>,
}

#[cfg(target_arch = "wasm32")]
impl HttpSource {
    pub fn new(base: Option<String>) -> Self {
        Self { base }
    }

    fn format_url(&self, url: &str) -> anyhow::Result<reqwest::Url> {
        if url.contains("://") {
            return Ok(reqwest::Url::parse(url)?);
        }
        let origin = match &self.base {
            Some(base) => base.clone(),
            None => web_sys::window()
                .ok_or_else(|| anyhow::anyhow!("no window available to resolve {url}"))?
                .location()
                .origin()
                .map_err(|e| anyhow::anyhow!("page origin unavailable: {e:?}"))?,
        };
        let base = reqwest::Url::parse(&format!("{}/", origin.trim_end_matches('/')))?;
        Ok(base.join(url)?)
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetSource for HttpSource {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        boxed_load(async move {
            let url = self.format_url(url)?;
            let response = reqwest::get(url).await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        })
    }
}

/// Snapshot of the manager's item counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LoadProgress {
    pub items_loaded: usize,
    pub items_failed: usize,
    pub items_total: usize,
}

type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/**
 * Shared by every loader of a [`crate::resources::LoaderRegistry`].
 *
 * It rewrites URLs through an exact-match override table (used to point the
 * DRACO decoder's helper files at bundler-provided locations), fetches bytes
 * from its [`AssetSource`] and keeps track of how many items were requested
 * and finished.
 */
pub struct AssetManager {
    source: Arc<dyn AssetSource>,
    url_overrides: HashMap<String, String>,
    loaded: AtomicUsize,
    failed: AtomicUsize,
    total: AtomicUsize,
    on_progress: Option<ProgressCallback>,
}

impl AssetManager {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            url_overrides: HashMap::new(),
            loaded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            on_progress: None,
        }
    }

    pub fn with_url_override(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.url_overrides.insert(from.into(), to.into());
        self
    }

    /// Called with `(url, items_loaded, items_total)` after every successful fetch.
    pub fn on_progress(mut self, callback: impl Fn(&str, usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn resolve_url<'a>(&'a self, url: &'a str) -> &'a str {
        self.url_overrides
            .get(url)
            .map_or(url, String::as_str)
    }

    pub async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let resolved = self.resolve_url(url);
        self.total.fetch_add(1, Ordering::SeqCst);
        log::debug!("fetching {resolved}");
        match self.source.fetch(resolved).await {
            Ok(bytes) => {
                let loaded = self.loaded.fetch_add(1, Ordering::SeqCst) + 1;
                let total = self.total.load(Ordering::SeqCst);
                log::debug!("loaded {resolved} ({loaded}/{total})");
                if let Some(callback) = &self.on_progress {
                    callback(resolved, loaded, total);
                }
                Ok(bytes)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                log::error!("failed to load {resolved}: {e:#}");
                Err(e)
            }
        }
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            items_loaded: self.loaded.load(Ordering::SeqCst),
            items_failed: self.failed.load(Ordering::SeqCst),
            items_total: self.total.load(Ordering::SeqCst),
        }
    }
}

/// Resolves `relative` against the directory of `base`, the way a glTF's external URIs are.
pub fn join_relative(base: &str, relative: &str) -> String {
    if relative.contains("://") || relative.starts_with("data:") || relative.starts_with('/') {
        return relative.to_string();
    }
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], relative),
        None => relative.to_string(),
    }
}

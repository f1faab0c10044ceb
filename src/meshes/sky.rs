//! Sky box with swappable texture themes.
//!
//! The sky is a large cube seen from the inside. Each theme is six images,
//! one per face, named `<theme>_<face>.png`.

use std::sync::Arc;

use cgmath::Rad;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    config::SkyAssets,
    data_structures::{
        model::{Material, Mesh, Model, Side},
        scene_graph::{ModelNode, SceneNode},
    },
    error::LoadError,
    resources::{
        LoaderRegistry,
        manager::{LoadFuture, boxed_load},
    },
};

pub const ALL_SKY_THEMES: [&str; 12] = [
    "rainbow", "arch3", "cave3", "dark", "hot", "sh", "skyast", "skyhsky", "skype", "sp2", "sp3",
    "tron",
];
pub const DEFAULT_SKY_THEME: &str = ALL_SKY_THEMES[0];
/// Face suffixes in the order of the cube's material slots (+x, -x, +y, -y, +z, -z).
pub const SKY_FACES: [&str; 6] = ["ft", "bk", "up", "dn", "rt", "lf"];
const SKY_SIZE: f32 = 1500.0;

/// What happens when theme switches overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapPolicy {
    /// Every switch applies its textures when they arrive; the last to finish wins.
    #[default]
    LastCompleted,
    /// Only the most recently requested theme is applied; older switches are dropped when they finish.
    LatestRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeOutcome {
    Applied,
    /// A newer switch was requested before this one finished loading.
    Superseded,
}

struct ThemeState {
    theme: String,
    latest_request: u64,
}

pub struct MeshSky {
    registry: Arc<LoaderRegistry>,
    texture_dir: String,
    policy: SwapPolicy,
    sky: Arc<Mutex<ModelNode>>,
    state: Arc<Mutex<ThemeState>>,
}

impl MeshSky {
    pub fn list_themes() -> &'static [&'static str] {
        &ALL_SKY_THEMES
    }

    /// The most recently requested theme, whether or not its textures arrived yet.
    pub fn theme(&self) -> String {
        self.state.lock().theme.clone()
    }

    pub fn policy(&self) -> SwapPolicy {
        self.policy
    }

    /**
     * Runs `f` with the sky node locked.
     *
     * A pending theme switch takes the same lock when its textures arrive, so
     * the node is only lent to a closure and never held across an `.await`.
     */
    pub fn with_mesh<R>(&self, f: impl FnOnce(&ModelNode) -> R) -> R {
        f(&self.sky.lock())
    }

    /// The six face materials currently in use.
    pub fn materials(&self) -> Vec<Material> {
        self.sky
            .lock()
            .model()
            .map(|model| model.materials.clone())
            .unwrap_or_default()
    }

    /**
     * Switches to `theme`.
     *
     * The name is recorded immediately. The returned future loads the six
     * face textures and swaps in the new materials once all of them arrived;
     * if any fails, the current materials stay. Nothing happens until the
     * future is polled.
     */
    pub fn set_theme(&self, theme: &str) -> anyhow::Result<LoadFuture<'static, ThemeOutcome>> {
        check_theme(theme)?;
        self.state.lock().theme = theme.to_string();
        self.update_theme(theme)
    }

    /// Loads and applies the textures of `theme` without changing the recorded name.
    pub fn update_theme(&self, theme: &str) -> anyhow::Result<LoadFuture<'static, ThemeOutcome>> {
        check_theme(theme)?;
        let token = {
            let mut state = self.state.lock();
            state.latest_request += 1;
            state.latest_request
        };

        let registry = self.registry.clone();
        let sky = self.sky.clone();
        let state = self.state.clone();
        let policy = self.policy;
        let urls = theme_urls(&self.texture_dir, theme);
        let theme = theme.to_string();
        Ok(boxed_load(async move {
            let materials = load_materials(&registry, &theme, &urls).await?;
            let state = state.lock();
            if policy == SwapPolicy::LatestRequested && state.latest_request != token {
                log::debug!("sky theme {theme} superseded by request {}", state.latest_request);
                return Ok(ThemeOutcome::Superseded);
            }
            if let Some(model) = sky.lock().model_mut() {
                model.materials = materials;
            }
            log::debug!("sky theme {theme} applied");
            Ok(ThemeOutcome::Applied)
        }))
    }
}

fn check_theme(theme: &str) -> anyhow::Result<()> {
    if !ALL_SKY_THEMES.contains(&theme) {
        return Err(LoadError::UnknownTheme(theme.to_string()).into());
    }
    Ok(())
}

pub fn theme_urls(texture_dir: &str, theme: &str) -> [String; 6] {
    let dir = texture_dir.trim_end_matches('/');
    SKY_FACES.map(|face| format!("{dir}/{theme}_{face}.png"))
}

async fn load_materials(
    registry: &LoaderRegistry,
    theme: &str,
    urls: &[String],
) -> anyhow::Result<Vec<Material>> {
    let maps = futures::future::try_join_all(urls.iter().map(|url| registry.load_texture(url))).await?;
    Ok(SKY_FACES
        .iter()
        .zip(maps)
        .map(|(face, map)| Material::basic(&format!("{theme}_{face}"), map, Side::Back))
        .collect())
}

/// Builds the sky cube and resolves once the default theme is shown.
pub async fn create_mesh_sky(registry: Arc<LoaderRegistry>, assets: &SkyAssets) -> anyhow::Result<MeshSky> {
    let model = Model {
        meshes: vec![Mesh::cuboid("sky", SKY_SIZE, SKY_SIZE, SKY_SIZE)],
        materials: SKY_FACES.iter().map(|face| Material::untextured(face)).collect(),
    };
    let mut sky = ModelNode::from_model(Some("sky"), model);
    let transform = sky.local_transform_mut();
    transform.rotate_y(Rad(2.9));
    transform.position.y = 38.0;
    sky.update_world_transform_all();

    let mesh_sky = MeshSky {
        registry,
        texture_dir: assets.texture_dir.clone(),
        policy: assets.swap_policy,
        sky: Arc::new(Mutex::new(sky)),
        state: Arc::new(Mutex::new(ThemeState {
            theme: DEFAULT_SKY_THEME.to_string(),
            latest_request: 0,
        })),
    };
    mesh_sky.set_theme(DEFAULT_SKY_THEME)?.await?;
    Ok(mesh_sky)
}

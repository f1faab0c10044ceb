//! Asset locations and runtime switches of the golf scene.
//!
//! Every field has a default, so a TOML file only needs to name what it
//! overrides:
//!
//! ```toml
//! asset_root = "static"
//!
//! [sky]
//! swap_policy = "latest_requested"
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::meshes::sky::SwapPolicy;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory (native) or base URL (web) asset URLs are relative to. Empty means the page origin.
    pub asset_root: String,
    pub boy: BoyAssets,
    pub ground: GroundAssets,
    pub sky: SkyAssets,
    pub draco: DracoAssets,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: "static".to_string(),
            boy: BoyAssets::default(),
            ground: GroundAssets::default(),
            sky: SkyAssets::default(),
            draco: DracoAssets::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoyAssets {
    pub character: String,
    pub club: String,
    /// Joint the club is attached to, after name sanitizing.
    pub hand_joint: String,
}

impl Default for BoyAssets {
    fn default() -> Self {
        Self {
            character: "models/mixamo-ty-golf_drive.fbx".to_string(),
            club: "models/sketchfab-golf_club_iron-optimize.glb".to_string(),
            hand_joint: "mixamorigLeftHand".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundAssets {
    pub model: String,
}

impl Default for GroundAssets {
    fn default() -> Self {
        Self {
            model: "models/sketchfab-golfplatz-optimize.glb".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyAssets {
    /// Holds `<theme>_<face>.png` for every theme.
    pub texture_dir: String,
    pub swap_policy: SwapPolicy,
}

impl Default for SkyAssets {
    fn default() -> Self {
        Self {
            texture_dir: "models/opengameart-skybox_elyvisions".to_string(),
            swap_policy: SwapPolicy::default(),
        }
    }
}

/// Where the DRACO decoder's helper files are really served from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DracoAssets {
    pub wrapper_url: String,
    pub decoder_url: String,
}

impl Default for DracoAssets {
    fn default() -> Self {
        Self {
            wrapper_url: "libs/draco/draco_wasm_wrapper.js".to_string(),
            decoder_url: "libs/draco/draco_decoder.wasm".to_string(),
        }
    }
}

impl SceneConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

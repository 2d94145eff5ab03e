use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use avatar_assets::{BlendOutcome, OverlayStats};
use serde::Serialize;

use crate::customization::BlendWeights;

/// One imported mesh with its composited texture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartRecord {
    pub request: String,
    pub model: PathBuf,
    pub texture: PathBuf,
    pub main_texture: String,
    pub second_texture: Option<String>,
    pub shape_keys: Option<[f32; 3]>,
    pub blend: BlendOutcome,
}

/// A feature stamped or blended into the head texture after import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecalRecord {
    pub feature: String,
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<OverlayStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportRequest {
    pub model: PathBuf,
    pub preview: Option<PathBuf>,
    pub rig: bool,
    pub vrc: bool,
    /// Directory a material combiner should work in when `vrc` is set.
    pub combine_dir: Option<PathBuf>,
}

/// Everything a 3D host needs to build and export the avatar.
#[derive(Debug, Clone, Serialize)]
pub struct SceneManifest {
    pub id: String,
    pub scratch: PathBuf,
    pub blend_weights: BlendWeights,
    pub parts: Vec<PartRecord>,
    pub decals: Vec<DecalRecord>,
    pub misses: Vec<String>,
    pub export: ExportRequest,
}

impl SceneManifest {
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing scene manifest")?;
        fs::write(path, json)
            .with_context(|| format!("writing scene manifest to {}", path.display()))
    }
}

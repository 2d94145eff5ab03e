use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use avatar_assets::OverlayParams;
use serde::Deserialize;

use crate::rules::SlotRules;

const DEFAULT_CONFIG: &str = include_str!("../assembly.json");

static NO_RULES: SlotRules = SlotRules {
    value: Vec::new(),
    pattern: Vec::new(),
};

/// Asset names the assembly order refers to directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedAssets {
    pub head_model: String,
    pub body_model: String,
    pub hand_models: Vec<String>,
    pub nail_models: Vec<String>,
    pub fallback_cuff_models: Vec<String>,
    /// Also the scratch file the face features are stamped into.
    pub head_texture: String,
    pub shaved_texture: String,
    pub fallback_texture: String,
    pub fallback_cuff_texture: String,
    pub nail_texture: String,
    pub buzzed_hair: String,
    pub hat_hair_suffix: String,
    pub garment_excludes: Vec<String>,
    /// One include list per cuff side, left first.
    pub cuff_includes: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    pub eyes: Vec<OverlayParams>,
    pub mouth: Vec<OverlayParams>,
    pub eyebrows: Vec<OverlayParams>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyConfig {
    pub assets: FixedAssets,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotRules>,
}

impl AssemblyConfig {
    pub fn embedded() -> Result<Self> {
        serde_json::from_str(DEFAULT_CONFIG).context("parsing built-in assembly table")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading assembly table {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("parsing assembly table {}", path.display()))
    }

    /// Loads `path` when given, otherwise the table compiled into the binary.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Self::embedded(),
        }
    }

    pub fn slot(&self, name: &str) -> &SlotRules {
        self.slots.get(name).unwrap_or(&NO_RULES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_assets::CutoffMode;

    #[test]
    fn embedded_table_parses() {
        let config = AssemblyConfig::embedded().unwrap();
        assert_eq!(config.assets.head_texture, "Avatar_Head_BaseColor.png");
        assert_eq!(config.assets.cuff_includes.len(), 2);
        assert_eq!(config.features.eyes.len(), 2);
        assert!(config.features.eyes[1].flip_x);
        assert!(config
            .features
            .eyebrows
            .iter()
            .all(|params| params.mode == CutoffMode::Alpha));
        assert!((config.features.mouth[0].scale - 0.28).abs() < 1e-6);
    }

    #[test]
    fn embedded_rules_cover_special_cases() {
        let config = AssemblyConfig::embedded().unwrap();

        let jacket = config.slot("Jacket").choose("Biker_Jacket", BTreeMap::new());
        assert_eq!(jacket.value, "Jacket");
        assert_eq!(jacket.overrides.exact, Some(true));
        assert_eq!(jacket.overrides.cuff_model.as_deref(), Some("Jacket_Cuffs"));

        let brows = config.slot("Eyebrows").choose("Eyebrow_Arched_Thick_01", BTreeMap::new());
        assert_eq!(brows.value, "ArchBushy_001");

        let top = config.slot("Top").choose("V-Neck_Shirt_001", BTreeMap::new());
        assert_eq!(top.value, "VNeck_Shirt_001");

        let mut backwards = BTreeMap::new();
        backwards.insert(
            "GeoVariants_BaseballCap_002".to_string(),
            "GeoVariant_Backwards".to_string(),
        );
        let hat = config.slot("Hat").choose("Hat_BaseballCap_Snapback_001", backwards);
        assert_eq!(hat.value, "Hat_BaseballCap_Snapback_Backwards_001");
        assert_eq!(
            hat.overrides.main_texture.as_deref(),
            Some("BaseballCap_Snapback_002_Mat_BaseColor.png")
        );
    }

    #[test]
    fn unknown_slot_has_no_rules() {
        let config = AssemblyConfig::embedded().unwrap();
        let choice = config.slot("Bottom").choose("Jeans_001", BTreeMap::new());
        assert_eq!(choice.value, "Jeans_001");
        assert_eq!(choice.overrides, Default::default());
    }
}

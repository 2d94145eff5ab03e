use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use avatar_assets::resolve::entry_matches;
use avatar_assets::ColorVector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::AssemblyError;

pub const DEFAULT_JACKET_COLOR: &str = "Generic Jacket Secondary Color";

/// Named colors chosen by the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Palette(pub BTreeMap<String, ColorVector>);

impl Palette {
    pub fn get(&self, name: &str) -> Option<ColorVector> {
        self.0.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<ColorVector, AssemblyError> {
        self.get(name)
            .ok_or_else(|| AssemblyError::MissingColor(name.to_string()))
    }

    /// First palette entry whose name contains the jacket value, falling back
    /// to the generic jacket color.
    pub fn jacket_color(&self, jacket: &str) -> &str {
        self.0
            .keys()
            .find(|key| entry_matches(key, jacket))
            .map(String::as_str)
            .unwrap_or(DEFAULT_JACKET_COLOR)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Selection {
    pub value: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Shape-key weights in the order the meshes declare their keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BlendWeights {
    pub face: [f32; 3],
    pub body: [f32; 3],
    pub neck: [f32; 3],
}

impl BlendWeights {
    pub const FACE_KEYS: [&'static str; 3] = ["Pointy", "Square", "Chiseled"];
    pub const BODY_KEYS: [&'static str; 3] = ["Pear", "Triangle", "Hourglass"];
    pub const NECK_KEYS: [&'static str; 3] = [
        "Neck_Shoulders_Tuck_In",
        "Neck_Shoulders_High",
        "Neck_Shoulders_Wide",
    ];

    pub fn saturated() -> Self {
        Self {
            face: [1.0; 3],
            body: [1.0; 3],
            neck: [1.0; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Customization {
    pub color_palette: Palette,
    pub selections: BTreeMap<String, Selection>,
    pub blend_sets: BTreeMap<String, BTreeMap<String, f32>>,
}

/// A parsed customization plus the hash that names its scratch directory.
#[derive(Debug, Clone)]
pub struct CustomizationInput {
    pub customization: Customization,
    pub hash: String,
}

impl CustomizationInput {
    /// Reads from `path`, or stdin when the path is `-`.
    pub fn read(path: &Path) -> Result<Self> {
        let mut raw = String::new();
        if path == Path::new("-") {
            io::stdin()
                .read_to_string(&mut raw)
                .context("reading customization from stdin")?;
        } else {
            let file = File::open(path)
                .with_context(|| format!("opening customization {}", path.display()))?;
            BufReader::new(file)
                .read_to_string(&mut raw)
                .with_context(|| format!("reading customization {}", path.display()))?;
        }
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("parsing customization JSON")?;
        let hash = content_hash(&value)?;
        let customization =
            serde_json::from_value(value).context("decoding customization fields")?;
        Ok(Self {
            customization,
            hash,
        })
    }
}

/// SHA-256 of the compact serialization with object keys sorted, as
/// lower-case hex.
pub fn content_hash(value: &Value) -> Result<String> {
    let canonical = serde_json::to_vec(value).context("serializing customization for hashing")?;
    let digest: [u8; 32] = Sha256::digest(&canonical).into();
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

impl Customization {
    pub fn selection(&self, slot: &str) -> Option<&Selection> {
        self.selections.get(slot)
    }

    /// Selected value with spaces turned into underscores; an absent slot
    /// reads as `No_<slot>`.
    pub fn slot_value(&self, slot: &str) -> String {
        match self.selection(slot) {
            Some(selection) => selection.value.replace(' ', "_"),
            None => format!("No_{}", slot.replace(' ', "_")),
        }
    }

    pub fn slot_properties(&self, slot: &str) -> BTreeMap<String, String> {
        self.selection(slot)
            .map(|selection| selection.properties.clone())
            .unwrap_or_default()
    }

    pub fn property(&self, slot: &str, key: &str) -> Option<&str> {
        self.selection(slot)
            .and_then(|selection| selection.properties.get(key))
            .map(String::as_str)
    }

    pub fn blend_weights(&self, thicc: bool) -> Result<BlendWeights, AssemblyError> {
        if thicc {
            return Ok(BlendWeights::saturated());
        }
        let neck = match self.blend_sets.get("NeckArea") {
            Some(_) => self.weights("NeckArea", BlendWeights::NECK_KEYS)?,
            None => [0.0; 3],
        };
        Ok(BlendWeights {
            face: self.weights("FaceShape", BlendWeights::FACE_KEYS)?,
            body: self.weights("BodyShape", BlendWeights::BODY_KEYS)?,
            neck,
        })
    }

    fn weights(&self, set: &'static str, keys: [&'static str; 3]) -> Result<[f32; 3], AssemblyError> {
        let entries = self.blend_sets.get(set);
        let mut out = [0.0; 3];
        for (slot, key) in out.iter_mut().zip(keys) {
            *slot = entries
                .and_then(|entries| entries.get(key))
                .copied()
                .ok_or(AssemblyError::MissingBlendWeight { set, key })?;
        }
        Ok(out)
    }
}

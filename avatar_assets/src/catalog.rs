use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use walkdir::WalkDir;

/// Asset folders the assembler draws from, relative to the asset root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Model,
    Texture,
    Eye,
    Mouth,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Model,
        AssetKind::Texture,
        AssetKind::Eye,
        AssetKind::Mouth,
    ];

    pub fn relative_dir(self) -> &'static str {
        match self {
            AssetKind::Model => "Models",
            AssetKind::Texture => "Textures",
            AssetKind::Eye => "Textures/eyes",
            AssetKind::Mouth => "Textures/mouths",
        }
    }

    /// Extension appended to an exact-mode query, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Model => "fbx",
            AssetKind::Texture | AssetKind::Eye | AssetKind::Mouth => "png",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Texture => "texture",
            AssetKind::Eye => "eye",
            AssetKind::Mouth => "mouth",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub models: usize,
    pub textures: usize,
    pub eyes: usize,
    pub mouths: usize,
}

/// Sorted, read-only filename listings for every asset folder.
///
/// Listings are captured once and never change afterwards; the resolution
/// cascade relies on the ascending order for its tie-breaks.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    root: PathBuf,
    listings: BTreeMap<AssetKind, Vec<String>>,
}

impl Catalog {
    /// Reads the four asset folders below `root`. A missing folder yields an
    /// empty listing; a missing root is an error.
    pub fn load_from_root<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            bail!("asset root {} is not a directory", root.display());
        }

        let mut listings = BTreeMap::new();
        for kind in AssetKind::ALL {
            let dir = root.join(kind.relative_dir());
            let names = if dir.is_dir() {
                list_files(&dir)
                    .with_context(|| format!("listing {} folder {}", kind, dir.display()))?
            } else {
                log::warn!("{} folder {} is missing", kind, dir.display());
                Vec::new()
            };
            listings.insert(kind, names);
        }

        Ok(Self::from_listings(root, listings))
    }

    /// Builds a catalog from listings gathered elsewhere. Each listing is
    /// sorted and deduplicated.
    pub fn from_listings<P, I, S>(root: P, listings: I) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = (AssetKind, Vec<S>)>,
        S: Into<String>,
    {
        let mut sorted: BTreeMap<AssetKind, Vec<String>> = AssetKind::ALL
            .iter()
            .map(|&kind| (kind, Vec::new()))
            .collect();
        for (kind, names) in listings {
            let entry = sorted.entry(kind).or_default();
            entry.extend(names.into_iter().map(Into::into));
        }
        for names in sorted.values_mut() {
            names.sort();
            names.dedup();
        }
        Self {
            root: root.into(),
            listings: sorted,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self, kind: AssetKind) -> &[String] {
        self.listings
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, kind: AssetKind, name: &str) -> bool {
        self.entries(kind)
            .binary_search_by(|entry| entry.as_str().cmp(name))
            .is_ok()
    }

    /// Location of `name` inside the folder for `kind`. The file is not
    /// required to exist.
    pub fn path_of(&self, kind: AssetKind, name: &str) -> PathBuf {
        self.root.join(kind.relative_dir()).join(name)
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            models: self.entries(AssetKind::Model).len(),
            textures: self.entries(AssetKind::Texture).len(),
            eyes: self.entries(AssetKind::Eye).len(),
            mouths: self.entries(AssetKind::Mouth).len(),
        }
    }
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_string()),
            None => log::warn!("skipping non UTF-8 file name in {}", dir.display()),
        }
    }
    names.sort();
    Ok(names)
}

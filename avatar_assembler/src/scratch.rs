use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Per-customization working directory, `<tmp_root>/<hash>/textures`.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    textures: PathBuf,
}

impl ScratchDir {
    pub fn new(tmp_root: &Path, hash: &str) -> Self {
        let root = tmp_root.join(hash);
        let textures = root.join("textures");
        Self { root, textures }
    }

    /// Creates the texture directory. Unless `reuse` is set, composites left
    /// by an earlier run are removed first; the head texture is blended in
    /// place and would otherwise accumulate.
    pub fn prepare(&self, reuse: bool) -> Result<()> {
        if !reuse && self.root.exists() {
            log::info!("clearing scratch directory {}", self.root.display());
            fs::remove_dir_all(&self.root)
                .with_context(|| format!("clearing {}", self.root.display()))?;
        }
        fs::create_dir_all(&self.textures)
            .with_context(|| format!("creating {}", self.textures.display()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn textures(&self) -> &Path {
        &self.textures
    }

    pub fn texture(&self, file_name: &str) -> PathBuf {
        self.textures.join(file_name)
    }
}

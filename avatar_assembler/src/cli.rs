use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

const DEFAULT_MANIFEST_NAME: &str = "avatar.json";

#[derive(Parser, Debug)]
#[command(
    about = "Resolves avatar parts against an asset catalog and composites their textures",
    version
)]
pub struct Args {
    /// Customization JSON to read, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Scene manifest to write; a directory gets avatar.json
    #[arg(short, long, default_value = "Exports/avatar.json")]
    pub output: PathBuf,

    /// Directory holding the Models and Textures folders
    #[arg(long, default_value = ".")]
    pub asset_root: PathBuf,

    /// Directory for per-customization scratch textures
    #[arg(long, default_value = "tmp")]
    pub tmp_root: PathBuf,

    /// Assembly rule table to use instead of the built-in one
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Request a preview render next to the output
    #[arg(short, long)]
    pub preview: bool,

    /// Force every shape-key weight to 1
    #[arg(short, long)]
    pub thicc: bool,

    /// Request an auto-rigged export
    #[arg(short, long)]
    pub rig: bool,

    /// Request a VRChat-optimized export (implies --rig)
    #[arg(short = 'c', long)]
    pub vrc: bool,

    /// Keep composites from an earlier run of the same customization
    #[arg(long)]
    pub reuse_scratch: bool,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    pub output: PathBuf,
    pub asset_root: PathBuf,
    pub tmp_root: PathBuf,
    pub config: Option<PathBuf>,
    pub preview: bool,
    pub thicc: bool,
    pub rig: bool,
    pub vrc: bool,
    pub reuse_scratch: bool,
}

pub fn parse() -> Result<Options> {
    let args = Args::parse();
    args.into_options()
}

impl Args {
    pub fn into_options(self) -> Result<Options> {
        if self.input != Path::new("-") && !self.input.exists() {
            bail!("input file {} doesn't exist", self.input.display());
        }
        let output = resolve_output(&self.output)?;

        Ok(Options {
            input: self.input,
            output,
            asset_root: self.asset_root,
            tmp_root: self.tmp_root,
            config: self.config,
            preview: self.preview,
            thicc: self.thicc,
            rig: self.rig || self.vrc,
            vrc: self.vrc,
            reuse_scratch: self.reuse_scratch,
        })
    }
}

/// An empty output means the current directory; a directory gets the
/// default manifest name appended. The result is absolute.
fn resolve_output(output: &Path) -> Result<PathBuf> {
    let mut output = if output.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        output.to_path_buf()
    };
    if output.is_dir() {
        output.push(DEFAULT_MANIFEST_NAME);
    }
    if output.is_relative() {
        let cwd = std::env::current_dir().context("resolving current directory")?;
        output = cwd.join(output);
    }
    Ok(output)
}

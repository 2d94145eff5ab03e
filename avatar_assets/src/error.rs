use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::AssetKind;

/// Failures raised while compositing or moving pixel buffers to and from disk.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("buffer dimensions differ: primary is {primary:?}, secondary is {secondary:?}")]
    DimensionMismatch {
        primary: (u32, u32),
        secondary: (u32, u32),
    },
    #[error("{width}x{height} buffer needs {expected} samples but got {actual}")]
    SampleCount {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("loading image {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("encoding image {}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("writing {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// No catalog entry matched any stage of a cascade. Callers log it and skip
/// the feature; it never aborts an assembly on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {kind} matches found for {query}")]
pub struct ResolutionMiss {
    pub kind: AssetKind,
    pub query: String,
}

pub mod catalog;
pub mod composite;
pub mod error;
pub mod image_io;
pub mod pixels;
pub mod resolve;
pub mod texture;

pub use catalog::{AssetKind, Catalog, CatalogStats};
pub use composite::{CutoffMode, OverlayParams, OverlayStats, blend, overlay};
pub use error::{CompositeError, ResolutionMiss};
pub use image_io::{ImageStore, PngStore};
pub use pixels::{ColorVector, PixelBuffer};
pub use resolve::{
    BASE_COLOR_MARKER, Cascade, MatchQuery, QueryTransform, Resolution, Resolver,
    select_base_color,
};
pub use texture::{BlendOutcome, SecondaryLayer, blend_texture, overlay_texture};

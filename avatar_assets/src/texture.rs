//! File-level compositing: load, run an engine operation, persist.

use std::path::Path;

use serde::Serialize;

use crate::composite::{self, OverlayParams, OverlayStats};
use crate::error::CompositeError;
use crate::image_io::ImageStore;
use crate::pixels::ColorVector;

/// Second image mixed over the primary by [`blend_texture`].
#[derive(Debug, Clone, Copy)]
pub struct SecondaryLayer<'a> {
    pub path: &'a Path,
    pub tint: ColorVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendOutcome {
    /// The primary file was rewritten with the result.
    UpdatedInPlace,
    /// A new file was written at the destination.
    Created,
    /// The destination already existed and was left alone.
    AlreadyPresent,
}

/// Blends `primary` (and an optional secondary layer) and persists the result.
///
/// Without a destination the primary file is overwritten. With one, the
/// result is written there only if nothing exists yet, so repeating the call
/// is a no-op.
pub fn blend_texture(
    store: &impl ImageStore,
    primary: &Path,
    tint: ColorVector,
    secondary: Option<SecondaryLayer<'_>>,
    destination: Option<&Path>,
) -> Result<BlendOutcome, CompositeError> {
    if let Some(destination) = destination {
        if store.exists(destination) {
            log::debug!("blend target {} already present", destination.display());
            return Ok(BlendOutcome::AlreadyPresent);
        }
    }

    let mut buffer = store.load(primary)?;
    let layer = match secondary {
        Some(layer) => Some((store.load(layer.path)?, layer.tint)),
        None => None,
    };
    composite::blend(
        &mut buffer,
        tint,
        layer.as_ref().map(|(pixels, layer_tint)| (pixels, *layer_tint)),
    )?;

    match destination {
        Some(destination) => {
            store.save(&buffer, destination)?;
            Ok(BlendOutcome::Created)
        }
        None => {
            store.save(&buffer, primary)?;
            Ok(BlendOutcome::UpdatedInPlace)
        }
    }
}

/// Stamps `stamp` into `primary` and writes the primary file back.
pub fn overlay_texture(
    store: &impl ImageStore,
    primary: &Path,
    stamp: &Path,
    params: &OverlayParams,
) -> Result<OverlayStats, CompositeError> {
    let mut buffer = store.load(primary)?;
    let stamp_buffer = store.load(stamp)?;
    let stats = composite::overlay(&mut buffer, &stamp_buffer, params);
    if stats.clipped > 0 {
        log::warn!(
            "{} stamp pixels from {} fell outside {}",
            stats.clipped,
            stamp.display(),
            primary.display()
        );
    }
    store.save(&buffer, primary)?;
    Ok(stats)
}

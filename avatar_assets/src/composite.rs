use serde::{Deserialize, Serialize};

use crate::error::CompositeError;
use crate::pixels::{ColorVector, PixelBuffer};

/// How an overlay decides which stamp pixels are background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffMode {
    /// Skip pixels whose RGB is within `cutoff` (squared distance) of the
    /// stamp's first pixel.
    #[default]
    Compare,
    /// Skip pixels whose alpha is below `cutoff`.
    Alpha,
}

/// Tints `primary` and, when a secondary layer is given, mixes it in using
/// the secondary's own untinted alpha as the weight:
///
/// `out[c] = primary[c] * tint[c] * (1 - a) + secondary[c] * secondary_tint[c] * a`
///
/// The alpha channel is mixed with the same formula. Buffers must share
/// dimensions; on mismatch `primary` is left untouched.
pub fn blend(
    primary: &mut PixelBuffer,
    tint: ColorVector,
    secondary: Option<(&PixelBuffer, ColorVector)>,
) -> Result<(), CompositeError> {
    if let Some((layer, _)) = secondary {
        if layer.dimensions() != primary.dimensions() {
            return Err(CompositeError::DimensionMismatch {
                primary: primary.dimensions(),
                secondary: layer.dimensions(),
            });
        }
    }

    primary.tint(tint);

    let Some((layer, layer_tint)) = secondary else {
        return Ok(());
    };
    let factors = layer_tint.channels();
    for (dst, src) in primary
        .samples_mut()
        .chunks_exact_mut(4)
        .zip(layer.pixels())
    {
        let weight = src[3];
        for channel in 0..4 {
            dst[channel] = dst[channel] * (1.0 - weight) + src[channel] * factors[channel] * weight;
        }
    }
    Ok(())
}

fn default_scale() -> f32 {
    1.0
}

/// Placement of a stamp inside a primary texture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayParams {
    pub cutoff: f32,
    /// Origin as fractions of the primary buffer's width and height.
    pub uv: [f32; 2],
    /// Multiplier applied to stamp pixel coordinates.
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub tint: ColorVector,
    #[serde(default)]
    pub mode: CutoffMode,
}

impl OverlayParams {
    pub fn new(cutoff: f32, uv: [f32; 2], scale: f32) -> Self {
        Self {
            cutoff,
            uv,
            scale,
            flip_x: false,
            tint: ColorVector::WHITE,
            mode: CutoffMode::Compare,
        }
    }

    pub fn flipped(mut self, flip_x: bool) -> Self {
        self.flip_x = flip_x;
        self
    }

    pub fn with_tint(mut self, tint: ColorVector) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_mode(mut self, mode: CutoffMode) -> Self {
        self.mode = mode;
        self
    }

    /// Destination coordinate in the primary buffer for stamp pixel
    /// `(x2, y2)`. May fall outside the primary buffer.
    pub fn destination(
        &self,
        primary: (u32, u32),
        stamp_width: u32,
        x2: u32,
        y2: u32,
    ) -> (i64, i64) {
        let column = if self.flip_x {
            f64::from(stamp_width) - f64::from(x2)
        } else {
            f64::from(x2)
        };
        let scale = f64::from(self.scale);
        // Half-pixel positions round to the even neighbour.
        let x1 = (f64::from(self.uv[0]) * f64::from(primary.0) + column * scale).round_ties_even();
        let y1 = (f64::from(self.uv[1]) * f64::from(primary.1) + f64::from(y2) * scale).round_ties_even();
        (x1 as i64, y1 as i64)
    }

    fn keeps(&self, pixel: &[f32], reference: &[f32]) -> bool {
        match self.mode {
            CutoffMode::Compare => squared_rgb_distance(pixel, reference) >= self.cutoff,
            CutoffMode::Alpha => pixel[3] >= self.cutoff,
        }
    }
}

fn squared_rgb_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .take(3)
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverlayStats {
    pub written: usize,
    pub masked: usize,
    /// Kept pixels whose destination fell outside the primary buffer.
    pub clipped: usize,
}

/// Stamps the kept pixels of `stamp` into `primary`, overwriting all four
/// channels with the tinted stamp color. Several stamp pixels may land on the
/// same destination when `scale` is below one; the last one wins.
pub fn overlay(primary: &mut PixelBuffer, stamp: &PixelBuffer, params: &OverlayParams) -> OverlayStats {
    let mut stats = OverlayStats::default();
    let Some(reference) = stamp.pixels().next() else {
        return stats;
    };
    let stamp_width = stamp.width();
    let primary_dims = primary.dimensions();
    let factors = params.tint.channels();

    for (index, pixel) in stamp.pixels().enumerate() {
        if !params.keeps(pixel, reference) {
            stats.masked += 1;
            continue;
        }

        let x2 = (index % stamp_width as usize) as u32;
        let y2 = (index / stamp_width as usize) as u32;
        let (x1, y1) = params.destination(primary_dims, stamp_width, x2, y2);
        let (Ok(x1), Ok(y1)) = (u32::try_from(x1), u32::try_from(y1)) else {
            stats.clipped += 1;
            continue;
        };

        let tinted = [
            pixel[0] * factors[0],
            pixel[1] * factors[1],
            pixel[2] * factors[2],
            pixel[3] * factors[3],
        ];
        if primary.set_pixel(x1, y1, tinted) {
            stats.written += 1;
        } else {
            stats.clipped += 1;
        }
    }
    stats
}

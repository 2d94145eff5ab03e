use std::slice::ChunksExact;

use serde::{Deserialize, Serialize};

use crate::error::CompositeError;

/// Per-channel RGBA multiplier. Values are taken as given; nothing clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorVector(pub [f32; 4]);

impl ColorVector {
    pub const WHITE: ColorVector = ColorVector([1.0, 1.0, 1.0, 1.0]);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([r, g, b, a])
    }

    pub fn channels(&self) -> [f32; 4] {
        self.0
    }
}

impl Default for ColorVector {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for ColorVector {
    fn from(value: [f32; 4]) -> Self {
        Self(value)
    }
}

/// Flat RGBA float raster.
///
/// Row 0 is the bottom row of the image so that pixel coordinates line up
/// with texture UV space; [`crate::PngStore`] flips rows on load and save.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0.0; 4])
    }

    pub fn filled(width: u32, height: u32, pixel: [f32; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut samples = Vec::with_capacity(count * 4);
        for _ in 0..count {
            samples.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            samples,
        }
    }

    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, CompositeError> {
        let expected = width as usize * height as usize * 4;
        if samples.len() != expected {
            return Err(CompositeError::SampleCount {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn pixels(&self) -> ChunksExact<'_, f32> {
        self.samples.chunks_exact(4)
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        let start = self.offset(x, y)?;
        let mut out = [0.0; 4];
        out.copy_from_slice(&self.samples[start..start + 4]);
        Some(out)
    }

    /// Overwrites one pixel; returns false when the coordinate is outside the
    /// buffer.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [f32; 4]) -> bool {
        match self.offset(x, y) {
            Some(start) => {
                self.samples[start..start + 4].copy_from_slice(&pixel);
                true
            }
            None => false,
        }
    }

    /// Multiplies every pixel component-wise by `tint`.
    pub fn tint(&mut self, tint: ColorVector) {
        for pixel in self.samples.chunks_exact_mut(4) {
            for (sample, factor) in pixel.iter_mut().zip(tint.0) {
                *sample *= factor;
            }
        }
    }
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};

use crate::error::CompositeError;
use crate::pixels::PixelBuffer;

/// Loads and persists pixel buffers for the compositing helpers in
/// [`crate::texture`].
pub trait ImageStore {
    fn load(&self, path: &Path) -> Result<PixelBuffer, CompositeError>;

    fn save(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), CompositeError>;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// PNG files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngStore;

impl ImageStore for PngStore {
    fn load(&self, path: &Path) -> Result<PixelBuffer, CompositeError> {
        let image = image::open(path).map_err(|source| CompositeError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = image.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let raw = rgba.into_raw();

        // PNG rows run top to bottom; buffers keep the bottom row first.
        let row_len = width as usize * 4;
        let mut samples = Vec::with_capacity(raw.len());
        if row_len > 0 {
            for row in raw.chunks_exact(row_len).rev() {
                samples.extend_from_slice(row);
            }
        }
        PixelBuffer::from_samples(width, height, samples)
    }

    fn save(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), CompositeError> {
        let data = encode_rgba8(buffer);
        let file = File::create(path).map_err(|source| CompositeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        PngEncoder::new(&mut writer)
            .write_image(&data, buffer.width(), buffer.height(), ColorType::Rgba8.into())
            .map_err(|source| CompositeError::Save {
                path: path.to_path_buf(),
                source,
            })?;
        // Dropping the writer would discard a failed final flush.
        writer.flush().map_err(|source| CompositeError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Quantizes to 8-bit RGBA in top-to-bottom row order. Samples outside
/// `[0, 1]` saturate here, the only place they are clamped.
fn encode_rgba8(buffer: &PixelBuffer) -> Vec<u8> {
    let row_len = buffer.width() as usize * 4;
    let mut data = Vec::with_capacity(buffer.samples().len());
    if row_len == 0 {
        return data;
    }
    for row in buffer.samples().chunks_exact(row_len).rev() {
        data.extend(row.iter().map(|&sample| quantize(sample)));
    }
    data
}

fn quantize(sample: f32) -> u8 {
    (sample.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn png_round_trip_keeps_bottom_row_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strip.png");
        let mut buffer = PixelBuffer::new(1, 2);
        buffer.set_pixel(0, 0, [1.0, 0.0, 0.0, 1.0]);
        buffer.set_pixel(0, 1, [0.0, 0.0, 1.0, 1.0]);
        PngStore.save(&buffer, &path).unwrap();

        // The top row on disk is the last buffer row.
        let on_disk = image::open(&path).unwrap().to_rgba8();
        assert_eq!(on_disk.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(on_disk.get_pixel(0, 1).0, [255, 0, 0, 255]);

        let loaded = PngStore.load(&path).unwrap();
        assert_eq!(loaded, buffer);
    }

    #[test]
    fn out_of_range_samples_saturate_on_save() {
        assert_eq!(quantize(1.7), 255);
        assert_eq!(quantize(-0.2), 0);
        assert_eq!(quantize(0.5), 128);
    }

    #[test]
    fn missing_file_reports_load_error() {
        let dir = tempdir().unwrap();
        let err = PngStore.load(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, CompositeError::Load { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn save_reports_write_failures() {
        let buffer = PixelBuffer::filled(8, 8, [0.5; 4]);
        let err = PngStore.save(&buffer, Path::new("/dev/full")).unwrap_err();
        assert!(
            matches!(err, CompositeError::Io { .. } | CompositeError::Save { .. }),
            "unexpected error {err:?}"
        );
    }
}

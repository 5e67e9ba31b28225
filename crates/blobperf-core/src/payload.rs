//! Random image payloads.
//!
//! A payload is a JPEG of uniform RGB noise. Its pixel count is planned from
//! the size ceiling with a 3-bytes-per-pixel estimate, so the encoded size is
//! only loosely tied to the ceiling: compression usually lands below it and
//! nothing forces it to stay there.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use rand::Rng;

use crate::error::{BenchError, BenchResult};

/// Bytes per pixel assumed when sizing the image.
pub const BYTES_PER_PIXEL: u64 = 3;
/// Shrinks the width ceiling below `sqrt(max_pixels)`.
pub const WIDTH_SAFETY_FACTOR: f64 = 0.8;
/// Preferred lower bound for both dimensions.
pub const MIN_DIMENSION: u32 = 100;
/// JPEG quality used for every payload.
pub const JPEG_QUALITY: u8 = 95;
/// Default size ceiling in MB.
pub const DEFAULT_MAX_SIZE_MB: f64 = 5.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a byte count to MB (`len / 2^20`).
pub fn bytes_to_mb(len: usize) -> f64 {
    len as f64 / BYTES_PER_MB
}

/// Width and height of a payload image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Uncompressed size estimate used for planning.
    pub fn estimated_bytes(&self) -> u64 {
        self.pixels() * BYTES_PER_PIXEL
    }
}

/// Pixel budget derived from a size ceiling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBudget {
    max_pixels: u64,
    width_ceiling: u32,
}

impl PixelBudget {
    /// Budget for `max_size_mb`. The ceiling must be a positive finite number.
    ///
    /// Ceilings too small for a 100×100 image lower the floor instead of
    /// failing; the smallest plan is 1×1.
    pub fn for_size_mb(max_size_mb: f64) -> BenchResult<Self> {
        if !max_size_mb.is_finite() || max_size_mb <= 0.0 {
            return Err(BenchError::Config(format!(
                "max size must be a positive number of MB, got {max_size_mb}"
            )));
        }
        let max_bytes = (max_size_mb * BYTES_PER_MB).floor() as u64;
        let max_pixels = (max_bytes / BYTES_PER_PIXEL).max(1);
        let width_ceiling = ((max_pixels as f64).sqrt() * WIDTH_SAFETY_FACTOR).floor() as u64;
        let width_ceiling = width_ceiling.clamp(1, u64::from(u32::MAX)) as u32;
        Ok(Self {
            max_pixels,
            width_ceiling,
        })
    }

    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    pub fn width_ceiling(&self) -> u32 {
        self.width_ceiling
    }

    /// Draw dimensions: width uniform in `[100, width_ceiling]`, then height
    /// uniform in `[100, max_pixels / width]`, with the floors lowered when
    /// the budget is smaller. `width * height <= max_pixels` always holds.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Dimensions {
        let width_floor = MIN_DIMENSION.min(self.width_ceiling);
        let width = rng.gen_range(width_floor..=self.width_ceiling);

        let height_ceiling = (self.max_pixels / u64::from(width))
            .clamp(1, u64::from(u32::MAX)) as u32;
        let height_floor = MIN_DIMENSION.min(height_ceiling);
        let height = rng.gen_range(height_floor..=height_ceiling);

        Dimensions { width, height }
    }
}

/// An encoded payload ready for upload.
#[derive(Clone, Debug)]
pub struct Payload {
    bytes: Bytes,
    dimensions: Dimensions,
}

impl Payload {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.bytes.len())
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Produces random JPEG payloads under a size ceiling.
#[derive(Clone, Debug)]
pub struct PayloadGenerator {
    budget: PixelBudget,
    quality: u8,
}

impl PayloadGenerator {
    pub fn new(max_size_mb: f64) -> BenchResult<Self> {
        Ok(Self {
            budget: PixelBudget::for_size_mb(max_size_mb)?,
            quality: JPEG_QUALITY,
        })
    }

    pub fn budget(&self) -> &PixelBudget {
        &self.budget
    }

    /// Generate one payload. Every pixel gets independent uniform R, G and B
    /// bytes from `rng`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> BenchResult<Payload> {
        let dimensions = self.budget.sample(rng);
        let bytes = encode_noise(dimensions, self.quality, rng)?;
        let payload = Payload {
            bytes: Bytes::from(bytes),
            dimensions,
        };
        tracing::info!(
            "Generated random image: {}x{} pixels, {:.2} MB",
            dimensions.width,
            dimensions.height,
            payload.size_mb()
        );
        Ok(payload)
    }
}

fn encode_noise<R: Rng + ?Sized>(
    dimensions: Dimensions,
    quality: u8,
    rng: &mut R,
) -> BenchResult<Vec<u8>> {
    let mut raw = vec![0u8; (dimensions.estimated_bytes()) as usize];
    rng.fill_bytes(&mut raw);
    let image = RgbImage::from_raw(dimensions.width, dimensions.height, raw)
        .ok_or_else(|| BenchError::Internal("pixel buffer does not match dimensions".into()))?;

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&image)?;
    Ok(out)
}

// media/compress.rs - Iterative JPEG re-encoding until a photo fits a byte budget
//
// Each attempt encodes once. Quality drops first, clamped at min_quality; once quality is
// at the floor the dimensions shrink by scale_factor instead. The loop stops at the first
// encode that fits or after max_attempts encodes, returning the smallest result seen.

use crate::error::MediaError;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Byte ceiling for the encoded JPEG.
    pub max_bytes: usize,
    /// Longest side, in pixels, before the first attempt.
    pub max_dimension: u32,
    pub initial_quality: u8,
    pub min_quality: u8,
    pub quality_step: u8,
    /// Factor applied to both sides once quality can drop no further. Must be in (0, 1).
    pub scale_factor: f32,
    pub max_attempts: u32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_bytes: 1024 * 1024,
            max_dimension: 1920,
            initial_quality: 80,
            min_quality: 40,
            quality_step: 10,
            scale_factor: 0.8,
            max_attempts: 10,
        }
    }
}

impl CompressionOptions {
    pub fn validate(&self) -> Result<(), MediaError> {
        let invalid = |reason: &str| Err(MediaError::InvalidOptions(reason.to_string()));

        if self.max_bytes == 0 {
            return invalid("max_bytes must be greater than zero");
        }
        if self.max_dimension == 0 {
            return invalid("max_dimension must be greater than zero");
        }
        if self.min_quality == 0 || self.initial_quality > 100 {
            return invalid("quality must be between 1 and 100");
        }
        if self.min_quality > self.initial_quality {
            return invalid("min_quality must not exceed initial_quality");
        }
        if self.quality_step == 0 {
            return invalid("quality_step must be greater than zero");
        }
        if !(self.scale_factor > 0.0 && self.scale_factor < 1.0) {
            return invalid("scale_factor must be between 0 and 1");
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Number of encodes performed, including the returned one.
    pub attempts: u32,
    pub within_budget: bool,
}

pub fn compress_image(
    input: &[u8],
    options: &CompressionOptions,
) -> Result<CompressedImage, MediaError> {
    options.validate()?;

    let source = image::load_from_memory(input)
        .map_err(MediaError::Decode)?
        .to_rgb8();
    debug!(
        "Decoded {}x{} image ({} bytes)",
        source.width(),
        source.height(),
        input.len()
    );

    let (mut width, mut height) =
        fit_within(source.width(), source.height(), options.max_dimension);
    let mut quality = options.initial_quality;
    let mut smallest: Option<CompressedImage> = None;
    let mut attempts_made = 0;

    for attempt in 1..=options.max_attempts {
        attempts_made = attempt;
        let bytes = if (width, height) == source.dimensions() {
            encode_jpeg(&source, quality)?
        } else {
            let resized = image::imageops::resize(&source, width, height, FilterType::Triangle);
            encode_jpeg(&resized, quality)?
        };

        let within_budget = bytes.len() <= options.max_bytes;
        debug!(
            "Attempt {}: {}x{} at quality {} -> {} bytes",
            attempt,
            width,
            height,
            quality,
            bytes.len()
        );

        let candidate = CompressedImage {
            bytes,
            width,
            height,
            quality,
            attempts: attempt,
            within_budget,
        };
        if within_budget {
            return Ok(candidate);
        }

        let is_smaller = smallest
            .as_ref()
            .map_or(true, |best| candidate.bytes.len() < best.bytes.len());
        if is_smaller {
            smallest = Some(candidate);
        }

        if quality > options.min_quality {
            quality = quality
                .saturating_sub(options.quality_step)
                .max(options.min_quality);
        } else if width > 1 || height > 1 {
            width = scale(width, options.scale_factor);
            height = scale(height, options.scale_factor);
        } else {
            // 1x1 at minimum quality, nothing left to reduce
            break;
        }
    }

    // The smallest candidate may come from an earlier attempt
    let mut best = smallest.ok_or_else(|| {
        MediaError::InvalidOptions("no compression attempt was made".to_string())
    })?;
    best.attempts = attempts_made;
    Ok(best)
}

/// Shrink (never enlarge) so that the longer side is at most `max_dimension`.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let ratio = f64::from(max_dimension) / f64::from(longest);
    let scaled = |side: u32| ((f64::from(side) * ratio).round() as u32).max(1);
    (scaled(width), scaled(height))
}

fn scale(side: u32, factor: f32) -> u32 {
    ((side as f32 * factor).floor() as u32).max(1)
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode_image(image).map_err(MediaError::Encode)?;
    Ok(buffer)
}

//! JPEG encoder for captured images.
//!
//! Turns a captured photo into a compact [`Payload`] suitable for one
//! transfer:
//!
//! - **Downscale**: images wider than `max_width` are resized to exactly
//!   `max_width`, keeping the aspect ratio (height rounded to nearest).
//! - **Compress**: the (possibly resized) image is JPEG-encoded at
//!   `quality`.
//!
//! Decoded and resized pixel buffers live only inside the call and are
//! dropped on every return path.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::PicsendError;
use crate::payload::Payload;

/// Width the mobile clients scale captures down to.
pub const DEFAULT_MAX_WIDTH: u32 = 1280;

/// JPEG quality the mobile clients use.
pub const DEFAULT_QUALITY: u8 = 80;

// ── Dimension policy ─────────────────────────────────────────────

/// Output dimensions for a `width`×`height` image under `max_width`.
///
/// Images no wider than `max_width` keep their size. Wider ones get
/// `width == max_width` and `height = round(height * max_width / width)`,
/// never less than 1.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).round();
    (max_width, (scaled as u32).max(1))
}

// ── ImageEncoder ─────────────────────────────────────────────────

/// Resizing JPEG encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageEncoder {
    max_width: u32,
    /// JPEG quality, 1..=100.
    quality: u8,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_QUALITY)
    }
}

impl ImageEncoder {
    /// Create an encoder. `quality` is clamped into `1..=100`.
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Decode `source` (any supported container, typically the JPEG a
    /// camera wrote) and re-encode it.
    pub fn encode(&self, source: &[u8]) -> Result<Payload, PicsendError> {
        let image = image::load_from_memory(source)
            .map_err(|e| PicsendError::Encode(format!("cannot decode source image: {e}")))?;
        self.encode_image(&image)
    }

    /// Encode an already-decoded image.
    pub fn encode_image(&self, image: &DynamicImage) -> Result<Payload, PicsendError> {
        if self.max_width == 0 {
            return Err(PicsendError::Encode("max width must be at least 1".into()));
        }

        let (width, height) = image.dimensions();
        let (target_w, target_h) = target_dimensions(width, height, self.max_width);

        let rgb = if (target_w, target_h) == (width, height) {
            image.to_rgb8()
        } else {
            image
                .resize_exact(target_w, target_h, FilterType::Triangle)
                .to_rgb8()
        };

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(&rgb)
            .map_err(|e| PicsendError::Encode(format!("JPEG encode failed: {e}")))?;

        if buffer.is_empty() {
            return Err(PicsendError::Encode("compressor produced no output".into()));
        }

        debug!(
            "encoded {width}x{height} -> {target_w}x{target_h} q{} ({} bytes)",
            self.quality,
            buffer.len()
        );
        Ok(Payload::new(buffer))
    }
}

// ── Tests ────────────────────────────────────────────────────────

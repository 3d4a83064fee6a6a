//! JPEG band encoder.
//!
//! Bands are embedded in the PDF as baseline JPEG (`/DCTDecode`), which PDF
//! readers decode natively. JPEG has no alpha channel, so transparent
//! pixels are flattened onto white paper before encoding.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, RgbaImage};

use crate::error::ExportError;

/// Default JPEG quality (1-100). High, since bands carry small text.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

/// An encoded band ready to be placed on a page.
#[derive(Debug, Clone)]
pub struct EncodedBand {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Encodes raster bands as JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct BandEncoder {
    quality: u8,
}

impl Default for BandEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl BandEncoder {
    /// Create an encoder; `quality` is clamped to 1-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: clamp_quality(quality),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Flatten and encode one band.
    pub fn encode(&self, band: &RgbaImage) -> Result<EncodedBand, ExportError> {
        if band.width() == 0 || band.height() == 0 {
            return Err(ExportError::Encode("cannot encode an empty band".to_string()));
        }

        let flat = flatten_on_white(band);
        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(&flat)
            .map_err(|e| ExportError::Encode(e.to_string()))?;

        Ok(EncodedBand {
            data: Bytes::from(output),
            width: band.width(),
            height: band.height(),
        })
    }
}

/// Composite an RGBA image over an opaque white background.
fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Validate JPEG quality parameter.
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

//! Per-file conversion pipeline.
//!
//! Each uploaded file runs through the same fixed sequence:
//!
//! 1. **Decode & inspect** - decode the source bytes and read dimensions.
//! 2. **Downscale guard** - if the pixel area exceeds the budget
//!    (4000x4000 by default), scale down uniformly so the area fits.
//!    Never upscales.
//! 3. **Explicit resize** - if the caller supplied both width and height,
//!    resize to exactly those dimensions, skipping the resize entirely if it
//!    would enlarge either axis beyond the source.
//! 4. **Format branch** - ICO packs a multi-resolution icon container, SVG
//!    wraps the raster in a data-URI shim, AVIF routes through the AV1
//!    encoder, everything else goes through its namesake codec.
//!
//! The pipeline owns the input buffer and every decoded frame; both are
//! dropped before it returns on every path, so a failed conversion releases
//! its memory just like a successful one.

use std::io::Cursor;

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageFormat};
use tracing::debug;

use crate::error::ConvertError;

use super::format::TargetFormat;
use super::icon;
use super::request::{ConversionResult, InputFile};
use super::vector;

/// Default pixel budget: images larger than this area are scaled down
/// before any other processing to cap codec memory use.
pub const MAX_PIXELS: u64 = 4000 * 4000;

/// Default encode quality when the client does not supply one.
pub const DEFAULT_QUALITY: u8 = 80;

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
const AVIF_SPEED: u8 = 6;

// =============================================================================
// Options
// =============================================================================

/// Options shared by every file in a batch.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Target format, parsed once per request
    pub format: TargetFormat,

    /// Requested quality; `None` falls back to [`DEFAULT_QUALITY`]
    pub quality: Option<u8>,

    /// Explicit output dimensions (both-or-neither, already validated)
    pub resize: Option<(u32, u32)>,

    /// Pixel budget for the downscale guard
    pub pixel_budget: u64,
}

impl ConvertOptions {
    /// Options for the given format with all defaults.
    pub fn new(format: TargetFormat) -> Self {
        Self {
            format,
            quality: None,
            resize: None,
            pixel_budget: MAX_PIXELS,
        }
    }

    fn quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Convert a single file.
///
/// Takes the file by value: the input buffer is consumed here and freed as
/// soon as output bytes exist, regardless of success.
pub fn convert_file(file: InputFile, opts: &ConvertOptions) -> Result<ConversionResult, ConvertError> {
    let InputFile { name, bytes, .. } = file;
    let target = opts.format;

    // Sniff the container before decoding; the SVG shim embeds the source
    // bytes with their original MIME type when no transformation applies.
    let source_format = image::guess_format(&bytes).ok();

    let mut img = image::load_from_memory(&bytes).map_err(|e| ConvertError::Decode {
        name: name.clone(),
        message: e.to_string(),
    })?;

    let (src_w, src_h) = img.dimensions();
    let mut transformed = false;

    if let Some((w, h)) = downscale_dimensions(src_w, src_h, opts.pixel_budget) {
        debug!(
            file = %name,
            from = %format!("{src_w}x{src_h}"),
            to = %format!("{w}x{h}"),
            "downscale guard triggered"
        );
        img = img.resize_exact(w, h, image::imageops::FilterType::Lanczos3);
        transformed = true;
    }

    if let Some((w, h)) = opts.resize {
        let (cur_w, cur_h) = img.dimensions();
        // Enlargement beyond the source is disallowed; the resize is skipped
        // rather than clamped so output dimensions stay predictable.
        if w <= cur_w && h <= cur_h {
            img = img.resize_exact(w, h, image::imageops::FilterType::Lanczos3);
            transformed = true;
        }
    }

    let output = match target {
        TargetFormat::Ico => {
            let packed = icon::pack(&img, &name)?;
            drop(img);
            packed
        }
        TargetFormat::Svg => {
            let (w, h) = img.dimensions();
            let out = if transformed {
                // The raster changed, so embed the processed pixels as PNG
                // and advertise the processed dimensions.
                let png = encode_raster(&img, TargetFormat::Png, DEFAULT_QUALITY, &name)?;
                drop(img);
                vector::wrap_svg(&png, "image/png", w, h)
            } else {
                drop(img);
                let mime = source_format
                    .map(|f| f.to_mime_type())
                    .unwrap_or("application/octet-stream");
                vector::wrap_svg(&bytes, mime, w, h)
            };
            out
        }
        raster => {
            let out = encode_raster(&img, raster, opts.quality(), &name)?;
            drop(img);
            out
        }
    };

    // Input buffer is no longer needed once output bytes exist.
    drop(bytes);

    Ok(ConversionResult {
        bytes: output,
        original_name: name,
    })
}

/// Compute downscaled dimensions if the area exceeds the budget.
///
/// Returns `None` when the image already fits. The scale factor is applied
/// uniformly to both axes and the results are floored, so the output area is
/// guaranteed to fit the budget while preserving aspect ratio within
/// rounding tolerance.
pub fn downscale_dimensions(width: u32, height: u32, budget: u64) -> Option<(u32, u32)> {
    let area = width as u64 * height as u64;
    if area <= budget || area == 0 {
        return None;
    }

    let ratio = (budget as f64 / area as f64).sqrt();
    let w = ((width as f64 * ratio).floor() as u32).max(1);
    let h = ((height as f64 * ratio).floor() as u32).max(1);
    Some((w, h))
}

// =============================================================================
// Raster Encoding
// =============================================================================

/// Encode a decoded image through the target codec.
///
/// Quality applies to the lossy codecs (JPEG, AVIF); the rest encode
/// losslessly through their default settings. AVIF is the one target routed
/// through an alternate compression algorithm (AV1) rather than a
/// same-named codec.
fn encode_raster(
    img: &DynamicImage,
    format: TargetFormat,
    quality: u8,
    name: &str,
) -> Result<Vec<u8>, ConvertError> {
    let encode_err = |e: image::ImageError| ConvertError::Encode {
        name: name.to_string(),
        format: format.to_string(),
        message: e.to_string(),
    };

    let mut cursor = Cursor::new(Vec::new());

    match format {
        TargetFormat::Jpeg | TargetFormat::Jpg => {
            // JPEG has no alpha channel; flatten to RGB first.
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            encoder.encode_image(&rgb).map_err(encode_err)?;
        }
        TargetFormat::Png => {
            img.write_to(&mut cursor, ImageFormat::Png)
                .map_err(encode_err)?;
        }
        TargetFormat::WebP => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            WebPEncoder::new_lossless(&mut cursor)
                .encode(rgba.as_raw(), w, h, ExtendedColorType::Rgba8)
                .map_err(encode_err)?;
        }
        TargetFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut cursor, ImageFormat::Gif)
                .map_err(encode_err)?;
        }
        TargetFormat::Bmp => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut cursor, ImageFormat::Bmp)
                .map_err(encode_err)?;
        }
        TargetFormat::Tiff => {
            img.write_to(&mut cursor, ImageFormat::Tiff)
                .map_err(encode_err)?;
        }
        TargetFormat::Avif => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            let encoder = AvifEncoder::new_with_speed_quality(&mut cursor, AVIF_SPEED, quality);
            image::ImageEncoder::write_image(
                encoder,
                rgba.as_raw(),
                w,
                h,
                ExtendedColorType::Rgba8,
            )
            .map_err(encode_err)?;
        }
        TargetFormat::Ico | TargetFormat::Svg => {
            // Handled by dedicated branches in convert_file.
            return Err(ConvertError::Encode {
                name: name.to_string(),
                format: format.to_string(),
                message: "not a raster codec".to_string(),
            });
        }
    }

    Ok(cursor.into_inner())
}

// =============================================================================
// Tests
// =============================================================================

//! Multi-resolution icon packing.
//!
//! The ICO target packs the source raster into a Windows icon container with
//! one PNG-compressed frame per standard icon size, capped at the source
//! dimension (never upscaled) and at the format's 256px limit.

use std::io::Cursor;

use image::codecs::ico::{IcoEncoder, IcoFrame};
use image::{DynamicImage, ExtendedColorType, GenericImageView, RgbaImage};

use crate::error::ConvertError;

/// Standard icon sizes, largest first frame last.
pub const ICON_SIZES: [u32; 6] = [16, 32, 48, 64, 128, 256];

/// Maximum frame dimension the ICO container supports.
const MAX_ICO_DIMENSION: u32 = 256;

/// Pack an image into a multi-resolution ICO container.
///
/// Frames are generated for every standard size up to the source's larger
/// dimension (clamped to 256). Sources smaller than the smallest standard
/// size get a single frame at their native size. Non-square sources keep
/// their aspect ratio, fitting within the square bound for each size.
pub fn pack(img: &DynamicImage, name: &str) -> Result<Vec<u8>, ConvertError> {
    let pack_err = |message: String| ConvertError::IconPack {
        name: name.to_string(),
        message,
    };

    let (w, h) = img.dimensions();
    let max_dim = w.max(h).min(MAX_ICO_DIMENSION);

    let mut sizes: Vec<u32> = ICON_SIZES.iter().copied().filter(|s| *s <= max_dim).collect();
    if sizes.is_empty() {
        sizes.push(max_dim.max(1));
    }

    let rasters: Vec<RgbaImage> = sizes
        .iter()
        .map(|&size| {
            img.resize(size, size, image::imageops::FilterType::Lanczos3)
                .to_rgba8()
        })
        .collect();

    let mut frames = Vec::with_capacity(rasters.len());
    for raster in &rasters {
        let (fw, fh) = raster.dimensions();
        let frame = IcoFrame::as_png(raster.as_raw(), fw, fh, ExtendedColorType::Rgba8)
            .map_err(|e| pack_err(e.to_string()))?;
        frames.push(frame);
    }

    let mut cursor = Cursor::new(Vec::new());
    IcoEncoder::new(&mut cursor)
        .encode_images(&frames)
        .map_err(|e| pack_err(e.to_string()))?;

    Ok(cursor.into_inner())
}

// =============================================================================
// Tests
// =============================================================================

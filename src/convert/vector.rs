//! Raster-embedding SVG shim.
//!
//! The SVG target does not trace the image into vector paths. It wraps the
//! raster bytes as a base64 data URI inside a minimal SVG document whose
//! width/height come from the decoded metadata. This is a documented
//! approximation kept for client compatibility, not real vectorization.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Wrap raster bytes in a minimal SVG document.
pub fn wrap_svg(raster: &[u8], mime: &str, width: u32, height: u32) -> Vec<u8> {
    let data = STANDARD.encode(raster);
    format!(
        "<svg width=\"{width}\" height=\"{height}\" xmlns=\"http://www.w3.org/2000/svg\">\n  \
         <image href=\"data:{mime};base64,{data}\" width=\"100%\" height=\"100%\"/>\n</svg>\n"
    )
    .into_bytes()
}

// =============================================================================
// Tests
// =============================================================================

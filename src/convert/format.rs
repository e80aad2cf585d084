//! Target format registry.
//!
//! Maps the `format` form field onto the codecs the pipeline knows how to
//! drive, and carries the MIME/extension mapping used by the response
//! packager. The `jpg` alias is accepted on input and keeps its spelling in
//! file extensions, but maps to the `image/jpeg` MIME type.

use crate::error::ConvertError;

/// Output formats the conversion pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// JPEG, requested as "jpeg"
    Jpeg,
    /// JPEG, requested as "jpg" (same codec, different extension)
    Jpg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
    /// AV1-compressed still image; the one target that routes through an
    /// alternate compression algorithm instead of its namesake codec
    Avif,
    /// Multi-resolution Windows icon container
    Ico,
    /// Raster-embedding SVG shim (not real vectorization)
    Svg,
}

impl TargetFormat {
    /// Parse the user-supplied format string.
    ///
    /// Unknown formats are a [`ConvertError`], not a validation error:
    /// validation only checks that the field is present, and the conversion
    /// layer rejects values it cannot encode. This keeps an unsupported
    /// format a 500 rather than a 400, matching the documented contract.
    pub fn parse(s: &str) -> Result<Self, ConvertError> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" => Ok(Self::Jpeg),
            "jpg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "tiff" | "tif" => Ok(Self::Tiff),
            "avif" => Ok(Self::Avif),
            "ico" => Ok(Self::Ico),
            "svg" => Ok(Self::Svg),
            other => Err(ConvertError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// File extension for derived output names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Avif => "avif",
            Self::Ico => "ico",
            Self::Svg => "svg",
        }
    }

    /// Content-Type for single-file responses.
    ///
    /// Always `image/<format>`, with `jpg` as the one alias mapped to its
    /// canonical MIME subtype. Clients depend on this exact shape.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg | Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Avif => "image/avif",
            Self::Ico => "image/ico",
            Self::Svg => "image/svg",
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

// =============================================================================
// Tests
// =============================================================================

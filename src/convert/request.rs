//! Validated conversion requests.
//!
//! The multipart form arrives loosely typed: every field is a string and
//! files can be attached under any field name. This module parses that form
//! exactly once into a [`ConversionRequest`], failing fast on the first
//! invalid field.
//!
//! # Validation Order
//!
//! The checks run in a fixed order and the first violation wins:
//!
//! 1. `format` present
//! 2. at least one file
//! 3. file count within the configured maximum
//! 4. every file within the configured size limit
//!
//! This ordering is observable through the error messages and must be
//! preserved: a request with neither format nor files reports the missing
//! format, not the missing files. Numeric fields (`quality`, `width`,
//! `height`) are parsed strictly after the ordered checks.

use crate::error::ValidationError;

/// Default maximum number of files per request.
pub const DEFAULT_MAX_FILES: usize = 5;

/// Default maximum size of a single uploaded file, in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

// =============================================================================
// Input Types
// =============================================================================

/// One uploaded file, owned by the conversion pipeline for the duration of
/// its conversion. The buffer is consumed by value so it can be freed as
/// soon as output bytes exist.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Original file name as supplied by the client
    pub name: String,

    /// Raw file bytes
    pub bytes: Vec<u8>,

    /// Size declared by the multipart part (equals `bytes.len()` for
    /// well-formed uploads; validation checks this value)
    pub size: u64,
}

impl InputFile {
    /// Create an input file, deriving the declared size from the buffer.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            name: name.into(),
            bytes,
            size,
        }
    }
}

/// Output of a single successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Encoded output bytes
    pub bytes: Vec<u8>,

    /// Original file name, used to derive the output name
    pub original_name: String,
}

/// The raw, unvalidated form as parsed from the multipart body.
#[derive(Debug, Default)]
pub struct RawConvertForm {
    pub format: Option<String>,
    pub quality: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub files: Vec<InputFile>,
}

/// Per-request upload limits, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Maximum number of files per request
    pub max_files: usize,

    /// Maximum size of a single file in bytes
    pub max_file_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_size: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
        }
    }
}

// =============================================================================
// Validated Request
// =============================================================================

/// A fully validated conversion request.
///
/// The target format is kept as a string here: validation only requires the
/// field to be present, and the conversion layer decides whether it names a
/// codec it can drive (an unknown format is a conversion error, not an
/// input error).
#[derive(Debug)]
pub struct ConversionRequest {
    /// Requested target format (e.g. "webp", "jpg", "ico")
    pub format: String,

    /// Requested quality 0-100; `None` means the codec default
    pub quality: Option<u8>,

    /// Explicit output dimensions; `Some` only when both width and height
    /// were supplied
    pub resize: Option<(u32, u32)>,

    /// Uploaded files in submission order
    pub files: Vec<InputFile>,
}

impl ConversionRequest {
    /// Validate a raw form against the given limits.
    ///
    /// Returns the first violation encountered, in the documented order.
    pub fn validate(form: RawConvertForm, limits: &UploadLimits) -> Result<Self, ValidationError> {
        let format = match form.format {
            Some(f) if !f.trim().is_empty() => f,
            _ => return Err(ValidationError::MissingFormat),
        };

        if form.files.is_empty() {
            return Err(ValidationError::NoFiles);
        }

        if form.files.len() > limits.max_files {
            return Err(ValidationError::TooManyFiles {
                max: limits.max_files,
            });
        }

        if let Some(file) = form.files.iter().find(|f| f.size > limits.max_file_size) {
            return Err(ValidationError::FileTooLarge {
                name: file.name.clone(),
                max_mb: limits.max_file_size / (1024 * 1024),
            });
        }

        let quality = parse_quality(form.quality.as_deref())?;
        let resize = parse_dimensions(form.width.as_deref(), form.height.as_deref())?;

        Ok(Self {
            format,
            quality,
            resize,
            files: form.files,
        })
    }
}

/// Parse the optional quality field. Empty strings count as absent.
fn parse_quality(raw: Option<&str>) -> Result<Option<u8>, ValidationError> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return Ok(None),
    };

    match raw.parse::<u8>() {
        Ok(q) if q <= 100 => Ok(Some(q)),
        _ => Err(ValidationError::InvalidQuality {
            value: raw.to_string(),
        }),
    }
}

/// Parse width/height. Both must be supplied together as positive integers;
/// empty strings count as absent.
fn parse_dimensions(
    width: Option<&str>,
    height: Option<&str>,
) -> Result<Option<(u32, u32)>, ValidationError> {
    fn nonempty(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    match (nonempty(width), nonempty(height)) {
        (None, None) => Ok(None),
        (Some(w), Some(h)) => {
            let w: u32 = w.parse().map_err(|_| ValidationError::InvalidDimensions {
                reason: format!("width is not a valid integer: {w}"),
            })?;
            let h: u32 = h.parse().map_err(|_| ValidationError::InvalidDimensions {
                reason: format!("height is not a valid integer: {h}"),
            })?;
            if w == 0 || h == 0 {
                return Err(ValidationError::InvalidDimensions {
                    reason: "width and height must be greater than zero".to_string(),
                });
            }
            Ok(Some((w, h)))
        }
        (Some(_), None) => Err(ValidationError::InvalidDimensions {
            reason: "width supplied without height".to_string(),
        }),
        (None, Some(_)) => Err(ValidationError::InvalidDimensions {
            reason: "height supplied without width".to_string(),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================

use thiserror::Error;

/// Errors produced by upload validation (HTTP 400).
///
/// Validation is fail-fast: checks run in a fixed order and the first
/// violation is returned. The order is part of the API contract because
/// clients key off the error messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The `format` form field is missing or empty
    #[error("Format is required")]
    MissingFormat,

    /// The request contained no file parts
    #[error("No files uploaded")]
    NoFiles,

    /// More files than the configured maximum were uploaded
    #[error("Maximum {max} files allowed at once")]
    TooManyFiles { max: usize },

    /// A single file exceeds the configured size limit
    #[error("File size exceeds {max_mb}MB")]
    FileTooLarge { name: String, max_mb: u64 },

    /// The `quality` field is present but not an integer in 0-100
    #[error("Invalid quality: {value} (must be an integer between 0 and 100)")]
    InvalidQuality { value: String },

    /// Width/height must be supplied together as positive integers
    #[error("Invalid dimensions: {reason}")]
    InvalidDimensions { reason: String },

    /// The multipart body could not be read
    #[error("Malformed upload: {0}")]
    Malformed(String),
}

/// Admission control errors (HTTP 503).
#[derive(Debug, Clone, Error)]
pub enum AdmissionError {
    /// Process memory usage is above the configured budget
    #[error("memory over budget: {used_bytes} bytes used, budget is {budget_bytes} bytes")]
    OverBudget { used_bytes: u64, budget_bytes: u64 },
}

/// Errors raised while converting a single file (HTTP 500).
///
/// Any one of these aborts the entire batch: the scheduler joins all
/// per-file tasks with all-or-nothing semantics and no partial results
/// are ever returned.
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    /// The input bytes could not be decoded as an image
    #[error("failed to decode {name}: {message}")]
    Decode { name: String, message: String },

    /// The requested target format is not supported
    #[error("unsupported target format: {format}")]
    UnsupportedFormat { format: String },

    /// The target codec rejected the image
    #[error("failed to encode {name} as {format}: {message}")]
    Encode {
        name: String,
        format: String,
        message: String,
    },

    /// Packing rasters into the multi-resolution icon container failed
    #[error("failed to pack {name} into icon container: {message}")]
    IconPack { name: String, message: String },

    /// A conversion task panicked or was cancelled before completion
    #[error("conversion task failed: {0}")]
    TaskJoin(String),
}

//! Image conversion core.
//!
//! Everything between "the upload was admitted" and "output bytes exist"
//! lives here:
//!
//! ```text
//! RawConvertForm ──validate──> ConversionRequest
//!                                    │
//!                             ConvertScheduler (≤ K executing)
//!                                    │ per file
//!                             convert_file pipeline
//!                   decode → downscale guard → resize → format branch
//! ```

pub mod format;
pub mod icon;
pub mod pipeline;
pub mod request;
pub mod scheduler;
pub mod vector;

pub use format::TargetFormat;
pub use pipeline::{convert_file, downscale_dimensions, ConvertOptions, DEFAULT_QUALITY, MAX_PIXELS};
pub use request::{
    ConversionRequest, ConversionResult, InputFile, RawConvertForm, UploadLimits,
    DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE_MB,
};
pub use scheduler::{ConvertScheduler, DEFAULT_CONCURRENCY};

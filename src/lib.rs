//! # imgpress
//!
//! A batch image conversion service over HTTP.
//!
//! Clients upload one or more images in a multipart form together with a
//! target format and optional resize parameters; the service re-encodes
//! them and returns a single file or a streamed ZIP archive. Conversion is
//! memory-aware: requests are admitted against a process memory budget and
//! executed with bounded concurrency.
//!
//! ## Features
//!
//! - **Ten output formats**: jpeg/jpg, png, webp, gif, bmp, tiff, avif,
//!   plus multi-resolution `ico` packing and a raster-embedding `svg` shim
//! - **Streamed archives**: multi-file batches are zipped straight into
//!   the response body, never buffered whole
//! - **Admission control**: over-budget memory readings shed load with 503
//!   before any upload bytes are parsed
//! - **Bounded concurrency**: a fair FIFO scheduler keeps at most K
//!   conversions executing at once
//! - **Authentication**: Bearer API key with constant-time comparison,
//!   plus a separate admin token for diagnostics
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`convert`] - Validation, scheduling, and the per-file conversion pipeline
//! - [`admission`] - Memory-budget admission control
//! - [`monitor`] - Resource sampling and the diagnostic ring buffer
//! - [`server`] - Axum-based HTTP server, auth, and response packaging
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use imgpress::admission::AdmissionController;
//! use imgpress::convert::ConvertScheduler;
//! use imgpress::monitor::{ResourceLog, SystemProbe};
//! use imgpress::server::{create_router, AppState, RouterConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let probe = Arc::new(SystemProbe::new());
//!     let state = AppState::new(
//!         ConvertScheduler::new(1),
//!         AdmissionController::new(Arc::clone(&probe), 512 * 1024 * 1024),
//!         probe,
//!         Arc::new(ResourceLog::new(Duration::from_secs(60))),
//!     );
//!     let router = create_router(state, RouterConfig::new("my-api-key"));
//!
//!     // Start the server...
//! }
//! ```

pub mod admission;
pub mod config;
pub mod convert;
pub mod error;
pub mod monitor;
pub mod server;

// Re-export commonly used types
pub use admission::{AdmissionController, MemoryProbe, DEFAULT_MEMORY_BUDGET_MB};
pub use config::Config;
pub use convert::{
    convert_file, ConversionRequest, ConversionResult, ConvertOptions, ConvertScheduler, InputFile,
    RawConvertForm, TargetFormat, UploadLimits, DEFAULT_CONCURRENCY, DEFAULT_MAX_FILES,
    DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_QUALITY, MAX_PIXELS,
};
pub use error::{AdmissionError, ConvertError, ValidationError};
pub use monitor::{spawn_sampler, ResourceLog, ResourceUsage, SystemProbe};
pub use server::{
    auth_middleware, create_router, ApiKeyAuth, AppState, AuthError, ErrorResponse, HealthResponse,
    RouterConfig, ARCHIVE_FILENAME,
};

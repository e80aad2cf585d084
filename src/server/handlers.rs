//! HTTP request handlers for the conversion API.
//!
//! # Endpoints
//!
//! - `POST /convert/images` - convert a batch of uploaded images
//! - `GET /health` - point-in-time resource snapshot
//! - `GET /health/log` - persist the diagnostic ring buffer to disk
//!
//! The conversion handler runs the request-scoped pipeline end to end:
//! admission check first (before any body bytes are parsed), then multipart
//! parsing, ordered validation, scheduled conversion, and packaging.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::admission::{AdmissionController, MemoryProbe};
use crate::convert::{
    ConversionRequest, ConvertOptions, ConvertScheduler, InputFile, RawConvertForm, TargetFormat,
    UploadLimits, MAX_PIXELS,
};
use crate::error::{AdmissionError, ConvertError, ValidationError};
use crate::monitor::{ResourceLog, ResourceUsage, SystemProbe};

use super::package::{self, DEFAULT_ZIP_COMPRESSION};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers via Axum's State extractor.
///
/// Generic over the memory probe so tests can simulate memory pressure.
pub struct AppState<P: MemoryProbe> {
    /// Bounded-concurrency conversion scheduler
    pub scheduler: Arc<ConvertScheduler>,

    /// Memory-pressure admission control
    pub admission: AdmissionController<P>,

    /// Per-request upload limits
    pub limits: UploadLimits,

    /// Pixel budget for the downscale guard
    pub pixel_budget: u64,

    /// ZIP compression level for archive responses
    pub zip_compression: u32,

    /// Live system metrics for the health endpoint
    pub monitor: Arc<SystemProbe>,

    /// Diagnostic ring buffer
    pub resource_log: Arc<ResourceLog>,

    /// Directory for drained resource logs
    pub log_dir: PathBuf,
}

impl<P: MemoryProbe> AppState<P> {
    /// Create application state with default limits and knobs.
    pub fn new(
        scheduler: ConvertScheduler,
        admission: AdmissionController<P>,
        monitor: Arc<SystemProbe>,
        resource_log: Arc<ResourceLog>,
    ) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            admission,
            limits: UploadLimits::default(),
            pixel_budget: MAX_PIXELS,
            zip_compression: DEFAULT_ZIP_COMPRESSION,
            monitor,
            resource_log,
            log_dir: PathBuf::from("logs"),
        }
    }

    /// Set the upload limits.
    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the downscale-guard pixel budget.
    pub fn with_pixel_budget(mut self, budget: u64) -> Self {
        self.pixel_budget = budget;
        self
    }

    /// Set the archive compression level.
    pub fn with_zip_compression(mut self, level: u32) -> Self {
        self.zip_compression = level;
        self
    }

    /// Set the directory drained resource logs are written to.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }
}

impl<P: MemoryProbe> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            admission: self.admission.clone(),
            limits: self.limits,
            pixel_budget: self.pixel_budget,
            zip_compression: self.zip_compression,
            monitor: Arc::clone(&self.monitor),
            resource_log: Arc::clone(&self.resource_log),
            log_dir: self.log_dir.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g. "no_files", "server_busy")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub resource: ResourceUsage,
}

/// Response from the log-drain endpoint.
#[derive(Debug, Serialize)]
pub struct HealthLogResponse {
    pub message: String,
    pub entries: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Input errors map to 400. The first violation is the only one reported.
impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            ValidationError::MissingFormat => "format_required",
            ValidationError::NoFiles => "no_files",
            ValidationError::TooManyFiles { .. } => "too_many_files",
            ValidationError::FileTooLarge { .. } => "file_too_large",
            ValidationError::InvalidQuality { .. } => "invalid_quality",
            ValidationError::InvalidDimensions { .. } => "invalid_dimensions",
            ValidationError::Malformed(_) => "malformed_upload",
        };

        let message = self.to_string();
        warn!(error_type, "rejected upload: {message}");

        let body = ErrorResponse::with_status(error_type, message, StatusCode::BAD_REQUEST);
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Admission rejections map to 503. The client is expected to retry later;
/// the service itself never retries. Detail stays in the logs.
impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let AdmissionError::OverBudget {
            used_bytes,
            budget_bytes,
        } = &self;
        warn!(
            used_bytes,
            budget_bytes, "admission rejected: memory over budget"
        );

        let body = ErrorResponse::with_status(
            "server_busy",
            "Server is busy. Please try again later.",
            StatusCode::SERVICE_UNAVAILABLE,
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

/// Conversion failures map to 500 and abort the whole batch. The client
/// gets a short message; the per-file detail is logged server-side.
impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        error!("image conversion failed: {self}");

        let body = ErrorResponse::with_status(
            "conversion_failed",
            "Image conversion failed",
            StatusCode::INTERNAL_SERVER_ERROR,
        );
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// =============================================================================
// Conversion Handler
// =============================================================================

/// Handle `POST /convert/images`.
pub async fn convert_handler<P: MemoryProbe>(
    State(state): State<AppState<P>>,
    multipart: Multipart,
) -> Response {
    // Admission runs before any body bytes are read or parsed.
    if let Err(e) = state.admission.check() {
        return e.into_response();
    }

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let request = match ConversionRequest::validate(form, &state.limits) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    // An unknown format is a conversion error (500), not an input error.
    let target = match TargetFormat::parse(&request.format) {
        Ok(target) => target,
        Err(e) => return e.into_response(),
    };

    info!(
        format = %target,
        files = request.files.len(),
        resize = ?request.resize,
        "conversion request accepted"
    );

    let opts = ConvertOptions {
        format: target,
        quality: request.quality,
        resize: request.resize,
        pixel_budget: state.pixel_budget,
    };

    let mut results = match state.scheduler.convert_batch(request.files, &opts).await {
        Ok(results) => results,
        Err(e) => return e.into_response(),
    };

    if results.len() == 1 {
        package::single_response(results.remove(0), target)
    } else {
        package::archive_response(results, target, state.zip_compression)
    }
}

/// Parse the multipart body into a raw form.
///
/// Parts with a filename are files regardless of their field name; text
/// parts feed the known parameters and unknown ones are ignored.
async fn read_form(mut multipart: Multipart) -> Result<RawConvertForm, ValidationError> {
    let mut form = RawConvertForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ValidationError::Malformed(e.to_string()))?
    {
        let field_name = field.name().map(str::to_string);

        if let Some(filename) = field.file_name().map(str::to_string) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ValidationError::Malformed(e.to_string()))?;
            form.files.push(InputFile::new(filename, bytes.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;

        match field_name.as_deref() {
            Some("format") => form.format = Some(value),
            Some("quality") => form.quality = Some(value),
            Some("width") => form.width = Some(value),
            Some("height") => form.height = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

// =============================================================================
// Health Handlers
// =============================================================================

/// Handle `GET /health`.
pub async fn health_handler<P: MemoryProbe>(
    State(state): State<AppState<P>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        resource: state.monitor.sample(),
    })
}

/// Handle `GET /health/log`: drain the ring buffer to a file.
pub async fn health_log_handler<P: MemoryProbe>(State(state): State<AppState<P>>) -> Response {
    let entries = state.resource_log.len();

    match state.resource_log.save_to_file(&state.log_dir) {
        Ok(path) => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            Json(HealthLogResponse {
                message: format!("Logs saved to {filename}"),
                entries,
            })
            .into_response()
        }
        Err(e) => {
            error!("failed to save resource log: {e}");
            let body = ErrorResponse::with_status(
                "log_write_failed",
                "Failed to save resource log",
                StatusCode::INTERNAL_SERVER_ERROR,
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

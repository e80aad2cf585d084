//! Test utilities for integration tests.
//!
//! This module provides a fake memory probe, multipart form builders, and
//! helpers for generating small test images in memory.

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};

use imgpress::admission::{AdmissionController, MemoryProbe};
use imgpress::convert::ConvertScheduler;
use imgpress::monitor::{ResourceLog, SystemProbe};
use imgpress::server::{create_router, AppState, RouterConfig};

// =============================================================================
// Fake Memory Probe
// =============================================================================

/// A memory probe with a settable reading, for simulating memory pressure.
pub struct FakeProbe {
    bytes: AtomicU64,
}

impl FakeProbe {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
        }
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::SeqCst);
    }
}

impl MemoryProbe for FakeProbe {
    fn process_memory_bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}

// =============================================================================
// State and Router Builders
// =============================================================================

/// Build application state around the given probe and memory budget.
pub fn test_state(probe: Arc<FakeProbe>, budget_bytes: u64) -> AppState<FakeProbe> {
    AppState::new(
        ConvertScheduler::new(1),
        AdmissionController::new(probe, budget_bytes),
        Arc::new(SystemProbe::new()),
        Arc::new(ResourceLog::new(Duration::from_secs(60))),
    )
}

/// Build application state that always admits.
pub fn default_state() -> AppState<FakeProbe> {
    test_state(Arc::new(FakeProbe::new(0)), u64::MAX)
}

/// Build an unauthenticated router over the given state.
pub fn open_router(state: AppState<FakeProbe>) -> Router {
    create_router(state, RouterConfig::without_auth().with_tracing(false))
}

/// Build an unauthenticated router with default state.
pub fn default_router() -> Router {
    open_router(default_state())
}

// =============================================================================
// Multipart Form Builder
// =============================================================================

const BOUNDARY: &str = "------------------------e8a1b2c3d4e5f607";

/// Builds multipart/form-data request bodies byte by byte.
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    /// Append a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Append a file part.
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Finish the form and return (content-type header value, body).
    pub fn build(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.body)
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a POST /convert/images request from a finished form.
pub fn convert_request(form: MultipartForm) -> Request<Body> {
    let (content_type, body) = form.build();
    Request::builder()
        .method("POST")
        .uri("/convert/images")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

/// Build a POST /convert/images request with a Bearer token.
pub fn convert_request_with_token(form: MultipartForm, token: &str) -> Request<Body> {
    let (content_type, body) = form.build();
    Request::builder()
        .method("POST")
        .uri("/convert/images")
        .header(header::CONTENT_TYPE, content_type)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Test Images
// =============================================================================

/// Generate an in-memory PNG with a simple gradient.
pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    encode_test_image(width, height, ImageFormat::Png)
}

/// Generate an in-memory JPEG with a simple gradient.
pub fn jpeg_image(width: u32, height: u32) -> Vec<u8> {
    encode_test_image(width, height, ImageFormat::Jpeg)
}

fn encode_test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Collect a response body into bytes.
pub async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

//! HTTP server layer for the image conversion service.
//!
//! This module provides the HTTP API in front of the conversion core.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                   POST /convert/images                          │
//! │                                                                 │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌────────────────┐   │
//! │  │ handlers  │ │   auth    │ │  package  │ │     routes     │   │
//! │  │ (request  │ │ (Bearer   │ │ (single / │ │ (router, CORS, │   │
//! │  │ pipeline) │ │  API key) │ │  ZIP body)│ │  body limit)   │   │
//! │  └───────────┘ └───────────┘ └───────────┘ └────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod package;
pub mod routes;

pub use auth::{admin_auth_middleware, auth_middleware, ApiKeyAuth, AuthError};
pub use handlers::{
    convert_handler, health_handler, health_log_handler, AppState, ErrorResponse, HealthLogResponse,
    HealthResponse,
};
pub use package::{ARCHIVE_FILENAME, DEFAULT_ZIP_COMPRESSION};
pub use routes::{create_router, RouterConfig, DEFAULT_BODY_LIMIT};

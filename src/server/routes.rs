//! Router configuration for the image conversion service.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS, and request body limits.
//!
//! # Route Structure
//!
//! ```text
//! /health              - Health check (public)
//! /health/log          - Drain diagnostic log (admin token)
//! /convert/images      - Batch image conversion (API key)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use imgpress::admission::AdmissionController;
//! use imgpress::convert::ConvertScheduler;
//! use imgpress::monitor::{ResourceLog, SystemProbe};
//! use imgpress::server::{create_router, AppState, RouterConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let probe = Arc::new(SystemProbe::new());
//! let state = AppState::new(
//!     ConvertScheduler::new(1),
//!     AdmissionController::new(Arc::clone(&probe), 512 * 1024 * 1024),
//!     probe,
//!     Arc::new(ResourceLog::new(Duration::from_secs(60))),
//! );
//!
//! let config = RouterConfig::new("my-api-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(state, config);
//!
//! // Run the server
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{admin_auth_middleware, auth_middleware, ApiKeyAuth};
use super::handlers::{convert_handler, health_handler, health_log_handler, AppState};
use crate::admission::MemoryProbe;

/// Default request body limit: headroom above the per-file and per-batch
/// upload limits, which are enforced separately with precise errors.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// API key for conversion requests
    pub api_key: String,

    /// Admin token for the diagnostic log endpoint (None = endpoint always
    /// rejects when auth is enabled)
    pub admin_token: Option<String>,

    /// Whether authentication is enabled
    pub auth_enabled: bool,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Maximum accepted request body size in bytes
    pub body_limit: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given API key.
    ///
    /// By default:
    /// - Authentication is enabled
    /// - No admin token is set (the log endpoint rejects everything)
    /// - CORS allows any origin
    /// - Body limit is 64 MB
    /// - Tracing is enabled
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            admin_token: None,
            auth_enabled: true,
            cors_origins: None, // Allow any origin by default
            body_limit: DEFAULT_BODY_LIMIT,
            enable_tracing: true,
        }
    }

    /// Create a configuration with authentication disabled.
    ///
    /// **Warning**: This should only be used for development/testing.
    pub fn without_auth() -> Self {
        Self {
            api_key: String::new(),
            admin_token: None,
            auth_enabled: false,
            cors_origins: None,
            body_limit: DEFAULT_BODY_LIMIT,
            enable_tracing: true,
        }
    }

    /// Set the admin token for the diagnostic log endpoint.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the maximum accepted request body size in bytes.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Enable or disable authentication.
    pub fn with_auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (health check)
/// - Protected routes (conversion API, diagnostic log)
/// - CORS configuration
/// - Request body limit
/// - Request tracing (optional)
pub fn create_router<P>(state: AppState<P>, config: RouterConfig) -> Router
where
    P: MemoryProbe + 'static,
{
    let cors = build_cors_layer(&config);

    let router = if config.auth_enabled {
        let auth = match &config.admin_token {
            Some(token) => ApiKeyAuth::new(&config.api_key).with_admin_token(token),
            None => ApiKeyAuth::new(&config.api_key),
        };
        build_protected_router(state, auth, cors)
    } else {
        build_public_router(state, cors)
    };

    let router = router.layer(DefaultBodyLimit::max(config.body_limit));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build router with authentication on the conversion and log routes.
fn build_protected_router<P>(state: AppState<P>, auth: ApiKeyAuth, cors: CorsLayer) -> Router
where
    P: MemoryProbe + 'static,
{
    // Conversion route, gated on the API key.
    let convert_routes = Router::new()
        .route("/convert/images", post(convert_handler::<P>))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            auth.clone(),
            auth_middleware,
        ));

    // Diagnostic log route, gated on the admin token.
    let admin_routes = Router::new()
        .route("/health/log", get(health_log_handler::<P>))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(auth, admin_auth_middleware));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler::<P>))
        .with_state(state);

    Router::new()
        .merge(convert_routes)
        .merge(admin_routes)
        .merge(public_routes)
        .layer(cors)
}

/// Build router without authentication (for development/testing).
fn build_public_router<P>(state: AppState<P>, cors: CorsLayer) -> Router
where
    P: MemoryProbe + 'static,
{
    Router::new()
        .route("/health", get(health_handler::<P>))
        .route("/health/log", get(health_log_handler::<P>))
        .route("/convert/images", post(convert_handler::<P>))
        .with_state(state)
        .layer(cors)
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            // Parse origins into HeaderValues
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Bearer API-key authentication.
//!
//! Every conversion request must carry `Authorization: Bearer <key>`; the
//! diagnostic log endpoint requires a separate admin token so operational
//! access can be granted without handing out the conversion key. Key
//! comparison is constant-time to avoid leaking prefix matches.
//!
//! The auth layer sits in front of the conversion core and is deliberately
//! thin: it accepts or rejects the request, nothing else.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

// =============================================================================
// Types
// =============================================================================

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Authorization header missing or not a Bearer token
    InvalidHeader,

    /// Bearer token does not match the API key
    InvalidApiKey,

    /// Bearer token does not match the admin access token
    InvalidAdminToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidHeader => write!(f, "Forbidden: Invalid Authorization Header"),
            AuthError::InvalidApiKey => write!(f, "Forbidden: Invalid API Key"),
            AuthError::InvalidAdminToken => write!(f, "Forbidden: Invalid Admin Access Token"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            AuthError::InvalidHeader => "invalid_authorization_header",
            AuthError::InvalidApiKey => "invalid_api_key",
            AuthError::InvalidAdminToken => "invalid_admin_token",
        };

        // A wrong key could be probing; a missing header is usually just a
        // misconfigured client.
        match &self {
            AuthError::InvalidHeader => {
                debug!(error_type, "authentication failed: {}", self);
            }
            _ => {
                warn!(error_type, "authentication failed: {}", self);
            }
        }

        let body = ErrorResponse::with_status(error_type, self.to_string(), StatusCode::FORBIDDEN);
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

// =============================================================================
// API Key Authentication
// =============================================================================

/// Holds the configured keys and verifies Bearer tokens against them.
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Vec<u8>,
    admin_token: Option<Vec<u8>>,
}

impl ApiKeyAuth {
    /// Create an authenticator with the conversion API key.
    pub fn new(api_key: impl AsRef<[u8]>) -> Self {
        Self {
            api_key: api_key.as_ref().to_vec(),
            admin_token: None,
        }
    }

    /// Set the admin token guarding diagnostic endpoints.
    pub fn with_admin_token(mut self, token: impl AsRef<[u8]>) -> Self {
        self.admin_token = Some(token.as_ref().to_vec());
        self
    }

    /// Verify a Bearer token against the API key.
    pub fn verify_api_key(&self, token: &str) -> Result<(), AuthError> {
        if bool::from(token.as_bytes().ct_eq(&self.api_key)) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }

    /// Verify a Bearer token against the admin token.
    ///
    /// Fails closed when no admin token is configured.
    pub fn verify_admin_token(&self, token: &str) -> Result<(), AuthError> {
        match &self.admin_token {
            Some(admin) if bool::from(token.as_bytes().ct_eq(admin)) => Ok(()),
            _ => Err(AuthError::InvalidAdminToken),
        }
    }
}

/// Extract the Bearer token from the Authorization header.
fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::InvalidHeader)?;

    header.strip_prefix("Bearer ").ok_or(AuthError::InvalidHeader)
}

// =============================================================================
// Middleware
// =============================================================================

/// Middleware protecting the conversion endpoints with the API key.
pub async fn auth_middleware(
    State(auth): State<ApiKeyAuth>,
    request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = auth.verify_api_key(token) {
        return e.into_response();
    }

    next.run(request).await
}

/// Middleware protecting admin endpoints with the admin access token.
pub async fn admin_auth_middleware(
    State(auth): State<ApiKeyAuth>,
    request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = auth.verify_admin_token(token) {
        return e.into_response();
    }

    next.run(request).await
}

// =============================================================================
// Tests
// =============================================================================

//! Configuration management for the image conversion service.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `IMGPRESS_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use imgpress::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}:{}", config.host, config.port);
//! println!("Memory budget: {} MB", config.memory_budget_mb);
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the `IMGPRESS_` prefix:
//!
//! - `IMGPRESS_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMGPRESS_PORT` - Server port (default: 8000)
//! - `IMGPRESS_API_KEY` - Bearer API key for conversion requests
//! - `IMGPRESS_AUTH_ENABLED` - Enable authentication (default: true)
//! - `IMGPRESS_ADMIN_TOKEN` - Bearer token for the diagnostic log endpoint
//! - `IMGPRESS_MAX_FILES` - Max files per request (default: 5)
//! - `IMGPRESS_MAX_FILE_SIZE_MB` - Max size per file in MB (default: 10)
//! - `IMGPRESS_MEMORY_BUDGET_MB` - Admission memory budget in MB (default: 512)
//! - `IMGPRESS_CONCURRENCY` - Concurrent conversion jobs (default: 1)
//! - `IMGPRESS_ZIP_COMPRESSION` - Archive compression level 0-9 (default: 3)
//! - `IMGPRESS_LOG_WINDOW_SECS` - Resource log retention window (default: 60)
//! - `IMGPRESS_SAMPLE_INTERVAL_SECS` - Resource sampling interval (default: 5)
//! - `IMGPRESS_LOG_DIR` - Directory for drained resource logs (default: logs)
//! - `IMGPRESS_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;

use clap::Parser;

use crate::admission::DEFAULT_MEMORY_BUDGET_MB;
use crate::convert::{
    UploadLimits, DEFAULT_CONCURRENCY, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE_MB,
};
use crate::monitor::{DEFAULT_LOG_WINDOW_SECS, DEFAULT_SAMPLE_INTERVAL_SECS};
use crate::server::DEFAULT_ZIP_COMPRESSION;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default directory for drained resource logs.
pub const DEFAULT_LOG_DIR: &str = "logs";

// =============================================================================
// CLI Arguments
// =============================================================================

/// imgpress - A batch image conversion service.
///
/// Accepts multipart image uploads over HTTP and returns them re-encoded in
/// a target format, optionally resized. Single files come back as raw bytes;
/// batches come back as a streamed ZIP archive.
#[derive(Parser, Debug, Clone)]
#[command(name = "imgpress")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMGPRESS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMGPRESS_PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Bearer API key for conversion requests.
    ///
    /// If not provided and auth is enabled, the server will fail to start.
    #[arg(long, env = "IMGPRESS_API_KEY")]
    pub api_key: Option<String>,

    /// Enable Bearer token authentication.
    ///
    /// When disabled, all requests are allowed without authentication.
    /// WARNING: Only disable authentication in development/testing.
    #[arg(long, default_value_t = true, env = "IMGPRESS_AUTH_ENABLED")]
    pub auth_enabled: bool,

    /// Bearer token for the diagnostic log endpoint.
    ///
    /// If not set while auth is enabled, `GET /health/log` rejects all
    /// requests.
    #[arg(long, env = "IMGPRESS_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    // =========================================================================
    // Upload Limits
    // =========================================================================
    /// Maximum number of files per conversion request.
    #[arg(long, default_value_t = DEFAULT_MAX_FILES, env = "IMGPRESS_MAX_FILES")]
    pub max_files: usize,

    /// Maximum size per uploaded file, in MB.
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE_MB, env = "IMGPRESS_MAX_FILE_SIZE_MB")]
    pub max_file_size_mb: u64,

    // =========================================================================
    // Resource Configuration
    // =========================================================================
    /// Process memory budget for admission control, in MB.
    ///
    /// Requests arriving while resident memory exceeds this budget are
    /// rejected with 503.
    #[arg(long, default_value_t = DEFAULT_MEMORY_BUDGET_MB, env = "IMGPRESS_MEMORY_BUDGET_MB")]
    pub memory_budget_mb: u64,

    /// Number of conversion jobs allowed to run concurrently.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "IMGPRESS_CONCURRENCY")]
    pub concurrency: usize,

    /// ZIP compression level for archive responses (0 = store, 9 = maximum).
    #[arg(long, default_value_t = DEFAULT_ZIP_COMPRESSION, env = "IMGPRESS_ZIP_COMPRESSION")]
    pub zip_compression: u32,

    // =========================================================================
    // Monitoring Configuration
    // =========================================================================
    /// Retention window for the resource log, in seconds.
    #[arg(long, default_value_t = DEFAULT_LOG_WINDOW_SECS, env = "IMGPRESS_LOG_WINDOW_SECS")]
    pub log_window_secs: u64,

    /// Resource sampling interval, in seconds.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_INTERVAL_SECS, env = "IMGPRESS_SAMPLE_INTERVAL_SECS")]
    pub sample_interval_secs: u64,

    /// Directory drained resource logs are written to.
    #[arg(long, default_value = DEFAULT_LOG_DIR, env = "IMGPRESS_LOG_DIR")]
    pub log_dir: PathBuf,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IMGPRESS_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        // Check the API key is provided when auth is enabled
        if self.auth_enabled && self.api_key.is_none() {
            return Err(
                "Authentication is enabled but no API key provided. \
                 Set --api-key or IMGPRESS_API_KEY, or disable auth with --auth-enabled=false"
                    .to_string(),
            );
        }

        // Validate upload limits
        if self.max_files == 0 {
            return Err("max_files must be greater than 0".to_string());
        }
        if self.max_file_size_mb == 0 {
            return Err("max_file_size_mb must be greater than 0".to_string());
        }

        // Validate resource knobs
        if self.memory_budget_mb == 0 {
            return Err("memory_budget_mb must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.zip_compression > 9 {
            return Err("zip_compression must be between 0 and 9".to_string());
        }

        // Validate monitoring knobs
        if self.sample_interval_secs == 0 {
            return Err("sample_interval_secs must be greater than 0".to_string());
        }
        if self.log_window_secs == 0 {
            return Err("log_window_secs must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the API key, or an empty string if not set (call validate() first).
    pub fn api_key_or_empty(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }

    /// Upload limits derived from this configuration.
    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_files: self.max_files,
            max_file_size: self.max_file_size_mb * 1024 * 1024,
        }
    }

    /// Admission memory budget in bytes.
    pub fn memory_budget_bytes(&self) -> u64 {
        self.memory_budget_mb * 1024 * 1024
    }
}

// =============================================================================
// Tests
// =============================================================================

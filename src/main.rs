//! imgpress - A batch image conversion service.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgpress::{
    admission::AdmissionController,
    config::Config,
    convert::ConvertScheduler,
    monitor::{spawn_sampler, ResourceLog, SystemProbe},
    server::{create_router, AppState, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!(
        "  Upload limits: {} files, {}MB each",
        config.max_files, config.max_file_size_mb
    );
    info!("  Memory budget: {}MB", config.memory_budget_mb);
    info!("  Concurrency: {}", config.concurrency);
    info!("  ZIP compression: level {}", config.zip_compression);

    // Auth status with warning if disabled
    if config.auth_enabled {
        info!("  Auth: enabled");
        if config.admin_token.is_none() {
            info!("  Admin token: not set, /health/log is locked");
        }
    } else {
        warn!("  Auth: DISABLED - all endpoints are publicly accessible");
        warn!("        Enable for production: --auth-enabled --api-key=<key>");
    }

    // Shared probe: feeds both admission control and the resource log
    let probe = Arc::new(SystemProbe::new());
    let admission = AdmissionController::new(Arc::clone(&probe), config.memory_budget_bytes());
    let scheduler = ConvertScheduler::new(config.concurrency);

    // Resource log and background sampler
    let resource_log = Arc::new(ResourceLog::new(Duration::from_secs(config.log_window_secs)));
    let _sampler = spawn_sampler(
        Arc::clone(&probe),
        Arc::clone(&resource_log),
        Duration::from_secs(config.sample_interval_secs),
    );

    // Application state
    let state = AppState::new(scheduler, admission, probe, resource_log)
        .with_limits(config.upload_limits())
        .with_zip_compression(config.zip_compression)
        .with_log_dir(config.log_dir.clone());

    // Build router configuration
    let router_config = build_router_config(&config);

    // Create router
    let router = create_router(state, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -X POST http://{}/convert/images \\",
        addr
    );
    info!("      -H 'Authorization: Bearer <key>' \\");
    info!("      -F format=webp -F files=@photo.jpg");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "imgpress=debug,tower_http=debug"
    } else {
        "imgpress=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = if config.auth_enabled {
        RouterConfig::new(config.api_key_or_empty())
    } else {
        RouterConfig::without_auth()
    };

    // Apply admin token
    if let Some(ref token) = config.admin_token {
        router_config = router_config.with_admin_token(token);
    }

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config = router_config.with_tracing(!config.no_tracing);

    router_config
}

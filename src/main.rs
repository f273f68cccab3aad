// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Image Ingress Guard Service
//!
//! An external check service in front of an image-sharing application:
//! the backend (or a reverse proxy such as Envoy) posts request context
//! here before acting on an upload or authentication attempt.
//!
//! - `POST /check/upload`: classify uploaded bytes for AI-provenance
//!   markers; reject uploads without one
//! - `POST /check/auth`: progressive rate limit check for
//!   authentication endpoints
//! - `POST /report/auth`: feed authentication outcomes back into the
//!   progressive limiter
//! - `GET /stats`: limiter tables and recent security events
//! - `GET /metrics`: Prometheus exposition (when enabled)
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `UPLOAD_MAX_REQUESTS`: Upload tokens per window per IP (default: 60)
//! - `AUTH_BASE_CAPACITY`: Auth tokens per window per IP (default: 10)
//! - `AUTH_LOCKOUT_THRESHOLD`: Failures before lockout (default: 5)
//! - `AUTH_LOCKOUT_SECS`: Lockout length in seconds (default: 900)

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use image_ingress_guard::{
    audit::AuditLog,
    config::Config,
    handlers::{self, AppState},
    limiter::RateLimiter,
    metrics::GuardMetrics,
    progressive::ProgressiveLimiter,
    provenance::ProvenanceClassifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        upload_max_requests = config.rate_limit.max_requests,
        auth_base_capacity = config.progressive.base_capacity,
        auth_lockout_threshold = config.progressive.lockout_threshold,
        "Starting image ingress guard"
    );

    // Create application state
    let audit = Arc::new(AuditLog::new(config.audit.capacity));
    let state = Arc::new(AppState {
        classifier: ProvenanceClassifier::new(config.classifier.clone()),
        upload_limiter: RateLimiter::new(config.rate_limit.clone()),
        auth_limiter: ProgressiveLimiter::new(config.progressive.clone(), audit.clone()),
        audit,
        metrics: GuardMetrics::new()?,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let cleanup_interval = config.rate_limit.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            cleanup_state.upload_limiter.cleanup().await;
            cleanup_state.auth_limiter.cleanup().await;
        }
    });

    // Build router
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/check/upload", post(handlers::check_upload))
        .route("/check/auth", post(handlers::check_auth))
        .route("/report/auth", post(handlers::report_auth))
        .route("/stats", get(handlers::stats));
    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(handlers::metrics));
    }
    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        ..Default::default()
    };
    if let Some(v) = env_parse("UPLOAD_MAX_REQUESTS") {
        config.rate_limit.max_requests = v;
    }
    if let Some(v) = env_parse("AUTH_BASE_CAPACITY") {
        config.progressive.base_capacity = v;
    }
    if let Some(v) = env_parse("AUTH_LOCKOUT_THRESHOLD") {
        config.progressive.lockout_threshold = v;
    }
    if let Some(v) = env_parse("AUTH_LOCKOUT_SECS") {
        config.progressive.lockout_secs = v;
    }
    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

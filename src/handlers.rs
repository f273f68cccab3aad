// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the ingress guard service.
//!
//! The service operates as an external check service: the image app's
//! backend (or a reverse proxy) posts the request context here and
//! acts on the verdict. Upload bytes travel base64-encoded in the JSON
//! body; the caller keeps the original multipart stream.

use crate::audit::{AuditLog, EventKind, SecurityEvent, Severity};
use crate::config::Config;
use crate::identity;
use crate::limiter::{LimiterStats, RateLimiter};
use crate::metrics::GuardMetrics;
use crate::progressive::{ProgressiveLimiter, ProgressiveStats};
use crate::provenance::ProvenanceClassifier;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub classifier: ProvenanceClassifier,
    pub upload_limiter: RateLimiter,
    pub auth_limiter: ProgressiveLimiter,
    pub audit: Arc<AuditLog>,
    pub metrics: GuardMetrics,
    pub config: Config,
}

/// Request-level error types.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Invalid image payload: {0}")]
    InvalidImagePayload(#[from] base64::DecodeError),

    #[error("Metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CheckError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidImagePayload(_) => "INVALID_IMAGE_PAYLOAD",
            Self::Metrics(_) => "METRICS_UNAVAILABLE",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for CheckError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidImagePayload(_) => StatusCode::BAD_REQUEST,
            Self::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Client address fields as forwarded by the calling proxy.
#[derive(Debug, Default, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub forwarded_for: Option<String>,
    #[serde(default)]
    pub real_ip: Option<String>,
    #[serde(default)]
    pub remote_addr: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Upload provenance check request.
#[derive(Debug, Deserialize)]
pub struct UploadCheckRequest {
    #[serde(flatten)]
    pub client: ClientInfo,
    /// Base64-encoded image bytes.
    pub image: String,
    /// Optional XMP packet extracted by the caller.
    #[serde(default)]
    pub xmp: Option<String>,
}

/// Upload provenance check response.
#[derive(Debug, Serialize)]
pub struct UploadCheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Auth rate limit check request.
#[derive(Debug, Deserialize)]
pub struct AuthCheckRequest {
    #[serde(flatten)]
    pub client: ClientInfo,
    /// Protected action, for the audit trail (default: "auth").
    #[serde(default = "default_context")]
    pub context: String,
}

fn default_context() -> String {
    "auth".to_string()
}

/// Auth rate limit check response.
#[derive(Debug, Serialize)]
pub struct AuthCheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Auth outcome report.
#[derive(Debug, Deserialize)]
pub struct AuthReportRequest {
    #[serde(flatten)]
    pub client: ClientInfo,
    pub success: bool,
}

/// Auth outcome report response.
#[derive(Debug, Serialize)]
pub struct AuthReportResponse {
    pub recorded: bool,
}

/// Operational statistics for dashboards.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub upload: LimiterStats,
    pub auth: ProgressiveStats,
    pub audit_events: usize,
    pub recent_events: Vec<SecurityEvent>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "image-ingress-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Resolve the client identity from forwarded fields, failing open.
async fn resolve_identity(
    state: &AppState,
    client: &ClientInfo,
    context: &str,
) -> Option<IpAddr> {
    let peer = client.remote_addr.as_deref().and_then(identity::normalize_ip);
    let ip = identity::resolve_client_ip(
        client.forwarded_for.as_deref(),
        client.real_ip.as_deref(),
        peer,
    );
    if ip.is_none() {
        warn!(context = %context, "Client identity unresolvable, failing open");
        state.metrics.unresolved_identities.inc();
        state
            .audit
            .record(
                EventKind::UnresolvedIdentity,
                Severity::Medium,
                "unknown",
                context,
                "no valid client address; request allowed",
            )
            .await;
    }
    ip
}

/// Check an image upload for AI-provenance markers.
///
/// The caller rejects the upload outright when `allowed` is false; the
/// detection details are persisted alongside the asset when it is
/// accepted. They are not for end-user display.
pub async fn check_upload(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadCheckRequest>,
) -> Result<Json<UploadCheckResponse>, CheckError> {
    state.metrics.upload_checks.inc();

    if let Some(ip) = resolve_identity(&state, &req.client, "upload").await {
        if !state.upload_limiter.allow(&ip.to_string()).await {
            info!(ip = %ip, "Upload rate limit exceeded");
            state.metrics.upload_rejected.inc();
            return Ok(Json(UploadCheckResponse {
                allowed: false,
                reason: Some("Upload rate limit exceeded".to_string()),
                provider: None,
                method: None,
                details: None,
            }));
        }
    }

    let image = BASE64.decode(&req.image)?;
    let xmp = req.xmp.as_deref().map(str::as_bytes);

    match state.classifier.classify(&image, xmp) {
        Some(result) => {
            debug!(provider = %result.provider, method = %result.method, "Upload accepted");
            state.metrics.upload_accepted.inc();
            Ok(Json(UploadCheckResponse {
                allowed: true,
                reason: None,
                provider: Some(result.provider.to_string()),
                method: Some(result.method.to_string()),
                details: Some(result.details),
            }))
        }
        None => {
            info!(bytes = image.len(), "Upload rejected: no provenance marker");
            state.metrics.upload_rejected.inc();
            Ok(Json(UploadCheckResponse {
                allowed: false,
                reason: Some("Could not verify content provenance".to_string()),
                provider: None,
                method: None,
                details: None,
            }))
        }
    }
}

/// Check an authentication attempt against the progressive limiter.
pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthCheckRequest>,
) -> Json<AuthCheckResponse> {
    state.metrics.auth_checks.inc();

    let Some(ip) = resolve_identity(&state, &req.client, &req.context).await else {
        return Json(AuthCheckResponse {
            allowed: true,
            reason: None,
            retry_after_secs: None,
        });
    };

    let verdict = state.auth_limiter.allow(&ip.to_string(), &req.context).await;
    if verdict.allowed {
        Json(AuthCheckResponse {
            allowed: true,
            reason: None,
            retry_after_secs: None,
        })
    } else {
        state.metrics.auth_denied.inc();
        Json(AuthCheckResponse {
            allowed: false,
            reason: Some("Too many requests".to_string()),
            retry_after_secs: Some(verdict.retry_after.as_secs()),
        })
    }
}

/// Report an authentication outcome back to the progressive limiter.
pub async fn report_auth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AuthReportRequest>,
) -> Json<AuthReportResponse> {
    let Some(ip) = resolve_identity(&state, &req.client, "auth-report").await else {
        return Json(AuthReportResponse { recorded: false });
    };

    let identity = ip.to_string();
    if req.success {
        state.metrics.auth_successes_reported.inc();
        state.auth_limiter.record_success(&identity).await;
    } else {
        state.metrics.auth_failures_reported.inc();
        state.auth_limiter.record_failure(&identity).await;
    }
    Json(AuthReportResponse { recorded: true })
}

/// Operational statistics endpoint.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        upload: state.upload_limiter.stats().await,
        auth: state.auth_limiter.stats().await,
        audit_events: state.audit.len().await,
        recent_events: state.audit.recent(50).await,
    })
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, CheckError> {
    let body = state.metrics.encode()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

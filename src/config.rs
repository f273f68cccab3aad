// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the image ingress guard.
//!
//! Defaults are tuned for a single-instance image-sharing deployment:
//! generous upload throttling, strict progressive limits on
//! authentication endpoints.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Basic per-IP rate limiting (upload and general endpoints)
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Progressive rate limiting (authentication endpoints)
    #[serde(default)]
    pub progressive: ProgressiveConfig,

    /// Provenance classifier tuning
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Security audit trail
    #[serde(default)]
    pub audit: AuditConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Basic token-bucket rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens per window per identity (default: 60)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum tracked identities before LRU eviction (default: 10000)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Idle entry lifetime in seconds (default: 3600)
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,

    /// Background cleanup sweep interval in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Progressive (failure-aware) rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressiveConfig {
    /// Window capacity with a clean failure history (default: 10)
    #[serde(default = "default_base_capacity")]
    pub base_capacity: u32,

    /// Capacity floor under backoff (default: 2)
    #[serde(default = "default_min_capacity")]
    pub min_capacity: u32,

    /// Base window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Ceiling for backoff-extended windows in seconds (default: 3600)
    #[serde(default = "default_max_window_secs")]
    pub max_window_secs: u64,

    /// Consecutive failures that trigger a lockout (default: 5)
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,

    /// Lockout length in seconds (default: 900)
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,

    /// Maximum tracked identities before LRU eviction (default: 10000)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Idle entry lifetime in seconds (default: 3600)
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
}

/// Provenance classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Keep the permissive bare-"prompt" catch-all in the binary and
    /// XMP scan stages (default: true). A heuristic, not a guarantee;
    /// disabling it trades recall for fewer false positives on
    /// text-bearing images.
    #[serde(default = "default_true")]
    pub permissive_prompt_scan: bool,
}

/// Security audit trail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Ring buffer capacity, in events (default: 1000)
    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_entries() -> usize {
    10_000
}

fn default_entry_ttl_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_base_capacity() -> u32 {
    10
}

fn default_min_capacity() -> u32 {
    2
}

fn default_max_window_secs() -> u64 {
    3600
}

fn default_lockout_threshold() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    900
}

fn default_audit_capacity() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            progressive: ProgressiveConfig::default(),
            classifier: ClassifierConfig::default(),
            audit: AuditConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            max_entries: default_max_entries(),
            entry_ttl_secs: default_entry_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            base_capacity: default_base_capacity(),
            min_capacity: default_min_capacity(),
            window_secs: default_window_secs(),
            max_window_secs: default_max_window_secs(),
            lockout_threshold: default_lockout_threshold(),
            lockout_secs: default_lockout_secs(),
            max_entries: default_max_entries(),
            entry_ttl_secs: default_entry_ttl_secs(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            permissive_prompt_scan: default_true(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: default_audit_capacity(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the idle-entry lifetime
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_secs)
    }

    /// Get the cleanup sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl ProgressiveConfig {
    /// Get the base window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the backoff window ceiling
    pub fn max_window(&self) -> Duration {
        Duration::from_secs(self.max_window_secs)
    }

    /// Get the lockout duration
    pub fn lockout_duration(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }

    /// Get the idle-entry lifetime
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_secs)
    }
}

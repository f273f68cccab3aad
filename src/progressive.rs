// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Progressive rate limiter for authentication endpoints.
//!
//! Wraps the identity/window/token model with failure-aware
//! escalation. Each recorded failure shrinks the capacity granted to
//! the identity's next window (`base / 2^failures`, floored at a
//! configured minimum) and token-exhausted denials stretch the active
//! window by the same exponent, capped at a ceiling. Sustained failure
//! past the lockout threshold switches the identity to a timed hard
//! deny that ignores token state. One recorded success fully
//! rehabilitates the identity.
//!
//! Outcomes are values, never errors: a deny carries a retry-after
//! hint and the caller surfaces it as "too many requests".

use crate::audit::{AuditLog, EventKind, Severity};
use crate::config::ProgressiveConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Backoff base. Capacity and window scale by powers of this per
/// consecutive failure; the exponent is clamped so arithmetic stays in
/// range long after the practical limits are hit.
const BACKOFF_FACTOR: u32 = 2;
const BACKOFF_EXP_CAP: u32 = 10;

#[derive(Debug)]
struct ProgressiveEntry {
    tokens: u32,
    capacity: u32,
    window_start: Instant,
    window: Duration,
    consecutive_failures: u32,
    total_attempts: u64,
    locked_out: bool,
    lockout_until: Instant,
    last_updated: Instant,
}

impl ProgressiveEntry {
    fn fresh(capacity: u32, window: Duration, now: Instant) -> Self {
        Self {
            tokens: capacity,
            capacity,
            window_start: now,
            window,
            consecutive_failures: 0,
            total_attempts: 0,
            locked_out: false,
            lockout_until: now,
            last_updated: now,
        }
    }
}

/// Outcome of a progressive rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthVerdict {
    pub allowed: bool,
    /// Hint for the caller's Retry-After; zero when allowed.
    pub retry_after: Duration,
}

impl AuthVerdict {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
        }
    }

    fn denied(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
        }
    }
}

/// Operational counters for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressiveStats {
    pub entries: usize,
    pub total_checked: u64,
    pub total_denied: u64,
    pub lockouts: u64,
    pub evictions: u64,
    pub approx_memory_bytes: usize,
    pub uptime_secs: u64,
}

/// Failure-aware rate limiter with lockout escalation.
pub struct ProgressiveLimiter {
    config: ProgressiveConfig,
    entries: RwLock<HashMap<String, ProgressiveEntry>>,
    audit: Arc<AuditLog>,
    started: Instant,
    total_checked: AtomicU64,
    total_denied: AtomicU64,
    lockouts: AtomicU64,
    evictions: AtomicU64,
}

impl ProgressiveLimiter {
    pub fn new(config: ProgressiveConfig, audit: Arc<AuditLog>) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            audit,
            started: Instant::now(),
            total_checked: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
            lockouts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn backoff_exp(&self, failures: u32) -> u32 {
        failures.min(BACKOFF_EXP_CAP)
    }

    /// Window capacity under the current failure history:
    /// `max(min_capacity, base / 2^failures)`, never below 1.
    fn capacity_for(&self, failures: u32) -> u32 {
        let shrunk = self.config.base_capacity / BACKOFF_FACTOR.pow(self.backoff_exp(failures));
        shrunk.max(self.config.min_capacity).max(1)
    }

    /// Backoff-extended window: `min(base * 2^failures, max_window)`.
    fn window_for(&self, failures: u32) -> Duration {
        let extended =
            self.config.window_duration() * BACKOFF_FACTOR.pow(self.backoff_exp(failures));
        extended.min(self.config.max_window())
    }

    /// Check the identity against its current window and lockout state.
    ///
    /// `context` names the protected action (e.g. the login path) for
    /// the audit trail.
    pub async fn allow(&self, identity: &str, context: &str) -> AuthVerdict {
        self.total_checked.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();

        // Audit writes happen after the table lock is released.
        let mut lockout_reset = false;
        let mut exhausted_retry = None;

        let verdict = {
            let mut entries = self.entries.write().await;

            if !entries.contains_key(identity) && entries.len() >= self.config.max_entries {
                self.evict_lru(&mut entries);
            }

            let base_capacity = self.capacity_for(0);
            let base_window = self.config.window_duration();
            let entry = entries
                .entry(identity.to_string())
                .or_insert_with(|| ProgressiveEntry::fresh(base_capacity, base_window, now));
            entry.last_updated = now;

            if entry.locked_out {
                if now < entry.lockout_until {
                    let retry_after = entry.lockout_until.duration_since(now);
                    self.total_denied.fetch_add(1, Ordering::Relaxed);
                    debug!(identity = %identity, context = %context, ?retry_after, "Locked out");
                    return AuthVerdict::denied(retry_after);
                }
                // Lockout has expired; the identity starts over clean.
                entry.locked_out = false;
                entry.consecutive_failures = 0;
                entry.capacity = base_capacity;
                entry.tokens = base_capacity;
                entry.window_start = now;
                entry.window = base_window;
                lockout_reset = true;
            }

            if now.duration_since(entry.window_start) >= entry.window {
                entry.window_start = now;
                entry.window = base_window;
                entry.capacity = self.capacity_for(entry.consecutive_failures);
                entry.tokens = entry.capacity;
            }

            if entry.tokens > 0 {
                entry.tokens -= 1;
                AuthVerdict::allowed()
            } else {
                // Exhausted: stretch the active window by the backoff
                // factor so repeat offenders wait longer each round.
                entry.window = self.window_for(entry.consecutive_failures);
                let deadline = entry.window_start + entry.window;
                let retry_after = deadline.duration_since(now);
                exhausted_retry = Some(retry_after);
                AuthVerdict::denied(retry_after)
            }
        };

        if lockout_reset {
            info!(identity = %identity, "Lockout expired, counters reset");
            self.audit
                .record(
                    EventKind::LockoutReset,
                    Severity::Medium,
                    identity,
                    context,
                    "lockout expired, identity rehabilitated",
                )
                .await;
        }
        if let Some(retry_after) = exhausted_retry {
            self.total_denied.fetch_add(1, Ordering::Relaxed);
            warn!(identity = %identity, context = %context, ?retry_after, "Auth rate limit exceeded");
            self.audit
                .record(
                    EventKind::RateLimitExceeded,
                    Severity::Medium,
                    identity,
                    context,
                    format!("window exhausted, retry in {}s", retry_after.as_secs()),
                )
                .await;
        }
        verdict
    }

    /// Record a failed authentication outcome for the identity.
    pub async fn record_failure(&self, identity: &str) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(identity) && entries.len() >= self.config.max_entries {
            self.evict_lru(&mut entries);
        }

        let base_capacity = self.capacity_for(0);
        let base_window = self.config.window_duration();
        let entry = entries
            .entry(identity.to_string())
            .or_insert_with(|| ProgressiveEntry::fresh(base_capacity, base_window, now));
        entry.last_updated = now;
        entry.consecutive_failures += 1;
        entry.total_attempts += 1;
        let failures = entry.consecutive_failures;

        let newly_locked = failures >= self.config.lockout_threshold && !entry.locked_out;
        if newly_locked {
            entry.locked_out = true;
            entry.lockout_until = now + self.config.lockout_duration();
        }
        drop(entries);

        self.audit
            .record(
                EventKind::AuthFailure,
                Severity::Low,
                identity,
                "auth",
                format!("consecutive failures: {}", failures),
            )
            .await;

        if newly_locked {
            self.lockouts.fetch_add(1, Ordering::Relaxed);
            warn!(
                identity = %identity,
                failures,
                lockout_secs = self.config.lockout_secs,
                "Identity locked out"
            );
            self.audit
                .record(
                    EventKind::Lockout,
                    Severity::High,
                    identity,
                    "auth",
                    format!("{} consecutive failures", failures),
                )
                .await;
        }
    }

    /// Record a successful authentication outcome. A single success
    /// fully rehabilitates the identity.
    pub async fn record_success(&self, identity: &str) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.get_mut(identity) else {
            return;
        };
        let was_locked = entry.locked_out;
        entry.last_updated = now;
        entry.consecutive_failures = 0;
        entry.capacity = self.capacity_for(0);
        entry.tokens = entry.capacity;
        entry.window_start = now;
        entry.window = self.config.window_duration();
        entry.locked_out = false;
        drop(entries);

        self.audit
            .record(
                EventKind::AuthSuccess,
                Severity::Low,
                identity,
                "auth",
                "identity rehabilitated",
            )
            .await;
        if was_locked {
            info!(identity = %identity, "Lockout cleared by successful authentication");
        }
    }

    fn evict_lru(&self, entries: &mut HashMap<String, ProgressiveEntry>) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_updated)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(identity = %key, "Evicted least-recently-seen identity");
        }
    }

    /// Drop identities idle past the TTL. Called from the background
    /// sweep task.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let ttl = self.config.entry_ttl();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_updated) < ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Progressive limiter cleanup");
        }
    }

    /// Snapshot of operational counters.
    pub async fn stats(&self) -> ProgressiveStats {
        let entries = self.entries.read().await;
        let key_bytes: usize = entries.keys().map(|key| key.len()).sum();
        ProgressiveStats {
            entries: entries.len(),
            total_checked: self.total_checked.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            lockouts: self.lockouts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            approx_memory_bytes: key_bytes
                + entries.len() * std::mem::size_of::<(String, ProgressiveEntry)>(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

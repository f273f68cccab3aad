// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket rate limiter, basic layer.
//!
//! Fixed-window token bucket per client identity: a fresh identity (or
//! an elapsed window) gets `capacity` tokens, each allowed request
//! consumes one, and an empty bucket denies until the window turns
//! over. The table is bounded: the least-recently-seen identity is
//! evicted when full, and a periodic sweep drops identities idle past
//! their TTL.
//!
//! A deny is a normal boolean outcome, never an error. All mutation
//! happens under a single write lock per call; statistics reads take
//! the shared lock.

use crate::config::RateLimitConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Entry {
    tokens: u32,
    capacity: u32,
    window_start: Instant,
    window: Duration,
    last_updated: Instant,
}

impl Entry {
    fn fresh(capacity: u32, window: Duration, now: Instant) -> Self {
        Self {
            tokens: capacity,
            capacity,
            window_start: now,
            window,
            last_updated: now,
        }
    }
}

/// Operational counters for dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    pub entries: usize,
    pub total_checked: u64,
    pub total_denied: u64,
    pub evictions: u64,
    pub approx_memory_bytes: usize,
    pub uptime_secs: u64,
}

/// Thread-safe bounded token-bucket limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: RwLock<HashMap<String, Entry>>,
    started: Instant,
    total_checked: AtomicU64,
    total_denied: AtomicU64,
    evictions: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            started: Instant::now(),
            total_checked: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Check and consume one token using the configured defaults.
    pub async fn allow(&self, identity: &str) -> bool {
        self.allow_with(
            identity,
            self.config.max_requests,
            self.config.window_duration(),
        )
        .await
    }

    /// Check and consume one token with explicit capacity and window.
    pub async fn allow_with(&self, identity: &str, capacity: u32, window: Duration) -> bool {
        let capacity = capacity.max(1);
        self.total_checked.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();

        let mut entries = self.entries.write().await;

        if !entries.contains_key(identity) && entries.len() >= self.config.max_entries {
            self.evict_lru(&mut entries);
        }

        let entry = entries
            .entry(identity.to_string())
            .or_insert_with(|| Entry::fresh(capacity, window, now));
        entry.last_updated = now;

        if now.duration_since(entry.window_start) >= entry.window {
            entry.window_start = now;
            entry.window = window;
            entry.capacity = capacity;
            entry.tokens = capacity;
        }

        if entry.tokens > 0 {
            entry.tokens -= 1;
            true
        } else {
            drop(entries);
            self.total_denied.fetch_add(1, Ordering::Relaxed);
            debug!(identity = %identity, "Rate limit exceeded");
            false
        }
    }

    fn evict_lru(&self, entries: &mut HashMap<String, Entry>) {
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
    /// sweep task, never on the request path.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let ttl = self.config.entry_ttl();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_updated) < ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Rate limiter cleanup");
        }
    }

    /// Snapshot of operational counters.
    pub async fn stats(&self) -> LimiterStats {
        let entries = self.entries.read().await;
        let key_bytes: usize = entries.keys().map(|key| key.len()).sum();
        LimiterStats {
            entries: entries.len(),
            total_checked: self.total_checked.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            approx_memory_bytes: key_bytes
                + entries.len() * std::mem::size_of::<(String, Entry)>(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

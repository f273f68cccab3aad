// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory security audit trail.
//!
//! A bounded ring of recent security events for operator dashboards and
//! incident triage. Nothing here is persisted; the ring resets with the
//! process.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Event severity, for dashboard filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    RateLimitExceeded,
    Lockout,
    LockoutReset,
    AuthFailure,
    AuthSuccess,
    UnresolvedIdentity,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::RateLimitExceeded => "rate-limit-exceeded",
            Self::Lockout => "lockout",
            Self::LockoutReset => "lockout-reset",
            Self::AuthFailure => "auth-failure",
            Self::AuthSuccess => "auth-success",
            Self::UnresolvedIdentity => "unresolved-identity",
        };
        write!(f, "{}", label)
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub identity: String,
    pub context: String,
    pub severity: Severity,
    pub description: String,
}

/// Bounded append-only event ring.
pub struct AuditLog {
    capacity: usize,
    events: RwLock<VecDeque<SecurityEvent>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: RwLock::new(VecDeque::new()),
        }
    }

    pub async fn record(
        &self,
        kind: EventKind,
        severity: Severity,
        identity: &str,
        context: &str,
        description: impl Into<String>,
    ) {
        let event = SecurityEvent {
            timestamp: Utc::now(),
            kind,
            identity: identity.to_string(),
            context: context.to_string(),
            severity,
            description: description.into(),
        };
        let mut events = self.events.write().await;
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

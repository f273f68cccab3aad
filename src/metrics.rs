// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the ingress guard.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Request-level counters exported at `/metrics`.
pub struct GuardMetrics {
    registry: Registry,
    pub upload_checks: IntCounter,
    pub upload_accepted: IntCounter,
    pub upload_rejected: IntCounter,
    pub auth_checks: IntCounter,
    pub auth_denied: IntCounter,
    pub auth_failures_reported: IntCounter,
    pub auth_successes_reported: IntCounter,
    pub unresolved_identities: IntCounter,
}

impl GuardMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let upload_checks = IntCounter::new(
            "ingress_upload_checks_total",
            "Upload provenance checks processed",
        )?;
        let upload_accepted = IntCounter::new(
            "ingress_upload_accepted_total",
            "Uploads with a provenance marker found",
        )?;
        let upload_rejected = IntCounter::new(
            "ingress_upload_rejected_total",
            "Uploads rejected (no provenance marker)",
        )?;
        let auth_checks = IntCounter::new(
            "ingress_auth_checks_total",
            "Authentication rate limit checks processed",
        )?;
        let auth_denied = IntCounter::new(
            "ingress_auth_denied_total",
            "Authentication checks denied by rate limiting",
        )?;
        let auth_failures_reported = IntCounter::new(
            "ingress_auth_failures_reported_total",
            "Failed authentication outcomes reported",
        )?;
        let auth_successes_reported = IntCounter::new(
            "ingress_auth_successes_reported_total",
            "Successful authentication outcomes reported",
        )?;
        let unresolved_identities = IntCounter::new(
            "ingress_unresolved_identities_total",
            "Requests allowed fail-open because no client identity resolved",
        )?;

        for counter in [
            &upload_checks,
            &upload_accepted,
            &upload_rejected,
            &auth_checks,
            &auth_denied,
            &auth_failures_reported,
            &auth_successes_reported,
            &unresolved_identities,
        ] {
            registry.register(Box::new(counter.clone()))?;
        }

        Ok(Self {
            registry,
            upload_checks,
            upload_accepted,
            upload_rejected,
            auth_checks,
            auth_denied,
            auth_failures_reported,
            auth_successes_reported,
            unresolved_identities,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

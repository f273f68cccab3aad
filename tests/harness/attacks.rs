// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Attack simulation patterns for security testing.

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of authentication attempts to send
    pub total_requests: usize,
    /// Number of unique IPs to simulate
    pub unique_ips: usize,
    /// Fraction of completed attempts that fail credential validation
    /// (0.0-1.0)
    pub failure_ratio: f64,
    /// Whether outcomes are reported back to the limiter
    pub report_outcomes: bool,
    /// Simulated pause between attempts, in seconds of paused-clock
    /// time (0 = as fast as possible)
    pub inter_request_secs: u64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            unique_ips: 1,
            failure_ratio: 1.0,
            report_outcomes: true,
            inter_request_secs: 0,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Credential stuffing - one IP hammering the login endpoint with
    /// failing credentials.
    pub fn credential_stuffing() -> Self {
        Self {
            total_requests: 200,
            unique_ips: 1,
            ..Default::default()
        }
    }

    /// Distributed probe - many IPs, few failing attempts each, trying
    /// to stay under per-identity thresholds.
    pub fn distributed_probe() -> Self {
        Self {
            total_requests: 300,
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// Legitimate traffic - successful logins at a human rate.
    pub fn legitimate_traffic() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            failure_ratio: 0.0,
            inter_request_secs: 5,
            ..Default::default()
        }
    }

    /// Fat-fingered user - occasional failures mixed with successes,
    /// spaced out in time.
    pub fn mixed_outcomes() -> Self {
        Self {
            total_requests: 40,
            unique_ips: 1,
            failure_ratio: 0.3,
            inter_request_secs: 10,
            ..Default::default()
        }
    }

    /// Slow drip - a single IP pacing itself under the window allowance.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 100,
            unique_ips: 1,
            failure_ratio: 1.0,
            report_outcomes: false,
            inter_request_secs: 7,
        }
    }
}

// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metrics collection for attack simulation results.

use std::collections::HashMap;

/// Possible outcomes for a simulated attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    Denied,
    FailureReported,
    SuccessReported,
}

/// Collects metrics during attack simulation.
#[derive(Debug, Default)]
pub struct AttackMetrics {
    outcomes: HashMap<Outcome, usize>,
    requests_per_ip: HashMap<String, usize>,
}

impl AttackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt outcome.
    pub fn record(&mut self, outcome: Outcome, ip: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if matches!(outcome, Outcome::Allowed | Outcome::Denied) {
            *self.requests_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        }
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Total limiter decisions (allowed + denied).
    pub fn total_checks(&self) -> usize {
        self.count(Outcome::Allowed) + self.count(Outcome::Denied)
    }

    /// Ratio of denied to total decisions.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_checks();
        if total == 0 {
            return 0.0;
        }
        self.count(Outcome::Denied) as f64 / total as f64
    }

    /// Number of unique IPs that made attempts.
    pub fn unique_ips(&self) -> usize {
        self.requests_per_ip.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            total_checks: self.total_checks(),
            allowed: self.count(Outcome::Allowed),
            denied: self.count(Outcome::Denied),
            failures_reported: self.count(Outcome::FailureReported),
            successes_reported: self.count(Outcome::SuccessReported),
            block_rate: self.block_rate(),
            unique_ips: self.unique_ips(),
        }
    }
}

/// Summary report of attack metrics.
#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub total_checks: usize,
    pub allowed: usize,
    pub denied: usize,
    pub failures_reported: usize,
    pub successes_reported: usize,
    pub block_rate: f64,
    pub unique_ips: usize,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Attack Metrics Report ===")?;
        writeln!(f, "Total Checks:       {}", self.total_checks)?;
        writeln!(
            f,
            "Allowed:            {} ({:.1}%)",
            self.allowed,
            if self.total_checks > 0 {
                self.allowed as f64 / self.total_checks as f64 * 100.0
            } else {
                0.0
            }
        )?;
        writeln!(f, "Denied:             {}", self.denied)?;
        writeln!(f, "Failures Reported:  {}", self.failures_reported)?;
        writeln!(f, "Successes Reported: {}", self.successes_reported)?;
        writeln!(f, "Block Rate:         {:.1}%", self.block_rate * 100.0)?;
        writeln!(f, "Unique IPs:         {}", self.unique_ips)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let mut metrics = AttackMetrics::new();
        metrics.record(Outcome::Allowed, "10.0.0.1");
        metrics.record(Outcome::Allowed, "10.0.0.2");
        metrics.record(Outcome::Denied, "10.0.0.1");
        metrics.record(Outcome::FailureReported, "10.0.0.1");

        assert_eq!(metrics.total_checks(), 3);
        assert_eq!(metrics.count(Outcome::Allowed), 2);
        assert_eq!(metrics.unique_ips(), 2);
        assert!((metrics.block_rate() - 1.0 / 3.0).abs() < 0.01);
    }
}

// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the rate limiting layers.

use image_ingress_guard::audit::AuditLog;
use image_ingress_guard::config::{ProgressiveConfig, RateLimitConfig};
use image_ingress_guard::limiter::RateLimiter;
use image_ingress_guard::progressive::ProgressiveLimiter;
use std::sync::Arc;
use std::time::Duration;

fn progressive(config: ProgressiveConfig) -> ProgressiveLimiter {
    ProgressiveLimiter::new(config, Arc::new(AuditLog::new(1000)))
}

#[tokio::test]
async fn test_capacity_two_scenario() {
    // capacity=2, refill=1m; three calls in quick succession.
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: 2,
        window_secs: 60,
        ..Default::default()
    });

    let outcomes = [
        limiter.allow("1.2.3.4").await,
        limiter.allow("1.2.3.4").await,
        limiter.allow("1.2.3.4").await,
    ];
    assert_eq!(outcomes, [true, true, false]);
}

#[tokio::test]
async fn test_token_bucket_monotonicity() {
    for capacity in [1u32, 3, 10, 47] {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: capacity,
            ..Default::default()
        });
        for i in 0..capacity {
            assert!(
                limiter.allow("10.1.1.1").await,
                "request {} of {} should pass",
                i + 1,
                capacity
            );
        }
        assert!(
            !limiter.allow("10.1.1.1").await,
            "request {} should be denied",
            capacity + 1
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_window_reset() {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: 1,
        window_secs: 30,
        ..Default::default()
    });

    assert!(limiter.allow("10.1.1.1").await);
    assert!(!limiter.allow("10.1.1.1").await);

    tokio::time::advance(Duration::from_secs(31)).await;
    assert!(limiter.allow("10.1.1.1").await);
}

#[tokio::test]
async fn test_identity_independence() {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_requests: 2,
        ..Default::default()
    });

    // Exhaust identity A.
    limiter.allow("10.0.0.1").await;
    limiter.allow("10.0.0.1").await;
    assert!(!limiter.allow("10.0.0.1").await);

    // Identity B is unaffected.
    assert!(limiter.allow("10.0.0.2").await);
}

#[tokio::test]
async fn test_eviction_bound_holds() {
    let limiter = RateLimiter::new(RateLimitConfig {
        max_entries: 16,
        ..Default::default()
    });

    for i in 0..17 {
        limiter.allow(&format!("192.0.2.{}", i)).await;
    }
    assert_eq!(limiter.stats().await.entries, 16);
}

#[tokio::test(start_paused = true)]
async fn test_progressive_rehabilitation() {
    let config = ProgressiveConfig {
        base_capacity: 6,
        lockout_threshold: 5,
        window_secs: 60,
        ..Default::default()
    };
    let limiter = progressive(config);
    let identity = "203.0.113.5";

    // One short of lockout, then a success.
    for _ in 0..4 {
        limiter.record_failure(identity).await;
    }
    limiter.record_success(identity).await;

    // Fully rehabilitated: the full base capacity is available and a
    // further failure does not lock the identity out.
    let mut allowed = 0;
    while limiter.allow(identity, "/login").await.allowed {
        allowed += 1;
    }
    assert_eq!(allowed, 6, "base capacity should be restored");

    limiter.record_failure(identity).await;
    assert_eq!(limiter.stats().await.lockouts, 0);
}

#[tokio::test(start_paused = true)]
async fn test_lockout_enforced_until_expiry() {
    let config = ProgressiveConfig {
        base_capacity: 100,
        lockout_threshold: 3,
        lockout_secs: 600,
        ..Default::default()
    };
    let limiter = progressive(config);
    let identity = "203.0.113.9";

    for _ in 0..3 {
        limiter.record_failure(identity).await;
    }

    // Denied regardless of plentiful tokens.
    let verdict = limiter.allow(identity, "/login").await;
    assert!(!verdict.allowed);
    assert!(verdict.retry_after <= Duration::from_secs(600));
    assert!(verdict.retry_after > Duration::from_secs(590));

    tokio::time::advance(Duration::from_secs(599)).await;
    assert!(!limiter.allow(identity, "/login").await.allowed);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(limiter.allow(identity, "/login").await.allowed);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_shrinks_next_window_capacity() {
    let config = ProgressiveConfig {
        base_capacity: 8,
        min_capacity: 1,
        window_secs: 60,
        lockout_threshold: 100,
        ..Default::default()
    };
    let limiter = progressive(config);
    let identity = "203.0.113.17";

    limiter.record_failure(identity).await;
    limiter.record_failure(identity).await;
    tokio::time::advance(Duration::from_secs(61)).await;

    let mut allowed = 0;
    while limiter.allow(identity, "/login").await.allowed {
        allowed += 1;
    }
    assert_eq!(allowed, 2, "two failures should quarter capacity 8 -> 2");
}

#[tokio::test]
async fn test_audit_trail_records_lockout() {
    let audit = Arc::new(AuditLog::new(100));
    let limiter = ProgressiveLimiter::new(
        ProgressiveConfig {
            lockout_threshold: 2,
            ..Default::default()
        },
        audit.clone(),
    );

    limiter.record_failure("198.51.100.3").await;
    limiter.record_failure("198.51.100.3").await;

    let recent = audit.recent(10).await;
    assert!(recent
        .iter()
        .any(|event| event.kind == image_ingress_guard::audit::EventKind::Lockout));
}

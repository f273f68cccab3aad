// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Header combinations an attacker might forge to dodge per-IP
/// attribution: (X-Forwarded-For, X-Real-IP) pairs.
pub fn generate_spoofed_headers() -> Vec<(Option<&'static str>, Option<&'static str>)> {
    vec![
        // Garbage leftmost entry
        (Some("not-an-ip, 198.51.100.7"), None),
        // Empty header values
        (Some(""), Some("")),
        (Some("   "), Some("   ")),
        // Script injection attempts
        (Some("<script>alert(1)</script>"), None),
        // Overlong nonsense
        (Some("999.999.999.999"), None),
        // Valid-looking but port-suffixed
        (Some("198.51.100.7:8080"), None),
        // IPv6 variants
        (Some("[2001:db8::1]:443"), None),
        (Some("2001:db8::2"), None),
        // Real-IP only
        (None, Some("192.0.2.55")),
        // Nothing at all
        (None, None),
    ]
}

/// Deterministic "random" boolean based on index and ratio.
pub fn rand_bool(ratio: f64, index: usize) -> bool {
    if ratio >= 1.0 {
        true
    } else if ratio <= 0.0 {
        false
    } else {
        (index as f64 * 0.618033988749895) % 1.0 < ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips_unique() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_rand_bool_extremes() {
        assert!(rand_bool(1.0, 7));
        assert!(!rand_bool(0.0, 7));
    }
}

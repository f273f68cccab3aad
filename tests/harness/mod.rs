// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for ingress guard attack simulation.
//!
//! This module provides utilities for simulating abuse patterns
//! against the rate limiting layers to validate security controls.

pub mod attacks;
pub mod generators;
pub mod metrics;

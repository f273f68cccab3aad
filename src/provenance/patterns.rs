// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Byte-pattern primitives for provenance scanning.
//!
//! All matchers are case-insensitive over ASCII and operate on raw
//! bytes, so they work on any container format without decoding it.
//! Generator tools embed their markers either as plain ASCII text or
//! as UTF-16 (both endiannesses observed in the wild), so every
//! keyword scan runs in all three encodings.

/// Case-insensitive ASCII substring search over raw bytes.
pub fn contains_ci(haystack: &[u8], needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

/// Case-insensitive ASCII substring search, returning the match offset.
pub fn find_ci(haystack: &[u8], needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Encode an ASCII pattern as UTF-16LE bytes.
pub fn utf16le_pattern(pattern: &str) -> Vec<u8> {
    pattern.as_bytes().iter().flat_map(|&b| [b, 0u8]).collect()
}

/// Encode an ASCII pattern as UTF-16BE bytes.
pub fn utf16be_pattern(pattern: &str) -> Vec<u8> {
    pattern.as_bytes().iter().flat_map(|&b| [0u8, b]).collect()
}

fn window_matches_utf16(window: &[u8], needle: &[u8], little_endian: bool) -> bool {
    needle.iter().enumerate().all(|(i, nb)| {
        let (lo, hi) = if little_endian {
            (window[2 * i], window[2 * i + 1])
        } else {
            (window[2 * i + 1], window[2 * i])
        };
        hi == 0 && lo.eq_ignore_ascii_case(nb)
    })
}

/// Case-insensitive search for an ASCII pattern encoded as UTF-16,
/// in either endianness.
pub fn contains_utf16_ci(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    let width = needle.len() * 2;
    if width == 0 || haystack.len() < width {
        return false;
    }
    haystack.windows(width).any(|w| {
        window_matches_utf16(w, needle, true) || window_matches_utf16(w, needle, false)
    })
}

/// Search all three observed encodings: ASCII, UTF-16LE, UTF-16BE.
pub fn contains_any_encoding_ci(haystack: &[u8], needle: &str) -> bool {
    contains_ci(haystack, needle) || contains_utf16_ci(haystack, needle)
}

// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stage 1: C2PA/JUMBF content-credential sniff.
//!
//! Looks for the byte signatures of embedded Content Credentials. The
//! claims are not cryptographically verified here; presence alone is the
//! strongest provenance evidence the cascade handles, so this stage runs
//! first. The generating tool is refined from the XMP fragment when one
//! accompanies the upload.

use super::patterns::contains_ci;
use super::{DetectionMethod, DetectionResult, Provider};

/// Byte substrings indicating an embedded C2PA/JUMBF manifest.
const C2PA_MARKERS: &[&str] = &["c2pa", "jumbf", "contentcredentials"];

pub fn detect(image: &[u8], xmp: Option<&[u8]>) -> Option<DetectionResult> {
    let marker = C2PA_MARKERS
        .iter()
        .find(|marker| contains_ci(image, marker))?;

    let provider = xmp.map_or(Provider::UnknownC2pa, refine_provider);
    Some(DetectionResult::new(
        provider,
        DetectionMethod::C2pa,
        format!("{} signature present", marker),
    ))
}

/// Attribute the credential to a known vendor from XMP keywords.
fn refine_provider(xmp: &[u8]) -> Provider {
    if contains_ci(xmp, "openai") || contains_ci(xmp, "dall-e") {
        Provider::DallE
    } else if contains_ci(xmp, "adobe") && contains_ci(xmp, "firefly") {
        Provider::AdobeFirefly
    } else if contains_ci(xmp, "google ai") {
        Provider::GoogleImagen
    } else {
        Provider::UnknownC2pa
    }
}

// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stage 4: XMP fragment scan.
//!
//! Runs only when the caller extracted an XMP packet from the upload.
//! Two conjunctive rules handle tools that write the IPTC
//! trained-algorithmic-media URI without naming themselves: Midjourney
//! pairs it with a GUID-shaped digital-image identifier, Google Imagen
//! with a "made with google ai" credit line. The plain keyword families
//! from the binary scan apply afterwards, and a bare URI falls back to
//! the generic IPTC marker.

use super::{DetectionMethod, DetectionResult, Provider, IPTC_TRAINED_MEDIA_URI};
use regex::Regex;

const XMP_SIGNATURES: &[(&str, Provider)] = &[
    ("midjourney", Provider::Midjourney),
    ("dall-e", Provider::DallE),
    ("openai", Provider::DallE),
    ("grok", Provider::Grok),
    ("comfyui", Provider::ComfyUi),
    ("sui_image_params", Provider::StableDiffusion),
    ("stable diffusion", Provider::StableDiffusion),
    ("sdxl", Provider::StableDiffusion),
    ("negative prompt", Provider::StableDiffusion),
    ("flux.1", Provider::Flux),
    ("black forest labs", Provider::Flux),
];

pub fn detect(xmp: &[u8], guid_re: &Regex, permissive_prompt_scan: bool) -> Option<DetectionResult> {
    if xmp.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(xmp);
    let lower = text.to_lowercase();
    let has_trained_media_uri = lower.contains(&IPTC_TRAINED_MEDIA_URI.to_lowercase());

    if has_trained_media_uri && guid_re.is_match(&text) {
        return Some(DetectionResult::new(
            Provider::Midjourney,
            DetectionMethod::Xmp,
            "trained-media URI with GUID identifier",
        ));
    }

    if has_trained_media_uri && lower.contains("made with google ai") {
        return Some(DetectionResult::new(
            Provider::GoogleImagen,
            DetectionMethod::Xmp,
            "trained-media URI with Google AI credit",
        ));
    }

    for (needle, provider) in XMP_SIGNATURES {
        if lower.contains(needle) {
            return Some(DetectionResult::new(
                *provider,
                DetectionMethod::Xmp,
                format!("'{}' in XMP packet", needle),
            ));
        }
    }

    if has_trained_media_uri {
        return Some(DetectionResult::new(
            Provider::IptcTrainedMedia,
            DetectionMethod::Xmp,
            "trained-media URI in XMP packet",
        ));
    }

    if permissive_prompt_scan && lower.contains("prompt") {
        return Some(DetectionResult::new(
            Provider::PromptEmbedded,
            DetectionMethod::Xmp,
            "'prompt' in XMP packet",
        ));
    }

    None
}

// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stage 3: whole-file binary text scan.
//!
//! Catches generation parameters embedded in containers the EXIF
//! walker does not cover: PNG tEXt/iTXt chunks, WebP chunks, raw
//! appended JSON. Every signature is checked as ASCII and as UTF-16 in
//! both endiannesses.

use super::patterns::contains_any_encoding_ci;
use super::{DetectionMethod, DetectionResult, Provider};

/// Tool signatures in confidence order.
const BINARY_SIGNATURES: &[(&str, Provider)] = &[
    // Grok phrases
    ("grok", Provider::Grok),
    // ComfyUI node-graph JSON
    ("comfyui", Provider::ComfyUi),
    ("\"class_type\"", Provider::ComfyUi),
    ("\"workflow\"", Provider::ComfyUi),
    // Stable Diffusion / SDXL / SwarmUI
    ("sui_image_params", Provider::StableDiffusion),
    ("stable diffusion", Provider::StableDiffusion),
    ("sdxl", Provider::StableDiffusion),
    ("negative prompt", Provider::StableDiffusion),
    // FLUX
    ("flux.1", Provider::Flux),
    ("black forest labs", Provider::Flux),
];

pub fn detect(image: &[u8], permissive_prompt_scan: bool) -> Option<DetectionResult> {
    for (needle, provider) in BINARY_SIGNATURES {
        if contains_any_encoding_ci(image, needle) {
            return Some(DetectionResult::new(
                *provider,
                DetectionMethod::BinaryScan,
                format!("'{}' in file bytes", needle),
            ));
        }
    }

    // Deliberately permissive catch-all: a bare "prompt" occurrence in
    // an ordinary text-bearing image is an accepted false positive.
    if permissive_prompt_scan && contains_any_encoding_ci(image, "prompt") {
        return Some(DetectionResult::new(
            Provider::PromptEmbedded,
            DetectionMethod::BinaryScan,
            "'prompt' in file bytes",
        ));
    }

    None
}

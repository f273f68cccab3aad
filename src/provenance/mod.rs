// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! AI-provenance classification for uploaded images.
//!
//! Given raw image bytes (and optionally a pre-extracted XMP fragment),
//! decides whether the image carries markers of a generative-AI tool and
//! identifies the tool and the detection method. Detection is an ordered
//! cascade from strongest evidence to weakest:
//!
//! 1. C2PA/JUMBF content-credential sniff
//! 2. Structured EXIF tag scan
//! 3. Whole-file binary text scan (ASCII + UTF-16)
//! 4. XMP fragment scan
//!
//! The first matching stage wins. No stage performs I/O; classification
//! is a pure function of the input bytes and is safe to call from any
//! number of request handlers concurrently.
//!
//! Absence of markers is a normal negative result (`None`), not an
//! error: tools can strip metadata, and a marker-free AI image is an
//! accepted false negative.

pub mod binary;
pub mod c2pa;
pub mod exif;
pub mod patterns;
pub mod xmp;

use crate::config::ClassifierConfig;
use regex::Regex;
use tracing::debug;

/// The IPTC digital source type URI for trained algorithmic media.
/// Written into metadata by tools that follow the IPTC photo-metadata
/// standard for AI-generated content.
pub const IPTC_TRAINED_MEDIA_URI: &str =
    "http://cv.iptc.org/newscodes/digitalsourcetype/trainedAlgorithmicMedia";

/// Inferred generator of an AI image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Midjourney,
    DallE,
    StableDiffusion,
    Flux,
    Grok,
    ComfyUi,
    GoogleImagen,
    AdobeFirefly,
    /// Metadata carries the IPTC trained-algorithmic-media marker but no
    /// tool-specific signature.
    IptcTrainedMedia,
    /// Generation parameters (prompt, sampler, seed, ...) embedded in
    /// metadata without a recognizable tool name.
    PromptEmbedded,
    /// C2PA content credentials present but the signing tool is not one
    /// we recognize.
    UnknownC2pa,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Midjourney => "Midjourney",
            Self::DallE => "DALL-E (OpenAI)",
            Self::StableDiffusion => "Stable Diffusion",
            Self::Flux => "FLUX (Black Forest Labs)",
            Self::Grok => "Grok (xAI)",
            Self::ComfyUi => "ComfyUI",
            Self::GoogleImagen => "Google Imagen",
            Self::AdobeFirefly => "Adobe Firefly",
            Self::IptcTrainedMedia => "AI (IPTC Trained Media)",
            Self::PromptEmbedded => "AI (Prompt Embedded)",
            Self::UnknownC2pa => "AI (C2PA, unknown tool)",
        };
        write!(f, "{}", label)
    }
}

/// Which cascade stage produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionMethod {
    C2pa,
    Exif,
    Xmp,
    BinaryScan,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::C2pa => "c2pa",
            Self::Exif => "exif",
            Self::Xmp => "xmp",
            Self::BinaryScan => "binary-scan",
        };
        write!(f, "{}", label)
    }
}

/// Outcome of a positive classification.
///
/// `details` names the matched field or a value snippet for audit logs.
/// It is advisory, not authoritative, and must not be shown to end
/// users (it would leak detection heuristics to anyone probing the
/// filter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    pub provider: Provider,
    pub method: DetectionMethod,
    pub details: String,
}

impl DetectionResult {
    pub fn new(provider: Provider, method: DetectionMethod, details: impl Into<String>) -> Self {
        Self {
            provider,
            method,
            details: details.into(),
        }
    }
}

/// Detector stage signature. Each stage is independent and testable in
/// isolation; the orchestrator walks them in confidence order.
type Detector = fn(&ProvenanceClassifier, &[u8], Option<&[u8]>) -> Option<DetectionResult>;

fn stage_c2pa(_cx: &ProvenanceClassifier, image: &[u8], xmp: Option<&[u8]>) -> Option<DetectionResult> {
    c2pa::detect(image, xmp)
}

fn stage_exif(_cx: &ProvenanceClassifier, image: &[u8], _xmp: Option<&[u8]>) -> Option<DetectionResult> {
    exif::detect(image)
}

fn stage_binary(cx: &ProvenanceClassifier, image: &[u8], _xmp: Option<&[u8]>) -> Option<DetectionResult> {
    binary::detect(image, cx.config.permissive_prompt_scan)
}

fn stage_xmp(cx: &ProvenanceClassifier, _image: &[u8], xmp: Option<&[u8]>) -> Option<DetectionResult> {
    let fragment = xmp?;
    xmp::detect(fragment, &cx.guid_re, cx.config.permissive_prompt_scan)
}

const CASCADE: &[Detector] = &[stage_c2pa, stage_exif, stage_binary, stage_xmp];

/// Multi-stage AI-provenance classifier.
///
/// Stateless apart from configuration and one compiled regex; a single
/// instance is shared across all request handlers.
pub struct ProvenanceClassifier {
    config: ClassifierConfig,
    guid_re: Regex,
}

impl ProvenanceClassifier {
    /// Create a classifier with the given configuration.
    pub fn new(config: ClassifierConfig) -> Self {
        // GUID-shaped token, as written by Midjourney into its XMP
        // digital-image identifier.
        let guid_re = Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .expect("static GUID pattern compiles");
        Self { config, guid_re }
    }

    /// Classify raw image bytes, with an optional pre-extracted XMP
    /// fragment.
    ///
    /// Returns `Some(result)` when any stage finds a provenance marker,
    /// `None` otherwise. `None` means "no marker found" and callers
    /// reject the upload on it; it is never an internal failure.
    pub fn classify(&self, image: &[u8], xmp: Option<&[u8]>) -> Option<DetectionResult> {
        if image.is_empty() && xmp.map_or(true, |x| x.is_empty()) {
            return None;
        }

        for stage in CASCADE {
            if let Some(result) = stage(self, image, xmp) {
                debug!(
                    provider = %result.provider,
                    method = %result.method,
                    details = %result.details,
                    "Provenance marker found"
                );
                return Some(result);
            }
        }
        None
    }
}

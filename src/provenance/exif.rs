// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Stage 2: structured EXIF scan.
//!
//! Locates the EXIF/TIFF blob inside the upload, walks its IFDs with a
//! minimal bounds-checked reader, and runs an ordered rule set over the
//! decoded (tag name, value) pairs. Generators leave markers in
//! predictable places: `Software` names the tool outright, Stable
//! Diffusion frontends dump parameter blocks into `UserComment` or
//! `ImageDescription`, IPTC-conformant tools write the
//! trained-algorithmic-media URI.
//!
//! The raw blob is additionally scanned for UTF-16 encoded markers
//! after the structured pass, for encodings the tag decoder does not
//! cover.

use super::patterns::contains_utf16_ci;
use super::{DetectionMethod, DetectionResult, Provider, IPTC_TRAINED_MEDIA_URI};

/// Known tool substrings for the `Software` tag.
const SOFTWARE_TOOLS: &[(&str, Provider)] = &[
    ("midjourney", Provider::Midjourney),
    ("dall-e", Provider::DallE),
    ("dall\u{00b7}e", Provider::DallE),
    ("openai", Provider::DallE),
    ("stable diffusion", Provider::StableDiffusion),
    ("sdxl", Provider::StableDiffusion),
    ("flux", Provider::Flux),
    ("black forest labs", Provider::Flux),
];

/// Generation-parameter vocabulary. A value matching at least two
/// distinct entries is treated as an embedded parameter block.
const GENERATION_KEYWORDS: &[&str] = &[
    "negative prompt",
    "prompt",
    "sampler",
    "steps",
    "cfg",
    "seed",
    "model",
];

/// Keys Stable-Diffusion-style frontends use in JSON parameter payloads.
const GENERATION_JSON_KEYS: &[&str] = &[
    "prompt",
    "negative_prompt",
    "sampler",
    "sampler_name",
    "steps",
    "cfg",
    "cfg_scale",
    "seed",
    "model",
];

/// Tags whose values commonly carry whole prompt payloads.
const PROMPT_BEARING_TAGS: &[&str] = &["UserComment", "ImageDescription", "XPComment"];

// TIFF field types.
const TYPE_BYTE: u16 = 1;
const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;

const MAX_IFDS: usize = 4;
const MAX_ENTRIES_PER_IFD: usize = 512;
const MAX_VALUE_BYTES: usize = 1 << 20;

const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;

const TAG_NAMES: &[(u16, &str)] = &[
    (0x010E, "ImageDescription"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013B, "Artist"),
    (0x8298, "Copyright"),
    (0x9286, "UserComment"),
    (0x9C9B, "XPTitle"),
    (0x9C9C, "XPComment"),
    (0x9C9D, "XPAuthor"),
    (0x9C9E, "XPKeywords"),
    (0x9C9F, "XPSubject"),
    (0xA420, "ImageUniqueID"),
];

fn tag_name(tag: u16) -> String {
    TAG_NAMES
        .iter()
        .find(|(id, _)| *id == tag)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("Tag{:04X}", tag))
}

/// One decoded EXIF field.
#[derive(Debug, Clone)]
struct ExifField {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Le,
    Be,
}

impl Endian {
    fn u16(self, buf: &[u8], off: usize) -> Option<u16> {
        let bytes: [u8; 2] = buf.get(off..off + 2)?.try_into().ok()?;
        Some(match self {
            Self::Le => u16::from_le_bytes(bytes),
            Self::Be => u16::from_be_bytes(bytes),
        })
    }

    fn u32(self, buf: &[u8], off: usize) -> Option<u32> {
        let bytes: [u8; 4] = buf.get(off..off + 4)?.try_into().ok()?;
        Some(match self {
            Self::Le => u32::from_le_bytes(bytes),
            Self::Be => u32::from_be_bytes(bytes),
        })
    }
}

/// Find the TIFF structure: either an `Exif\0\0` APP1 payload anywhere
/// in the file, or a bare TIFF header at the start. Returns the slice
/// from the TIFF header to the end of the input.
fn locate_tiff(image: &[u8]) -> Option<&[u8]> {
    if image.starts_with(b"II*\x00") || image.starts_with(b"MM\x00*") {
        return Some(image);
    }
    let marker = b"Exif\x00\x00";
    let pos = image
        .windows(marker.len())
        .position(|w| w == marker)?;
    image.get(pos + marker.len()..)
}

/// Walk IFD0, the EXIF sub-IFD, and chained IFDs, decoding text-bearing
/// fields. Malformed structures degrade to whatever was parseable.
fn parse_fields(tiff: &[u8]) -> Vec<ExifField> {
    let mut fields = Vec::new();

    let endian = match tiff.get(0..2) {
        Some(b"II") => Endian::Le,
        Some(b"MM") => Endian::Be,
        _ => return fields,
    };
    if endian.u16(tiff, 2) != Some(42) {
        return fields;
    }

    let mut queue = vec![endian.u32(tiff, 4).unwrap_or(0) as usize];
    let mut visited = Vec::new();

    while let Some(ifd_offset) = queue.pop() {
        if ifd_offset == 0 || visited.contains(&ifd_offset) || visited.len() >= MAX_IFDS {
            continue;
        }
        visited.push(ifd_offset);

        let Some(count) = endian.u16(tiff, ifd_offset) else {
            continue;
        };
        let count = (count as usize).min(MAX_ENTRIES_PER_IFD);

        for i in 0..count {
            let entry = ifd_offset + 2 + i * 12;
            let (Some(tag), Some(typ), Some(value_count)) = (
                endian.u16(tiff, entry),
                endian.u16(tiff, entry + 2),
                endian.u32(tiff, entry + 4),
            ) else {
                break;
            };

            if tag == TAG_EXIF_IFD_POINTER {
                if let Some(sub) = endian.u32(tiff, entry + 8) {
                    queue.push(sub as usize);
                }
                continue;
            }

            if let Some(data) = field_data(tiff, endian, entry, typ, value_count) {
                if let Some(value) = decode_value(tag, typ, data, endian) {
                    if !value.is_empty() {
                        fields.push(ExifField {
                            name: tag_name(tag),
                            value,
                        });
                    }
                }
            }
        }

        // Chained IFD (IFD1 thumbnail metadata and beyond).
        if let Some(next) = endian.u32(tiff, ifd_offset + 2 + count * 12) {
            queue.push(next as usize);
        }
    }

    fields
}

fn type_size(typ: u16) -> usize {
    match typ {
        TYPE_BYTE | TYPE_ASCII | TYPE_UNDEFINED => 1,
        TYPE_SHORT => 2,
        TYPE_LONG => 4,
        5 | 10 => 8, // RATIONAL / SRATIONAL
        _ => 1,
    }
}

/// Resolve an entry's data bytes, whether stored inline or at an offset.
fn field_data<'a>(
    tiff: &'a [u8],
    endian: Endian,
    entry: usize,
    typ: u16,
    count: u32,
) -> Option<&'a [u8]> {
    let total = (count as usize).checked_mul(type_size(typ))?;
    if total == 0 || total > MAX_VALUE_BYTES {
        return None;
    }
    if total <= 4 {
        tiff.get(entry + 8..entry + 8 + total)
    } else {
        let offset = endian.u32(tiff, entry + 8)? as usize;
        tiff.get(offset..offset.checked_add(total)?)
    }
}

fn decode_value(tag: u16, typ: u16, data: &[u8], endian: Endian) -> Option<String> {
    let text = match typ {
        TYPE_ASCII => String::from_utf8_lossy(data)
            .trim_matches(|c: char| c == '\0' || c == ' ')
            .to_string(),
        TYPE_UNDEFINED if tag == TAG_USER_COMMENT => decode_user_comment(data, endian)?,
        TYPE_UNDEFINED => String::from_utf8_lossy(data)
            .trim_matches('\0')
            .to_string(),
        // XP* tags are BYTE-typed UTF-16LE regardless of TIFF byte order.
        TYPE_BYTE if (0x9C9B..=0x9C9F).contains(&tag) => decode_utf16(data, Endian::Le),
        TYPE_SHORT => join_numeric(data, 2, endian),
        TYPE_LONG => join_numeric(data, 4, endian),
        _ => return None,
    };
    Some(text)
}

/// UserComment starts with an 8-byte character-code header.
fn decode_user_comment(data: &[u8], endian: Endian) -> Option<String> {
    if data.len() < 8 {
        return Some(String::from_utf8_lossy(data).trim_matches('\0').to_string());
    }
    let (header, body) = data.split_at(8);
    let text = if header.starts_with(b"ASCII") {
        String::from_utf8_lossy(body).trim_matches('\0').to_string()
    } else if header.starts_with(b"UNICODE") {
        decode_utf16(body, endian)
    } else {
        String::from_utf8_lossy(body).trim_matches('\0').to_string()
    };
    Some(text)
}

fn decode_utf16(data: &[u8], endian: Endian) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| match endian {
            Endian::Le => u16::from_le_bytes([pair[0], pair[1]]),
            Endian::Be => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

fn join_numeric(data: &[u8], width: usize, endian: Endian) -> String {
    data.chunks_exact(width)
        .take(8)
        .map(|chunk| {
            let v = match (width, endian) {
                (2, Endian::Le) => u16::from_le_bytes([chunk[0], chunk[1]]) as u64,
                (2, Endian::Be) => u16::from_be_bytes([chunk[0], chunk[1]]) as u64,
                (4, Endian::Le) => {
                    u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as u64
                }
                _ => u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as u64,
            };
            v.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn snippet(value: &str) -> String {
    value.chars().take(60).collect()
}

/// Count how many distinct generation keywords a value contains.
fn generation_keyword_hits(value_lower: &str) -> Vec<&'static str> {
    GENERATION_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| value_lower.contains(kw))
        .collect()
}

/// True when a value is a JSON object using generation-parameter keys.
fn is_generation_json(value: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(value) else {
        return false;
    };
    let Some(object) = parsed.as_object() else {
        return false;
    };
    object.keys().any(|key| {
        let key = key.to_lowercase();
        GENERATION_JSON_KEYS.contains(&key.as_str())
    })
}

/// True for plain-text parameter blocks: `prompt` together with at
/// least one sampler/steps/cfg/seed marker.
fn is_generation_text(value_lower: &str) -> bool {
    value_lower.contains("prompt")
        && ["sampler", "steps", "cfg", "seed"]
            .iter()
            .any(|kw| value_lower.contains(kw))
}

fn check_field(field: &ExifField) -> Option<DetectionResult> {
    let value_lower = field.value.to_lowercase();
    let name_lower = field.name.to_lowercase();

    // Tool named outright in Software.
    if field.name == "Software" {
        for (needle, provider) in SOFTWARE_TOOLS {
            if value_lower.contains(needle) {
                return Some(DetectionResult::new(
                    *provider,
                    DetectionMethod::Exif,
                    format!("Software = {}", snippet(&field.value)),
                ));
            }
        }
    }

    // Prompt payloads in description-bearing tags classify as
    // Stable-Diffusion-style before the generic keyword rule can
    // claim them.
    if PROMPT_BEARING_TAGS.contains(&field.name.as_str())
        && (is_generation_json(&field.value) || is_generation_text(&value_lower))
    {
        return Some(DetectionResult::new(
            Provider::StableDiffusion,
            DetectionMethod::Exif,
            format!("prompt payload in {}", field.name),
        ));
    }

    // Parameter vocabulary in any tag value.
    let hits = generation_keyword_hits(&value_lower);
    if hits.len() >= 2 {
        return Some(DetectionResult::new(
            Provider::PromptEmbedded,
            DetectionMethod::Exif,
            format!("{} contains {}", field.name, hits.join(", ")),
        ));
    }

    if name_lower.contains("grok") || value_lower.contains("grok") {
        return Some(DetectionResult::new(
            Provider::Grok,
            DetectionMethod::Exif,
            format!("grok marker in {}", field.name),
        ));
    }

    if field.name == "Prompt" || field.name == "Workflow" {
        return Some(DetectionResult::new(
            Provider::ComfyUi,
            DetectionMethod::Exif,
            format!("{} tag present", field.name),
        ));
    }

    if field.value.trim() == IPTC_TRAINED_MEDIA_URI {
        return Some(DetectionResult::new(
            Provider::IptcTrainedMedia,
            DetectionMethod::Exif,
            format!("trained-media URI in {}", field.name),
        ));
    }

    None
}

pub fn detect(image: &[u8]) -> Option<DetectionResult> {
    let tiff = locate_tiff(image)?;

    for field in parse_fields(tiff) {
        if let Some(result) = check_field(&field) {
            return Some(result);
        }
    }

    // UTF-16 markers the structured decoder may have missed.
    if contains_utf16_ci(tiff, "sui_image_params") {
        return Some(DetectionResult::new(
            Provider::StableDiffusion,
            DetectionMethod::Exif,
            "sui_image_params (utf-16) in EXIF blob",
        ));
    }
    if contains_utf16_ci(tiff, "prompt") {
        return Some(DetectionResult::new(
            Provider::PromptEmbedded,
            DetectionMethod::Exif,
            "prompt (utf-16) in EXIF blob",
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::patterns::utf16le_pattern;

    /// Build an `Exif\0\0` blob with a little-endian TIFF carrying the
    /// given ASCII-typed entries.
    fn build_exif(entries: &[(u16, &str)]) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II*\x00");
        tiff.extend_from_slice(&8u32.to_le_bytes());

        let data_start = 8 + 2 + entries.len() * 12 + 4;
        let mut data: Vec<u8> = Vec::new();

        tiff.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (tag, value) in entries {
            let mut bytes = value.as_bytes().to_vec();
            bytes.push(0);
            tiff.extend_from_slice(&tag.to_le_bytes());
            tiff.extend_from_slice(&TYPE_ASCII.to_le_bytes());
            tiff.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            if bytes.len() <= 4 {
                let mut inline = bytes.clone();
                inline.resize(4, 0);
                tiff.extend_from_slice(&inline);
            } else {
                let offset = data_start + data.len();
                tiff.extend_from_slice(&(offset as u32).to_le_bytes());
                data.extend_from_slice(&bytes);
            }
        }
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(&data);

        let mut blob = b"\xFF\xD8\xFF\xE1\x00\x00Exif\x00\x00".to_vec();
        blob.extend_from_slice(&tiff);
        blob
    }

    #[test]
    fn test_software_midjourney() {
        let blob = build_exif(&[(0x0131, "Midjourney v6.1")]);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::Midjourney);
        assert_eq!(result.method, DetectionMethod::Exif);
    }

    #[test]
    fn test_software_case_insensitive() {
        let upper = detect(&build_exif(&[(0x0131, "STABLE DIFFUSION XL")])).unwrap();
        let lower = detect(&build_exif(&[(0x0131, "stable diffusion xl")])).unwrap();
        assert_eq!(upper.provider, lower.provider);
        assert_eq!(upper.provider, Provider::StableDiffusion);
    }

    #[test]
    fn test_iptc_trained_media_uri() {
        let blob = build_exif(&[(0x010E, IPTC_TRAINED_MEDIA_URI)]);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::IptcTrainedMedia);
        assert_eq!(result.method, DetectionMethod::Exif);
    }

    #[test]
    fn test_prompt_payload_in_image_description() {
        let blob = build_exif(&[(
            0x010E,
            "a castle at dawn\nNegative prompt: blurry\nSteps: 30, Sampler: Euler a, CFG scale: 7, Seed: 42",
        )]);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::StableDiffusion);
    }

    #[test]
    fn test_json_payload_in_image_description() {
        let blob = build_exif(&[(0x010E, r#"{"prompt":"a cat","seed":7}"#)]);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::StableDiffusion);
    }

    #[test]
    fn test_generic_keywords_in_other_tag() {
        let blob = build_exif(&[(0x013B, "sampler: ddim, seed: 123456")]);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::PromptEmbedded);
    }

    #[test]
    fn test_grok_in_value() {
        let blob = build_exif(&[(0x013B, "Created with Grok Imagine")]);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::Grok);
    }

    #[test]
    fn test_camera_photo_is_negative() {
        let blob = build_exif(&[
            (0x010F, "Canon"),
            (0x0110, "Canon EOS R5"),
            (0x0131, "Digital Photo Professional"),
            (0x010E, "Sunset over the bay"),
        ]);
        assert_eq!(detect(&blob), None);
    }

    #[test]
    fn test_utf16_fallback_scan() {
        let mut blob = b"\xFF\xD8Exif\x00\x00II*\x00".to_vec();
        // Corrupt IFD offset so the structured walk yields nothing.
        blob.extend_from_slice(&0xFFFF_FF00u32.to_le_bytes());
        blob.extend_from_slice(&utf16le_pattern("sui_image_params"));
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::StableDiffusion);
        assert_eq!(result.method, DetectionMethod::Exif);
    }

    #[test]
    fn test_no_exif_marker() {
        assert_eq!(detect(b"plain bytes, no exif here"), None);
    }

    #[test]
    fn test_truncated_exif_does_not_panic() {
        let blob = build_exif(&[(0x0131, "Midjourney")]);
        for cut in 0..blob.len() {
            let _ = detect(&blob[..cut]);
        }
    }

    #[test]
    fn test_big_endian_tiff() {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00*");
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        let value = b"Midjourney v6\x00";
        tiff.extend_from_slice(&0x0131u16.to_be_bytes());
        tiff.extend_from_slice(&TYPE_ASCII.to_be_bytes());
        tiff.extend_from_slice(&(value.len() as u32).to_be_bytes());
        let offset = (8 + 2 + 12 + 4) as u32;
        tiff.extend_from_slice(&offset.to_be_bytes());
        tiff.extend_from_slice(&0u32.to_be_bytes());
        tiff.extend_from_slice(value);

        let mut blob = b"Exif\x00\x00".to_vec();
        blob.extend_from_slice(&tiff);
        let result = detect(&blob).unwrap();
        assert_eq!(result.provider, Provider::Midjourney);
    }
}

#![allow(dead_code)]

//! ICC profile sub-parser, invoked from the Colour Specification Box
//! validator when `METH == 2` (Restricted ICC).
//!
//! A pure `validate(payload) -> ValidatorResult`: the 128-byte header is
//! read field by field, followed by the tag table, followed by a best
//! effort extraction of the `desc` tag's description text. Never panics;
//! a truncated profile stops at the first field that does not fit and
//! records `unexpectedEndOfBox = false`, keeping whatever fields were
//! already read.

use log::{debug, warn};

use jp2core::{ByteReader, Config, ElementBuilder, ValidatorResult};

const HEADER_SIZE: usize = 128;
const TAG_ENTRY_SIZE: usize = 12;

struct Tag {
    signature: String,
    offset: u32,
    size: u32,
}

/// Validates and characterizes an ICC profile payload.
pub fn validate(payload: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("icc", config);
    let r = ByteReader::new(payload);

    let header_present = payload.len() >= HEADER_SIZE;
    b.test("headerPresent", header_present);
    if !header_present {
        warn!("ICC profile shorter than the 128-byte header ({} bytes)", payload.len());
        b.test("unexpectedEndOfBox", false);
        return b.consumed(payload.len()).finish();
    }

    // Header, offsets per ISO 15444-1 Annex I / ICC.1 7.2. `payload` was
    // just shown to hold at least HEADER_SIZE bytes, so every read here is
    // within bounds; the `unwrap_or` fallbacks only guard against that
    // invariant being wrong, they are never expected to trigger.
    let (profile_size, _) = r.u32be(0).unwrap_or((0, 0));
    let (cmm_type, _) = r.ascii(4, 4).unwrap_or_default();
    let (version, _) = r.u32be(8).unwrap_or((0, 0));
    let (profile_class, _) = r.ascii(12, 4).unwrap_or_default();
    let (colour_space, _) = r.ascii(16, 4).unwrap_or_default();
    let (pcs, _) = r.ascii(20, 4).unwrap_or_default();
    let (signature, _) = r.ascii(36, 4).unwrap_or_default();
    let (platform, _) = r.ascii(40, 4).unwrap_or_default();
    let (flags, _) = r.u32be(44).unwrap_or((0, 0));
    let (manufacturer, _) = r.ascii(48, 4).unwrap_or_default();
    let (model, _) = r.ascii(52, 4).unwrap_or_default();
    let (attributes, _) = r.u64be(56).unwrap_or((0, 0));
    let (rendering_intent, _) = r.u32be(64).unwrap_or((0, 0));
    let (illuminant, _) = r.bytes(68, 12).unwrap_or((&[], 0));
    let (creator, _) = r.ascii(80, 4).unwrap_or_default();
    let (identifier, _) = r.bytes(84, 16).unwrap_or((&[], 0));

    b.property("profileSize", profile_size);
    b.property("cmmType", cmm_type);
    b.property("version", version);
    b.property("profileClass", profile_class.clone());
    b.property("colourSpace", colour_space);
    b.property("pcs", pcs);
    b.property("signature", signature.clone());
    b.property("platform", platform);
    b.property("flags", flags);
    b.property("manufacturer", manufacturer);
    b.property("model", model);
    b.property("attributes", attributes);
    b.property("renderingIntent", rendering_intent);
    b.property("illuminant", illuminant.to_vec());
    b.property("creator", creator);
    b.property("identifier", identifier.to_vec());

    b.test("signatureIsValid", signature.trim_end() == "acsp");
    b.test("renderingIntentIsValid", rendering_intent <= 3);

    let tag_count_present = payload.len() >= HEADER_SIZE + 4;
    b.test("tagCountPresent", tag_count_present);
    if !tag_count_present {
        b.test("unexpectedEndOfBox", false);
        return b.consumed(payload.len()).finish();
    }

    let (tag_count, _) = r.u32be(HEADER_SIZE).unwrap_or((0, 0));
    b.property("tagCount", tag_count);
    debug!("ICC profile declares {} tags", tag_count);

    let table_start = HEADER_SIZE + 4;
    let table_end = table_start.saturating_add(tag_count as usize * TAG_ENTRY_SIZE);
    let table_fits = table_end <= payload.len();
    b.test("tagTableIsValid", table_fits);
    if !table_fits {
        warn!("ICC tag table ({} entries) overruns the profile payload", tag_count);
        b.test("unexpectedEndOfBox", false);
        return b.consumed(payload.len()).finish();
    }

    let mut tags = Vec::with_capacity(tag_count as usize);
    let mut offsets_valid = true;
    for i in 0..tag_count as usize {
        let entry_offset = table_start + i * TAG_ENTRY_SIZE;
        let (signature, _) = r.ascii(entry_offset, 4).unwrap_or_default();
        let (offset, _) = r.u32be(entry_offset + 4).unwrap_or((0, 0));
        let (size, _) = r.u32be(entry_offset + 8).unwrap_or((0, 0));
        let tag_end = (offset as usize).saturating_add(size as usize);
        if tag_end > payload.len() {
            offsets_valid = false;
        }
        tags.push(Tag {
            signature,
            offset,
            size,
        });
    }
    b.test("tagOffsetsAreValid", offsets_valid);

    if let Some(desc) = tags.iter().find(|t| t.signature.trim_end() == "desc") {
        let start = desc.offset as usize;
        let end = start.saturating_add(desc.size as usize);
        if end <= payload.len() && start < end {
            if let Some(text) = description_text(&payload[start..end]) {
                b.property("description", text);
            }
        }
    }

    b.consumed(payload.len()).finish()
}

/// Extracts the ASCII description from a `desc` tag (`TextDescriptionType`,
/// ICC.1:2001 6.5.17). Layout: 4-byte type signature, 4 reserved bytes,
/// 4-byte ASCII invariant description length, then that many bytes of
/// ASCII text (including a trailing NUL). Returns `None` rather than
/// panicking when the tag does not match this shape.
fn description_text(tag_data: &[u8]) -> Option<String> {
    let r = ByteReader::new(tag_data);
    let (type_sig, _) = r.ascii(0, 4).ok()?;
    if type_sig.trim_end() != "desc" {
        return None;
    }
    let (len, _) = r.u32be(8).ok()?;
    let (bytes, _) = r.bytes(12, len as usize).ok()?;
    let text = String::from_utf8_lossy(bytes);
    Some(text.trim_end_matches('\0').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_header() -> Vec<u8> {
        let mut v = vec![0u8; HEADER_SIZE];
        v[36..40].copy_from_slice(b"acsp");
        v[12..16].copy_from_slice(b"mntr");
        v[16..20].copy_from_slice(b"RGB ");
        v.extend_from_slice(&0u32.to_be_bytes()); // tag count = 0
        v
    }

    #[test]
    fn valid_header_with_no_tags() {
        let payload = minimal_header();
        let result = validate(&payload, &Config::default());
        assert!(result.is_valid);
        assert_eq!(result.properties.uint_at("tagCount"), Some(0));
    }

    #[test]
    fn truncated_header_fails_without_panicking() {
        let payload = vec![0u8; 10];
        let result = validate(&payload, &Config::default());
        assert!(!result.is_valid);
    }

    #[test]
    fn wrong_signature_fails_signature_test() {
        let mut payload = minimal_header();
        payload[36..40].copy_from_slice(b"xxxx");
        let result = validate(&payload, &Config::default());
        assert!(!result.is_valid);
    }
}

//! A pure validator for the JPEG 2000 Part 1 (JP2) file format
//! (ISO/IEC 15444-1 Annex I): given the bytes of a file, produces a tests
//! tree, a properties tree, and a single `is_valid` verdict, with zero
//! I/O and zero panics over arbitrary byte input.
//!
//! The file itself is a sequence of boxes (§4.2/§4.3): the Box Walker
//! (`walker`) iterates box headers, the Element Registry (`registry`)
//! maps each box's 4-byte type to a `BoxKind`, the Box Validators
//! (`boxes`) check and extract each kind's own payload, and the
//! Cross-Element Consistency Checker (`consistency`) runs last, over
//! values that live under more than one box.

mod boxes;
mod consistency;
mod registry;
mod walker;

use jp2core::{Config, ElementBuilder, ValidatorResult};
use log::info;

use crate::registry::BoxKind;
use crate::walker::next_box;

/// Validates a complete JP2 file using the default `Config`.
pub fn validate_jp2(payload: &[u8]) -> ValidatorResult {
    validate_jp2_with_config(payload, &Config::default())
}

/// Validates a complete JP2 file under an explicit `Config`. This is the
/// facade entry point described by §4.9/§6: it seeds the Box Walker with
/// kind="JP2" over the full buffer and runs the Consistency Checker last.
pub fn validate_jp2_with_config(payload: &[u8], config: &Config) -> ValidatorResult {
    validate(payload, config)
}

/// Validates a complete JP2 file.
///
/// A Signature Box and File Type Box must open the file in that order; at
/// least one JP2 Header Box and exactly one Contiguous Codestream Box
/// must follow. Any other recognised box may appear any number of times;
/// unrecognised box types are recorded as opaque and never recursed into.
pub fn validate(payload: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("JP2", config);

    b.test("fileIsNotEmpty", !payload.is_empty());
    if payload.is_empty() {
        return b.consumed(0).finish();
    }

    let mut offset = 0;
    let mut box_index = 0usize;

    let mut seen_signature = false;
    let mut seen_file_type = false;
    let mut jp2_header_count = 0usize;
    let mut codestream_count = 0usize;
    let mut colour_specification_count = 0usize;
    let mut xml_count = 0usize;
    let mut uuid_count = 0usize;
    let mut uuid_info_count = 0usize;

    while let Some(walked) = next_box(payload, offset) {
        offset = walked.next_offset;
        if !walked.header.length_is_valid {
            b.test("lengthIsValid", false);
            break;
        }

        let kind = BoxKind::from_tag(&walked.header.box_type);

        match (box_index, kind) {
            (0, BoxKind::Signature) => {
                seen_signature = true;
                b.child("signatureBox", boxes::validate_signature(walked.payload, config));
            }
            (0, _) => {
                b.test("signatureBoxIsFirst", false);
            }
            (1, BoxKind::FileType) => {
                seen_file_type = true;
                b.child("fileTypeBox", boxes::validate_file_type(walked.payload, config));
            }
            (1, _) => {
                b.test("fileTypeBoxIsSecond", false);
            }
            (_, BoxKind::Jp2Header) => {
                let result = boxes::validate_jp2_header(walked.payload, config);
                let name = indexed_name("jp2HeaderBox", jp2_header_count);
                jp2_header_count += 1;
                b.child(&name, result);
            }
            (_, BoxKind::ContiguousCodestream) => {
                let result = boxes::validate_contiguous_codestream(walked.payload, config);
                let name = indexed_name("contiguousCodestreamBox", codestream_count);
                codestream_count += 1;
                b.child(&name, result);
            }
            (_, BoxKind::ColourSpecification) => {
                // A Colour Specification Box at the file level (outside
                // jp2h) is non-conforming, but we still characterize it
                // rather than treating it as opaque.
                let result = boxes::validate_colour_specification(walked.payload, config);
                let name = indexed_name("colourSpecificationBox", colour_specification_count);
                colour_specification_count += 1;
                b.test("typeIsKnownAtTopLevel", false);
                b.child(&name, result);
            }
            (_, BoxKind::Xml) => {
                let result = boxes::validate_xml(walked.payload, config);
                let name = indexed_name("xmlBox", xml_count);
                xml_count += 1;
                b.child(&name, result);
            }
            (_, BoxKind::Uuid) => {
                let result = boxes::validate_uuid(walked.payload, config);
                let name = indexed_name("uuidBox", uuid_count);
                uuid_count += 1;
                b.child(&name, result);
            }
            (_, BoxKind::UuidInfo) => {
                let result = boxes::validate_uuid_info(walked.payload, config);
                let name = indexed_name("uuidInfoBox", uuid_info_count);
                uuid_info_count += 1;
                b.child(&name, result);
            }
            (_, BoxKind::Signature) | (_, BoxKind::FileType) => {
                b.test("duplicateSignatureOrFileTypeBox", false);
            }
            (_, BoxKind::Unknown) => {
                debug_unknown_box(&walked.header.box_type);
            }
            (_, _) => {
                b.test("typeIsKnown", false);
            }
        }

        box_index += 1;
    }

    b.test("requiredBoxPresent:signatureBox", seen_signature);
    b.test("requiredBoxPresent:fileTypeBox", seen_file_type);
    b.test("requiredBoxPresent:jp2HeaderBox", jp2_header_count >= 1);
    b.test("exactlyOneContiguousCodestreamBox", codestream_count == 1);

    // The checks in `consistency` compare values that live under sibling
    // boxes, so they only run once every box above has folded its
    // properties in. Snapshotting the tree so far (rather than threading
    // a half-built tree through `consistency::check`) keeps that module
    // ignorant of `ElementBuilder`'s internals.
    let properties_so_far = b.properties().clone().into_node();
    let consistency_result = consistency::check(&properties_so_far, config);
    b.child("consistency", consistency_result);

    let result = b.consumed(payload.len()).finish();
    info!("JP2 file validated: is_valid = {}", result.is_valid);
    result
}

fn indexed_name(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_owned()
    } else {
        format!("{}{}", base, index)
    }
}

fn debug_unknown_box(box_type: &[u8; 4]) {
    log::debug!("unrecognised box type {:?}", String::from_utf8_lossy(box_type));
}

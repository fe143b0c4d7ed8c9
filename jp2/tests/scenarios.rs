//! End-to-end scenarios against the full JP2 facade, built from inline
//! byte literals rather than binary fixtures.

use jp2core::Config;

fn u32be(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

fn box_bytes(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&u32be(8 + payload.len() as u32));
    v.extend_from_slice(tag);
    v.extend_from_slice(payload);
    v
}

fn signature_box() -> Vec<u8> {
    box_bytes(b"jP  ", &[0x0D, 0x0A, 0x87, 0x0A])
}

fn file_type_box() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"jp2 ");
    payload.extend_from_slice(&u32be(0));
    payload.extend_from_slice(b"jp2 ");
    box_bytes(b"ftyp", &payload)
}

fn image_header_payload(width: u32, height: u32) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&1u16.to_be_bytes());
    v.push(7); // bPC: 8-bit unsigned
    v.push(7); // c: jpeg2000
    v.push(0);
    v.push(0);
    v
}

fn colour_specification_box() -> Vec<u8> {
    let mut payload = vec![1u8, 0, 0];
    payload.extend_from_slice(&17u32.to_be_bytes()); // EnumCS: greyscale
    box_bytes(b"colr", &payload)
}

fn jp2_header_box(width: u32, height: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&box_bytes(b"ihdr", &image_header_payload(width, height)));
    payload.extend_from_slice(&colour_specification_box());
    box_bytes(b"jp2h", &payload)
}

/// A minimal but complete codestream: SOC, SIZ (1x1, one 8-bit unsigned
/// component, 1x1 tiles), COD (LRCP, 0 decomposition levels, 4x4 code
/// blocks, 5-3 reversible transform), QCD (no quantization), SOD, EOC.
fn minimal_codestream(xsiz: u32) -> Vec<u8> {
    let mut c = Vec::new();
    c.extend_from_slice(&[0xFF, 0x4F]); // SOC

    let mut siz = Vec::new();
    siz.extend_from_slice(&0u16.to_be_bytes()); // Rsiz
    siz.extend_from_slice(&xsiz.to_be_bytes()); // Xsiz
    siz.extend_from_slice(&1u32.to_be_bytes()); // Ysiz
    siz.extend_from_slice(&0u32.to_be_bytes()); // XOsiz
    siz.extend_from_slice(&0u32.to_be_bytes()); // YOsiz
    siz.extend_from_slice(&1u32.to_be_bytes()); // XTsiz
    siz.extend_from_slice(&1u32.to_be_bytes()); // YTsiz
    siz.extend_from_slice(&0u32.to_be_bytes()); // XTOsiz
    siz.extend_from_slice(&0u32.to_be_bytes()); // YTOsiz
    siz.extend_from_slice(&1u16.to_be_bytes()); // Csiz
    siz.push(7); // Ssiz: 8-bit unsigned
    siz.push(1); // XRsiz
    siz.push(1); // YRsiz
    c.extend_from_slice(&[0xFF, 0x51]); // SIZ marker
    c.extend_from_slice(&((siz.len() + 2) as u16).to_be_bytes());
    c.extend_from_slice(&siz);

    let mut cod = Vec::new();
    cod.push(0); // Scod
    cod.push(0); // progression order: LRCP
    cod.extend_from_slice(&1u16.to_be_bytes()); // layers
    cod.push(0); // multiple component transform
    cod.push(0); // decomposition levels
    cod.push(2); // code block width exponent: 4x4 blocks
    cod.push(2); // code block height exponent: 4x4 blocks
    cod.push(0); // code block style
    cod.push(1); // transformation: 5-3 reversible
    c.extend_from_slice(&[0xFF, 0x52]); // COD marker
    c.extend_from_slice(&((cod.len() + 2) as u16).to_be_bytes());
    c.extend_from_slice(&cod);

    let qcd = vec![0u8]; // Sqcd: no quantization, guard bits 0
    c.extend_from_slice(&[0xFF, 0x5C]); // QCD marker
    c.extend_from_slice(&((qcd.len() + 2) as u16).to_be_bytes());
    c.extend_from_slice(&qcd);

    let mut sot = Vec::new();
    sot.extend_from_slice(&0u16.to_be_bytes()); // Isot: tile 0
    sot.extend_from_slice(&0u32.to_be_bytes()); // Psot: unchecked by the validator
    sot.push(0); // TPsot: first tile-part
    sot.push(1); // TNsot: one tile-part
    c.extend_from_slice(&[0xFF, 0x90]); // SOT marker
    c.extend_from_slice(&((sot.len() + 2) as u16).to_be_bytes());
    c.extend_from_slice(&sot);

    c.extend_from_slice(&[0xFF, 0x93]); // SOD
    c.push(0x00); // one byte of packet data
    c.extend_from_slice(&[0xFF, 0xD9]); // EOC

    c
}

fn minimal_valid_jp2() -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&signature_box());
    v.extend_from_slice(&file_type_box());
    v.extend_from_slice(&jp2_header_box(1, 1));
    v.extend_from_slice(&box_bytes(b"jp2c", &minimal_codestream(1)));
    v
}

#[test]
fn scenario_1_empty_input_fails_with_empty_properties() {
    let result = jp2::validate(&[], &Config::default());
    assert!(!result.is_valid);
    assert_eq!(
        result.tests.child("fileIsNotEmpty").map(|n| n.is_valid()),
        Some(false)
    );
}

#[test]
fn scenario_2_signature_only_is_incomplete() {
    let payload = signature_box();
    let result = jp2::validate(&payload, &Config::default());
    assert!(!result.is_valid);
    assert_eq!(
        result.tests.child("signatureBox").and_then(|n| n.child("signatureIsValid")).map(|n| n.is_valid()),
        Some(true)
    );
    assert_eq!(
        result.tests.child("requiredBoxPresent:fileTypeBox").map(|n| n.is_valid()),
        Some(false)
    );
}

#[test]
fn scenario_3_signature_with_wrong_magic_fails_locally() {
    let payload = box_bytes(b"jP  ", &[0x00, 0x00, 0x00, 0x00]);
    let result = jp2::validate(&payload, &Config::default());
    assert!(!result.is_valid);
    assert_eq!(
        result.tests.child("signatureBox").and_then(|n| n.child("signatureIsValid")).map(|n| n.is_valid()),
        Some(false)
    );
}

#[test]
fn scenario_4_overflowing_extended_length_terminates_without_crashing() {
    let mut payload = Vec::with_capacity(2048);
    payload.extend_from_slice(&1u32.to_be_bytes()); // LBox == 1
    payload.extend_from_slice(b"jp2c");
    payload.extend_from_slice(&(1u64 << 40).to_be_bytes()); // XLBox overflows
    payload.resize(2048, 0);

    let result = jp2::validate(&payload, &Config::default());
    assert!(!result.is_valid);
    assert_eq!(
        result.tests.child("lengthIsValid").map(|n| n.is_valid()),
        Some(false)
    );
}

#[test]
fn scenario_5_minimal_valid_jp2_is_valid() {
    let payload = minimal_valid_jp2();
    let result = jp2::validate(&payload, &Config::default());
    assert!(result.is_valid, "{:#?}", result.tests);
    assert_eq!(result.properties.uint_at("jp2HeaderBox/imageHeaderBox/width"), Some(1));
    assert_eq!(result.properties.uint_at("jp2HeaderBox/imageHeaderBox/height"), Some(1));
    assert_eq!(result.properties.uint_at("contiguousCodestreamBox/cod/transformation"), Some(1));
    assert_eq!(result.properties.uint_at("contiguousCodestreamBox/siz/csiz"), Some(1));
}

#[test]
fn scenario_6_dimension_mismatch_fails_only_consistency() {
    let mut v = Vec::new();
    v.extend_from_slice(&signature_box());
    v.extend_from_slice(&file_type_box());
    v.extend_from_slice(&jp2_header_box(1, 1));
    v.extend_from_slice(&box_bytes(b"jp2c", &minimal_codestream(2)));

    let result = jp2::validate(&v, &Config::default());
    assert!(!result.is_valid);
    assert_eq!(
        result
            .tests
            .child("consistency")
            .and_then(|n| n.child("sizDimensionsMatchImageHeader"))
            .map(|n| n.is_valid()),
        Some(false)
    );
}

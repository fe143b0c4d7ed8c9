#![allow(dead_code)]

//! The Codestream Walker: parses the JPEG 2000 codestream embedded in a
//! Contiguous Codestream Box (jp2c). Operates on a borrowed byte slice —
//! no I/O, no panics. `validate(payload, config)` drives the marker-scope
//! state machine described in ISO/IEC 15444-1 Annex A and returns the
//! uniform `{is_valid, tests, properties, bytes_consumed}` shape; nested
//! marker segments are validated by the per-marker functions below and
//! folded in as named children.

use std::convert::TryFrom;

use log::{debug, warn};

use jp2core::{ByteReader, Config, ElementBuilder, ValidatorResult};

pub const MARKER_SOC: u16 = 0xFF4F;
pub const MARKER_SOT: u16 = 0xFF90;
pub const MARKER_SOD: u16 = 0xFF93;
pub const MARKER_EOC: u16 = 0xFFD9;
pub const MARKER_SIZ: u16 = 0xFF51;
pub const MARKER_COD: u16 = 0xFF52;
pub const MARKER_COC: u16 = 0xFF53;
pub const MARKER_RGN: u16 = 0xFF5E;
pub const MARKER_QCD: u16 = 0xFF5C;
pub const MARKER_QCC: u16 = 0xFF5D;
pub const MARKER_POC: u16 = 0xFF5F;
pub const MARKER_TLM: u16 = 0xFF55;
pub const MARKER_PLM: u16 = 0xFF57;
pub const MARKER_PLT: u16 = 0xFF58;
pub const MARKER_PPM: u16 = 0xFF60;
pub const MARKER_PPT: u16 = 0xFF61;
pub const MARKER_SOP: u16 = 0xFF91;
pub const MARKER_EPH: u16 = 0xFF92;
pub const MARKER_CRG: u16 = 0xFF63;
pub const MARKER_COM: u16 = 0xFF64;

/// A.13 Scod / A.6.2 Scoc coding-style bits, shared shape between COD and
/// COC — reserved values are kept rather than rejected, since the bit
/// positions not assigned by ISO/IEC 15444-1 may be defined by later parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionOrder {
    LayerResolutionComponentPosition,
    ResolutionLayerComponentPosition,
    ResolutionPositionComponentLayer,
    PositionComponentResolutionLayer,
    ComponentPositionResolutionLayer,
    Reserved { value: u8 },
}

impl ProgressionOrder {
    fn new(value: u8) -> Self {
        match value {
            0 => ProgressionOrder::LayerResolutionComponentPosition,
            1 => ProgressionOrder::ResolutionLayerComponentPosition,
            2 => ProgressionOrder::ResolutionPositionComponentLayer,
            3 => ProgressionOrder::PositionComponentResolutionLayer,
            4 => ProgressionOrder::ComponentPositionResolutionLayer,
            _ => ProgressionOrder::Reserved { value },
        }
    }

    fn is_valid(value: u8) -> bool {
        value <= 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationFilter {
    Irreversible9x7,
    Reversible5x3,
    Reserved { value: u8 },
}

impl TransformationFilter {
    fn new(value: u8) -> Self {
        match value {
            0 => TransformationFilter::Irreversible9x7,
            1 => TransformationFilter::Reversible5x3,
            _ => TransformationFilter::Reserved { value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipleComponentTransformation {
    None,
    Multiple,
    Reserved { value: u8 },
}

impl MultipleComponentTransformation {
    fn new(value: u8) -> Self {
        match value {
            0 => MultipleComponentTransformation::None,
            1 => MultipleComponentTransformation::Multiple,
            _ => MultipleComponentTransformation::Reserved { value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizationStyle {
    NoQuantization,
    ScalarDerived,
    ScalarExpounded,
    Reserved { value: u8 },
}

impl QuantizationStyle {
    fn new(value: u8) -> Self {
        match value & 0b0001_1111 {
            0 => QuantizationStyle::NoQuantization,
            1 => QuantizationStyle::ScalarDerived,
            2 => QuantizationStyle::ScalarExpounded,
            v => QuantizationStyle::Reserved { value: v },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentRegistrationValue {
    Binary,
    Latin,
    Reserved { value: u16 },
}

impl CommentRegistrationValue {
    fn new(value: u16) -> Self {
        match value {
            0 => CommentRegistrationValue::Binary,
            1 => CommentRegistrationValue::Latin,
            v => CommentRegistrationValue::Reserved { value: v },
        }
    }
}

/// Decodes a byte string as ISO/IEC 8859-15 (the `Rcom == 1` encoding for
/// COM comments, A.9.2). Identical to Latin-1 except for eight code
/// points reassigned to cover the euro sign and a handful of French and
/// Finnish letters missing from 8859-1; every byte value maps to exactly
/// one `char`, so this never fails the way UTF-8 decoding can.
fn decode_iso_8859_15(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0xA4 => '\u{20AC}', // €
            0xA6 => '\u{0160}', // Š
            0xA8 => '\u{0161}', // š
            0xB4 => '\u{017D}', // Ž
            0xB8 => '\u{017E}', // ž
            0xBC => '\u{0152}', // Œ
            0xBD => '\u{0153}', // œ
            0xBE => '\u{0178}', // Ÿ
            other => other as char,
        })
        .collect()
}

/// Reads the 2-byte big-endian segment length that every non-delimiter
/// marker carries. The length includes itself but excludes the marker
/// code; returns `None` if the two length bytes themselves do not fit.
fn segment_length(slice: &[u8]) -> Option<u16> {
    ByteReader::new(slice).u16be(0).ok().map(|(v, _)| v)
}

/// Common bookkeeping every segment validator starts with: read and
/// bounds-check `length`, returning the inner payload slice (after the
/// two length bytes, `length - 2` bytes long) on success.
fn open_segment<'a>(name: &str, slice: &'a [u8], b: &mut ElementBuilder) -> Option<&'a [u8]> {
    let length = match segment_length(slice) {
        Some(l) => l,
        None => {
            b.test("segmentLengthIsValid", false);
            return None;
        }
    };
    let length = length as usize;
    let valid = length >= 2 && length <= slice.len();
    b.test("segmentLengthIsValid", valid);
    if !valid {
        let _ = name;
        return None;
    }
    Some(&slice[2..length])
}

fn segment_total_len(slice: &[u8]) -> usize {
    segment_length(slice).map(|l| l as usize).unwrap_or(slice.len().min(2))
}

/// SIZ — Image and tile size (A.5.1). The only marker segment the main
/// header cannot do without; its fields seed the consistency checks
/// against the JP2 Header's Image Header Box.
pub fn validate_siz(slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("siz", config);
    let payload = match open_segment("siz", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let fields = (|| -> Option<(u16, u32, u32, u32, u32, u32, u32, u32, u32, u16)> {
        let (rsiz, o) = r.u16be(0).ok()?;
        let (xsiz, o) = r.u32be(o).ok()?;
        let (ysiz, o) = r.u32be(o).ok()?;
        let (xosiz, o) = r.u32be(o).ok()?;
        let (yosiz, o) = r.u32be(o).ok()?;
        let (xtsiz, o) = r.u32be(o).ok()?;
        let (ytsiz, o) = r.u32be(o).ok()?;
        let (xtosiz, o) = r.u32be(o).ok()?;
        let (ytosiz, o) = r.u32be(o).ok()?;
        let (csiz, _) = r.u16be(o).ok()?;
        Some((rsiz, xsiz, ysiz, xosiz, yosiz, xtsiz, ytsiz, xtosiz, ytosiz, csiz))
    })();

    let (rsiz, xsiz, ysiz, xosiz, yosiz, xtsiz, ytsiz, xtosiz, ytosiz, csiz) = match fields {
        Some(f) => f,
        None => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };

    b.property("rsiz", rsiz);
    b.property("xsiz", xsiz);
    b.property("ysiz", ysiz);
    b.property("xosiz", xosiz);
    b.property("yosiz", yosiz);
    b.property("xtsiz", xtsiz);
    b.property("ytsiz", ytsiz);
    b.property("xtosiz", xtosiz);
    b.property("ytosiz", ytosiz);
    b.property("csiz", csiz);

    b.test("xsizIsValid", xsiz > xosiz);
    b.test("ysizIsValid", ysiz > yosiz);
    b.test("xtsizIsValid", xtsiz > 0);
    b.test("ytsizIsValid", ytsiz > 0);
    b.test(
        "tileOffsetIsValid",
        (xosiz as u64) < (xtsiz as u64) + (xtosiz as u64),
    );
    b.test("csizIsValid", (1..=16384).contains(&csiz));

    let component_table_offset = 36usize;
    let mut components_valid = true;
    for i in 0..csiz as usize {
        let entry = component_table_offset + i * 3;
        let mut comp = ElementBuilder::new(format!("component{}", i), config);
        match (r.u8(entry), r.u8(entry + 1), r.u8(entry + 2)) {
            (Ok((ssiz, _)), Ok((xrsiz, _)), Ok((yrsiz, _))) => {
                let depth = (ssiz & 0x7F) + 1;
                let signed = ssiz & 0x80 != 0;
                comp.property("ssizDepth", depth as u32);
                comp.property("ssizSign", signed);
                comp.property("xrsiz", xrsiz);
                comp.property("yrsiz", yrsiz);
                let ok = (1..=255).contains(&xrsiz) && (1..=255).contains(&yrsiz);
                comp.test("separationIsValid", ok);
                components_valid &= ok;
            }
            _ => {
                comp.test("unexpectedEndOfBox", false);
                components_valid = false;
            }
        }
        let comp_result = comp.consumed(3).finish();
        b.child(&format!("component{}", i), comp_result);
    }
    b.test("componentTableIsValid", components_valid);

    b.consumed(segment_total_len(slice)).finish()
}

/// A.6.1 Coding-style parameters (SPcod/SPcoc tail shared by COD and COC).
struct CodingStyleParameters {
    decomposition_levels: u8,
    code_block_width_exp: u8,
    code_block_height_exp: u8,
    code_block_style: u8,
    transformation: u8,
    precinct_sizes: Vec<(u8, u8)>,
}

fn parse_coding_style_parameters(
    r: &ByteReader,
    mut offset: usize,
    has_precincts: bool,
) -> Option<(CodingStyleParameters, usize)> {
    let (decomposition_levels, next) = r.u8(offset).ok()?;
    offset = next;
    let (code_block_width_exp, next) = r.u8(offset).ok()?;
    offset = next;
    let (code_block_height_exp, next) = r.u8(offset).ok()?;
    offset = next;
    let (code_block_style, next) = r.u8(offset).ok()?;
    offset = next;
    let (transformation, next) = r.u8(offset).ok()?;
    offset = next;

    let mut precinct_sizes = Vec::new();
    if has_precincts {
        for _ in 0..=decomposition_levels {
            let (b, next) = r.u8(offset).ok()?;
            offset = next;
            precinct_sizes.push((b & 0x0F, (b >> 4) & 0x0F));
        }
    }

    Some((
        CodingStyleParameters {
            decomposition_levels,
            code_block_width_exp,
            code_block_height_exp,
            code_block_style,
            transformation,
            precinct_sizes,
        },
        offset,
    ))
}

fn record_coding_style_parameters(b: &mut ElementBuilder, p: &CodingStyleParameters) {
    b.property("levels", p.decomposition_levels);
    b.property("codeBlockWidthExponent", p.code_block_width_exp);
    b.property("codeBlockHeightExponent", p.code_block_height_exp);
    b.property("codeBlockStyle", p.code_block_style);
    b.property("transformation", p.transformation);
    b.property("precincts", !p.precinct_sizes.is_empty());

    b.test("levelsIsValid", p.decomposition_levels <= 32);
    let cbw = p.code_block_width_exp;
    let cbh = p.code_block_height_exp;
    b.test(
        "codeBlockExponentsAreValid",
        (2..=10).contains(&cbw) && (2..=10).contains(&cbh) && cbw + cbh <= 12,
    );
    b.test(
        "transformationIsValid",
        TransformationFilter::new(p.transformation) != TransformationFilter::Reserved { value: p.transformation },
    );
}

/// COD — Coding style default (A.6.1). Required exactly once in the main
/// header; governs progression order, layering, and the default coding
/// style parameters applied to every component unless overridden by COC.
pub fn validate_cod(slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("cod", config);
    let payload = match open_segment("cod", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let header = (|| -> Option<(u8, u8, u16, u8)> {
        let (scod, o) = r.u8(0).ok()?;
        let (order, o) = r.u8(o).ok()?;
        let (layers, o) = r.u16be(o).ok()?;
        let (mct, _) = r.u8(o).ok()?;
        Some((scod, order, layers, mct))
    })();

    let (scod, order, layers, mct) = match header {
        Some(h) => h,
        None => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };

    b.property("codingStyle", scod);
    b.property("order", order);
    b.property("layers", layers);
    b.property("multipleComponentTransformation", mct);
    b.property("sop", scod & 0b0000_0010 != 0);
    b.property("eph", scod & 0b0000_0100 != 0);
    b.test("orderIsValid", ProgressionOrder::is_valid(order));
    b.test(
        "multipleComponentTransformationIsValid",
        MultipleComponentTransformation::new(mct) != MultipleComponentTransformation::Reserved { value: mct },
    );

    let has_precincts = scod & 0b0000_0001 != 0;
    match parse_coding_style_parameters(&r, 5, has_precincts) {
        Some((params, _)) => record_coding_style_parameters(&mut b, &params),
        None => {
            b.test("unexpectedEndOfBox", false);
        }
    }

    b.consumed(segment_total_len(slice)).finish()
}

/// COC — Coding style component (A.6.2). Overrides COD for one component.
pub fn validate_coc(slice: &[u8], no_components: u16, config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("coc", config);
    let payload = match open_segment("coc", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let wide_components = no_components >= 257;
    let component_index = if wide_components {
        r.u16be(0).ok().map(|(v, o)| (v as u32, o))
    } else {
        r.u8(0).ok().map(|(v, o)| (v as u32, o))
    };

    let (component_index, next) = match component_index {
        Some(v) => v,
        None => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };

    let scoc = match r.u8(next) {
        Ok((v, _)) => v,
        Err(_) => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };

    b.property("componentIndex", component_index);
    b.test("componentIndexIsValid", (component_index as u16) < no_components);

    let has_precincts = scoc & 0b0000_0001 != 0;
    match parse_coding_style_parameters(&r, next + 1, has_precincts) {
        Some((params, _)) => record_coding_style_parameters(&mut b, &params),
        None => {
            b.test("unexpectedEndOfBox", false);
        }
    }

    b.consumed(segment_total_len(slice)).finish()
}

/// QCD — Quantization default (A.6.4). Required exactly once in the main
/// header; the step-size table length depends on the quantization style.
pub fn validate_qcd(slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("qcd", config);
    let payload = match open_segment("qcd", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let sqcd = match r.u8(0) {
        Ok((v, _)) => v,
        Err(_) => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };

    let style = QuantizationStyle::new(sqcd);
    b.property("qStyle", (sqcd & 0b0001_1111) as u32);
    b.test(
        "qStyleIsValid",
        !matches!(style, QuantizationStyle::Reserved { .. }),
    );

    let entry_count = match style {
        QuantizationStyle::NoQuantization => payload.len().saturating_sub(1),
        _ => payload.len().saturating_sub(1) / 2,
    };
    b.property("entryCount", entry_count as u32);

    b.consumed(segment_total_len(slice)).finish()
}

/// QCC — Quantization component (A.6.5). Overrides QCD for one component.
pub fn validate_qcc(slice: &[u8], no_components: u16, config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("qcc", config);
    let payload = match open_segment("qcc", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let wide_components = no_components >= 257;
    let parsed = if wide_components {
        r.u16be(0).ok().map(|(v, o)| (v as u32, o))
    } else {
        r.u8(0).ok().map(|(v, o)| (v as u32, o))
    };

    let (component_index, next) = match parsed {
        Some(v) => v,
        None => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };

    b.property("componentIndex", component_index);
    b.test("componentIndexIsValid", (component_index as u16) < no_components);

    match r.u8(next) {
        Ok((sqcc, _)) => {
            let style = QuantizationStyle::new(sqcc);
            b.property("qStyle", (sqcc & 0b0001_1111) as u32);
            b.test(
                "qStyleIsValid",
                !matches!(style, QuantizationStyle::Reserved { .. }),
            );
        }
        Err(_) => {
            b.test("unexpectedEndOfBox", false);
        }
    }

    b.consumed(segment_total_len(slice)).finish()
}

/// RGN — Region of interest (A.6.6).
pub fn validate_rgn(slice: &[u8], no_components: u16, config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("rgn", config);
    let payload = match open_segment("rgn", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let wide_components = no_components >= 257;
    let parsed = if wide_components {
        r.u16be(0).ok().map(|(v, o)| (v as u32, o))
    } else {
        r.u8(0).ok().map(|(v, o)| (v as u32, o))
    };

    let (component_index, next) = match parsed {
        Some(v) => v,
        None => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };
    b.property("componentIndex", component_index);
    b.test("componentIndexIsValid", (component_index as u16) < no_components);

    match (r.u8(next), r.u8(next + 1)) {
        (Ok((srgn, _)), Ok((sprgn, _))) => {
            b.property("style", srgn);
            b.property("implicitShift", sprgn);
            b.test("styleIsValid", srgn == 0);
        }
        _ => {
            b.test("unexpectedEndOfBox", false);
        }
    }

    b.consumed(segment_total_len(slice)).finish()
}

/// POC — Progression order change (A.6.3).
pub fn validate_poc(slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("poc", config);
    let payload = match open_segment("poc", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    b.property("byteLength", payload.len() as u32);
    b.consumed(segment_total_len(slice)).finish()
}

/// COM — Comment (A.9.2). `Rcom` selects how the comment bytes are to be
/// read: `1` (Latin) is ISO/IEC 8859-15 text, decoded here rather than as
/// UTF-8, since the two encodings disagree above 0x7F; `0` (binary) and
/// any reserved value carry no defined text encoding, so the bytes are
/// kept as a raw property instead of being guessed at.
pub fn validate_com(slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("com", config);
    let payload = match open_segment("com", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let rcom = match r.u16be(0) {
        Ok((v, _)) => v,
        Err(_) => {
            b.test("unexpectedEndOfBox", false);
            return b.consumed(segment_total_len(slice)).finish();
        }
    };
    let registration = CommentRegistrationValue::new(rcom);
    b.property("rcom", rcom as u32);
    b.test(
        "rcomIsValid",
        !matches!(registration, CommentRegistrationValue::Reserved { .. }),
    );

    if let Ok((text_bytes, _)) = r.bytes(2, payload.len() - 2) {
        match registration {
            CommentRegistrationValue::Latin => {
                b.property("comment", decode_iso_8859_15(text_bytes));
            }
            CommentRegistrationValue::Binary | CommentRegistrationValue::Reserved { .. } => {
                b.property("comment", text_bytes.to_vec());
            }
        }
    }

    b.consumed(segment_total_len(slice)).finish()
}

/// TLM — Tile-part lengths (A.7.1), PLM/PLT — Packet length (A.7.2/A.7.3),
/// CRG — Component registration (A.9.1), PPM/PPT — Packed packet headers
/// (A.7.4/A.7.5). These are informational/pointer segments whose internal
/// tables are not consumed further downstream by this validator; each is
/// still bounds-checked and its raw length recorded as a property so a
/// caller can see that the segment was present and well-formed.
fn validate_opaque_segment(name: &str, slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new(name, config);
    let payload = match open_segment(name, slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    b.property("byteLength", payload.len() as u32);
    b.consumed(segment_total_len(slice)).finish()
}

pub fn validate_tlm(slice: &[u8], config: &Config) -> ValidatorResult {
    validate_opaque_segment("tlm", slice, config)
}

pub fn validate_plm(slice: &[u8], config: &Config) -> ValidatorResult {
    validate_opaque_segment("plm", slice, config)
}

pub fn validate_plt(slice: &[u8], config: &Config) -> ValidatorResult {
    validate_opaque_segment("plt", slice, config)
}

pub fn validate_crg(slice: &[u8], config: &Config) -> ValidatorResult {
    validate_opaque_segment("crg", slice, config)
}

pub fn validate_ppm(slice: &[u8], config: &Config) -> ValidatorResult {
    validate_opaque_segment("ppm", slice, config)
}

pub fn validate_ppt(slice: &[u8], config: &Config) -> ValidatorResult {
    validate_opaque_segment("ppt", slice, config)
}

/// SOT — Start of tile-part (A.4.2).
fn validate_sot(slice: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("sot", config);
    let payload = match open_segment("sot", slice, &mut b) {
        Some(p) => p,
        None => return b.consumed(slice.len().min(2)).finish(),
    };
    let r = ByteReader::new(payload);

    let fields = (|| -> Option<(u16, u32, u8, u8)> {
        let (isot, o) = r.u16be(0).ok()?;
        let (psot, o) = r.u32be(o).ok()?;
        let (tpsot, o) = r.u8(o).ok()?;
        let (tnsot, _) = r.u8(o).ok()?;
        Some((isot, psot, tpsot, tnsot))
    })();

    match fields {
        Some((isot, psot, tpsot, tnsot)) => {
            b.property("tileIndex", isot);
            b.property("tileLength", psot);
            b.property("tilePartIndex", tpsot);
            b.property("noTileParts", tnsot);
        }
        None => {
            b.test("unexpectedEndOfBox", false);
        }
    }

    b.consumed(segment_total_len(slice)).finish()
}

/// Scans tile bitstream data for the next aligned marker boundary: an
/// `0xFF` byte followed by `0x90` (SOT) or `0xD9` (EOC). Per the bit
/// stuffing rule an `0xFF` inside packet data is never followed by a byte
/// `>= 0x90` other than at a genuine marker, so this scan cannot be fooled
/// by coded data; in-bitstream `SOP`/`EPH` markers are skipped over.
fn find_next_marker(data: &[u8]) -> Option<(usize, u16)> {
    let mut i = 0;
    while i + 1 < data.len() {
        if data[i] == 0xFF {
            let next = data[i + 1];
            if next == 0x90 || next == 0xD9 {
                return Some((i, u16::from_be_bytes([data[i], next])));
            }
        }
        i += 1;
    }
    None
}

struct MainHeaderState {
    has_cod: bool,
    has_qcd: bool,
    no_components: u16,
}

/// Parses the codestream's optional marker segments for one header scope
/// (main header or tile-part header), stopping at SOT (main header) or
/// SOD (tile-part header). Returns the offset just past the stop marker.
fn parse_header_segments(
    payload: &[u8],
    mut offset: usize,
    allowed: &[u16],
    b: &mut ElementBuilder,
    config: &Config,
    state: &mut MainHeaderState,
    stop_on: &[u16],
) -> usize {
    let r = ByteReader::new(payload);
    loop {
        let marker = match r.u16be(offset) {
            Ok((m, _)) => m,
            Err(_) => {
                b.test("segmentLengthIsValid", false);
                return offset;
            }
        };

        if stop_on.contains(&marker) {
            return offset;
        }

        if !allowed.contains(&marker) {
            warn!("marker {:#06X} not allowed in this header scope", marker);
            b.test("markerIsKnown", false);
            // Unknown/out-of-scope marker: try to skip it using its
            // length field so later valid markers still get parsed.
            match segment_length(&payload[offset + 2..]) {
                Some(len) if (len as usize) >= 2 => {
                    offset += 2 + len as usize;
                    continue;
                }
                _ => return offset,
            }
        }

        let rest = &payload[offset + 2..];
        let result = match marker {
            MARKER_COD => {
                state.has_cod = true;
                validate_cod(rest, config)
            }
            MARKER_COC => validate_coc(rest, state.no_components, config),
            MARKER_QCD => {
                state.has_qcd = true;
                validate_qcd(rest, config)
            }
            MARKER_QCC => validate_qcc(rest, state.no_components, config),
            MARKER_RGN => validate_rgn(rest, state.no_components, config),
            MARKER_POC => validate_poc(rest, config),
            MARKER_COM => validate_com(rest, config),
            MARKER_TLM => validate_tlm(rest, config),
            MARKER_PLM => validate_plm(rest, config),
            MARKER_PLT => validate_plt(rest, config),
            MARKER_CRG => validate_crg(rest, config),
            MARKER_PPM => validate_ppm(rest, config),
            MARKER_PPT => validate_ppt(rest, config),
            _ => unreachable!("marker checked against `allowed` above"),
        };

        let marker_name = marker_kind_name(marker);
        offset += 2 + result.bytes_consumed;
        b.child(marker_name, result);
    }
}

fn marker_kind_name(marker: u16) -> &'static str {
    match marker {
        MARKER_COD => "cod",
        MARKER_COC => "coc",
        MARKER_QCD => "qcd",
        MARKER_QCC => "qcc",
        MARKER_RGN => "rgn",
        MARKER_POC => "poc",
        MARKER_COM => "com",
        MARKER_TLM => "tlm",
        MARKER_PLM => "plm",
        MARKER_PLT => "plt",
        MARKER_CRG => "crg",
        MARKER_PPM => "ppm",
        MARKER_PPT => "ppt",
        _ => "unknown",
    }
}

const MAIN_HEADER_ALLOWED: &[u16] = &[
    MARKER_COD, MARKER_COC, MARKER_QCD, MARKER_QCC, MARKER_RGN, MARKER_POC, MARKER_PPM,
    MARKER_TLM, MARKER_PLM, MARKER_CRG, MARKER_COM,
];

const TILE_PART_HEADER_ALLOWED: &[u16] = &[
    MARKER_COD, MARKER_COC, MARKER_QCD, MARKER_QCC, MARKER_RGN, MARKER_POC, MARKER_PPT,
    MARKER_PLT, MARKER_COM,
];

/// Top-level Codestream Walker entry point: validates the full payload of
/// a Contiguous Codestream Box against the marker-scope state machine in
/// ISO/IEC 15444-1 Annex A.
pub fn validate(payload: &[u8], config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("codestream", config);
    let r = ByteReader::new(payload);

    let soc_present = r.peek_u16be(0) == Some(MARKER_SOC);
    b.test("socIsValid", soc_present);
    if !soc_present {
        warn!("codestream does not open with SOC");
        return b.consumed(0).finish();
    }
    let mut offset = 2;

    let siz_present = r.peek_u16be(offset) == Some(MARKER_SIZ);
    b.test("requiredBoxPresent:siz", siz_present);
    if !siz_present {
        return b.consumed(offset).finish();
    }
    let siz_result = validate_siz(&payload[offset + 2..], config);
    let no_components = siz_result
        .properties
        .uint_at("csiz")
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(0);
    offset += 2 + siz_result.bytes_consumed;
    b.child("siz", siz_result);

    let mut state = MainHeaderState {
        has_cod: false,
        has_qcd: false,
        no_components,
    };

    offset = parse_header_segments(
        payload,
        offset,
        MAIN_HEADER_ALLOWED,
        &mut b,
        config,
        &mut state,
        &[MARKER_SOT],
    );

    b.test("requiredBoxPresent:cod", state.has_cod);
    b.test("requiredBoxPresent:qcd", state.has_qcd);

    debug!("codestream declares {} component(s)", no_components);

    let mut tile_index = 0;
    loop {
        match r.peek_u16be(offset) {
            Some(MARKER_EOC) => {
                offset += 2;
                break;
            }
            Some(MARKER_SOT) => {
                debug!("entering tile {}", tile_index);
                let mut tile = ElementBuilder::new(format!("tile{}", tile_index), config);
                let sot_result = validate_sot(&payload[offset + 2..], config);
                offset += 2 + sot_result.bytes_consumed;
                tile.child("sot", sot_result);

                let mut tile_state = MainHeaderState {
                    has_cod: true,
                    has_qcd: true,
                    no_components,
                };
                offset = parse_header_segments(
                    payload,
                    offset,
                    TILE_PART_HEADER_ALLOWED,
                    &mut tile,
                    config,
                    &mut tile_state,
                    &[MARKER_SOD],
                );

                let sod_present = r.peek_u16be(offset) == Some(MARKER_SOD);
                tile.test("requiredBoxPresent:sod", sod_present);
                if !sod_present {
                    b.child(&format!("tile{}", tile_index), tile.finish());
                    break;
                }
                offset += 2;

                match find_next_marker(&payload[offset..]) {
                    Some((skip, _marker)) => offset += skip,
                    None => {
                        offset = payload.len();
                        tile.test("unexpectedEndOfBox", false);
                        b.child(&format!("tile{}", tile_index), tile.finish());
                        break;
                    }
                }

                b.child(&format!("tile{}", tile_index), tile.finish());
                tile_index += 1;
            }
            _ => {
                b.test("markerIsKnown", false);
                break;
            }
        }
    }

    b.consumed(offset).finish()
}

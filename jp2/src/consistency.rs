//! The Cross-Element Consistency Checker (§4.7): a post-pass over the
//! already-completed properties tree that cannot run until every box has
//! been parsed, because each check compares values that live under
//! different boxes. Appends its leaves under a synthetic `consistency`
//! sibling rather than mutating any box's own subtree.

use jp2core::{Config, ElementBuilder, PropertyNode, ValidatorResult};

/// Runs every defined cross-element check against the root properties
/// tree already assembled by the Box Walker, and returns a `consistency`
/// element whose tests feed into the file's overall `is_valid`.
pub fn check(root: &PropertyNode, config: &Config) -> ValidatorResult {
    let mut b = ElementBuilder::new("consistency", config);

    siz_dimensions_match_image_header(&mut b, root);
    siz_component_count_matches_image_header(&mut b, root);
    component_depths_match_bpcc_or_image_header(&mut b, root);
    colour_spec_enumerated_method_has_valid_enum_cs(&mut b, root);
    file_type_brand_is_in_its_own_compatibility_list(&mut b, root);

    b.consumed(0).finish()
}

/// Image Header `Width`/`Height` must equal the codestream's tile grid
/// extent, `Xsiz - XOsiz` / `Ysiz - YOsiz` (ISO/IEC 15444-1 Annex I.5.3.1).
fn siz_dimensions_match_image_header(b: &mut ElementBuilder, root: &PropertyNode) {
    let width = root.uint_at("jp2HeaderBox/imageHeaderBox/width");
    let height = root.uint_at("jp2HeaderBox/imageHeaderBox/height");
    let xsiz = root.uint_at("contiguousCodestreamBox/siz/xsiz");
    let xosiz = root.uint_at("contiguousCodestreamBox/siz/xosiz");
    let ysiz = root.uint_at("contiguousCodestreamBox/siz/ysiz");
    let yosiz = root.uint_at("contiguousCodestreamBox/siz/yosiz");

    let width_matches = width.zip(xsiz).zip(xosiz).map(|((width, xsiz), xosiz)| width == xsiz.saturating_sub(xosiz));
    let height_matches = height.zip(ysiz).zip(yosiz).map(|((height, ysiz), yosiz)| height == ysiz.saturating_sub(yosiz));

    if let (Some(width_matches), Some(height_matches)) = (width_matches, height_matches) {
        b.test("sizDimensionsMatchImageHeader", width_matches && height_matches);
    }
}

/// Image Header `NC` must equal SIZ's `Csiz` component count.
fn siz_component_count_matches_image_header(b: &mut ElementBuilder, root: &PropertyNode) {
    let nc = root.uint_at("jp2HeaderBox/imageHeaderBox/nC");
    let csiz = root.uint_at("contiguousCodestreamBox/siz/csiz");
    if let (Some(nc), Some(csiz)) = (nc, csiz) {
        b.test("nCMatchesCsiz", nc == csiz);
    }
}

/// Each SIZ component's declared bit depth/sign must match the
/// corresponding Bits Per Component Box entry when present, or the
/// Image Header's single `BPC` value otherwise (when `BPC != 255`).
fn component_depths_match_bpcc_or_image_header(b: &mut ElementBuilder, root: &PropertyNode) {
    let nc = match root.uint_at("jp2HeaderBox/imageHeaderBox/nC") {
        Some(nc) => nc,
        None => return,
    };
    let image_bpc_depth = root.uint_at("jp2HeaderBox/imageHeaderBox/bPCDepth");
    let image_bpc_sign = root.uint_at("jp2HeaderBox/imageHeaderBox/bPCSign");

    let mut all_match = true;
    let mut checked_any = false;
    for i in 0..nc {
        let siz_depth = root.uint_at(&format!("contiguousCodestreamBox/siz/component{}/ssizDepth", i));
        let siz_sign = root.uint_at(&format!("contiguousCodestreamBox/siz/component{}/ssizSign", i));
        let (siz_depth, siz_sign) = match (siz_depth, siz_sign) {
            (Some(d), Some(s)) => (d, s),
            _ => continue,
        };

        let bpcc_depth = root.uint_at(&format!("jp2HeaderBox/bitsPerComponentBox/component{}/depth", i));
        let bpcc_sign = root.uint_at(&format!("jp2HeaderBox/bitsPerComponentBox/component{}/sign", i));

        let expected = match (bpcc_depth, bpcc_sign) {
            (Some(d), Some(s)) => Some((d, s)),
            _ => image_bpc_depth.zip(image_bpc_sign),
        };

        if let Some((depth, sign)) = expected {
            checked_any = true;
            all_match &= siz_depth == depth && siz_sign == sign;
        }
    }

    if checked_any {
        b.test("componentDepthsMatchImageHeader", all_match);
    }
}

/// Colour Specification Box: `METH == 1` (enumerated) restricts `EnumCS`
/// to the catalogue this crate recognises (sRGB, greyscale, sYCC).
fn colour_spec_enumerated_method_has_valid_enum_cs(b: &mut ElementBuilder, root: &PropertyNode) {
    let meth = root.uint_at("jp2HeaderBox/colourSpecificationBox/meth");
    let enum_cs = root.uint_at("jp2HeaderBox/colourSpecificationBox/enumCS");
    if let Some(meth) = meth {
        if meth == 1 {
            let valid = matches!(enum_cs, Some(16) | Some(17) | Some(18));
            b.test("enumeratedColourSpecHasRecognisedEnumCS", valid);
        }
    }
}

/// File Type Box: a conforming reader expects the declared brand to also
/// appear somewhere in the box's own compatibility list.
fn file_type_brand_is_in_its_own_compatibility_list(b: &mut ElementBuilder, root: &PropertyNode) {
    let brand = match root.text_at("fileTypeBox/br") {
        Some(brand) => brand.to_owned(),
        None => return,
    };

    let file_type = match root.get("fileTypeBox") {
        Some(node) => node,
        None => return,
    };

    let found = file_type
        .children()
        .iter()
        .filter(|c| c.name().starts_with("cl"))
        .any(|c| c.value().and_then(|v| v.as_text()) == Some(brand.as_str()));

    b.test("brandIsInOwnCompatibilityList", found);
}

#[cfg(test)]
mod tests {
    use super::*;
    use jp2core::ElementBuilder as EB;

    fn sample_root() -> PropertyNode {
        let config = Config::default();
        let mut ihdr = EB::new("imageHeaderBox", &config);
        ihdr.property("width", 100u32)
            .property("height", 50u32)
            .property("nC", 3u16)
            .property("bPCDepth", 8u32)
            .property("bPCSign", false);
        let mut jp2h = EB::new("jp2HeaderBox", &config);
        jp2h.child("imageHeaderBox", ihdr.finish());

        let mut colr = EB::new("colourSpecificationBox", &config);
        colr.property("meth", 1u8).property("enumCS", 16u32);
        jp2h.child("colourSpecificationBox", colr.finish());

        let mut siz = EB::new("siz", &config);
        siz.property("xsiz", 100u32)
            .property("xosiz", 0u32)
            .property("ysiz", 50u32)
            .property("yosiz", 0u32)
            .property("csiz", 3u16);
        for i in 0..3 {
            let mut comp = EB::new(format!("component{}", i), &config);
            comp.property("ssizDepth", 8u32).property("ssizSign", false);
            siz.child(&format!("component{}", i), comp.finish());
        }
        let mut codestream = EB::new("contiguousCodestreamBox", &config);
        codestream.child("siz", siz.finish());

        let mut ftyp = EB::new("fileTypeBox", &config);
        ftyp.property("br", "jp2 ").property("cl0", "jp2 ");

        let mut root = EB::new("JP2", &config);
        root.child("jp2HeaderBox", jp2h.finish());
        root.child("contiguousCodestreamBox", codestream.finish());
        root.child("fileTypeBox", ftyp.finish());
        root.finish().properties
    }

    #[test]
    fn consistent_file_passes_every_check() {
        let root = sample_root();
        let result = check(&root, &Config::default());
        assert!(result.is_valid, "{:#?}", result.tests);
    }

    #[test]
    fn mismatched_width_fails_just_that_check() {
        let config = Config::default();
        let mut ihdr = EB::new("imageHeaderBox", &config);
        ihdr.property("width", 999u32).property("height", 50u32).property("nC", 3u16);
        let mut jp2h = EB::new("jp2HeaderBox", &config);
        jp2h.child("imageHeaderBox", ihdr.finish());

        let mut siz = EB::new("siz", &config);
        siz.property("xsiz", 100u32).property("xosiz", 0u32)
            .property("ysiz", 50u32).property("yosiz", 0u32)
            .property("csiz", 3u16);
        let mut codestream = EB::new("contiguousCodestreamBox", &config);
        codestream.child("siz", siz.finish());

        let mut root = EB::new("JP2", &config);
        root.child("jp2HeaderBox", jp2h.finish());
        root.child("contiguousCodestreamBox", codestream.finish());
        let root = root.finish().properties;

        let result = check(&root, &Config::default());
        assert!(!result.is_valid);
        assert_eq!(
            result.tests.child("sizDimensionsMatchImageHeader").map(|n| n.is_valid()),
            Some(false)
        );
    }
}

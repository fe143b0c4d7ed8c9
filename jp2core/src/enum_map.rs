//! The Enumeration Mapper: a pure, late-stage projection over an already
//! fully-populated properties tree. It never consults the parser and the
//! parser never consults it — label lookup is strictly a rendering
//! concern, applied once after validation completes.

use std::collections::HashMap;
use std::convert::TryFrom;

use crate::tree::{PropertyNode, PropertyValue};

/// `property_name -> raw_value -> label`. Missing entries (either level)
/// leave the raw value untouched.
#[derive(Debug, Clone, Default)]
pub struct EnumerationMap {
    by_property: HashMap<String, HashMap<i64, String>>,
}

impl EnumerationMap {
    pub fn new() -> Self {
        EnumerationMap::default()
    }

    pub fn insert(&mut self, property_name: &str, raw_value: i64, label: &str) {
        self.by_property
            .entry(property_name.to_owned())
            .or_insert_with(HashMap::new)
            .insert(raw_value, label.to_owned());
    }

    fn label_for(&self, property_name: &str, value: &PropertyValue) -> Option<String> {
        let raw = match value {
            PropertyValue::UInt(v) => i64::try_from(*v).ok(),
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }?;
        self.by_property.get(property_name)?.get(&raw).cloned()
    }

    /// Applies the map to a tree, returning a new tree where every leaf
    /// whose name is a key in the map has its value replaced by the
    /// mapped label (as text). Subtree structure, names and order are
    /// preserved exactly. With an empty map this is the identity.
    pub fn apply(&self, node: &PropertyNode) -> PropertyNode {
        match node {
            PropertyNode::Leaf { name, value } => match self.label_for(name, value) {
                Some(label) => PropertyNode::Leaf {
                    name: name.clone(),
                    value: PropertyValue::Text(label),
                },
                None => node.clone(),
            },
            PropertyNode::Subtree { name, children } => PropertyNode::Subtree {
                name: name.clone(),
                children: children.iter().map(|c| self.apply(c)).collect(),
            },
        }
    }
}

/// The default catalogue, grounded in the distilled original's
/// `generatePropertiesRemapTable`.
pub fn default_map() -> EnumerationMap {
    let mut m = EnumerationMap::new();

    for name in ["unkC", "iPR", "precincts", "sop", "eph", "multipleComponentTransformation"] {
        m.insert(name, 0, "no");
        m.insert(name, 1, "yes");
    }

    for name in [
        "codingBypass",
        "resetOnBoundaries",
        "termOnEachPass",
        "vertCausalContext",
        "predTermination",
        "segmentationSymbols",
    ] {
        m.insert(name, 0, "no");
        m.insert(name, 1, "yes");
    }

    for name in ["bSign", "ssizSign", "bPCSign"] {
        m.insert(name, 0, "unsigned");
        m.insert(name, 1, "signed");
    }

    m.insert("c", 7, "jpeg2000");

    m.insert("meth", 1, "Enumerated");
    m.insert("meth", 2, "Restricted ICC");
    m.insert("meth", 3, "Any ICC");
    m.insert("meth", 4, "Vendor Colour");

    m.insert("enumCS", 16, "sRGB");
    m.insert("enumCS", 17, "greyscale");
    m.insert("enumCS", 18, "sYCC");

    m.insert("mTyp", 0, "direct use");
    m.insert("mTyp", 1, "palette mapping");

    m.insert("cTyp", 0, "colour");
    m.insert("cTyp", 1, "opacity");
    m.insert("cTyp", 2, "premultiplied opacity");
    m.insert("cTyp", 65535, "not specified");

    m.insert("cAssoc", 0, "all colours");
    m.insert("cAssoc", 65535, "no colours");

    m.insert("rsiz", 0, "ISO/IEC 15444-1");
    m.insert("rsiz", 1, "Profile 0");
    m.insert("rsiz", 2, "Profile 1");

    m.insert("order", 0, "LRCP");
    m.insert("order", 1, "RLCP");
    m.insert("order", 2, "RPCL");
    m.insert("order", 3, "PCRL");
    m.insert("order", 4, "CPRL");

    m.insert("transformation", 0, "9-7 irreversible");
    m.insert("transformation", 1, "5-3 reversible");

    m.insert("qStyle", 0, "no quantization");
    m.insert("qStyle", 1, "scalar derived");
    m.insert("qStyle", 2, "scalar expounded");

    m.insert("rcom", 0, "binary");
    m.insert("rcom", 1, "ISO/IEC 8859-15 (Latin)");

    m.insert("profileClass", encode_tag(b"scnr"), "Input Device Profile");
    m.insert("profileClass", encode_tag(b"mntr"), "Display Device Profile");
    m.insert("profileClass", encode_tag(b"prtr"), "Output Device Profile");
    m.insert("profileClass", encode_tag(b"link"), "DeviceLink Profile");
    m.insert("profileClass", encode_tag(b"spac"), "ColorSpace Conversion Profile");
    m.insert("profileClass", encode_tag(b"abst"), "Abstract Profile");
    m.insert("profileClass", encode_tag(b"nmcl"), "Named Colour Profile");

    m.insert("primaryPlatform", encode_tag(b"APPL"), "Apple Computer, Inc.");
    m.insert("primaryPlatform", encode_tag(b"MSFT"), "Microsoft Corporation");
    m.insert("primaryPlatform", encode_tag(b"SGI "), "Silicon Graphics, Inc.");
    m.insert("primaryPlatform", encode_tag(b"SUNW"), "Sun Microsystems, Inc.");

    m.insert("transparency", 0, "Reflective");
    m.insert("transparency", 1, "Transparent");

    m.insert("glossiness", 0, "Glossy");
    m.insert("glossiness", 1, "Matte");

    m.insert("polarity", 0, "Positive");
    m.insert("polarity", 1, "Negative");

    m.insert("colour", 0, "Colour");
    m.insert("colour", 1, "Black and white");

    m.insert("renderingIntent", 0, "Perceptual");
    m.insert("renderingIntent", 1, "Media-Relative Colorimetric");
    m.insert("renderingIntent", 2, "Saturation");
    m.insert("renderingIntent", 3, "ICC-Absolute Colorimetric");

    m
}

/// Packs a 4-byte ASCII tag into the `i64` key space the enumeration map
/// uses, so ICC tag signatures (`scnr`, `APPL`, ...) share the same table
/// shape as the small integer enumerations above.
fn encode_tag(tag: &[u8; 4]) -> i64 {
    u32::from_be_bytes(*tag) as i64
}

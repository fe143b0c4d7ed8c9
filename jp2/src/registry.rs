//! The Element Registry (§4.3): a static lookup from the 4-byte ASCII box
//! type to a symbolic `BoxKind`. Unknown tags map to `BoxKind::Unknown` and
//! are recorded but never recursed into — their payload is preserved only
//! as an opaque byte length.

pub type BoxType = [u8; 4];

pub const TYPE_SIGNATURE: BoxType = *b"jP  ";
pub const TYPE_FILE_TYPE: BoxType = *b"ftyp";
pub const TYPE_JP2_HEADER: BoxType = *b"jp2h";
pub const TYPE_IMAGE_HEADER: BoxType = *b"ihdr";
pub const TYPE_BITS_PER_COMPONENT: BoxType = *b"bpcc";
pub const TYPE_COLOUR_SPECIFICATION: BoxType = *b"colr";
pub const TYPE_PALETTE: BoxType = *b"pclr";
pub const TYPE_COMPONENT_MAPPING: BoxType = *b"cmap";
pub const TYPE_CHANNEL_DEFINITION: BoxType = *b"cdef";
pub const TYPE_RESOLUTION: BoxType = *b"res ";
pub const TYPE_CAPTURE_RESOLUTION: BoxType = *b"resc";
pub const TYPE_DISPLAY_RESOLUTION: BoxType = *b"resd";
pub const TYPE_CONTIGUOUS_CODESTREAM: BoxType = *b"jp2c";
pub const TYPE_XML: BoxType = *b"xml ";
pub const TYPE_UUID: BoxType = *b"uuid";
pub const TYPE_UUID_INFO: BoxType = *b"uinf";
pub const TYPE_UUID_LIST: BoxType = *b"ulst";
pub const TYPE_URL: BoxType = *b"url ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Signature,
    FileType,
    Jp2Header,
    ImageHeader,
    BitsPerComponent,
    ColourSpecification,
    Palette,
    ComponentMapping,
    ChannelDefinition,
    Resolution,
    CaptureResolution,
    DisplayResolution,
    ContiguousCodestream,
    Xml,
    Uuid,
    UuidInfo,
    UuidList,
    Url,
    Unknown,
}

impl BoxKind {
    pub fn from_tag(tag: &BoxType) -> BoxKind {
        match *tag {
            TYPE_SIGNATURE => BoxKind::Signature,
            TYPE_FILE_TYPE => BoxKind::FileType,
            TYPE_JP2_HEADER => BoxKind::Jp2Header,
            TYPE_IMAGE_HEADER => BoxKind::ImageHeader,
            TYPE_BITS_PER_COMPONENT => BoxKind::BitsPerComponent,
            TYPE_COLOUR_SPECIFICATION => BoxKind::ColourSpecification,
            TYPE_PALETTE => BoxKind::Palette,
            TYPE_COMPONENT_MAPPING => BoxKind::ComponentMapping,
            TYPE_CHANNEL_DEFINITION => BoxKind::ChannelDefinition,
            TYPE_RESOLUTION => BoxKind::Resolution,
            TYPE_CAPTURE_RESOLUTION => BoxKind::CaptureResolution,
            TYPE_DISPLAY_RESOLUTION => BoxKind::DisplayResolution,
            TYPE_CONTIGUOUS_CODESTREAM => BoxKind::ContiguousCodestream,
            TYPE_XML => BoxKind::Xml,
            TYPE_UUID => BoxKind::Uuid,
            TYPE_UUID_INFO => BoxKind::UuidInfo,
            TYPE_UUID_LIST => BoxKind::UuidList,
            TYPE_URL => BoxKind::Url,
            _ => BoxKind::Unknown,
        }
    }

    /// The tree node name a box of this kind is filed under, following the
    /// `xxxBox` naming the properties tree scenarios in the design use.
    pub fn node_name(&self) -> &'static str {
        match self {
            BoxKind::Signature => "signatureBox",
            BoxKind::FileType => "fileTypeBox",
            BoxKind::Jp2Header => "jp2HeaderBox",
            BoxKind::ImageHeader => "imageHeaderBox",
            BoxKind::BitsPerComponent => "bitsPerComponentBox",
            BoxKind::ColourSpecification => "colourSpecificationBox",
            BoxKind::Palette => "paletteBox",
            BoxKind::ComponentMapping => "componentMappingBox",
            BoxKind::ChannelDefinition => "channelDefinitionBox",
            BoxKind::Resolution => "resolutionBox",
            BoxKind::CaptureResolution => "captureResolutionBox",
            BoxKind::DisplayResolution => "displayResolutionBox",
            BoxKind::ContiguousCodestream => "contiguousCodestreamBox",
            BoxKind::Xml => "xmlBox",
            BoxKind::Uuid => "uuidBox",
            BoxKind::UuidInfo => "uuidInfoBox",
            BoxKind::UuidList => "uuidListBox",
            BoxKind::Url => "urlBox",
            BoxKind::Unknown => "unknownBox",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_map_to_their_kind() {
        assert_eq!(BoxKind::from_tag(&TYPE_SIGNATURE), BoxKind::Signature);
        assert_eq!(BoxKind::from_tag(&TYPE_CONTIGUOUS_CODESTREAM), BoxKind::ContiguousCodestream);
    }

    #[test]
    fn unrecognised_tag_is_unknown() {
        assert_eq!(BoxKind::from_tag(b"xxxx"), BoxKind::Unknown);
    }
}

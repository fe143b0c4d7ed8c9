//! The Box Walker (§4.4): iterates the boxes of an enclosing payload,
//! reading each box header (handling the extended-length and
//! "to end of enclosing element" encodings), slicing the payload, and
//! handing the slice plus its `BoxKind` to the caller.
//!
//! This module only understands headers; dispatch to a kind-specific
//! validator is left to the caller (`boxes::walk_and_dispatch`), since the
//! three places this iterates over (the file itself, the JP2 Header
//! superbox, and the UUID Info superbox) each fold results into a
//! differently-shaped parent.

use jp2core::ByteReader;
use log::warn;

use crate::registry::BoxType;

/// One box header as read from `LBox`/`TBox`/(optional) `XLBox`.
#[derive(Debug, Clone, Copy)]
pub struct BoxHeader {
    pub box_type: BoxType,
    pub header_size: usize,
    /// Total length of the box (header + payload) as declared, already
    /// clamped to fit within the enclosing slice when `length_is_valid`.
    pub total_length: usize,
    pub length_is_valid: bool,
}

/// Reads one box header starting at `slice[0]`. Returns `None` only when
/// even `LBox`/`TBox` themselves do not fit — there is no header to report
/// at all, not even an invalid one.
fn read_header(slice: &[u8]) -> Option<BoxHeader> {
    let r = ByteReader::new(slice);
    let (lbox, after_lbox) = r.u32be(0).ok()?;
    let (type_bytes, after_tbox) = r.bytes(after_lbox, 4).ok()?;
    let mut box_type: BoxType = [0; 4];
    box_type.copy_from_slice(type_bytes);

    match lbox {
        // LBox == 0: this box extends to the end of the enclosing slice and
        // must be the last box in it.
        0 => Some(BoxHeader {
            box_type,
            header_size: 8,
            total_length: slice.len(),
            length_is_valid: slice.len() >= 8,
        }),
        // LBox == 1: the real length follows as an 8-byte XLBox.
        1 => {
            let (xlbox, _) = r.u64be(after_tbox).ok()?;
            let valid = xlbox >= 16 && (xlbox as u128) <= slice.len() as u128;
            Some(BoxHeader {
                box_type,
                header_size: 16,
                total_length: if valid { xlbox as usize } else { slice.len() },
                length_is_valid: valid,
            })
        }
        // 2-7 are reserved for ISO use; no defined box ever uses them here.
        2..=7 => Some(BoxHeader {
            box_type,
            header_size: 8,
            total_length: slice.len(),
            length_is_valid: false,
        }),
        n => {
            let total = n as usize;
            let valid = total >= 8 && total <= slice.len();
            Some(BoxHeader {
                box_type,
                header_size: 8,
                total_length: if valid { total } else { slice.len() },
                length_is_valid: valid,
            })
        }
    }
}

/// One box as surfaced to a caller walking `payload`: its header, its
/// payload slice (empty when the header itself was invalid), and the
/// offset just past it to resume iteration from.
pub struct WalkedBox<'a> {
    pub header: BoxHeader,
    pub payload: &'a [u8],
    pub next_offset: usize,
}

/// Reads the next box starting at `offset` in `payload`. Returns `None`
/// once `offset` has reached the end of `payload` (clean termination) or
/// the header itself could not be read / declared a length that overruns
/// the enclosing slice (truncated termination — the caller records
/// `lengthIsValid = false` and stops iterating its siblings, per §4.4's
/// tie-break rule).
pub fn next_box<'a>(payload: &'a [u8], offset: usize) -> Option<WalkedBox<'a>> {
    if offset >= payload.len() {
        return None;
    }
    let header = match read_header(&payload[offset..]) {
        Some(h) => h,
        None => {
            warn!("box header truncated at offset {}", offset);
            return Some(WalkedBox {
                header: BoxHeader {
                    box_type: [0; 4],
                    header_size: 0,
                    total_length: payload.len() - offset,
                    length_is_valid: false,
                },
                payload: &[],
                next_offset: payload.len(),
            });
        }
    };

    if !header.length_is_valid || header.total_length < header.header_size {
        return Some(WalkedBox {
            header,
            payload: &[],
            next_offset: payload.len(),
        });
    }

    let box_payload = &payload[offset + header.header_size..offset + header.total_length];
    Some(WalkedBox {
        header,
        payload: box_payload,
        next_offset: offset + header.total_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_simple_length_prefixed_box() {
        let mut v = Vec::new();
        v.extend_from_slice(&12u32.to_be_bytes());
        v.extend_from_slice(b"jP  ");
        v.extend_from_slice(&[1, 2, 3, 4]);

        let walked = next_box(&v, 0).unwrap();
        assert!(walked.header.length_is_valid);
        assert_eq!(walked.header.box_type, *b"jP  ");
        assert_eq!(walked.payload, &[1, 2, 3, 4]);
        assert_eq!(walked.next_offset, 12);
    }

    #[test]
    fn lbox_zero_extends_to_end_of_slice() {
        let mut v = Vec::new();
        v.extend_from_slice(&0u32.to_be_bytes());
        v.extend_from_slice(b"jp2c");
        v.extend_from_slice(&[9, 9, 9]);

        let walked = next_box(&v, 0).unwrap();
        assert!(walked.header.length_is_valid);
        assert_eq!(walked.payload, &[9, 9, 9]);
        assert_eq!(walked.next_offset, v.len());
    }

    #[test]
    fn lbox_one_reads_extended_length() {
        let mut v = Vec::new();
        v.extend_from_slice(&1u32.to_be_bytes());
        v.extend_from_slice(b"jp2c");
        v.extend_from_slice(&20u64.to_be_bytes());
        v.extend_from_slice(&[0u8; 4]);

        let walked = next_box(&v, 0).unwrap();
        assert!(walked.header.length_is_valid);
        assert_eq!(walked.header.header_size, 16);
        assert_eq!(walked.payload.len(), 4);
    }

    #[test]
    fn overflowing_extended_length_is_invalid() {
        let mut v = Vec::new();
        v.extend_from_slice(&1u32.to_be_bytes());
        v.extend_from_slice(b"jp2c");
        v.extend_from_slice(&(1u64 << 40).to_be_bytes());
        v.extend_from_slice(&[0u8; 16]);

        let walked = next_box(&v, 0).unwrap();
        assert!(!walked.header.length_is_valid);
        assert_eq!(walked.next_offset, v.len());
    }

    #[test]
    fn truncated_header_terminates_iteration() {
        let v = vec![0u8, 0, 0];
        let walked = next_box(&v, 0).unwrap();
        assert!(!walked.header.length_is_valid);
        assert_eq!(walked.next_offset, v.len());
    }
}

//! Minimal EXIF parser for JPEG capture dates.
//!
//! Extracts one field: the year of `DateTimeOriginal` (Exif tag 0x9003).
//!
//! Layout walked:
//!
//! ```text
//! FF D8                          start of image
//! FF xx LL LL <payload>          marker segments, LL = big-endian length incl. itself
//! FF E1 LL LL "Exif\0\0" <TIFF>  APP1 carrying a TIFF structure
//!
//! TIFF:  "II" | "MM"             byte order for everything below
//!        2 bytes                 magic (not checked)
//!        u32                     offset of IFD0
//! IFD:   u16 count, count × 12-byte entries (tag u16, type u16, count u32, value u32)
//!        IFD0 tag 0x8769         offset of the Exif sub-IFD
//!        Exif tag 0x9003         DateTimeOriginal, ASCII "YYYY:MM:DD HH:MM:SS"
//! ```
//!
//! Only the first APP1 segment is inspected. Whatever it holds, the walk
//! stops there. Only the ASCII encoding of `DateTimeOriginal` is read.
//!
//! Every read is bounds-checked; malformed input yields `None`.

const SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_PREFIX: u8 = 0xFF;
const APP1: u8 = 0xE1;
const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";

const EXIF_IFD_POINTER: u16 = 0x8769;
const DATE_TIME_ORIGINAL: u16 = 0x9003;
const TYPE_ASCII: u16 = 2;
const IFD_ENTRY_LEN: usize = 12;

/// Read the capture year from a JPEG byte buffer.
///
/// Returns the leading four digits of `DateTimeOriginal`, e.g. `"2019"` for
/// `"2019:04:02 10:11:12"`. Never panics on malformed input.
pub fn extract_capture_year(bytes: &[u8]) -> Option<String> {
    let tiff = find_first_app1_exif(bytes)?;
    let date = read_date_time_original(tiff)?;
    parse_year(&date)
}

// ---------------------------------------------------------------------------
// JPEG: segment walk
// ---------------------------------------------------------------------------

/// Return the TIFF block of the first APP1 segment, if it carries EXIF.
fn find_first_app1_exif(data: &[u8]) -> Option<&[u8]> {
    if !data.starts_with(&SOI) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 < data.len() {
        if data[pos] != MARKER_PREFIX {
            return None;
        }
        let marker = data[pos + 1];
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;

        if marker == APP1 {
            let start = pos + 4;
            let payload = data.get(start..pos + 2 + seg_len)?;
            return payload.strip_prefix(EXIF_SIGNATURE);
        }

        if seg_len < 2 {
            return None;
        }
        pos += 2 + seg_len;
    }
    None
}

// ---------------------------------------------------------------------------
// TIFF: IFD walk
// ---------------------------------------------------------------------------

/// Byte-order aware reader over a TIFF block. Offsets are relative to the
/// block start.
struct TiffReader<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> TiffReader<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(0..2)? {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        Some(Self { data, big_endian })
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let b = self.data.get(offset..offset.checked_add(2)?)?;
        let pair = [b[0], b[1]];
        Some(if self.big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let b = self.data.get(offset..offset.checked_add(4)?)?;
        let quad = [b[0], b[1], b[2], b[3]];
        Some(if self.big_endian {
            u32::from_be_bytes(quad)
        } else {
            u32::from_le_bytes(quad)
        })
    }

    /// Offset of the entry with `tag` in the IFD starting at `ifd_offset`.
    fn find_entry(&self, ifd_offset: usize, tag: u16) -> Option<usize> {
        let count = self.u16_at(ifd_offset)? as usize;
        (0..count)
            .map(|i| ifd_offset + 2 + i * IFD_ENTRY_LEN)
            .take_while(|entry| entry + IFD_ENTRY_LEN <= self.data.len())
            .find(|&entry| self.u16_at(entry) == Some(tag))
    }

    /// Read an ASCII value of `count` bytes, stopping at the first NUL.
    fn ascii_at(&self, offset: usize, count: usize) -> Option<String> {
        let tail = self.data.get(offset..)?;
        let raw: Vec<u8> = tail
            .iter()
            .take(count)
            .copied()
            .take_while(|&b| b != 0)
            .collect();
        Some(String::from_utf8_lossy(&raw).into_owned())
    }
}

fn read_date_time_original(tiff: &[u8]) -> Option<String> {
    let reader = TiffReader::new(tiff)?;

    let ifd0 = reader.u32_at(4)? as usize;
    let pointer_entry = reader.find_entry(ifd0, EXIF_IFD_POINTER)?;
    let exif_ifd = reader.u32_at(pointer_entry + 8)? as usize;

    let entry = reader.find_entry(exif_ifd, DATE_TIME_ORIGINAL)?;
    if reader.u16_at(entry + 2)? != TYPE_ASCII {
        return None;
    }
    let count = reader.u32_at(entry + 4)? as usize;
    let value_offset = if count <= 4 {
        entry + 8
    } else {
        reader.u32_at(entry + 8)? as usize
    };
    reader.ascii_at(value_offset, count)
}

/// Leading four ASCII digits of an EXIF date string.
fn parse_year(date: &str) -> Option<String> {
    let year = date.get(0..4)?;
    year.bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| year.to_string())
}

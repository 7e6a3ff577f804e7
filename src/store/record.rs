//! Packed file-record encoding.
//!
//! A record array is a count-prefixed byte buffer of variable-length
//! records kept in ascending case-insensitive filename order:
//!
//! ```text
//! [count: u32][record_0][record_1]...
//! ```
//!
//! Each record is a fixed header followed by UTF-16 code units:
//!
//! ```text
//! [record_size: u16][filename_offset: u8][filename_length: u8]
//! [path + filename units][NUL][date units][NUL]
//! ```
//!
//! `filename_offset` is the path length in UTF-16 units (the filename
//! starts that many units into the string), `filename_length` counts the
//! filename units including its terminator. Remove records carry no date
//! section, only the full name and its terminator. All traversal is byte
//! offset based; offsets are recomputed from the buffer base after any
//! mutation, never cached across one.

use std::cmp::Ordering;
use std::fmt;

use crate::error::StoreError;

/// Size of the per-record header in bytes.
pub const RECORD_HEADER_SIZE: usize = 4;

/// Size of the leading record count in bytes.
pub const COUNT_SIZE: usize = 4;

const UNIT: usize = 2;

/// Fixed-size header preceding every packed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Total record size in bytes, header included.
    pub record_size: u16,
    /// Path length in UTF-16 units; the filename starts here.
    pub filename_offset: u8,
    /// Filename length in UTF-16 units, terminator included.
    pub filename_length: u8,
}

impl RecordHeader {
    /// Decode a header from the start of `buf`.
    #[must_use]
    pub fn read(buf: &[u8]) -> Self {
        Self {
            record_size: u16::from_le_bytes([buf[0], buf[1]]),
            filename_offset: buf[2],
            filename_length: buf[3],
        }
    }

    /// Encode this header into the start of `buf`.
    pub fn write(self, buf: &mut [u8]) {
        buf[..2].copy_from_slice(&self.record_size.to_le_bytes());
        buf[2] = self.filename_offset;
        buf[3] = self.filename_length;
    }

    /// Length of `path + filename` in UTF-16 units, without terminator.
    #[must_use]
    pub fn full_name_units(self) -> usize {
        usize::from(self.filename_offset) + usize::from(self.filename_length) - 1
    }

    /// Length of the date string in UTF-16 units, without terminator.
    /// Zero for records packed without a date section.
    #[must_use]
    pub fn date_units(self) -> usize {
        let total = (usize::from(self.record_size) - RECORD_HEADER_SIZE) / UNIT;
        total
            .saturating_sub(self.full_name_units() + 1)
            .saturating_sub(1)
    }
}

/// Borrowed little-endian UTF-16 string inside a packed buffer.
#[derive(Clone, Copy)]
pub struct U16Str<'a>(&'a [u8]);

impl<'a> U16Str<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() % UNIT == 0);
        Self(bytes)
    }

    /// Length in UTF-16 units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len() / UNIT
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `i`-th UTF-16 unit.
    #[must_use]
    pub fn unit(&self, i: usize) -> u16 {
        u16::from_le_bytes([self.0[i * UNIT], self.0[i * UNIT + 1]])
    }

    /// Iterate over the UTF-16 units.
    pub fn iter(&self) -> impl Iterator<Item = u16> + 'a {
        self.0
            .chunks_exact(UNIT)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
    }

    /// The raw little-endian bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

impl fmt::Display for U16Str<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.iter()) {
            fmt::Write::write_char(f, c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for U16Str<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Encode a Rust string as UTF-16 units.
#[must_use]
pub fn encode_utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Number of leading units that form the path, trailing separator
/// included. Zero when the name carries no separator.
#[must_use]
pub fn path_units(full: &[u16]) -> usize {
    full.iter()
        .rposition(|&u| u == u16::from(b'/') || u == u16::from(b'\\'))
        .map_or(0, |i| i + 1)
}

fn upper(u: u16) -> u16 {
    if u < 0x80 {
        u16::from((u as u8).to_ascii_uppercase())
    } else {
        char::from_u32(u32::from(u))
            .and_then(|c| c.to_uppercase().next())
            .and_then(|c| u16::try_from(u32::from(c)).ok())
            .unwrap_or(u)
    }
}

/// Case-insensitive ordering of two packed strings, unit by unit.
#[must_use]
pub fn cmp_ignore_case(a: U16Str<'_>, b: U16Str<'_>) -> Ordering {
    let mut ai = a.iter().map(upper);
    let mut bi = b.iter().map(upper);
    loop {
        match (ai.next(), bi.next()) {
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => {}
                other => return other,
            },
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
        }
    }
}

/// Case-insensitive equality of two packed strings.
#[must_use]
pub fn eq_ignore_case(a: U16Str<'_>, b: U16Str<'_>) -> bool {
    a.len() == b.len() && cmp_ignore_case(a, b) == Ordering::Equal
}

/// Case-insensitive forward substring scan starting at unit `from`.
/// Returns the unit index of the first match. An empty needle matches
/// at `from`.
#[must_use]
pub fn find_ignore_case(haystack: U16Str<'_>, needle: &[u16], from: usize) -> Option<usize> {
    let hay_len = haystack.len();
    if needle.is_empty() {
        return (from <= hay_len).then_some(from);
    }
    if from + needle.len() > hay_len {
        return None;
    }
    'outer: for start in from..=(hay_len - needle.len()) {
        for (i, &n) in needle.iter().enumerate() {
            if upper(haystack.unit(start + i)) != upper(n) {
                continue 'outer;
            }
        }
        return Some(start);
    }
    None
}

/// Case-sensitive substring scan. Returns the unit index of the first
/// match at or after unit zero.
#[must_use]
pub fn find_exact(haystack: U16Str<'_>, needle: &[u16]) -> Option<usize> {
    let hay_len = haystack.len();
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > hay_len {
        return None;
    }
    'outer: for start in 0..=(hay_len - needle.len()) {
        for (i, &n) in needle.iter().enumerate() {
            if haystack.unit(start + i) != n {
                continue 'outer;
            }
        }
        return Some(start);
    }
    None
}

/// Decoded snapshot of one record, for consumers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    /// Directory part, trailing separator included.
    pub path: String,
    /// Filename including extension.
    pub filename: String,
    /// Fixed-width local timestamp, empty for dateless records.
    pub date: String,
}

/// The packed, sorted record array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordArray {
    buf: Vec<u8>,
}

impl Default for RecordArray {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordArray {
    /// An empty array: a zero count and nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0; COUNT_SIZE],
        }
    }

    /// Number of records.
    #[must_use]
    pub fn count(&self) -> u32 {
        u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
    }

    pub(crate) fn set_count(&mut self, n: u32) {
        self.buf[..COUNT_SIZE].copy_from_slice(&n.to_le_bytes());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Total size in bytes, count prefix included.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn raw(&self) -> &Vec<u8> {
        &self.buf
    }

    pub(crate) fn raw_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Header of the record starting at byte `offset`.
    #[must_use]
    pub fn header_at(&self, offset: usize) -> RecordHeader {
        RecordHeader::read(&self.buf[offset..])
    }

    /// Full `path + filename` string of the record at `offset`.
    #[must_use]
    pub fn full_name_at(&self, offset: usize) -> U16Str<'_> {
        let h = self.header_at(offset);
        let start = offset + RECORD_HEADER_SIZE;
        U16Str::new(&self.buf[start..start + h.full_name_units() * UNIT])
    }

    /// Filename part of the record at `offset`.
    #[must_use]
    pub fn filename_at(&self, offset: usize) -> U16Str<'_> {
        let h = self.header_at(offset);
        let start = offset + RECORD_HEADER_SIZE + usize::from(h.filename_offset) * UNIT;
        U16Str::new(&self.buf[start..start + (usize::from(h.filename_length) - 1) * UNIT])
    }

    /// Date string of the record at `offset`, empty for dateless records.
    #[must_use]
    pub fn date_at(&self, offset: usize) -> U16Str<'_> {
        let h = self.header_at(offset);
        let start = offset + RECORD_HEADER_SIZE + (h.full_name_units() + 1) * UNIT;
        U16Str::new(&self.buf[start..start + h.date_units() * UNIT])
    }

    /// Byte offsets of every record, in array order.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let mut offset = COUNT_SIZE;
        let mut remaining = self.count();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let current = offset;
            offset += usize::from(self.header_at(current).record_size);
            Some(current)
        })
    }

    /// Decoded snapshots of every record, in array order.
    pub fn views(&self) -> impl Iterator<Item = RecordView> + '_ {
        self.offsets().map(move |off| {
            let h = self.header_at(off);
            let full = self.full_name_at(off);
            let path: String = char::decode_utf16(full.iter().take(usize::from(h.filename_offset)))
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect();
            RecordView {
                path,
                filename: self.filename_at(off).to_string(),
                date: self.date_at(off).to_string(),
            }
        })
    }
}

/// Build the header for a record holding `full` (path + filename, as
/// UTF-16 units) and a date of `date_units` units.
///
/// # Errors
///
/// Returns [`StoreError::RecordTooLarge`] when the path or filename does
/// not fit the one-byte header fields, or the record exceeds `u16` bytes.
pub fn make_header(full: &[u16], date_units: usize) -> Result<RecordHeader, StoreError> {
    let path_len = path_units(full);
    let filename_len = full.len() - path_len;

    let too_large = |reason| StoreError::RecordTooLarge {
        name: String::from_utf16_lossy(full),
        reason,
    };

    let filename_offset = u8::try_from(path_len).map_err(|_| too_large("path too long"))?;
    let filename_length =
        u8::try_from(filename_len + 1).map_err(|_| too_large("filename too long"))?;

    let nulls = if date_units == 0 { 1 } else { 2 };
    let size = RECORD_HEADER_SIZE + UNIT * (full.len() + date_units + nulls);
    let record_size = u16::try_from(size).map_err(|_| too_large("record too long"))?;

    Ok(RecordHeader {
        record_size,
        filename_offset,
        filename_length,
    })
}

/// Encode one record (header, full name, optional date) to bytes.
///
/// # Errors
///
/// Returns [`StoreError::RecordTooLarge`] when the name or date exceeds
/// the header encoding limits.
pub fn encode_record(full: &[u16], date: &[u16]) -> Result<Vec<u8>, StoreError> {
    let header = make_header(full, date.len())?;

    let mut out = Vec::with_capacity(usize::from(header.record_size));
    out.extend_from_slice(&[0; RECORD_HEADER_SIZE]);
    header.write(&mut out);

    for &u in full {
        out.extend_from_slice(&u.to_le_bytes());
    }
    out.extend_from_slice(&0u16.to_le_bytes());
    if !date.is_empty() {
        for &u in date {
            out.extend_from_slice(&u.to_le_bytes());
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    debug_assert_eq!(out.len(), usize::from(header.record_size));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let h = RecordHeader {
            record_size: 70,
            filename_offset: 8,
            filename_length: 10,
        };
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        h.write(&mut buf);
        assert_eq!(RecordHeader::read(&buf), h);
    }

    #[test]
    fn path_units_finds_last_separator() {
        assert_eq!(path_units(&encode_utf16("C:\\p\\file.txt")), 5);
        assert_eq!(path_units(&encode_utf16("/home/u/f.rs")), 8);
        assert_eq!(path_units(&encode_utf16("bare.txt")), 0);
    }

    #[test]
    fn encode_decodes_back() {
        let full = encode_utf16("C:\\proj\\main.rs");
        let date = encode_utf16("01/01/2020 10:00");
        let bytes = encode_record(&full, &date).unwrap();

        let h = RecordHeader::read(&bytes);
        assert_eq!(usize::from(h.filename_offset), 8);
        assert_eq!(usize::from(h.filename_length), "main.rs".len() + 1);
        assert_eq!(h.full_name_units(), full.len());
        assert_eq!(h.date_units(), date.len());
    }

    #[test]
    fn dateless_record_has_zero_date_units() {
        let full = encode_utf16("C:\\p\\a.txt");
        let bytes = encode_record(&full, &[]).unwrap();
        let h = RecordHeader::read(&bytes);
        assert_eq!(h.date_units(), 0);
        assert_eq!(
            usize::from(h.record_size),
            RECORD_HEADER_SIZE + 2 * (full.len() + 1)
        );
    }

    #[test]
    fn oversized_path_is_rejected() {
        let long = format!("{}\\f.txt", "x".repeat(300));
        let err = encode_record(&encode_utf16(&long), &[]).unwrap_err();
        assert!(matches!(err, StoreError::RecordTooLarge { .. }));
    }

    #[test]
    fn case_insensitive_compare() {
        let a = encode_utf16("Alpha.TXT");
        let b = encode_utf16("alpha.txt");
        let ab: Vec<u8> = a.iter().flat_map(|u| u.to_le_bytes()).collect();
        let bb: Vec<u8> = b.iter().flat_map(|u| u.to_le_bytes()).collect();
        assert!(eq_ignore_case(U16Str::new(&ab), U16Str::new(&bb)));
        assert_eq!(
            cmp_ignore_case(U16Str::new(&ab), U16Str::new(&bb)),
            Ordering::Equal
        );
    }

    #[test]
    fn find_ignore_case_scans_forward() {
        let hay: Vec<u8> = encode_utf16("C:\\Foo\\Bar.txt")
            .iter()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        let hay = U16Str::new(&hay);
        assert_eq!(find_ignore_case(hay, &encode_utf16("foo"), 0), Some(3));
        assert_eq!(find_ignore_case(hay, &encode_utf16("bar"), 4), Some(7));
        assert_eq!(find_ignore_case(hay, &encode_utf16("foo"), 4), None);
    }

    #[test]
    fn empty_array() {
        let arr = RecordArray::new();
        assert_eq!(arr.count(), 0);
        assert_eq!(arr.byte_len(), COUNT_SIZE);
        assert_eq!(arr.offsets().count(), 0);
    }
}

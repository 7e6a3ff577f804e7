//! Token search over a record array.
//!
//! A linear scan with two token lists: any exclude token found as a
//! case-insensitive substring of the search domain rejects the record;
//! include tokens must all be found as *ordered* substrings, each search
//! resuming past the previous token's match. The domain is the full
//! `path + filename` when `match_full_path` is set, otherwise the
//! filename alone. Empty token lists match every record.
//!
//! The scan doubles as the lazy reconciliation point for the pending
//! update buffer: when a matching record's encoded size equals the head
//! pending entry's and the full names agree, the pending bytes overwrite
//! the main-array slot in place and the pending entry is dropped.

use super::record::{
    encode_utf16, eq_ignore_case, find_ignore_case, RecordArray, RecordView, COUNT_SIZE,
};

/// Size of the per-record header in a result buffer.
pub const RESULT_HEADER_SIZE: usize = 6;

/// Run a search over `db`, reconciling `pending` along the way.
///
/// Returns a self-contained result buffer, independent of the source
/// array's layout:
///
/// ```text
/// [count: u32][data_offset_i: u32 x count]
/// [record_size: u16][filename_offset: u16][date_offset: u16]
/// [path][NUL][filename][NUL][date][NUL] ...
/// ```
///
/// Offsets in the table and in the record headers are byte offsets
/// relative to the start of the data section and the end of the record
/// header respectively.
#[must_use]
pub fn search(
    db: &mut RecordArray,
    pending: &mut RecordArray,
    include: &[String],
    exclude: &[String],
    match_full_path: bool,
) -> SearchResults {
    let include: Vec<Vec<u16>> = include.iter().map(|s| encode_utf16(s)).collect();
    let exclude: Vec<Vec<u16>> = exclude.iter().map(|s| encode_utf16(s)).collect();
    let match_everything = include.is_empty() && exclude.is_empty();

    let mut offsets: Vec<u32> = Vec::new();
    let mut data: Vec<u8> = Vec::new();

    let mut off = COUNT_SIZE;
    let mut remaining = db.count();
    while remaining > 0 {
        let size = usize::from(db.header_at(off).record_size);
        let mut bail = false;

        if !match_everything {
            let domain = if match_full_path {
                db.full_name_at(off)
            } else {
                db.filename_at(off)
            };

            for token in &exclude {
                if find_ignore_case(domain, token, 0).is_some() {
                    bail = true;
                    break;
                }
            }

            if !bail {
                let mut cursor = 0;
                for token in &include {
                    match find_ignore_case(domain, token, cursor) {
                        Some(at) => cursor = at + token.len(),
                        None => {
                            bail = true;
                            break;
                        }
                    }
                }
            }
        }

        if !bail {
            reconcile_pending(db, pending, off, size);

            #[allow(clippy::cast_possible_truncation)]
            offsets.push(data.len() as u32);
            append_result_record(&mut data, db, off);
        }

        off += size;
        remaining -= 1;
    }

    let mut buf = Vec::with_capacity(COUNT_SIZE + offsets.len() * 4 + data.len());
    #[allow(clippy::cast_possible_truncation)]
    buf.extend_from_slice(&(offsets.len() as u32).to_le_bytes());
    for o in &offsets {
        buf.extend_from_slice(&o.to_le_bytes());
    }
    buf.extend_from_slice(&data);

    SearchResults { buf }
}

/// Overwrite the record at `off` with the head pending entry when both
/// full names match and the encoded sizes are byte-identical.
fn reconcile_pending(db: &mut RecordArray, pending: &mut RecordArray, off: usize, size: usize) {
    if pending.count() == 0 {
        return;
    }

    let p_off = COUNT_SIZE;
    let p_size = usize::from(pending.header_at(p_off).record_size);
    if p_size != size || !eq_ignore_case(db.full_name_at(off), pending.full_name_at(p_off)) {
        return;
    }

    let record = pending.raw()[p_off..p_off + p_size].to_vec();
    db.raw_mut()[off..off + size].copy_from_slice(&record);

    pending
        .raw_mut()
        .splice(p_off..p_off + p_size, std::iter::empty());
    let count = pending.count();
    pending.set_count(count - 1);
}

/// Re-encode the record at `off` into the result data section.
fn append_result_record(out: &mut Vec<u8>, db: &RecordArray, off: usize) {
    let header = db.header_at(off);
    let path_units = usize::from(header.filename_offset) + 1;
    let filename_units = usize::from(header.filename_length);
    let date_units = header.date_units() + 1;

    let record_size = RESULT_HEADER_SIZE + 2 * (path_units + filename_units + date_units);
    let filename_offset = path_units * 2;
    let date_offset = record_size - date_units * 2 - RESULT_HEADER_SIZE;

    #[allow(clippy::cast_possible_truncation)]
    {
        out.extend_from_slice(&(record_size as u16).to_le_bytes());
        out.extend_from_slice(&(filename_offset as u16).to_le_bytes());
        out.extend_from_slice(&(date_offset as u16).to_le_bytes());
    }

    let full = db.full_name_at(off);
    out.extend_from_slice(&full.as_bytes()[..(path_units - 1) * 2]);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(db.filename_at(off).as_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(db.date_at(off).as_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
}

/// A self-contained search result buffer.
#[derive(Debug, Clone)]
pub struct SearchResults {
    buf: Vec<u8>,
}

impl SearchResults {
    /// Number of matching records.
    #[must_use]
    pub fn count(&self) -> u32 {
        u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The raw result buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Decode the `i`-th record.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<RecordView> {
        if i >= self.count() as usize {
            return None;
        }

        let table_entry = COUNT_SIZE + i * 4;
        let data_offset = u32::from_le_bytes([
            self.buf[table_entry],
            self.buf[table_entry + 1],
            self.buf[table_entry + 2],
            self.buf[table_entry + 3],
        ]) as usize;

        let data_start = COUNT_SIZE + self.count() as usize * 4;
        let record = data_start + data_offset;

        let record_size =
            usize::from(u16::from_le_bytes([self.buf[record], self.buf[record + 1]]));
        let filename_offset = usize::from(u16::from_le_bytes([
            self.buf[record + 2],
            self.buf[record + 3],
        ]));
        let date_offset = usize::from(u16::from_le_bytes([
            self.buf[record + 4],
            self.buf[record + 5],
        ]));

        let fields = record + RESULT_HEADER_SIZE;
        let path = decode_units(&self.buf[fields..fields + filename_offset - 2]);
        let filename = decode_units(&self.buf[fields + filename_offset..fields + date_offset - 2]);
        let date_end = record + record_size;
        let date = decode_units(&self.buf[fields + date_offset..date_end - 2]);

        Some(RecordView {
            path,
            filename,
            date,
        })
    }

    /// Iterate over all decoded records.
    pub fn iter(&self) -> impl Iterator<Item = RecordView> + '_ {
        (0..self.count() as usize).filter_map(move |i| self.get(i))
    }
}

fn decode_units(bytes: &[u8]) -> String {
    char::decode_utf16(
        bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]])),
    )
    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ops::{exclude as exclude_op, insert, replace};

    fn array_of(entries: &[(&str, &str)]) -> RecordArray {
        let mut db = RecordArray::new();
        for (name, date) in entries {
            insert(&mut db, name, date).unwrap();
        }
        db
    }

    fn run(
        db: &mut RecordArray,
        include: &[&str],
        exclude: &[&str],
        full_path: bool,
    ) -> SearchResults {
        let include: Vec<String> = include.iter().map(ToString::to_string).collect();
        let exclude: Vec<String> = exclude.iter().map(ToString::to_string).collect();
        let mut pending = RecordArray::new();
        search(db, &mut pending, &include, &exclude, full_path)
    }

    #[test]
    fn empty_query_matches_all_records() {
        let mut db = array_of(&[
            ("C:\\p\\a.txt", "01/01/2020 10:00"),
            ("C:\\p\\b.txt", "02/02/2020 12:30"),
        ]);

        let results = run(&mut db, &[], &[], false);

        assert_eq!(results.count(), 2);
        let first = results.get(0).unwrap();
        assert_eq!(first.path, "C:\\p\\");
        assert_eq!(first.filename, "a.txt");
        assert_eq!(first.date, "01/01/2020 10:00");
    }

    #[test]
    fn search_on_empty_array_returns_zero_count() {
        let mut db = RecordArray::new();
        let results = run(&mut db, &["x"], &[], false);
        assert_eq!(results.count(), 0);
        assert!(results.get(0).is_none());
    }

    #[test]
    fn include_tokens_must_match_in_order() {
        let mut db = array_of(&[("C:\\foo\\x\\bar.txt", "01/01/2020 10:00")]);

        // ordered substrings across the full path
        let hit = run(&mut db, &["foo", "bar"], &[], true);
        assert_eq!(hit.count(), 1);

        // same tokens against the filename only: "foo" is absent
        let miss = run(&mut db, &["foo", "bar"], &[], false);
        assert_eq!(miss.count(), 0);

        // order matters
        let wrong_order = run(&mut db, &["bar", "foo"], &[], true);
        assert_eq!(wrong_order.count(), 0);
    }

    #[test]
    fn include_tokens_do_not_overlap() {
        let mut db = array_of(&[("C:\\p\\abc.txt", "01/01/2020 10:00")]);
        // both tokens exist, but the second must start after "abc" ends
        let results = run(&mut db, &["abc", "bc"], &[], false);
        assert_eq!(results.count(), 0);
    }

    #[test]
    fn exclude_token_rejects_record() {
        let mut db = array_of(&[
            ("C:\\p\\main.rs", "01/01/2020 10:00"),
            ("C:\\p\\main_test.rs", "01/01/2020 10:00"),
        ]);

        let results = run(&mut db, &["main"], &["test"], false);

        assert_eq!(results.count(), 1);
        assert_eq!(results.get(0).unwrap().filename, "main.rs");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut db = array_of(&[("C:\\Proj\\ReadMe.MD", "01/01/2020 10:00")]);
        let results = run(&mut db, &["readme"], &[], false);
        assert_eq!(results.count(), 1);
    }

    #[test]
    fn pending_update_is_merged_during_search() {
        let mut db = array_of(&[("C:\\p\\a.txt", "01/01/2020 10:00")]);
        let mut pending = array_of(&[("C:\\p\\a.txt", "31/12/2021 23:59")]);

        let results = search(&mut db, &mut pending, &[], &[], false);

        assert_eq!(results.get(0).unwrap().date, "31/12/2021 23:59");
        assert_eq!(pending.count(), 0);
        // the main array itself now holds the updated date
        assert_eq!(db.views().next().unwrap().date, "31/12/2021 23:59");
    }

    #[test]
    fn size_mismatched_pending_update_stays_pending() {
        let mut db = array_of(&[("C:\\p\\a.txt", "01/01/2020 10:00")]);
        // dateless update record encodes smaller than the main record
        let mut pending = array_of(&[("C:\\p\\a.txt", "")]);

        let results = search(&mut db, &mut pending, &[], &[], false);

        assert_eq!(results.get(0).unwrap().date, "01/01/2020 10:00");
        assert_eq!(pending.count(), 1);
    }

    #[test]
    fn remove_invalidates_pending_update() {
        let mut db = array_of(&[("C:\\p\\a.txt", "01/01/2020 10:00")]);
        let mut pending = RecordArray::new();
        replace(
            &mut pending,
            &array_of(&[("C:\\p\\a.txt", "31/12/2021 23:59")]),
        );

        let removals = array_of(&[("C:\\p\\a.txt", "")]);
        exclude_op(&mut db, &removals);
        exclude_op(&mut pending, &removals);

        let results = search(&mut db, &mut pending, &[], &[], false);
        assert_eq!(results.count(), 0);
        assert_eq!(pending.count(), 0);
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let entries = [
            ("C:\\alpha\\one.rs", "01/01/2020 10:00"),
            ("C:\\beta\\two.rs", "02/01/2020 11:00"),
            ("C:\\gamma\\three.rs", "03/01/2020 12:00"),
        ];
        let mut db = array_of(&entries);

        let results = run(&mut db, &[], &[], false);

        assert_eq!(results.count() as usize, entries.len());
        let mut seen: Vec<(String, String, String)> = results
            .iter()
            .map(|v| (v.path, v.filename, v.date))
            .collect();
        seen.sort();
        let mut expected: Vec<(String, String, String)> = entries
            .iter()
            .map(|(full, date)| {
                let split = full.rfind('\\').unwrap() + 1;
                (
                    full[..split].to_string(),
                    full[split..].to_string(),
                    (*date).to_string(),
                )
            })
            .collect();
        expected.sort();
        assert_eq!(seen, expected);
    }
}

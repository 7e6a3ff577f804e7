//! Mutation algorithms over packed record arrays.
//!
//! All operations are pure transformations of the owned buffers: input
//! arrays in, mutated array out. Every routine preserves the ascending
//! case-insensitive filename order, except where noted on [`replace`].

use std::cmp::Ordering;

use crate::error::StoreError;

use super::record::{
    cmp_ignore_case, encode_record, encode_utf16, eq_ignore_case, find_exact, RecordArray,
    RecordHeader, U16Str, COUNT_SIZE, RECORD_HEADER_SIZE,
};

/// Insert one record, keeping the array sorted.
///
/// The insertion point is located by a linear scan comparing filenames
/// case-insensitively; the tail is shifted right and the count bumped.
///
/// # Errors
///
/// Returns [`StoreError::RecordTooLarge`] when the name or date does not
/// fit the packed header encoding. The array is unchanged on error.
pub fn insert(db: &mut RecordArray, full_name: &str, date: &str) -> Result<(), StoreError> {
    let full = encode_utf16(full_name);
    let date = encode_utf16(date);
    let bytes = encode_record(&full, &date)?;

    let header = RecordHeader::read(&bytes);
    let fn_start = RECORD_HEADER_SIZE + usize::from(header.filename_offset) * 2;
    let fn_end = fn_start + (usize::from(header.filename_length) - 1) * 2;
    let new_filename = U16Str::new(&bytes[fn_start..fn_end]);

    let mut insert_at = db.byte_len();
    for off in db.offsets() {
        if cmp_ignore_case(db.filename_at(off), new_filename) == Ordering::Greater {
            insert_at = off;
            break;
        }
    }

    let count = db.count();
    db.raw_mut().splice(insert_at..insert_at, bytes);
    db.set_count(count + 1);
    Ok(())
}

/// Merge a sorted incoming array into a sorted destination array.
///
/// Incoming records are consumed left to right; each is spliced in front
/// of the first destination record whose filename sorts after it, and any
/// remainder is bulk-appended. Amortized linear in total bytes moved.
pub fn merge(db: &mut RecordArray, incoming: &RecordArray) {
    let total = db.count() + incoming.count();

    let mut a_off = COUNT_SIZE;
    let mut a_remaining = db.count();
    let mut b_off = COUNT_SIZE;
    let mut b_remaining = incoming.count();

    while a_remaining > 0 && b_remaining > 0 {
        let a_size = usize::from(db.header_at(a_off).record_size);
        let b_size = usize::from(incoming.header_at(b_off).record_size);

        if cmp_ignore_case(db.filename_at(a_off), incoming.filename_at(b_off))
            == Ordering::Greater
        {
            let record = incoming.raw()[b_off..b_off + b_size].to_vec();
            db.raw_mut().splice(a_off..a_off, record);
            a_off += b_size;
            b_off += b_size;
            b_remaining -= 1;
        } else {
            a_off += a_size;
            a_remaining -= 1;
        }
    }

    if b_remaining > 0 {
        let remainder = &incoming.raw()[b_off..];
        db.raw_mut().extend_from_slice(remainder);
    }
    db.set_count(total);
}

/// Remove every record whose full name matches one in `removals`.
///
/// Both arrays are walked once; matching records are compacted out by
/// shifting the remainder left. Idempotent.
pub fn exclude(db: &mut RecordArray, removals: &RecordArray) {
    let mut a_off = COUNT_SIZE;
    let mut a_remaining = db.count();
    let mut r_off = COUNT_SIZE;
    let mut r_remaining = removals.count();
    let mut removed = 0u32;

    while a_remaining > 0 && r_remaining > 0 {
        let a_size = usize::from(db.header_at(a_off).record_size);

        if eq_ignore_case(db.full_name_at(a_off), removals.full_name_at(r_off)) {
            db.raw_mut().splice(a_off..a_off + a_size, std::iter::empty());
            removed += 1;
            a_remaining -= 1;
            let r_size = usize::from(removals.header_at(r_off).record_size);
            r_off += r_size;
            r_remaining -= 1;
        } else {
            a_off += a_size;
            a_remaining -= 1;
        }
    }

    if removed > 0 {
        let count = db.count();
        db.set_count(count - removed);
    }
}

/// Overwrite records in place from `updates`, appending the leftovers.
///
/// A destination record is overwritten only when its full name matches an
/// update record *and* both encoded sizes are identical; updates whose
/// re-encoded size differs are never merged through this path. Leftover
/// updates are appended at the end without re-sorting, a known ordering
/// relaxation.
pub fn replace(db: &mut RecordArray, updates: &RecordArray) {
    let mut a_off = COUNT_SIZE;
    let mut a_remaining = db.count();
    let mut u_off = COUNT_SIZE;
    let mut u_remaining = updates.count();

    while a_remaining > 0 && u_remaining > 0 {
        let a_size = usize::from(db.header_at(a_off).record_size);
        let u_size = usize::from(updates.header_at(u_off).record_size);

        if a_size == u_size && eq_ignore_case(db.full_name_at(a_off), updates.full_name_at(u_off))
        {
            let record = updates.raw()[u_off..u_off + u_size].to_vec();
            db.raw_mut()[a_off..a_off + a_size].copy_from_slice(&record);
            u_off += u_size;
            u_remaining -= 1;
        }

        a_off += a_size;
        a_remaining -= 1;
    }

    if u_remaining > 0 {
        let remainder = updates.raw()[u_off..].to_vec();
        db.raw_mut().extend_from_slice(&remainder);
        let count = db.count();
        db.set_count(count + u_remaining);
    }
}

/// Rewrite the directory prefix of every record containing `from`.
///
/// The first occurrence of `from` in the full name is replaced by `to`.
/// Equal lengths overwrite in place; a shorter replacement shifts the
/// tail left and shrinks the record; a longer one grows the buffer first,
/// then shifts the tail right. Record offsets are recomputed from the
/// buffer base on every step, never carried across a resize.
///
/// # Errors
///
/// Returns [`StoreError::RecordTooLarge`] when growth overflows a
/// record's packed header fields; earlier records keep the new prefix.
pub fn rename_prefix(db: &mut RecordArray, from: &str, to: &str) -> Result<(), StoreError> {
    let from_units = encode_utf16(from);
    let to_units = encode_utf16(to);
    if from_units.is_empty() {
        return Ok(());
    }

    #[allow(clippy::cast_possible_wrap)]
    let delta = to_units.len() as isize - from_units.len() as isize;
    let to_bytes: Vec<u8> = to_units.iter().flat_map(|u| u.to_le_bytes()).collect();

    let mut off = COUNT_SIZE;
    let mut remaining = db.count();
    while remaining > 0 {
        let header = db.header_at(off);
        let mut size = usize::from(header.record_size);

        if let Some(at) = find_exact(db.full_name_at(off), &from_units) {
            let too_large = |reason| StoreError::RecordTooLarge {
                name: db.full_name_at(off).to_string(),
                reason,
            };

            #[allow(clippy::cast_possible_wrap)]
            let new_size = usize::try_from(size as isize + delta * 2)
                .map_err(|_| too_large("rename underflows record"))?;
            #[allow(clippy::cast_possible_wrap)]
            let new_offset = u8::try_from(isize::from(header.filename_offset) + delta)
                .map_err(|_| too_large("renamed path too long"))?;
            let new_record_size =
                u16::try_from(new_size).map_err(|_| too_large("renamed record too long"))?;

            let match_start = off + RECORD_HEADER_SIZE + at * 2;
            db.raw_mut().splice(
                match_start..match_start + from_units.len() * 2,
                to_bytes.iter().copied(),
            );

            let new_header = RecordHeader {
                record_size: new_record_size,
                filename_offset: new_offset,
                filename_length: header.filename_length,
            };
            new_header.write(&mut db.raw_mut()[off..]);
            size = new_size;
        }

        off += size;
        remaining -= 1;
    }
    Ok(())
}

//! The packed file-record store.
//!
//! This module holds the binary record format and the pure algorithms
//! that operate on it: sorted insertion, sorted-array merge, exclusion,
//! in-place replacement, directory-prefix renaming and token search.
//! Nothing here performs I/O or touches a thread; the repository engine
//! owns the buffers and calls in.

pub mod date;
pub mod ops;
pub mod record;
pub mod search;

pub use record::{RecordArray, RecordView};
pub use search::SearchResults;

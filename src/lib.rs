//! filedex - a live, queryable file index for project solutions.
//!
//! Directories registered as a solution are scanned into a packed,
//! sorted record array; the folder monitor keeps the array synchronized
//! with the file system; substring/token searches are answered from the
//! same single-writer loop that applies every mutation.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod engine;
pub mod error;
pub mod store;
pub mod watch;

pub use config::{DirectoryEntry, SolutionConfig};
pub use engine::FileRepository;
pub use error::{Error, Result};
pub use store::{RecordView, SearchResults};

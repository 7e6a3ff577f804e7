//! Framed messages consumed by the repository engine.
//!
//! Every producer (scan workers, the folder monitor, search callers)
//! communicates with a repository exclusively through these messages.
//! Record batches stay in the packed [`RecordArray`] encoding end to end;
//! the engine splices them into its own array without re-parsing.

use std::fmt;

use crate::store::{RecordArray, SearchResults};

/// A parsed search request travelling through the mailbox.
pub struct SearchQuery {
    /// Tokens that must all match, in order.
    pub include: Vec<String>,
    /// Tokens that must not match.
    pub exclude: Vec<String>,
    /// Match against the full path instead of the filename alone.
    pub match_full_path: bool,
    /// Invoked exactly once, on the engine thread, with the results.
    pub respond: Box<dyn FnOnce(&SearchResults) + Send>,
}

/// One framed unit of work for the engine's processing loop.
pub enum Message {
    /// Sorted batch of new records to merge into the index.
    Add(RecordArray),
    /// Records to remove, matched by full name (dateless encoding).
    Remove(RecordArray),
    /// Updated records, parked in the pending buffer until a search
    /// reconciles them.
    Update(RecordArray),
    /// Rewrite a directory prefix across the index.
    DirectoryRename {
        /// Old prefix, trailing separator included.
        from: String,
        /// New prefix, trailing separator included.
        to: String,
    },
    /// A search request.
    Query(SearchQuery),
    /// Directories seen by a scan worker, for the identity set.
    Directories(Vec<String>),
    /// A scan worker finished its directory.
    ScanDone,
}

impl Message {
    /// Short name of the message kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::Update(_) => "update",
            Self::DirectoryRename { .. } => "directory-rename",
            Self::Query(_) => "query",
            Self::Directories(_) => "directories",
            Self::ScanDone => "scan-done",
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message").field("kind", &self.kind()).finish()
    }
}

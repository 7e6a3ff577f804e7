//! Directory identity tracking.
//!
//! The folder monitor needs to know which names correspond to
//! directories it has seen alive, both to tell directory events apart
//! from file events and to stitch two-phase rename notifications back
//! together. One set exists per monitor, fed by the engine from the
//! `Directories` messages scan workers emit.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;

/// Set of known directories keyed by normalized path (trailing
/// separator included) with a live flag.
#[derive(Debug, Default)]
pub struct DirectorySet {
    dirs: Mutex<HashMap<String, bool>>,
}

impl DirectorySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a directory as currently live.
    pub fn mark_live(&self, dir: &str) {
        self.dirs.lock().insert(normalize(dir), true);
    }

    /// Mark a directory as gone. Unknown directories are recorded gone.
    pub fn mark_gone(&self, dir: &str) {
        self.dirs.lock().insert(normalize(dir), false);
    }

    /// Whether the directory is known and live.
    #[must_use]
    pub fn is_live(&self, dir: &str) -> bool {
        self.dirs
            .lock()
            .get(&normalize(dir))
            .copied()
            .unwrap_or(false)
    }

    /// Re-key every live directory under `from` to live under `to`.
    /// The old keys are marked gone.
    pub fn rename_prefix(&self, from: &str, to: &str) {
        let from = normalize(from);
        let to = normalize(to);

        let mut dirs = self.dirs.lock();
        let moved: Vec<String> = dirs
            .iter()
            .filter(|&(key, &live)| live && key.starts_with(&from))
            .map(|(key, _)| key.clone())
            .collect();

        for old in moved {
            let renamed = format!("{to}{}", &old[from.len()..]);
            dirs.insert(old, false);
            dirs.insert(renamed, true);
        }
    }

    /// Number of live directories.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.dirs.lock().values().filter(|&&live| live).count()
    }
}

/// Key form of a directory path: trailing separator guaranteed.
#[must_use]
pub fn normalize(dir: &str) -> String {
    if dir.ends_with(std::path::MAIN_SEPARATOR) || dir.ends_with('/') {
        dir.to_string()
    } else {
        format!("{dir}{}", std::path::MAIN_SEPARATOR)
    }
}

/// Key form of a directory [`Path`].
#[must_use]
pub fn path_key(path: &Path) -> String {
    normalize(&path.to_string_lossy())
}

//! Directory scan workers building the initial index.
//!
//! One worker runs per registered directory. It walks the tree depth
//! first, applies the directory's extension filter, accumulates a sorted
//! record batch and the list of directories it saw, then delivers
//! everything to the repository mailbox in one append followed by a
//! completion marker.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use walkdir::WalkDir;

use crate::config::DirectoryEntry;
use crate::engine::{Mailbox, Message};
use crate::error::ScanError;
use crate::store::{date, ops, RecordArray};

use super::dirset::path_key;
use super::filter::ExtensionFilter;

/// Resolved work for one scan worker.
#[derive(Debug, Clone)]
pub struct ScanJob {
    /// Root directory to walk.
    pub root: PathBuf,
    /// Extension filter for files under the root.
    pub filter: ExtensionFilter,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl ScanJob {
    /// Resolve a configured directory entry into a job.
    #[must_use]
    pub fn from_entry(entry: &DirectoryEntry) -> Self {
        Self {
            root: entry.path.clone(),
            filter: ExtensionFilter::new(
                entry.include_filter.as_deref(),
                entry.exclude_filter.as_deref(),
            ),
            recursive: entry.recursive,
        }
    }
}

/// Walk the job's directory and deliver the batch to the mailbox.
///
/// Subdirectories whose name starts with `.` or `$` are skipped.
/// Unreadable subtrees are abandoned with a warning; records found in
/// sibling subtrees are still delivered. When the stop flag is observed
/// the worker returns without delivering anything further.
pub fn scan_directory(job: &ScanJob, mailbox: &Mailbox, stop: &AtomicBool) {
    tracing::info!(path = %job.root.display(), recursive = job.recursive, "starting directory scan");

    let mut records = RecordArray::new();
    let mut directories: Vec<String> = Vec::new();
    let mut files: u64 = 0;
    let mut skipped: u64 = 0;
    let mut errors: u64 = 0;

    let max_depth = if job.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(&job.root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

    for entry in walker {
        if stop.load(Ordering::Relaxed) {
            tracing::debug!(path = %job.root.display(), "scan cancelled");
            return;
        }

        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    if job.recursive || entry.depth() == 0 {
                        directories.push(path_key(entry.path()));
                    }
                    continue;
                }

                let name = entry.file_name().to_string_lossy();
                if !job.filter.matches(&name) {
                    skipped += 1;
                    continue;
                }

                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                let stamp = modified.map_or_else(date::now_string, date::format_timestamp);
                let full = entry.path().to_string_lossy();
                match ops::insert(&mut records, &full, &stamp) {
                    Ok(()) => files += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unencodable file");
                        errors += 1;
                    }
                }
            }
            Err(e) => {
                let err = ScanError::ListFailed {
                    path: e
                        .path()
                        .map_or_else(|| job.root.display().to_string(), |p| p.display().to_string()),
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "abandoning unreadable subtree");
                errors += 1;
            }
        }
    }

    tracing::info!(
        path = %job.root.display(),
        files,
        directories = directories.len(),
        skipped,
        errors,
        "directory scan complete"
    );

    mailbox.push_batch(vec![
        Message::Add(records),
        Message::Directories(directories),
        Message::ScanDone,
    ]);
}

fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with(['.', '$'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run_scan(job: &ScanJob) -> Vec<Message> {
        let mailbox = Mailbox::new();
        let stop = AtomicBool::new(false);
        scan_directory(job, &mailbox, &stop);
        mailbox.drain().unwrap()
    }

    fn added(messages: &[Message]) -> &RecordArray {
        match &messages[0] {
            Message::Add(records) => records,
            other => panic!("expected add, got {}", other.kind()),
        }
    }

    #[test]
    fn scan_collects_sorted_records() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("zeta.rs"), "").unwrap();
        fs::write(tmp.path().join("alpha.rs"), "").unwrap();

        let job = ScanJob {
            root: tmp.path().to_path_buf(),
            filter: ExtensionFilter::everything(),
            recursive: false,
        };
        let messages = run_scan(&job);

        assert_eq!(messages.len(), 3);
        let records = added(&messages);
        let names: Vec<String> = records.views().map(|v| v.filename).collect();
        assert_eq!(names, vec!["alpha.rs", "zeta.rs"]);
        assert_eq!(messages[1].kind(), "directories");
        assert_eq!(messages[2].kind(), "scan-done");
    }

    #[test]
    fn non_recursive_scan_stays_shallow() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("top.rs"), "").unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("nested.rs"), "").unwrap();

        let job = ScanJob {
            root: tmp.path().to_path_buf(),
            filter: ExtensionFilter::everything(),
            recursive: false,
        };
        let messages = run_scan(&job);
        let names: Vec<String> = added(&messages).views().map(|v| v.filename).collect();
        assert_eq!(names, vec!["top.rs"]);
    }

    #[test]
    fn recursive_scan_descends_and_reports_directories() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("nested.rs"), "").unwrap();

        let job = ScanJob {
            root: tmp.path().to_path_buf(),
            filter: ExtensionFilter::everything(),
            recursive: true,
        };
        let messages = run_scan(&job);

        let names: Vec<String> = added(&messages).views().map(|v| v.filename).collect();
        assert_eq!(names, vec!["nested.rs"]);

        match &messages[1] {
            Message::Directories(dirs) => {
                assert_eq!(dirs.len(), 2);
                assert!(dirs.iter().all(|d| d.ends_with(std::path::MAIN_SEPARATOR)));
            }
            other => panic!("expected directories, got {}", other.kind()),
        }
    }

    #[test]
    fn marker_directories_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let hidden = tmp.path().join(".git");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("config.rs"), "").unwrap();
        fs::write(tmp.path().join("kept.rs"), "").unwrap();

        let job = ScanJob {
            root: tmp.path().to_path_buf(),
            filter: ExtensionFilter::everything(),
            recursive: true,
        };
        let messages = run_scan(&job);
        let names: Vec<String> = added(&messages).views().map(|v| v.filename).collect();
        assert_eq!(names, vec!["kept.rs"]);
    }

    #[test]
    fn include_filter_applies() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("main.rs"), "").unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();

        let entry = DirectoryEntry {
            include_filter: Some("rs".to_string()),
            recursive: true,
            ..DirectoryEntry::new(tmp.path())
        };
        let messages = run_scan(&ScanJob::from_entry(&entry));
        let names: Vec<String> = added(&messages).views().map(|v| v.filename).collect();
        assert_eq!(names, vec!["main.rs"]);
    }

    #[test]
    fn cancelled_scan_delivers_nothing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.rs"), "").unwrap();

        let mailbox = Mailbox::new();
        let stop = AtomicBool::new(true);
        let job = ScanJob {
            root: tmp.path().to_path_buf(),
            filter: ExtensionFilter::everything(),
            recursive: true,
        };
        scan_directory(&job, &mailbox, &stop);

        mailbox.close();
        assert!(mailbox.drain().is_none());
    }
}

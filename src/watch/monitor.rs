//! Live folder monitoring.
//!
//! One thread multiplexes the OS change notifications for every
//! monitored directory through a single completion queue. Raw events are
//! classified against the directory identity set, two-phase rename
//! notifications (old-name followed by new-name) are stitched into one
//! directory-rename message, and everything produced by one wake-up is
//! delivered to the repository mailbox as a single batch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::config::DirectoryEntry;
use crate::engine::{Mailbox, Message};
use crate::error::MonitorError;
use crate::store::{date, ops, RecordArray};

use super::dirset::{path_key, DirectorySet};
use super::filter::ExtensionFilter;

#[derive(Debug, Clone)]
struct WatchedDirectory {
    root: PathBuf,
    filter: ExtensionFilter,
    recursive: bool,
}

enum Wake {
    Event(notify::Event),
    Stop,
}

/// Watches monitored directories and feeds change messages to the
/// repository mailbox. Constructed stopped; [`start`](Self::start) is
/// called by the engine once every initial scan has completed, so live
/// events never race the initial population.
pub struct FolderMonitor {
    mailbox: Arc<Mailbox>,
    dirset: Arc<DirectorySet>,
    directories: Mutex<Vec<WatchedDirectory>>,
    wake_tx: Mutex<Option<Sender<Wake>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl FolderMonitor {
    #[must_use]
    pub fn new(mailbox: Arc<Mailbox>, dirset: Arc<DirectorySet>) -> Self {
        Self {
            mailbox,
            dirset,
            directories: Mutex::new(Vec::new()),
            wake_tx: Mutex::new(None),
            thread: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Register a directory for monitoring. Takes effect at
    /// [`start`](Self::start); registrations after that are ignored.
    pub fn add_directory(&self, entry: &DirectoryEntry) {
        self.directories.lock().push(WatchedDirectory {
            root: entry.path.clone(),
            filter: ExtensionFilter::new(
                entry.include_filter.as_deref(),
                entry.exclude_filter.as_deref(),
            ),
            recursive: entry.recursive,
        });
    }

    /// Whether any directory has been registered.
    #[must_use]
    pub fn has_directories(&self) -> bool {
        !self.directories.lock().is_empty()
    }

    /// Attach the OS watches and spawn the monitoring loop. Idempotent.
    /// A directory the OS refuses to watch is logged and left unwatched;
    /// the index keeps serving whatever the scans produced.
    pub fn start(&self) {
        let mut thread = self.thread.lock();
        if thread.is_some() || self.stopped.load(Ordering::Acquire) {
            return;
        }

        let directories = self.directories.lock().clone();
        let (wake_tx, wake_rx) = unbounded();

        let event_tx = wake_tx.clone();
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    let _ = event_tx.send(Wake::Event(event));
                }
                Err(e) => tracing::warn!(error = %e, "change notification error"),
            }
        });
        let mut watcher = match watcher {
            Ok(w) => w,
            Err(e) => {
                let err = MonitorError::Init(e.to_string());
                tracing::warn!(error = %err, "folder monitoring disabled");
                return;
            }
        };

        for dir in &directories {
            let mode = if dir.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            match watcher.watch(&dir.root, mode) {
                Ok(()) => tracing::info!(path = %dir.root.display(), "watching directory"),
                Err(e) => {
                    let err = MonitorError::WatchFailed {
                        path: dir.root.display().to_string(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %err, "directory will not be watched");
                }
            }
        }

        *self.wake_tx.lock() = Some(wake_tx);

        let mailbox = Arc::clone(&self.mailbox);
        let dirset = Arc::clone(&self.dirset);
        *thread = Some(std::thread::spawn(move || {
            // keep the subscriptions alive for the loop's lifetime
            let _watcher = watcher;
            monitor_loop(&wake_rx, directories, &mailbox, &dirset);
        }));
    }

    /// Ask the loop to exit and wait for it. Safe to call when never
    /// started; a later [`start`](Self::start) is a no-op.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        let handle = self.thread.lock().take();
        if let Some(tx) = self.wake_tx.lock().take() {
            let _ = tx.send(Wake::Stop);
        }
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn monitor_loop(
    wake_rx: &Receiver<Wake>,
    directories: Vec<WatchedDirectory>,
    mailbox: &Mailbox,
    dirset: &DirectorySet,
) {
    tracing::debug!("folder monitor started");
    let mut translator = ChangeTranslator::new(directories, dirset);

    while let Ok(wake) = wake_rx.recv() {
        match wake {
            Wake::Stop => break,
            Wake::Event(event) => {
                let mut batch = Vec::new();
                translator.translate(&event, &mut batch);
                if !batch.is_empty() {
                    mailbox.push_batch(batch);
                }
            }
        }
    }
    tracing::debug!("folder monitor exiting");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Added,
    Removed,
    Modified,
    RenamedFrom,
    RenamedTo,
}

fn classify(kind: &EventKind) -> Option<Action> {
    match kind {
        EventKind::Create(_) => Some(Action::Added),
        EventKind::Remove(_) => Some(Action::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Action::RenamedFrom),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Action::RenamedTo),
        EventKind::Modify(ModifyKind::Name(_)) => None,
        EventKind::Modify(_) => Some(Action::Modified),
        _ => None,
    }
}

/// Turns raw change events into repository messages, tracking directory
/// identity and pending renames along the way.
struct ChangeTranslator<'a> {
    directories: Vec<WatchedDirectory>,
    dirset: &'a DirectorySet,
    rename_cache: Vec<PathBuf>,
}

impl<'a> ChangeTranslator<'a> {
    fn new(directories: Vec<WatchedDirectory>, dirset: &'a DirectorySet) -> Self {
        Self {
            directories,
            dirset,
            rename_cache: Vec::new(),
        }
    }

    fn translate(&mut self, event: &notify::Event, out: &mut Vec<Message>) {
        // a paired rename arrives as one event carrying both paths
        if event.kind == EventKind::Modify(ModifyKind::Name(RenameMode::Both)) {
            if event.paths.len() == 2 {
                self.apply(Action::RenamedFrom, &event.paths[0], out);
                self.apply(Action::RenamedTo, &event.paths[1], out);
            }
            return;
        }

        let Some(action) = classify(&event.kind) else {
            return;
        };
        for path in &event.paths {
            self.apply(action, path, out);
        }
    }

    fn apply(&mut self, action: Action, path: &Path, out: &mut Vec<Message>) {
        let removed = matches!(action, Action::Removed | Action::RenamedFrom);
        let added = matches!(action, Action::Added | Action::RenamedTo);

        if (removed || action == Action::Modified) && path.extension().is_none() {
            let key = path_key(path);
            if self.dirset.is_live(&key) {
                if removed {
                    self.dirset.mark_gone(&key);
                    if action == Action::RenamedFrom {
                        self.rename_cache.push(path.to_path_buf());
                    }
                }
                tracing::debug!(path = %path.display(), ?action, "directory change");
                return;
            }
        } else if added && path.is_dir() {
            let to_key = path_key(path);
            if action == Action::RenamedTo {
                if let Some(at) = self
                    .rename_cache
                    .iter()
                    .position(|old| same_parent(old, path))
                {
                    let from = self.rename_cache.remove(at);
                    let from_key = path_key(&from);
                    tracing::info!(from = %from.display(), to = %path.display(), "directory renamed");
                    self.dirset.rename_prefix(&from_key, &to_key);
                    out.push(Message::DirectoryRename {
                        from: from_key,
                        to: to_key.clone(),
                    });
                }
            }
            self.dirset.mark_live(&to_key);
            return;
        }

        // anything else that is a directory on disk carries no record
        if path.is_dir() {
            tracing::debug!(path = %path.display(), ?action, "directory event dismissed");
            return;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };
        if let Some(filter) = self.filter_for(path) {
            if !filter.matches(&name) {
                tracing::debug!(path = %path.display(), "filter mismatch, dismissed");
                return;
            }
        }

        let full = path.to_string_lossy();
        let message = match action {
            Action::Added | Action::RenamedTo => {
                let created = fs::metadata(path)
                    .ok()
                    .and_then(|m| m.created().ok().or_else(|| m.modified().ok()));
                let stamp = created.map_or_else(date::now_string, date::format_timestamp);
                single_record(&full, &stamp).map(Message::Add)
            }
            Action::Modified => {
                let modified = fs::metadata(path).ok().and_then(|m| m.modified().ok());
                let stamp = modified.map_or_else(date::now_string, date::format_timestamp);
                single_record(&full, &stamp).map(Message::Update)
            }
            Action::Removed | Action::RenamedFrom => {
                single_record(&full, "").map(Message::Remove)
            }
        };

        if let Some(message) = message {
            tracing::debug!(path = %path.display(), kind = message.kind(), "file change");
            out.push(message);
        }
    }

    fn filter_for(&self, path: &Path) -> Option<&ExtensionFilter> {
        self.directories
            .iter()
            .filter(|d| path.starts_with(&d.root))
            .max_by_key(|d| d.root.as_os_str().len())
            .map(|d| &d.filter)
    }
}

fn single_record(full: &str, stamp: &str) -> Option<RecordArray> {
    let mut records = RecordArray::new();
    match ops::insert(&mut records, full, stamp) {
        Ok(()) => Some(records),
        Err(e) => {
            tracing::warn!(error = %e, "dropping unencodable change record");
            None
        }
    }
}

fn same_parent(a: &Path, b: &Path) -> bool {
    match (a.parent(), b.parent()) {
        (Some(x), Some(y)) => x
            .to_string_lossy()
            .eq_ignore_ascii_case(&y.to_string_lossy()),
        _ => false,
    }
}

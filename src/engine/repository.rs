//! The single-writer repository engine.
//!
//! Each repository owns one processing thread; it alone mutates the
//! record array and the pending-update buffer, and it answers search
//! requests inline. Producers only ever append framed messages to the
//! mailbox, so the record store itself needs no locking.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::DirectoryEntry;
use crate::store::{ops, search, RecordArray, SearchResults};
use crate::watch::{scan_directory, DirectorySet, FolderMonitor, ScanJob};

use super::mailbox::Mailbox;
use super::message::{Message, SearchQuery};
use super::query::parse_query;

/// A live, queryable file index for one solution.
///
/// The repository starts its processing thread on construction and keeps
/// it until [`stop`](Self::stop) (or drop). Directory scans and folder
/// monitoring feed the same mailbox the search API uses, so every
/// mutation and query is serialized in append order.
pub struct FileRepository {
    mailbox: Arc<Mailbox>,
    stop_flag: Arc<AtomicBool>,
    outstanding_scans: Arc<AtomicUsize>,
    monitor: Arc<FolderMonitor>,
    engine: Mutex<Option<JoinHandle<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FileRepository {
    /// Create an empty repository and start its processing thread.
    #[must_use]
    pub fn new() -> Self {
        let mailbox = Arc::new(Mailbox::new());
        let dirset = Arc::new(DirectorySet::new());
        let monitor = Arc::new(FolderMonitor::new(
            Arc::clone(&mailbox),
            Arc::clone(&dirset),
        ));
        let outstanding_scans = Arc::new(AtomicUsize::new(0));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let engine = EngineLoop {
            mailbox: Arc::clone(&mailbox),
            dirset: Arc::clone(&dirset),
            monitor: Arc::clone(&monitor),
            outstanding_scans: Arc::clone(&outstanding_scans),
            stop_flag: Arc::clone(&stop_flag),
            records: RecordArray::new(),
            pending: RecordArray::new(),
        };
        let handle = thread::spawn(move || engine.run());

        Self {
            mailbox,
            stop_flag,
            outstanding_scans,
            monitor,
            engine: Mutex::new(Some(handle)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Register a solution's directories: spawn one scan worker per
    /// entry and queue monitored entries for the folder monitor, which
    /// starts only once every outstanding scan has completed.
    pub fn add_solution(&self, directories: &[DirectoryEntry]) {
        for entry in directories {
            if entry.monitored {
                self.monitor.add_directory(entry);
            }

            self.outstanding_scans.fetch_add(1, Ordering::AcqRel);
            let job = ScanJob::from_entry(entry);
            let mailbox = Arc::clone(&self.mailbox);
            let stop = Arc::clone(&self.stop_flag);
            let handle = thread::spawn(move || scan_directory(&job, &mailbox, &stop));
            self.workers.lock().push(handle);
        }
    }

    /// Queue a search. The callback fires exactly once, on the
    /// processing thread, with a result buffer valid for the duration of
    /// the call.
    pub fn search(&self, query: &str, respond: impl FnOnce(&SearchResults) + Send + 'static) {
        let parsed = parse_query(query);
        self.mailbox.push(Message::Query(SearchQuery {
            include: parsed.include,
            exclude: parsed.exclude,
            match_full_path: parsed.match_full_path,
            respond: Box::new(respond),
        }));
    }

    /// Number of scan workers whose results are still outstanding.
    /// Zero means the initial population is complete.
    #[must_use]
    pub fn pending_scans(&self) -> usize {
        self.outstanding_scans.load(Ordering::Acquire)
    }

    /// Stop monitoring, drain the mailbox and join every thread. No
    /// operation is valid afterwards; cancellation is cooperative, so a
    /// worker mid-listing delays the return rather than being killed.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
        self.monitor.stop();
        self.mailbox.close();

        if let Some(handle) = self.engine.lock().take() {
            let _ = handle.join();
        }
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

impl Default for FileRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FileRepository {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the processing thread.
struct EngineLoop {
    mailbox: Arc<Mailbox>,
    dirset: Arc<DirectorySet>,
    monitor: Arc<FolderMonitor>,
    outstanding_scans: Arc<AtomicUsize>,
    stop_flag: Arc<AtomicBool>,
    records: RecordArray,
    pending: RecordArray,
}

impl EngineLoop {
    fn run(mut self) {
        tracing::debug!("repository engine started");
        while let Some(batch) = self.mailbox.drain() {
            for message in batch {
                self.dispatch(message);
            }
        }
        tracing::debug!(
            records = self.records.count(),
            "repository engine exiting"
        );
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::Add(batch) => {
                ops::merge(&mut self.records, &batch);
                tracing::debug!(
                    added = batch.count(),
                    total = self.records.count(),
                    "merged record batch"
                );
            }
            Message::Remove(removals) => {
                ops::exclude(&mut self.records, &removals);
                ops::exclude(&mut self.pending, &removals);
            }
            Message::Update(updates) => {
                ops::replace(&mut self.pending, &updates);
            }
            Message::DirectoryRename { from, to } => {
                if let Err(e) = ops::rename_prefix(&mut self.records, &from, &to) {
                    tracing::warn!(error = %e, from = %from, to = %to, "directory rename incomplete");
                }
            }
            Message::Query(query) => {
                let results = search::search(
                    &mut self.records,
                    &mut self.pending,
                    &query.include,
                    &query.exclude,
                    query.match_full_path,
                );
                tracing::debug!(matches = results.count(), "search served");
                (query.respond)(&results);
            }
            Message::Directories(dirs) => {
                for dir in &dirs {
                    self.dirset.mark_live(dir);
                }
            }
            Message::ScanDone => {
                let left = self.outstanding_scans.fetch_sub(1, Ordering::AcqRel) - 1;
                if left == 0
                    && !self.stop_flag.load(Ordering::Acquire)
                    && self.monitor.has_directories()
                {
                    tracing::info!("initial scans complete, starting folder monitor");
                    self.monitor.start();
                }
            }
        }
    }
}

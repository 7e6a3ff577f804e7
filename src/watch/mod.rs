//! Directory scanning and live folder monitoring.
//!
//! This module provides:
//! - Scan workers that build the initial index for registered directories
//! - Extension include/exclude filtering
//! - The directory identity set backing change-event classification
//! - The folder monitor bridging OS change notifications to the engine

mod dirset;
mod filter;
mod monitor;
mod scanner;

pub use dirset::DirectorySet;
pub use filter::ExtensionFilter;
pub use monitor::FolderMonitor;
pub use scanner::{scan_directory, ScanJob};

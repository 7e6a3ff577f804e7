//! Solution configuration.
//!
//! A solution is the set of directories indexed together, each with its
//! own extension filters and monitoring flags. Solutions are handed over
//! by the host as JSON; [`SolutionConfig::load`] reproduces that boundary.

mod settings;

pub use settings::{DirectoryEntry, SolutionConfig};

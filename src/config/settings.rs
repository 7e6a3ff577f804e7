//! Solution settings and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One registered directory of a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Root path to index.
    pub path: PathBuf,

    /// Dot-separated extension list to include (e.g. `"rs.toml.md"`).
    /// Mutually exclusive with `exclude_filter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_filter: Option<String>,

    /// Dot-separated extension list to exclude.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_filter: Option<String>,

    /// Descend into subdirectories.
    #[serde(default)]
    pub recursive: bool,

    /// Keep the index synchronized with live file-system changes.
    #[serde(default)]
    pub monitored: bool,
}

impl DirectoryEntry {
    /// An entry with no filters, non-recursive and unmonitored.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            include_filter: None,
            exclude_filter: None,
            recursive: false,
            monitored: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::config("directory entry has an empty path"));
        }
        if self.include_filter.is_some() && self.exclude_filter.is_some() {
            return Err(Error::config(format!(
                "directory '{}' sets both include and exclude filters",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// A solution: the set of directories indexed together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionConfig {
    /// The registered directories.
    pub directories: Vec<DirectoryEntry>,
}

impl SolutionConfig {
    /// Load and validate a solution from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is not valid JSON,
    /// or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("invalid solution file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every directory entry.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty path or conflicting filters.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.directories {
            entry.validate()?;
        }
        Ok(())
    }
}

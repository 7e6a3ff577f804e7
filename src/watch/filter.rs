//! Extension include/exclude filtering.
//!
//! Filters are configured per registered directory as dot-separated
//! extension lists, e.g. `"cpp.h.inl"`. A directory carries either an
//! include list, an exclude list, or neither (everything matches).

/// Per-directory extension filter.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    mode: Mode,
}

#[derive(Debug, Clone)]
enum Mode {
    Everything,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl ExtensionFilter {
    /// Build a filter from the configured lists. The include list wins
    /// when both are present.
    #[must_use]
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        let mode = match (include, exclude) {
            (Some(list), _) if !list.is_empty() => Mode::Include(split_list(list)),
            (_, Some(list)) if !list.is_empty() => Mode::Exclude(split_list(list)),
            _ => Mode::Everything,
        };
        Self { mode }
    }

    /// A filter that matches every file.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            mode: Mode::Everything,
        }
    }

    /// Whether a filename passes the filter.
    ///
    /// With a filter configured, a file without an extension never
    /// matches.
    #[must_use]
    pub fn matches(&self, filename: &str) -> bool {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty());

        match (&self.mode, extension) {
            (Mode::Everything, _) => true,
            (_, None) => false,
            (Mode::Include(list), Some(ext)) => contains(list, ext),
            (Mode::Exclude(list), Some(ext)) => !contains(list, ext),
        }
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split('.')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains(list: &[String], extension: &str) -> bool {
    let extension = extension.to_lowercase();
    list.iter().any(|t| *t == extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_matches_everything() {
        let filter = ExtensionFilter::new(None, None);
        assert!(filter.matches("main.rs"));
        assert!(filter.matches("Makefile"));
        assert!(filter.matches("archive.tar.gz"));
    }

    #[test]
    fn include_list_matches_whole_tokens() {
        let filter = ExtensionFilter::new(Some("cpp.h.inl"), None);
        assert!(filter.matches("engine.cpp"));
        assert!(filter.matches("engine.h"));
        assert!(!filter.matches("engine.hpp"));
        assert!(!filter.matches("readme.md"));
    }

    #[test]
    fn exclude_list_rejects_listed_extensions() {
        let filter = ExtensionFilter::new(None, Some("obj.pdb"));
        assert!(!filter.matches("engine.obj"));
        assert!(filter.matches("engine.cpp"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let filter = ExtensionFilter::new(Some("rs"), None);
        assert!(filter.matches("MAIN.RS"));
    }

    #[test]
    fn configured_filter_rejects_extensionless_files() {
        let include = ExtensionFilter::new(Some("rs"), None);
        assert!(!include.matches("Makefile"));

        let exclude = ExtensionFilter::new(None, Some("obj"));
        assert!(!exclude.matches("Makefile"));
    }

    #[test]
    fn multi_dot_name_uses_last_extension() {
        let filter = ExtensionFilter::new(Some("gz"), None);
        assert!(filter.matches("archive.tar.gz"));
        assert!(!filter.matches("archive.tar"));
    }
}

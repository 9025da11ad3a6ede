//! Path filtering for raw file system events.

use std::path::{Path, PathBuf};

/// Decides which changed paths are relevant to the rebuild loop.
///
/// Two filters apply, in order: paths under any ignored folder (matched on
/// full path segments directly under the root, at any nesting depth) are
/// rejected, then only files whose extension exactly matches one of the
/// included extensions are accepted.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    ignored_folders: Vec<String>,
    included_extensions: Vec<String>,
}

impl WatchFilter {
    /// Create a filter rooted at `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        included_extensions: Vec<String>,
        ignored_folders: Vec<String>,
    ) -> Self {
        Self {
            root: root.into(),
            ignored_folders,
            included_extensions,
        }
    }

    /// Whether an event for `path` should be forwarded.
    pub fn accepts(&self, path: &Path) -> bool {
        !self.in_ignored_folder(path) && self.has_watched_extension(path)
    }

    /// Segment-wise prefix match: `root/<folder>/...` is ignored for any
    /// configured folder, at any depth below it. `root/vendored/x.go` does
    /// not match an ignored folder `vendor`.
    fn in_ignored_folder(&self, path: &Path) -> bool {
        self.ignored_folders
            .iter()
            .any(|folder| path.starts_with(self.root.join(folder)))
    }

    /// Exact extension match, including the leading dot, after trimming
    /// whitespace from each configured value. Case-sensitive.
    fn has_watched_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{ext}");

        self.included_extensions
            .iter()
            .any(|configured| configured.trim() == ext)
    }
}

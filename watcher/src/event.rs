//! Change events emitted by the file watcher.

use std::path::PathBuf;

/// Kind label of the synthetic event that triggers the very first build.
///
/// The watcher never produces this itself; the manager injects it once
/// before the watch loop begins.
pub const INIT_KIND: &str = "init";

/// A single filtered file system change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path to the changed file.
    pub path: PathBuf,

    /// Opaque kind label ("create", "write", "remove", ... or "init").
    pub kind: String,
}

impl WatchEvent {
    /// The synthetic startup event for `root`.
    pub fn init(root: impl Into<PathBuf>) -> Self {
        Self {
            path: root.into(),
            kind: INIT_KIND.to_string(),
        }
    }

    /// Whether this is the synthetic startup event.
    pub fn is_init(&self) -> bool {
        self.kind == INIT_KIND
    }
}

/// Map a raw notify event kind to the label carried on [`WatchEvent`].
///
/// Returns `None` for kinds that should not trigger a rebuild (reads,
/// metadata-only changes, and kinds notify cannot classify).
pub(crate) fn kind_label(kind: notify::EventKind) -> Option<&'static str> {
    use notify::EventKind;
    use notify::event::ModifyKind;

    match kind {
        EventKind::Create(_) => Some("create"),
        EventKind::Remove(_) => Some("remove"),
        EventKind::Modify(ModifyKind::Name(_)) => Some("rename"),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some("write"),
        EventKind::Access(_) => None,
        _ => None,
    }
}

//! Event types for file change notifications.
//!
//! This module provides the raw [`FileEvent`] forwarded from the native
//! watcher and the [`DebouncedBatch`] a debounce window accumulates.
//!
//! # Event Flow
//!
//! ```text
//! File System Change
//!        │
//!        ▼
//!   notify callback (watcher thread)
//!        │
//!        ▼
//!   FileEvent created, sent via channel
//!        │
//!        ▼
//!   DebouncedBatch (deduplicated paths, quiet window)
//!        │
//!        ▼
//!   flush callback (folder index reconciliation)
//! ```

use std::collections::BTreeSet;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use notify::EventKind;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use serde::{Deserialize, Serialize};

/// The kind of change a native event reported.
///
/// Only informational: reconciliation always re-checks the disk, because
/// backends disagree on how they report saves and renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    /// A file or directory was created.
    Created,
    /// Content or metadata changed, or a writer closed the file.
    Modified,
    /// A file or directory was removed.
    Removed,
    /// A path was renamed (either side of the rename).
    Renamed,
    /// Anything else, including rescan requests.
    Other,
}

impl From<&EventKind> for FileEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Renamed,
            EventKind::Modify(_) | EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                Self::Modified
            }
            EventKind::Remove(_) => Self::Removed,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => Self::Other,
        }
    }
}

/// A file change event with a UTF-8 path guarantee.
///
/// # Examples
///
/// ```
/// use resx_watcher::{FileEvent, FileEventKind};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/defs/Main.dialog"), FileEventKind::Modified);
/// assert_eq!(event.file_name(), Some("Main.dialog"));
/// assert_eq!(event.extension(), Some("dialog"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the file or directory that changed.
    pub path: Utf8PathBuf,

    /// What the backend said happened.
    pub kind: FileEventKind,

    /// When the event was received.
    ///
    /// Uses [`Instant`] for monotonic timing, suitable for measuring
    /// elapsed time but not for wall-clock display.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates a new file event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: FileEventKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Creates a new file event with a specific timestamp.
    #[inline]
    #[must_use]
    pub const fn with_timestamp(
        path: Utf8PathBuf,
        kind: FileEventKind,
        timestamp: Instant,
    ) -> Self {
        Self {
            path,
            kind,
            timestamp,
        }
    }

    /// Returns the file extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// The paths touched during one debounce window.
///
/// Duplicate events for a path collapse into one entry, so a burst of writes
/// to one file yields a single path. Paths are kept sorted.
///
/// # Examples
///
/// ```
/// use resx_watcher::{DebouncedBatch, FileEvent, FileEventKind};
/// use camino::Utf8PathBuf;
///
/// let mut batch = DebouncedBatch::new();
/// for _ in 0..3 {
///     batch.push(FileEvent::new(Utf8PathBuf::from("/defs/a.dialog"), FileEventKind::Modified));
/// }
/// batch.push(FileEvent::new(Utf8PathBuf::from("/defs/b.dialog"), FileEventKind::Created));
///
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch.raw_events(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DebouncedBatch {
    paths: BTreeSet<Utf8PathBuf>,
    stats: EventBatchStats,
    first_at: Option<Instant>,
}

impl DebouncedBatch {
    /// Creates a new empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one raw event.
    pub fn push(&mut self, event: FileEvent) {
        if self.first_at.is_none() {
            self.first_at = Some(event.timestamp);
        }
        self.stats.record(event.kind);
        self.paths.insert(event.path);
        self.stats.unique_paths = self.paths.len();
    }

    /// Returns the number of distinct paths.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if no event was recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the number of raw events folded into this batch.
    #[inline]
    #[must_use]
    pub const fn raw_events(&self) -> usize {
        self.stats.total_events
    }

    /// Returns when the first event of the window arrived.
    #[inline]
    #[must_use]
    pub const fn first_at(&self) -> Option<Instant> {
        self.first_at
    }

    /// Returns `true` if `path` was touched in this window.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.paths.contains(path)
    }

    /// Returns the touched paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.paths.iter().map(Utf8PathBuf::as_path)
    }

    /// Returns summary statistics for logging.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &EventBatchStats {
        &self.stats
    }

    /// Consumes the batch, returning the touched paths in sorted order.
    #[must_use]
    pub fn into_paths(self) -> Vec<Utf8PathBuf> {
        self.paths.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a DebouncedBatch {
    type Item = &'a Utf8PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, Utf8PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl FromIterator<FileEvent> for DebouncedBatch {
    fn from_iter<T: IntoIterator<Item = FileEvent>>(iter: T) -> Self {
        let mut batch = Self::new();
        for event in iter {
            batch.push(event);
        }
        batch
    }
}

/// Summary statistics for a batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatchStats {
    /// Total number of raw events in the batch.
    pub total_events: usize,

    /// Number of distinct paths affected.
    pub unique_paths: usize,

    /// Create events.
    pub created: usize,

    /// Modify and close-after-write events.
    pub modified: usize,

    /// Remove events.
    pub removed: usize,

    /// Rename events.
    pub renamed: usize,
}

impl EventBatchStats {
    fn record(&mut self, kind: FileEventKind) {
        self.total_events += 1;
        match kind {
            FileEventKind::Created => self.created += 1,
            FileEventKind::Modified => self.modified += 1,
            FileEventKind::Removed => self.removed += 1,
            FileEventKind::Renamed => self.renamed += 1,
            FileEventKind::Other => {}
        }
    }
}

//! Path filtering shared by directory scans and watch events.
//!
//! Filters are evaluated against paths **relative to a provider root**, so
//! the same predicate decides whether a file is indexed during the initial
//! scan and whether a later watch event about it is reconciled.
//!
//! # Examples
//!
//! ```
//! use resx_core::{CompositeFilter, EditorTempFilter, ExtensionFilter, FileFilter};
//! use camino::Utf8Path;
//!
//! let filter = CompositeFilter::new()
//!     .and(EditorTempFilter)
//!     .and(ExtensionFilter::new(&["dialog", "schema"]));
//!
//! assert!(filter.should_process(Utf8Path::new("bots/Main.dialog")));
//! assert!(filter.should_process(Utf8Path::new("app.SCHEMA")));
//! assert!(!filter.should_process(Utf8Path::new("bots/.Main.dialog.swp")));
//! assert!(!filter.should_process(Utf8Path::new("README.md")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;

use crate::types::id::normalize_category;

/// A predicate deciding which files a provider reports.
///
/// # Thread Safety
///
/// Filters are shared between the query side and the watcher thread, so
/// they must be [`Send`] + [`Sync`] + `'static`.
///
/// # Examples
///
/// ```
/// use resx_core::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoDrafts;
///
/// impl FileFilter for NoDrafts {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         !path.as_str().contains("drafts")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at `path` should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Accepts files whose extension is in an allow-list (ASCII case-insensitive).
///
/// Extensions may be given with or without the leading dot.
///
/// ```
/// use resx_core::{ExtensionFilter, FileFilter};
/// use camino::Utf8Path;
///
/// let filter = ExtensionFilter::new(&[".dialog", "lg"]);
/// assert!(filter.should_process(Utf8Path::new("Main.Dialog")));
/// assert!(filter.should_process(Utf8Path::new("sub/common.lg")));
/// assert!(!filter.should_process(Utf8Path::new("notes.txt")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    extensions: SmallVec<[String; 8]>,
}

impl ExtensionFilter {
    /// Creates a new extension filter.
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self::from_owned(extensions.iter().map(|s| (*s).to_owned()))
    }

    /// Creates an extension filter from owned strings.
    #[must_use]
    pub fn from_owned(extensions: impl IntoIterator<Item = String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_category(&ext).to_owned())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Returns `true` if no extensions were configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl FileFilter for ExtensionFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Rejects the scratch files editors write next to the real file.
///
/// Covers vim swap files and its `4913` write probe, emacs lock and backup
/// files, and `*.tmp` staging files used for atomic saves.
///
/// ```
/// use resx_core::{EditorTempFilter, FileFilter};
/// use camino::Utf8Path;
///
/// assert!(EditorTempFilter.should_process(Utf8Path::new("Main.dialog")));
/// assert!(!EditorTempFilter.should_process(Utf8Path::new(".Main.dialog.swp")));
/// assert!(!EditorTempFilter.should_process(Utf8Path::new("Main.dialog~")));
/// assert!(!EditorTempFilter.should_process(Utf8Path::new(".#Main.dialog")));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorTempFilter;

/// Extensions of editor scratch files.
const TEMP_EXTENSIONS: &[&str] = &["swp", "swo", "swx", "tmp"];

impl FileFilter for EditorTempFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        let Some(name) = path.file_name() else {
            return true;
        };

        if name == "4913" || name.ends_with('~') || name.starts_with(".#") {
            return false;
        }

        !path
            .extension()
            .is_some_and(|ext| TEMP_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(ext)))
    }
}

/// Rejects paths that pass through any of the named directories.
///
/// ```
/// use resx_core::{FileFilter, SkipDirsFilter};
/// use camino::Utf8Path;
///
/// let filter = SkipDirsFilter::new(&[".git", "bin"]);
/// assert!(!filter.should_process(Utf8Path::new("bin/Debug/Main.dialog")));
/// assert!(filter.should_process(Utf8Path::new("dialogs/Main.dialog")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkipDirsFilter {
    dirs: Vec<String>,
}

impl SkipDirsFilter {
    /// Creates a filter skipping the given directory names (not full paths).
    #[must_use]
    pub fn new(dirs: &[&str]) -> Self {
        Self::from_owned(dirs.iter().map(|d| (*d).to_owned()))
    }

    /// Creates a filter from owned directory names.
    #[must_use]
    pub fn from_owned(dirs: impl IntoIterator<Item = String>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }

    /// Returns `true` if `name` is one of the skipped directory names.
    #[must_use]
    pub fn skips_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|d| d == name)
    }
}

impl FileFilter for SkipDirsFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        // The final component is the file itself.
        let Some(parent) = path.parent() else {
            return true;
        };
        !parent
            .components()
            .any(|component| self.skips_dir(component.as_str()))
    }
}

/// A composite filter that combines multiple filters with AND logic.
///
/// An empty composite accepts everything.
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates a new empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter to the composite.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of combined filters.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filters were added.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|f| f.should_process(path))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

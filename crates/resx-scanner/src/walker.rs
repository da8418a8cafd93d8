//! Directory traversal for folder providers.
//!
//! This module provides [`FileWalker`], which uses the `ignore` crate to walk
//! a provider root in a deterministic order.
//!
//! # Features
//!
//! - Sorted traversal, so "last scanned" is well defined for duplicate names
//! - Recursive or shallow (root files only) enumeration
//! - Prunes configured directories (`.git` by default) without descending
//! - Applies a [`FileFilter`] to root-relative paths
//! - Converts paths to UTF-8 [`Utf8PathBuf`](camino::Utf8PathBuf)
//!
//! Unlike a source-tree scan, `.gitignore` rules and hidden files are not
//! special: every file under a resource folder is a candidate resource.
//!
//! # Examples
//!
//! ```no_run
//! use resx_scanner::FileWalker;
//! use camino::Utf8Path;
//!
//! # fn example() -> Result<(), resx_scanner::ScanError> {
//! let walker = FileWalker::new(Utf8Path::new("./defs"))?.with_recursive(false);
//! for path in walker.collect_paths()? {
//!     println!("Found: {path}");
//! }
//! # Ok(())
//! # }
//! ```

use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use resx_core::{AcceptAllFilter, FileFilter, ScanConfig};
use tracing::{trace, warn};

use crate::error::ScanError;

/// A file walker that enumerates the files of a provider root.
///
/// The root is canonicalized on construction so that paths reported by the
/// operating system's watch backend can be matched against it.
#[derive(Clone)]
pub struct FileWalker {
    /// The canonical root directory.
    root: Utf8PathBuf,
    /// Whether to descend into subdirectories.
    recursive: bool,
    /// Whether to follow symbolic links.
    follow_links: bool,
    /// Directory names never descended into.
    skip_dirs: Vec<String>,
    /// Predicate over root-relative file paths.
    filter: Arc<dyn FileFilter>,
}

impl FileWalker {
    /// Creates a new recursive walker for the given root directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::RootNotFound`] if the root doesn't exist,
    /// [`ScanError::NotADirectory`] if it isn't a directory, and
    /// [`ScanError::Io`] if it cannot be inspected or canonicalized.
    pub fn new(root: &Utf8Path) -> Result<Self, ScanError> {
        let metadata = match std::fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ScanError::RootNotFound(root.to_owned()));
            }
            Err(e) => return Err(ScanError::io(root, e)),
        };
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(root.to_owned()));
        }

        let root = root
            .canonicalize_utf8()
            .map_err(|e| ScanError::io(root, e))?;

        Ok(Self {
            root,
            recursive: true,
            follow_links: false,
            skip_dirs: Vec::new(),
            filter: Arc::new(AcceptAllFilter),
        })
    }

    /// Creates a walker configured from a [`ScanConfig`].
    ///
    /// # Errors
    ///
    /// Same as [`FileWalker::new`].
    pub fn from_config(
        root: &Utf8Path,
        recursive: bool,
        config: &ScanConfig,
    ) -> Result<Self, ScanError> {
        Ok(Self::new(root)?
            .with_recursive(recursive)
            .with_follow_links(config.follow_links)
            .with_skip_dirs(config.skip_dirs.iter().map(String::as_str))
            .with_filter(config.filter()))
    }

    /// Configures whether subdirectories are enumerated.
    ///
    /// By default, the walk is recursive.
    #[must_use]
    pub const fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Configures whether to follow symbolic links.
    ///
    /// By default, symbolic links are not followed.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Adds directory names to prune during traversal.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let walker = FileWalker::new(root)?.with_skip_dirs([".git", "bin"]);
    /// ```
    #[must_use]
    pub fn with_skip_dirs<'a>(mut self, dirs: impl IntoIterator<Item = &'a str>) -> Self {
        self.skip_dirs.extend(dirs.into_iter().map(ToOwned::to_owned));
        self
    }

    /// Sets the filter applied to root-relative file paths.
    #[must_use]
    pub fn with_filter<F: FileFilter>(mut self, filter: F) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Returns the canonical root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` if subdirectories are enumerated.
    #[inline]
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Maps an absolute path to its path relative to the root.
    ///
    /// Returns `None` for paths outside the root, and for paths below the
    /// root's own entries when the walker is shallow. The root itself maps to
    /// the empty path.
    ///
    /// ```no_run
    /// # use resx_scanner::FileWalker;
    /// # use camino::Utf8Path;
    /// # fn example(walker: &FileWalker) {
    /// let path = walker.root().join("sub/Main.dialog");
    /// assert_eq!(walker.relative(&path), Some(Utf8Path::new("sub/Main.dialog")));
    /// # }
    /// ```
    #[must_use]
    pub fn relative<'a>(&self, path: &'a Utf8Path) -> Option<&'a Utf8Path> {
        let rel = path.strip_prefix(&self.root).ok()?;
        if !self.recursive && rel.components().count() > 1 {
            return None;
        }
        Some(rel)
    }

    /// Returns `true` if symbolic links are followed.
    #[inline]
    #[must_use]
    pub const fn follows_links(&self) -> bool {
        self.follow_links
    }

    /// Returns `true` if a root-relative file path passes the filter.
    #[inline]
    #[must_use]
    pub fn accepts(&self, rel: &Utf8Path) -> bool {
        self.filter.should_process(rel)
    }

    /// Returns `true` if `name` is a pruned directory name.
    #[must_use]
    pub fn skips_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|d| d == name)
    }

    /// Collects the absolute paths of all accepted files, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Walk`] if directory traversal fails.
    pub fn collect_paths(&self) -> Result<Vec<Utf8PathBuf>, ScanError> {
        Ok(self
            .collect_relative(Utf8Path::new(""))?
            .into_iter()
            .map(|rel| self.root.join(rel))
            .collect())
    }

    /// Collects the root-relative paths of accepted files below `subdir`.
    ///
    /// `subdir` is itself relative to the root; the empty path walks the
    /// whole root. A `subdir` that vanished mid-walk yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Walk`] if directory traversal fails for any
    /// reason other than an entry disappearing.
    pub fn collect_relative(&self, subdir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ScanError> {
        let start = if subdir.as_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(subdir)
        };

        let mut paths = Vec::new();
        for result in self.build_walker(&start) {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) if e.io_error().is_some_and(|err| err.kind() == io::ErrorKind::NotFound) => {
                    // Deleted between listing and visiting.
                    trace!(error = %e, "skipping vanished entry");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                warn!(path = %entry.path().display(), "skipping non-UTF-8 path");
                continue;
            };
            let Ok(rel) = path.strip_prefix(&self.root) else {
                continue;
            };
            if !self.filter.should_process(rel) {
                continue;
            }

            paths.push(rel.to_owned());
        }

        paths.sort();
        Ok(paths)
    }

    /// Builds the ignore walker with configured settings.
    fn build_walker(&self, start: &Utf8Path) -> ignore::Walk {
        let skip_dirs = self.skip_dirs.clone();
        let mut builder = WalkBuilder::new(start);
        builder
            // Every file in a resource folder counts, hidden or ignored.
            .standard_filters(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry.depth() > 0
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| skip_dirs.iter().any(|d| d == name)))
            });
        if !self.recursive {
            builder.max_depth(Some(1));
        }
        builder.build()
    }
}

impl std::fmt::Debug for FileWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWalker")
            .field("root", &self.root)
            .field("recursive", &self.recursive)
            .field("follow_links", &self.follow_links)
            .field("skip_dirs", &self.skip_dirs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resx_core::ExtensionFilter;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_owned()).expect("UTF-8 temp path");
        for rel in [
            "root.schema",
            "Main.dialog",
            "sub/Child.dialog",
            "sub/deeper/Leaf.dialog",
            ".git/config",
            ".hidden.dialog",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, "{}").expect("write");
        }
        (dir, root)
    }

    fn rel_strings(paths: &[Utf8PathBuf]) -> Vec<&str> {
        paths.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_recursive_walk_is_sorted() {
        let (_dir, root) = fixture();
        let walker = FileWalker::new(&root).expect("walker").with_skip_dirs([".git"]);

        let paths = walker.collect_relative(Utf8Path::new("")).expect("walk");
        assert_eq!(
            rel_strings(&paths),
            vec![
                ".hidden.dialog",
                "Main.dialog",
                "root.schema",
                "sub/Child.dialog",
                "sub/deeper/Leaf.dialog",
            ]
        );
    }

    #[test]
    fn test_shallow_walk_only_root_files() {
        let (_dir, root) = fixture();
        let walker = FileWalker::new(&root)
            .expect("walker")
            .with_recursive(false)
            .with_skip_dirs([".git"]);

        let paths = walker.collect_relative(Utf8Path::new("")).expect("walk");
        assert_eq!(
            rel_strings(&paths),
            vec![".hidden.dialog", "Main.dialog", "root.schema"]
        );
    }

    #[test]
    fn test_filter_applies_to_relative_paths() {
        let (_dir, root) = fixture();
        let walker = FileWalker::new(&root)
            .expect("walker")
            .with_filter(ExtensionFilter::new(&["schema"]));

        let paths = walker.collect_paths().expect("walk");
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("root.schema"));
        assert!(paths[0].is_absolute());
    }

    #[test]
    fn test_collect_relative_subdir() {
        let (_dir, root) = fixture();
        let walker = FileWalker::new(&root).expect("walker");

        let paths = walker.collect_relative(Utf8Path::new("sub")).expect("walk");
        assert_eq!(
            rel_strings(&paths),
            vec!["sub/Child.dialog", "sub/deeper/Leaf.dialog"]
        );

        let missing = walker
            .collect_relative(Utf8Path::new("nope"))
            .expect("missing subdir is empty");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_root_errors() {
        let (_dir, root) = fixture();

        let err = FileWalker::new(&root.join("missing")).expect_err("missing root");
        assert!(matches!(err, ScanError::RootNotFound(_)));

        let err = FileWalker::new(&root.join("Main.dialog")).expect_err("file root");
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn test_relative() {
        let (_dir, root) = fixture();
        let walker = FileWalker::new(&root).expect("walker");
        let canonical = walker.root().to_owned();

        assert_eq!(walker.relative(&canonical), Some(Utf8Path::new("")));
        assert_eq!(
            walker.relative(&canonical.join("sub/Child.dialog")),
            Some(Utf8Path::new("sub/Child.dialog"))
        );
        assert_eq!(walker.relative(Utf8Path::new("/elsewhere/x.dialog")), None);

        let shallow = walker.with_recursive(false);
        assert_eq!(
            shallow.relative(&canonical.join("Main.dialog")),
            Some(Utf8Path::new("Main.dialog"))
        );
        assert_eq!(shallow.relative(&canonical.join("sub/Child.dialog")), None);
    }

    #[test]
    fn test_builder_flags() {
        let (_dir, root) = fixture();
        let walker = FileWalker::new(&root)
            .expect("walker")
            .with_follow_links(true)
            .with_skip_dirs(["bin", "obj"]);

        assert!(walker.follow_links);
        assert!(walker.skips_dir("obj"));
        assert!(!walker.skips_dir("sub"));
        assert!(walker.is_recursive());
    }
}

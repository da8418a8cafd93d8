//! The relative-path resource index of a folder provider.
//!
//! [`FolderIndex`] maps every accepted file, keyed by its path relative to
//! the provider root, to a [`Resource`]. Several files may share a base name
//! in different subfolders; the one whose relative path sorts last (the last
//! one the sorted walk visits) answers for the identifier.
//!
//! # Reconciliation
//!
//! Reconciliation runs in two phases so the disk is never probed while the
//! index is locked:
//!
//! ```text
//! touched paths ──► ReconcilePlan::build  (stat + subtree walks, no index access)
//!                          │
//!                          ▼
//!                  FolderIndex::apply      (one mutable borrow, computes the delta)
//!                          │
//!                          ▼
//!                  ResourcesChanged
//! ```
//!
//! Every entry keeps a [`Fingerprint`] of the file (size and modification
//! time). Directory rescans report a file already in the index only when
//! its fingerprint moved.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use resx_core::{
    FxHashMap, FxHashSet, ProviderId, Resource, ResourceChange, ResourceId, ResourcesChanged,
};
use tracing::{debug, trace, warn};

use crate::error::ScanError;
use crate::walker::FileWalker;

/// Size and modification time of a file as last seen on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    size: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    /// Creates a fingerprint from explicit values.
    #[must_use]
    pub const fn new(size: u64, modified: Option<SystemTime>) -> Self {
        Self { size, modified }
    }

    /// Takes the fingerprint of a file's metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }

    /// Returns the file size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the modification time, if the platform reports one.
    #[inline]
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// What reconciliation observed on disk for one touched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Touch {
    /// An accepted regular file is present.
    File {
        /// Root-relative file path.
        path: Utf8PathBuf,
        /// The file as seen by the probe.
        fingerprint: Fingerprint,
    },

    /// A directory is present; `files` are the accepted files below it.
    ///
    /// The empty path stands for the provider root.
    Dir {
        /// Root-relative directory path.
        path: Utf8PathBuf,
        /// Root-relative paths of the accepted files found below it, sorted
        /// by path.
        files: Vec<(Utf8PathBuf, Fingerprint)>,
    },

    /// Nothing reportable exists at the path anymore.
    Gone(Utf8PathBuf),
}

/// The disk observations for one debounced batch, ready to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    touches: Vec<Touch>,
}

impl ReconcilePlan {
    /// Inspects every touched absolute path.
    ///
    /// Paths outside the walker's root, or too deep for a shallow walker, are
    /// ignored. Each remaining path is classified by what is on disk now.
    pub fn build<'a>(
        walker: &FileWalker,
        touched: impl IntoIterator<Item = &'a Utf8Path>,
    ) -> Self {
        let mut seen = FxHashSet::default();
        let mut touches = Vec::new();

        for path in touched {
            let Some(rel) = walker.relative(path) else {
                trace!(path = %path, "ignoring path outside provider scope");
                continue;
            };
            if !seen.insert(rel.to_owned()) {
                continue;
            }
            match Self::inspect(walker, path, rel) {
                Ok(touch) => touches.push(touch),
                Err(e) => {
                    warn!(path = %path, error = %e, "skipping path that could not be inspected");
                }
            }
        }

        Self { touches }
    }

    fn inspect(
        walker: &FileWalker,
        path: &Utf8Path,
        rel: &Utf8Path,
    ) -> Result<Touch, ScanError> {
        let metadata = match probe(walker, path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Touch::Gone(rel.to_owned()));
            }
            Err(e) => return Err(ScanError::io(path, e)),
        };

        if metadata.is_file() {
            let touch = if walker.accepts(rel) {
                Touch::File {
                    path: rel.to_owned(),
                    fingerprint: Fingerprint::from_metadata(&metadata),
                }
            } else {
                Touch::Gone(rel.to_owned())
            };
            return Ok(touch);
        }

        if metadata.is_dir() {
            // A shallow provider only lists the root; a child directory can
            // at most displace a file entry of the same name.
            if !rel.as_str().is_empty() && !walker.is_recursive() {
                return Ok(Touch::Gone(rel.to_owned()));
            }
            let files = walker
                .collect_relative(rel)?
                .into_iter()
                .filter_map(|file| {
                    let fingerprint = fingerprint(walker, &file)?;
                    Some((file, fingerprint))
                })
                .collect();
            return Ok(Touch::Dir {
                path: rel.to_owned(),
                files,
            });
        }

        Ok(Touch::Gone(rel.to_owned()))
    }

    /// Creates a plan from explicit observations.
    #[must_use]
    pub fn from_touches(touches: Vec<Touch>) -> Self {
        Self { touches }
    }

    /// Returns the observations in this plan.
    #[inline]
    #[must_use]
    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }

    /// Returns the number of observed paths.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.touches.len()
    }

    /// Returns `true` if nothing in scope was touched.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.touches.is_empty()
    }
}

fn probe(walker: &FileWalker, path: &Utf8Path) -> io::Result<Metadata> {
    if walker.follows_links() {
        std::fs::metadata(path)
    } else {
        std::fs::symlink_metadata(path)
    }
}

/// Fingerprints a root-relative file; `None` if it vanished since the walk.
fn fingerprint(walker: &FileWalker, rel: &Utf8Path) -> Option<Fingerprint> {
    let path = walker.root().join(rel);
    match probe(walker, &path) {
        Ok(metadata) => Some(Fingerprint::from_metadata(&metadata)),
        Err(e) => {
            trace!(path = %path, error = %e, "file vanished after the walk");
            None
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    resource: Resource,
    fingerprint: Fingerprint,
}

/// The in-memory resource index of one folder provider.
///
/// # Examples
///
/// ```no_run
/// use resx_core::ProviderId;
/// use resx_scanner::{FileWalker, FolderIndex};
/// use camino::Utf8Path;
///
/// # fn example() -> Result<(), resx_scanner::ScanError> {
/// let walker = FileWalker::new(Utf8Path::new("./defs"))?;
/// let mut index = FolderIndex::scan(&walker, ProviderId::next())?;
///
/// for resource in index.by_category("dialog") {
///     println!("{} -> {}", resource.id(), resource.full_path());
/// }
///
/// // Later, after the watcher reported some paths:
/// let touched = [walker.root().join("Main.dialog")];
/// let delta = index.reconcile(&walker, touched.iter().map(|p| p.as_path()));
/// println!("{} identifiers changed", delta.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FolderIndex {
    /// The provider reported on every resource.
    provider: ProviderId,
    /// Canonical root the relative keys are resolved against.
    root: Utf8PathBuf,
    /// Every indexed file by root-relative path.
    entries: FxHashMap<Utf8PathBuf, Entry>,
    /// Relative paths per identifier; the last one is the winner.
    by_id: BTreeMap<ResourceId, BTreeSet<Utf8PathBuf>>,
}

impl FolderIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, provider: ProviderId) -> Self {
        Self {
            provider,
            root: root.into(),
            entries: FxHashMap::default(),
            by_id: BTreeMap::new(),
        }
    }

    /// Builds an index from a full walk of the walker's root.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Walk`] if directory traversal fails.
    pub fn scan(walker: &FileWalker, provider: ProviderId) -> Result<Self, ScanError> {
        let mut index = Self::new(walker.root(), provider);
        for rel in walker.collect_relative(Utf8Path::new(""))? {
            if let Some(fingerprint) = fingerprint(walker, &rel) {
                index.insert(rel, fingerprint);
            }
        }

        debug!(
            root = %index.root,
            provider = %provider,
            files = index.file_count(),
            resources = index.len(),
            "scanned folder"
        );
        Ok(index)
    }

    /// Returns the provider id stamped on every resource.
    #[inline]
    #[must_use]
    pub const fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the number of distinct identifiers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if no resources are indexed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Returns the number of indexed files, shadowed duplicates included.
    #[inline]
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns the resource reported for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Resource> {
        let winner = self.by_id.get(id)?.last()?;
        self.entries.get(winner).map(|entry| &entry.resource)
    }

    /// Returns the reported resources of a category, sorted by id.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<Resource> {
        self.resources()
            .filter(|r| r.matches_category(category))
            .cloned()
            .collect()
    }

    /// Returns every reported resource, sorted by id.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.by_id
            .values()
            .filter_map(|paths| paths.last())
            .filter_map(|rel| self.entries.get(rel))
            .map(|entry| &entry.resource)
    }

    /// Returns `true` if the file at `rel` is indexed, winner or not.
    #[inline]
    #[must_use]
    pub fn contains_path(&self, rel: &Utf8Path) -> bool {
        self.entries.contains_key(rel)
    }

    /// Re-checks the touched paths on disk and applies the result.
    ///
    /// Shorthand for [`ReconcilePlan::build`] followed by [`apply`](Self::apply).
    pub fn reconcile<'a>(
        &mut self,
        walker: &FileWalker,
        touched: impl IntoIterator<Item = &'a Utf8Path>,
    ) -> ResourcesChanged {
        let plan = ReconcilePlan::build(walker, touched);
        self.apply(plan)
    }

    /// Applies a plan and returns the per-identifier delta.
    ///
    /// An identifier is reported as changed when its winning file is new,
    /// different, or was itself upserted; as removed when it had a winner
    /// before and has none now. A touched file is always upserted; a file
    /// found by a directory rescan only when it is new or its fingerprint
    /// moved. A file shadowed by another winner produces no entry.
    pub fn apply(&mut self, plan: ReconcilePlan) -> ResourcesChanged {
        let mut removals = BTreeSet::new();
        let mut upserts: BTreeMap<Utf8PathBuf, Fingerprint> = BTreeMap::new();

        for touch in plan.touches {
            match touch {
                Touch::File { path, fingerprint } => {
                    // A directory may have been replaced by this file.
                    removals.extend(self.paths_below(&path));
                    upserts.insert(path, fingerprint);
                }
                Touch::Dir { path, files } => {
                    if self.entries.contains_key(&path) {
                        removals.insert(path.clone());
                    }
                    for existing in self.paths_below(&path) {
                        if files.binary_search_by(|(f, _)| f.cmp(&existing)).is_err() {
                            removals.insert(existing);
                        }
                    }
                    for (file, fingerprint) in files {
                        let moved = self
                            .entries
                            .get(&file)
                            .is_none_or(|entry| entry.fingerprint != fingerprint);
                        if moved {
                            upserts.insert(file, fingerprint);
                        }
                    }
                }
                Touch::Gone(rel) => {
                    removals.extend(self.paths_below(&rel));
                    if self.entries.contains_key(&rel) {
                        removals.insert(rel);
                    }
                }
            }
        }

        // Snapshot the winner of every affected identifier before mutating.
        let mut affected: BTreeMap<ResourceId, Option<Utf8PathBuf>> = BTreeMap::new();
        for rel in removals.iter().chain(upserts.keys()) {
            let Some(id) = ResourceId::from_path(rel) else {
                continue;
            };
            if !affected.contains_key(&id) {
                let before = self.winner(&id).cloned();
                affected.insert(id, before);
            }
        }

        for rel in &removals {
            self.remove(rel);
        }
        for (rel, fingerprint) in &upserts {
            self.insert(rel.clone(), *fingerprint);
        }

        let mut delta = ResourcesChanged::new(self.provider);
        for (id, before) in affected {
            match (before, self.winner(&id)) {
                (Some(_), None) => delta.push(ResourceChange::removed(id)),
                (before, Some(after))
                    if before.as_ref() != Some(after) || upserts.contains_key(after) =>
                {
                    if let Some(entry) = self.entries.get(after) {
                        delta.push(ResourceChange::changed(entry.resource.clone()));
                    }
                }
                _ => {}
            }
        }

        debug!(
            provider = %self.provider,
            removed_files = removals.len(),
            upserted_files = upserts.len(),
            changes = delta.len(),
            "reconciled folder index"
        );
        delta
    }

    fn winner(&self, id: &ResourceId) -> Option<&Utf8PathBuf> {
        self.by_id.get(id)?.last()
    }

    /// Indexed paths strictly below `prefix`; every path for the empty prefix.
    fn paths_below(&self, prefix: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.entries
            .keys()
            .filter(|rel| rel.as_path() != prefix && rel.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn insert(&mut self, rel: Utf8PathBuf, fingerprint: Fingerprint) {
        let Some(resource) = Resource::from_path(self.root.join(&rel), self.provider) else {
            return;
        };
        self.by_id
            .entry(resource.id().clone())
            .or_default()
            .insert(rel.clone());
        self.entries.insert(
            rel,
            Entry {
                resource,
                fingerprint,
            },
        );
    }

    fn remove(&mut self, rel: &Utf8Path) {
        let Some(Entry { resource, .. }) = self.entries.remove(rel) else {
            return;
        };
        if let Some(paths) = self.by_id.get_mut(resource.id()) {
            paths.remove(rel);
            if paths.is_empty() {
                self.by_id.remove(resource.id());
            }
        }
    }
}

//! Folder enumeration and resource indexing for resx.
//!
//! This crate turns a directory on disk into the in-memory index a folder
//! provider answers queries from, and keeps that index in step with the
//! batches of touched paths the watcher reports.
//!
//! # Overview
//!
//! - [`FileWalker`]: Sorted directory traversal over a canonical root
//! - [`FolderIndex`]: Relative-path index with deterministic id collisions
//! - [`ReconcilePlan`]: Disk observations for a batch, applied in one step
//!
//! # Example
//!
//! ```no_run
//! use resx_core::{ProviderId, ScanConfig};
//! use resx_scanner::{FileWalker, FolderIndex};
//! use camino::Utf8Path;
//!
//! # fn example() -> Result<(), resx_scanner::ScanError> {
//! let walker = FileWalker::from_config(Utf8Path::new("./defs"), true, &ScanConfig::default())?;
//! let index = FolderIndex::scan(&walker, ProviderId::next())?;
//!
//! println!("{} resources", index.len());
//! if let Some(main) = index.get("Main.dialog") {
//!     println!("Main.dialog lives at {}", main.full_path());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! FolderIndex
//!     │
//!     ├── FileWalker (collect paths)
//!     │       │
//!     │       └── WalkBuilder (ignore crate, sorted, pruned)
//!     │
//!     ├── entries: relative path -> Resource   (FxHashMap)
//!     │
//!     └── by_id:   ResourceId -> {paths}       (BTreeMap, last path wins)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod index;
mod walker;

pub use error::ScanError;
pub use index::{Fingerprint, FolderIndex, ReconcilePlan, Touch};
pub use walker::FileWalker;

//! File change detection with quiet-window debouncing.
//!
//! This crate turns native file system notifications into batches of
//! touched paths that a folder provider can reconcile against disk.
//!
//! # Overview
//!
//! - [`FileWatcher`]: runs a `notify` watcher on the blocking pool and
//!   forwards every relevant raw event into a channel
//! - [`Debouncer`]: accumulates raw events and flushes them once a quiet
//!   window elapses with no further activity
//! - [`DebouncedBatch`]: the deduplicated, sorted set of touched paths
//!
//! # Architecture
//!
//! ```text
//!  notify thread            tokio task                  blocking pool
//! ┌──────────────┐  send   ┌────────────────────┐ flush ┌──────────────┐
//! │ FileWatcher  │ ──────► │ Debouncer          │ ────► │ on_flush     │
//! │ (filtered)   │         │ (restartable timer)│       │ (reconcile)  │
//! └──────────────┘         └────────────────────┘       └──────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! resx-cli ──► resx-registry ──► resx-scanner ──► resx-core
//!                            └─► resx-watcher ──►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use resx_core::{EditorTempFilter, WatchConfig};
//! use resx_watcher::{Debouncer, FileWatcher};
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), resx_watcher::WatchError> {
//! let config = WatchConfig::default();
//! let debouncer = Debouncer::spawn(config.debounce(), config.channel_capacity, |batch| {
//!     for path in &batch {
//!         println!("touched: {path}");
//!     }
//! });
//!
//! let watcher = FileWatcher::new(
//!     Utf8Path::new("./defs"),
//!     true,
//!     EditorTempFilter,
//!     debouncer.sender(),
//! )
//! .await?;
//!
//! // ... later
//! debouncer.cancel();
//! watcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use resx_watcher::WatchError;
//!
//! fn handle_watch_error(err: WatchError) {
//!     if err.is_fatal() {
//!         eprintln!("Fatal watcher error: {err}");
//!     } else {
//!         eprintln!("Warning: {err}");
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod debouncer;
pub mod error;
pub mod events;
pub mod watcher;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use events::{DebouncedBatch, EventBatchStats, FileEvent, FileEventKind};
pub use watcher::FileWatcher;

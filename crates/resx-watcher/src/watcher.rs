//! Native file watcher bridged into the async runtime.
//!
//! This module provides the [`FileWatcher`] type that runs a synchronous
//! `notify` watcher on tokio's blocking pool and forwards every relevant raw
//! event into an async channel, typically a [`Debouncer`](crate::Debouncer)
//! sender.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌───────────────────┐    ┌──────────────────────────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Callback (utf-8, filter, access) │  │
//! │  │ (notify)          │    └────────────────┬─────────────────┘  │
//! │  └───────────────────┘                     │                    │
//! └────────────────────────────────────────────│────────────────────┘
//!                                blocking_send │
//!                                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────────────────────┐     │
//! │  │ FileWatcher      │    │ mpsc::Sender<FileEvent> (sink) │     │
//! │  │ (shutdown ctrl)  │    │  -> Debouncer task             │     │
//! │  └──────────────────┘    └────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No debouncing happens here: every create, modify, remove, rename and
//! close-after-write is forwarded as-is.

use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use resx_core::FileFilter;

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventKind};

/// A native watch over one directory.
///
/// # Lifecycle
///
/// 1. **Creation**: [`FileWatcher::new`] validates the path, spawns a
///    blocking task with the notify watcher, and waits until the watch is
///    registered. Registration failures surface as errors from `new`.
///
/// 2. **Forwarding**: Events are filtered against the root-relative path and
///    sent into the sink passed at creation.
///
/// 3. **Shutdown**: Call [`shutdown`](Self::shutdown) to stop and await the
///    thread, [`stop`](Self::stop) from sync code, or simply drop the watcher.
///
/// # Examples
///
/// ```no_run
/// use resx_core::EditorTempFilter;
/// use resx_watcher::FileWatcher;
/// use camino::Utf8Path;
/// use tokio::sync::mpsc;
///
/// # async fn example() -> Result<(), resx_watcher::WatchError> {
/// let (tx, mut rx) = mpsc::channel(256);
/// let watcher = FileWatcher::new(Utf8Path::new("./defs"), true, EditorTempFilter, tx).await?;
///
/// while let Some(event) = rx.recv().await {
///     println!("Changed: {}", event.path);
/// }
/// watcher.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Shutdown signal sender.
    ///
    /// Set to `None` once shutdown is initiated.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<()>>,

    /// The canonical path being watched.
    watch_path: Utf8PathBuf,

    /// Whether subdirectories are watched.
    recursive: bool,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("recursive", &self.recursive)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching `path`.
    ///
    /// `filter` sees paths relative to the canonical root. Events that pass
    /// are sent into `sink`; the watcher thread stops forwarding once the
    /// sink's receiver is gone.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist.
    /// Returns [`WatchError::Notify`] if the watch could not be registered.
    /// Returns [`WatchError::ChannelClosed`] if the watcher thread died
    /// before reporting back.
    pub async fn new<F: FileFilter>(
        path: &Utf8Path,
        recursive: bool,
        filter: F,
        sink: mpsc::Sender<FileEvent>,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }

        let watch_path = path.canonicalize_utf8().map_err(WatchError::Io)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(&task_path, recursive, filter, sink, ready_tx, shutdown_rx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(WatchError::ChannelClosed),
        }

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            watch_path,
            recursive,
        })
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` if subdirectories are watched.
    #[inline]
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Returns `true` if the watcher is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the watcher thread to stop without waiting for it.
    ///
    /// Native events already queued may still reach the sink; consumers
    /// that must stay silent afterwards need their own gate.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stops the watcher and waits for its thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the watcher thread panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        self.stop();

        if let Some(handle) = self.task_handle.take() {
            if handle.await.is_err() {
                return Err(WatchError::ChannelClosed);
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        // Drop is sync, so the thread is signalled but not awaited.
        self.stop();
    }
}

/// Runs the notify watcher in a blocking context until shutdown.
fn run_watcher_loop<F: FileFilter>(
    root: &Utf8Path,
    recursive: bool,
    filter: F,
    sink: mpsc::Sender<FileEvent>,
    ready_tx: oneshot::Sender<Result<(), WatchError>>,
    shutdown_rx: oneshot::Receiver<()>,
) {
    let callback_root = root.to_path_buf();
    let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => forward_event(&callback_root, &filter, &sink, event),
        Err(error) => tracing::warn!(error = %error, "notify error"),
    });

    let mut watcher = match watcher {
        Ok(w) => w,
        Err(e) => {
            let _ = ready_tx.send(Err(e.into()));
            return;
        }
    };

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    if let Err(e) = watcher.watch(root.as_std_path(), mode) {
        let _ = ready_tx.send(Err(e.into()));
        return;
    }

    tracing::info!(path = %root, recursive, "file watcher started");
    let _ = ready_tx.send(Ok(()));

    // Also returns when the FileWatcher is dropped without a signal.
    let _ = shutdown_rx.blocking_recv();

    drop(watcher);
    tracing::info!(path = %root, "file watcher stopped");
}

fn forward_event<F: FileFilter>(
    root: &Utf8Path,
    filter: &F,
    sink: &mpsc::Sender<FileEvent>,
    event: Event,
) {
    if event.need_rescan() {
        tracing::debug!(path = %root, "backend requested a rescan");
        let _ = sink.blocking_send(FileEvent::new(root.to_path_buf(), FileEventKind::Other));
        return;
    }

    // Reads and opens never change anything; a writer closing does.
    if matches!(event.kind, EventKind::Access(kind) if kind != AccessKind::Close(AccessMode::Write))
    {
        return;
    }

    let kind = FileEventKind::from(&event.kind);

    for path in event.paths {
        let path = match Utf8PathBuf::try_from(path) {
            Ok(p) => p,
            Err(e) => {
                let invalid = e.into_path_buf();
                tracing::warn!(path = %invalid.display(), "skipping non-UTF-8 path in file event");
                continue;
            }
        };

        let relative = path.strip_prefix(root).unwrap_or(path.as_path());
        if !filter.should_process(relative) {
            tracing::trace!(path = %path, "filtered out file event");
            continue;
        }

        if sink.blocking_send(FileEvent::new(path, kind)).is_err() {
            tracing::debug!("event sink closed, dropping file events");
            return;
        }
    }
}

//! Quiet-window debouncing of raw file events.
//!
//! A [`Debouncer`] owns one tokio task that accumulates incoming
//! [`FileEvent`]s into a [`DebouncedBatch`]. Every event restarts the
//! window; once the window elapses with no further events the batch is
//! handed to the flush callback exactly once and the state is cleared.
//!
//! ```text
//!  events:  x  x x        x                 x
//!  timer:   |--|-|--------|                 |---------|
//!                         ▲ window elapses            ▲
//!                       flush {x, x, x}             flush {x}
//! ```
//!
//! The flush callback runs on tokio's blocking pool (it probes the disk) and
//! is awaited before the next event is read, so flushes of one debouncer
//! never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::events::{DebouncedBatch, FileEvent};

/// Batches raw file events over a quiet window.
///
/// Must be created inside a tokio runtime. Dropping the debouncer cancels
/// its task; pending paths are discarded without a final flush.
///
/// # Examples
///
/// ```no_run
/// use resx_watcher::{Debouncer, FileEvent, FileEventKind};
/// use camino::Utf8PathBuf;
/// use std::time::Duration;
///
/// # async fn example() {
/// let debouncer = Debouncer::spawn(Duration::from_millis(100), 256, |batch| {
///     println!("{} paths changed", batch.len());
/// });
///
/// let tx = debouncer.sender();
/// tx.send(FileEvent::new(Utf8PathBuf::from("/defs/a.dialog"), FileEventKind::Modified))
///     .await
///     .ok();
/// # }
/// ```
pub struct Debouncer {
    /// Sender feeding the debounce task.
    tx: mpsc::Sender<FileEvent>,
    /// Token for cancelling the debounce task.
    cancellation_token: CancellationToken,
    /// Handle to the debounce task.
    task: Option<JoinHandle<()>>,
    /// The quiet window.
    window: Duration,
}

impl Debouncer {
    /// Spawns the debounce task.
    ///
    /// `capacity` bounds the channel between producers and the task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, or if `capacity` is zero.
    pub fn spawn<F>(window: Duration, capacity: usize, on_flush: F) -> Self
    where
        F: Fn(DebouncedBatch) + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity);
        let cancellation_token = CancellationToken::new();

        debug!(window = ?window, capacity, "starting debouncer");

        let task = tokio::spawn(run_debounce_loop(
            rx,
            cancellation_token.clone(),
            window,
            Arc::new(on_flush),
        ));

        Self {
            tx,
            cancellation_token,
            task: Some(task),
            window,
        }
    }

    /// Returns a sender for raw events.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<FileEvent> {
        self.tx.clone()
    }

    /// Returns the quiet window.
    #[inline]
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Cancels the task, discarding pending paths.
    ///
    /// A flush that is already running completes; no later flush starts.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Cancels the task and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "debounce task failed");
            }
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn run_debounce_loop<F>(
    mut rx: mpsc::Receiver<FileEvent>,
    cancellation_token: CancellationToken,
    window: Duration,
    on_flush: Arc<F>,
) where
    F: Fn(DebouncedBatch) + Send + Sync + 'static,
{
    let mut pending = DebouncedBatch::new();

    loop {
        tokio::select! {
            biased;

            () = cancellation_token.cancelled() => {
                debug!(discarded = pending.len(), "debouncer cancelled");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!("debouncer channel closed");
                    break;
                };
                trace!(path = %event.path, kind = ?event.kind, "raw file event");
                pending.push(event);
            }
            // Re-created on every iteration, so each event restarts the window.
            () = tokio::time::sleep(window), if !pending.is_empty() => {
                let batch = std::mem::take(&mut pending);
                let stats = batch.stats();
                debug!(
                    paths = stats.unique_paths,
                    raw_events = stats.total_events,
                    created = stats.created,
                    modified = stats.modified,
                    removed = stats.removed,
                    renamed = stats.renamed,
                    "flushing debounced batch"
                );

                let on_flush = Arc::clone(&on_flush);
                if let Err(e) = tokio::task::spawn_blocking(move || on_flush(batch)).await {
                    error!(error = %e, "debounce flush panicked");
                }
            }
        }
    }
}

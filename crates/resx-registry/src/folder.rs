//! Folder-backed resource provider.
//!
//! A [`FolderResourceProvider`] answers queries from an in-memory
//! [`FolderIndex`] and, when monitoring, keeps it current through a native
//! watch feeding a [`Debouncer`].
//!
//! # Change pipeline
//!
//! ```text
//! FileWatcher ──► Debouncer ──► flush (blocking pool)
//!                                 │   (reconcile lock held throughout)
//!                                 ├── ReconcilePlan::build   (disk, no index lock)
//!                                 ├── FolderIndex::apply     (write lock)
//!                                 └── ChangeHandlers::dispatch (publish gate)
//! ```
//!
//! The watch forwards every path outside skipped directories; whether a path
//! is a resource is decided during reconciliation by the same filter the
//! scan uses.

use std::cell::Cell;
use std::sync::{Arc, Weak};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, trace};

use resx_core::{
    FolderConfig, ProviderId, Resource, ResourcesChanged, ScanConfig, SkipDirsFilter, WatchConfig,
};
use resx_scanner::{FileWalker, FolderIndex, ReconcilePlan};
use resx_watcher::{DebouncedBatch, Debouncer, FileWatcher};

use crate::error::ProviderError;
use crate::handlers::{ChangeHandler, ChangeHandlers, SubscriptionId};
use crate::provider::ResourceProvider;

/// Builder for [`FolderResourceProvider`].
///
/// # Examples
///
/// ```no_run
/// use resx_registry::FolderProviderBuilder;
///
/// # async fn example() -> Result<(), resx_registry::ProviderError> {
/// let provider = FolderProviderBuilder::new("./defs")
///     .include_subfolders(false)
///     .monitor_changes(true)
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FolderProviderBuilder {
    root: Utf8PathBuf,
    include_subfolders: bool,
    monitor_changes: bool,
    scan: ScanConfig,
    watch: WatchConfig,
}

impl FolderProviderBuilder {
    /// Starts a builder for a recursive, unmonitored folder.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_subfolders: true,
            monitor_changes: false,
            scan: ScanConfig::default(),
            watch: WatchConfig::default(),
        }
    }

    /// Starts a builder from a configured folder entry.
    #[must_use]
    pub fn from_config(folder: &FolderConfig) -> Self {
        Self::new(folder.path.clone())
            .include_subfolders(folder.include_subfolders)
            .monitor_changes(folder.monitor_changes)
    }

    /// Sets whether files in subfolders are resources too.
    #[must_use]
    pub const fn include_subfolders(mut self, include: bool) -> Self {
        self.include_subfolders = include;
        self
    }

    /// Sets whether the folder is watched for changes.
    #[must_use]
    pub const fn monitor_changes(mut self, monitor: bool) -> Self {
        self.monitor_changes = monitor;
        self
    }

    /// Sets the scan options.
    #[must_use]
    pub fn scan_config(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }

    /// Sets the watch options.
    #[must_use]
    pub const fn watch_config(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    /// Returns the configured root, as given.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Builds the provider, starting the watch first when monitoring.
    ///
    /// The watch is registered before the initial scan so that changes
    /// racing the scan are reconciled afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if monitoring was requested with a
    /// zero debounce window or channel capacity, [`ProviderError::Scan`] if
    /// the root is missing or cannot be enumerated, and
    /// [`ProviderError::WatchSetup`] if the native watch could not be
    /// registered.
    pub async fn build(self) -> Result<FolderResourceProvider, ProviderError> {
        if !self.monitor_changes {
            return self.build_snapshot();
        }

        self.watch.validate()?;
        let shared = self.shared()?;

        let weak = Arc::downgrade(&shared);
        let debouncer = Debouncer::spawn(
            self.watch.debounce(),
            self.watch.channel_capacity,
            move |batch| flush(&weak, &batch),
        );
        let watcher = FileWatcher::new(
            shared.walker.root(),
            self.include_subfolders,
            SkipDirsFilter::from_owned(self.scan.skip_dirs.iter().cloned()),
            debouncer.sender(),
        )
        .await?;

        shared.scan()?;

        Ok(FolderResourceProvider {
            shared,
            live: Mutex::new(Some(LiveWatch {
                watcher,
                debouncer,
            })),
            monitor_changes: true,
        })
    }

    /// Builds a static provider from one scan, ignoring `monitor_changes`.
    ///
    /// Needs no async runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Scan`] if the root is missing or cannot be
    /// enumerated.
    pub fn build_snapshot(self) -> Result<FolderResourceProvider, ProviderError> {
        let shared = self.shared()?;
        shared.scan()?;

        Ok(FolderResourceProvider {
            shared,
            live: Mutex::new(None),
            monitor_changes: false,
        })
    }

    fn shared(&self) -> Result<Arc<FolderShared>, ProviderError> {
        let walker = FileWalker::from_config(&self.root, self.include_subfolders, &self.scan)?;
        let id = ProviderId::next();

        Ok(Arc::new(FolderShared {
            id,
            index: RwLock::new(FolderIndex::new(walker.root(), id)),
            walker,
            handlers: ChangeHandlers::new(),
            reconcile_lock: ReentrantMutex::new(()),
            publish_gate: ReentrantMutex::new(Cell::new(false)),
        }))
    }
}

/// State shared between the provider and its flush callback.
struct FolderShared {
    id: ProviderId,
    walker: FileWalker,
    index: RwLock<FolderIndex>,
    handlers: ChangeHandlers,
    /// Serializes scan and every reconcile-then-publish pass, so plans are
    /// applied and published in the order they were built. Reentrant so a
    /// handler may call `refresh`.
    reconcile_lock: ReentrantMutex<()>,
    /// Holds `true` once disposed. Held for the whole of a publication so
    /// dispose waits for it; reentrant so a handler may dispose.
    publish_gate: ReentrantMutex<Cell<bool>>,
}

impl FolderShared {
    fn scan(&self) -> Result<(), ProviderError> {
        // Parks any early flush until the scan is in.
        let _serial = self.reconcile_lock.lock();
        let mut index = self.index.write();
        *index = FolderIndex::scan(&self.walker, self.id)?;

        info!(
            provider = %self.id,
            path = %self.walker.root(),
            resources = index.len(),
            files = index.file_count(),
            "folder scanned"
        );
        Ok(())
    }

    /// Reconciles the touched paths and publishes the delta as one step.
    fn sync<'a>(&self, touched: impl IntoIterator<Item = &'a Utf8Path>) -> ResourcesChanged {
        let _serial = self.reconcile_lock.lock();
        let delta = self.reconcile(touched);
        self.publish(&delta);
        delta
    }

    fn reconcile<'a>(&self, touched: impl IntoIterator<Item = &'a Utf8Path>) -> ResourcesChanged {
        let plan = ReconcilePlan::build(&self.walker, touched);
        if plan.is_empty() {
            trace!(provider = %self.id, "no touched path in scope");
            return ResourcesChanged::new(self.id);
        }
        self.index.write().apply(plan)
    }

    fn publish(&self, delta: &ResourcesChanged) {
        let disposed = self.publish_gate.lock();
        if disposed.get() {
            debug!(provider = %self.id, "dropping changes of disposed provider");
            return;
        }
        if delta.is_empty() {
            return;
        }

        debug!(provider = %self.id, changes = delta.len(), "publishing resource changes");
        self.handlers.dispatch(delta);
    }

    fn is_disposed(&self) -> bool {
        self.publish_gate.lock().get()
    }
}

fn flush(shared: &Weak<FolderShared>, batch: &DebouncedBatch) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    if shared.is_disposed() {
        return;
    }

    shared.sync(batch.paths());
}

struct LiveWatch {
    watcher: FileWatcher,
    debouncer: Debouncer,
}

/// A provider over the files of one directory.
///
/// Resource ids are file names; when several files share a name, the one
/// whose root-relative path sorts last is reported. Queries read the index
/// as of the last completed reconciliation and never wait for a pending
/// debounce window.
///
/// Dropping the provider disposes it.
pub struct FolderResourceProvider {
    shared: Arc<FolderShared>,
    live: Mutex<Option<LiveWatch>>,
    monitor_changes: bool,
}

impl FolderResourceProvider {
    /// Returns a builder for `root`.
    #[must_use]
    pub fn builder(root: impl Into<Utf8PathBuf>) -> FolderProviderBuilder {
        FolderProviderBuilder::new(root)
    }

    /// Returns the canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        self.shared.walker.root()
    }

    /// Returns `true` if files in subfolders are resources too.
    #[inline]
    #[must_use]
    pub fn include_subfolders(&self) -> bool {
        self.shared.walker.is_recursive()
    }

    /// Returns `true` if the provider was built with a live watch.
    #[inline]
    #[must_use]
    pub const fn monitors_changes(&self) -> bool {
        self.monitor_changes
    }

    /// Returns `true` once [`dispose`](ResourceProvider::dispose) ran.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Re-checks the whole folder against disk and publishes the delta.
    ///
    /// Lets a static provider catch up with changes it could not watch.
    /// Returns the delta, which is empty if nothing changed. Runs after any
    /// in-flight watch flush, never interleaved with it.
    pub fn refresh(&self) -> ResourcesChanged {
        let root = self.shared.walker.root().to_owned();
        self.shared.sync([root.as_path()])
    }
}

impl ResourceProvider for FolderResourceProvider {
    fn id(&self) -> ProviderId {
        self.shared.id
    }

    fn get_resource(&self, id: &str) -> Option<Resource> {
        self.shared.index.read().get(id).cloned()
    }

    fn get_resources(&self, category: &str) -> Vec<Resource> {
        self.shared.index.read().by_category(category)
    }

    fn resources(&self) -> Vec<Resource> {
        self.shared.index.read().resources().cloned().collect()
    }

    fn resource_count(&self) -> usize {
        self.shared.index.read().len()
    }

    fn subscribe(&self, handler: ChangeHandler) -> Option<SubscriptionId> {
        Some(self.shared.handlers.add(handler))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.handlers.remove(id)
    }

    fn dispose(&self) {
        if let Some(LiveWatch {
            mut watcher,
            debouncer,
        }) = self.live.lock().take()
        {
            debouncer.cancel();
            watcher.stop();
        }

        // Waits for an in-flight publication on another thread.
        let disposed = self.shared.publish_gate.lock();
        if !disposed.replace(true) {
            self.shared.handlers.clear();
            info!(provider = %self.shared.id, path = %self.root(), "folder provider disposed");
        }
    }
}

impl std::fmt::Debug for FolderResourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderResourceProvider")
            .field("id", &self.shared.id)
            .field("root", &self.root())
            .field("include_subfolders", &self.include_subfolders())
            .field("monitor_changes", &self.monitor_changes)
            .finish_non_exhaustive()
    }
}

impl Drop for FolderResourceProvider {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc as std_mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().expect("Failed to create temp directory"),
            }
        }

        fn root(&self) -> &Utf8Path {
            Utf8Path::from_path(self.dir.path()).expect("Invalid path")
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent");
            }
            fs::write(path, content).expect("write file");
        }
    }

    fn ids(resources: &[Resource]) -> Vec<&str> {
        resources.iter().map(|r| r.id().as_str()).collect()
    }

    fn channel_handler() -> (ChangeHandler, mpsc::UnboundedReceiver<ResourcesChanged>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: ChangeHandler = Arc::new(move |event: &ResourcesChanged| {
            let _ = tx.send(event.clone());
        });
        (handler, rx)
    }

    #[test]
    fn test_snapshot_queries() {
        let fx = Fixture::new();
        fx.write("Main.dialog", "{}");
        fx.write("Main.schema", "{}");
        fx.write("sub/Button.DIALOG", "{}");

        let provider = FolderResourceProvider::builder(fx.root())
            .build_snapshot()
            .expect("build");

        assert_eq!(provider.resource_count(), 3);
        assert_eq!(
            ids(&provider.get_resources("dialog")),
            vec!["Button.DIALOG", "Main.dialog"]
        );
        assert_eq!(ids(&provider.get_resources(".schema")), vec!["Main.schema"]);
        assert!(provider.get_resources("lg").is_empty());

        let main = provider.get_resource("Main.dialog").expect("Main.dialog");
        assert_eq!(main.provider(), provider.id());
        assert!(provider.get_resource("main.dialog").is_none(), "ids are case-sensitive");
        assert!(!provider.monitors_changes());
    }

    #[test]
    fn test_shallow_scan() {
        let fx = Fixture::new();
        fx.write("Root.schema", "{}");
        fx.write("dialogs/Nested.dialog", "{}");

        let provider = FolderResourceProvider::builder(fx.root())
            .include_subfolders(false)
            .build_snapshot()
            .expect("build");

        assert!(!provider.include_subfolders());
        assert!(provider.get_resources("dialog").is_empty());
        assert_eq!(ids(&provider.get_resources("schema")), vec!["Root.schema"]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let fx = Fixture::new();
        let missing = fx.root().join("missing");

        let err = FolderResourceProvider::builder(&missing)
            .build_snapshot()
            .expect_err("missing root");
        assert!(err.is_fatal());
        assert_eq!(err.path(), Some(&missing));
    }

    #[test]
    fn test_scan_config_extension_filter() {
        let fx = Fixture::new();
        fx.write("Main.dialog", "{}");
        fx.write("notes.txt", "x");

        let provider = FolderResourceProvider::builder(fx.root())
            .scan_config(ScanConfig {
                extensions: vec!["dialog".to_owned()],
                ..ScanConfig::default()
            })
            .build_snapshot()
            .expect("build");

        assert_eq!(ids(&provider.resources()), vec!["Main.dialog"]);
    }

    #[test]
    fn test_refresh_publishes_delta() {
        let fx = Fixture::new();
        fx.write("Old.dialog", "{}");

        let provider = FolderResourceProvider::builder(fx.root())
            .build_snapshot()
            .expect("build");
        let (handler, mut rx) = channel_handler();
        let sub = provider.subscribe(handler).expect("folder providers publish");

        fs::remove_file(fx.root().join("Old.dialog")).expect("remove");
        fx.write("New.dialog", "{}");

        let delta = provider.refresh();
        assert!(delta.contains("New.dialog"));
        assert_eq!(delta.removed().map(|id| id.as_str()).collect::<Vec<_>>(), vec!["Old.dialog"]);

        let event = rx.try_recv().expect("published");
        assert_eq!(event, delta);

        assert!(provider.refresh().is_empty(), "nothing left to reconcile");
        assert!(rx.try_recv().is_err(), "empty delta is not published");
        assert!(provider.unsubscribe(sub));
    }

    #[test]
    fn test_refresh_reports_modified_content() {
        let fx = Fixture::new();
        fx.write("Main.dialog", "{}");
        fx.write("Other.dialog", "{}");

        let provider = FolderResourceProvider::builder(fx.root())
            .build_snapshot()
            .expect("build");

        fx.write("Main.dialog", "{'foo':123 }");
        let delta = provider.refresh();
        assert_eq!(delta.len(), 1);
        assert!(delta.contains("Main.dialog"));

        let main = provider.get_resource("Main.dialog").expect("Main.dialog");
        assert_eq!(main.read_text().expect("read"), "{'foo':123 }");
    }

    #[test]
    fn test_refresh_waits_for_in_flight_publication() {
        let fx = Fixture::new();
        fx.write("A.dialog", "{}");

        let provider = Arc::new(
            FolderResourceProvider::builder(fx.root())
                .build_snapshot()
                .expect("build"),
        );

        let (entered_tx, entered_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        provider.subscribe(Arc::new(move |event: &ResourcesChanged| {
            let _ = entered_tx.send(event.clone());
            let _ = release_rx.lock().recv();
        }));

        fx.write("B.dialog", "{}");
        let first = {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.refresh())
        };
        let published = entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("first publication");
        assert!(published.contains("B.dialog"));

        fs::remove_file(fx.root().join("B.dialog")).expect("remove");
        let second = {
            let provider = Arc::clone(&provider);
            thread::spawn(move || provider.refresh())
        };
        thread::sleep(Duration::from_millis(100));
        assert!(
            !second.is_finished(),
            "second reconciliation must wait for the first publication"
        );

        release_tx.send(()).expect("release first");
        release_tx.send(()).expect("release second");

        let first = first.join().expect("first refresh");
        let second = second.join().expect("second refresh");
        assert!(first.resources().any(|r| r.id() == "B.dialog"));
        assert_eq!(second.removed().map(|id| id.as_str()).collect::<Vec<_>>(), vec!["B.dialog"]);

        let order: Vec<_> = entered_rx.try_iter().collect();
        assert_eq!(order.len(), 1);
        assert_eq!(order[0], second);
        assert!(provider.get_resource("B.dialog").is_none());
    }

    #[test]
    fn test_dispose_is_idempotent_and_silences() {
        let fx = Fixture::new();
        fx.write("A.dialog", "{}");

        let provider = FolderResourceProvider::builder(fx.root())
            .build_snapshot()
            .expect("build");
        let (handler, mut rx) = channel_handler();
        provider.subscribe(handler);

        provider.dispose();
        provider.dispose();
        assert!(provider.is_disposed());

        fx.write("B.dialog", "{}");
        let delta = provider.refresh();
        assert!(delta.contains("B.dialog"));
        assert!(rx.try_recv().is_err(), "disposed provider publishes nothing");
    }

    #[tokio::test]
    async fn test_monitored_provider_publishes_create() {
        let fx = Fixture::new();
        fx.write("Existing.dialog", "{}");

        let provider = FolderResourceProvider::builder(fx.root())
            .monitor_changes(true)
            .watch_config(WatchConfig {
                debounce_ms: 50,
                ..WatchConfig::default()
            })
            .build()
            .await
            .expect("build");
        assert!(provider.monitors_changes());

        let (handler, mut rx) = channel_handler();
        provider.subscribe(handler);

        fx.write("Created.dialog", "{}");

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.expect("handler alive");
                if event.contains("Created.dialog") {
                    break event;
                }
            }
        })
        .await
        .expect("no change event within timeout");

        assert_eq!(event.provider, provider.id());
        assert!(provider.get_resource("Created.dialog").is_some());
        assert!(provider.get_resource("Existing.dialog").is_some());
    }

    #[tokio::test]
    async fn test_monitored_provider_keeps_temp_files_when_configured() {
        let fx = Fixture::new();
        fx.write("Data.tmp", "cache");

        let provider = FolderResourceProvider::builder(fx.root())
            .monitor_changes(true)
            .scan_config(ScanConfig {
                ignore_editor_temp_files: false,
                ..ScanConfig::default()
            })
            .watch_config(WatchConfig {
                debounce_ms: 50,
                ..WatchConfig::default()
            })
            .build()
            .await
            .expect("build");
        assert!(provider.get_resource("Data.tmp").is_some());

        let (handler, mut rx) = channel_handler();
        provider.subscribe(handler);

        fs::remove_file(fx.root().join("Data.tmp")).expect("remove");

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.expect("handler alive");
                if event.removed().any(|id| id == "Data.tmp") {
                    break;
                }
            }
        })
        .await
        .expect("no removal event within timeout");

        assert!(provider.get_resource("Data.tmp").is_none());
    }

    #[tokio::test]
    async fn test_monitored_build_rejects_invalid_watch_config() {
        let fx = Fixture::new();
        fx.write("Main.dialog", "{}");

        for watch in [
            WatchConfig {
                channel_capacity: 0,
                ..WatchConfig::default()
            },
            WatchConfig {
                debounce_ms: 0,
                ..WatchConfig::default()
            },
        ] {
            let err = FolderResourceProvider::builder(fx.root())
                .monitor_changes(true)
                .watch_config(watch)
                .build()
                .await
                .expect_err("invalid watch options");
            assert!(matches!(err, ProviderError::Config(_)));
            assert!(err.is_fatal());
        }

        // Static providers never start a watch, so the options are unused.
        let provider = FolderResourceProvider::builder(fx.root())
            .watch_config(WatchConfig {
                channel_capacity: 0,
                ..WatchConfig::default()
            })
            .build()
            .await
            .expect("snapshot ignores watch options");
        assert_eq!(provider.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_monitored_build_missing_root() {
        let fx = Fixture::new();
        let err = FolderResourceProvider::builder(fx.root().join("missing"))
            .monitor_changes(true)
            .build()
            .await
            .expect_err("missing root");
        assert!(matches!(err, ProviderError::Scan(_)));
    }

    #[test]
    fn test_builder_from_config() {
        let mut folder = FolderConfig::new("defs");
        folder.include_subfolders = false;
        folder.monitor_changes = true;

        let builder = FolderProviderBuilder::from_config(&folder);
        assert_eq!(builder.root().as_str(), "defs");
        assert!(!builder.include_subfolders);
        assert!(builder.monitor_changes);
    }
}

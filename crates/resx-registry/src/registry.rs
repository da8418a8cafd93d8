//! The aggregating resource registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use camino::Utf8PathBuf;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use resx_core::{
    Config, ProviderId, Resource, ResourceChange, ResourcesChanged, ScanConfig, WatchConfig,
};

use crate::error::{ProviderError, RegistryError};
use crate::folder::{FolderProviderBuilder, FolderResourceProvider};
use crate::handlers::{ChangeHandler, ChangeHandlers, SubscriptionId};
use crate::provider::ResourceProvider;

struct Registered {
    provider: Arc<dyn ResourceProvider>,
    subscription: Option<SubscriptionId>,
}

struct RegistryInner {
    providers: RwLock<Vec<Registered>>,
    handlers: ChangeHandlers,
    disposed: AtomicBool,
}

impl RegistryInner {
    fn snapshot(&self) -> Vec<Arc<dyn ResourceProvider>> {
        self.providers
            .read()
            .iter()
            .map(|r| Arc::clone(&r.provider))
            .collect()
    }

    fn get_resource(&self, id: &str) -> Option<Resource> {
        self.snapshot().iter().find_map(|p| p.get_resource(id))
    }

    /// Re-resolves a provider's delta through every provider and fires it.
    fn republish(&self, event: &ResourcesChanged) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let mut resolved = ResourcesChanged::new(event.provider);
        for id in event.ids() {
            let change = match self.get_resource(id.as_str()) {
                Some(resource) => ResourceChange::changed(resource),
                None => ResourceChange::removed(id.clone()),
            };
            resolved.push(change);
        }

        debug!(
            provider = %event.provider,
            changes = resolved.len(),
            handlers = self.handlers.len(),
            "dispatching registry change event"
        );
        self.handlers.dispatch(&resolved);
    }
}

/// Merges several providers into one queryable view.
///
/// Point queries ask providers in registration order and return the first
/// match; category queries concatenate every provider's answer. Nothing is
/// cached: each query reads the providers' current indexes.
///
/// Dropping the registry disposes it.
///
/// # Examples
///
/// ```no_run
/// use resx_registry::ResourceRegistry;
///
/// # async fn example() -> Result<(), resx_registry::RegistryError> {
/// let registry = ResourceRegistry::new();
/// registry.add_folder("./defs", true, true).await?;
///
/// let subscription = registry.on_changed(|event| {
///     for id in event.ids() {
///         println!("changed: {id}");
///     }
/// });
///
/// if let Some(main) = registry.get_resource("Main.dialog") {
///     println!("{}", main.read_text().unwrap_or_default());
/// }
///
/// registry.off_changed(subscription);
/// registry.dispose();
/// # Ok(())
/// # }
/// ```
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
    scan: ScanConfig,
    watch: WatchConfig,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// Creates an empty registry with default folder settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default(), WatchConfig::default())
    }

    /// Creates an empty registry whose folders use the given settings.
    #[must_use]
    pub fn with_config(scan: ScanConfig, watch: WatchConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                providers: RwLock::new(Vec::new()),
                handlers: ChangeHandlers::new(),
                disposed: AtomicBool::new(false),
            }),
            scan,
            watch,
        }
    }

    /// Creates a registry and adds every configured folder in order.
    ///
    /// # Errors
    ///
    /// Returns the first folder that could not be added.
    pub async fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let registry = Self::with_config(config.scan.clone(), config.watch);
        for folder in &config.folders {
            let builder = FolderProviderBuilder::from_config(folder)
                .scan_config(config.scan.clone())
                .watch_config(config.watch);
            registry.add_folder_with(builder).await?;
        }
        Ok(registry)
    }

    /// Appends a provider and forwards its change notifications.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Disposed`] after [`dispose`](Self::dispose).
    pub fn add_provider<P: ResourceProvider>(
        &self,
        provider: P,
    ) -> Result<ProviderId, RegistryError> {
        self.add_shared_provider(Arc::new(provider))
    }

    /// Appends a provider that is also held elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Disposed`] after [`dispose`](Self::dispose).
    pub fn add_shared_provider(
        &self,
        provider: Arc<dyn ResourceProvider>,
    ) -> Result<ProviderId, RegistryError> {
        if self.is_disposed() {
            return Err(RegistryError::Disposed);
        }

        let weak: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        let forward: ChangeHandler = Arc::new(move |event: &ResourcesChanged| {
            if let Some(inner) = weak.upgrade() {
                inner.republish(event);
            }
        });
        let subscription = provider.subscribe(forward);

        let id = provider.id();
        let mut providers = self.inner.providers.write();
        providers.push(Registered {
            provider,
            subscription,
        });
        debug!(provider = %id, position = providers.len() - 1, "provider registered");
        Ok(id)
    }

    /// Builds and registers a folder provider.
    ///
    /// If the folder cannot be watched it is registered as a static snapshot
    /// and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Provider`] if the folder is missing or cannot
    /// be scanned, and [`RegistryError::Disposed`] after
    /// [`dispose`](Self::dispose).
    pub async fn add_folder(
        &self,
        path: impl Into<Utf8PathBuf>,
        include_subfolders: bool,
        monitor_changes: bool,
    ) -> Result<ProviderId, RegistryError> {
        let builder = FolderProviderBuilder::new(path)
            .include_subfolders(include_subfolders)
            .monitor_changes(monitor_changes)
            .scan_config(self.scan.clone())
            .watch_config(self.watch);
        self.add_folder_with(builder).await
    }

    /// Builds and registers a folder provider from a configured builder.
    ///
    /// # Errors
    ///
    /// Same as [`add_folder`](Self::add_folder).
    pub async fn add_folder_with(
        &self,
        builder: FolderProviderBuilder,
    ) -> Result<ProviderId, RegistryError> {
        if self.is_disposed() {
            return Err(RegistryError::Disposed);
        }

        let built = builder.clone().build().await;
        let provider = snapshot_on_watch_failure(builder, built)?;
        self.add_provider(provider)
    }

    /// Unregisters a provider and disposes it.
    ///
    /// Returns `false` if no provider has this id.
    pub fn remove_provider(&self, id: ProviderId) -> bool {
        let removed = {
            let mut providers = self.inner.providers.write();
            let Some(position) = providers.iter().position(|r| r.provider.id() == id) else {
                return false;
            };
            providers.remove(position)
        };

        if let Some(subscription) = removed.subscription {
            removed.provider.unsubscribe(subscription);
        }
        removed.provider.dispose();
        debug!(provider = %id, "provider removed");
        true
    }

    /// Returns the resource with this id from the first provider reporting it.
    #[must_use]
    pub fn get_resource(&self, id: &str) -> Option<Resource> {
        self.inner.get_resource(id)
    }

    /// Returns every provider's resources of a category, in registration
    /// order. Identifiers reported by several providers appear once each.
    #[must_use]
    pub fn get_resources(&self, category: &str) -> Vec<Resource> {
        self.inner
            .snapshot()
            .iter()
            .flat_map(|p| p.get_resources(category))
            .collect()
    }

    /// Returns every provider's resources, in registration order.
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        self.inner
            .snapshot()
            .iter()
            .flat_map(|p| p.resources())
            .collect()
    }

    /// Returns the number of resources across all providers, duplicates
    /// included.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.inner
            .snapshot()
            .iter()
            .map(|p| p.resource_count())
            .sum()
    }

    /// Returns the registered providers in order.
    #[must_use]
    pub fn providers(&self) -> Vec<Arc<dyn ResourceProvider>> {
        self.inner.snapshot()
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.inner.providers.read().len()
    }

    /// Registers a handler for change events.
    pub fn on_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ResourcesChanged) + Send + Sync + 'static,
    {
        self.inner.handlers.add(Arc::new(handler))
    }

    /// Removes a change handler. Returns `false` if it was not registered.
    pub fn off_changed(&self, id: SubscriptionId) -> bool {
        self.inner.handlers.remove(id)
    }

    /// Returns `true` once [`dispose`](Self::dispose) was called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Disposes every provider and stops all change events.
    ///
    /// Idempotent. Providers stay queryable as static snapshots. Safe to call
    /// from inside a change handler.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let registered: Vec<(Arc<dyn ResourceProvider>, Option<SubscriptionId>)> = self
            .inner
            .providers
            .read()
            .iter()
            .map(|r| (Arc::clone(&r.provider), r.subscription))
            .collect();

        for (provider, subscription) in &registered {
            if let Some(subscription) = subscription {
                provider.unsubscribe(*subscription);
            }
            provider.dispose();
        }
        self.inner.handlers.clear();

        info!(providers = registered.len(), "resource registry disposed");
    }
}

/// Falls back to a static snapshot when only the native watch failed.
fn snapshot_on_watch_failure(
    builder: FolderProviderBuilder,
    built: Result<FolderResourceProvider, ProviderError>,
) -> Result<FolderResourceProvider, ProviderError> {
    match built {
        Err(ProviderError::WatchSetup(e)) => {
            warn!(
                path = %builder.root(),
                error = %e,
                "cannot watch folder, registering a static snapshot"
            );
            builder.build_snapshot()
        }
        other => other,
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("providers", &self.provider_count())
            .field("handlers", &self.inner.handlers.len())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use resx_core::ResourceId;

    /// An in-memory provider that publishes on demand.
    struct MemoryProvider {
        id: ProviderId,
        items: RwLock<Vec<Resource>>,
        handlers: ChangeHandlers,
        disposed: AtomicBool,
    }

    impl MemoryProvider {
        fn new(names: &[&str]) -> Arc<Self> {
            let id = ProviderId::next();
            let items = names
                .iter()
                .map(|name| {
                    Resource::new(
                        ResourceId::new(*name),
                        Utf8PathBuf::from(format!("/mem{}/{name}", id.as_u64())),
                        id,
                    )
                })
                .collect();
            Arc::new(Self {
                id,
                items: RwLock::new(items),
                handlers: ChangeHandlers::new(),
                disposed: AtomicBool::new(false),
            })
        }

        fn remove(&self, name: &str) {
            self.items.write().retain(|r| r.id() != name);
            self.publish(ResourceChange::removed(ResourceId::new(name)));
        }

        fn publish(&self, change: ResourceChange) {
            if !self.disposed.load(Ordering::Acquire) {
                self.handlers
                    .dispatch(&ResourcesChanged::from_changes(self.id, [change]));
            }
        }
    }

    impl ResourceProvider for MemoryProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn get_resource(&self, id: &str) -> Option<Resource> {
            self.items.read().iter().find(|r| r.id() == id).cloned()
        }

        fn get_resources(&self, category: &str) -> Vec<Resource> {
            self.items
                .read()
                .iter()
                .filter(|r| r.matches_category(category))
                .cloned()
                .collect()
        }

        fn resources(&self) -> Vec<Resource> {
            self.items.read().clone()
        }

        fn subscribe(&self, handler: ChangeHandler) -> Option<SubscriptionId> {
            Some(self.handlers.add(handler))
        }

        fn unsubscribe(&self, id: SubscriptionId) -> bool {
            self.handlers.remove(id)
        }

        fn dispose(&self) {
            self.disposed.store(true, Ordering::Release);
        }
    }

    /// A provider using every trait default.
    struct StaticProvider(ProviderId);

    impl ResourceProvider for StaticProvider {
        fn id(&self) -> ProviderId {
            self.0
        }

        fn get_resource(&self, _id: &str) -> Option<Resource> {
            None
        }

        fn get_resources(&self, _category: &str) -> Vec<Resource> {
            Vec::new()
        }

        fn resources(&self) -> Vec<Resource> {
            Vec::new()
        }
    }

    fn add(registry: &ResourceRegistry, provider: &Arc<MemoryProvider>) -> ProviderId {
        let shared: Arc<dyn ResourceProvider> = Arc::<MemoryProvider>::clone(provider);
        registry.add_shared_provider(shared).expect("add provider")
    }

    fn recording(registry: &ResourceRegistry) -> Arc<Mutex<Vec<ResourcesChanged>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        registry.on_changed(move |event| sink.lock().push(event.clone()));
        events
    }

    #[test]
    fn test_first_provider_wins() {
        let first = MemoryProvider::new(&["Shared.dialog", "First.dialog"]);
        let second = MemoryProvider::new(&["Shared.dialog", "Second.schema"]);

        let registry = ResourceRegistry::new();
        add(&registry, &first);
        add(&registry, &second);

        let shared = registry.get_resource("Shared.dialog").expect("shared");
        assert_eq!(shared.provider(), first.id);
        assert_eq!(
            registry.get_resource("Second.schema").map(|r| r.provider()),
            Some(second.id)
        );
        assert!(registry.get_resource("Missing.dialog").is_none());
    }

    #[test]
    fn test_get_resources_concatenates_in_order() {
        let first = MemoryProvider::new(&["Shared.dialog", "First.dialog"]);
        let second = MemoryProvider::new(&["Shared.dialog", "Second.schema"]);

        let registry = ResourceRegistry::new();
        add(&registry, &first);
        add(&registry, &second);

        let dialogs: Vec<_> = registry
            .get_resources("dialog")
            .iter()
            .map(|r| (r.id().to_string(), r.provider()))
            .collect();
        assert_eq!(
            dialogs,
            vec![
                ("Shared.dialog".to_owned(), first.id),
                ("First.dialog".to_owned(), first.id),
                ("Shared.dialog".to_owned(), second.id),
            ]
        );
        assert_eq!(registry.resource_count(), 4);
        assert_eq!(registry.resources().len(), 4);
        assert_eq!(registry.provider_count(), 2);
    }

    #[test]
    fn test_change_is_resolved_through_registry() {
        let first = MemoryProvider::new(&["Shared.dialog"]);
        let second = MemoryProvider::new(&["Shared.dialog", "Own.dialog"]);

        let registry = ResourceRegistry::new();
        add(&registry, &first);
        add(&registry, &second);
        let events = recording(&registry);

        // The first provider still reports Shared.dialog, so the registry
        // reports it changed, resolved to the first provider's file.
        second.remove("Shared.dialog");
        second.remove("Own.dialog");

        let events = events.lock();
        assert_eq!(events.len(), 2);

        let shared = &events[0];
        assert_eq!(shared.provider, second.id);
        let resource = shared.resources().next().expect("still present");
        assert_eq!(resource.provider(), first.id);

        let own = &events[1];
        assert_eq!(
            own.removed().map(ResourceId::as_str).collect::<Vec<_>>(),
            vec!["Own.dialog"]
        );
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let provider = MemoryProvider::new(&["A.dialog"]);
        let registry = ResourceRegistry::new();
        add(&registry, &provider);

        registry.on_changed(|_| panic!("subscriber failed"));
        let events = recording(&registry);

        provider.remove("A.dialog");
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn test_off_changed() {
        let provider = MemoryProvider::new(&["A.dialog", "B.dialog"]);
        let registry = ResourceRegistry::new();
        add(&registry, &provider);

        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let sub = registry.on_changed(move |_| *counter.lock() += 1);

        provider.remove("A.dialog");
        assert!(registry.off_changed(sub));
        assert!(!registry.off_changed(sub));
        provider.remove("B.dialog");

        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_dispose() {
        let provider = MemoryProvider::new(&["A.dialog"]);
        let registry = ResourceRegistry::new();
        add(&registry, &provider);
        let events = recording(&registry);

        registry.dispose();
        registry.dispose();
        assert!(registry.is_disposed());
        assert!(provider.disposed.load(Ordering::Acquire));
        assert!(provider.handlers.is_empty(), "registry unsubscribed");

        // Snapshots stay queryable.
        assert!(registry.get_resource("A.dialog").is_some());

        provider.handlers.dispatch(&ResourcesChanged::new(provider.id));
        assert!(events.lock().is_empty());

        let err = registry
            .add_provider(StaticProvider(ProviderId::next()))
            .expect_err("disposed");
        assert!(matches!(err, RegistryError::Disposed));
    }

    #[test]
    fn test_dispose_from_handler() {
        let provider = MemoryProvider::new(&["A.dialog"]);
        let registry = Arc::new(ResourceRegistry::new());
        add(&registry, &provider);

        let weak = Arc::downgrade(&registry);
        registry.on_changed(move |_| {
            if let Some(registry) = weak.upgrade() {
                registry.dispose();
            }
        });

        provider.remove("A.dialog");
        assert!(registry.is_disposed());
    }

    #[test]
    fn test_static_provider_defaults() {
        let registry = ResourceRegistry::new();
        let id = ProviderId::next();
        assert_eq!(registry.add_provider(StaticProvider(id)).expect("add"), id);

        let providers = registry.providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id(), id);
        assert_eq!(providers[0].resource_count(), 0);
    }

    #[test]
    fn test_remove_provider() {
        let first = MemoryProvider::new(&["Shared.dialog"]);
        let second = MemoryProvider::new(&["Shared.dialog"]);

        let registry = ResourceRegistry::new();
        add(&registry, &first);
        add(&registry, &second);

        assert!(registry.remove_provider(first.id));
        assert!(!registry.remove_provider(first.id));
        assert!(first.disposed.load(Ordering::Acquire));
        assert_eq!(
            registry.get_resource("Shared.dialog").map(|r| r.provider()),
            Some(second.id)
        );
    }

    #[test]
    fn test_watch_failure_falls_back_to_snapshot() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(dir.path().to_owned()).expect("UTF-8 temp path");
        std::fs::write(root.join("Main.dialog"), "{}").expect("write");

        let builder = FolderProviderBuilder::new(&root).monitor_changes(true);
        let failed = Err(ProviderError::from(resx_watcher::WatchError::ChannelClosed));
        let provider =
            snapshot_on_watch_failure(builder.clone(), failed).expect("degraded provider");
        assert!(!provider.monitors_changes());
        assert!(provider.get_resource("Main.dialog").is_some());

        let registry = ResourceRegistry::new();
        registry.add_provider(provider).expect("add degraded provider");
        assert_eq!(registry.resource_count(), 1);

        let missing = FolderProviderBuilder::new(root.join("missing"));
        let failed = Err(ProviderError::from(resx_watcher::WatchError::ChannelClosed));
        let err = snapshot_on_watch_failure(missing, failed).expect_err("snapshot needs the root");
        assert!(matches!(err, ProviderError::Scan(_)));
    }

    #[test]
    fn test_other_build_errors_are_not_masked() {
        let builder = FolderProviderBuilder::new("/nonexistent/resx/defs");
        let failed = Err(ProviderError::from(resx_core::ConfigError::invalid_option(
            "watch.channel_capacity",
            "must be greater than zero",
        )));
        let err = snapshot_on_watch_failure(builder, failed).expect_err("config error kept");
        assert!(matches!(err, ProviderError::Config(_)));
    }

    #[tokio::test]
    async fn test_add_folder_missing_root() {
        let registry = ResourceRegistry::new();
        let err = registry
            .add_folder("/nonexistent/resx/defs", true, false)
            .await
            .expect_err("missing root");
        assert!(matches!(err, RegistryError::Provider(ProviderError::Scan(_))));
        assert_eq!(registry.provider_count(), 0);
    }
}

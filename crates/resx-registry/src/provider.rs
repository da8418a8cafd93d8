//! The resource provider capability.

use std::sync::Arc;

use resx_core::{ProviderId, Resource};

use crate::handlers::{ChangeHandler, SubscriptionId};

/// A source contributing resources to a registry.
///
/// Queries are total: absence is `None` or an empty list, never an error.
/// Providers that can detect changes override [`subscribe`](Self::subscribe)
/// and [`unsubscribe`](Self::unsubscribe); the defaults describe a static
/// provider that never publishes.
///
/// # Examples
///
/// ```
/// use resx_core::{ProviderId, Resource, ResourceId};
/// use resx_registry::ResourceProvider;
///
/// struct Fixed {
///     id: ProviderId,
///     items: Vec<Resource>,
/// }
///
/// impl ResourceProvider for Fixed {
///     fn id(&self) -> ProviderId {
///         self.id
///     }
///
///     fn get_resource(&self, id: &str) -> Option<Resource> {
///         self.items.iter().find(|r| r.id() == id).cloned()
///     }
///
///     fn get_resources(&self, category: &str) -> Vec<Resource> {
///         self.items.iter().filter(|r| r.matches_category(category)).cloned().collect()
///     }
///
///     fn resources(&self) -> Vec<Resource> {
///         self.items.clone()
///     }
/// }
/// ```
pub trait ResourceProvider: Send + Sync + 'static {
    /// Returns the process-unique id stamped on this provider's resources.
    fn id(&self) -> ProviderId;

    /// Returns the resource with exactly this identifier.
    fn get_resource(&self, id: &str) -> Option<Resource>;

    /// Returns the resources of a category, sorted by id.
    ///
    /// The category is matched ASCII case-insensitively, with or without a
    /// leading dot.
    fn get_resources(&self, category: &str) -> Vec<Resource>;

    /// Returns every reported resource, sorted by id.
    fn resources(&self) -> Vec<Resource>;

    /// Returns the number of reported resources.
    fn resource_count(&self) -> usize {
        self.resources().len()
    }

    /// Registers a change handler.
    ///
    /// Returns `None` if this provider never publishes changes.
    fn subscribe(&self, _handler: ChangeHandler) -> Option<SubscriptionId> {
        None
    }

    /// Removes a change handler. Returns `false` if it was not registered.
    fn unsubscribe(&self, _id: SubscriptionId) -> bool {
        false
    }

    /// Releases watch handles. After this returns no change is published.
    ///
    /// Must be idempotent.
    fn dispose(&self) {}
}

impl<P: ResourceProvider + ?Sized> ResourceProvider for Arc<P> {
    fn id(&self) -> ProviderId {
        (**self).id()
    }

    fn get_resource(&self, id: &str) -> Option<Resource> {
        (**self).get_resource(id)
    }

    fn get_resources(&self, category: &str) -> Vec<Resource> {
        (**self).get_resources(category)
    }

    fn resources(&self) -> Vec<Resource> {
        (**self).resources()
    }

    fn resource_count(&self) -> usize {
        (**self).resource_count()
    }

    fn subscribe(&self, handler: ChangeHandler) -> Option<SubscriptionId> {
        (**self).subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }

    fn dispose(&self) {
        (**self).dispose();
    }
}

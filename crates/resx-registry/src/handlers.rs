//! Change handler lists with per-handler failure isolation.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use resx_core::ResourcesChanged;
use tracing::error;

/// A callback invoked with every published change set.
pub type ChangeHandler = Arc<dyn Fn(&ResourcesChanged) + Send + Sync>;

/// Identifies one registered [`ChangeHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the inner u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// An ordered list of change handlers.
///
/// Every dispatch snapshots the list first, so handlers may subscribe or
/// unsubscribe (including themselves) while a dispatch is running. A handler
/// that panics is logged and skipped; later handlers still run.
///
/// # Examples
///
/// ```
/// use resx_core::{ProviderId, ResourcesChanged};
/// use resx_registry::ChangeHandlers;
/// use std::sync::Arc;
///
/// let handlers = ChangeHandlers::new();
/// let id = handlers.add(Arc::new(|event: &ResourcesChanged| {
///     println!("{} changes", event.len());
/// }));
///
/// assert_eq!(handlers.dispatch(&ResourcesChanged::new(ProviderId::next())), 1);
/// assert!(handlers.remove(id));
/// ```
#[derive(Default)]
pub struct ChangeHandlers {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, ChangeHandler)>>,
}

impl ChangeHandlers {
    /// Creates an empty handler list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler and returns its subscription id.
    pub fn add(&self, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    /// Removes a handler. Returns `false` if `id` was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(candidate, _)| *candidate != id);
        handlers.len() != before
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Invokes every handler in registration order.
    ///
    /// Returns the number of handlers that completed without panicking.
    pub fn dispatch(&self, event: &ResourcesChanged) -> usize {
        let snapshot: Vec<(SubscriptionId, ChangeHandler)> = self
            .handlers
            .read()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        subscription = %id,
                        provider = %event.provider,
                        panic = panic_message(payload.as_ref()),
                        "change handler panicked"
                    );
                }
            }
        }
        delivered
    }
}

impl fmt::Debug for ChangeHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHandlers")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use resx_core::ProviderId;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> ChangeHandler {
        let log = Arc::clone(log);
        Arc::new(move |_event: &ResourcesChanged| log.lock().push(name))
    }

    fn event() -> ResourcesChanged {
        ResourcesChanged::new(ProviderId::next())
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = ChangeHandlers::new();
        handlers.add(recorder(&log, "first"));
        handlers.add(recorder(&log, "second"));
        handlers.add(recorder(&log, "third"));

        assert_eq!(handlers.dispatch(&event()), 3);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = ChangeHandlers::new();
        let first = handlers.add(recorder(&log, "first"));
        handlers.add(recorder(&log, "second"));

        assert!(handlers.remove(first));
        assert!(!handlers.remove(first), "second removal is a no-op");
        assert_eq!(handlers.len(), 1);

        handlers.dispatch(&event());
        assert_eq!(*log.lock(), vec!["second"]);
    }

    #[test]
    fn test_ids_are_unique() {
        let handlers = ChangeHandlers::new();
        let a = handlers.add(Arc::new(|_: &ResourcesChanged| {}));
        let b = handlers.add(Arc::new(|_: &ResourcesChanged| {}));
        assert_ne!(a, b);
        assert_eq!(a.to_string(), format!("sub#{}", a.as_u64()));
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = ChangeHandlers::new();
        handlers.add(Arc::new(|_: &ResourcesChanged| panic!("subscriber failed")));
        handlers.add(recorder(&log, "after"));

        assert_eq!(handlers.dispatch(&event()), 1);
        assert_eq!(*log.lock(), vec!["after"]);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let handlers = Arc::new(ChangeHandlers::new());
        let calls = Arc::new(Mutex::new(0));
        let own_id = Arc::new(Mutex::new(None));

        let id = {
            let inner = Arc::clone(&handlers);
            let calls = Arc::clone(&calls);
            let own_id = Arc::clone(&own_id);
            handlers.add(Arc::new(move |_: &ResourcesChanged| {
                *calls.lock() += 1;
                let own = *own_id.lock();
                if let Some(id) = own {
                    inner.remove(id);
                }
            }))
        };
        *own_id.lock() = Some(id);

        handlers.dispatch(&event());
        handlers.dispatch(&event());
        assert_eq!(*calls.lock(), 1);
        assert!(handlers.is_empty());
    }

    #[test]
    fn test_clear() {
        let handlers = ChangeHandlers::new();
        handlers.add(Arc::new(|_: &ResourcesChanged| {}));
        handlers.clear();
        assert!(handlers.is_empty());
        assert_eq!(handlers.dispatch(&event()), 0);
    }

    #[test]
    fn test_panic_message() {
        let text: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(text.as_ref()), "boom");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(owned.as_ref()), "owned boom");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}

//! Change notifications published by providers and the registry.
//!
//! # Event Flow
//!
//! ```text
//! raw file events
//!        │
//!        ▼
//!   debounced batch of touched paths
//!        │
//!        ▼
//!   index reconciliation ──► ResourcesChanged { provider, changes }
//!        │
//!        ▼
//!   registry re-resolves ids ──► subscribers
//! ```

use serde::Serialize;
use smallvec::SmallVec;

use super::id::{ProviderId, ResourceId};
use super::resource::Resource;

/// The final state of one identifier after a debounce window.
///
/// Present identifiers carry the resource that now answers for them; absent
/// ones carry only a tombstone id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceChange {
    /// The identifier was added or its content changed.
    Changed {
        /// The resource now reported for the identifier.
        resource: Resource,
    },

    /// The identifier is no longer reported.
    Removed {
        /// The identifier that disappeared.
        id: ResourceId,
    },
}

impl ResourceChange {
    /// Creates a [`ResourceChange::Changed`] entry.
    #[inline]
    #[must_use]
    pub const fn changed(resource: Resource) -> Self {
        Self::Changed { resource }
    }

    /// Creates a [`ResourceChange::Removed`] entry.
    #[inline]
    #[must_use]
    pub const fn removed(id: ResourceId) -> Self {
        Self::Removed { id }
    }

    /// Returns the identifier this change refers to.
    #[must_use]
    pub const fn id(&self) -> &ResourceId {
        match self {
            Self::Changed { resource } => resource.id(),
            Self::Removed { id } => id,
        }
    }

    /// Returns the resource for present identifiers.
    #[must_use]
    pub const fn resource(&self) -> Option<&Resource> {
        match self {
            Self::Changed { resource } => Some(resource),
            Self::Removed { .. } => None,
        }
    }

    /// Returns `true` for tombstones.
    #[inline]
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// One change notification: the delta of a single provider flush.
///
/// Holds at most one entry per identifier.
///
/// # Examples
///
/// ```
/// use resx_core::{ProviderId, Resource, ResourceChange, ResourceId, ResourcesChanged};
/// use camino::Utf8PathBuf;
///
/// let provider = ProviderId::next();
/// let resource = Resource::from_path(Utf8PathBuf::from("/defs/New.dialog"), provider).unwrap();
///
/// let mut event = ResourcesChanged::new(provider);
/// event.push(ResourceChange::changed(resource));
/// event.push(ResourceChange::removed(ResourceId::new("Old.dialog")));
///
/// assert!(event.contains("New.dialog"));
/// assert!(event.contains("Old.dialog"));
/// assert_eq!(event.resources().count(), 1);
/// assert_eq!(event.removed().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourcesChanged {
    /// The provider whose flush produced this notification.
    pub provider: ProviderId,

    /// The per-identifier changes.
    pub changes: SmallVec<[ResourceChange; 4]>,
}

impl ResourcesChanged {
    /// Creates an empty notification for `provider`.
    #[inline]
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            changes: SmallVec::new(),
        }
    }

    /// Creates a notification from a list of changes.
    #[must_use]
    pub fn from_changes(
        provider: ProviderId,
        changes: impl IntoIterator<Item = ResourceChange>,
    ) -> Self {
        let mut event = Self::new(provider);
        for change in changes {
            event.push(change);
        }
        event
    }

    /// Adds a change, replacing any earlier entry for the same identifier.
    pub fn push(&mut self, change: ResourceChange) {
        if let Some(existing) = self.changes.iter_mut().find(|c| c.id() == change.id()) {
            *existing = change;
        } else {
            self.changes.push(change);
        }
    }

    /// Returns the number of identifiers in this notification.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if nothing changed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns an iterator over all changes.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ResourceChange> {
        self.changes.iter()
    }

    /// Returns every identifier touched, present or removed.
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.changes.iter().map(ResourceChange::id)
    }

    /// Returns the resources that are present after the change.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.changes.iter().filter_map(ResourceChange::resource)
    }

    /// Returns the identifiers that disappeared.
    pub fn removed(&self) -> impl Iterator<Item = &ResourceId> {
        self.changes
            .iter()
            .filter(|c| c.is_removed())
            .map(ResourceChange::id)
    }

    /// Returns `true` if the notification mentions `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids().any(|candidate| candidate.as_str() == id)
    }
}

impl<'a> IntoIterator for &'a ResourcesChanged {
    type Item = &'a ResourceChange;
    type IntoIter = std::slice::Iter<'a, ResourceChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn resource(path: &str, provider: ProviderId) -> Resource {
        Resource::from_path(Utf8PathBuf::from(path), provider).expect("file name")
    }

    #[test]
    fn test_push_keeps_final_state_per_id() {
        let provider = ProviderId::next();
        let mut event = ResourcesChanged::new(provider);

        event.push(ResourceChange::changed(resource("/a/X.dialog", provider)));
        event.push(ResourceChange::removed(ResourceId::new("X.dialog")));

        assert_eq!(event.len(), 1);
        assert_eq!(event.removed().count(), 1);
        assert_eq!(event.resources().count(), 0);
    }

    #[test]
    fn test_from_changes() {
        let provider = ProviderId::next();
        let event = ResourcesChanged::from_changes(
            provider,
            [
                ResourceChange::changed(resource("/a/A.dialog", provider)),
                ResourceChange::changed(resource("/a/B.schema", provider)),
            ],
        );

        let ids: Vec<_> = event.ids().map(ResourceId::as_str).collect();
        assert_eq!(ids, vec!["A.dialog", "B.schema"]);
        assert!(!event.is_empty());
        assert!(!event.contains("C.dialog"));
    }

    #[test]
    fn test_change_accessors() {
        let provider = ProviderId::next();
        let changed = ResourceChange::changed(resource("/a/A.dialog", provider));
        assert!(!changed.is_removed());
        assert_eq!(changed.id().as_str(), "A.dialog");
        assert!(changed.resource().is_some());

        let removed = ResourceChange::removed(ResourceId::new("A.dialog"));
        assert!(removed.is_removed());
        assert!(removed.resource().is_none());
    }

    #[test]
    fn test_change_serialization() {
        let removed = ResourceChange::removed(ResourceId::new("A.dialog"));
        let json = serde_json::to_string(&removed).expect("serialize");
        assert_eq!(json, r#"{"kind":"removed","id":"A.dialog"}"#);
    }
}

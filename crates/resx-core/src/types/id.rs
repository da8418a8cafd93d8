//! Identifier types for resources and providers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

/// The identifier of a resource: its file base name including extension.
///
/// Identifiers are case-sensitive (`"Main.dialog"` and `"main.dialog"` are
/// different resources) while category matching on the extension is not.
///
/// # Examples
///
/// ```
/// use resx_core::ResourceId;
///
/// let id = ResourceId::new("Greeting.dialog");
/// assert_eq!(id.category(), Some("dialog"));
/// assert!(id.matches_category("DIALOG"));
/// assert!(id.matches_category(".dialog"));
/// assert!(!id.matches_category("schema"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates an identifier from any string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an identifier from the file name of `path`.
    ///
    /// Returns `None` for paths without a file name (`"/"`, `".."`).
    ///
    /// ```
    /// use resx_core::ResourceId;
    /// use camino::Utf8Path;
    ///
    /// let id = ResourceId::from_path(Utf8Path::new("dialogs/sub/Main.dialog"));
    /// assert_eq!(id.as_ref().map(ResourceId::as_str), Some("Main.dialog"));
    /// ```
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        path.file_name().map(Self::new)
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the category: the text after the last dot.
    ///
    /// `None` when the identifier has no dot or ends with one.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// Returns `true` if the identifier ends with `.<category>`, ignoring
    /// ASCII case. A leading dot on `category` is ignored.
    #[must_use]
    pub fn matches_category(&self, category: &str) -> bool {
        let category = normalize_category(category);
        if category.is_empty() {
            return false;
        }

        let id = self.0.as_bytes();
        let cat = category.as_bytes();
        if id.len() <= cat.len() {
            return false;
        }

        let dot = id.len() - cat.len() - 1;
        id[dot] == b'.' && id[dot + 1..].eq_ignore_ascii_case(cat)
    }
}

/// Strips a single leading dot so `".dialog"` and `"dialog"` name the same
/// category.
#[inline]
#[must_use]
pub fn normalize_category(category: &str) -> &str {
    category.strip_prefix('.').unwrap_or(category)
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ResourceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Source of process-unique provider identifiers.
static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque, process-unique identifier for a resource provider.
///
/// Resources carry the id of the provider that reported them instead of an
/// owning reference, so a resource handle never keeps a provider alive.
///
/// # Examples
///
/// ```
/// use resx_core::ProviderId;
///
/// let a = ProviderId::next();
/// let b = ProviderId::next();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProviderId(u64);

impl ProviderId {
    /// Allocates a fresh identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the inner u64 value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider#{}", self.0)
    }
}

//! The [`Resource`] handle.
//!
//! A resource is an identifier plus the location of its content. Content is
//! read on demand and never cached, so every read observes the file's live
//! state.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use super::id::{ProviderId, ResourceId};
use crate::error::ResourceError;

/// An immutable, lazily-read content handle.
///
/// # Examples
///
/// ```no_run
/// use resx_core::{ProviderId, Resource};
/// use camino::Utf8PathBuf;
///
/// # fn example() -> Result<(), resx_core::ResourceError> {
/// let resource = Resource::from_path(
///     Utf8PathBuf::from("/defs/Greeting.dialog"),
///     ProviderId::next(),
/// ).expect("path has a file name");
///
/// assert_eq!(resource.id().as_str(), "Greeting.dialog");
/// let text = resource.read_text()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Resource {
    /// Base name of the file, including its extension.
    id: ResourceId,

    /// Absolute path of the backing file.
    full_path: Utf8PathBuf,

    /// The provider that reported this resource.
    provider: ProviderId,
}

impl Resource {
    /// Creates a resource with an explicit identifier.
    #[inline]
    #[must_use]
    pub fn new(id: ResourceId, full_path: Utf8PathBuf, provider: ProviderId) -> Self {
        Self {
            id,
            full_path,
            provider,
        }
    }

    /// Creates a resource whose identifier is the file name of `full_path`.
    ///
    /// Returns `None` if the path has no file name.
    #[must_use]
    pub fn from_path(full_path: Utf8PathBuf, provider: ProviderId) -> Option<Self> {
        let id = ResourceId::from_path(&full_path)?;
        Some(Self::new(id, full_path, provider))
    }

    /// Returns the resource identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns the absolute path of the backing file.
    #[inline]
    #[must_use]
    pub fn full_path(&self) -> &Utf8Path {
        &self.full_path
    }

    /// Returns the id of the provider that reported this resource.
    #[inline]
    #[must_use]
    pub const fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Returns the category (extension) of the resource, if any.
    #[inline]
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.id.category()
    }

    /// Returns `true` if the resource belongs to `category`.
    ///
    /// See [`ResourceId::matches_category`].
    #[inline]
    #[must_use]
    pub fn matches_category(&self, category: &str) -> bool {
        self.id.matches_category(category)
    }

    /// Reads the full content as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if the file no longer exists and
    /// [`ResourceError::Io`] for any other failure, including invalid UTF-8.
    pub fn read_text(&self) -> Result<String, ResourceError> {
        std::fs::read_to_string(&self.full_path)
            .map_err(|e| ResourceError::from_io(&self.full_path, e))
    }

    /// Reads the full content as raw bytes.
    ///
    /// # Errors
    ///
    /// Same classification as [`read_text`](Self::read_text).
    pub fn read_bytes(&self) -> Result<Vec<u8>, ResourceError> {
        std::fs::read(&self.full_path).map_err(|e| ResourceError::from_io(&self.full_path, e))
    }

    /// Reads the full content as UTF-8 text without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Same classification as [`read_text`](Self::read_text).
    pub async fn read_text_async(&self) -> Result<String, ResourceError> {
        tokio::fs::read_to_string(&self.full_path)
            .await
            .map_err(|e| ResourceError::from_io(&self.full_path, e))
    }

    /// Reads the full content as raw bytes without blocking the runtime.
    ///
    /// # Errors
    ///
    /// Same classification as [`read_text`](Self::read_text).
    pub async fn read_bytes_async(&self) -> Result<Vec<u8>, ResourceError> {
        tokio::fs::read(&self.full_path)
            .await
            .map_err(|e| ResourceError::from_io(&self.full_path, e))
    }
}

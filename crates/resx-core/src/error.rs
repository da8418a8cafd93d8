//! Error types for the resx-core crate.
//!
//! This module provides [`ResourceError`] for failures while reading resource
//! content and [`ConfigError`] for configuration loading and validation.

use camino::Utf8PathBuf;

/// Errors that can occur while reading a resource's content.
///
/// A [`Resource`](crate::Resource) is only a handle; its file may have been
/// deleted or become unreadable since the index last saw it.
///
/// # Error Recovery Strategy
///
/// - **Not found** ([`ResourceError::NotFound`]): Recoverable - the index is
///   stale, re-query the registry after the next change event
/// - **I/O errors** ([`ResourceError::Io`]): Surfaced to the caller, never retried
///
/// # Examples
///
/// ```
/// use resx_core::ResourceError;
///
/// let err = ResourceError::not_found("/defs/Greeting.dialog");
/// assert!(err.is_recoverable());
/// assert_eq!(err.path().as_str(), "/defs/Greeting.dialog");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The backing file no longer exists.
    #[error("resource file not found: {path}")]
    NotFound {
        /// The path that was expected to exist.
        path: Utf8PathBuf,
    },

    /// The backing file exists but could not be read.
    ///
    /// Covers permission problems, transient disk failures, and content that
    /// is not valid UTF-8 when read as text.
    #[error("failed to read resource {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    /// Creates a new [`ResourceError::NotFound`] error.
    #[inline]
    pub fn not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Classifies an I/O error raised while reading `path`.
    ///
    /// `NotFound` kinds become [`ResourceError::NotFound`], everything else
    /// becomes [`ResourceError::Io`].
    pub fn from_io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Returns `true` if re-querying the registry may succeed.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the file was missing at read time.
    #[inline]
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the path of the resource that failed to read.
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::NotFound { path } | Self::Io { path, .. } => path,
        }
    }
}

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use resx_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A required directory does not exist.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

//! Error types for the resx-scanner crate.
//!
//! This module provides the [`ScanError`] type for errors that can occur
//! while enumerating a folder provider's root.

use camino::Utf8PathBuf;

/// Errors that can occur during scanning operations.
///
/// # Error Recovery Strategy
///
/// - **Walker errors** ([`ScanError::Walk`]): Fatal - propagate immediately
/// - **Root errors** ([`ScanError::RootNotFound`], [`ScanError::NotADirectory`]):
///   Fatal - the provider cannot be constructed
/// - **Metadata errors** ([`ScanError::Io`]): Log warning, skip path, continue
/// - **Non-UTF-8 paths** ([`ScanError::NonUtf8Path`]): Log warning, skip path, continue
///
/// # Examples
///
/// ```
/// use resx_scanner::ScanError;
///
/// fn handle_error(err: ScanError) {
///     match err {
///         ScanError::Walk(e) => eprintln!("Walk error: {e}"),
///         ScanError::RootNotFound(p) => eprintln!("Missing root: {p}"),
///         ScanError::NotADirectory(p) => eprintln!("Not a directory: {p}"),
///         ScanError::Io { path, .. } => eprintln!("I/O error: {path}"),
///         ScanError::NonUtf8Path(p) => eprintln!("Invalid path: {}", p.display()),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Failed to walk a directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// The provider root does not exist.
    #[error("root path does not exist: {0}")]
    RootNotFound(Utf8PathBuf),

    /// The provider root exists but is not a directory.
    #[error("root path is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// Failed to inspect a path on disk.
    #[error("failed to inspect {path}: {source}")]
    Io {
        /// The path that could not be inspected.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    ///
    /// Resource identifiers are UTF-8 strings, so such files cannot be
    /// reported.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl ScanError {
    /// Creates a new [`ScanError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal (scanning should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::RootNotFound(path) | Self::NotADirectory(path) | Self::Io { path, .. } => {
                Some(path)
            }
            Self::Walk(_) | Self::NonUtf8Path(_) => None,
        }
    }
}

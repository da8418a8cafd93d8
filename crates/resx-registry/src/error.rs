//! Error types for the resx-registry crate.

use camino::Utf8PathBuf;
use resx_core::ConfigError;
use resx_scanner::ScanError;
use resx_watcher::WatchError;

/// Errors that can occur while constructing a resource provider.
///
/// # Error Recovery Strategy
///
/// - **Scan errors** ([`ProviderError::Scan`]): Fatal - the folder could not
///   be enumerated
/// - **Watch setup errors** ([`ProviderError::WatchSetup`]): Recoverable -
///   the registry falls back to a static snapshot of the folder
/// - **Configuration errors** ([`ProviderError::Config`]): Fatal - the
///   builder was given options no watch can run with
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The builder's options are invalid.
    #[error("invalid provider options: {0}")]
    Config(#[from] ConfigError),

    /// The initial enumeration of the folder failed.
    #[error("failed to scan folder: {0}")]
    Scan(#[from] ScanError),

    /// The native watch could not be registered.
    #[error("failed to watch folder: {0}")]
    WatchSetup(#[from] WatchError),
}

impl ProviderError {
    /// Returns `true` if the provider can still be built without monitoring.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::WatchSetup(_))
    }

    /// Returns `true` if no provider can be built for the folder.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Scan(e) => e.path(),
            Self::WatchSetup(e) => e.path(),
            Self::Config(_) => None,
        }
    }
}

/// Errors returned by [`ResourceRegistry`](crate::ResourceRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A provider could not be built.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The registry was disposed and accepts no new providers.
    #[error("registry has been disposed")]
    Disposed,
}

impl RegistryError {
    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Provider(e) => e.path(),
            Self::Disposed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_scan() {
        let err = ProviderError::from(ScanError::RootNotFound("defs/missing".into()));
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("defs/missing"));
    }

    #[test]
    fn test_provider_error_watch_setup() {
        let err = ProviderError::from(WatchError::ChannelClosed);
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
        insta::assert_snapshot!(
            err.to_string(),
            @"failed to watch folder: event channel closed unexpectedly"
        );
    }

    #[test]
    fn test_provider_error_config() {
        let err = ProviderError::from(ConfigError::invalid_option(
            "watch.channel_capacity",
            "must be greater than zero",
        ));
        assert!(err.is_fatal());
        assert!(err.path().is_none());
        insta::assert_snapshot!(
            err.to_string(),
            @"invalid provider options: invalid configuration option 'watch.channel_capacity': must be greater than zero"
        );
    }

    #[test]
    fn test_registry_error_disposed() {
        let err = RegistryError::Disposed;
        assert!(err.path().is_none());
        insta::assert_snapshot!(err.to_string(), @"registry has been disposed");
    }

    #[test]
    fn test_registry_error_is_transparent() {
        let err = RegistryError::from(ProviderError::from(WatchError::ChannelClosed));
        assert_eq!(
            err.to_string(),
            "failed to watch folder: event channel closed unexpectedly"
        );
    }
}

//! Configuration structures for resx.
//!
//! This module provides configuration types for all components of the registry:
//!
//! - [`ScanConfig`] - Directory scan settings (skipped directories, extensions)
//! - [`WatchConfig`] - File watcher settings (debouncing, channel sizing)
//! - [`FolderConfig`] - One folder root to register
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a config file only needs the keys it overrides.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::{CompositeFilter, EditorTempFilter, ExtensionFilter, SkipDirsFilter};

/// Configuration for directory scans.
///
/// The same settings decide which watch events a folder provider reconciles,
/// so a scan and a later change notification always agree on what counts as
/// a resource.
///
/// # Examples
///
/// ```
/// use resx_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.skip_dirs, vec![".git"]);
/// assert!(config.extensions.is_empty());
/// assert!(config.ignore_editor_temp_files);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names never descended into.
    pub skip_dirs: Vec<String>,

    /// Whether to follow symbolic links while scanning.
    pub follow_links: bool,

    /// Extension allow-list. Empty means every file is a resource.
    pub extensions: Vec<String>,

    /// Whether to drop editor swap, backup and lock files.
    pub ignore_editor_temp_files: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_dirs: vec![".git".to_owned()],
            follow_links: false,
            extensions: Vec::new(),
            ignore_editor_temp_files: true,
        }
    }
}

impl ScanConfig {
    /// Builds the path filter described by this configuration.
    ///
    /// ```
    /// use resx_core::{FileFilter, ScanConfig};
    /// use camino::Utf8Path;
    ///
    /// let config = ScanConfig {
    ///     extensions: vec!["dialog".to_owned()],
    ///     ..ScanConfig::default()
    /// };
    /// let filter = config.filter();
    /// assert!(filter.should_process(Utf8Path::new("sub/Main.dialog")));
    /// assert!(!filter.should_process(Utf8Path::new(".git/Main.dialog")));
    /// assert!(!filter.should_process(Utf8Path::new("notes.md")));
    /// ```
    #[must_use]
    pub fn filter(&self) -> CompositeFilter {
        let mut filter = CompositeFilter::new();
        if !self.skip_dirs.is_empty() {
            filter = filter.and(SkipDirsFilter::from_owned(self.skip_dirs.iter().cloned()));
        }
        if self.ignore_editor_temp_files {
            filter = filter.and(EditorTempFilter);
        }
        if !self.extensions.is_empty() {
            filter = filter.and(ExtensionFilter::from_owned(self.extensions.iter().cloned()));
        }
        filter
    }
}

/// Configuration for the file watcher.
///
/// Controls how file changes are detected and debounced.
///
/// # Examples
///
/// ```
/// use resx_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert_eq!(config.channel_capacity, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Changes are flushed once no new event arrived for this long.
    pub debounce_ms: u64,

    /// Capacity of the channel between the watcher thread and the debouncer.
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            channel_capacity: 256,
        }
    }
}

impl WatchConfig {
    /// Returns the debounce window as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Rejects a zero debounce window or channel capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::invalid_option(
                "watch.debounce_ms",
                "must be greater than zero",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "watch.channel_capacity",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// One folder root to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderConfig {
    /// Root directory of the folder provider.
    pub path: Utf8PathBuf,

    /// Whether files in subfolders are resources too.
    pub include_subfolders: bool,

    /// Whether to watch the folder for changes.
    pub monitor_changes: bool,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::new(),
            include_subfolders: true,
            monitor_changes: false,
        }
    }
}

impl FolderConfig {
    /// Creates a recursive, unmonitored folder entry.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Root configuration for resx.
///
/// Combines all component configurations into a single structure that can be
/// loaded from a JSON file or constructed programmatically.
///
/// # Examples
///
/// ```
/// use resx_core::Config;
///
/// let config: Config = serde_json::from_str(
///     r#"{ "folders": [{ "path": "defs", "monitor_changes": true }] }"#,
/// ).unwrap();
///
/// assert_eq!(config.folders[0].path, "defs");
/// assert!(config.folders[0].include_subfolders);
/// assert_eq!(config.watch.debounce_ms, 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder roots, in registration order.
    pub folders: Vec<FolderConfig>,

    /// Scan configuration shared by all folders.
    pub scan: ScanConfig,

    /// Watch configuration shared by all monitored folders.
    pub watch: WatchConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON for this schema.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Checks option values that deserialization cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero debounce window or
    /// channel capacity and [`ConfigError::InvalidPath`] for an empty folder
    /// path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watch.validate()?;
        if let Some(folder) = self.folders.iter().find(|f| f.path.as_str().is_empty()) {
            return Err(ConfigError::InvalidPath {
                path: folder.path.clone(),
                reason: "folder path must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

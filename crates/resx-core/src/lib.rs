//! Core types, errors, and utilities for the resx resource registry.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`Resource`] handles with lazy content reads
//! - Identifiers ([`ResourceId`], [`ProviderId`]) and change sets
//!   ([`ResourceChange`], [`ResourcesChanged`])
//! - Path filters shared by the scanner and the watcher
//! - Configuration structures
//! - Type aliases for `FxHashMap`/`FxHashSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod filter;
pub mod hash;
pub mod types;

pub use config::{Config, FolderConfig, ScanConfig, WatchConfig};
pub use error::{ConfigError, ResourceError};
pub use filter::{
    AcceptAllFilter, CompositeFilter, EditorTempFilter, ExtensionFilter, FileFilter,
    SkipDirsFilter,
};
pub use hash::{FxHashMap, FxHashSet};
pub use types::{ProviderId, Resource, ResourceChange, ResourceId, ResourcesChanged};

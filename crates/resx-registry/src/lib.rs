//! Resource providers and the aggregating resource registry.
//!
//! A [`ResourceRegistry`] merges the resources of several
//! [`ResourceProvider`]s into one queryable view and re-publishes their
//! change notifications as a single event stream.
//!
//! # Overview
//!
//! - [`ResourceProvider`]: the provider capability (queries, subscriptions,
//!   disposal)
//! - [`FolderResourceProvider`]: a provider over one directory, optionally
//!   kept current by a debounced native watch
//! - [`ResourceRegistry`]: first-match point queries, concatenated category
//!   queries, change events re-resolved through all providers
//! - [`ChangeHandlers`]: ordered handler lists with panic isolation
//!
//! # Example
//!
//! ```no_run
//! use resx_registry::ResourceRegistry;
//!
//! # async fn example() -> Result<(), resx_registry::RegistryError> {
//! let registry = ResourceRegistry::new();
//! registry.add_folder("./defs", true, true).await?;
//! registry.add_folder("./shared", false, false).await?;
//!
//! for dialog in registry.get_resources("dialog") {
//!     println!("{} ({})", dialog.id(), dialog.full_path());
//! }
//!
//! registry.on_changed(|event| {
//!     for change in event {
//!         println!("{change:?}");
//!     }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! Queries never wait for a pending debounce window. They observe each
//! folder as of its last completed reconciliation, and a reconciliation is
//! applied as a whole, so a query never sees half a batch.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod folder;
mod handlers;
mod provider;
mod registry;

pub use error::{ProviderError, RegistryError};
pub use folder::{FolderProviderBuilder, FolderResourceProvider};
pub use handlers::{ChangeHandler, ChangeHandlers, SubscriptionId};
pub use provider::ResourceProvider;
pub use registry::ResourceRegistry;

//! Domain types for the resx registry.
//!
//! # Module Organization
//!
//! - [`id`] - Resource and provider identifiers
//! - [`resource`] - The [`Resource`] content handle
//! - [`change`] - Change notifications published by providers
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use resx_core::{ProviderId, Resource, ResourceId, ResourcesChanged};
//! ```

pub mod change;
pub mod id;
pub mod resource;

pub use change::{ResourceChange, ResourcesChanged};
pub use id::{ProviderId, ResourceId, normalize_category};
pub use resource::Resource;

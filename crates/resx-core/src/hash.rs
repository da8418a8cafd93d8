//! Fast hash map and hash set type aliases.
//!
//! Indices in this workspace are keyed by short relative paths and resource
//! identifiers, which is the workload the Fx hash algorithm from `rustc-hash`
//! is tuned for. Keys never come from untrusted network input, so the lack of
//! denial-of-service resistance does not matter here.
//!
//! # Examples
//!
//! ```
//! use resx_core::{FxHashMap, FxHashSet};
//!
//! let mut by_path: FxHashMap<String, usize> = FxHashMap::default();
//! by_path.insert("dialogs/Main.dialog".to_owned(), 1);
//!
//! let mut seen: FxHashSet<&str> = FxHashSet::default();
//! assert!(seen.insert("Main.dialog"));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

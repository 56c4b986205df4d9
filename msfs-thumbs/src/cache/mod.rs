//! Persistent thumbnail cache
//!
//! [`CacheStore`] owns the package id to [`CacheEntry`] map and its JSON file;
//! [`persist`] does the crash-safe file replacement.

pub mod entry;
pub mod persist;
pub mod store;

pub use entry::CacheEntry;
pub use store::{CacheStore, StoreSettings};

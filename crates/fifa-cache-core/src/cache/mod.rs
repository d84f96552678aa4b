//! Named response stores.
//!
//! A `CacheStorage` holds any number of `CacheStore`s, each identified by a
//! version-tagged `CacheName`. Exactly one name is current for a given
//! manager; the others are stale and removed on activate.
//!
//! Two backends are provided:
//! - `MemoryCacheStorage`: process-local, enumerates stores in creation order
//! - `DiskCacheStorage`: one directory per store, enumerates lexicographically

pub mod disk;
pub mod memory;
pub mod storage;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use storage::{CacheEntry, CacheName, CacheStorage, CacheStore};

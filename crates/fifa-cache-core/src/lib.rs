//! Offline cache for the FIFA tracker web application.
//!
//! The [`OfflineCacheManager`] reacts to the host lifecycle events (install,
//! fetch, activate, sync, message) and serves same-origin GET requests
//! cache-first, falling back to the network and then to a stored offline
//! page for document navigations.
//!
//! The manager is wired from three injected seams:
//! - [`CacheStorage`]: named response stores (in memory or on disk)
//! - [`Network`]: the real request path (`reqwest` backed)
//! - [`WorkerHost`]: the skip-waiting / claim-clients signals

pub mod cache;
pub mod config;
pub mod error;
pub mod network;
pub mod utils;
pub mod worker;

pub use cache::{CacheName, CacheStorage, CacheStore, DiskCacheStorage, MemoryCacheStorage};
pub use config::{AssetManifest, Config};
pub use error::{CacheError, Result};
pub use network::{
    Destination, FetchError, HttpNetwork, Network, Request, RequestKey, Response, ResponseType,
};
pub use worker::{
    ClientMessage, FetchOutcome, InstallReport, LocalHost, OfflineCacheManager, ResponseSource,
    WorkerHost, WorkerState,
};

//! The offline cache manager and the host-facing event surface.
//!
//! The host platform drives the manager through five events:
//! - install: pre-populate the current store, then skip waiting
//! - fetch: answer same-origin GETs cache-first
//! - activate: delete every store except the current one, then claim clients
//! - sync: `background-sync` is acknowledged and otherwise ignored
//! - message: `{ "type": "SKIP_WAITING" }` forces activation

pub mod event;
pub mod host;
pub mod manager;

pub use event::{
    AssetFailure, ClientMessage, FetchOutcome, InstallReport, ResponseSource, WorkerState,
    BACKGROUND_SYNC_TAG,
};
pub use host::{LocalHost, WorkerHost};
pub use manager::OfflineCacheManager;

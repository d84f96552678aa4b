//! Cache-first request handling and cache lifecycle across versions.

use std::sync::Arc;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Origin;

use super::event::{
    AssetFailure, ClientMessage, FetchOutcome, InstallReport, ResponseSource, WorkerState,
    BACKGROUND_SYNC_TAG,
};
use super::host::WorkerHost;
use crate::cache::{CacheName, CacheStorage, CacheStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::network::{FetchError, Network, Request, Response};

/// Maximum concurrent asset fetches during install.
/// Browsers cap per-host connections at 6.
const INSTALL_CONCURRENCY: usize = 6;

pub struct OfflineCacheManager {
    config: Config,
    origin: Origin,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn WorkerHost>,
    state: RwLock<WorkerState>,
}

impl OfflineCacheManager {
    pub fn new(
        config: Config,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        let origin = config.origin.origin();
        Self {
            config,
            origin,
            storage,
            network,
            host,
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache_name(&self) -> &CacheName {
        &self.config.cache_name
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        if *state != next {
            debug!(from = %*state, to = %next, "Worker state change");
            *state = next;
        }
    }

    // ===== Install =====

    /// Pre-populate the current store from the asset manifest.
    ///
    /// Individual asset failures are logged and reported but never fail the
    /// install; a partially populated store is an accepted outcome.
    pub async fn on_install(&self) -> Result<InstallReport> {
        self.set_state(WorkerState::Installing).await;
        let name = self.config.cache_name.clone();

        let report = match self.storage.open(&name).await {
            Ok(cache) => self.populate(cache).await,
            Err(e) => {
                error!(cache = %name, error = %e, "Failed to open cache for install");
                InstallReport {
                    cached: Vec::new(),
                    failed: self
                        .config
                        .assets
                        .iter()
                        .map(|path| AssetFailure {
                            path: path.to_string(),
                            error: e.to_string(),
                        })
                        .collect(),
                }
            }
        };

        info!(
            cache = %name,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "Install finished"
        );

        self.host.skip_waiting().await?;
        self.set_state(WorkerState::Installed).await;
        Ok(report)
    }

    async fn populate(&self, cache: Arc<dyn CacheStore>) -> InstallReport {
        // `buffered` keeps manifest order in the report
        let results: Vec<(String, Result<()>)> = stream::iter(self.config.assets.iter())
            .map(|path| {
                let cache = cache.clone();
                async move {
                    let result = self.cache_asset(cache.as_ref(), path).await;
                    (path.to_string(), result)
                }
            })
            .buffered(INSTALL_CONCURRENCY)
            .collect()
            .await;

        let mut report = InstallReport::default();
        for (path, result) in results {
            match result {
                Ok(()) => report.cached.push(path),
                Err(e) => {
                    warn!(asset = %path, error = %e, "Failed to cache asset");
                    report.failed.push(AssetFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }

    async fn cache_asset(&self, cache: &dyn CacheStore, path: &str) -> Result<()> {
        let url = self
            .config
            .resolve(path)
            .map_err(|_| FetchError::InvalidUrl(path.to_string()))?;
        let request = Request::get(url);

        let response = self.network.fetch(request.clone()).await?;
        if !response.is_success() {
            return Err(FetchError::bad_status(response.status().as_u16(), path).into());
        }
        cache.put(&request, &response).await
    }

    // ===== Fetch =====

    /// Only same-origin GETs are handled; everything else goes to the network
    /// untouched.
    pub fn should_intercept(&self, request: &Request) -> bool {
        request.is_get() && request.url().origin() == self.origin
    }

    /// Answer a request cache-first.
    ///
    /// Returns `Err` when the network failed and no fallback applies; the
    /// host then surfaces its default failed-load behavior.
    pub async fn on_fetch(&self, request: Request) -> Result<FetchOutcome> {
        if !self.should_intercept(&request) {
            debug!(method = %request.method(), url = %request.url(), "Not intercepting");
            return Ok(FetchOutcome::Passthrough);
        }

        match self.storage.match_any(&request).await {
            Ok(Some(response)) => {
                debug!(url = %request.url(), "Serving from cache");
                return Ok(FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Cache,
                    pending_write: None,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(url = %request.url(), error = %e, "Cache lookup failed, using network");
            }
        }

        match self.network.fetch(request.clone()).await {
            Ok(response) => {
                let pending_write = if response.is_cacheable() {
                    Some(self.spawn_cache_write(request, response.clone()))
                } else {
                    debug!(
                        url = %request.url(),
                        status = response.status().as_u16(),
                        kind = ?response.response_type(),
                        "Response not cacheable"
                    );
                    None
                };
                Ok(FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                    pending_write,
                })
            }
            Err(e) => {
                if !request.destination().is_document() {
                    debug!(url = %request.url(), error = %e, "Network failed, no fallback");
                    return Err(e.into());
                }
                match self.offline_page().await {
                    Some(response) => {
                        info!(url = %request.url(), "Offline, serving cached offline page");
                        Ok(FetchOutcome::Respond {
                            response,
                            source: ResponseSource::OfflineFallback,
                            pending_write: None,
                        })
                    }
                    None => {
                        warn!(url = %request.url(), error = %e, "Offline page not cached");
                        Err(CacheError::NoOfflineFallback {
                            url: request.url().to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Write a network response into the current store on a detached task.
    /// The caller gets its response without waiting; a write racing a later
    /// lookup of the same request just means one more network round trip.
    fn spawn_cache_write(
        &self,
        request: Request,
        response: Response,
    ) -> tokio::task::JoinHandle<()> {
        let storage = self.storage.clone();
        let name = self.config.cache_name.clone();
        tokio::spawn(async move {
            let cache = match storage.open(&name).await {
                Ok(cache) => cache,
                Err(e) => {
                    warn!(cache = %name, error = %e, "Failed to open cache for write");
                    return;
                }
            };
            match cache.put(&request, &response).await {
                Ok(()) => debug!(cache = %name, url = %request.url(), "Cached network response"),
                Err(e) => warn!(
                    cache = %name,
                    url = %request.url(),
                    error = %e,
                    "Cache write failed"
                ),
            }
        })
    }

    async fn offline_page(&self) -> Option<Response> {
        let url = match self.config.offline_page_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid offline page URL");
                return None;
            }
        };
        match self.storage.match_any(&Request::get(url)).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Offline page lookup failed");
                None
            }
        }
    }

    // ===== Activate =====

    /// Delete every store except the current one, then claim open clients.
    /// Returns the names of the deleted stores. A failed deletion fails the
    /// activation.
    pub async fn on_activate(&self) -> Result<Vec<CacheName>> {
        self.set_state(WorkerState::Activating).await;
        let current = &self.config.cache_name;

        let stale: Vec<CacheName> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != current)
            .collect();

        try_join_all(stale.iter().map(|name| async move {
            info!(cache = %name, "Deleting old cache");
            self.storage.delete(name).await
        }))
        .await?;

        self.host.claim_clients().await?;
        self.set_state(WorkerState::Activated).await;
        info!(cache = %current, deleted = stale.len(), "Activated");
        Ok(stale)
    }

    // ===== Sync =====

    /// Deferred-sync hook. `background-sync` is acknowledged; no work is
    /// deferred or replayed.
    pub async fn on_sync(&self, tag: &str) -> Result<()> {
        if tag == BACKGROUND_SYNC_TAG {
            info!(tag, "Background sync triggered");
        } else {
            debug!(tag, "Ignoring unknown sync tag");
        }
        Ok(())
    }

    // ===== Message =====

    /// Handle a control message from a page. Returns whether it was recognized.
    pub async fn on_message(&self, payload: &Value) -> Result<bool> {
        match ClientMessage::parse(payload) {
            Some(ClientMessage::SkipWaiting) => {
                info!("SKIP_WAITING received");
                self.host.skip_waiting().await?;
                Ok(true)
            }
            None => {
                debug!(%payload, "Ignoring unknown message");
                Ok(false)
            }
        }
    }
}

//! Process-local cache storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CacheEntry, CacheName, CacheStorage, CacheStore};
use crate::error::Result;
use crate::network::{Request, RequestKey, Response};

#[derive(Debug, Clone)]
struct StoredResponse {
    response: Response,
    cached_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MemoryCacheStore {
    name: CacheName,
    entries: RwLock<HashMap<RequestKey, StoredResponse>>,
}

impl MemoryCacheStore {
    fn new(name: CacheName) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &CacheName {
        &self.name
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<()> {
        let stored = StoredResponse {
            response: response.clone(),
            cached_at: Utc::now(),
        };
        self.entries.write().await.insert(request.key(), stored);
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&request.key()).map(|s| s.response.clone()))
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let entries = self.entries.read().await;
        let mut listing: Vec<CacheEntry> = entries
            .iter()
            .map(|(key, stored)| CacheEntry {
                key: key.clone(),
                status: stored.response.status().as_u16(),
                response_type: stored.response.response_type(),
                size: stored.response.body().len() as u64,
                cached_at: stored.cached_at,
            })
            .collect();
        listing.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listing)
    }
}

/// In-memory storage. Stores enumerate in creation order.
///
/// A store handle obtained from `open` stays usable after the store is
/// deleted, but it is no longer visible through `keys` or `match_any`.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<Vec<Arc<MemoryCacheStore>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &CacheName) -> Result<Arc<dyn CacheStore>> {
        let mut stores = self.stores.write().await;
        if let Some(existing) = stores.iter().find(|s| &s.name == name) {
            return Ok(existing.clone());
        }
        let store = Arc::new(MemoryCacheStore::new(name.clone()));
        stores.push(store.clone());
        Ok(store)
    }

    async fn has(&self, name: &CacheName) -> Result<bool> {
        Ok(self.stores.read().await.iter().any(|s| &s.name == name))
    }

    async fn keys(&self) -> Result<Vec<CacheName>> {
        Ok(self
            .stores
            .read()
            .await
            .iter()
            .map(|s| s.name.clone())
            .collect())
    }

    async fn delete(&self, name: &CacheName) -> Result<bool> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| &s.name != name);
        Ok(stores.len() != before)
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        // Snapshot the handles so lookups don't hold the storage lock
        let stores: Vec<Arc<MemoryCacheStore>> = self.stores.read().await.clone();
        for store in stores {
            if let Some(response) = store.match_request(request).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

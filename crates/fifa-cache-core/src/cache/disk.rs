//! On-disk cache storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<cache-name>/<sha256(key)>.json   entry metadata
//! <root>/<cache-name>/<sha256(key)>.body   response body
//! ```
//!
//! Both files are written to temporary names and renamed into place, body
//! first. A reader that overlaps a rewrite can still pair old metadata with
//! the new body, so the metadata records the body's size and SHA-256 and a
//! mismatch is treated as a miss.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};
use url::Url;

use super::{CacheEntry, CacheName, CacheStorage, CacheStore};
use crate::error::Result;
use crate::network::{Request, RequestKey, Response, ResponseType};

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";
const TMP_EXT: &str = "tmp";

/// Distinguishes temp files of concurrent writers within one process
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: RequestKey,
    status: u16,
    headers: Vec<(String, String)>,
    url: Option<Url>,
    response_type: ResponseType,
    size: u64,
    body_sha256: String,
    cached_at: DateTime<Utc>,
}

pub struct DiskCacheStore {
    name: CacheName,
    dir: PathBuf,
}

impl DiskCacheStore {
    fn entry_path(&self, key: &RequestKey, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key.digest(), ext))
    }

    fn tmp_path(&self, key: &RequestKey, ext: &str) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}.{}.{}",
            key.digest(),
            ext,
            std::process::id(),
            n,
            TMP_EXT
        ))
    }

    /// Write `contents` to a temp file and rename it over `dest`
    async fn write_replace(&self, key: &RequestKey, ext: &str, contents: &[u8]) -> Result<()> {
        let tmp = self.tmp_path(key, ext);
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, self.entry_path(key, ext)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn load_meta(path: &Path) -> Result<Option<EntryMeta>> {
        match fs::read(path).await {
            Ok(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    fn name(&self) -> &CacheName {
        &self.name
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<()> {
        let key = request.key();
        let meta = EntryMeta {
            key: key.clone(),
            status: response.status().as_u16(),
            headers: response.headers().to_vec(),
            url: response.url().cloned(),
            response_type: response.response_type(),
            size: response.body().len() as u64,
            body_sha256: body_digest(response.body()),
            cached_at: Utc::now(),
        };

        self.write_replace(&key, BODY_EXT, response.body()).await?;
        self.write_replace(&key, META_EXT, &serde_json::to_vec_pretty(&meta)?).await?;
        debug!(cache = %self.name, key = %key, "Stored entry");
        Ok(())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        let key = request.key();
        let Some(meta) = Self::load_meta(&self.entry_path(&key, META_EXT)).await? else {
            return Ok(None);
        };
        // Digest collision or a hand-edited file
        if meta.key != key {
            warn!(cache = %self.name, key = %key, "Entry key mismatch, ignoring");
            return Ok(None);
        }

        let body = match fs::read(self.entry_path(&key, BODY_EXT)).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(cache = %self.name, key = %key, "Entry body missing, ignoring");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        // Body replaced between reading the metadata and reading the body
        if body.len() as u64 != meta.size || body_digest(&body) != meta.body_sha256 {
            debug!(cache = %self.name, key = %key, "Entry body changed during read, ignoring");
            return Ok(None);
        }

        let status = StatusCode::from_u16(meta.status).map_err(|_| {
            <serde_json::Error as serde::de::Error>::custom(format!(
                "invalid status {}",
                meta.status
            ))
        })?;

        let mut response = Response::new(status, body)
            .with_headers(meta.headers)
            .with_type(meta.response_type);
        if let Some(url) = meta.url {
            response = response.with_url(url);
        }
        Ok(Some(response))
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut listing = Vec::new();
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(listing),
            Err(e) => return Err(e.into()),
        };

        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            match Self::load_meta(&path).await {
                Ok(Some(meta)) => listing.push(CacheEntry {
                    key: meta.key,
                    status: meta.status,
                    response_type: meta.response_type,
                    size: meta.size,
                    cached_at: meta.cached_at,
                }),
                Ok(None) => {}
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable entry");
                }
            }
        }
        listing.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listing)
    }
}

/// Directory-backed storage. Stores enumerate in lexicographic name order.
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &CacheName) -> PathBuf {
        self.root.join(name.as_str())
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &CacheName) -> Result<Arc<dyn CacheStore>> {
        let dir = self.store_dir(name);
        fs::create_dir_all(&dir).await?;
        Ok(Arc::new(DiskCacheStore {
            name: name.clone(),
            dir,
        }))
    }

    async fn has(&self, name: &CacheName) -> Result<bool> {
        match fs::metadata(self.store_dir(name)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<CacheName>> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(item) = dir.next_entry().await? {
            if !item.file_type().await?.is_dir() {
                continue;
            }
            let Some(file_name) = item.file_name().to_str().map(str::to_string) else {
                continue;
            };
            match CacheName::new(file_name) {
                Ok(name) => names.push(name),
                Err(e) => debug!(error = %e, "Skipping foreign directory in cache root"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &CacheName) -> Result<bool> {
        match fs::remove_dir_all(self.store_dir(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

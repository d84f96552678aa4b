use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::network::{Request, RequestKey, Response, ResponseType};
use crate::utils::format_age;

/// Longest accepted cache name. Names double as directory names on disk.
const MAX_CACHE_NAME_LENGTH: usize = 128;

/// Version-tagged identifier of one cache store generation, e.g. `fifa-tracker-v1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheName(String);

impl CacheName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| CacheError::InvalidCacheName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("empty"));
        }
        if name.len() > MAX_CACHE_NAME_LENGTH {
            return Err(invalid("too long"));
        }
        if name == "." || name == ".." {
            return Err(invalid("reserved"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CacheName {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CacheName {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CacheName> for String {
    fn from(name: CacheName) -> Self {
        name.0
    }
}

/// Listing view of one stored response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub status: u16,
    pub response_type: ResponseType,
    pub size: u64,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// One named store mapping request identity to a response snapshot.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn name(&self) -> &CacheName;

    /// Store `response` under the identity of `request`, replacing any previous entry
    async fn put(&self, request: &Request, response: &Response) -> Result<()>;

    async fn match_request(&self, request: &Request) -> Result<Option<Response>>;

    async fn entries(&self) -> Result<Vec<CacheEntry>>;
}

/// The set of named stores visible to the manager.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the named store, creating it when absent
    async fn open(&self, name: &CacheName) -> Result<Arc<dyn CacheStore>>;

    async fn has(&self, name: &CacheName) -> Result<bool>;

    /// Names of all existing stores, in the backend's enumeration order
    async fn keys(&self) -> Result<Vec<CacheName>>;

    /// Delete the named store. Returns false when it did not exist.
    async fn delete(&self, name: &CacheName) -> Result<bool>;

    /// Look `request` up in every store, returning the first hit in `keys()` order.
    /// A store whose lookup fails is logged and skipped.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>> {
        for name in self.keys().await? {
            // A store deleted between keys() and open() would be recreated empty
            if !self.has(&name).await? {
                continue;
            }
            let store = self.open(&name).await?;
            match store.match_request(request).await {
                Ok(Some(response)) => {
                    debug!(cache = %name, key = %request.key(), "Cache hit");
                    return Ok(Some(response));
                }
                Ok(None) => {}
                // One unreadable entry must not hide copies in later stores
                Err(e) => {
                    warn!(
                        cache = %name,
                        key = %request.key(),
                        error = %e,
                        "Lookup failed, trying next store"
                    );
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cache_name_valid() {
        let name = CacheName::new("fifa-tracker-v1").unwrap();
        assert_eq!(name.as_str(), "fifa-tracker-v1");
        assert_eq!(name.to_string(), "fifa-tracker-v1");
        assert!("fifa_tracker.v2".parse::<CacheName>().is_ok());
    }

    #[test]
    fn test_cache_name_invalid() {
        assert!(CacheName::new("").is_err());
        assert!(CacheName::new("..").is_err());
        assert!(CacheName::new("fifa/tracker").is_err());
        assert!(CacheName::new("fifa tracker").is_err());
        assert!(CacheName::new("x".repeat(MAX_CACHE_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_cache_name_serde() {
        let name: CacheName = serde_json::from_str("\"fifa-tracker-v3\"").unwrap();
        assert_eq!(name.as_str(), "fifa-tracker-v3");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"fifa-tracker-v3\"");
        assert!(serde_json::from_str::<CacheName>("\"../etc\"").is_err());
    }

    #[test]
    fn test_entry_age_display() {
        let mut entry = CacheEntry {
            key: RequestKey {
                method: "GET".to_string(),
                url: "http://localhost:3000/".to_string(),
            },
            status: 200,
            response_type: ResponseType::Basic,
            size: 10,
            cached_at: Utc::now(),
        };
        assert_eq!(entry.age_display(), "just now");

        entry.cached_at = Utc::now() - Duration::minutes(61);
        assert_eq!(entry.age_display(), "1h ago");
    }
}

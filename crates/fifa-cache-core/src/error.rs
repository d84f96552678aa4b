use thiserror::Error;

use crate::network::FetchError;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache name '{name}': {reason}")]
    InvalidCacheName { name: String, reason: String },

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Offline and no cached fallback for {url}")]
    NoOfflineFallback { url: String },
}

impl CacheError {
    /// True when the failure came from the network rather than local storage
    pub fn is_network(&self) -> bool {
        matches!(self, CacheError::Network(_) | CacheError::NoOfflineFallback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_classification() {
        let err: CacheError = FetchError::Offline("/app.js".to_string()).into();
        assert!(err.is_network());

        let err = CacheError::NoOfflineFallback {
            url: "/".to_string(),
        };
        assert!(err.is_network());

        let err: CacheError = std::io::Error::other("disk full").into();
        assert!(!err.is_network());
    }

    #[test]
    fn test_invalid_name_message() {
        let err = CacheError::InvalidCacheName {
            name: "..".to_string(),
            reason: "reserved".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid cache name '..': reserved");
    }
}

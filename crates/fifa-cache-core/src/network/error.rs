use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network unreachable for {0}")]
    Offline(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected status {status} for {url}")]
    BadStatus { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Maximum length for URLs echoed into error messages
const MAX_ERROR_URL_LENGTH: usize = 200;

impl FetchError {
    /// Truncate a URL to avoid logging excessive query strings
    fn truncate_url(url: &str) -> String {
        if url.len() <= MAX_ERROR_URL_LENGTH {
            url.to_string()
        } else {
            let cut: String = url.chars().take(MAX_ERROR_URL_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, url.len())
        }
    }

    /// Map a `reqwest` send failure onto the cases the cache manager cares about.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() {
            FetchError::Offline(Self::truncate_url(url))
        } else if err.is_timeout() {
            FetchError::Timeout(Self::truncate_url(url))
        } else if err.is_builder() {
            FetchError::InvalidUrl(Self::truncate_url(url))
        } else {
            FetchError::Transport(err)
        }
    }

    pub fn bad_status(status: u16, url: &str) -> Self {
        FetchError::BadStatus {
            status,
            url: Self::truncate_url(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_url() {
        assert_eq!(FetchError::truncate_url("/index.html"), "/index.html");
    }

    #[test]
    fn test_truncate_long_url() {
        let long = format!("/search?q={}", "x".repeat(400));
        let truncated = FetchError::truncate_url(&long);
        assert!(truncated.starts_with("/search?q=xxx"));
        assert!(truncated.ends_with(&format!("(truncated, {} total bytes)", long.len())));
    }

    #[test]
    fn test_bad_status_message() {
        let err = FetchError::bad_status(404, "/js/missing.js");
        assert_eq!(err.to_string(), "Unexpected status 404 for /js/missing.js");
    }
}

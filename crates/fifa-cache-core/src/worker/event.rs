use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::network::Response;

/// The only sync tag the manager recognizes
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Manager lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, no event handled yet
    Parsed,
    Installing,
    /// Install finished, waiting for activation
    Installed,
    Activating,
    /// Stale stores removed, clients claimed
    Activated,
}

impl WorkerState {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
        }
    }
}

/// Control messages posted by controlled pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SkipWaiting,
}

impl ClientMessage {
    /// Recognize a message payload; anything unknown yields `None`
    pub fn parse(payload: &Value) -> Option<Self> {
        Self::deserialize(payload).ok()
    }
}

/// Where a fetch response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached offline page served for a failed document navigation
    OfflineFallback,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSource::Cache => write!(f, "cache"),
            ResponseSource::Network => write!(f, "network"),
            ResponseSource::OfflineFallback => write!(f, "offline-fallback"),
        }
    }
}

/// Result of handling one fetch event.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs its default network behavior
    Passthrough,
    Respond {
        response: Response,
        source: ResponseSource,
        /// Detached cache write started for a cacheable network response.
        /// The response is returned without waiting for it; the handle only
        /// lets callers observe completion.
        pending_write: Option<JoinHandle<()>>,
    },
}

impl FetchOutcome {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchOutcome::Passthrough)
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::Passthrough => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            FetchOutcome::Passthrough => None,
        }
    }

    /// Wait for the detached cache write, if one was started
    pub async fn settle(&mut self) {
        if let FetchOutcome::Respond { pending_write, .. } = self {
            if let Some(handle) = pending_write.take() {
                // A panicked or aborted write only loses the cache entry
                let _ = handle.await;
            }
        }
    }
}

/// An asset that could not be pre-populated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of install: which manifest assets made it into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<AssetFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_skip_waiting() {
        assert_eq!(
            ClientMessage::parse(&json!({ "type": "SKIP_WAITING" })),
            Some(ClientMessage::SkipWaiting)
        );
        assert_eq!(
            ClientMessage::parse(&json!({ "type": "SKIP_WAITING", "from": "settings" })),
            Some(ClientMessage::SkipWaiting)
        );
    }

    #[test]
    fn test_parse_unknown_messages() {
        assert_eq!(ClientMessage::parse(&json!({ "type": "CLEAR_CACHE" })), None);
        assert_eq!(ClientMessage::parse(&json!("SKIP_WAITING")), None);
        assert_eq!(ClientMessage::parse(&json!({})), None);
        assert_eq!(ClientMessage::parse(&Value::Null), None);
    }

    #[test]
    fn test_worker_state_display() {
        assert_eq!(WorkerState::Installing.to_string(), "installing");
        assert!(WorkerState::Activated.is_active());
        assert!(!WorkerState::Installed.is_active());
    }

    #[test]
    fn test_install_report_complete() {
        let mut report = InstallReport::default();
        report.cached.push("/".to_string());
        assert!(report.is_complete());
        report.failed.push(AssetFailure {
            path: "/js/app.js".to_string(),
            error: "offline".to_string(),
        });
        assert!(!report.is_complete());
    }
}

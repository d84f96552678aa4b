use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// Lifecycle signals the manager sends back to its host.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Activate the new manager without waiting for old clients to close
    async fn skip_waiting(&self) -> Result<()>;

    /// Take control of all currently open pages
    async fn claim_clients(&self) -> Result<()>;
}

/// Host that records the signals it received.
#[derive(Debug, Default)]
pub struct LocalHost {
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerHost for LocalHost {
    async fn skip_waiting(&self) -> Result<()> {
        if !self.skip_waiting.swap(true, Ordering::SeqCst) {
            info!("Skip waiting requested");
        }
        Ok(())
    }

    async fn claim_clients(&self) -> Result<()> {
        if !self.clients_claimed.swap(true, Ordering::SeqCst) {
            info!("Claimed open clients");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_host_records_signals() {
        let host = LocalHost::new();
        assert!(!host.skip_waiting_requested());
        assert!(!host.clients_claimed());

        host.skip_waiting().await.unwrap();
        host.skip_waiting().await.unwrap();
        assert!(host.skip_waiting_requested());
        assert!(!host.clients_claimed());

        host.claim_clients().await.unwrap();
        assert!(host.clients_claimed());
    }
}

//! Reachability probing for registered base URLs.

use std::time::Duration;

use async_trait::async_trait;

#[async_trait]
pub trait HealthProber: Send + Sync {
    /// True when the service behind `base_url` answers its health endpoint
    /// with a success status within the timeout.
    async fn probe(&self, base_url: &str) -> bool;
}

pub struct HttpHealthProber {
    client: reqwest::Client,
}

impl HttpHealthProber {
    pub fn new(timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl HealthProber for HttpHealthProber {
    async fn probe(&self, base_url: &str) -> bool {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Fixed-outcome prober for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub struct MockHealthProber {
        healthy: AtomicBool,
    }

    impl MockHealthProber {
        pub fn new(healthy: bool) -> Self {
            Self { healthy: AtomicBool::new(healthy) }
        }

        pub fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl HealthProber for MockHealthProber {
        async fn probe(&self, _base_url: &str) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }
}

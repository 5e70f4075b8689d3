use anyhow::{Context, Result};
use tracing::info;

/// Thin wrapper over a core NATS connection used for the inbound event feed.
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "Connecting to NATS");

        // Configure connection timeout for establishing the TCP connection
        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Successfully connected to NATS");
        Ok(Self { client })
    }

    /// Subscribe to `subject`. The returned subscriber ends when the
    /// connection is closed for good.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber> {
        info!(subject = %subject, "Subscribing to event subject");
        self.client
            .subscribe(subject.to_string())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))
    }

    pub async fn close(self) {
        info!("Closing NATS connection");
        if let Err(e) = self.client.flush().await {
            tracing::warn!(error = %e, "NATS flush failed");
        }
    }
}

use crate::domain::{DomainError, DomainResult, TimestampStore};
use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

pub const DEFAULT_REDIS_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis-backed TimestampStore.
///
/// Each app key maps to a plain string key holding the nanosecond
/// timestamp as an integer, so the data stays readable with `redis-cli`.
#[derive(Clone)]
pub struct RedisTimestampStore {
    connection: ConnectionManager,
}

impl RedisTimestampStore {
    pub async fn connect(redis_url: &str, connect_timeout: Duration) -> anyhow::Result<Self> {
        info!(url = %redis_url, timeout_ms = connect_timeout.as_millis(), "Connecting to Redis");

        let client = Client::open(redis_url).context("Invalid Redis URL")?;
        let connection = timeout(connect_timeout, client.get_connection_manager())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Redis connection timed out after {:?}. Please ensure Redis is running at: {}",
                    connect_timeout,
                    redis_url
                )
            })?
            .with_context(|| format!("Failed to connect to Redis at {}", redis_url))?;

        info!("Successfully connected to Redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl TimestampStore for RedisTimestampStore {
    #[instrument(skip(self))]
    async fn get_last_event_time(&self, key: &str) -> DomainResult<i64> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = conn
            .get(key)
            .await
            .map_err(|e| DomainError::TimestampStoreError(format!("GET {}: {}", key, e)))?;

        debug!(found = value.is_some(), "read last event time");
        Ok(value.unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn set_last_event_time(&self, key: &str, value: i64) -> DomainResult<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| DomainError::TimestampStoreError(format!("SET {}: {}", key, e)))?;

        debug!("stored last event time");
        Ok(())
    }
}

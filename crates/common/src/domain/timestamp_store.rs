use crate::domain::result::DomainResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Durable "last event time" per app key, used only to survive restarts.
///
/// Implementations:
/// - `RedisTimestampStore` in production
/// - `InMemoryTimestampStore` when no durable backend is configured
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TimestampStore: Send + Sync {
    /// Nanosecond timestamp stored for `key`, or 0 if none was ever set
    async fn get_last_event_time(&self, key: &str) -> DomainResult<i64>;

    /// Store the nanosecond timestamp for `key`
    async fn set_last_event_time(&self, key: &str, value: i64) -> DomainResult<()>;
}

/// Process-local implementation of TimestampStore using HashMap
#[derive(Default)]
pub struct InMemoryTimestampStore {
    values: Mutex<HashMap<String, i64>>,
}

impl InMemoryTimestampStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TimestampStore for InMemoryTimestampStore {
    async fn get_last_event_time(&self, key: &str) -> DomainResult<i64> {
        let values = self
            .values
            .lock()
            .map_err(|e| anyhow::anyhow!("timestamp map poisoned: {}", e))?;
        Ok(values.get(key).copied().unwrap_or(0))
    }

    async fn set_last_event_time(&self, key: &str, value: i64) -> DomainResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| anyhow::anyhow!("timestamp map poisoned: {}", e))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

use crate::domain::AppIdentity;
use serde::{Deserialize, Serialize};

/// Source type stamped on log messages emitted by the router.
pub const ROUTER_SOURCE_TYPE: &str = "RTR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    LogMessage,
    HttpStartStop,
    ValueMetric,
    CounterEvent,
    ContainerMetric,
    Error,
    #[serde(other)]
    Unknown,
}

/// Decoded telemetry envelope as it arrives on the event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub origin: String,
    pub event_type: EventType,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub source_instance: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub app_id: String,
}

impl RawEvent {
    /// Router access logs are the only events that carry app activity.
    pub fn is_router_access(&self) -> bool {
        self.event_type == EventType::LogMessage && self.source_type == ROUTER_SOURCE_TYPE
    }
}

/// A raw event together with the identity resolved for its app GUID.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedEvent {
    pub raw: RawEvent,
    pub identity: AppIdentity,
}

impl EnrichedEvent {
    pub fn new(raw: RawEvent, identity: AppIdentity) -> Self {
        Self { raw, identity }
    }
}

use common::domain::{DomainError, DomainResult, RawEvent};
use common::nats::{set_parent_from_headers, NatsClient};
use futures::{Stream, StreamExt};
use tracing::{debug_span, warn};

/// Live telemetry events arriving on a NATS subject as JSON `RawEvent`s.
pub struct EventFeed {
    subject: String,
    subscriber: async_nats::Subscriber,
}

impl EventFeed {
    pub async fn subscribe(client: &NatsClient, subject: &str) -> anyhow::Result<Self> {
        let subscriber = client.subscribe(subject).await?;
        Ok(Self {
            subject: subject.to_string(),
            subscriber,
        })
    }

    /// Decoded events. Undecodable payloads are logged and dropped; the
    /// stream ends only when the subscription does.
    pub fn into_stream(self) -> impl Stream<Item = RawEvent> + Send {
        let subject = self.subject;
        self.subscriber.filter_map(move |message| {
            let span = debug_span!("decode_event", subject = %subject);
            set_parent_from_headers(&span, message.headers.as_ref());
            let _guard = span.enter();

            let decoded = match decode_event(&message.payload) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, bytes = message.payload.len(), "dropping undecodable event");
                    None
                }
            };
            futures::future::ready(decoded)
        })
    }
}

pub fn decode_event(payload: &[u8]) -> DomainResult<RawEvent> {
    serde_json::from_slice(payload).map_err(|e| DomainError::InvalidEvent(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::EventType;

    #[test]
    fn test_decode_router_log() {
        let payload = br#"{
            "origin": "gorouter",
            "event_type": "LogMessage",
            "timestamp": 1700000000000000000,
            "source_type": "RTR",
            "source_instance": "0",
            "message_type": "OUT",
            "message": "example.com - [2024-01-01T00:00:00Z] \"GET / HTTP/1.1\" 200",
            "app_id": "6f2c1f0e-0000-4000-8000-000000000001"
        }"#;

        let event = decode_event(payload).unwrap();
        assert_eq!(event.event_type, EventType::LogMessage);
        assert_eq!(event.app_id, "6f2c1f0e-0000-4000-8000-000000000001");
        assert!(event.is_router_access());
    }

    #[test]
    fn test_decode_tolerates_missing_and_unknown_fields() {
        let payload = br#"{"event_type": "SomethingNew", "app_id": "abc", "extra": 1}"#;

        let event = decode_event(payload).unwrap();
        assert_eq!(event.event_type, EventType::Unknown);
        assert!(event.source_type.is_empty());
        assert!(!event.is_router_access());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_event(b"not json");
        assert!(matches!(result, Err(DomainError::InvalidEvent(_))));
    }
}

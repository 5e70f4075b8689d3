use crate::domain::{AppDetails, AppIdentity};
use serde::{Deserialize, Serialize};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

/// Aggregate activity for one application.
///
/// `event_count` and `last_event_time` only ever move forward within a
/// process run. `last_event_time` is nanoseconds since the epoch; zero means
/// the app has never been observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub guid: String,
    pub name: String,
    pub organization: NamedRef,
    pub space: NamedRef,
    pub state: String,
    pub event_count: u64,
    pub last_event_time: i64,
    pub requests_per_second: f64,
    pub elapsed_since_last_event: i64,
}

impl ActivityRecord {
    /// Fresh record from reconciliation metadata, with no activity yet.
    pub fn from_details(guid: &str, details: &AppDetails) -> Self {
        Self {
            guid: guid.to_string(),
            name: details.identity.name.clone(),
            organization: NamedRef {
                id: details.identity.org_id.clone(),
                name: details.identity.org_name.clone(),
            },
            space: NamedRef {
                id: details.identity.space_id.clone(),
                name: details.identity.space_name.clone(),
            },
            state: details.state.clone(),
            ..Default::default()
        }
    }

    pub fn has_activity(&self) -> bool {
        self.last_event_time > 0
    }

    /// Copies the dynamic fields of `existing` onto `self`, leaving the
    /// identity fields untouched.
    pub fn carry_forward(mut self, existing: &ActivityRecord) -> Self {
        self.event_count = existing.event_count;
        self.last_event_time = existing.last_event_time;
        self.requests_per_second = existing.requests_per_second;
        self.elapsed_since_last_event = existing.elapsed_since_last_event;
        self
    }

    /// Applies one accepted event observed at `now` to a copy of `self`.
    ///
    /// Identity fields come from the resolved event. Elapsed time since the
    /// previous event is taken from the timestamp stored before this event;
    /// on an app's first event it is reported as 0.
    pub fn fold(&self, app_guid: &str, identity: &AppIdentity, now: i64, feed_started: i64) -> Self {
        let mut next = self.clone();
        next.guid = app_guid.to_string();
        next.name = identity.name.clone();
        next.organization = NamedRef {
            id: identity.org_id.clone(),
            name: identity.org_name.clone(),
        };
        next.space = NamedRef {
            id: identity.space_id.clone(),
            name: identity.space_name.clone(),
        };

        next.event_count += 1;
        next.elapsed_since_last_event = if self.has_activity() {
            (now - self.last_event_time).max(0) / NANOS_PER_SECOND
        } else {
            0
        };
        next.last_event_time = next.last_event_time.max(now);
        next.requests_per_second = requests_per_second(next.event_count, now - feed_started);
        next
    }
}

/// `count / whole seconds elapsed`, or 0 when less than a second has passed.
pub fn requests_per_second(count: u64, elapsed_nanos: i64) -> f64 {
    let elapsed_seconds = elapsed_nanos / NANOS_PER_SECOND;
    if elapsed_seconds <= 0 {
        return 0.0;
    }
    count as f64 / elapsed_seconds as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AppIdentity {
        AppIdentity {
            name: "app1".to_string(),
            space_id: "space-guid".to_string(),
            space_name: "spaceX".to_string(),
            org_id: "org-guid".to_string(),
            org_name: "orgA".to_string(),
        }
    }

    #[test]
    fn test_first_fold_initializes_counters() {
        let t0 = 1_700_000_000 * NANOS_PER_SECOND;
        let record = ActivityRecord::default().fold("app-guid", &identity(), t0 + 4 * NANOS_PER_SECOND, t0);

        assert_eq!(record.event_count, 1);
        assert_eq!(record.last_event_time, t0 + 4 * NANOS_PER_SECOND);
        assert_eq!(record.elapsed_since_last_event, 0);
        assert!((record.requests_per_second - 0.25).abs() < f64::EPSILON);
        assert_eq!(record.organization.name, "orgA");
        assert_eq!(record.space.id, "space-guid");
        assert_eq!(record.guid, "app-guid");
    }

    #[test]
    fn test_fold_uses_previous_timestamp_for_elapsed() {
        let t0 = 1_700_000_000 * NANOS_PER_SECOND;
        let first = ActivityRecord::default().fold("g", &identity(), t0 + NANOS_PER_SECOND, t0);
        let second = first.fold("g", &identity(), t0 + 11 * NANOS_PER_SECOND, t0);

        assert_eq!(second.event_count, 2);
        assert_eq!(second.elapsed_since_last_event, 10);
        assert_eq!(second.last_event_time, t0 + 11 * NANOS_PER_SECOND);
    }

    #[test]
    fn test_rate_is_zero_within_first_second() {
        assert_eq!(requests_per_second(5, 0), 0.0);
        assert_eq!(requests_per_second(5, NANOS_PER_SECOND - 1), 0.0);
        assert!((requests_per_second(6, 3 * NANOS_PER_SECOND) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_carry_forward_keeps_identity() {
        let existing = ActivityRecord {
            name: "old-name".to_string(),
            event_count: 42,
            last_event_time: 99,
            requests_per_second: 1.5,
            elapsed_since_last_event: 3,
            ..Default::default()
        };
        let fresh = ActivityRecord {
            name: "new-name".to_string(),
            state: "STARTED".to_string(),
            ..Default::default()
        };

        let merged = fresh.carry_forward(&existing);
        assert_eq!(merged.name, "new-name");
        assert_eq!(merged.state, "STARTED");
        assert_eq!(merged.event_count, 42);
        assert_eq!(merged.last_event_time, 99);
        assert_eq!(merged.elapsed_since_last_event, 3);
    }

    #[test]
    fn test_serializes_with_wire_field_names() {
        let json = serde_json::to_value(ActivityRecord::default()).unwrap();
        for field in [
            "guid",
            "name",
            "organization",
            "space",
            "state",
            "event_count",
            "last_event_time",
            "requests_per_second",
            "elapsed_since_last_event",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }
}

use crate::domain::{ActivityRecord, AppKey};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// In-memory map from app key to its activity record.
///
/// The store is the only owner of records; every read hands out clones.
/// Each operation takes the lock for exactly that operation, so callers
/// must finish any I/O (identity lookups, durable store calls) before
/// calling in.
#[derive(Default)]
pub struct ActivityStore {
    records: RwLock<HashMap<String, ActivityRecord>>,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<ActivityRecord> {
        let records = self.records.read().await;
        records.get(key).cloned()
    }

    pub async fn put(&self, key: String, record: ActivityRecord) {
        let mut records = self.records.write().await;
        records.insert(key, record);
    }

    /// Atomic read-modify-write of one record.
    ///
    /// `f` sees the current record (if any) and returns its replacement; no
    /// other reader or writer runs while it does. Returns the stored record.
    pub async fn update<F>(&self, key: &str, f: F) -> ActivityRecord
    where
        F: FnOnce(Option<&ActivityRecord>) -> ActivityRecord,
    {
        let mut records = self.records.write().await;
        let next = f(records.get(key));
        records.insert(key.to_string(), next.clone());
        next
    }

    /// All records ordered by key.
    pub async fn snapshot(&self) -> Vec<(String, ActivityRecord)> {
        self.all_records().await.into_iter().collect()
    }

    pub async fn all_records(&self) -> BTreeMap<String, ActivityRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// Records whose key starts with `prefix` (plain string prefix, so
    /// `"orgA/"` selects an org and `"orgA/spaceX/"` a space).
    pub async fn records_with_key_prefix(&self, prefix: &str) -> BTreeMap<String, ActivityRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    pub async fn record_by_key(&self, org: &str, space: &str, app: &str) -> Option<ActivityRecord> {
        self.get(&AppKey::new(org, space, app).to_string()).await
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(name: &str, count: u64) -> ActivityRecord {
        ActivityRecord {
            name: name.to_string(),
            event_count: count,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = ActivityStore::new();
        store.put("orgA/spaceX/app1".to_string(), record("app1", 3)).await;

        let found = store.get("orgA/spaceX/app1").await.unwrap();
        assert_eq!(found.event_count, 3);
        assert!(store.get("orgA/spaceX/missing").await.is_none());
    }

    #[tokio::test]
    async fn test_prefix_query_selects_org_and_space() {
        let store = ActivityStore::new();
        store.put("orgA/spaceX/app1".to_string(), record("app1", 1)).await;
        store.put("orgA/spaceY/app2".to_string(), record("app2", 1)).await;
        store.put("orgB/spaceX/app3".to_string(), record("app3", 1)).await;

        let org = store.records_with_key_prefix("orgA/").await;
        assert_eq!(
            org.keys().cloned().collect::<Vec<_>>(),
            vec!["orgA/spaceX/app1".to_string(), "orgA/spaceY/app2".to_string()]
        );

        let space = store.records_with_key_prefix("orgA/spaceX/").await;
        assert_eq!(space.len(), 1);
        assert!(space.contains_key("orgA/spaceX/app1"));
    }

    #[tokio::test]
    async fn test_record_by_key() {
        let store = ActivityStore::new();
        store.put("orgA/spaceX/app1".to_string(), record("app1", 7)).await;

        let found = store.record_by_key("orgA", "spaceX", "app1").await.unwrap();
        assert_eq!(found.event_count, 7);
        assert!(store.record_by_key("orgA", "spaceX", "app2").await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_copy() {
        let store = ActivityStore::new();
        store.put("b/s/a".to_string(), record("a", 1)).await;
        store.put("a/s/a".to_string(), record("a", 1)).await;

        let mut snapshot = store.snapshot().await;
        assert_eq!(snapshot[0].0, "a/s/a");
        assert_eq!(snapshot[1].0, "b/s/a");

        snapshot[0].1.event_count = 1000;
        assert_eq!(store.get("a/s/a").await.unwrap().event_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_do_not_lose_increments() {
        let store = Arc::new(ActivityStore::new());
        let mut handles = Vec::new();

        for _ in 0..200 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update("orgA/spaceX/app1", |current| {
                        let mut next = current.cloned().unwrap_or_default();
                        next.event_count += 1;
                        next
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("orgA/spaceX/app1").await.unwrap().event_count, 200);
        assert_eq!(store.len().await, 1);
    }
}

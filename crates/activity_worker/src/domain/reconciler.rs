use common::cloud_controller::CachingIdentityResolver;
use common::domain::{
    ActivityRecord, ActivityStore, AppDirectory, AppKey, DomainError, DomainResult,
    InventoryEntry, TimestampStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_DURABLE_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub registered: usize,
    pub skipped: usize,
}

/// Refreshes every app's static metadata from the inventory while keeping
/// the counters that the stream has already accumulated.
pub struct Reconciler {
    store: Arc<ActivityStore>,
    directory: Arc<dyn AppDirectory>,
    timestamp_store: Arc<dyn TimestampStore>,
    durable_timeout: Duration,
    identity_cache: Option<Arc<CachingIdentityResolver>>,
}

impl Reconciler {
    pub fn new(
        store: Arc<ActivityStore>,
        directory: Arc<dyn AppDirectory>,
        timestamp_store: Arc<dyn TimestampStore>,
        durable_timeout: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            timestamp_store,
            durable_timeout,
            identity_cache: None,
        }
    }

    /// Seed `cache` with every identity this reconciler resolves.
    pub fn with_identity_cache(mut self, cache: Arc<CachingIdentityResolver>) -> Self {
        self.identity_cache = Some(cache);
        self
    }

    /// Run one pass immediately, then one per `interval` until `ctx` is
    /// cancelled. A pass that has started always finishes.
    pub async fn run_periodic(&self, interval: Duration, ctx: CancellationToken) -> anyhow::Result<()> {
        info!(interval_secs = interval.as_secs(), "starting periodic reconciliation");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("reconciler stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.refresh().await;
                }
            }
        }
    }

    /// List the inventory and reconcile it. Listing failures are logged and
    /// left for the next tick.
    pub async fn refresh(&self) -> Option<ReconcileSummary> {
        match self.directory.list_apps().await {
            Ok(inventory) => Some(self.reconcile(&inventory).await),
            Err(e) => {
                warn!(error = %e, "failed to list app inventory, will retry next tick");
                None
            }
        }
    }

    #[instrument(skip(self, inventory), fields(apps = inventory.len()))]
    pub async fn reconcile(&self, inventory: &[InventoryEntry]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for entry in inventory {
            match self.reconcile_entry(entry).await {
                Ok(()) => summary.registered += 1,
                Err(e) => {
                    warn!(app_guid = %entry.guid, app = %entry.name, error = %e, "skipping app");
                    summary.skipped += 1;
                }
            }
        }

        let tracked = self.store.len().await;
        info!(
            registered = summary.registered,
            skipped = summary.skipped,
            tracked,
            "reconciliation pass complete"
        );
        summary
    }

    async fn reconcile_entry(&self, entry: &InventoryEntry) -> DomainResult<()> {
        let details = match entry.details() {
            Some(details) => details,
            None => self.directory.app_details(&entry.guid).await?,
        };

        let key = AppKey::for_event(&entry.org_name, &entry.space_name, &entry.name, &entry.guid)
            .to_string();
        let persisted = self.persisted_time(&key).await;

        let mut fresh = ActivityRecord::from_details(&entry.guid, &details);
        if !entry.name.is_empty() {
            fresh.name = entry.name.clone();
        }

        // A record still at 0 may have missed the durable read on an
        // earlier pass, so it takes the persisted value like a new one.
        let record = self
            .store
            .update(&key, |current| {
                let mut next = match current {
                    Some(existing) => fresh.carry_forward(existing),
                    None => fresh,
                };
                if next.last_event_time == 0 {
                    next.last_event_time = persisted.unwrap_or(0);
                }
                next
            })
            .await;

        if record.last_event_time > persisted.unwrap_or(0) {
            self.persist_time(&key, record.last_event_time).await;
        }

        if let Some(cache) = &self.identity_cache {
            cache.prime(&entry.guid, details.identity).await;
        }

        debug!(key = %key, event_count = record.event_count, "registered app");
        Ok(())
    }

    /// Durable timestamp for `key`; `None` if the store failed or timed out.
    async fn persisted_time(&self, key: &str) -> Option<i64> {
        let result = tokio::time::timeout(
            self.durable_timeout,
            self.timestamp_store.get_last_event_time(key),
        )
        .await
        .unwrap_or_else(|_| {
            Err(DomainError::Timeout(
                self.durable_timeout,
                "get_last_event_time".to_string(),
            ))
        });

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "durable timestamp read failed");
                None
            }
        }
    }

    async fn persist_time(&self, key: &str, value: i64) {
        let result = tokio::time::timeout(
            self.durable_timeout,
            self.timestamp_store.set_last_event_time(key, value),
        )
        .await
        .unwrap_or_else(|_| {
            Err(DomainError::Timeout(
                self.durable_timeout,
                "set_last_event_time".to_string(),
            ))
        });

        if let Err(e) = result {
            warn!(key = %key, error = %e, "durable timestamp write failed");
        }
    }
}

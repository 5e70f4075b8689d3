use common::domain::{
    ActivityRecord, ActivityStore, AppKey, Clock, DomainError, DomainResult, EnrichedEvent,
    IdentityResolver, RawEvent,
};
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Log a progress line every this many folded events
const PROGRESS_EVERY: u64 = 10_000;

/// Folds live router events into the activity store.
///
/// Flow per event:
/// 1. Drop anything that is not a router access log
/// 2. Resolve the app GUID to org/space/app names (outside the store lock)
/// 3. Read-modify-write the app's record as one store operation
pub struct StreamProcessor {
    store: Arc<ActivityStore>,
    resolver: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock>,
    feed_started: AtomicI64,
    folded: AtomicU64,
    discarded: AtomicU64,
}

impl StreamProcessor {
    pub fn new(
        store: Arc<ActivityStore>,
        resolver: Arc<dyn IdentityResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let feed_started = AtomicI64::new(clock.now_nanos());
        Self {
            store,
            resolver,
            clock,
            feed_started,
            folded: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Instant (ns) the current feed started; rates are measured from here.
    pub fn feed_started(&self) -> i64 {
        self.feed_started.load(Ordering::SeqCst)
    }

    pub fn events_folded(&self) -> u64 {
        self.folded.load(Ordering::Relaxed)
    }

    pub fn events_discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Consume `events` until the stream ends or `ctx` is cancelled.
    ///
    /// The end of the stream means the upstream feed is gone, which is
    /// reported as `DomainError::StreamTerminated`. A fold already in
    /// progress always completes before cancellation is observed.
    pub async fn run<S>(&self, events: S, ctx: CancellationToken) -> DomainResult<()>
    where
        S: Stream<Item = RawEvent> + Send,
    {
        self.feed_started
            .store(self.clock.now_nanos(), Ordering::SeqCst);
        info!("event feed started, folding router events");

        futures::pin_mut!(events);
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        folded = self.events_folded(),
                        discarded = self.events_discarded(),
                        "stream processor stopping"
                    );
                    return Ok(());
                }
                next = events.next() => match next {
                    Some(event) => {
                        if self.fold_one(event).await.is_some()
                            && self.events_folded() % PROGRESS_EVERY == 0
                        {
                            debug!(
                                folded = self.events_folded(),
                                discarded = self.events_discarded(),
                                "stream processor progress"
                            );
                        }
                    }
                    None => {
                        error!(folded = self.events_folded(), "event stream terminated");
                        return Err(DomainError::StreamTerminated);
                    }
                },
            }
        }
    }

    /// Apply one event. Returns the updated record, or `None` when the
    /// event was filtered out.
    pub async fn fold_one(&self, event: RawEvent) -> Option<ActivityRecord> {
        if !event.is_router_access() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let identity = self.resolver.resolve(&event.app_id).await;
        Some(self.fold_enriched(EnrichedEvent::new(event, identity)).await)
    }

    #[instrument(skip(self, event), fields(app_guid = %event.raw.app_id))]
    async fn fold_enriched(&self, event: EnrichedEvent) -> ActivityRecord {
        let identity = &event.identity;
        let app_guid = event.raw.app_id.as_str();
        let key = AppKey::for_event(
            &identity.org_name,
            &identity.space_name,
            &identity.name,
            app_guid,
        )
        .to_string();

        let now = self.clock.now_nanos();
        let feed_started = self.feed_started();
        let record = self
            .store
            .update(&key, |current| match current {
                Some(record) => record.fold(app_guid, identity, now, feed_started),
                None => ActivityRecord::default().fold(app_guid, identity, now, feed_started),
            })
            .await;

        self.folded.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, event_count = record.event_count, "folded router event");
        record
    }
}

use crate::domain::{Reconciler, StreamProcessor};
use crate::nats::EventFeed;
use common::cloud_controller::CachingIdentityResolver;
use common::domain::{ActivityStore, AppDirectory, SystemClock, TimestampStore};
use common::nats::NatsClient;
use nozzle_runner::AppProcess;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ActivityWorkerConfig {
    pub events_subject: String,
    pub reconcile_interval: Duration,
    pub durable_store_timeout: Duration,
}

/// Owns the two writers of the activity store: the live event fold and
/// the periodic inventory reconciliation.
pub struct ActivityWorker {
    stream_processor: Arc<StreamProcessor>,
    reconciler: Arc<Reconciler>,
    feed: EventFeed,
    reconcile_interval: Duration,
}

impl ActivityWorker {
    pub async fn new(
        store: Arc<ActivityStore>,
        directory: Arc<dyn AppDirectory>,
        identity_resolver: Arc<CachingIdentityResolver>,
        timestamp_store: Arc<dyn TimestampStore>,
        nats_client: &NatsClient,
        config: ActivityWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing activity worker");

        let reconciler = Reconciler::new(
            store.clone(),
            directory,
            timestamp_store,
            config.durable_store_timeout,
        )
        .with_identity_cache(identity_resolver.clone());

        let stream_processor =
            StreamProcessor::new(store, identity_resolver, Arc::new(SystemClock));

        let feed = EventFeed::subscribe(nats_client, &config.events_subject).await?;

        info!(
            subject = %config.events_subject,
            reconcile_interval_secs = config.reconcile_interval.as_secs(),
            "Activity worker initialized"
        );

        Ok(Self {
            stream_processor: Arc::new(stream_processor),
            reconciler: Arc::new(reconciler),
            feed,
            reconcile_interval: config.reconcile_interval,
        })
    }

    pub fn into_runner_processes(self) -> Vec<(String, AppProcess)> {
        let stream_processor: AppProcess = Box::new({
            let processor = self.stream_processor;
            let events = self.feed.into_stream();
            move |ctx| {
                Box::pin(async move { processor.run(events, ctx).await.map_err(anyhow::Error::from) })
            }
        });

        let reconciler: AppProcess = Box::new({
            let reconciler = self.reconciler;
            let interval = self.reconcile_interval;
            move |ctx| Box::pin(async move { reconciler.run_periodic(interval, ctx).await })
        });

        vec![
            ("stream_processor".to_string(), stream_processor),
            ("reconciler".to_string(), reconciler),
        ]
    }
}

mod config;

use activity_api::{ActivityApi, HttpServerConfig};
use activity_worker::{ActivityWorker, ActivityWorkerConfig};
use common::cloud_controller::{CachingIdentityResolver, CloudControllerClient, CloudControllerConfig};
use common::domain::{ActivityStore, AppDirectory, InMemoryTimestampStore, TimestampStore};
use common::nats::NatsClient;
use common::redis_store::RedisTimestampStore;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use crate::config::ServiceConfig;
use nozzle_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_config = TelemetryConfig::from(&config);
    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&telemetry_config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        service = %telemetry_config.service_name,
        otlp_endpoint = ?telemetry_config.otlp_endpoint,
        "Starting app-metrics-nozzle service"
    );
    debug!(
        api = %config.cf_api_endpoint,
        nats_url = %config.nats_url,
        subject = %config.nats_events_subject,
        redis_enabled = !config.redis_url.is_empty(),
        "Configuration loaded"
    );

    let deps = match initialize_shared_dependencies(&config).await {
        Ok(deps) => deps,
        Err(e) => {
            error!("Failed to initialize shared dependencies: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(ActivityStore::new());
    let identity_resolver = Arc::new(CachingIdentityResolver::new(deps.directory.clone()));

    let activity_worker = match ActivityWorker::new(
        store.clone(),
        deps.directory,
        identity_resolver,
        deps.timestamp_store,
        &deps.nats_client,
        ActivityWorkerConfig {
            events_subject: config.nats_events_subject.clone(),
            reconcile_interval: Duration::from_secs(config.cf_pull_time_secs),
            durable_store_timeout: Duration::from_millis(config.durable_store_timeout_ms),
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to initialize activity worker: {:#}", e);
            std::process::exit(1);
        }
    };

    let activity_api = ActivityApi::new(
        store,
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
    );

    let mut runner = Runner::new();

    runner = runner.with_named_process("activity_api", activity_api.into_runner_process());

    for (name, process) in activity_worker.into_runner_processes() {
        runner = runner.with_named_process(name, process);
    }

    let nats_client = deps.nats_client;
    runner = runner
        .with_closer(move || {
            Box::pin(async move {
                info!("Running cleanup tasks...");
                nats_client.close().await;

                // Flush pending traces and logs
                shutdown_telemetry(telemetry_providers);

                info!("Cleanup complete");
                Ok(())
            })
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

struct SharedDependencies {
    directory: Arc<dyn AppDirectory>,
    timestamp_store: Arc<dyn TimestampStore>,
    nats_client: NatsClient,
}

async fn initialize_shared_dependencies(config: &ServiceConfig) -> anyhow::Result<SharedDependencies> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);

    info!("Initializing Cloud Controller client...");
    let directory = Arc::new(CloudControllerClient::new(CloudControllerConfig {
        api_endpoint: config.cf_api_endpoint.clone(),
        uaa_endpoint: config.cf_uaa_endpoint.clone(),
        username: config.cf_user.clone(),
        password: config.cf_password.clone(),
        skip_ssl_validation: config.cf_skip_ssl_validation,
        request_timeout: Duration::from_secs(config.cf_request_timeout_secs),
    })?);

    let timestamp_store: Arc<dyn TimestampStore> = if config.redis_url.is_empty() {
        info!("No REDIS_URL configured, last event times are kept in memory only");
        Arc::new(InMemoryTimestampStore::new())
    } else {
        info!("Initializing Redis...");
        Arc::new(RedisTimestampStore::connect(&config.redis_url, startup_timeout).await?)
    };

    info!("Initializing NATS...");
    let nats_client = NatsClient::connect(&config.nats_url, startup_timeout).await?;

    Ok(SharedDependencies {
        directory,
        timestamp_store,
        nats_client,
    })
}

use crate::http::{activity_router, run_http_server, HttpServerConfig};
use common::domain::ActivityStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Read-only HTTP view over the activity store.
pub struct ActivityApi {
    store: Arc<ActivityStore>,
    config: HttpServerConfig,
}

impl ActivityApi {
    pub fn new(store: Arc<ActivityStore>, config: HttpServerConfig) -> Self {
        debug!("Initializing activity API module");
        Self { store, config }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move {
                run_http_server(self.config, activity_router(self.store), ctx).await
            })
        }
    }
}

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl HttpServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Serve `router` until `ctx` is cancelled. In-flight requests are allowed
/// to finish.
pub async fn run_http_server(
    config: HttpServerConfig,
    router: Router,
    ctx: CancellationToken,
) -> anyhow::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;

    info!(address = %addr, "Activity API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            ctx.cancelled().await;
            info!("Activity API shutting down");
        })
        .await
        .context("HTTP server failed")?;

    info!("Activity API stopped");
    Ok(())
}

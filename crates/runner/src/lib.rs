//! Runs the service's long-lived processes side by side and shuts them down together.
//!
//! - Every process gets the same cancellation token
//! - SIGTERM/SIGINT, or any process failing, cancels the token
//! - Closers run afterwards under a timeout, whatever the outcome
//!
//! # Example
//!
//! ```no_run
//! use nozzle_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::new()
//!         .with_named_process("ticker", |ctx| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => break,
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("tick");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("Cleaning up resources");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5));
//!
//!     runner.run().await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A process takes the shared cancellation token and runs until it is
/// cancelled or fails.
pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>
        + Send,
>;

/// Cleanup run once every process has stopped.
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>> + Send>;

pub struct Runner {
    app_processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// No processes, no closers, 10 second closer timeout.
    pub fn new() -> Self {
        Self {
            app_processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Adds a process under `name`, which is used in every log line about it.
    ///
    /// If any process returns an error, all processes are cancelled and the
    /// runner exits non-zero once closers have run.
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        let process: AppProcess = Box::new(|token| Box::pin(process(token)));
        self.app_processes.push((name.into(), process));
        self
    }

    /// Closers run concurrently after all processes stopped; one failing
    /// does not stop the others.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Use an externally owned token, e.g. to stop the runner from a test.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs until shutdown, then exits the process with the resulting code.
    pub async fn run(self) {
        let code = self.run_to_exit_code().await;
        if code == 0 {
            tracing::info!("Application exiting normally");
        }
        std::process::exit(code);
    }

    /// Runs every process and the closers, returning 0 on a clean shutdown
    /// and 1 if any process failed or panicked.
    pub async fn run_to_exit_code(self) -> i32 {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for (name, process) in self.app_processes {
            let process_token = token.clone();
            tracing::info!(process = %name, "Starting app process");
            join_set.spawn(async move { (name, process(process_token).await) });
        }

        spawn_signal_handlers(token.clone());

        let mut failed = false;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((name, Ok(()))) => {
                    tracing::debug!(process = %name, "App process completed");
                }
                Ok((name, Err(err))) => {
                    if !token.is_cancelled() {
                        tracing::error!(process = %name, error = ?err, "App process failed");
                        failed = true;
                        token.cancel();
                    } else {
                        tracing::warn!(process = %name, error = ?err, "App process errored during shutdown");
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "App process panicked");
                    failed = true;
                    token.cancel();
                }
            }

            if token.is_cancelled() {
                break;
            }
        }

        // Processes observe the token and finish in-flight work first
        while let Some(result) = join_set.join_next().await {
            if let Ok((name, Err(err))) = result {
                tracing::warn!(process = %name, error = ?err, "App process errored during shutdown");
            }
        }

        if !self.closers.is_empty() {
            tracing::info!(timeout = ?self.closer_timeout, "Running closers");
            match tokio::time::timeout(self.closer_timeout, run_closers(self.closers)).await {
                Ok(()) => tracing::info!("All closers completed"),
                Err(_) => tracing::error!(timeout = ?self.closer_timeout, "Closers timed out"),
            }
        }

        if failed {
            tracing::error!("Application exiting with error");
            1
        } else {
            0
        }
    }
}

fn spawn_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                tracing::error!(error = %err, "Error setting up signal handler");
            }
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => {
                tracing::error!(error = %err, "Error setting up SIGTERM handler");
            }
        }
    });
}

async fn run_closers(closers: Vec<Closer>) {
    let mut closer_set = JoinSet::new();

    for closer in closers {
        closer_set.spawn(async move { closer().await });
    }

    while let Some(result) = closer_set.join_next().await {
        match result {
            Ok(Ok(())) => tracing::debug!("Closer completed successfully"),
            Ok(Err(err)) => tracing::error!(error = ?err, "Closer error"),
            Err(err) => tracing::error!(error = %err, "Closer panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn waits_for_cancel(
        stopped: Arc<AtomicUsize>,
    ) -> impl FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
    {
        move |ctx| {
            Box::pin(async move {
                ctx.cancelled().await;
                stopped.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_processes_and_runs_closers() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let closer_called = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();

        let runner = Runner::new()
            .with_named_process("first", waits_for_cancel(stopped.clone()))
            .with_named_process("second", waits_for_cancel(stopped.clone()))
            .with_closer({
                let flag = closer_called.clone();
                move || async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
            .with_cancellation_token(token.clone());

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        assert_eq!(runner.run_to_exit_code().await, 0);
        assert_eq!(stopped.load(Ordering::SeqCst), 2);
        assert!(closer_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failing_process_cancels_the_rest_and_exits_non_zero() {
        let stopped = Arc::new(AtomicUsize::new(0));

        let runner = Runner::new()
            .with_named_process("healthy", waits_for_cancel(stopped.clone()))
            .with_named_process("broken", |_ctx| async move {
                Err::<(), _>(anyhow::anyhow!("upstream went away"))
            });

        assert_eq!(runner.run_to_exit_code().await, 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closer_timeout_does_not_hang_shutdown() {
        let token = CancellationToken::new();
        token.cancel();

        let runner = Runner::new()
            .with_named_process("idle", |ctx| async move {
                ctx.cancelled().await;
                Ok(())
            })
            .with_closer(|| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .with_closer_timeout(Duration::from_millis(50))
            .with_cancellation_token(token);

        let code = tokio::time::timeout(Duration::from_secs(5), runner.run_to_exit_code())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_all_closers_run_even_if_one_fails() {
        let called = Arc::new(AtomicUsize::new(0));
        let first = called.clone();
        let second = called.clone();

        let runner = Runner::new()
            .with_closer(move || async move {
                first.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow::anyhow!("flush failed"))
            })
            .with_closer(move || async move {
                second.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        run_closers(runner.closers).await;

        assert_eq!(called.load(Ordering::SeqCst), 2);
    }
}

//! The `run` command: load configuration, assemble the agent, serve.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::config::loader::{self, LoaderOptions};
use crate::error::GreenwaveError;
use crate::observability::events::EventEmitter;
use crate::observability::metrics::init_metrics;
use crate::server::{Server, ServerOptions};

/// Runs the agent until interrupted.
///
/// # Errors
///
/// Returns an error for configuration problems, oracle construction
/// failures, or a listener that cannot bind.
pub async fn execute(args: RunArgs) -> Result<(), GreenwaveError> {
    let loaded = loader::load(&args.config, &LoaderOptions::default())?;
    for warning in &loaded.warnings {
        warn!(%warning, "configuration warning");
    }

    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        info!(port, "metrics endpoint started");
    }

    let events = if args.events {
        Arc::new(EventEmitter::stderr())
    } else {
        Arc::new(EventEmitter::null())
    };

    let cancel = CancellationToken::new();
    spawn_shutdown_watcher(cancel.clone());

    let server = Server::new(ServerOptions {
        config: loaded.config,
        listen_override: args.listen,
        controller_override: args.controller,
        events,
        cancel,
    })?;

    server.run().await
}

/// Cancels the token on the first SIGINT or SIGTERM; the second signal is
/// handled by the force-exit watcher in `main`.
fn spawn_shutdown_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        let sigterm = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(_) => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            () = sigterm => {}
        }

        info!("shutdown signal received");
        cancel.cancel();
    });
}

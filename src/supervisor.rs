// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Runs the event watcher and the sync loop side by side.
//!
//! The watcher is the process's lifeline: when its event stream fails the
//! supervisor cancels everything and reports [`EXIT_TALK_TO_DOCKER`]. The sync loop
//! running out of passes is only logged; event handling carries on.
//!
//! After cancellation the supervisor waits the configured grace period so in-flight
//! DNS manager calls get a chance to finish.

use crate::constants::EXIT_TALK_TO_DOCKER;
use crate::context::Context;
use crate::sync::{self, SyncExit};
use crate::watcher;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Why the listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shutdown future resolved (SIGINT/SIGTERM in production)
    Signal,
    /// The watcher stopped on its own, carrying the error message
    WatcherFailed(String),
}

/// Outcome of [`run_until`], mapped to the process exit code by `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shutdown {
    pub reason: ShutdownReason,
    pub exit_code: i32,
}

impl Shutdown {
    fn signal() -> Self {
        Self {
            reason: ShutdownReason::Signal,
            exit_code: 0,
        }
    }

    fn watcher_failed(message: String) -> Self {
        Self {
            reason: ShutdownReason::WatcherFailed(message),
            exit_code: EXIT_TALK_TO_DOCKER,
        }
    }
}

/// Run the listener until `shutdown` resolves or the watcher fails.
///
/// `token` is cancelled on the way out, so anything else sharing it (the metrics
/// endpoint) stops too.
pub async fn run_until<F>(ctx: Arc<Context>, token: CancellationToken, shutdown: F) -> Shutdown
where
    F: Future<Output = ()>,
{
    let mut watcher = tokio::spawn(watcher::run(ctx.clone(), token.clone()));
    let reconciler = tokio::spawn({
        let ctx = ctx.clone();
        let token = token.clone();
        async move {
            if sync::run(ctx, token).await == SyncExit::Exhausted {
                warn!("Sync loop finished, event handling continues");
            }
        }
    });

    info!("Swarm listener started");

    let outcome = tokio::select! {
        () = shutdown => {
            info!("Stop signal received");
            Shutdown::signal()
        }
        result = &mut watcher => match result {
            Ok(Ok(())) => Shutdown::watcher_failed("event watcher stopped".to_string()),
            Ok(Err(e)) => {
                error!(error = %e, "Event watcher failed");
                Shutdown::watcher_failed(e.to_string())
            }
            Err(e) => {
                error!(error = %e, "Event watcher task aborted");
                Shutdown::watcher_failed(e.to_string())
            }
        },
    };

    info!("Stopping routines...");
    token.cancel();
    tokio::time::sleep(ctx.config.shutdown_grace).await;

    watcher.abort();
    reconciler.abort();
    outcome
}

/// Resolves on SIGINT (ctrl-c) or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl+C received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod supervisor_tests;

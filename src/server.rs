// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Optional HTTP endpoint exposing `/metrics` and `/healthz`.

use crate::errors::StartupError;
use crate::metrics::gather_metrics;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Routes served by the metrics endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
}

async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Bind the endpoint socket.
///
/// # Errors
///
/// Returns [`StartupError::MetricsEndpoint`] when the address cannot be bound.
pub async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::MetricsEndpoint {
            address: address.to_string(),
            source,
        })
}

/// Serve until `token` is cancelled.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, token: CancellationToken) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!(%address, "Serving /metrics and /healthz");
    }
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod server_tests;

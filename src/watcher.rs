// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Docker event watcher.
//!
//! Subscribes to swarm-scoped events and spawns one task per service
//! create/update/remove event, so a slow DNS manager never blocks the receive loop.
//! Each task holds the read side of the sync lock from service resolution until the
//! delegate returns; a sync pass can therefore never run between "inspect" and
//! "apply" of an event.
//!
//! A failing or ending event stream is fatal. The watcher returns the error and the
//! supervisor stops the process; reopening the stream is left to whatever restarts
//! the listener.

use crate::constants::{EVENT_SCOPE_SWARM, EVENT_TYPE_SERVICE};
use crate::context::Context;
use crate::delegate::{Action, DelegateOutcome};
use crate::docker::{ClusterEvent, Filters, ServiceInfo};
use crate::errors::{ListenerError, OrchestratorError};
use crate::metrics;
use crate::record::DesiredRecord;
use crate::retry::{retry_with_backoff, RetryFailure};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Action requested by `event`, if it is a service lifecycle event.
#[must_use]
pub fn dns_action(event: &ClusterEvent) -> Option<Action> {
    if event.event_type != EVENT_TYPE_SERVICE {
        return None;
    }
    Action::from_event_action(&event.action)
}

/// Receive events until cancelled or the stream fails.
///
/// # Errors
///
/// Returns [`ListenerError::EventStreamFailed`] when the stream cannot be opened,
/// yields an error, or ends.
pub async fn run(ctx: Arc<Context>, token: CancellationToken) -> Result<(), ListenerError> {
    let filters = Filters::new().add("scope", EVENT_SCOPE_SWARM);
    let mut events = ctx
        .orchestrator
        .events(&filters)
        .await
        .map_err(ListenerError::EventStreamFailed)?;

    info!("Start listening to swarm events");

    loop {
        let next = tokio::select! {
            () = token.cancelled() => {
                info!("Stopping events handler");
                return Ok(());
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => dispatch(&ctx, &token, &event),
            Some(Err(e)) => {
                error!(error = %e, "Error communicating with the docker swarm cluster");
                metrics::record_error("watcher", "event_stream");
                return Err(ListenerError::EventStreamFailed(e));
            }
            None => {
                error!("Docker event stream ended");
                metrics::record_error("watcher", "event_stream");
                return Err(ListenerError::EventStreamFailed(
                    OrchestratorError::StreamClosed,
                ));
            }
        }
    }
}

/// Spawn a handling task for `event` when it matters; otherwise drop it.
fn dispatch(ctx: &Arc<Context>, token: &CancellationToken, event: &ClusterEvent) {
    let Some(action) = dns_action(event) else {
        debug!(
            event_type = %event.event_type,
            action = %event.action,
            "Ignoring event"
        );
        return;
    };

    let Some(service_name) = event.service_name().map(str::to_string) else {
        warn!(action = %action, actor = %event.actor.id, "Service event without a name, ignoring");
        return;
    };

    info!(action = %action, service = %service_name, "Got DNS event");
    metrics::record_event(action.as_str());

    let ctx = ctx.clone();
    let token = token.clone();
    tokio::spawn(async move {
        match handle_event(&ctx, action, &service_name, &token).await {
            Ok(_) | Err(ListenerError::Cancelled) => {}
            Err(e @ ListenerError::NotInCache { .. }) => {
                info!(action = %action, service = %service_name, reason = %e, "Nothing to do for event");
            }
            Err(e) => {
                error!(
                    action = %action,
                    service = %service_name,
                    error = %e,
                    "Unable to handle DNS event"
                );
                metrics::record_error("watcher", e.kind());
            }
        }
    });
}

/// Resolve the service behind an event and delegate `action` for it.
///
/// Holds the read side of the sync lock for the whole call.
///
/// # Errors
///
/// Returns [`ListenerError::NotInCache`] or [`ListenerError::InspectRetriesExhausted`]
/// when the service cannot be resolved, [`ListenerError::DnsManager`] when the
/// delegate fails, and [`ListenerError::Cancelled`] on shutdown.
pub async fn handle_event(
    ctx: &Context,
    action: Action,
    service_name: &str,
    token: &CancellationToken,
) -> Result<DelegateOutcome, ListenerError> {
    let _guard = tokio::select! {
        () = token.cancelled() => return Err(ListenerError::Cancelled),
        guard = ctx.sync_lock.read() => guard,
    };

    let record = resolve_service(ctx, action, service_name, token).await?;
    ctx.delegate
        .delegate(action, &record)
        .await
        .map_err(ListenerError::DnsManager)
}

/// Desired record of `service_name` for `action`.
///
/// Removed services no longer exist on the swarm, so removal works from the cache.
///
/// # Errors
///
/// See [`handle_event`].
pub async fn resolve_service(
    ctx: &Context,
    action: Action,
    service_name: &str,
    token: &CancellationToken,
) -> Result<DesiredRecord, ListenerError> {
    match action {
        Action::Remove => ctx
            .cache
            .get(service_name)
            .ok_or_else(|| ListenerError::NotInCache {
                service: service_name.to_string(),
            }),
        Action::Create | Action::Update => {
            let service = inspect_with_retry(ctx, service_name, token).await?;
            Ok(DesiredRecord::from_service(&service))
        }
    }
}

/// Inspect a service, retrying with backoff.
///
/// # Errors
///
/// Returns [`ListenerError::InspectRetriesExhausted`] once every attempt failed and
/// [`ListenerError::Cancelled`] when shutdown interrupts a wait.
pub async fn inspect_with_retry(
    ctx: &Context,
    service_name: &str,
    token: &CancellationToken,
) -> Result<ServiceInfo, ListenerError> {
    let backoff = ctx.config.inspect_backoff();
    retry_with_backoff(
        || ctx.orchestrator.inspect_service(service_name),
        ctx.config.inspect_max_attempts,
        &backoff,
        token,
        "inspect_service",
    )
    .await
    .map_err(|failure| match failure {
        RetryFailure::Exhausted { attempts, .. } => ListenerError::InspectRetriesExhausted {
            service: service_name.to_string(),
            attempts,
        },
        RetryFailure::Cancelled => ListenerError::Cancelled,
    })
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod watcher_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic reconciliation of swarm services against the DNS manager.
//!
//! Events can be lost (listener restarts, stream hiccups), so the sync loop
//! re-derives the desired state of every routed service and compares it with
//! what the DNS manager actually holds:
//!
//! - a hostname the manager does not know triggers a `create` of the record
//! - a hostname pointing somewhere else triggers an `update` of the record
//! - matching hostnames are left alone
//!
//! A pass holds the write side of the sync lock from start to end, pausing event
//! handling so the two never act on the same drift. Passes are spaced by an
//! exponential backoff and the loop stops after a bounded number of passes.

use crate::constants::{RECORD_TYPE_A, TRAEFIK_ENABLE_LABEL};
use crate::context::Context;
use crate::delegate::{Action, DelegateOutcome};
use crate::docker::Filters;
use crate::errors::ListenerError;
use crate::fqdn::{from_fqdn, to_fqdn};
use crate::metrics;
use crate::record::DesiredRecord;
use crate::retry::{sleep_or_cancelled, BackoffPolicy};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How the sync loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncExit {
    /// Every pass was used; only events keep DNS up to date from now on
    Exhausted,
    /// Shutdown was requested
    Cancelled,
}

/// Counters of a single pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub services: usize,
    pub created: usize,
    pub updated: usize,
    pub in_sync: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// State of one record on the DNS manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drift {
    InSync,
    Missing,
    Stale,
    Unknown,
}

/// Run passes until the configured number is used or `token` is cancelled.
pub async fn run(ctx: Arc<Context>, token: CancellationToken) -> SyncExit {
    let max_passes = ctx.config.sync_max_passes;
    let backoff = ctx.config.sync_backoff();

    for pass in 0..max_passes {
        if token.is_cancelled() {
            return SyncExit::Cancelled;
        }

        debug!(pass = pass + 1, max_passes, "Starting sync pass");
        match run_pass(&ctx, &token).await {
            Ok(summary) => info!(
                pass = pass + 1,
                services = summary.services,
                created = summary.created,
                updated = summary.updated,
                in_sync = summary.in_sync,
                skipped = summary.skipped,
                failed = summary.failed,
                "Sync pass finished"
            ),
            Err(ListenerError::Cancelled) => return SyncExit::Cancelled,
            Err(e) => error!(pass = pass + 1, error = %e, "Sync pass failed"),
        }

        if pass + 1 < max_passes {
            let delay = backoff.next_delay(pass);
            debug!(next_pass_in = ?delay, "Waiting for next sync pass");
            if !sleep_or_cancelled(delay, &token).await {
                return SyncExit::Cancelled;
            }
        }
    }

    warn!(
        max_passes,
        "Sync loop used all of its passes and stopped; DNS records now follow events only until the listener restarts"
    );
    metrics::record_sync_exhausted();
    SyncExit::Exhausted
}

/// One reconciliation pass under the write lock.
///
/// # Errors
///
/// Returns [`ListenerError::ListServicesFailed`] when the swarm cannot be listed and
/// [`ListenerError::Cancelled`] if shutdown starts while waiting for the lock.
/// Per-service failures are logged and counted, not returned.
pub async fn run_pass(
    ctx: &Context,
    token: &CancellationToken,
) -> Result<PassSummary, ListenerError> {
    let started = Instant::now();
    let _guard = tokio::select! {
        () = token.cancelled() => return Err(ListenerError::Cancelled),
        guard = ctx.sync_lock.write() => guard,
    };

    let filters = Filters::new().add("label", TRAEFIK_ENABLE_LABEL);
    let services = match ctx.orchestrator.list_services(&filters).await {
        Ok(services) => services,
        Err(e) => {
            metrics::record_sync_pass("error", started.elapsed());
            metrics::record_error("sync", "list_services");
            return Err(ListenerError::ListServicesFailed(e));
        }
    };
    debug!(count = services.len(), "Services found on swarm cluster");

    let mut summary = PassSummary {
        services: services.len(),
        ..PassSummary::default()
    };

    for service in &services {
        let record = DesiredRecord::from_service(service);
        let violations = record.check(ctx.delegate.allowed_tags());
        if !violations.is_empty() {
            debug!(
                service = %record.service_name,
                violations = %violations.join("; "),
                "Service does not qualify for DNS records"
            );
            summary.skipped += 1;
            continue;
        }

        let (action, result) = match drift(ctx, &record).await {
            Drift::InSync => {
                summary.in_sync += 1;
                continue;
            }
            Drift::Unknown => {
                summary.failed += 1;
                continue;
            }
            Drift::Missing => (
                Action::Create,
                ctx.delegate.delegate(Action::Create, &record).await,
            ),
            // The cache may hold this very record, so the update must not be
            // skipped as unchanged.
            Drift::Stale => (Action::Update, ctx.delegate.repair(&record).await),
        };

        match result {
            Ok(DelegateOutcome::Applied) if action == Action::Create => summary.created += 1,
            Ok(DelegateOutcome::Applied) => summary.updated += 1,
            Ok(_) => summary.in_sync += 1,
            Err(_) => summary.failed += 1,
        }
    }

    let status = if summary.failed == 0 { "success" } else { "error" };
    metrics::record_sync_pass(status, started.elapsed());
    Ok(summary)
}

/// Compare every hostname of `record` with the DNS manager.
///
/// A missing hostname wins over a stale one: `create` pushes every hostname anyway.
async fn drift(ctx: &Context, record: &DesiredRecord) -> Drift {
    let target = ctx.delegate.reverse_proxy_address();
    let mut stale = false;
    let mut unknown = false;

    for host_name in &record.host_names {
        let fqdn = to_fqdn(host_name);
        match ctx.manager.get_record(&fqdn, RECORD_TYPE_A).await {
            Ok(existing) if existing.value == target => {
                debug!(service = %record.service_name, hostname = %fqdn, "No update needed");
            }
            Ok(existing) => {
                debug!(
                    service = %record.service_name,
                    hostname = %from_fqdn(&existing.name),
                    actual = %existing.value,
                    expected = %target,
                    "Record points elsewhere, update needed"
                );
                stale = true;
            }
            Err(e) if e.is_not_found() => {
                debug!(service = %record.service_name, hostname = %fqdn, "Record missing, create needed");
                return Drift::Missing;
            }
            Err(e) => {
                error!(
                    service = %record.service_name,
                    hostname = %fqdn,
                    error = %e,
                    "Error getting record from DNS manager"
                );
                metrics::record_error("sync", e.kind());
                unknown = true;
            }
        }
    }

    if stale {
        Drift::Stale
    } else if unknown {
        Drift::Unknown
    } else {
        Drift::InSync
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod sync_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration.
//!
//! Every flag can also be given through an environment variable, which is how the
//! listener is normally deployed as a swarm service. Required values are optional at
//! the clap level so their absence is reported as a [`ConfigError`] with its own exit
//! code instead of a generic usage error.

use crate::constants::{
    DEFAULT_DOCKER_HOST, DEFAULT_INSPECT_BASE_INTERVAL_MILLIS, DEFAULT_INSPECT_MAX_ATTEMPTS,
    DEFAULT_INSPECT_MAX_INTERVAL_MILLIS, DEFAULT_SHUTDOWN_GRACE_SECS,
    DEFAULT_SYNC_BASE_INTERVAL_SECS, DEFAULT_SYNC_MAX_INTERVAL_SECS, DEFAULT_SYNC_MAX_PASSES,
};
use crate::errors::ConfigError;
use crate::retry::ExponentialBackoff;
use clap::Parser;
use std::time::Duration;

/// Raw command line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "bindman-swarm-listener")]
#[command(about = "Keeps Bindman DNS records in sync with Traefik-routed swarm services")]
#[command(version)]
pub struct Cli {
    /// Address of the Bindman DNS manager
    #[arg(long, env = "BINDMAN_DNS_MANAGER_ADDRESS")]
    pub manager_address: Option<String>,

    /// Address every managed A record points at
    #[arg(long, env = "BINDMAN_REVERSE_PROXY_ADDRESS")]
    pub reverse_proxy_address: Option<String>,

    /// Comma separated entry points a service must use to get DNS records
    #[arg(long, env = "BINDMAN_DNS_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Docker Engine API address (`tcp://` or `http(s)://`)
    #[arg(long, env = "DOCKER_HOST", default_value = DEFAULT_DOCKER_HOST)]
    pub docker_host: String,

    /// Reconciliation passes before the sync loop stops
    #[arg(long, default_value_t = DEFAULT_SYNC_MAX_PASSES)]
    pub sync_max_passes: u32,

    /// Base interval of the wait between reconciliation passes
    #[arg(long, default_value_t = DEFAULT_SYNC_BASE_INTERVAL_SECS)]
    pub sync_base_interval_secs: u64,

    /// Attempts made to inspect a service on create/update events
    #[arg(long, default_value_t = DEFAULT_INSPECT_MAX_ATTEMPTS)]
    pub inspect_max_attempts: u32,

    /// Base interval of the wait between inspection attempts
    #[arg(long, default_value_t = DEFAULT_INSPECT_BASE_INTERVAL_MILLIS)]
    pub inspect_base_interval_ms: u64,

    /// Time granted to in-flight calls after shutdown starts
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_GRACE_SECS)]
    pub shutdown_grace_secs: u64,

    /// Bind address of the `/metrics` and `/healthz` endpoint (disabled when unset)
    #[arg(long, env = "BINDMAN_METRICS_ADDRESS")]
    pub metrics_address: Option<String>,
}

/// Validated listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    pub manager_address: String,
    pub reverse_proxy_address: String,
    /// Entry point allow-list, trimmed and never empty
    pub tags: Vec<String>,
    pub docker_host: String,
    pub sync_max_passes: u32,
    pub sync_base_interval: Duration,
    pub sync_max_interval: Duration,
    pub inspect_max_attempts: u32,
    pub inspect_base_interval: Duration,
    pub inspect_max_interval: Duration,
    pub shutdown_grace: Duration,
    pub metrics_address: Option<String>,
}

impl ListenerConfig {
    /// Backoff applied between reconciliation passes.
    #[must_use]
    pub fn sync_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.sync_base_interval, self.sync_max_interval)
    }

    /// Backoff applied between inspection attempts.
    #[must_use]
    pub fn inspect_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.inspect_base_interval, self.inspect_max_interval)
    }
}

impl TryFrom<Cli> for ListenerConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let manager_address =
            non_blank(cli.manager_address).ok_or(ConfigError::MissingManagerAddress)?;
        let reverse_proxy_address =
            non_blank(cli.reverse_proxy_address).ok_or(ConfigError::MissingReverseProxyAddress)?;

        let tags: Vec<String> = cli
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        if tags.is_empty() {
            return Err(ConfigError::MissingTags);
        }

        Ok(Self {
            manager_address,
            reverse_proxy_address,
            tags,
            docker_host: cli.docker_host,
            sync_max_passes: cli.sync_max_passes.max(1),
            sync_base_interval: Duration::from_secs(cli.sync_base_interval_secs),
            sync_max_interval: Duration::from_secs(DEFAULT_SYNC_MAX_INTERVAL_SECS),
            inspect_max_attempts: cli.inspect_max_attempts.max(1),
            inspect_base_interval: Duration::from_millis(cli.inspect_base_interval_ms),
            inspect_max_interval: Duration::from_millis(DEFAULT_INSPECT_MAX_INTERVAL_MILLIS),
            shutdown_grace: Duration::from_secs(cli.shutdown_grace_secs),
            metrics_address: non_blank(cli.metrics_address),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

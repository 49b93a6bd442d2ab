// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Bindman Swarm Listener
//!
//! Keeps the DNS A records held by a Bindman DNS manager in sync with the services of
//! a Docker Swarm cluster that are routed through Traefik.
//!
//! ## Overview
//!
//! Services declare their hostnames and entry points through Traefik labels. The
//! listener turns those labels into a desired record per service and pushes every
//! hostname to the DNS manager, pointing at the reverse proxy address. Two
//! activities share that work:
//!
//! - the [`watcher`] reacts to swarm service create/update/remove events
//! - the [`sync`] loop periodically re-derives the whole desired state and repairs drift
//!
//! A single read/write lock keeps a full sync pass from interleaving with event
//! handling.
//!
//! ## Modules
//!
//! - [`labels`] - Traefik label parsing
//! - [`record`] - Desired record and its validation
//! - [`cache`] - What the listener last pushed to the DNS manager
//! - [`delegate`] - Create/update/remove against the DNS manager
//! - [`docker`] - Docker Engine API client
//! - [`manager`] - Bindman webhook API client
//! - [`supervisor`] - Lifecycle and shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use bindman_swarm_listener::labels::host_names_from_rule;
//!
//! let hosts = host_names_from_rule("Host(`a.example.com`) || Host(`b.example.com`)");
//! assert_eq!(hosts, vec!["a.example.com", "b.example.com"]);
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod delegate;
pub mod docker;
pub mod errors;
pub mod fqdn;
pub mod labels;
pub mod manager;
pub mod metrics;
pub mod record;
pub mod retry;
pub mod server;
pub mod supervisor;
pub mod sync;
pub mod watcher;

#[cfg(test)]
mod test_support;

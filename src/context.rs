// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the event watcher and the sync loop.
//!
//! Both activities receive an `Arc<Context>` that contains:
//! - the validated configuration
//! - the Docker and DNS manager collaborators
//! - the record cache and the delegate that writes it
//! - the sync lock ordering full passes against event handling

use crate::cache::RecordCache;
use crate::config::ListenerConfig;
use crate::delegate::Delegate;
use crate::docker::Orchestrator;
use crate::manager::DnsManager;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state of one listener instance.
pub struct Context {
    /// Validated configuration
    pub config: ListenerConfig,

    /// Docker Swarm access
    pub orchestrator: Arc<dyn Orchestrator>,

    /// DNS manager access
    pub manager: Arc<dyn DnsManager>,

    /// What the listener last pushed to the DNS manager
    pub cache: Arc<RecordCache>,

    /// Held for writing during a whole sync pass, and for reading by every event
    /// unit from service resolution until the delegate returns.
    pub sync_lock: RwLock<()>,

    /// Applies actions and keeps `cache` in step
    pub delegate: Delegate,
}

impl Context {
    /// Wire up a context with an empty cache.
    pub fn new(
        config: ListenerConfig,
        orchestrator: Arc<dyn Orchestrator>,
        manager: Arc<dyn DnsManager>,
    ) -> Self {
        let cache = Arc::new(RecordCache::new());
        let delegate = Delegate::new(
            manager.clone(),
            cache.clone(),
            config.reverse_proxy_address.clone(),
            config.tags.clone(),
        );

        Self {
            config,
            orchestrator,
            manager,
            cache,
            sync_lock: RwLock::new(()),
            delegate,
        }
    }
}

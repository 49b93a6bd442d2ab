// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory record of what the listener last pushed to the DNS manager.
//!
//! The cache is advisory: the DNS manager stays the source of truth and the sync
//! loop corrects any divergence. Entries never expire and are lost on restart.
//!
//! The inner map has its own short-lived lock so that event workers, which all
//! hold the shared *read* side of the sync lock, can still record their results.
//! Mutual exclusion against a full sync pass is provided by that sync lock, not
//! by this type.

use crate::metrics;
use crate::record::DesiredRecord;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Service name → last successfully synchronized record.
#[derive(Debug, Default)]
pub struct RecordCache {
    entries: RwLock<HashMap<String, DesiredRecord>>,
}

impl RecordCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of the cached record for `service_name`, if any.
    #[must_use]
    pub fn get(&self, service_name: &str) -> Option<DesiredRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
    }

    /// Insert or replace the record keyed by its service name.
    pub fn set(&self, record: DesiredRecord) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(record.service_name.clone(), record);
        metrics::set_cached_records(entries.len());
    }

    /// Remove the record of `service_name`, returning it if it was present.
    pub fn delete(&self, service_name: &str) -> Option<DesiredRecord> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.remove(service_name);
        metrics::set_cached_records(entries.len());
        removed
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired DNS state of a single swarm service.
//!
//! A [`DesiredRecord`] is what the listener believes a service asks for: the
//! hostnames that should resolve to the reverse proxy, and the entry point tags
//! the service opted into. Records are only pushed to the DNS manager when
//! [`DesiredRecord::check`] finds no violations.

use crate::docker::ServiceInfo;
use crate::labels;
use std::collections::BTreeSet;

/// Violation reported when none of the record tags is in the allow-list.
pub const VIOLATION_NO_MATCHING_TAGS: &str = "no matching tags found";

/// Violation reported for a missing or blank hostname.
pub const VIOLATION_EMPTY_HOSTNAME: &str = "hostname cannot be empty";

/// Hostnames and tags a service wants, keyed by the service name.
///
/// Equality treats `host_names` and `tags` as unordered sets, so reordered labels
/// never register as a change.
#[derive(Debug, Clone)]
pub struct DesiredRecord {
    /// Swarm service name, unique across the cluster
    pub service_name: String,
    /// Hostnames to route to the reverse proxy
    pub host_names: Vec<String>,
    /// Entry points (routing classes) the service opts into
    pub tags: Vec<String>,
}

impl DesiredRecord {
    /// Build a record from its parts.
    pub fn new(
        service_name: impl Into<String>,
        host_names: Vec<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            host_names,
            tags,
        }
    }

    /// Derive the desired record of a swarm service from its Traefik labels.
    #[must_use]
    pub fn from_service(service: &ServiceInfo) -> Self {
        let extracted = labels::extract(&service.labels);
        Self::new(&service.name, extracted.host_names, extracted.tags)
    }

    /// Validate the record against the configured tag allow-list.
    ///
    /// All rules are evaluated, so every violation is reported at once. An empty
    /// result means the record may be pushed to the DNS manager.
    #[must_use]
    pub fn check(&self, allowed_tags: &[String]) -> Vec<String> {
        let mut violations = Vec::new();

        if !self.tags.iter().any(|tag| allowed_tags.contains(tag)) {
            violations.push(VIOLATION_NO_MATCHING_TAGS.to_string());
        }

        if self.host_names.is_empty() {
            violations.push(VIOLATION_EMPTY_HOSTNAME.to_string());
        }

        for host_name in &self.host_names {
            if host_name.trim().is_empty() {
                violations.push(VIOLATION_EMPTY_HOSTNAME.to_string());
            }
        }

        violations
    }

    fn host_name_set(&self) -> BTreeSet<&str> {
        self.host_names.iter().map(String::as_str).collect()
    }

    fn tag_set(&self) -> BTreeSet<&str> {
        self.tags.iter().map(String::as_str).collect()
    }
}

impl PartialEq for DesiredRecord {
    fn eq(&self, other: &Self) -> bool {
        self.service_name == other.service_name
            && self.host_name_set() == other.host_name_set()
            && self.tag_set() == other.tag_set()
    }
}

impl Eq for DesiredRecord {}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Applies create/update/remove actions against the DNS manager.
//!
//! The delegate is the only writer of the [`RecordCache`]. Every record is validated
//! before the DNS manager is contacted, and the cache only changes once every
//! hostname of the record has been applied.
//!
//! A multi-hostname failure leaves the hostnames that already succeeded on the DNS
//! manager; nothing is rolled back. The next reconciliation pass closes the gap.

use crate::cache::RecordCache;
use crate::constants::RECORD_TYPE_A;
use crate::errors::ManagerError;
use crate::fqdn::to_fqdn;
use crate::manager::{DnsManager, DnsRecord};
use crate::metrics;
use crate::record::DesiredRecord;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A DNS lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Add every hostname
    Create,
    /// Replace every hostname, unless nothing changed
    Update,
    /// Remove every previously recorded hostname
    Remove,
}

impl Action {
    /// Map a Docker event action to a DNS action. Anything else is irrelevant.
    #[must_use]
    pub fn from_event_action(action: &str) -> Option<Self> {
        match action {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }

    /// Lowercase name, used in logs and as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a delegated action ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateOutcome {
    /// The DNS manager accepted every call and the cache was updated
    Applied,
    /// Update of a record identical to the cached one; no call made
    Unchanged,
    /// Remove of a service the cache does not know; no call made
    NothingToRemove,
    /// The record failed validation; no call made
    Rejected(Vec<String>),
}

/// Pushes validated records to the DNS manager and keeps the cache in step.
pub struct Delegate {
    manager: Arc<dyn DnsManager>,
    cache: Arc<RecordCache>,
    reverse_proxy_address: String,
    allowed_tags: Vec<String>,
}

impl Delegate {
    /// Create a delegate pointing every hostname at `reverse_proxy_address`.
    pub fn new(
        manager: Arc<dyn DnsManager>,
        cache: Arc<RecordCache>,
        reverse_proxy_address: impl Into<String>,
        allowed_tags: Vec<String>,
    ) -> Self {
        Self {
            manager,
            cache,
            reverse_proxy_address: reverse_proxy_address.into(),
            allowed_tags,
        }
    }

    /// Entry point tags a record must intersect to be actionable.
    #[must_use]
    pub fn allowed_tags(&self) -> &[String] {
        &self.allowed_tags
    }

    /// Address every managed A record points at.
    #[must_use]
    pub fn reverse_proxy_address(&self) -> &str {
        &self.reverse_proxy_address
    }

    /// Apply `action` for `record`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ManagerError`] raised by the DNS manager. Remaining
    /// hostnames are not attempted and the cache is left untouched.
    pub async fn delegate(
        &self,
        action: Action,
        record: &DesiredRecord,
    ) -> Result<DelegateOutcome, ManagerError> {
        self.apply(action, record, false).await
    }

    /// Push every hostname of `record` again, even if the cache already holds an
    /// identical record.
    ///
    /// Used when the DNS manager was found to disagree with the cache. The cache entry
    /// is only replaced once every hostname was updated.
    ///
    /// # Errors
    ///
    /// Same as [`Delegate::delegate`] with [`Action::Update`].
    pub async fn repair(&self, record: &DesiredRecord) -> Result<DelegateOutcome, ManagerError> {
        self.apply(Action::Update, record, true).await
    }

    async fn apply(
        &self,
        action: Action,
        record: &DesiredRecord,
        force: bool,
    ) -> Result<DelegateOutcome, ManagerError> {
        let violations = record.check(&self.allowed_tags);
        if !violations.is_empty() {
            warn!(
                service = %record.service_name,
                action = %action,
                violations = %violations.join("; "),
                "Invalid service, skipping DNS update"
            );
            metrics::record_dns_operation(action.as_str(), "rejected");
            return Ok(DelegateOutcome::Rejected(violations));
        }

        let result = match action {
            Action::Create => self.create(record).await,
            Action::Update => self.update(record, force).await,
            Action::Remove => self.remove(record).await,
        };

        match &result {
            Ok(DelegateOutcome::Applied) => {
                info!(
                    service = %record.service_name,
                    action = %action,
                    hostnames = ?record.host_names,
                    "DNS records applied"
                );
                metrics::record_dns_operation(action.as_str(), "success");
            }
            Ok(outcome) => {
                debug!(
                    service = %record.service_name,
                    action = %action,
                    outcome = ?outcome,
                    "No DNS change needed"
                );
                metrics::record_dns_operation(action.as_str(), "unchanged");
            }
            Err(e) => {
                error!(
                    service = %record.service_name,
                    action = %action,
                    hostnames = ?record.host_names,
                    error = %e,
                    "Failed to apply DNS records"
                );
                metrics::record_dns_operation(action.as_str(), "error");
                metrics::record_error("delegate", e.kind());
            }
        }

        result
    }

    async fn create(&self, record: &DesiredRecord) -> Result<DelegateOutcome, ManagerError> {
        for host_name in &record.host_names {
            let fqdn = to_fqdn(host_name);
            debug!(service = %record.service_name, hostname = %fqdn, "Adding record");
            self.manager
                .add_record(&fqdn, RECORD_TYPE_A, &self.reverse_proxy_address)
                .await?;
        }
        self.cache.set(record.clone());
        Ok(DelegateOutcome::Applied)
    }

    async fn update(
        &self,
        record: &DesiredRecord,
        force: bool,
    ) -> Result<DelegateOutcome, ManagerError> {
        if !force && self.cache.get(&record.service_name).as_ref() == Some(record) {
            return Ok(DelegateOutcome::Unchanged);
        }

        for host_name in &record.host_names {
            let dns_record = DnsRecord::new(
                to_fqdn(host_name),
                RECORD_TYPE_A,
                self.reverse_proxy_address.as_str(),
            );
            debug!(service = %record.service_name, hostname = %dns_record.name, "Updating record");
            self.manager.update_record(&dns_record).await?;
        }
        self.cache.set(record.clone());
        Ok(DelegateOutcome::Applied)
    }

    /// Removal targets the cached record, which is what was actually created.
    async fn remove(&self, record: &DesiredRecord) -> Result<DelegateOutcome, ManagerError> {
        let Some(cached) = self.cache.get(&record.service_name) else {
            info!(
                service = %record.service_name,
                "Service not managed by this listener, nothing to remove"
            );
            return Ok(DelegateOutcome::NothingToRemove);
        };

        for host_name in &cached.host_names {
            let fqdn = to_fqdn(host_name);
            debug!(service = %cached.service_name, hostname = %fqdn, "Removing record");
            self.manager.remove_record(&fqdn, RECORD_TYPE_A).await?;
        }
        self.cache.delete(&cached.service_name);
        Ok(DelegateOutcome::Applied)
    }
}

#[cfg(test)]
#[path = "delegate_tests.rs"]
mod delegate_tests;

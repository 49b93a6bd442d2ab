// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory fakes of the Docker and DNS manager collaborators.
//!
//! Both fakes append every call to a shared [`Journal`] so tests can assert on
//! ordering across the two systems.

use crate::config::ListenerConfig;
use crate::context::Context;
use crate::docker::{ClusterEvent, EventActor, EventStream, Filters, Orchestrator, ServiceInfo};
use crate::errors::{ManagerError, OrchestratorError};
use crate::manager::{DnsManager, DnsRecord};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Ordered log of calls made against the fakes.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }
}

/// DNS manager backed by a map, with per-name failure injection.
#[derive(Debug)]
pub struct FakeDnsManager {
    records: Mutex<HashMap<String, DnsRecord>>,
    failing: Mutex<HashSet<String>>,
    journal: Arc<Journal>,
}

impl FakeDnsManager {
    pub fn new(journal: Arc<Journal>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            journal,
        })
    }

    /// Seed an existing record.
    pub fn insert(&self, name: &str, value: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(name.to_string(), DnsRecord::new(name, "A", value));
    }

    /// Make every mutating call for `name` fail with a 500.
    pub fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn record(&self, name: &str) -> Option<DnsRecord> {
        self.records.lock().unwrap().get(name).cloned()
    }

    fn check_failure(&self, name: &str) -> Result<(), ManagerError> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(ManagerError::UnexpectedResponse {
                endpoint: format!("fake://records/{name}"),
                status_code: 500,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DnsManager for FakeDnsManager {
    async fn get_record(&self, name: &str, record_type: &str) -> Result<DnsRecord, ManagerError> {
        self.journal.push(format!("get:{name}"));
        self.records
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::RecordNotFound {
                name: name.to_string(),
                record_type: record_type.to_string(),
            })
    }

    async fn add_record(
        &self,
        name: &str,
        record_type: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        self.journal.push(format!("add:{name}"));
        self.check_failure(name)?;
        self.records
            .lock()
            .unwrap()
            .insert(name.to_string(), DnsRecord::new(name, record_type, value));
        Ok(())
    }

    async fn update_record(&self, record: &DnsRecord) -> Result<(), ManagerError> {
        self.journal.push(format!("update:{}", record.name));
        self.check_failure(&record.name)?;
        self.records
            .lock()
            .unwrap()
            .insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn remove_record(&self, name: &str, _record_type: &str) -> Result<(), ManagerError> {
        self.journal.push(format!("remove:{name}"));
        self.check_failure(name)?;
        self.records.lock().unwrap().remove(name);
        Ok(())
    }
}

/// Gate that parks `list_services` until the test releases it.
#[derive(Debug, Default)]
pub struct ListGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Swarm backed by a map of services and a scripted event stream.
#[derive(Debug)]
pub struct FakeOrchestrator {
    services: Mutex<HashMap<String, ServiceInfo>>,
    events: Mutex<Vec<Result<ClusterEvent, OrchestratorError>>>,
    keep_stream_open: bool,
    inspect_failures: AtomicU32,
    list_gate: Mutex<Option<Arc<ListGate>>>,
    journal: Arc<Journal>,
}

impl FakeOrchestrator {
    pub fn new(journal: Arc<Journal>) -> Arc<Self> {
        Self::build(journal, false)
    }

    /// Event stream stays pending after the scripted events instead of ending.
    pub fn with_open_stream(journal: Arc<Journal>) -> Arc<Self> {
        Self::build(journal, true)
    }

    fn build(journal: Arc<Journal>, keep_stream_open: bool) -> Arc<Self> {
        Arc::new(Self {
            services: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            keep_stream_open,
            inspect_failures: AtomicU32::new(0),
            list_gate: Mutex::new(None),
            journal,
        })
    }

    pub fn add_service(&self, service: ServiceInfo) {
        self.services
            .lock()
            .unwrap()
            .insert(service.name.clone(), service);
    }

    pub fn push_event(&self, event: ClusterEvent) {
        self.events.lock().unwrap().push(Ok(event));
    }

    pub fn push_error(&self, error: OrchestratorError) {
        self.events.lock().unwrap().push(Err(error));
    }

    /// Fail the next `count` inspection calls.
    pub fn fail_inspections(&self, count: u32) {
        self.inspect_failures.store(count, Ordering::SeqCst);
    }

    pub fn gate_listing(&self) -> Arc<ListGate> {
        let gate = Arc::new(ListGate::default());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn events(&self, _filters: &Filters) -> Result<EventStream, OrchestratorError> {
        let scripted: Vec<_> = self.events.lock().unwrap().drain(..).collect();
        let scripted = stream::iter(scripted);
        if self.keep_stream_open {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn list_services(&self, _filters: &Filters) -> Result<Vec<ServiceInfo>, OrchestratorError> {
        self.journal.push("list");
        let gate = self.list_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let mut services: Vec<_> = self.services.lock().unwrap().values().cloned().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn inspect_service(&self, name: &str) -> Result<ServiceInfo, OrchestratorError> {
        self.journal.push(format!("inspect:{name}"));
        let remaining = self.inspect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inspect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(OrchestratorError::ConnectionFailed {
                endpoint: format!("fake://services/{name}"),
                reason: "injected failure".to_string(),
            });
        }
        self.services
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::ServiceNotFound {
                name: name.to_string(),
            })
    }
}

/// A service routed through a modern router label.
pub fn routed_service(name: &str, hosts: &[&str], entry_points: &str) -> ServiceInfo {
    let rule = hosts
        .iter()
        .map(|host| format!("Host(`{host}`)"))
        .collect::<Vec<_>>()
        .join(" || ");
    let labels = HashMap::from([
        ("traefik.enable".to_string(), "true".to_string()),
        (format!("traefik.http.routers.{name}.rule"), rule),
        (
            format!("traefik.http.routers.{name}.entryPoints"),
            entry_points.to_string(),
        ),
    ]);
    ServiceInfo {
        id: format!("id-{name}"),
        name: name.to_string(),
        labels,
    }
}

pub fn service_event(action: &str, name: &str) -> ClusterEvent {
    ClusterEvent {
        event_type: "service".to_string(),
        action: action.to_string(),
        scope: "swarm".to_string(),
        actor: EventActor {
            id: format!("id-{name}"),
            attributes: HashMap::from([("name".to_string(), name.to_string())]),
        },
    }
}

/// Listener configuration with zero backoff so nothing sleeps for real.
pub fn test_config() -> ListenerConfig {
    ListenerConfig {
        manager_address: "http://bindman.test".to_string(),
        reverse_proxy_address: "10.0.0.1".to_string(),
        tags: vec!["public".to_string()],
        docker_host: "http://docker.test:2375".to_string(),
        sync_max_passes: 1,
        sync_base_interval: Duration::ZERO,
        sync_max_interval: Duration::ZERO,
        inspect_max_attempts: 3,
        inspect_base_interval: Duration::ZERO,
        inspect_max_interval: Duration::ZERO,
        shutdown_grace: Duration::ZERO,
        metrics_address: None,
    }
}

pub fn test_context(
    config: ListenerConfig,
    orchestrator: Arc<FakeOrchestrator>,
    manager: Arc<FakeDnsManager>,
) -> Arc<Context> {
    Arc::new(Context::new(config, orchestrator, manager))
}

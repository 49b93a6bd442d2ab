// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Docker Swarm access via the Docker Engine HTTP API.
//!
//! The listener only needs three things from the orchestrator:
//!
//! - a long-lived stream of cluster events (`GET /events`)
//! - a point-in-time listing of services filtered by label (`GET /services`)
//! - inspection of a single service (`GET /services/{name}`)
//!
//! These are expressed by the [`Orchestrator`] trait so the watcher and the sync loop
//! can be exercised against in-memory fakes. [`DockerClient`] is the production
//! implementation; it talks HTTP over TCP, so `DOCKER_HOST` must be a `tcp://` or
//! `http(s)://` address.
//!
//! # Example
//!
//! ```rust,no_run
//! use bindman_swarm_listener::docker::{DockerClient, Filters, Orchestrator};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let docker = DockerClient::new("tcp://127.0.0.1:2375")?;
//! let services = docker
//!     .list_services(&Filters::new().add("label", "traefik.enable"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::ACTOR_ATTRIBUTE_NAME;
use crate::errors::OrchestratorError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client as HttpClient, Response, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::Url;

/// Stream of decoded cluster events; an `Err` item is terminal.
pub type EventStream = BoxStream<'static, Result<ClusterEvent, OrchestratorError>>;

/// A swarm service as seen by the listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Swarm service ID
    pub id: String,
    /// Service name, the identity the listener keys everything on
    pub name: String,
    /// Service labels (`Spec.Labels`)
    pub labels: HashMap<String, String>,
}

/// Something that generates events, such as a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventActor {
    /// Object ID
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Object attributes; for services this includes `name`
    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, String>,
}

/// A single notification from the Docker event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClusterEvent {
    /// Object type (`service`, `container`, `network`, ...)
    #[serde(rename = "Type", default)]
    pub event_type: String,
    /// What happened (`create`, `update`, `remove`, ...)
    #[serde(rename = "Action", default)]
    pub action: String,
    /// `local` for engine events, `swarm` for cluster events
    #[serde(default)]
    pub scope: String,
    /// The object the event is about
    #[serde(rename = "Actor", default)]
    pub actor: EventActor,
}

impl ClusterEvent {
    /// Name of the service this event refers to, if the actor carries one.
    #[must_use]
    pub fn service_name(&self) -> Option<&str> {
        self.actor
            .attributes
            .get(ACTOR_ATTRIBUTE_NAME)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Docker API filter arguments, serialized as `{"key": ["value", ...]}`.
///
/// Values under the same key are combined with AND by the engine for labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    args: BTreeMap<String, Vec<String>>,
}

impl Filters {
    /// Create an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under `key`.
    #[must_use]
    pub fn add(mut self, key: &str, value: &str) -> Self {
        self.args
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Whether no filter was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// JSON form expected by the `filters` query parameter.
    #[must_use]
    pub fn to_query(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Orchestrator operations consumed by the listener.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Open the event stream. The stream ends or yields an error when the
    /// connection drops; reopening is the caller's decision.
    async fn events(&self, filters: &Filters) -> Result<EventStream, OrchestratorError>;

    /// List services matching `filters`.
    async fn list_services(&self, filters: &Filters) -> Result<Vec<ServiceInfo>, OrchestratorError>;

    /// Inspect one service by name or ID.
    async fn inspect_service(&self, name: &str) -> Result<ServiceInfo, OrchestratorError>;
}

/// `GET /services` and `GET /services/{id}` payload, reduced to what we read.
#[derive(Debug, Deserialize)]
struct SwarmService {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Spec", default)]
    spec: SwarmServiceSpec,
}

#[derive(Debug, Default, Deserialize)]
struct SwarmServiceSpec {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Labels", default)]
    labels: Option<HashMap<String, String>>,
}

impl From<SwarmService> for ServiceInfo {
    fn from(service: SwarmService) -> Self {
        Self {
            id: service.id,
            name: service.spec.name,
            labels: service.spec.labels.unwrap_or_default(),
        }
    }
}

/// Docker Engine API client over HTTP.
#[derive(Debug, Clone)]
pub struct DockerClient {
    client: HttpClient,
    base_url: Url,
}

impl DockerClient {
    /// Create a client for the given `DOCKER_HOST`-style address.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::InvalidHost`] for blank, `unix://` or unparsable hosts.
    pub fn new(host: &str) -> Result<Self, OrchestratorError> {
        Ok(Self {
            client: HttpClient::new(),
            base_url: normalize_docker_host(host)?,
        })
    }

    /// Base URL every request is built from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, segments: &[&str], filters: Option<&Filters>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if let Some(filters) = filters.filter(|f| !f.is_empty()) {
            url.query_pairs_mut()
                .append_pair("filters", &filters.to_query());
        }
        url
    }

    async fn get(&self, url: Url) -> Result<Response, OrchestratorError> {
        let endpoint = url.to_string();
        debug!(url = %endpoint, "Calling Docker API");

        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| OrchestratorError::ConnectionFailed {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let reason = response.text().await.unwrap_or_default();
        Err(OrchestratorError::UnexpectedResponse {
            endpoint,
            status_code: status.as_u16(),
            reason,
        })
    }
}

#[async_trait]
impl Orchestrator for DockerClient {
    async fn events(&self, filters: &Filters) -> Result<EventStream, OrchestratorError> {
        let url = self.url(&["events"], Some(filters));
        let endpoint = url.to_string();
        let response = self.get(url).await?;
        Ok(decode_event_stream(response.bytes_stream(), endpoint))
    }

    async fn list_services(&self, filters: &Filters) -> Result<Vec<ServiceInfo>, OrchestratorError> {
        let url = self.url(&["services"], Some(filters));
        let endpoint = url.to_string();
        let services: Vec<SwarmService> =
            self.get(url)
                .await?
                .json()
                .await
                .map_err(|e| OrchestratorError::InvalidResponse {
                    endpoint,
                    reason: e.to_string(),
                })?;
        Ok(services.into_iter().map(ServiceInfo::from).collect())
    }

    async fn inspect_service(&self, name: &str) -> Result<ServiceInfo, OrchestratorError> {
        let url = self.url(&["services", name], None);
        let endpoint = url.to_string();
        let response = match self.get(url).await {
            Err(OrchestratorError::UnexpectedResponse { status_code, .. })
                if status_code == StatusCode::NOT_FOUND.as_u16() =>
            {
                return Err(OrchestratorError::ServiceNotFound {
                    name: name.to_string(),
                });
            }
            other => other?,
        };
        let service: SwarmService =
            response
                .json()
                .await
                .map_err(|e| OrchestratorError::InvalidResponse {
                    endpoint,
                    reason: e.to_string(),
                })?;
        Ok(service.into())
    }
}

/// Normalize a `DOCKER_HOST` value into an HTTP base URL.
///
/// `tcp://` becomes `http://`, a bare `host:port` gets `http://` prepended.
///
/// # Errors
///
/// Returns [`OrchestratorError::InvalidHost`] for blank, `unix://`/`npipe://` or
/// unparsable hosts.
pub fn normalize_docker_host(host: &str) -> Result<Url, OrchestratorError> {
    let invalid = |reason: &str| OrchestratorError::InvalidHost {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("host is empty"));
    }
    if trimmed.starts_with("unix://") || trimmed.starts_with("npipe://") {
        return Err(invalid(
            "socket transports are not supported; expose the engine over tcp://",
        ));
    }

    let candidate = if let Some(rest) = trimmed.strip_prefix("tcp://") {
        format!("http://{rest}")
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Decode a newline-delimited JSON byte stream into cluster events.
///
/// Chunk boundaries do not have to align with lines. A transport error or an
/// undecodable line is yielded as an error item and ends the stream.
pub(crate) fn decode_event_stream<S, B, E>(bytes: S, endpoint: String) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        buffer: Vec<u8>,
        endpoint: String,
        done: bool,
    }

    let initial = State {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        endpoint,
        done: false,
    };

    stream::unfold(initial, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            if let Some(newline) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=newline).collect();
                let line = line.trim_ascii();
                if line.is_empty() {
                    continue;
                }
                let item = decode_event(line, &state.endpoint);
                state.done = item.is_err();
                return Some((item, state));
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.done = true;
                    let error = OrchestratorError::ConnectionFailed {
                        endpoint: state.endpoint.clone(),
                        reason: e.to_string(),
                    };
                    return Some((Err(error), state));
                }
                None => {
                    state.done = true;
                    let rest = std::mem::take(&mut state.buffer);
                    let rest = rest.trim_ascii();
                    if rest.is_empty() {
                        return None;
                    }
                    let item = decode_event(rest, &state.endpoint);
                    return Some((item, state));
                }
            }
        }
    })
    .boxed()
}

fn decode_event(line: &[u8], endpoint: &str) -> Result<ClusterEvent, OrchestratorError> {
    serde_json::from_slice(line).map_err(|e| OrchestratorError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod docker_tests;

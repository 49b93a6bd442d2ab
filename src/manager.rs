// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Client for the Bindman DNS manager webhook API.
//!
//! The manager exposes CRUD operations over DNS records:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | get       | `GET /records/{name}/{type}` |
//! | add       | `POST /records` with `{name, type, value}` |
//! | update    | `PUT /records` with `{name, type, value}` |
//! | remove    | `DELETE /records/{name}/{type}` |
//!
//! A `404` on `get` is reported as [`ManagerError::RecordNotFound`] so the sync loop
//! can tell "create it" apart from "the manager is unhealthy".

use crate::errors::ManagerError;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// A DNS record as understood by the DNS manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Fully-qualified record name (trailing dot)
    pub name: String,
    /// Record type, `A` for everything this listener manages
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record value, the reverse proxy address
    pub value: String,
}

impl DnsRecord {
    /// Build a record from its parts.
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
        }
    }
}

/// DNS manager operations consumed by the listener.
#[async_trait]
pub trait DnsManager: Send + Sync {
    /// Fetch a record; [`ManagerError::RecordNotFound`] when it does not exist.
    async fn get_record(&self, name: &str, record_type: &str) -> Result<DnsRecord, ManagerError>;

    /// Create a record.
    async fn add_record(
        &self,
        name: &str,
        record_type: &str,
        value: &str,
    ) -> Result<(), ManagerError>;

    /// Replace an existing record.
    async fn update_record(&self, record: &DnsRecord) -> Result<(), ManagerError>;

    /// Delete a record.
    async fn remove_record(&self, name: &str, record_type: &str) -> Result<(), ManagerError>;
}

/// HTTP client for the Bindman webhook API.
#[derive(Debug, Clone)]
pub struct BindmanClient {
    client: HttpClient,
    base_url: Url,
}

impl BindmanClient {
    /// Create a client for the manager reachable at `address`.
    ///
    /// `http://` is assumed when no scheme is given.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidAddress`] if the address is blank or not a URL.
    pub fn new(address: &str) -> Result<Self, ManagerError> {
        Self::with_client(address, HttpClient::new())
    }

    /// Same as [`BindmanClient::new`] with a caller-provided HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidAddress`] if the address is blank or not a URL.
    pub fn with_client(address: &str, client: HttpClient) -> Result<Self, ManagerError> {
        Ok(Self {
            client,
            base_url: build_base_url(address)?,
        })
    }

    /// Base URL every request is built from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build the URL of an API path under the base URL.
    ///
    /// Segments are percent-encoded, so record names are safe to pass as-is.
    #[must_use]
    pub fn build_api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, ManagerError> {
        let response = request
            .send()
            .await
            .map_err(|e| ManagerError::HttpConnectionFailed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let reason = response.text().await.unwrap_or_default();
        Err(ManagerError::UnexpectedResponse {
            endpoint: endpoint.to_string(),
            status_code: status.as_u16(),
            reason,
        })
    }

    async fn send_record(&self, method: Method, record: &DnsRecord) -> Result<(), ManagerError> {
        let url = self.build_api_url(&["records"]);
        let endpoint = url.to_string();
        debug!(method = %method, url = %endpoint, name = %record.name, "Calling DNS manager");

        let request = self.client.request(method, url).json(record);
        self.send(request, &endpoint).await?;
        Ok(())
    }
}

#[async_trait]
impl DnsManager for BindmanClient {
    async fn get_record(&self, name: &str, record_type: &str) -> Result<DnsRecord, ManagerError> {
        let url = self.build_api_url(&["records", name, record_type]);
        let endpoint = url.to_string();
        debug!(url = %endpoint, "Fetching record from DNS manager");

        let response = match self.send(self.client.get(url), &endpoint).await {
            Err(ManagerError::UnexpectedResponse { status_code, .. })
                if status_code == StatusCode::NOT_FOUND.as_u16() =>
            {
                return Err(ManagerError::RecordNotFound {
                    name: name.to_string(),
                    record_type: record_type.to_string(),
                });
            }
            other => other?,
        };

        response
            .json()
            .await
            .map_err(|e| ManagerError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            })
    }

    async fn add_record(
        &self,
        name: &str,
        record_type: &str,
        value: &str,
    ) -> Result<(), ManagerError> {
        self.send_record(Method::POST, &DnsRecord::new(name, record_type, value))
            .await
    }

    async fn update_record(&self, record: &DnsRecord) -> Result<(), ManagerError> {
        self.send_record(Method::PUT, record).await
    }

    async fn remove_record(&self, name: &str, record_type: &str) -> Result<(), ManagerError> {
        let url = self.build_api_url(&["records", name, record_type]);
        let endpoint = url.to_string();
        debug!(url = %endpoint, "Removing record from DNS manager");

        self.send(self.client.delete(url), &endpoint).await?;
        Ok(())
    }
}

/// Normalize the configured manager address into a base URL.
fn build_base_url(address: &str) -> Result<Url, ManagerError> {
    let invalid = |reason: String| ManagerError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("address is empty".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;

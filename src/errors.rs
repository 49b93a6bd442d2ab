// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the swarm listener.
//!
//! This module provides specialized error types for:
//! - Bindman DNS manager webhook operations
//! - Docker Engine API operations (inspection, listing, event stream)
//! - Event handling and the reconciliation engine
//! - Startup configuration and client construction
//!
//! Startup errors carry a distinct process exit code per cause so the operator
//! can tell them apart without reading logs.

use crate::constants::{
    EXIT_INIT_DOCKER_CLIENT, EXIT_INIT_MANAGER_CLIENT, EXIT_METRICS_ENDPOINT,
    EXIT_READING_MANAGER_ADDRESS, EXIT_READING_REVERSE_PROXY_ADDRESS, EXIT_READING_TAGS,
    EXIT_USAGE,
};
use thiserror::Error;

/// Errors returned by the DNS manager webhook client.
#[derive(Error, Debug, Clone)]
pub enum ManagerError {
    /// Record not found (HTTP 404 from the DNS manager)
    ///
    /// Distinct from every other failure: the sync loop creates the record when it
    /// sees this, and only logs anything else.
    #[error("DNS record '{name}' of type {record_type} not found on the DNS manager")]
    RecordNotFound {
        /// Fully-qualified record name
        name: String,
        /// Record type (always "A" for this listener)
        record_type: String,
    },

    /// The DNS manager answered with an unexpected HTTP status
    #[error("Unexpected HTTP response from DNS manager {endpoint}: {status_code} {reason}")]
    UnexpectedResponse {
        /// The URL that was called
        endpoint: String,
        /// HTTP status code
        status_code: u16,
        /// Response body or error message
        reason: String,
    },

    /// The HTTP request never produced a response (refused, reset, DNS failure)
    #[error("HTTP connection to DNS manager {endpoint} failed: {reason}")]
    HttpConnectionFailed {
        /// The URL that could not be reached
        endpoint: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The response body could not be decoded
    #[error("Invalid response from DNS manager {endpoint}: {reason}")]
    InvalidResponse {
        /// The URL that returned the body
        endpoint: String,
        /// Decoding failure
        reason: String,
    },

    /// The configured DNS manager address is not a usable URL
    #[error("Invalid DNS manager address '{address}': {reason}")]
    InvalidAddress {
        /// The configured address
        address: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ManagerError {
    /// Returns true if the DNS manager reported that the record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Short category used as a metrics label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RecordNotFound { .. } => "not_found",
            Self::UnexpectedResponse { .. } => "http_error",
            Self::HttpConnectionFailed { .. } => "connection_error",
            Self::InvalidResponse { .. } => "decode_error",
            Self::InvalidAddress { .. } => "configuration_error",
        }
    }
}

/// Errors returned by the Docker Engine API client.
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    /// Service not found (HTTP 404 from the Docker API)
    #[error("Service '{name}' not found on the swarm")]
    ServiceNotFound {
        /// Service name or ID that was looked up
        name: String,
    },

    /// The Docker API answered with an unexpected HTTP status
    #[error("Unexpected HTTP response from Docker API {endpoint}: {status_code} {reason}")]
    UnexpectedResponse {
        /// The URL that was called
        endpoint: String,
        /// HTTP status code
        status_code: u16,
        /// Response body or error message
        reason: String,
    },

    /// The Docker API could not be reached
    #[error("HTTP connection to Docker API {endpoint} failed: {reason}")]
    ConnectionFailed {
        /// The URL that could not be reached
        endpoint: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// A response or event could not be decoded
    #[error("Invalid response from Docker API {endpoint}: {reason}")]
    InvalidResponse {
        /// The URL that returned the body
        endpoint: String,
        /// Decoding failure
        reason: String,
    },

    /// The event stream ended
    #[error("Docker event stream closed")]
    StreamClosed,

    /// The configured Docker host cannot be used
    #[error("Invalid Docker host '{host}': {reason}")]
    InvalidHost {
        /// The configured host
        host: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Errors raised while handling events and running the reconciliation engine.
#[derive(Error, Debug, Clone)]
pub enum ListenerError {
    /// Inspection kept failing until every attempt was used
    ///
    /// Distinct from a transport error: the caller gives up on this event and lets
    /// the next event or sync pass retry.
    #[error("Exhausted {attempts} attempts to inspect service '{service}'")]
    InspectRetriesExhausted {
        /// The service that could not be inspected
        service: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// A remove event arrived for a service the listener never recorded
    #[error("Unable to retrieve service '{service}' information from cache")]
    NotInCache {
        /// The service that was looked up
        service: String,
    },

    /// The DNS manager rejected or failed an operation
    #[error("DNS manager operation failed: {0}")]
    DnsManager(#[source] ManagerError),

    /// A sync pass could not list the swarm services
    #[error("Unable to list swarm services: {0}")]
    ListServicesFailed(#[source] OrchestratorError),

    /// The Docker event stream failed; fatal for the process
    #[error("Error communicating with the docker swarm cluster: {0}")]
    EventStreamFailed(#[source] OrchestratorError),

    /// The operation was interrupted by shutdown
    #[error("Operation cancelled by shutdown")]
    Cancelled,
}

impl ListenerError {
    /// Short category used as a metrics label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InspectRetriesExhausted { .. } => "inspect_exhausted",
            Self::NotInCache { .. } => "not_in_cache",
            Self::DnsManager(e) => e.kind(),
            Self::ListServicesFailed(_) => "list_services",
            Self::EventStreamFailed(_) => "event_stream",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Configuration errors detected at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No DNS manager address configured
    #[error("The BINDMAN_DNS_MANAGER_ADDRESS environment variable was not defined")]
    MissingManagerAddress,

    /// No reverse proxy address configured
    #[error("The BINDMAN_REVERSE_PROXY_ADDRESS environment variable was not defined")]
    MissingReverseProxyAddress,

    /// No DNS tags configured
    #[error("The BINDMAN_DNS_TAGS environment variable was not defined")]
    MissingTags,
}

/// Fatal errors that abort the process before the listener starts.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The command line could not be parsed
    #[error("Invalid command line: {0}")]
    Usage(#[source] clap::Error),

    /// Required configuration is missing or invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The Docker client could not be created
    #[error("Not possible to start the swarm listener; could not create the Docker client: {0}")]
    DockerClient(#[source] OrchestratorError),

    /// The DNS manager client could not be created
    #[error("Not possible to start the swarm listener; could not create the DNS manager client: {0}")]
    ManagerClient(#[source] ManagerError),

    /// The metrics endpoint could not be bound
    #[error("Unable to bind the metrics endpoint on {address}: {source}")]
    MetricsEndpoint {
        /// The configured bind address
        address: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(ConfigError::MissingManagerAddress) => EXIT_READING_MANAGER_ADDRESS,
            Self::Config(ConfigError::MissingReverseProxyAddress) => {
                EXIT_READING_REVERSE_PROXY_ADDRESS
            }
            Self::Config(ConfigError::MissingTags) => EXIT_READING_TAGS,
            Self::DockerClient(_) => EXIT_INIT_DOCKER_CLIENT,
            Self::ManagerClient(_) => EXIT_INIT_MANAGER_CLIENT,
            Self::MetricsEndpoint { .. } => EXIT_METRICS_ENDPOINT,
            Self::Usage(_) => EXIT_USAGE,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;

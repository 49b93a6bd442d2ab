// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the swarm listener.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Traefik Label Constants
// ============================================================================

/// Legacy (Traefik 1.x) label holding the frontend rule
pub const TRAEFIK_V1_RULE_LABEL: &str = "traefik.frontend.rule";

/// Legacy (Traefik 1.x) label holding the frontend entry points
pub const TRAEFIK_V1_ENTRY_POINTS_LABEL: &str = "traefik.frontend.entryPoints";

/// Pattern for modern (Traefik 2.x) router rule labels
pub const TRAEFIK_V2_RULE_LABEL_PATTERN: &str = r"^traefik\.http\.routers\.\S+\.rule$";

/// Pattern for modern (Traefik 2.x) router entry point labels
pub const TRAEFIK_V2_ENTRY_POINTS_LABEL_PATTERN: &str =
    r"^traefik\.http\.routers\.\S+\.entryPoints$";

/// Label every reconcilable service must carry
pub const TRAEFIK_ENABLE_LABEL: &str = "traefik.enable";

// ============================================================================
// Docker Constants
// ============================================================================

/// Docker event type for swarm services
pub const EVENT_TYPE_SERVICE: &str = "service";

/// Docker event scope for cluster-level (swarm) events
pub const EVENT_SCOPE_SWARM: &str = "swarm";

/// Actor attribute carrying the service name
pub const ACTOR_ATTRIBUTE_NAME: &str = "name";

/// Default Docker Engine API endpoint
pub const DEFAULT_DOCKER_HOST: &str = "http://localhost:2375";

// ============================================================================
// DNS Constants
// ============================================================================

/// The only record type this listener manages
pub const RECORD_TYPE_A: &str = "A";

// ============================================================================
// Timing Constants
// ============================================================================

/// Maximum number of reconciliation passes before the sync loop stops
pub const DEFAULT_SYNC_MAX_PASSES: u32 = 100;

/// Base interval of the sync loop backoff (1 minute)
pub const DEFAULT_SYNC_BASE_INTERVAL_SECS: u64 = 60;

/// Upper bound for a single wait between reconciliation passes (1 hour)
pub const DEFAULT_SYNC_MAX_INTERVAL_SECS: u64 = 3600;

/// Attempts made to inspect a service before giving up
pub const DEFAULT_INSPECT_MAX_ATTEMPTS: u32 = 3;

/// Base interval of the inspection backoff (1 second)
pub const DEFAULT_INSPECT_BASE_INTERVAL_MILLIS: u64 = 1000;

/// Upper bound for a single wait between inspection attempts
pub const DEFAULT_INSPECT_MAX_INTERVAL_MILLIS: u64 = 30_000;

/// Grace period granted to in-flight calls after cancellation
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 2;

// ============================================================================
// Process Exit Codes
// ============================================================================

/// The Docker client could not be created
pub const EXIT_INIT_DOCKER_CLIENT: i32 = 2;

/// The DNS manager webhook client could not be created
pub const EXIT_INIT_MANAGER_CLIENT: i32 = 3;

/// The Docker event stream failed
pub const EXIT_TALK_TO_DOCKER: i32 = 4;

/// No DNS tags were configured
pub const EXIT_READING_TAGS: i32 = 5;

/// No reverse proxy address was configured
pub const EXIT_READING_REVERSE_PROXY_ADDRESS: i32 = 6;

/// No DNS manager address was configured
pub const EXIT_READING_MANAGER_ADDRESS: i32 = 7;

/// The metrics endpoint could not be bound
pub const EXIT_METRICS_ENDPOINT: i32 = 8;

/// The command line could not be parsed
pub const EXIT_USAGE: i32 = 9;

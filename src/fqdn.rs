// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hostname canonicalization for names crossing into the DNS manager.

/// Convert a hostname into a fully-qualified name by appending a trailing dot.
///
/// Empty names and names that already end with `.` are returned unchanged.
#[must_use]
pub fn to_fqdn(name: &str) -> String {
    if name.is_empty() || name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Strip the trailing dot of a fully-qualified name, if present.
#[must_use]
pub fn from_fqdn(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_string()
}

#[cfg(test)]
#[path = "fqdn_tests.rs"]
mod fqdn_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Traefik label extraction.
//!
//! Services declare the hostnames they want routed to them, and the entry points
//! they opt into, through Traefik labels. Two label dialects are understood at the
//! same time:
//!
//! - **Traefik 1.x** - fixed keys `traefik.frontend.rule` and `traefik.frontend.entryPoints`
//! - **Traefik 2.x** - any number of routers, `traefik.http.routers.<name>.rule` and
//!   `traefik.http.routers.<name>.entryPoints`
//!
//! Rule values are scanned for `Host:` clauses (1.x) and `Host(...)` matchers (2.x).
//! Everything else in a rule (paths, methods, boolean operators) is ignored; this is
//! token extraction, not an evaluation of the rule grammar.
//!
//! # Example
//!
//! ```rust
//! use bindman_swarm_listener::labels::host_names_from_rule;
//!
//! let hosts = host_names_from_rule("Host(`a.example.com`) || Host(`b.example.com`)");
//! assert_eq!(hosts, vec!["a.example.com", "b.example.com"]);
//! ```

use crate::constants::{
    TRAEFIK_V1_ENTRY_POINTS_LABEL, TRAEFIK_V1_RULE_LABEL, TRAEFIK_V2_ENTRY_POINTS_LABEL_PATTERN,
    TRAEFIK_V2_RULE_LABEL_PATTERN,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Matches `Host(...)` matchers (group 1) and legacy `Host:` clauses (group 2).
///
/// A legacy clause ends at `;`, at a boolean operator, or where another matcher opens.
static HOST_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bHost\(([^)]*)\)|\bHost:([^;|&()`]*)").expect("host matcher regex is valid")
});

static V2_RULE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(TRAEFIK_V2_RULE_LABEL_PATTERN).expect("router rule label regex is valid")
});

static V2_ENTRY_POINTS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(TRAEFIK_V2_ENTRY_POINTS_LABEL_PATTERN)
        .expect("router entry points label regex is valid")
});

/// Hostnames and entry point tags a service asks for through its labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceLabels {
    /// Hostnames in order of first appearance, without duplicates
    pub host_names: Vec<String>,
    /// Entry point tags in order of first appearance, without duplicates
    pub tags: Vec<String>,
}

/// Extract hostnames and tags from a service's label set.
///
/// Both dialects contribute to the same flat result. Labels that do not match any
/// known key are ignored, and a service without routing labels yields empty lists.
#[must_use]
pub fn extract(labels: &HashMap<String, String>) -> ServiceLabels {
    let mut extracted = ServiceLabels::default();

    for key in find_host_name_labels(labels) {
        for host in host_names_from_rule(&labels[&key]) {
            push_unique(&mut extracted.host_names, host);
        }
    }

    for key in find_entry_point_labels(labels) {
        for tag in labels[&key].split(',') {
            let tag = tag.trim();
            if !tag.is_empty() {
                push_unique(&mut extracted.tags, tag.to_string());
            }
        }
    }

    extracted
}

/// Keys of all labels carrying a routing rule, in either dialect.
#[must_use]
pub fn find_host_name_labels(labels: &HashMap<String, String>) -> Vec<String> {
    find_labels(labels, TRAEFIK_V1_RULE_LABEL, &V2_RULE_LABEL)
}

/// Keys of all labels carrying entry points, in either dialect.
#[must_use]
pub fn find_entry_point_labels(labels: &HashMap<String, String>) -> Vec<String> {
    find_labels(labels, TRAEFIK_V1_ENTRY_POINTS_LABEL, &V2_ENTRY_POINTS_LABEL)
}

fn find_labels(labels: &HashMap<String, String>, legacy_key: &str, router: &Regex) -> Vec<String> {
    let mut keys: Vec<String> = labels
        .keys()
        .filter(|key| key.as_str() == legacy_key || router.is_match(key))
        .cloned()
        .collect();
    // Label maps have no stable order; sort so extraction output is reproducible.
    keys.sort();
    keys
}

/// Parse the hostnames out of a single Traefik rule.
///
/// Accepted syntaxes:
///
/// - `Host:a.example.com,b.example.com` - legacy, `;` separates it from other clauses,
///   names are separated by commas and/or whitespace
/// - ``Host(`a.example.com`, `b.example.com`)`` - function-call syntax, possibly
///   combined with other matchers through `||` / `&&`
///
/// A rule without any host matcher yields an empty list, never an error.
#[must_use]
pub fn host_names_from_rule(rule: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut position = 0;

    while let Some(captures) = HOST_MATCHER.captures_at(rule, position) {
        let Some(matched) = captures.get(0) else {
            break;
        };
        position = matched.end();

        if let Some(arguments) = captures.get(1) {
            for name in arguments.as_str().split(',') {
                let name = name.trim().trim_matches(|c| c == '`' || c == '"').trim();
                if !name.is_empty() {
                    push_unique(&mut hosts, name.to_string());
                }
            }
        } else if let Some(clause) = captures.get(2) {
            let mut names = clause.as_str();
            if rule[clause.end()..].starts_with('(') {
                // The last word names the next matcher, e.g. `Host:a.com Host(`b.com`)`.
                names = names.trim_end_matches(|c: char| !c.is_whitespace() && c != ',');
                position = clause.start() + names.len();
            }
            for name in names
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|name| !name.is_empty())
            {
                push_unique(&mut hosts, name.to_string());
            }
        }
    }

    hosts
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;

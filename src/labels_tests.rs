// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `labels.rs`

#[cfg(test)]
mod tests {
    use super::super::{extract, find_host_name_labels, host_names_from_rule};
    use std::collections::{BTreeSet, HashMap};

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn set(values: &[String]) -> BTreeSet<String> {
        values.iter().cloned().collect()
    }

    fn expected(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    // =====================================================
    // Label key discovery
    // =====================================================

    #[test]
    fn test_find_host_name_labels() {
        let map = labels(&[
            ("traefik.frontend.rule", "v1.x"),
            ("traefik.frontenda.rule", "v1.x"),
            (" traefik.frontend.rule", "v1.x"),
            ("traefika..frontend.rulse ", "v1.x"),
            ("traefik.http.routers.whoami.rule", "v2.x"),
            ("traefik.http.routers.asda00.rule", "v2.x"),
            ("traefik.http.routers.asda--asdad.rule", "v2.x"),
            ("traefik.http.routers.asda_Adsda.rule", "v2.x"),
            ("traefiks.https.routers.whoami.rules", "v2.x"),
            (" traefiks.https.routers.whoami.rules", "v2.x"),
            (" traefiks.https.routers.whoami.rules ", "v2.x"),
        ]);

        let found: BTreeSet<String> = find_host_name_labels(&map).into_iter().collect();

        assert_eq!(
            found,
            expected(&[
                "traefik.frontend.rule",
                "traefik.http.routers.whoami.rule",
                "traefik.http.routers.asda_Adsda.rule",
                "traefik.http.routers.asda00.rule",
                "traefik.http.routers.asda--asdad.rule",
            ])
        );
    }

    // =====================================================
    // Rule parsing
    // =====================================================

    #[test]
    fn test_rules_without_hosts_yield_nothing() {
        for rule in ["80", "traefik-net", "internal_http,internal_https", "true", ""] {
            assert!(
                host_names_from_rule(rule).is_empty(),
                "rule {rule:?} should not produce hostnames"
            );
        }
    }

    #[test]
    fn test_function_syntax() {
        assert_eq!(
            host_names_from_rule("Host(`anonovo2021.labbs.com.br`, `anonovo20212.labbs.com.br`)"),
            vec!["anonovo2021.labbs.com.br", "anonovo20212.labbs.com.br"]
        );
        assert_eq!(
            host_names_from_rule("Host(`anonovo2020.labbs.com.br`)"),
            vec!["anonovo2020.labbs.com.br"]
        );
    }

    #[test]
    fn test_function_syntax_with_boolean_clauses() {
        assert_eq!(
            host_names_from_rule("Host(`example.com`) || (Host(`example.org`) && Path(`/traefik`))"),
            vec!["example.com", "example.org"]
        );
    }

    #[test]
    fn test_function_syntax_without_spaces() {
        assert_eq!(
            host_names_from_rule("Host(`a.example.com`,`b.example.com`)"),
            vec!["a.example.com", "b.example.com"]
        );
    }

    #[test]
    fn test_empty_function_call() {
        assert!(host_names_from_rule("Host(``)").is_empty());
    }

    #[test]
    fn test_legacy_single_host() {
        assert_eq!(
            host_names_from_rule("Host:anonove2023.labbs.com.br"),
            vec!["anonove2023.labbs.com.br"]
        );
    }

    #[test]
    fn test_legacy_multiple_clauses() {
        assert_eq!(
            host_names_from_rule(
                "Host:anonovo1900.labbs.com.br; Host:anonovo1901.labbs.com.br ;Host:anonovo1902.labbs.com.br"
            ),
            vec![
                "anonovo1900.labbs.com.br",
                "anonovo1901.labbs.com.br",
                "anonovo1902.labbs.com.br"
            ]
        );
        assert_eq!(
            host_names_from_rule("Host:foo.test; Host:bar.test"),
            vec!["foo.test", "bar.test"]
        );
    }

    #[test]
    fn test_legacy_whitespace_handling() {
        let cases = [
            "Host:my-subdomain.example.com",
            "    Host:my-subdomain.example.com",
            "Host:my-subdomain.example.com     ",
            "  Host:  my-subdomain.example.com     ",
            "  Host:  my-subdomain.example.com,   ,  ",
            "Path:/test;Host:my-subdomain.example.com;Method:GET",
        ];
        for rule in cases {
            assert_eq!(
                host_names_from_rule(rule),
                vec!["my-subdomain.example.com"],
                "rule {rule:?}"
            );
        }
    }

    #[test]
    fn test_legacy_host_lists() {
        let want = vec!["my-subdomain.example.com", "www.example.com", "example.com"];
        assert_eq!(
            host_names_from_rule("Host:my-subdomain.example.com,www.example.com,example.com"),
            want
        );
        assert_eq!(
            host_names_from_rule("Host:my-subdomain.example.com, www.example.com, example.com"),
            want
        );
        assert_eq!(
            host_names_from_rule(
                "Path:/test;Host:my-subdomain.example.com, www.example.com, example.com;Method:GET"
            ),
            want
        );
    }

    #[test]
    fn test_legacy_clause_mixed_with_matchers() {
        assert_eq!(
            host_names_from_rule("Host:a.com || Host(`b.com`)"),
            vec!["a.com", "b.com"]
        );
        assert_eq!(
            host_names_from_rule("Host:a.com,c.com && PathPrefix(`/api`)"),
            vec!["a.com", "c.com"]
        );
        assert_eq!(
            host_names_from_rule("Host:a.com Host(`b.com`)"),
            vec!["a.com", "b.com"]
        );
        assert_eq!(
            host_names_from_rule("Host:a.com PathPrefix(`/api`)"),
            vec!["a.com"]
        );
    }

    #[test]
    fn test_duplicate_hosts_collapse() {
        assert_eq!(
            host_names_from_rule("Host(`a.test`) || Host(`a.test`)"),
            vec!["a.test"]
        );
    }

    // =====================================================
    // Full extraction
    // =====================================================

    #[test]
    fn test_extract_modern_router() {
        let map = labels(&[
            (
                "traefik.http.routers.r1.rule",
                "Host(`a.example.com`,`b.example.com`)",
            ),
            ("traefik.http.routers.r1.entryPoints", "public"),
        ]);

        let extracted = extract(&map);

        assert_eq!(
            set(&extracted.host_names),
            expected(&["a.example.com", "b.example.com"])
        );
        assert_eq!(extracted.tags, vec!["public"]);
    }

    #[test]
    fn test_extract_legacy_labels() {
        let map = labels(&[
            ("traefik.frontend.rule", "Host:foo.test; Host:bar.test"),
            ("traefik.frontend.entryPoints", "internal_http,internal_https"),
            ("traefik.port", "80"),
        ]);

        let extracted = extract(&map);

        assert_eq!(set(&extracted.host_names), expected(&["foo.test", "bar.test"]));
        assert_eq!(
            set(&extracted.tags),
            expected(&["internal_http", "internal_https"])
        );
    }

    #[test]
    fn test_extract_merges_dialects_and_routers() {
        let map = labels(&[
            ("traefik.frontend.rule", "Host:legacy.test"),
            ("traefik.frontend.entryPoints", "http"),
            ("traefik.http.routers.api.rule", "Host(`api.test`)"),
            ("traefik.http.routers.api.entryPoints", "public, internal"),
            ("traefik.http.routers.web.rule", "Host(`web.test`) && PathPrefix(`/`)"),
            ("traefik.http.routers.web.entryPoints", "public"),
        ]);

        let extracted = extract(&map);

        assert_eq!(
            set(&extracted.host_names),
            expected(&["legacy.test", "api.test", "web.test"])
        );
        assert_eq!(
            set(&extracted.tags),
            expected(&["http", "public", "internal"])
        );
    }

    #[test]
    fn test_extract_without_routing_labels() {
        let map = labels(&[("com.docker.stack.namespace", "demo")]);
        let extracted = extract(&map);
        assert!(extracted.host_names.is_empty());
        assert!(extracted.tags.is_empty());
    }

    #[test]
    fn test_extract_ignores_blank_tags() {
        let map = labels(&[("traefik.frontend.entryPoints", " , public,, ")]);
        assert_eq!(extract(&map).tags, vec!["public"]);
    }

    #[test]
    fn test_extract_is_order_independent() {
        let forward = labels(&[
            ("traefik.http.routers.a.rule", "Host(`one.test`, `two.test`)"),
            ("traefik.http.routers.a.entryPoints", "public,internal"),
        ]);
        let reordered = labels(&[
            ("traefik.http.routers.a.entryPoints", "internal,public"),
            ("traefik.http.routers.a.rule", "Host(`two.test`, `one.test`)"),
        ]);

        let a = extract(&forward);
        let b = extract(&reordered);

        assert_eq!(set(&a.host_names), set(&b.host_names));
        assert_eq!(set(&a.tags), set(&b.tags));
    }
}

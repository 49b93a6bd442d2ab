// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `docker.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        decode_event_stream, normalize_docker_host, ClusterEvent, DockerClient, Filters,
        Orchestrator,
    };
    use crate::errors::OrchestratorError;
    use futures::{stream, StreamExt};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SERVICE_EVENT: &str = r#"{"Type":"service","Action":"create","scope":"swarm","Actor":{"ID":"abc","Attributes":{"name":"web1"}}}"#;

    #[test]
    fn test_normalize_tcp_host() {
        let url = normalize_docker_host("tcp://10.0.0.1:2375").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:2375/");
    }

    #[test]
    fn test_normalize_bare_host() {
        let url = normalize_docker_host("docker.internal:2375/").unwrap();
        assert_eq!(url.as_str(), "http://docker.internal:2375/");
    }

    #[test]
    fn test_normalize_keeps_https() {
        let url = normalize_docker_host("https://docker.internal:2376").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_normalize_rejects_unix_socket() {
        let result = normalize_docker_host("unix:///var/run/docker.sock");
        assert!(matches!(result, Err(OrchestratorError::InvalidHost { .. })));
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert!(normalize_docker_host("   ").is_err());
    }

    #[test]
    fn test_filters_query() {
        let filters = Filters::new()
            .add("label", "traefik.enable")
            .add("label", "traefik.frontend.rule");
        assert_eq!(
            filters.to_query(),
            r#"{"label":["traefik.enable","traefik.frontend.rule"]}"#
        );
        assert!(Filters::new().is_empty());
    }

    #[test]
    fn test_cluster_event_service_name() {
        let event: ClusterEvent = serde_json::from_str(SERVICE_EVENT).unwrap();
        assert_eq!(event.event_type, "service");
        assert_eq!(event.action, "create");
        assert_eq!(event.scope, "swarm");
        assert_eq!(event.service_name(), Some("web1"));

        let anonymous = ClusterEvent::default();
        assert_eq!(anonymous.service_name(), None);
    }

    #[tokio::test]
    async fn test_decode_events_across_chunk_boundaries() {
        let (head, tail) = SERVICE_EVENT.split_at(20);
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(head.as_bytes().to_vec()),
            Ok(format!("{tail}\n\n").into_bytes()),
            Ok(SERVICE_EVENT.as_bytes().to_vec()),
        ];

        let events: Vec<_> = decode_event_stream(stream::iter(chunks), "test".to_string())
            .collect()
            .await;

        assert_eq!(events.len(), 2, "trailing event without newline is still decoded");
        for event in events {
            assert_eq!(event.unwrap().service_name(), Some("web1"));
        }
    }

    #[tokio::test]
    async fn test_decode_events_transport_error_ends_stream() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(format!("{SERVICE_EVENT}\n").into_bytes()),
            Err("connection reset".to_string()),
            Ok(format!("{SERVICE_EVENT}\n").into_bytes()),
        ];

        let events: Vec<_> = decode_event_stream(stream::iter(chunks), "test".to_string())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(
            events[1],
            Err(OrchestratorError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_decode_events_invalid_json() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![Ok(b"not json\n".to_vec())];

        let events: Vec<_> = decode_event_stream(stream::iter(chunks), "test".to_string())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Err(OrchestratorError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_services_sends_label_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services"))
            .and(query_param("filters", r#"{"label":["traefik.enable"]}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "ID": "svc1",
                    "Spec": {
                        "Name": "web1",
                        "Labels": {"traefik.enable": "true"}
                    }
                },
                {
                    "ID": "svc2",
                    "Spec": {"Name": "web2"}
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = DockerClient::new(&server.uri()).unwrap();
        let services = client
            .list_services(&Filters::new().add("label", "traefik.enable"))
            .await
            .unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].id, "svc1");
        assert_eq!(services[0].name, "web1");
        assert_eq!(
            services[0].labels.get("traefik.enable").map(String::as_str),
            Some("true")
        );
        assert!(services[1].labels.is_empty());
    }

    #[tokio::test]
    async fn test_inspect_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/web1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ID": "svc1",
                "Spec": {
                    "Name": "web1",
                    "Labels": {"traefik.frontend.rule": "Host:a.example.com"}
                }
            })))
            .mount(&server)
            .await;

        let client = DockerClient::new(&server.uri()).unwrap();
        let service = client.inspect_service("web1").await.unwrap();

        assert_eq!(service.name, "web1");
        assert_eq!(service.labels.len(), 1);
    }

    #[tokio::test]
    async fn test_inspect_missing_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/ghost"))
            .respond_with(ResponseTemplate::new(404).set_body_string("service ghost not found"))
            .mount(&server)
            .await;

        let client = DockerClient::new(&server.uri()).unwrap();
        let result = client.inspect_service("ghost").await;

        assert!(matches!(
            result,
            Err(OrchestratorError::ServiceNotFound { ref name }) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_inspect_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/web1"))
            .respond_with(ResponseTemplate::new(503).set_body_string("swarm is down"))
            .mount(&server)
            .await;

        let client = DockerClient::new(&server.uri()).unwrap();
        let result = client.inspect_service("web1").await;

        assert!(matches!(
            result,
            Err(OrchestratorError::UnexpectedResponse {
                status_code: 503,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_event_stream() {
        let server = MockServer::start().await;
        let body = format!("{SERVICE_EVENT}\n{SERVICE_EVENT}\n");
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("filters", r#"{"scope":["swarm"]}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = DockerClient::new(&server.uri()).unwrap();
        let events: Vec<_> = client
            .events(&Filters::new().add("scope", "swarm"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(events.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Port 9 (discard) is not expected to run an HTTP server
        let client = DockerClient::new("tcp://127.0.0.1:9").unwrap();
        let result = client.list_services(&Filters::new()).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::ConnectionFailed { .. })
        ));
    }
}

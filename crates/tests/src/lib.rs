//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载到路由传输的完整链路
//! - 真实目的地 (文件 / UDP) 的端到端路由
//! - 关闭与刷新的生命周期行为

#[cfg(test)]
mod contract_tests {
    use contracts::{Envelope, EventClassification};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_demo_config_loads() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/splitter.toml");
        let bp = config_loader::ConfigLoader::load_from_path(&path).unwrap();
        assert!(bp.secondary.dsn.is_none());
        assert_eq!(
            bp.secondary.fallback_env,
            Some(vec!["SENTRY_PERFORMANCE_DSN".into(), "SENTRY_DSN".into()])
        );
    }

    #[test]
    fn test_demo_envelopes_parse() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/envelopes.jsonl");
        let content = std::fs::read_to_string(path).unwrap();
        let errors = content
            .lines()
            .map(|line| serde_json::from_str::<Envelope>(line).unwrap())
            .filter(|envelope| envelope.classification() == EventClassification::Error)
            .count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn test_wire_envelope_classification() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"headers":{"event_id":"abc"},"items":[{"type":"event","payload":{"type":"error","level":"fatal"}},{"type":"attachment"}]}"#,
        )
        .unwrap();
        assert_eq!(envelope.classification(), EventClassification::Error);
        assert_eq!(envelope.item_types(), vec!["event", "attachment"]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ContractError, Envelope, Item, RoutingBlueprint};
    use dispatcher::{
        configured_fallbacks, DispatcherError, FallbackSource, LifecycleState, RoutingTransport,
        Transport,
    };
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn file_blueprint(base: &Path, secondary: &str) -> RoutingBlueprint {
        let content = format!(
            r#"
[primary]
dsn = "https://errors@ingest.example.com/1"
sink_type = "file"
[primary.params]
base_path = "{base}"

[secondary]
{secondary}
sink_type = "file"
[secondary.params]
base_path = "{base}"
"#,
            base = base.display()
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    fn records(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn error_event(id: &str) -> Envelope {
        Envelope::new(vec![Item::event(json!({"type": "error", "id": id}))])
    }

    fn transaction(id: &str) -> Envelope {
        Envelope::new(vec![Item::transaction(
            json!({"type": "transaction", "id": id}),
        )])
    }

    /// Config -> RoutingTransport -> file destinations
    ///
    /// 验证完整的数据流：
    /// 1. 错误事件只写入主目的地
    /// 2. 其它信封 (事务、会话、无事件) 只写入次要目的地
    /// 3. 关闭后两个文件都已落盘
    #[tokio::test]
    async fn test_e2e_split_to_file_destinations() {
        let dir = tempdir().unwrap();
        let bp = file_blueprint(dir.path(), r#"dsn = "https://perf@ingest.example.com/2""#);

        let mut transport = RoutingTransport::from_blueprint(&bp, None).await.unwrap();
        assert_eq!(transport.state(), LifecycleState::Active);

        transport.send(error_event("e1")).await.unwrap();
        transport.send(transaction("t1")).await.unwrap();
        transport
            .send(Envelope::new(vec![Item::session(json!({"status": "ok"}))]))
            .await
            .unwrap();
        transport.send(error_event("e2")).await.unwrap();
        // Two events: no primary event, so not an error
        transport
            .send(Envelope::new(vec![
                Item::event(json!({"type": "error"})),
                Item::event(json!({"type": "error"})),
            ]))
            .await
            .unwrap();

        transport.flush(Duration::from_secs(2)).await.unwrap();
        transport.shutdown().await.unwrap();
        assert_eq!(transport.state(), LifecycleState::Closed);

        let stats = transport.stats();
        assert_eq!((stats.primary, stats.secondary, stats.rejected), (2, 3, 0));

        let primary = records(&dir.path().join("1.jsonl"));
        let secondary = records(&dir.path().join("2.jsonl"));
        assert_eq!(primary.len(), 2);
        assert_eq!(secondary.len(), 3);

        let primary_ids: Vec<_> = primary
            .iter()
            .map(|r| r["envelope"]["items"][0]["payload"]["id"].clone())
            .collect();
        assert_eq!(primary_ids, vec![json!("e1"), json!("e2")]);
        assert!(secondary.iter().all(|r| r["project_id"] == "2"));
        assert_eq!(transport.primary().metrics().snapshot().sent_count, 2);
        assert_eq!(transport.secondary().metrics().snapshot().sent_count, 3);
    }

    #[tokio::test]
    async fn test_secondary_from_fallback_sources() {
        let dir = tempdir().unwrap();
        let bp = file_blueprint(dir.path(), "");
        let fallbacks = vec![
            FallbackSource::fixed("SENTRY_PERFORMANCE_DSN", None),
            FallbackSource::fixed(
                "SENTRY_DSN",
                Some("https://prod@ingest.example.com/7".into()),
            ),
        ];

        let mut transport = RoutingTransport::from_blueprint(&bp, Some(&fallbacks))
            .await
            .unwrap();
        assert_eq!(transport.secondary().dsn().project_id(), "7");

        transport.send(transaction("t1")).await.unwrap();
        transport.shutdown().await.unwrap();

        assert_eq!(records(&dir.path().join("7.jsonl")).len(), 1);
    }

    #[tokio::test]
    async fn test_configured_env_fallbacks_are_consulted_in_order() {
        let dir = tempdir().unwrap();
        let bp = file_blueprint(
            dir.path(),
            r#"fallback_env = ["SPLITTER_IT_PERF_DSN", "SPLITTER_IT_PROD_DSN"]"#,
        );
        std::env::set_var("SPLITTER_IT_PERF_DSN", "https://perf@ingest.example.com/21");
        std::env::set_var("SPLITTER_IT_PROD_DSN", "https://prod@ingest.example.com/22");

        let fallbacks = configured_fallbacks(&bp.secondary);
        let result = RoutingTransport::from_blueprint(&bp, fallbacks.as_deref()).await;
        std::env::remove_var("SPLITTER_IT_PERF_DSN");
        std::env::remove_var("SPLITTER_IT_PROD_DSN");

        let mut transport = result.unwrap();
        assert_eq!(transport.secondary().dsn().project_id(), "21");
        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unresolved_secondary_fails_construction() {
        let dir = tempdir().unwrap();
        let bp = file_blueprint(dir.path(), "");
        let fallbacks = vec![
            FallbackSource::fixed("SENTRY_PERFORMANCE_DSN", None),
            FallbackSource::fixed("SENTRY_DSN", Some("  ".into())),
        ];

        let err = RoutingTransport::from_blueprint(&bp, Some(&fallbacks))
            .await
            .err()
            .unwrap();

        match err {
            DispatcherError::Contract(ContractError::UnresolvedDestination {
                parameter,
                fallbacks,
            }) => {
                assert_eq!(parameter, "secondary.dsn");
                assert_eq!(
                    fallbacks,
                    Some(vec!["SENTRY_PERFORMANCE_DSN".into(), "SENTRY_DSN".into()])
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_after_shutdown() {
        let dir = tempdir().unwrap();
        let bp = file_blueprint(dir.path(), r#"dsn = "https://perf@ingest.example.com/2""#);
        let mut transport = RoutingTransport::from_blueprint(&bp, None).await.unwrap();

        transport.shutdown().await.unwrap();
        // Idempotent
        transport.kill().await.unwrap();
        transport.flush(Duration::from_millis(10)).await.unwrap();

        let err = transport.send(error_event("late")).await.unwrap_err();
        assert!(matches!(err, ContractError::TransportClosed { .. }));
        assert_eq!(transport.stats().rejected, 1);
        assert!(records(&dir.path().join("1.jsonl")).is_empty());
    }

    #[tokio::test]
    async fn test_e2e_network_secondary() {
        let dir = tempdir().unwrap();
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let content = format!(
            r#"
[primary]
dsn = "https://errors@ingest.example.com/1"
sink_type = "file"
[primary.params]
base_path = "{base}"

[secondary]
dsn = "udp://perf@127.0.0.1:{port}/2"
sink_type = "network"
[secondary.params]
format = "json"
"#,
            base = dir.path().display()
        );
        let bp = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let mut transport = RoutingTransport::from_blueprint(&bp, None).await.unwrap();

        let envelope = transaction("t-net");
        transport.send(envelope.clone()).await.unwrap();
        transport.flush(Duration::from_secs(2)).await.unwrap();

        let mut buf = vec![0u8; 65_536];
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let received: Envelope = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(received, envelope);

        transport.shutdown().await.unwrap();
        assert!(records(&dir.path().join("1.jsonl")).is_empty());
    }
}

#[cfg(test)]
mod observability_tests {
    use contracts::{Envelope, Item};
    use dispatcher::route_for;
    use observability::RoutingMetricsAggregator;
    use serde_json::json;

    #[test]
    fn test_aggregator_tracks_routes() {
        let envelopes = [
            Envelope::new(vec![Item::event(json!({"type": "error"}))]),
            Envelope::new(vec![Item::event(json!({"type": "default"}))]),
            Envelope::new(vec![]),
        ];

        let mut aggregator = RoutingMetricsAggregator::new();
        for envelope in &envelopes {
            let (route, classification) = route_for(envelope);
            aggregator.update(route.as_str(), &classification, envelope.items.len(), true);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_envelopes, 3);
        assert_eq!(summary.route_counts.get("primary"), Some(&1));
        assert_eq!(summary.route_counts.get("secondary"), Some(&2));
        assert_eq!(summary.classification_counts.get("unclassified"), Some(&1));
    }
}

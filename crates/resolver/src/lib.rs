//! Binding discovery, deprecation successor chase, access policy
//! validation, and query template rendering on top of a [`catalog::Registry`].

pub mod error;
pub mod resolve;

pub use error::ResolverError;
pub use resolve::{Caller, DescribeResult, LineageResult, ListResult, RenderedSource, Resolver, ResolveResult};

#[cfg(test)]
mod tests {
    use catalog::{
        AccessPolicy, CatalogNode, NodeStatus, Ownership, SourceBinding, SourceType,
    };

    use super::*;

    fn empty_node(path: &str) -> CatalogNode {
        CatalogNode {
            path: path.to_string(),
            display_name: None,
            description: None,
            classification: "internal".to_string(),
            tags: vec![],
            ownership: Ownership::default(),
            binding: None,
            policy: None,
            quality: None,
            sla: None,
            freshness: None,
            schema: None,
            documentation: None,
            status: NodeStatus::Active,
            created_at: None,
            updated_at: None,
            successor: None,
            sunset_at: None,
            migration_guide_url: None,
            is_leaf: false,
        }
    }

    fn binding() -> SourceBinding {
        SourceBinding {
            source_type: SourceType::Snowflake,
            config: {
                let mut m = std::collections::BTreeMap::new();
                m.insert("warehouse".to_string(), serde_json::json!("analytics_wh"));
                m.insert(
                    "query".to_string(),
                    serde_json::json!(
                        "SELECT * FROM constituents WHERE benchmark = '{segments[1]}'"
                    ),
                );
                m
            },
            schema: None,
            read_only: true,
            allowed_operations: vec![],
        }
    }

    #[test]
    fn resolves_exact_leaf_binding() {
        let registry = catalog::Registry::empty();
        let mut root = empty_node("benchmarks");
        root.ownership.accountable_owner = Some("index-team@example.com".to_string());
        let mut constituents = empty_node("benchmarks.constituents");
        constituents.binding = Some(binding());
        constituents.is_leaf = true;
        registry.atomic_replace(vec![root, constituents]).unwrap();

        let resolver = Resolver::new(&registry);
        let result = resolver
            .resolve("moniker://benchmarks.constituents/SP500", &Caller::default())
            .unwrap();

        assert_eq!(result.binding_path, "benchmarks.constituents");
        assert_eq!(result.sub_path, Some("SP500".to_string()));
        assert!(result.redirected_from.is_none());
        assert_eq!(
            result.ownership.values.get("accountable_owner").map(String::as_str),
            Some("index-team@example.com")
        );
        let query = result.source.query.unwrap();
        assert!(query.contains("'SP500'"));
    }

    #[test]
    fn missing_binding_anywhere_in_chain_is_not_found() {
        let registry = catalog::Registry::empty();
        registry.atomic_replace(vec![empty_node("benchmarks")]).unwrap();
        let resolver = Resolver::new(&registry);
        let err = resolver
            .resolve("moniker://benchmarks.constituents/SP500", &Caller::default())
            .unwrap_err();
        assert!(matches!(err, ResolverError::NotFound { .. }));
    }

    #[test]
    fn deprecated_node_redirects_to_successor() {
        let registry = catalog::Registry::empty();
        let mut old = empty_node("benchmarks.legacy");
        old.binding = Some(binding());
        old.status = NodeStatus::Deprecated;
        old.successor = Some("benchmarks.constituents".to_string());
        let mut new = empty_node("benchmarks.constituents");
        new.binding = Some(binding());
        registry.atomic_replace(vec![old, new]).unwrap();

        let resolver = Resolver::new(&registry);
        let result = resolver
            .resolve("moniker://benchmarks.legacy/SP500", &Caller::default())
            .unwrap();
        assert_eq!(result.binding_path, "benchmarks.constituents");
        assert_eq!(
            result.redirected_from.as_deref(),
            Some("benchmarks.legacy")
        );
    }

    #[test]
    fn successor_chase_aborts_past_five_hops_and_keeps_original() {
        let registry = catalog::Registry::empty();
        let mut nodes = Vec::new();
        for i in 0..8 {
            let mut n = empty_node(&format!("chain.n{i}"));
            n.status = NodeStatus::Deprecated;
            n.successor = Some(format!("chain.n{}", i + 1));
            n.binding = Some(binding());
            nodes.push(n);
        }
        let mut last = empty_node("chain.n8");
        last.binding = Some(binding());
        nodes.push(last);
        registry.atomic_replace(nodes).unwrap();

        let resolver = Resolver::new(&registry);
        let result = resolver
            .resolve("moniker://chain.n0/x", &Caller::default())
            .unwrap();
        assert_eq!(result.binding_path, "chain.n0");
        assert!(result.redirected_from.is_none());
    }

    #[test]
    fn denied_policy_surfaces_estimated_rows() {
        let registry = catalog::Registry::empty();
        let mut node = empty_node("trades.fills");
        node.binding = Some(binding());
        node.policy = Some(AccessPolicy {
            required_segments: vec![1],
            min_filters: 1,
            base_row_count: 1_000_000,
            max_rows_warn: Some(500_000),
            max_rows_block: Some(2_000_000),
            denial_message: Some("query too broad".to_string()),
            ..Default::default()
        });
        registry.atomic_replace(vec![node]).unwrap();

        let resolver = Resolver::new(&registry);
        let err = resolver
            .resolve("moniker://trades.fills/ALL", &Caller::default())
            .unwrap_err();
        match err {
            ResolverError::AccessDenied { message, estimated_rows } => {
                assert_eq!(message, "query too broad");
                assert!(estimated_rows >= 1_000_000);
            }
            other => panic!("expected AccessDenied, got {other:?}"),
        }
    }

    #[test]
    fn archived_ancestor_binding_is_not_discoverable() {
        let registry = catalog::Registry::empty();
        let mut archived = empty_node("risk");
        archived.status = NodeStatus::Archived;
        archived.binding = Some(binding());
        registry
            .atomic_replace(vec![archived, empty_node("risk.var")])
            .unwrap();

        let resolver = Resolver::new(&registry);
        let err = resolver
            .resolve("moniker://risk.var/2026", &Caller::default())
            .unwrap_err();
        assert!(matches!(err, ResolverError::NotFound { .. }));
    }

    #[test]
    fn lineage_returns_root_to_self_chain() {
        let registry = catalog::Registry::empty();
        registry
            .atomic_replace(vec![
                empty_node("a"),
                empty_node("a.b"),
                empty_node("a.b.c"),
            ])
            .unwrap();
        let resolver = Resolver::new(&registry);
        let lineage = resolver.lineage("moniker://a.b.c").unwrap();
        assert_eq!(lineage.chain, vec!["a", "a.b", "a.b.c"]);
    }

    /// Spec §8 scenario 6: a resolve racing a hot reload never composes a
    /// response out of two different snapshots -- it is either the full,
    /// internally-consistent old body or a clean `NotFound`, never a panic
    /// or a partial/mixed result.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolves_never_observe_a_mixed_snapshot() {
        let registry = std::sync::Arc::new(catalog::Registry::empty());

        let present = || {
            let mut node = empty_node("target");
            node.binding = Some(binding());
            node.ownership.accountable_owner = Some("snapshot-a-owner".to_string());
            vec![node]
        };
        let absent = || vec![empty_node("decoy")];

        registry.atomic_replace(present()).unwrap();

        let reload_registry = registry.clone();
        let reload_task = tokio::spawn(async move {
            for i in 0..200 {
                if i % 2 == 0 {
                    reload_registry.atomic_replace(present()).unwrap();
                } else {
                    reload_registry.atomic_replace(absent()).unwrap();
                }
            }
        });

        let mut readers = Vec::new();
        for _ in 0..8 {
            let reg = registry.clone();
            readers.push(tokio::task::spawn_blocking(move || {
                for _ in 0..200 {
                    let resolver = Resolver::new(&reg);
                    match resolver.resolve("moniker://target/x", &Caller::default()) {
                        Ok(result) => {
                            assert_eq!(result.binding_path, "target");
                            assert_eq!(
                                result
                                    .ownership
                                    .values
                                    .get("accountable_owner")
                                    .map(String::as_str),
                                Some("snapshot-a-owner"),
                                "a binding found in one snapshot must never be paired with \
                                 ownership resolved against another"
                            );
                        }
                        Err(ResolverError::NotFound { .. }) => {}
                        Err(other) => panic!("unexpected error: {other:?}"),
                    }
                }
            }));
        }

        reload_task.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}

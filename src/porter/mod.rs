//! Zone export and import
//!
//! An exported zone replaces every store-assigned key with a name derived
//! from the record itself, so the document can be read, diffed and
//! imported into another zone or another environment:
//!
//! | record       | document key            |
//! |--------------|-------------------------|
//! | zone         | name                    |
//! | cluster      | name                    |
//! | domain       | `host:port`             |
//! | proxy        | name                    |
//! | shared rules | name                    |
//! | route        | domain key + path       |
//!
//! Import reverses the translation, creating records in dependency order
//! and rewriting every reference to the freshly assigned keys.

mod export;
mod import;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::{
    ClusterConstraint, ClusterKey, Cluster, Domain, DomainKey, Proxy, Route, Rule, SharedRules,
    SharedRulesKey, Zone,
};

pub use export::export_zone;
pub use import::import_zone;

/// A zone and everything in it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneObjects {
    #[serde(default)]
    pub zone: Zone,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub proxies: Vec<Proxy>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub shared_rules: Vec<SharedRules>,

    #[serde(skip)]
    pub keys: KeyMaps,
}

/// Key translations built while exporting (store key to document key) or
/// importing (document key to store key)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMaps {
    pub clusters: BTreeMap<ClusterKey, ClusterKey>,
    pub domains: BTreeMap<DomainKey, DomainKey>,
    pub shared_rules: BTreeMap<SharedRulesKey, SharedRulesKey>,
}

impl ZoneObjects {
    /// Number of records held, counting the zone when it has a key
    pub fn len(&self) -> usize {
        usize::from(!self.zone.zone_key.is_empty())
            + self.clusters.len()
            + self.domains.len()
            + self.proxies.len()
            + self.routes.len()
            + self.shared_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A zone import that stopped part way.
///
/// Import is not transactional: `created` holds every record stored before
/// the failure, and nothing was removed again.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ImportError {
    pub created: Box<ZoneObjects>,
    #[source]
    pub source: Error,
}

impl ImportError {
    fn new(created: ZoneObjects, source: Error) -> Self {
        let applied = created.len();
        let source = if applied > 0 {
            Error::PartialFailure {
                operation: "zone import".to_string(),
                applied,
                source: Box::new(source),
            }
        } else {
            source
        };

        Self {
            created: Box::new(created),
            source,
        }
    }
}

/// Every cluster constraint of a rule list
fn rule_constraints(rules: &mut [Rule]) -> impl Iterator<Item = &mut ClusterConstraint> {
    rules.iter_mut().flat_map(|r| r.constraints.iter_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryService;
    use crate::api::ConfigService;
    use crate::config::OutputFormat;
    use crate::model::{
        AllConstraints, Instance, Metadatum, ObjectKind, ProxyFilter, RouteFilter,
        SharedRulesFilter, ZoneFilter, ZoneKey,
    };
    use crate::output;

    fn constraint(cluster: &Cluster, weight: u32) -> ClusterConstraint {
        ClusterConstraint {
            constraint_key: format!("cc-{}", cluster.name),
            cluster_key: cluster.cluster_key.clone(),
            metadata: vec![Metadatum::new("stage", "prod")],
            weight,
            ..Default::default()
        }
    }

    /// A zone with two clusters, two domains, one proxy, two shared rules
    /// and three routes
    fn seed_zone(svc: &MemoryService, name: &str) -> Zone {
        let zone = svc.seed(Zone {
            name: name.into(),
            ..Default::default()
        });
        let zk = zone.zone_key.clone();

        let api = svc.seed(Cluster {
            zone_key: zk.clone(),
            name: "api".into(),
            instances: vec![Instance {
                host: "10.0.0.1".into(),
                port: 8080,
                metadata: vec![],
            }],
            ..Default::default()
        });
        let web = svc.seed(Cluster {
            zone_key: zk.clone(),
            name: "web".into(),
            ..Default::default()
        });

        let www = svc.seed(Domain {
            zone_key: zk.clone(),
            name: "example.com".into(),
            port: 80,
            aliases: vec!["www.example.com".into()],
            ..Default::default()
        });
        let tls = svc.seed(Domain {
            zone_key: zk.clone(),
            name: "example.com".into(),
            port: 443,
            ..Default::default()
        });

        svc.seed(Proxy {
            zone_key: zk.clone(),
            name: "edge".into(),
            domain_keys: vec![www.domain_key.clone(), tls.domain_key.clone()],
            ..Default::default()
        });

        let api_rules = svc.seed(SharedRules {
            zone_key: zk.clone(),
            name: "api-rules".into(),
            default: AllConstraints {
                light: vec![constraint(&api, 1)],
                dark: vec![constraint(&web, 2)],
                ..Default::default()
            },
            rules: vec![Rule {
                rule_key: "rk-1".into(),
                methods: vec!["GET".into()],
                constraints: AllConstraints {
                    light: vec![constraint(&web, 3)],
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        });
        let web_rules = svc.seed(SharedRules {
            zone_key: zk.clone(),
            name: "web-rules".into(),
            default: AllConstraints {
                light: vec![constraint(&web, 1)],
                ..Default::default()
            },
            ..Default::default()
        });

        for (domain, path, rules) in [
            (&www, "/", &web_rules),
            (&www, "/api", &api_rules),
            (&tls, "/", &web_rules),
        ] {
            svc.seed(Route {
                zone_key: zk.clone(),
                domain_key: domain.domain_key.clone(),
                path: path.into(),
                shared_rules_key: rules.shared_rules_key.clone(),
                ..Default::default()
            });
        }

        zone
    }

    #[tokio::test]
    async fn test_export_translates_keys() {
        let svc = MemoryService::new();
        seed_zone(&svc, "prod");

        let zo = export_zone(&svc, "prod").await.unwrap();

        assert_eq!(zo.zone.zone_key, ZoneKey::from("prod"));
        assert!(zo.zone.checksum.is_empty());

        let cluster_keys: Vec<_> = zo.clusters.iter().map(|c| c.cluster_key.as_str()).collect();
        assert_eq!(cluster_keys, vec!["api", "web"]);
        assert!(zo.clusters.iter().all(|c| c.instances.is_empty()));
        assert!(zo.clusters.iter().all(|c| c.checksum.is_empty()));
        assert!(zo.clusters.iter().all(|c| c.zone_key.as_str() == "prod"));

        let domain_keys: Vec<_> = zo.domains.iter().map(|d| d.domain_key.as_str()).collect();
        assert_eq!(domain_keys, vec!["example.com:80", "example.com:443"]);

        assert_eq!(zo.proxies[0].proxy_key.as_str(), "edge");
        assert_eq!(
            zo.proxies[0].domain_keys,
            vec![DomainKey::from("example.com:80"), DomainKey::from("example.com:443")]
        );

        let api_rules = zo.shared_rules.iter().find(|sr| sr.name == "api-rules").unwrap();
        assert_eq!(api_rules.shared_rules_key.as_str(), "api-rules");
        assert_eq!(api_rules.default.light[0].cluster_key.as_str(), "api");
        assert_eq!(api_rules.default.dark[0].cluster_key.as_str(), "web");
        assert!(api_rules.default.light[0].constraint_key.is_empty());
        assert!(api_rules.rules[0].rule_key.is_empty());
        assert_eq!(api_rules.rules[0].constraints.light[0].cluster_key.as_str(), "web");

        let mut route_keys: Vec<_> = zo.routes.iter().map(|r| r.route_key.as_str()).collect();
        route_keys.sort();
        assert_eq!(
            route_keys,
            vec!["example.com:443/", "example.com:80/", "example.com:80/api"]
        );
        let api_route = zo.routes.iter().find(|r| r.path == "/api").unwrap();
        assert_eq!(api_route.domain_key.as_str(), "example.com:80");
        assert_eq!(api_route.shared_rules_key.as_str(), "api-rules");
    }

    #[tokio::test]
    async fn test_export_by_key_and_missing_zone() {
        let svc = MemoryService::new();
        let zone = seed_zone(&svc, "prod");

        let zo = export_zone(&svc, zone.zone_key.as_str()).await.unwrap();
        assert_eq!(zo.zone.name, "prod");

        let err = export_zone(&svc, "staging").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_export_is_deterministic() {
        let svc = MemoryService::new();
        seed_zone(&svc, "prod");

        let first = export_zone(&svc, "prod").await.unwrap();
        let second = export_zone(&svc, "prod").await.unwrap();
        let first = output::encode(&first, OutputFormat::Json).unwrap();
        let second = output::encode(&second, OutputFormat::Json).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("checksum"));
        assert!(!first.contains("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_import_rebuilds_graph() {
        let svc = MemoryService::new();
        seed_zone(&svc, "prod");

        let exported = export_zone(&svc, "prod").await.unwrap();
        let text = output::encode(&exported, OutputFormat::Yaml).unwrap();
        let doc: ZoneObjects = output::decode(&text, OutputFormat::Yaml).unwrap();

        let created = import_zone(&svc, "staging", doc).await.unwrap();
        let zk = created.zone.zone_key.clone();
        assert_eq!(created.zone.name, "staging");
        assert_eq!(created.len(), 1 + 2 + 2 + 1 + 3 + 2);

        let zones: Vec<Zone> = svc.index(&[ZoneFilter::by_name("staging")]).await.unwrap();
        assert_eq!(zones.len(), 1);

        let proxies: Vec<Proxy> = svc.index(&[ProxyFilter::by_zone(&zk)]).await.unwrap();
        let domains: Vec<Domain> = svc
            .index(&[crate::model::DomainFilter::by_zone(&zk)])
            .await
            .unwrap();
        let addr = |dk: &DomainKey| {
            domains
                .iter()
                .find(|d| &d.domain_key == dk)
                .map(Domain::addr)
                .unwrap()
        };
        let proxy_addrs: Vec<_> = proxies[0].domain_keys.iter().map(addr).collect();
        assert_eq!(proxy_addrs, vec!["example.com:80", "example.com:443"]);

        let clusters: Vec<Cluster> = svc
            .index(&[crate::model::ClusterFilter::by_zone(&zk)])
            .await
            .unwrap();
        let cluster_name = |ck: &ClusterKey| {
            clusters
                .iter()
                .find(|c| &c.cluster_key == ck)
                .map(|c| c.name.clone())
                .unwrap()
        };

        let srs: Vec<SharedRules> = svc.index(&[SharedRulesFilter::by_zone(&zk)]).await.unwrap();
        let api_rules = srs.iter().find(|sr| sr.name == "api-rules").unwrap();
        assert_eq!(cluster_name(&api_rules.default.light[0].cluster_key), "api");
        assert_eq!(api_rules.default.light[0].weight, 1);
        assert_eq!(cluster_name(&api_rules.rules[0].constraints.light[0].cluster_key), "web");
        assert_eq!(api_rules.rules[0].constraints.light[0].weight, 3);

        let routes: Vec<Route> = svc
            .index(&[RouteFilter::by_shared_rules(&api_rules.shared_rules_key)])
            .await
            .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api");
        assert_eq!(addr(&routes[0].domain_key), "example.com:80");
        assert_eq!(routes[0].zone_key, zk);
    }

    #[tokio::test]
    async fn test_import_refuses_existing_zone() {
        let svc = MemoryService::new();
        seed_zone(&svc, "prod");
        let doc = export_zone(&svc, "prod").await.unwrap();

        let err = import_zone(&svc, "prod", doc).await.unwrap_err();
        assert!(err.created.is_empty());
        assert!(matches!(err.source, Error::Validation(_)));
        assert!(svc.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_import_creates_in_dependency_order() {
        let svc = MemoryService::new();
        seed_zone(&svc, "prod");
        let doc = export_zone(&svc, "prod").await.unwrap();

        import_zone(&svc, "copy", doc).await.unwrap();

        let kinds: Vec<String> = svc
            .mutations()
            .iter()
            .map(|m| m.split(' ').nth(1).unwrap_or_default().to_string())
            .collect();
        let mut order = kinds.clone();
        order.dedup();
        assert_eq!(
            order,
            vec!["zone", "cluster", "domain", "proxy", "shared_rules", "route"]
        );
    }

    #[tokio::test]
    async fn test_import_failure_reports_created_objects() {
        let svc = MemoryService::new();
        seed_zone(&svc, "prod");
        let doc = export_zone(&svc, "prod").await.unwrap();

        svc.fail_create(ObjectKind::Proxy);
        let err = import_zone(&svc, "copy", doc).await.unwrap_err();

        assert_eq!(err.created.zone.name, "copy");
        assert_eq!(err.created.clusters.len(), 2);
        assert_eq!(err.created.domains.len(), 2);
        assert!(err.created.proxies.is_empty());
        assert!(matches!(err.source, Error::PartialFailure { applied: 5, .. }));
        assert!(err.to_string().contains("manual reconciliation"));
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_reference() {
        let svc = MemoryService::new();
        let doc = ZoneObjects {
            shared_rules: vec![SharedRules {
                name: "orphan".into(),
                default: AllConstraints {
                    light: vec![ClusterConstraint {
                        cluster_key: "missing".into(),
                        weight: 1,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };

        let err = import_zone(&svc, "new", doc).await.unwrap_err();
        match &err.source {
            Error::PartialFailure { applied, source, .. } => {
                assert_eq!(*applied, 1);
                assert!(matches!(**source, Error::Validation(_)));
                assert!(source.to_string().contains("unknown cluster \"missing\""));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(svc.count(ObjectKind::SharedRules), 0);
    }

    #[tokio::test]
    async fn test_zone_create_failure_is_not_partial() {
        let svc = MemoryService::new();
        svc.fail_create(ObjectKind::Zone);

        let err = import_zone(&svc, "new", ZoneObjects::default()).await.unwrap_err();
        assert!(err.created.is_empty());
        assert!(matches!(err.source, Error::Api { status: 500, .. }));
    }

    #[test]
    fn test_document_field_names() {
        let value = serde_json::to_value(ZoneObjects::default()).unwrap();
        let mut fields: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        fields.sort();
        assert_eq!(
            fields,
            vec!["clusters", "domains", "proxies", "routes", "shared_rules", "zone"]
        );
    }
}

use std::collections::BTreeMap;
use std::fmt::Display;

use tracing::{debug, warn};

use super::{rule_constraints, ZoneObjects};
use crate::api::ConfigService;
use crate::error::Result;
use crate::model::{
    AllConstraints, Checksum, Cluster, ClusterFilter, ClusterKey, Domain, DomainFilter, DomainKey,
    ObjectKey, Proxy, ProxyFilter, ProxyKey, Route, RouteFilter, RouteKey, Rule, SharedRules,
    SharedRulesFilter, SharedRulesKey, Zone, ZoneFilter, ZoneKey,
};

/// Export the zone whose name or key is `key_or_name`, replacing keys with
/// names derived from each record.
///
/// A name matching exactly one zone wins; otherwise the argument is tried
/// as a zone key. Any service failure aborts the export.
pub async fn export_zone<S: ConfigService>(svc: &S, key_or_name: &str) -> Result<ZoneObjects> {
    let zone = resolve_zone(svc, key_or_name).await?;
    let zk = zone.zone_key.clone();
    debug!("exporting zone {} ({})", zone.name, zk);

    let doc_zone = ZoneKey::from(zone.name.as_str());
    let mut zo = ZoneObjects {
        zone: Zone {
            zone_key: doc_zone.clone(),
            checksum: Checksum::default(),
            ..zone
        },
        ..Default::default()
    };

    let clusters: Vec<Cluster> = svc.index(&[ClusterFilter::by_zone(&zk)]).await?;
    for mut c in clusters {
        let key = ClusterKey::from(c.name.as_str());
        zo.keys.clusters.insert(c.cluster_key.clone(), key.clone());
        c.cluster_key = key;
        c.zone_key = doc_zone.clone();
        c.instances.clear();
        c.checksum = Checksum::default();
        zo.clusters.push(c);
    }

    let domains: Vec<Domain> = svc.index(&[DomainFilter::by_zone(&zk)]).await?;
    for mut d in domains {
        let key = DomainKey::from(d.addr());
        zo.keys.domains.insert(d.domain_key.clone(), key.clone());
        d.domain_key = key;
        d.zone_key = doc_zone.clone();
        d.checksum = Checksum::default();
        zo.domains.push(d);
    }

    let proxies: Vec<Proxy> = svc.index(&[ProxyFilter::by_zone(&zk)]).await?;
    for mut p in proxies {
        let what = format!("proxy {:?}", p.name);
        p.domain_keys = p
            .domain_keys
            .iter()
            .map(|dk| translate(&zo.keys.domains, dk, &what))
            .collect();
        p.proxy_key = ProxyKey::from(p.name.as_str());
        p.zone_key = doc_zone.clone();
        p.checksum = Checksum::default();
        zo.proxies.push(p);
    }

    let shared_rules: Vec<SharedRules> = svc.index(&[SharedRulesFilter::by_zone(&zk)]).await?;
    for mut sr in shared_rules {
        let key = SharedRulesKey::from(sr.name.as_str());
        zo.keys.shared_rules.insert(sr.shared_rules_key.clone(), key.clone());

        let what = format!("shared_rules {:?}", sr.name);
        nameify_constraints(&zo.keys.clusters, &mut sr.default, &what);
        nameify_rules(&zo.keys.clusters, &mut sr.rules, &what);

        sr.shared_rules_key = key;
        sr.zone_key = doc_zone.clone();
        sr.checksum = Checksum::default();
        zo.shared_rules.push(sr);
    }

    let routes: Vec<Route> = svc.index(&[RouteFilter::by_zone(&zk)]).await?;
    for mut r in routes {
        let what = format!("route {:?}", r.path);
        r.domain_key = translate(&zo.keys.domains, &r.domain_key, &what);
        r.shared_rules_key = translate(&zo.keys.shared_rules, &r.shared_rules_key, &what);
        r.route_key = RouteKey::from(format!("{}{}", r.domain_key, r.path));
        nameify_rules(&zo.keys.clusters, &mut r.rules, &what);

        r.zone_key = doc_zone.clone();
        r.checksum = Checksum::default();
        zo.routes.push(r);
    }

    Ok(zo)
}

async fn resolve_zone<S: ConfigService>(svc: &S, key_or_name: &str) -> Result<Zone> {
    let mut zones: Vec<Zone> = svc.index(&[ZoneFilter::by_name(key_or_name)]).await?;
    if zones.len() == 1 {
        return Ok(zones.remove(0));
    }

    svc.get(&ZoneKey::from(key_or_name)).await
}

/// Look up a reference in a translation map. A reference to a record
/// outside the zone has no document name and exports as empty.
fn translate<K: ObjectKey>(map: &BTreeMap<K, K>, key: &K, what: impl Display) -> K {
    match map.get(key) {
        Some(name) => name.clone(),
        None => {
            warn!("{} refers to {} outside the exported zone", what, key);
            K::default()
        }
    }
}

fn nameify_constraints(
    clusters: &BTreeMap<ClusterKey, ClusterKey>,
    constraints: &mut AllConstraints,
    what: &str,
) {
    for cc in constraints.iter_mut() {
        cc.cluster_key = translate(clusters, &cc.cluster_key, what);
        cc.constraint_key.clear();
    }
}

fn nameify_rules(clusters: &BTreeMap<ClusterKey, ClusterKey>, rules: &mut [Rule], what: &str) {
    for rule in rules.iter_mut() {
        rule.rule_key.clear();
    }
    for cc in rule_constraints(rules) {
        cc.cluster_key = translate(clusters, &cc.cluster_key, what);
        cc.constraint_key.clear();
    }
}

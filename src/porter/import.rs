use std::collections::BTreeMap;

use tracing::info;

use super::{rule_constraints, ImportError, ZoneObjects};
use crate::api::ConfigService;
use crate::error::{Error, Result};
use crate::model::{
    AllConstraints, ApiObject, Checksum, ClusterKey, DomainKey, ObjectKey, Rule, SharedRulesKey,
    Zone, ZoneFilter,
};

/// Create the zone described by `doc` under the name `name`.
///
/// Records are created in dependency order (zone, clusters, domains,
/// proxies, shared rules, routes), each reference being rewritten to the
/// key the store assigned to its target. A zone named `name` must not
/// exist yet. The first failure stops the import; what was created so far
/// is returned inside the error and is not removed.
pub async fn import_zone<S: ConfigService>(
    svc: &S,
    name: &str,
    doc: ZoneObjects,
) -> std::result::Result<ZoneObjects, ImportError> {
    let mut created = ZoneObjects::default();

    match run(svc, name, doc, &mut created).await {
        Ok(()) => Ok(created),
        Err(source) => Err(ImportError::new(created, source)),
    }
}

async fn run<S: ConfigService>(
    svc: &S,
    name: &str,
    doc: ZoneObjects,
    created: &mut ZoneObjects,
) -> Result<()> {
    let existing: Vec<Zone> = svc.index(&[ZoneFilter::by_name(name)]).await?;
    if !existing.is_empty() {
        return Err(Error::Validation(format!("zone {:?} already exists", name)));
    }

    let mut zone = doc.zone;
    zone.name = name.to_string();
    prepare(&mut zone);
    created.zone = svc.create(&zone).await?;
    let zk = created.zone.zone_key.clone();
    info!("Created Zone {} ({})", created.zone.name, zk);

    for mut c in doc.clusters {
        prepare(&mut c);
        c.zone_key = zk.clone();
        let c = svc.create(&c).await?;
        info!("Created Cluster {} ({})", c.name, c.cluster_key);
        created
            .keys
            .clusters
            .insert(ClusterKey::from(c.name.as_str()), c.cluster_key.clone());
        created.clusters.push(c);
    }

    for mut d in doc.domains {
        prepare(&mut d);
        d.zone_key = zk.clone();
        let d = svc.create(&d).await?;
        info!("Created Domain {} ({})", d.addr(), d.domain_key);
        created
            .keys
            .domains
            .insert(DomainKey::from(d.addr()), d.domain_key.clone());
        created.domains.push(d);
    }

    for mut p in doc.proxies {
        prepare(&mut p);
        p.zone_key = zk.clone();
        let what = format!("proxy {:?}", p.name);
        p.domain_keys = p
            .domain_keys
            .iter()
            .map(|dk| resolve(&created.keys.domains, dk, "domain", &what))
            .collect::<Result<_>>()?;
        let p = svc.create(&p).await?;
        info!("Created Proxy {} ({})", p.name, p.proxy_key);
        created.proxies.push(p);
    }

    for mut sr in doc.shared_rules {
        prepare(&mut sr);
        sr.zone_key = zk.clone();
        let what = format!("shared_rules {:?}", sr.name);
        denameify_constraints(&created.keys.clusters, &mut sr.default, &what)?;
        denameify_rules(&created.keys.clusters, &mut sr.rules, &what)?;
        let sr = svc.create(&sr).await?;
        info!("Created SharedRules {} ({})", sr.name, sr.shared_rules_key);
        created
            .keys
            .shared_rules
            .insert(SharedRulesKey::from(sr.name.as_str()), sr.shared_rules_key.clone());
        created.shared_rules.push(sr);
    }

    for mut r in doc.routes {
        prepare(&mut r);
        r.zone_key = zk.clone();
        let what = format!("route {}{}", r.domain_key, r.path);
        r.domain_key = resolve(&created.keys.domains, &r.domain_key, "domain", &what)?;
        r.shared_rules_key = resolve(
            &created.keys.shared_rules,
            &r.shared_rules_key,
            "shared_rules",
            &what,
        )?;
        denameify_rules(&created.keys.clusters, &mut r.rules, &what)?;
        let r = svc.create(&r).await?;
        info!("Created Route {} ({})", r.path, r.route_key);
        created.routes.push(r);
    }

    Ok(())
}

/// Clear what the store assigns
fn prepare<T: ApiObject>(object: &mut T) {
    object.set_key(T::Key::default());
    object.set_checksum(Checksum::default());
}

fn resolve<K: ObjectKey>(map: &BTreeMap<K, K>, key: &K, kind: &str, what: &str) -> Result<K> {
    map.get(key).cloned().ok_or_else(|| {
        Error::Validation(format!(
            "unknown {} {:?} referenced by {}",
            kind,
            key.as_ref(),
            what
        ))
    })
}

fn denameify_constraints(
    clusters: &BTreeMap<ClusterKey, ClusterKey>,
    constraints: &mut AllConstraints,
    what: &str,
) -> Result<()> {
    for cc in constraints.iter_mut() {
        cc.cluster_key = resolve(clusters, &cc.cluster_key, "cluster", what)?;
        cc.constraint_key.clear();
    }
    Ok(())
}

fn denameify_rules(
    clusters: &BTreeMap<ClusterKey, ClusterKey>,
    rules: &mut [Rule],
    what: &str,
) -> Result<()> {
    for cc in rule_constraints(rules) {
        cc.cluster_key = resolve(clusters, &cc.cluster_key, "cluster", what)?;
        cc.constraint_key.clear();
    }
    Ok(())
}

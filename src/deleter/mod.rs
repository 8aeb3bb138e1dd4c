//! Deep deletion
//!
//! Starting from a zone, domain, route or shared rules record, collect every
//! record that has to go with it so no reference is left dangling:
//!
//! - a zone takes all of its clusters, domains, proxies, routes and shared
//!   rules, plus shared rules elsewhere that only its routes referenced;
//! - a domain takes its routes, and is stripped from the proxies serving it;
//! - shared rules take the routes that use them;
//! - a route takes nothing else.
//!
//! The collected [`DeletePlan`] is reported to the operator and, once
//! confirmed, executed leaves first.

mod execute;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::api::ConfigService;
use crate::error::Result;
use crate::model::{
    Cluster, ClusterFilter, ClusterKey, Domain, DomainFilter, DomainKey, ObjectKind, Proxy,
    ProxyFilter, ProxyKey, Route, RouteFilter, RouteKey, SharedRules, SharedRulesFilter,
    SharedRulesKey, Zone, ZoneKey,
};

pub use execute::run;

/// A proxy that survives, minus some of its domains
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyMod {
    pub proxy: Proxy,
    pub remove: BTreeMap<DomainKey, Domain>,
}

impl ProxyMod {
    /// The proxy's domain keys with the removed ones filtered out
    pub fn remaining_domain_keys(&self) -> Vec<DomainKey> {
        self.proxy
            .domain_keys
            .iter()
            .filter(|dk| !self.remove.contains_key(dk))
            .cloned()
            .collect()
    }
}

/// Everything a deep deletion will delete or modify.
///
/// Records are keyed by their store key and carry the checksum read while
/// collecting, which is what each delete or modify is issued with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletePlan {
    pub zone: Option<Zone>,
    pub clusters: BTreeMap<ClusterKey, Cluster>,
    pub domains: BTreeMap<DomainKey, Domain>,
    pub routes: BTreeMap<RouteKey, Route>,
    pub shared_rules: BTreeMap<SharedRulesKey, SharedRules>,
    pub proxies: BTreeMap<ProxyKey, Proxy>,
    pub proxy_mods: BTreeMap<ProxyKey, ProxyMod>,

    /// Domains of collected routes, for display only; not all of them are
    /// deleted
    pub report_domains: BTreeMap<DomainKey, Domain>,
}

impl DeletePlan {
    /// Plan for the kinds deep deletion knows how to cascade from; `None`
    /// for every other kind
    pub async fn for_kind<S: ConfigService>(
        svc: &S,
        kind: ObjectKind,
        key: &str,
    ) -> Result<Option<Self>> {
        let plan = match kind {
            ObjectKind::Zone => Self::for_zone(svc, &key.into()).await?,
            ObjectKind::Domain => Self::for_domain(svc, &key.into()).await?,
            ObjectKind::Route => Self::for_route(svc, &key.into()).await?,
            ObjectKind::SharedRules => Self::for_shared_rules(svc, &key.into()).await?,
            _ => return Ok(None),
        };
        Ok(Some(plan))
    }

    pub async fn for_zone<S: ConfigService>(svc: &S, zone_key: &ZoneKey) -> Result<Self> {
        let mut plan = Self::default();
        plan.add_zone(svc, zone_key).await?;
        plan.add_orphans(svc).await?;
        Ok(plan)
    }

    pub async fn for_domain<S: ConfigService>(svc: &S, domain_key: &DomainKey) -> Result<Self> {
        let mut plan = Self::default();
        let domain: Domain = svc.get(domain_key).await?;
        plan.add_domain(svc, domain).await?;
        Ok(plan)
    }

    pub async fn for_route<S: ConfigService>(svc: &S, route_key: &RouteKey) -> Result<Self> {
        let mut plan = Self::default();
        let route: Route = svc.get(route_key).await?;
        plan.add_route(svc, route).await?;
        Ok(plan)
    }

    pub async fn for_shared_rules<S: ConfigService>(
        svc: &S,
        shared_rules_key: &SharedRulesKey,
    ) -> Result<Self> {
        let mut plan = Self::default();
        plan.add_shared_rules_key(svc, shared_rules_key).await?;
        Ok(plan)
    }

    /// Number of delete and modify calls executing the plan takes
    pub fn len(&self) -> usize {
        usize::from(self.zone.is_some())
            + self.clusters.len()
            + self.domains.len()
            + self.routes.len()
            + self.shared_rules.len()
            + self.proxies.len()
            + self.proxy_mods.len()
    }

    async fn add_zone<S: ConfigService>(&mut self, svc: &S, zone_key: &ZoneKey) -> Result<()> {
        let zone: Zone = svc.get(zone_key).await?;
        debug!("collecting zone {} ({})", zone.name, zone.zone_key);

        let clusters: Vec<Cluster> = svc.index(&[ClusterFilter::by_zone(zone_key)]).await?;
        self.clusters
            .extend(clusters.into_iter().map(|c| (c.cluster_key.clone(), c)));

        let domains: Vec<Domain> = svc.index(&[DomainFilter::by_zone(zone_key)]).await?;
        self.domains
            .extend(domains.into_iter().map(|d| (d.domain_key.clone(), d)));

        let shared_rules: Vec<SharedRules> =
            svc.index(&[SharedRulesFilter::by_zone(zone_key)]).await?;
        self.shared_rules
            .extend(shared_rules.into_iter().map(|sr| (sr.shared_rules_key.clone(), sr)));

        let proxies: Vec<Proxy> = svc.index(&[ProxyFilter::by_zone(zone_key)]).await?;
        self.proxies
            .extend(proxies.into_iter().map(|p| (p.proxy_key.clone(), p)));

        let routes: Vec<Route> = svc.index(&[RouteFilter::by_zone(zone_key)]).await?;
        for route in routes {
            self.add_route(svc, route).await?;
        }

        self.zone = Some(zone);
        Ok(())
    }

    async fn add_domain<S: ConfigService>(&mut self, svc: &S, domain: Domain) -> Result<()> {
        let dk = domain.domain_key.clone();
        if self.domains.contains_key(&dk) {
            return Ok(());
        }
        self.domains.insert(dk.clone(), domain.clone());

        let routes: Vec<Route> = svc.index(&[RouteFilter::by_domain(&dk)]).await?;
        for route in routes {
            self.add_route(svc, route).await?;
        }

        let proxies: Vec<Proxy> = svc.index(&[ProxyFilter::by_domain(&dk)]).await?;
        for proxy in proxies {
            if self.proxies.contains_key(&proxy.proxy_key) {
                continue;
            }
            self.proxy_mods
                .entry(proxy.proxy_key.clone())
                .or_insert_with(|| ProxyMod {
                    proxy,
                    remove: BTreeMap::new(),
                })
                .remove
                .insert(dk.clone(), domain.clone());
        }

        Ok(())
    }

    async fn add_route<S: ConfigService>(&mut self, svc: &S, route: Route) -> Result<()> {
        let dk = route.domain_key.clone();
        self.routes.entry(route.route_key.clone()).or_insert(route);

        if self.report_domains.contains_key(&dk) {
            return Ok(());
        }
        let domain = match self.domains.get(&dk) {
            Some(domain) => domain.clone(),
            None => svc.get::<Domain>(&dk).await?,
        };
        self.report_domains.insert(dk, domain);
        Ok(())
    }

    async fn add_shared_rules_key<S: ConfigService>(
        &mut self,
        svc: &S,
        shared_rules_key: &SharedRulesKey,
    ) -> Result<()> {
        if self.shared_rules.contains_key(shared_rules_key) {
            return Ok(());
        }
        let shared_rules: SharedRules = svc.get(shared_rules_key).await?;
        self.add_shared_rules(svc, shared_rules).await
    }

    async fn add_shared_rules<S: ConfigService>(
        &mut self,
        svc: &S,
        shared_rules: SharedRules,
    ) -> Result<()> {
        let srk = shared_rules.shared_rules_key.clone();
        if self.shared_rules.contains_key(&srk) {
            return Ok(());
        }
        self.shared_rules.insert(srk.clone(), shared_rules);

        let routes: Vec<Route> = svc.index(&[RouteFilter::by_shared_rules(&srk)]).await?;
        for route in routes {
            self.add_route(svc, route).await?;
        }
        Ok(())
    }

    /// Add shared rules referenced by collected routes and by no route that
    /// survives the deletion
    async fn add_orphans<S: ConfigService>(&mut self, svc: &S) -> Result<()> {
        let mut candidates: BTreeSet<SharedRulesKey> = self
            .routes
            .values()
            .map(|r| r.shared_rules_key.clone())
            .filter(|srk| !srk.is_empty() && !self.shared_rules.contains_key(srk))
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let filters: Vec<RouteFilter> = candidates
            .iter()
            .map(RouteFilter::by_shared_rules)
            .collect();
        let routes: Vec<Route> = svc.index(&filters).await?;
        for route in routes {
            if !self.routes.contains_key(&route.route_key) {
                candidates.remove(&route.shared_rules_key);
            }
        }

        for srk in candidates {
            debug!("shared_rules {} is orphaned by this deletion", srk);
            self.add_shared_rules_key(svc, &srk).await?;
        }
        Ok(())
    }
}

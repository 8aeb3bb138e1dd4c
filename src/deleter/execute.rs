use tracing::info;

use super::{DeletePlan, ProxyMod};
use crate::api::ConfigService;
use crate::error::{Error, Result};
use crate::model::{Cluster, Domain, Proxy, Route, SharedRules, Zone};

fn cluster_str(c: &Cluster) -> String {
    format!("Cluster({}:{})", c.cluster_key, c.name)
}

fn route_str(r: &Route, d: Option<&Domain>) -> String {
    let (name, port) = d.map_or(("", 0), |d| (d.name.as_str(), d.port));
    format!("Route({}:{}:{}{})", r.route_key, name, port, r.path)
}

fn shared_rules_str(sr: &SharedRules) -> String {
    format!("SharedRules({}:{})", sr.shared_rules_key, sr.name)
}

fn domain_str(d: &Domain) -> String {
    format!("Domain({}:{}:{})", d.domain_key, d.name, d.port)
}

fn proxy_str(p: &Proxy) -> String {
    format!("Proxy({}:{})", p.proxy_key, p.name)
}

fn zone_str(z: &Zone) -> String {
    format!("Zone({}:{})", z.zone_key, z.name)
}

fn proxy_mod_str(pm: &ProxyMod, indent: &str, verb: &str) -> String {
    let names: Vec<String> = pm
        .remove
        .iter()
        .map(|(dk, d)| format!("{}:{}:{}", dk, d.name, d.port))
        .collect();
    let noun = if names.len() > 1 { "Domains" } else { "Domain" };

    format!(
        "{indent}{}:\n{indent}  {verb} {noun}: {}",
        proxy_str(&pm.proxy),
        names.join(", ")
    )
}

impl DeletePlan {
    fn route_str(&self, r: &Route) -> String {
        route_str(r, self.report_domains.get(&r.domain_key))
    }

    /// Human readable description of what executing the plan does
    pub fn report(&self) -> String {
        let mut out = String::from("Deep deletion will delete the following objects:\n");

        for r in self.routes.values() {
            out.push_str(&format!("  {}\n", self.route_str(r)));
        }
        for sr in self.shared_rules.values() {
            out.push_str(&format!("  {}\n", shared_rules_str(sr)));
        }
        for p in self.proxies.values() {
            out.push_str(&format!("  {}\n", proxy_str(p)));
        }
        for d in self.domains.values() {
            out.push_str(&format!("  {}\n", domain_str(d)));
        }
        for c in self.clusters.values() {
            out.push_str(&format!("  {}\n", cluster_str(c)));
        }
        if let Some(z) = &self.zone {
            out.push_str(&format!("  {}\n", zone_str(z)));
        }

        if !self.proxy_mods.is_empty() {
            out.push_str("Additionally, the following proxies will be modified:\n");
            for pm in self.proxy_mods.values() {
                out.push_str(&proxy_mod_str(pm, "  ", "Remove"));
                out.push('\n');
            }
        }

        out
    }

    /// Issue every delete and modify, leaves first: routes, shared rules,
    /// proxies, proxy modifications, domains, clusters, then the zone.
    ///
    /// Stops at the first failure. Nothing already applied is undone; a
    /// failure after the first applied step is reported as
    /// [`Error::PartialFailure`]. Returns the number of steps applied.
    pub async fn execute<S: ConfigService>(&self, svc: &S) -> Result<usize> {
        let mut applied = 0;

        match self.apply(svc, &mut applied).await {
            Ok(()) => Ok(applied),
            Err(source) if applied > 0 => Err(Error::PartialFailure {
                operation: "deep deletion".to_string(),
                applied,
                source: Box::new(source),
            }),
            Err(source) => Err(source),
        }
    }

    async fn apply<S: ConfigService>(&self, svc: &S, applied: &mut usize) -> Result<()> {
        for r in self.routes.values() {
            let desc = self.route_str(r);
            info!("Deleting {}", desc);
            svc.delete::<Route>(&r.route_key, &r.checksum).await?;
            *applied += 1;
            info!("Deleted {}", desc);
        }

        for sr in self.shared_rules.values() {
            let desc = shared_rules_str(sr);
            info!("Deleting {}", desc);
            svc.delete::<SharedRules>(&sr.shared_rules_key, &sr.checksum)
                .await?;
            *applied += 1;
            info!("Deleted {}", desc);
        }

        for p in self.proxies.values() {
            let desc = proxy_str(p);
            info!("Deleting {}", desc);
            svc.delete::<Proxy>(&p.proxy_key, &p.checksum).await?;
            *applied += 1;
            info!("Deleted {}", desc);
        }

        for pm in self.proxy_mods.values() {
            let proxy = Proxy {
                domain_keys: pm.remaining_domain_keys(),
                ..pm.proxy.clone()
            };
            info!("{}", proxy_mod_str(pm, "", "Deleting"));
            svc.modify(&proxy).await?;
            *applied += 1;
            info!("{}", proxy_mod_str(pm, "", "Deleted"));
        }

        for d in self.domains.values() {
            let desc = domain_str(d);
            info!("Deleting {}", desc);
            svc.delete::<Domain>(&d.domain_key, &d.checksum).await?;
            *applied += 1;
            info!("Deleted {}", desc);
        }

        for c in self.clusters.values() {
            let desc = cluster_str(c);
            info!("Deleting {}", desc);
            svc.delete::<Cluster>(&c.cluster_key, &c.checksum).await?;
            *applied += 1;
            info!("Deleted {}", desc);
        }

        if let Some(z) = &self.zone {
            let desc = zone_str(z);
            info!("Deleting {}", desc);
            svc.delete::<Zone>(&z.zone_key, &z.checksum).await?;
            *applied += 1;
            info!("Deleted {}", desc);
        }

        Ok(())
    }
}

/// Show the plan through `confirm` and execute it once confirmed.
///
/// Declining returns [`Error::Canceled`] with nothing changed.
pub async fn run<S, F>(svc: &S, plan: &DeletePlan, confirm: F) -> Result<usize>
where
    S: ConfigService,
    F: FnOnce(&str) -> Result<bool>,
{
    if !confirm(&plan.report())? {
        return Err(Error::Canceled("deep deletion".to_string()));
    }

    plan.execute(svc).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryService;
    use crate::deleter::tests::fixture;
    use crate::model::ObjectKind;

    fn rank(entry: &str) -> usize {
        let mut parts = entry.split(' ');
        let verb = parts.next().unwrap_or_default();
        let kind = parts.next().unwrap_or_default();
        match (verb, kind) {
            ("delete", "route") => 0,
            ("delete", "shared_rules") => 1,
            ("delete", "proxy") => 2,
            ("modify", "proxy") => 3,
            ("delete", "domain") => 4,
            ("delete", "cluster") => 5,
            ("delete", "zone") => 6,
            _ => panic!("unexpected mutation {}", entry),
        }
    }

    #[tokio::test]
    async fn test_domain_deletion_strips_proxy() {
        let svc = MemoryService::new();
        let f = fixture(&svc, "prod");

        let plan = DeletePlan::for_domain(&svc, &f.domain.domain_key).await.unwrap();
        let applied = run(&svc, &plan, |_| Ok(true)).await.unwrap();
        assert_eq!(applied, 3);

        assert!(svc.find::<Route>(f.route.route_key.as_str()).is_none());
        assert!(svc.find::<Domain>(f.domain.domain_key.as_str()).is_none());

        let proxy = svc.find::<Proxy>(f.proxy.proxy_key.as_str()).unwrap();
        assert_eq!(proxy.domain_keys, vec![f.other_domain.domain_key.clone()]);
        assert!(svc.find::<Route>(f.other_route.route_key.as_str()).is_some());
        assert!(svc.find::<SharedRules>(f.shared_rules.shared_rules_key.as_str()).is_some());
    }

    #[tokio::test]
    async fn test_zone_deletion_order() {
        let svc = MemoryService::new();
        let f = fixture(&svc, "prod");
        let survivor = fixture(&svc, "staging");

        let plan = DeletePlan::for_zone(&svc, &f.zone.zone_key).await.unwrap();
        run(&svc, &plan, |_| Ok(true)).await.unwrap();

        let ranks: Vec<usize> = svc.mutations().iter().map(|m| rank(m)).collect();
        assert!(!ranks.is_empty());
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "out of order: {:?}", svc.mutations());

        assert!(svc.find::<Zone>(f.zone.zone_key.as_str()).is_none());
        assert!(svc.find::<Zone>(survivor.zone.zone_key.as_str()).is_some());
        assert_eq!(svc.count(ObjectKind::Cluster), 1);
        assert_eq!(svc.count(ObjectKind::Route), 2);
    }

    #[tokio::test]
    async fn test_decline_changes_nothing() {
        let svc = MemoryService::new();
        let f = fixture(&svc, "prod");

        let plan = DeletePlan::for_zone(&svc, &f.zone.zone_key).await.unwrap();
        let err = run(&svc, &plan, |_| Ok(false)).await.unwrap_err();

        assert!(err.is_canceled());
        assert_eq!(err.to_string(), "canceled deep deletion");
        assert!(svc.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_stale_checksum_after_progress_is_partial_failure() {
        let svc = MemoryService::new();
        let f = fixture(&svc, "prod");

        let plan = DeletePlan::for_zone(&svc, &f.zone.zone_key).await.unwrap();
        svc.touch(ObjectKind::SharedRules, f.shared_rules.shared_rules_key.as_str());

        let err = plan.execute(&svc).await.unwrap_err();
        match err {
            Error::PartialFailure {
                applied, source, ..
            } => {
                assert_eq!(applied, 2);
                assert!(matches!(*source, Error::Conflict(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(svc.find::<Zone>(f.zone.zone_key.as_str()).is_some());
    }

    #[tokio::test]
    async fn test_failure_before_progress_is_plain() {
        let svc = MemoryService::new();
        let f = fixture(&svc, "prod");

        let plan = DeletePlan::for_route(&svc, &f.route.route_key).await.unwrap();
        svc.fail_delete(ObjectKind::Route, f.route.route_key.as_str());

        let err = plan.execute(&svc).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_report_lists_every_kind() {
        let svc = MemoryService::new();
        let f = fixture(&svc, "prod");

        let plan = DeletePlan::for_domain(&svc, &f.domain.domain_key).await.unwrap();
        let report = plan.report();

        let want = format!(
            "Deep deletion will delete the following objects:\n  \
             Route({rk}:example.com:80/api)\n  \
             Domain({dk}:example.com:80)\n\
             Additionally, the following proxies will be modified:\n  \
             Proxy({pk}:edge):\n    \
             Remove Domain: {dk}:example.com:80\n",
            rk = f.route.route_key,
            dk = f.domain.domain_key,
            pk = f.proxy.proxy_key,
        );
        assert_eq!(report, want);

        let zone_report = DeletePlan::for_zone(&svc, &f.zone.zone_key)
            .await
            .unwrap()
            .report();
        assert!(zone_report.contains(&format!("  Zone({}:prod)\n", f.zone.zone_key)));
        assert!(zone_report.contains(&format!("  Cluster({}:api)\n", f.cluster.cluster_key)));
        assert!(zone_report.contains("SharedRules("));
        assert!(!zone_report.contains("Additionally"));
    }
}

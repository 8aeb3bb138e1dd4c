//! Init zone command
//!
//! Creates a zone, if needed, along with default routes, domains and
//! proxies described on the command line. Running it twice with the same
//! arguments changes nothing unless `--replace` is given.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ConfigService};
use crate::config::Config;
use crate::error::Error;
use crate::model::{
    AllConstraints, Cluster, ClusterConstraint, ClusterFilter, ClusterKey, Domain, DomainFilter,
    DomainKey, Metadata, Metadatum, Proxy, ProxyFilter, Route, RouteFilter, SharedRules,
    SharedRulesFilter, SharedRulesKey, Zone, ZoneFilter, ZoneKey,
};
use crate::output;

type ParseResult<T> = std::result::Result<T, Error>;

#[derive(Args, Debug)]
pub struct InitZoneArgs {
    /// Name of the zone
    pub name: String,

    /// Routes as domain:port[/path]=cluster[:key=value]*, comma separated
    /// or repeated, e.g. api.example.com:443/users=userService:stage=prod
    #[arg(long, value_delimiter = ',')]
    pub routes: Vec<String>,

    /// Proxies as proxy=domain:port, comma separated or repeated; repeat a
    /// proxy to have it serve several domains
    #[arg(long, value_delimiter = ',')]
    pub proxies: Vec<String>,

    /// Domain aliases as domain:port=alias[:alias]*, comma separated or
    /// repeated
    #[arg(long, value_delimiter = ',')]
    pub domains: Vec<String>,

    /// Replace existing routes, shared rules and proxies instead of leaving
    /// them as they are
    #[arg(long)]
    pub replace: bool,
}

pub async fn execute(config: &Config, args: InitZoneArgs) -> Result<()> {
    let plan = ZoneInit::parse(&args.routes, &args.proxies, &args.domains, args.replace)?;
    debug!("zone {}: {:?}", args.name, plan);

    let client = ApiClient::new(config.clone())?;
    let zone_key = plan
        .apply(&client, &args.name)
        .await
        .with_context(|| format!("Unable to initialize zone {}", args.name))?;

    output::success(&format!("Zone {} ({}) initialized", args.name, zone_key));
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct HostPort {
    host: String,
    port: u16,
}

impl HostPort {
    fn parse(s: &str) -> Option<Self> {
        let (host, port) = s.split_once(':')?;
        if host.is_empty() || port.contains(':') {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            port: port.parse().ok()?,
        })
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RouteSpec {
    domain: HostPort,
    path: String,
    cluster: String,
    metadata: Metadata,
}

impl RouteSpec {
    fn addr_path(&self) -> String {
        format!("{}{}", self.domain, self.path)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ProxySpec {
    name: String,
    domains: Vec<HostPort>,
}

#[derive(Debug, Clone, PartialEq)]
struct DomainSpec {
    name: HostPort,
    aliases: Vec<String>,
}

fn malformed(msg: String) -> Error {
    Error::Validation(msg)
}

fn parse_route(arg: &str) -> ParseResult<RouteSpec> {
    let (lhs, rhs) = match arg.split_once('=') {
        Some((lhs, rhs)) if !rhs.is_empty() => (lhs, rhs),
        _ => return Err(malformed(format!("malformed route {:?}", arg))),
    };

    let (addr, path) = match lhs.split_once('/') {
        Some((addr, path)) => (addr, format!("/{}", path)),
        None => (lhs, "/".to_string()),
    };
    let domain = HostPort::parse(addr).ok_or_else(|| {
        malformed(format!(
            "malformed domain/port {:?} in route argument {:?}",
            lhs, arg
        ))
    })?;

    let mut parts = rhs.split(':');
    let cluster = parts.next().unwrap_or_default();
    if cluster.is_empty() {
        return Err(malformed(format!(
            "empty cluster name in route argument {:?}",
            arg
        )));
    }

    let mut metadata = Metadata::new();
    for kv in parts {
        let (key, value) = kv.split_once('=').unwrap_or((kv, ""));
        if key.is_empty() {
            return Err(malformed(format!(
                "malformed metadata {:?} in route argument {:?}",
                kv, arg
            )));
        }
        metadata.push(Metadatum::new(key, value));
    }

    Ok(RouteSpec {
        domain,
        path,
        cluster: cluster.to_string(),
        metadata,
    })
}

fn validate_routes(routes: &[RouteSpec]) -> ParseResult<()> {
    let mut seen = BTreeSet::new();
    for r in routes {
        let key = r.addr_path();
        if !seen.insert(key.clone()) {
            return Err(malformed(format!("route {} declared more than once", key)));
        }
    }
    Ok(())
}

fn parse_proxy(arg: &str) -> ParseResult<ProxySpec> {
    let (name, addr) = match arg.split_once('=') {
        Some((name, addr)) if !name.is_empty() && !addr.contains('=') => (name, addr),
        _ => return Err(malformed(format!("malformed proxy argument: {:?}", arg))),
    };

    let domain = HostPort::parse(addr).ok_or_else(|| {
        malformed(format!(
            "malformed domain/port {:?} in proxy argument {:?}",
            addr, arg
        ))
    })?;

    Ok(ProxySpec {
        name: name.to_string(),
        domains: vec![domain],
    })
}

/// Repeated proxies collapse into one, keeping first-seen order
fn parse_proxies(args: &[String]) -> ParseResult<Vec<ProxySpec>> {
    let mut result: Vec<ProxySpec> = Vec::new();
    for arg in args {
        let p = parse_proxy(arg)?;
        match result.iter_mut().find(|existing| existing.name == p.name) {
            Some(existing) => existing.domains.extend(p.domains),
            None => result.push(p),
        }
    }
    Ok(result)
}

fn parse_domain(arg: &str) -> ParseResult<DomainSpec> {
    let (addr, aliases) = arg
        .split_once('=')
        .ok_or_else(|| malformed(format!("malformed domains argument {:?}", arg)))?;

    let name = HostPort::parse(addr).ok_or_else(|| {
        malformed(format!(
            "malformed domain/port {:?} in domains argument {:?}",
            addr, arg
        ))
    })?;

    let aliases = aliases
        .split(':')
        .map(|alias| {
            if alias.is_empty() {
                Err(malformed(format!(
                    "empty alias in domains argument {:?}",
                    arg
                )))
            } else {
                Ok(alias.to_string())
            }
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(DomainSpec { name, aliases })
}

/// Repeated domains collapse into one, merging aliases
fn parse_domains(args: &[String]) -> ParseResult<Vec<DomainSpec>> {
    let mut result: Vec<DomainSpec> = Vec::new();
    for arg in args {
        let d = parse_domain(arg)?;
        match result.iter_mut().find(|existing| existing.name == d.name) {
            Some(existing) => {
                for alias in d.aliases {
                    if !existing.aliases.contains(&alias) {
                        existing.aliases.push(alias);
                    }
                }
            }
            None => result.push(d),
        }
    }
    Ok(result)
}

fn validate_proxies(
    proxies: &[ProxySpec],
    routes: &[RouteSpec],
    domains: &[DomainSpec],
) -> ParseResult<()> {
    let known: BTreeSet<&HostPort> = routes
        .iter()
        .map(|r| &r.domain)
        .chain(domains.iter().map(|d| &d.name))
        .collect();

    for p in proxies {
        for d in &p.domains {
            if !known.contains(d) {
                return Err(malformed(format!(
                    "proxy {} refers to unknown domain {}",
                    p.name, d
                )));
            }
        }
    }
    Ok(())
}

/// Parsed and validated init-zone arguments
#[derive(Debug, Clone, PartialEq)]
struct ZoneInit {
    routes: Vec<RouteSpec>,
    proxies: Vec<ProxySpec>,
    domains: Vec<DomainSpec>,
    replace: bool,
}

impl ZoneInit {
    fn parse(
        routes: &[String],
        proxies: &[String],
        domains: &[String],
        replace: bool,
    ) -> ParseResult<Self> {
        let routes = routes
            .iter()
            .map(|r| parse_route(r))
            .collect::<ParseResult<Vec<_>>>()?;
        validate_routes(&routes)?;

        let domains = parse_domains(domains)?;
        let proxies = parse_proxies(proxies)?;
        validate_proxies(&proxies, &routes, &domains)?;

        Ok(Self {
            routes,
            proxies,
            domains,
            replace,
        })
    }

    /// Every domain named by a domain spec or a route, once, with aliases
    fn all_domains(&self) -> Vec<DomainSpec> {
        let mut all = self.domains.clone();
        for r in &self.routes {
            if !all.iter().any(|d| d.name == r.domain) {
                all.push(DomainSpec {
                    name: r.domain.clone(),
                    aliases: Vec::new(),
                });
            }
        }
        all
    }

    /// Create what is missing and return the zone key. Domains come first,
    /// then clusters with their shared rules, then routes, then proxies.
    async fn apply<S: ConfigService>(
        &self,
        svc: &S,
        zone_name: &str,
    ) -> crate::error::Result<ZoneKey> {
        let zk = add_zone(svc, zone_name).await?;

        let mut domain_keys: BTreeMap<HostPort, DomainKey> = BTreeMap::new();
        for d in self.all_domains() {
            let key = add_domain(svc, &zk, &d, self.replace).await?;
            domain_keys.insert(d.name, key);
        }

        let mut shared_rules_keys: BTreeMap<&str, SharedRulesKey> = BTreeMap::new();
        for r in &self.routes {
            if shared_rules_keys.contains_key(r.cluster.as_str()) {
                continue;
            }
            let ck = add_cluster(svc, &zk, &r.cluster).await?;
            let srk =
                add_shared_rules(svc, &zk, &r.cluster, &ck, &r.metadata, self.replace).await?;
            shared_rules_keys.insert(&r.cluster, srk);
        }

        for r in &self.routes {
            let route = Route {
                domain_key: domain_keys.get(&r.domain).cloned().unwrap_or_default(),
                zone_key: zk.clone(),
                path: r.path.clone(),
                shared_rules_key: shared_rules_keys
                    .get(r.cluster.as_str())
                    .cloned()
                    .unwrap_or_default(),
                ..Default::default()
            };
            add_route(svc, route, &r.addr_path(), &r.cluster, self.replace).await?;
        }

        for p in &self.proxies {
            let mut keys = Vec::new();
            for d in &p.domains {
                match domain_keys.get(d) {
                    Some(key) => keys.push(key.clone()),
                    None => warn!("Ignoring unknown domain {} for proxy {}", d, p.name),
                }
            }
            add_proxy(svc, &zk, &p.name, keys, self.replace).await?;
        }

        Ok(zk)
    }
}

async fn add_zone<S: ConfigService>(svc: &S, name: &str) -> crate::error::Result<ZoneKey> {
    let zones: Vec<Zone> = svc.index(&[ZoneFilter::by_name(name)]).await?;
    if let Some(zone) = zones.into_iter().next() {
        info!("Zone {} already exists", name);
        return Ok(zone.zone_key);
    }

    let zone = svc
        .create(&Zone {
            name: name.to_string(),
            ..Default::default()
        })
        .await?;
    info!("Created Zone {}", name);
    Ok(zone.zone_key)
}

async fn add_domain<S: ConfigService>(
    svc: &S,
    zk: &ZoneKey,
    spec: &DomainSpec,
    replace: bool,
) -> crate::error::Result<DomainKey> {
    let hp = &spec.name;
    let found: Vec<Domain> = svc
        .index(&[DomainFilter::by_addr(zk, &hp.host, hp.port)])
        .await?;

    if let Some(existing) = found.into_iter().find(|d| d.port == hp.port) {
        info!("Domain {} already exists", hp);
        if !replace || spec.aliases.is_empty() || existing.aliases == spec.aliases {
            return Ok(existing.domain_key);
        }

        let modified = svc
            .modify(&Domain {
                aliases: spec.aliases.clone(),
                ..existing
            })
            .await?;
        info!("Modified Domain {}", hp);
        return Ok(modified.domain_key);
    }

    let domain = svc
        .create(&Domain {
            name: hp.host.clone(),
            port: hp.port,
            aliases: spec.aliases.clone(),
            zone_key: zk.clone(),
            ..Default::default()
        })
        .await?;
    info!("Created Domain {}", hp);
    Ok(domain.domain_key)
}

async fn add_cluster<S: ConfigService>(
    svc: &S,
    zk: &ZoneKey,
    name: &str,
) -> crate::error::Result<ClusterKey> {
    let found: Vec<Cluster> = svc.index(&[ClusterFilter::by_name(zk, name)]).await?;
    if let Some(cluster) = found.into_iter().next() {
        info!("Cluster {} already exists", name);
        return Ok(cluster.cluster_key);
    }

    let cluster = svc
        .create(&Cluster {
            name: name.to_string(),
            zone_key: zk.clone(),
            ..Default::default()
        })
        .await?;
    info!("Created Cluster {}", name);
    Ok(cluster.cluster_key)
}

async fn add_shared_rules<S: ConfigService>(
    svc: &S,
    zk: &ZoneKey,
    name: &str,
    ck: &ClusterKey,
    metadata: &Metadata,
    replace: bool,
) -> crate::error::Result<SharedRulesKey> {
    let found: Vec<SharedRules> = svc.index(&[SharedRulesFilter::by_name(zk, name)]).await?;

    let mut sr = SharedRules {
        name: name.to_string(),
        zone_key: zk.clone(),
        default: AllConstraints {
            light: vec![ClusterConstraint {
                cluster_key: ck.clone(),
                metadata: metadata.clone(),
                weight: 1,
                ..Default::default()
            }],
            ..Default::default()
        },
        ..Default::default()
    };

    if let Some(existing) = found.into_iter().next() {
        info!("SharedRules {} already exists", name);
        if !replace {
            return Ok(existing.shared_rules_key);
        }

        sr.shared_rules_key = existing.shared_rules_key;
        sr.checksum = existing.checksum;
        let sr = svc.modify(&sr).await?;
        info!("Modified SharedRules {}", name);
        return Ok(sr.shared_rules_key);
    }

    let sr = svc.create(&sr).await?;
    info!("Created SharedRules {}", name);
    Ok(sr.shared_rules_key)
}

async fn add_route<S: ConfigService>(
    svc: &S,
    mut route: Route,
    addr_path: &str,
    cluster: &str,
    replace: bool,
) -> crate::error::Result<()> {
    let filter = RouteFilter {
        domain_key: Some(route.domain_key.clone()),
        zone_key: Some(route.zone_key.clone()),
        path: Some(route.path.clone()),
        ..Default::default()
    };
    let found: Vec<Route> = svc.index(&[filter]).await?;

    if let Some(existing) = found.into_iter().next() {
        info!("Route already exists for {}", addr_path);
        if !replace {
            return Ok(());
        }

        route.route_key = existing.route_key;
        route.checksum = existing.checksum;
        svc.modify(&route).await?;
        info!("Modified Route for {} to {}", addr_path, cluster);
        return Ok(());
    }

    svc.create(&route).await?;
    info!("Created Route for {} to {}", addr_path, cluster);
    Ok(())
}

async fn add_proxy<S: ConfigService>(
    svc: &S,
    zk: &ZoneKey,
    name: &str,
    domain_keys: Vec<DomainKey>,
    replace: bool,
) -> crate::error::Result<()> {
    let found: Vec<Proxy> = svc.index(&[ProxyFilter::by_name(zk, name)]).await?;

    let mut proxy = Proxy {
        name: name.to_string(),
        domain_keys,
        zone_key: zk.clone(),
        ..Default::default()
    };

    if let Some(existing) = found.into_iter().next() {
        info!("Proxy {} already exists", name);
        if !replace {
            return Ok(());
        }

        proxy.proxy_key = existing.proxy_key;
        proxy.checksum = existing.checksum;
        svc.modify(&proxy).await?;
        info!("Modified Proxy {}", name);
        return Ok(());
    }

    svc.create(&proxy).await?;
    info!("Created Proxy {}", name);
    Ok(())
}

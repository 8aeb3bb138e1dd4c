//! Index filters, one per record type
//!
//! Unset attributes do not constrain the query. Several filters passed to
//! one index call match the union of their results.

use chrono::{DateTime, Utc};

use super::{
    AccessTokenKey, ClusterKey, DomainKey, OrgKey, ProxyKey, RouteKey, SharedRulesKey, UserKey,
    ZoneKey,
};

crate::filter_record! {
    pub struct ZoneFilter {
        pub zone_key: Option<ZoneKey>,
        pub name: Option<String>,
        pub org_key: Option<OrgKey>,
    }
}

crate::filter_record! {
    pub struct ClusterFilter {
        pub cluster_key: Option<ClusterKey>,
        pub name: Option<String>,
        pub zone_key: Option<ZoneKey>,
        pub org_key: Option<OrgKey>,
    }
}

crate::filter_record! {
    pub struct DomainFilter {
        pub domain_key: Option<DomainKey>,
        pub name: Option<String>,
        pub port: Option<u16>,
        pub zone_key: Option<ZoneKey>,
        pub org_key: Option<OrgKey>,
    }
}

crate::filter_record! {
    pub struct ProxyFilter {
        pub proxy_key: Option<ProxyKey>,
        pub name: Option<String>,
        /// Matches proxies serving any of these domains
        pub domain_keys: Vec<DomainKey>,
        pub zone_key: Option<ZoneKey>,
        pub org_key: Option<OrgKey>,
    }
}

crate::filter_record! {
    pub struct RouteFilter {
        pub route_key: Option<RouteKey>,
        pub domain_key: Option<DomainKey>,
        pub zone_key: Option<ZoneKey>,
        pub path: Option<String>,
        pub path_prefix: Option<String>,
        pub shared_rules_key: Option<SharedRulesKey>,
        pub org_key: Option<OrgKey>,
    }
}

crate::filter_record! {
    pub struct SharedRulesFilter {
        pub shared_rules_key: Option<SharedRulesKey>,
        pub name: Option<String>,
        pub zone_key: Option<ZoneKey>,
        pub org_key: Option<OrgKey>,
    }
}

crate::filter_record! {
    pub struct UserFilter {
        pub user_key: Option<UserKey>,
        pub login_email: Option<String>,
        pub api_key: Option<String>,
        pub org_key: Option<OrgKey>,
        /// Only users that have not been deleted
        pub active: Option<bool>,
        pub deleted_before: Option<DateTime<Utc>>,
        pub deleted_after: Option<DateTime<Utc>>,
    }
}

crate::filter_record! {
    pub struct AccessTokenFilter {
        pub access_token_key: Option<AccessTokenKey>,
        pub description: Option<String>,
        pub user_key: Option<UserKey>,
        pub org_key: Option<OrgKey>,
        pub created_before: Option<DateTime<Utc>>,
        pub created_after: Option<DateTime<Utc>>,
    }
}

impl ZoneFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

macro_rules! by_zone {
    ($($filter:ident),* $(,)?) => {
        $(
            impl $filter {
                pub fn by_zone(zone_key: &ZoneKey) -> Self {
                    Self {
                        zone_key: Some(zone_key.clone()),
                        ..Default::default()
                    }
                }
            }
        )*
    };
}

by_zone!(ClusterFilter, DomainFilter, ProxyFilter, RouteFilter, SharedRulesFilter);

impl ClusterFilter {
    pub fn by_name(zone_key: &ZoneKey, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::by_zone(zone_key)
        }
    }
}

impl DomainFilter {
    pub fn by_addr(zone_key: &ZoneKey, name: impl Into<String>, port: u16) -> Self {
        Self {
            name: Some(name.into()),
            port: Some(port),
            ..Self::by_zone(zone_key)
        }
    }
}

impl ProxyFilter {
    pub fn by_domain(domain_key: &DomainKey) -> Self {
        Self {
            domain_keys: vec![domain_key.clone()],
            ..Default::default()
        }
    }

    pub fn by_name(zone_key: &ZoneKey, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::by_zone(zone_key)
        }
    }
}

impl RouteFilter {
    pub fn by_domain(domain_key: &DomainKey) -> Self {
        Self {
            domain_key: Some(domain_key.clone()),
            ..Default::default()
        }
    }

    pub fn by_shared_rules(shared_rules_key: &SharedRulesKey) -> Self {
        Self {
            shared_rules_key: Some(shared_rules_key.clone()),
            ..Default::default()
        }
    }
}

impl SharedRulesFilter {
    pub fn by_name(zone_key: &ZoneKey, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::by_zone(zone_key)
        }
    }
}

//! Record definitions
//!
//! Attributes this client does not interpret are kept in `extra` so a
//! fetched record can be edited and written back without losing them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    AccessTokenKey, Checksum, ClusterKey, DomainKey, OrgKey, ProxyKey, RouteKey, SharedRulesKey,
    UserKey, ZoneKey,
};

pub type Extra = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadatum {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Metadatum {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub type Metadata = Vec<Metadatum>;

/// Top-level namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub zone_key: ZoneKey,
    pub name: String,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
}

/// A backend host:port with metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Named collection of backend instances within a zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub cluster_key: ClusterKey,
    #[serde(default)]
    pub zone_key: ZoneKey,
    pub name: String,
    #[serde(default)]
    pub require_tls: bool,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Host and port binding within a zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub domain_key: DomainKey,
    #[serde(default)]
    pub zone_key: ZoneKey,
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Domain {
    /// Canonical `host:port` address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.name, self.port)
    }
}

/// A serving entity within a zone, serving a set of domains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(default)]
    pub proxy_key: ProxyKey,
    #[serde(default)]
    pub zone_key: ZoneKey,
    pub name: String,
    #[serde(default)]
    pub domain_keys: Vec<DomainKey>,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Weighted reference to a cluster, optionally narrowed by metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterConstraint {
    #[serde(default)]
    pub constraint_key: String,
    pub cluster_key: ClusterKey,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub weight: u32,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Light (served), dark (shadowed) and tap (copied) traffic constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllConstraints {
    #[serde(default)]
    pub light: Vec<ClusterConstraint>,
    #[serde(default)]
    pub dark: Vec<ClusterConstraint>,
    #[serde(default)]
    pub tap: Vec<ClusterConstraint>,
}

impl AllConstraints {
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClusterConstraint> {
        self.light
            .iter_mut()
            .chain(self.dark.iter_mut())
            .chain(self.tap.iter_mut())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    #[default]
    Header,
    Cookie,
    Query,
}

/// Request attribute match that selects a rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub kind: MatchKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub behavior: String,
    pub from: Metadatum,
    #[serde(default)]
    pub to: Metadatum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub rule_key: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub constraints: AllConstraints,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Path binding under a domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub route_key: RouteKey,
    pub domain_key: DomainKey,
    #[serde(default)]
    pub zone_key: ZoneKey,
    pub path: String,
    pub shared_rules_key: SharedRulesKey,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Reusable weighted routing policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedRules {
    #[serde(default)]
    pub shared_rules_key: SharedRulesKey,
    pub name: String,
    #[serde(default)]
    pub zone_key: ZoneKey,
    #[serde(default)]
    pub default: AllConstraints,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub user_key: UserKey,
    pub login_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(default)]
    pub access_token_key: AccessTokenKey,
    pub description: String,
    /// Only present in the response to a create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_token: Option<String>,
    #[serde(default, skip_serializing_if = "UserKey::is_empty")]
    pub user_key: UserKey,
    #[serde(default, skip_serializing_if = "OrgKey::is_empty")]
    pub org_key: OrgKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Checksum::is_empty")]
    pub checksum: Checksum,
}

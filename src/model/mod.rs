//! Typed records of the configuration API
//!
//! Every record type implements [`ApiObject`], which ties it to its key
//! type, its index filter and its [`ObjectKind`].

mod filters;
mod objects;

use std::fmt::{self, Debug, Display};
use std::hash::Hash;

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::filter::{FieldKind, FieldType, FieldValue, Filter};

pub use filters::*;
pub use objects::*;

/// The closed set of object types the API exposes
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    #[value(name = "user")]
    User,
    #[value(name = "zone")]
    Zone,
    #[value(name = "proxy")]
    Proxy,
    #[value(name = "domain")]
    Domain,
    #[value(name = "route")]
    Route,
    #[value(name = "shared_rules", alias = "shared-rules", alias = "sharedrules")]
    SharedRules,
    #[value(name = "cluster")]
    Cluster,
    #[value(name = "access_token", alias = "access-token")]
    AccessToken,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 8] = [
        ObjectKind::User,
        ObjectKind::Zone,
        ObjectKind::Proxy,
        ObjectKind::Domain,
        ObjectKind::Route,
        ObjectKind::SharedRules,
        ObjectKind::Cluster,
        ObjectKind::AccessToken,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::User => "user",
            ObjectKind::Zone => "zone",
            ObjectKind::Proxy => "proxy",
            ObjectKind::Domain => "domain",
            ObjectKind::Route => "route",
            ObjectKind::SharedRules => "shared_rules",
            ObjectKind::Cluster => "cluster",
            ObjectKind::AccessToken => "access_token",
        }
    }

    /// API path of the collection, relative to the API base URL
    pub fn path(self) -> &'static str {
        match self {
            ObjectKind::User => "/v1.0/admin/user",
            ObjectKind::Zone => "/v1.0/zone",
            ObjectKind::Proxy => "/v1.0/proxy",
            ObjectKind::Domain => "/v1.0/domain",
            ObjectKind::Route => "/v1.0/route",
            ObjectKind::SharedRules => "/v1.0/shared_rules",
            ObjectKind::Cluster => "/v1.0/cluster",
            ObjectKind::AccessToken => "/v1.0/admin/user/access_token",
        }
    }

    /// Comma separated list of every type name, for help output
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Marker for the opaque key newtypes
pub trait ObjectKey:
    From<String>
    + AsRef<str>
    + Clone
    + Ord
    + Hash
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + 'static
{
}

/// A record stored by the remote service
pub trait ApiObject:
    Serialize + DeserializeOwned + Clone + Debug + Default + PartialEq + Send + Sync + 'static
{
    type Key: ObjectKey;
    type Filter: Filter + Serialize + Clone + Debug + Send + Sync;

    const KIND: ObjectKind;

    fn key(&self) -> &Self::Key;
    fn set_key(&mut self, key: Self::Key);
    fn checksum(&self) -> &Checksum;
    fn set_checksum(&mut self, checksum: Checksum);
}

macro_rules! object_keys {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub String);

            #[allow(dead_code)]
            impl $name {
                pub fn as_str(&self) -> &str {
                    &self.0
                }

                pub fn is_empty(&self) -> bool {
                    self.0.is_empty()
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(s: String) -> Self {
                    Self(s)
                }
            }

            impl From<&str> for $name {
                fn from(s: &str) -> Self {
                    Self(s.to_string())
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }

            impl ObjectKey for $name {}

            impl FieldType for $name {
                fn kind() -> FieldKind {
                    FieldKind::Str
                }

                fn from_value(value: FieldValue) -> Option<Self> {
                    String::from_value(value).map(Self)
                }

                fn is_unset(&self) -> bool {
                    self.0.is_empty()
                }
            }
        )*
    };
}

object_keys! {
    ZoneKey,
    ClusterKey,
    DomainKey,
    ProxyKey,
    RouteKey,
    SharedRulesKey,
    UserKey,
    OrgKey,
    AccessTokenKey,
}

/// Optimistic concurrency token; every modify/delete must carry the value
/// read at get/index time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(pub String);

impl Checksum {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! api_object {
    ($(
        $ty:ident { key: $key_field:ident: $key:ty, filter: $filter:ty, kind: $kind:ident }
    ),* $(,)?) => {
        $(
            impl ApiObject for $ty {
                type Key = $key;
                type Filter = $filter;

                const KIND: ObjectKind = ObjectKind::$kind;

                fn key(&self) -> &Self::Key {
                    &self.$key_field
                }

                fn set_key(&mut self, key: Self::Key) {
                    self.$key_field = key;
                }

                fn checksum(&self) -> &Checksum {
                    &self.checksum
                }

                fn set_checksum(&mut self, checksum: Checksum) {
                    self.checksum = checksum;
                }
            }
        )*
    };
}

api_object! {
    Zone { key: zone_key: ZoneKey, filter: ZoneFilter, kind: Zone },
    Cluster { key: cluster_key: ClusterKey, filter: ClusterFilter, kind: Cluster },
    Domain { key: domain_key: DomainKey, filter: DomainFilter, kind: Domain },
    Proxy { key: proxy_key: ProxyKey, filter: ProxyFilter, kind: Proxy },
    Route { key: route_key: RouteKey, filter: RouteFilter, kind: Route },
    SharedRules {
        key: shared_rules_key: SharedRulesKey,
        filter: SharedRulesFilter,
        kind: SharedRules
    },
    User { key: user_key: UserKey, filter: UserFilter, kind: User },
    AccessToken {
        key: access_token_key: AccessTokenKey,
        filter: AccessTokenFilter,
        kind: AccessToken
    },
}

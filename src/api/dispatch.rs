//! Object-type dispatch for the generic commands
//!
//! `get`, `list`, `create`, `edit` and `delete` take the object type as a
//! command line argument. [`AnyObject`] is the closed set of records those
//! commands handle, and each function here maps an [`ObjectKind`] onto the
//! matching typed [`ConfigService`] call.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::api::ConfigService;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::filter;
use crate::model::{
    AccessToken, ApiObject, Checksum, Cluster, Domain, ObjectKind, Proxy, Route, SharedRules,
    User, Zone,
};
use crate::output;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyObject {
    User(User),
    Zone(Zone),
    Proxy(Proxy),
    Domain(Domain),
    Route(Route),
    SharedRules(SharedRules),
    Cluster(Cluster),
    AccessToken(AccessToken),
}

/// Run `$body` with `$t` bound to the record type of `$kind`
macro_rules! with_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            ObjectKind::User => {
                type $t = User;
                $body
            }
            ObjectKind::Zone => {
                type $t = Zone;
                $body
            }
            ObjectKind::Proxy => {
                type $t = Proxy;
                $body
            }
            ObjectKind::Domain => {
                type $t = Domain;
                $body
            }
            ObjectKind::Route => {
                type $t = Route;
                $body
            }
            ObjectKind::SharedRules => {
                type $t = SharedRules;
                $body
            }
            ObjectKind::Cluster => {
                type $t = Cluster;
                $body
            }
            ObjectKind::AccessToken => {
                type $t = AccessToken;
                $body
            }
        }
    };
}

/// Run `$body` with `$o` bound to the typed record inside `$object`
macro_rules! with_object {
    ($object:expr, $o:ident => $body:expr) => {
        match $object {
            AnyObject::User($o) => $body,
            AnyObject::Zone($o) => $body,
            AnyObject::Proxy($o) => $body,
            AnyObject::Domain($o) => $body,
            AnyObject::Route($o) => $body,
            AnyObject::SharedRules($o) => $body,
            AnyObject::Cluster($o) => $body,
            AnyObject::AccessToken($o) => $body,
        }
    };
}

macro_rules! any_object_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for AnyObject {
                fn from(o: $variant) -> Self {
                    AnyObject::$variant(o)
                }
            }
        )*
    };
}

any_object_from!(User, Zone, Proxy, Domain, Route, SharedRules, Cluster, AccessToken);

impl AnyObject {
    pub fn kind(&self) -> ObjectKind {
        fn kind_of<T: ApiObject>(_: &T) -> ObjectKind {
            T::KIND
        }
        with_object!(self, o => kind_of(o))
    }

    pub fn key(&self) -> String {
        with_object!(self, o => o.key().to_string())
    }

    pub fn checksum(&self) -> &Checksum {
        with_object!(self, o => o.checksum())
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// An empty record of the given type, used as the editor template for create
pub fn zero(kind: ObjectKind) -> AnyObject {
    with_kind!(kind, T => AnyObject::from(T::default()))
}

/// Decode a record of the given type with the configured codec
pub fn decode(kind: ObjectKind, text: &str, format: OutputFormat) -> Result<AnyObject> {
    with_kind!(kind, T => output::decode::<T>(text, format).map(AnyObject::from))
}

pub async fn create<S: ConfigService>(svc: &S, object: &AnyObject) -> Result<AnyObject> {
    with_object!(object, o => svc.create(o).await.map(AnyObject::from))
}

pub async fn get<S: ConfigService>(svc: &S, kind: ObjectKind, key: &str) -> Result<AnyObject> {
    with_kind!(kind, T => svc.get::<T>(&key.into()).await.map(AnyObject::from))
}

pub async fn modify<S: ConfigService>(svc: &S, object: &AnyObject) -> Result<AnyObject> {
    with_object!(object, o => svc.modify(o).await.map(AnyObject::from))
}

pub async fn delete<S: ConfigService>(
    svc: &S,
    kind: ObjectKind,
    key: &str,
    checksum: &Checksum,
) -> Result<()> {
    with_kind!(kind, T => svc.delete::<T>(&key.into(), checksum).await)
}

/// Index records of the given type, narrowed by a filter populated from
/// `name=value` attributes
pub async fn index<S: ConfigService>(
    svc: &S,
    kind: ObjectKind,
    attrs: &BTreeMap<String, String>,
    slice_sep: &str,
) -> Result<Vec<AnyObject>> {
    with_kind!(kind, T => {
        let mut filter = <T as ApiObject>::Filter::default();
        filter::populate(&mut filter, attrs, slice_sep)?;

        let found: Vec<T> = svc.index(&[filter]).await?;
        Ok(found.into_iter().map(AnyObject::from).collect())
    })
}

/// Filter attribute names and type descriptions for the given type
pub fn describe_filter(kind: ObjectKind) -> BTreeMap<&'static str, String> {
    with_kind!(kind, T => filter::describe::<<T as ApiObject>::Filter>())
}

/// Rust name of the filter record for the given type
pub fn filter_name(kind: ObjectKind) -> &'static str {
    with_kind!(kind, T => {
        let name = std::any::type_name::<<T as ApiObject>::Filter>();
        name.rsplit("::").next().unwrap_or(name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryService;

    #[test]
    fn test_zero_matches_kind() {
        for kind in ObjectKind::ALL {
            assert_eq!(zero(kind).kind(), kind);
        }
    }

    #[test]
    fn test_decode_yaml_cluster() {
        let obj = decode(
            ObjectKind::Cluster,
            "name: api\ninstances:\n  - host: 10.0.0.1\n    port: 8080\n",
            OutputFormat::Yaml,
        )
        .unwrap();

        match obj {
            AnyObject::Cluster(c) => {
                assert_eq!(c.name, "api");
                assert_eq!(c.instances[0].port, 8080);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_round_trip_through_service() {
        let svc = MemoryService::new();

        let created = create(&svc, &AnyObject::from(Zone {
            name: "prod".into(),
            ..Default::default()
        }))
        .await
        .unwrap();
        let key = created.key();

        let fetched = get(&svc, ObjectKind::Zone, &key).await.unwrap();
        assert_eq!(fetched, created);

        let attrs = [("name".to_string(), "prod".to_string())].into_iter().collect();
        let listed = index(&svc, ObjectKind::Zone, &attrs, ",").await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        delete(&svc, ObjectKind::Zone, &key, created.checksum())
            .await
            .unwrap();
        assert!(get(&svc, ObjectKind::Zone, &key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_index_rejects_bad_attribute() {
        let svc = MemoryService::new();
        let attrs = [("port".to_string(), "eighty".to_string())].into_iter().collect();
        let err = index(&svc, ObjectKind::Domain, &attrs, ",").await.unwrap_err();
        assert!(err.to_string().contains("unable to set port"));
    }

    #[test]
    fn test_describe_and_name_filters() {
        assert_eq!(describe_filter(ObjectKind::Route)["path_prefix"], "string");
        assert_eq!(filter_name(ObjectKind::SharedRules), "SharedRulesFilter");
    }
}

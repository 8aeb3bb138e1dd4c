//! In-memory configuration store for tests
//!
//! Assigns keys and checksums like the real service, rejects stale
//! checksums, refuses deletes that would orphan references, and records a
//! trace of every call so tests can assert on ordering.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::ConfigService;
use crate::error::{Error, Result};
use crate::model::{ApiObject, Checksum, ObjectKind};

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKind, BTreeMap<String, Value>>,
    next_id: usize,
    fail_create: HashSet<ObjectKind>,
    fail_delete: HashSet<(ObjectKind, String)>,
    trace: Vec<String>,
}

#[derive(Default)]
pub struct MemoryService {
    state: Mutex<State>,
}

fn key_field(kind: ObjectKind) -> String {
    format!("{}_key", kind.name())
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or_default()
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Store a record directly, assigning key and checksum, without tracing
    pub fn seed<T: ApiObject>(&self, object: T) -> T {
        let mut state = self.lock();
        Self::insert(&mut state, object).unwrap()
    }

    /// Every following create of `kind` fails
    pub fn fail_create(&self, kind: ObjectKind) {
        self.lock().fail_create.insert(kind);
    }

    /// Deleting this record fails with a server error
    pub fn fail_delete(&self, kind: ObjectKind, key: &str) {
        self.lock().fail_delete.insert((kind, key.to_string()));
    }

    /// Simulate a concurrent modification by changing the stored checksum
    pub fn touch(&self, kind: ObjectKind, key: &str) {
        let mut state = self.lock();
        if let Some(obj) = state
            .objects
            .get_mut(&kind)
            .and_then(|objs| objs.get_mut(key))
        {
            obj["checksum"] = Value::String(format!("touched-{}", key));
        }
    }

    pub fn trace(&self) -> Vec<String> {
        self.lock().trace.clone()
    }

    /// Trace entries for mutating calls only
    pub fn mutations(&self) -> Vec<String> {
        self.trace()
            .into_iter()
            .filter(|t| !t.starts_with("get ") && !t.starts_with("index "))
            .collect()
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.lock().objects.get(&kind).map_or(0, BTreeMap::len)
    }

    pub fn all<T: ApiObject>(&self) -> Vec<T> {
        self.lock()
            .objects
            .get(&T::KIND)
            .map(|objs| {
                objs.values()
                    .map(|v| serde_json::from_value(v.clone()).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find<T: ApiObject>(&self, key: &str) -> Option<T> {
        self.lock()
            .objects
            .get(&T::KIND)
            .and_then(|objs| objs.get(key))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    fn insert<T: ApiObject>(state: &mut State, object: T) -> Result<T> {
        state.next_id += 1;
        let id = state.next_id;
        let kind = T::KIND;

        let mut value = serde_json::to_value(&object)?;
        let key = format!("{}-{}", kind.name(), id);
        value[key_field(kind)] = Value::String(key.clone());
        value["checksum"] = Value::String(format!("ck-{}", id));

        state
            .objects
            .entry(kind)
            .or_default()
            .insert(key, value.clone());

        Ok(serde_json::from_value(value)?)
    }

    fn dependents(state: &State, kind: ObjectKind, key: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut scan = |dep_kind: ObjectKind, refers: &dyn Fn(&Value) -> bool| {
            if let Some(objs) = state.objects.get(&dep_kind) {
                for (k, v) in objs {
                    if refers(v) {
                        found.push(format!("{} {}", dep_kind, k));
                    }
                }
            }
        };

        match kind {
            ObjectKind::Zone => {
                for dep in ObjectKind::ALL.into_iter().filter(|k| *k != ObjectKind::Zone) {
                    scan(dep, &|v| str_field(v, "zone_key") == key);
                }
            }
            ObjectKind::Domain => {
                scan(ObjectKind::Route, &|v| str_field(v, "domain_key") == key);
                scan(ObjectKind::Proxy, &|v| {
                    v.get("domain_keys")
                        .and_then(Value::as_array)
                        .is_some_and(|dks| dks.iter().any(|dk| dk == key))
                });
            }
            ObjectKind::SharedRules => {
                scan(ObjectKind::Route, &|v| str_field(v, "shared_rules_key") == key);
            }
            ObjectKind::Cluster => {
                scan(ObjectKind::SharedRules, &|v| mentions_cluster(v, key));
            }
            _ => {}
        }

        found
    }

    fn matches(record: &Value, filter: &Map<String, Value>) -> bool {
        filter.iter().all(|(field, want)| match field.as_str() {
            "path_prefix" => want
                .as_str()
                .is_some_and(|p| str_field(record, "path").starts_with(p)),
            "active" => {
                let deleted = record.get("deleted_at").is_some_and(|d| !d.is_null());
                want.as_bool() != Some(deleted)
            }
            f if f.ends_with("_before") || f.ends_with("_after") => true,
            _ => match (record.get(field), want) {
                (Some(Value::Array(have)), Value::Array(want)) => {
                    want.iter().any(|w| have.contains(w))
                }
                (Some(have), want) => have == want,
                (None, _) => false,
            },
        })
    }
}

fn mentions_cluster(value: &Value, cluster_key: &str) -> bool {
    match value {
        Value::Object(map) => map.iter().any(|(k, v)| {
            (k == "cluster_key" && v == cluster_key) || mentions_cluster(v, cluster_key)
        }),
        Value::Array(items) => items.iter().any(|v| mentions_cluster(v, cluster_key)),
        _ => false,
    }
}

#[async_trait]
impl ConfigService for MemoryService {
    async fn create<T: ApiObject>(&self, object: &T) -> Result<T> {
        let mut state = self.lock();
        if state.fail_create.contains(&T::KIND) {
            return Err(Error::Api {
                status: 500,
                message: format!("injected create failure for {}", T::KIND),
            });
        }

        let created = Self::insert(&mut state, object.clone())?;
        state
            .trace
            .push(format!("create {} {}", T::KIND, created.key()));
        Ok(created)
    }

    async fn get<T: ApiObject>(&self, key: &T::Key) -> Result<T> {
        let mut state = self.lock();
        state.trace.push(format!("get {} {}", T::KIND, key));

        let value = state
            .objects
            .get(&T::KIND)
            .and_then(|objs| objs.get(key.as_ref()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {}", T::KIND, key)))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn modify<T: ApiObject>(&self, object: &T) -> Result<T> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        let key = object.key().to_string();

        let stored = state
            .objects
            .get_mut(&T::KIND)
            .and_then(|objs| objs.get_mut(&key))
            .ok_or_else(|| Error::NotFound(format!("{} {}", T::KIND, key)))?;

        if str_field(stored, "checksum") != object.checksum().as_str() {
            return Err(Error::Conflict(format!("stale checksum for {} {}", T::KIND, key)));
        }

        let mut value = serde_json::to_value(object)?;
        value["checksum"] = Value::String(format!("ck-{}", id));
        *stored = value.clone();

        state.trace.push(format!("modify {} {}", T::KIND, key));
        Ok(serde_json::from_value(value)?)
    }

    async fn delete<T: ApiObject>(&self, key: &T::Key, checksum: &Checksum) -> Result<()> {
        let mut state = self.lock();
        let key = key.as_ref();

        let stored = state
            .objects
            .get(&T::KIND)
            .and_then(|objs| objs.get(key))
            .ok_or_else(|| Error::NotFound(format!("{} {}", T::KIND, key)))?;

        if str_field(stored, "checksum") != checksum.as_str() {
            return Err(Error::Conflict(format!("stale checksum for {} {}", T::KIND, key)));
        }

        if state.fail_delete.contains(&(T::KIND, key.to_string())) {
            return Err(Error::Api {
                status: 500,
                message: format!("injected delete failure for {} {}", T::KIND, key),
            });
        }

        let dependents = Self::dependents(&state, T::KIND, key);
        if !dependents.is_empty() {
            return Err(Error::Validation(format!(
                "{} {} is still referenced by {}",
                T::KIND,
                key,
                dependents.join(", ")
            )));
        }

        if let Some(objs) = state.objects.get_mut(&T::KIND) {
            objs.remove(key);
        }
        state.trace.push(format!("delete {} {}", T::KIND, key));
        Ok(())
    }

    async fn index<T: ApiObject>(&self, filters: &[T::Filter]) -> Result<Vec<T>> {
        let filters = filters
            .iter()
            .map(|f| -> Result<Map<String, Value>> {
                match serde_json::to_value(f)? {
                    Value::Object(map) => Ok(map),
                    _ => Ok(Map::new()),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.lock();
        state.trace.push(format!("index {}", T::KIND));

        let Some(objs) = state.objects.get(&T::KIND) else {
            return Ok(Vec::new());
        };

        objs.values()
            .filter(|v| filters.is_empty() || filters.iter().any(|f| Self::matches(v, f)))
            .map(|v| serde_json::from_value(v.clone()).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Domain, Proxy, ProxyFilter, Route, RouteFilter, Zone, ZoneFilter};

    #[tokio::test]
    async fn test_assigns_keys_and_checksums() {
        let svc = MemoryService::new();
        let zone = svc
            .create(&Zone {
                name: "prod".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(zone.zone_key.as_str(), "zone-1");
        assert!(!zone.checksum.is_empty());

        let found: Vec<Zone> = svc.index(&[ZoneFilter::by_name("prod")]).await.unwrap();
        assert_eq!(found, vec![zone]);
    }

    #[tokio::test]
    async fn test_stale_checksum_conflicts() {
        let svc = MemoryService::new();
        let zone = svc.seed(Zone {
            name: "prod".into(),
            ..Default::default()
        });
        svc.touch(ObjectKind::Zone, zone.zone_key.as_str());

        let err = svc.delete::<Zone>(&zone.zone_key, &zone.checksum).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_index_filters_are_a_union() {
        let svc = MemoryService::new();
        let zone = svc.seed(Zone::default());
        let d1 = svc.seed(Domain {
            zone_key: zone.zone_key.clone(),
            ..Default::default()
        });
        let d2 = svc.seed(Domain {
            zone_key: zone.zone_key.clone(),
            ..Default::default()
        });
        for (path, dk) in [("/a", &d1), ("/b", &d2), ("/c", &d2)] {
            svc.seed(Route {
                path: path.into(),
                domain_key: dk.domain_key.clone(),
                ..Default::default()
            });
        }
        svc.seed(Proxy {
            domain_keys: vec![d1.domain_key.clone(), d2.domain_key.clone()],
            ..Default::default()
        });

        let routes: Vec<Route> = svc
            .index(&[
                RouteFilter::by_domain(&d1.domain_key),
                RouteFilter {
                    path: Some("/c".into()),
                    ..Default::default()
                },
            ])
            .await
            .unwrap();
        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/c"]);

        let proxies: Vec<Proxy> = svc
            .index(&[ProxyFilter::by_domain(&d2.domain_key)])
            .await
            .unwrap();
        assert_eq!(proxies.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_refuses_to_orphan() {
        let svc = MemoryService::new();
        let zone = svc.seed(Zone::default());
        svc.seed(Domain {
            zone_key: zone.zone_key.clone(),
            ..Default::default()
        });

        let err = svc.delete::<Zone>(&zone.zone_key, &zone.checksum).await.unwrap_err();
        assert!(err.to_string().contains("still referenced by domain"));
        assert!(!err.to_string().contains("by zone"));
    }

    #[tokio::test]
    async fn test_empty_zone_is_deletable() {
        let svc = MemoryService::new();
        let zone = svc.seed(Zone {
            name: "prod".into(),
            ..Default::default()
        });
        let other = svc.seed(Zone {
            name: "staging".into(),
            ..Default::default()
        });

        svc.delete::<Zone>(&zone.zone_key, &zone.checksum).await.unwrap();

        assert!(svc.find::<Zone>(zone.zone_key.as_str()).is_none());
        assert!(svc.find::<Zone>(other.zone_key.as_str()).is_some());
        assert_eq!(svc.mutations(), vec![format!("delete zone {}", zone.zone_key)]);
    }
}

//! Per-command memo of get-by-key lookups

use std::collections::HashMap;

use crate::api::ConfigService;
use crate::error::{Error, Result};
use crate::model::ApiObject;

/// Remembers every record fetched by key for the lifetime of one command,
/// so formatting a long listing fetches each referenced zone or domain once
pub struct Memo<T: ApiObject> {
    entries: HashMap<T::Key, T>,
}

impl<T: ApiObject> Default for Memo<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: ApiObject> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<S: ConfigService>(&mut self, svc: &S, key: &T::Key) -> Result<&T> {
        if !self.entries.contains_key(key) {
            let object: T = svc.get(key).await?;
            self.entries.insert(key.clone(), object);
        }

        self.entries
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("{} {}", T::KIND, key)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryService;
    use crate::model::Zone;

    #[tokio::test]
    async fn test_repeated_lookups_fetch_once() {
        let svc = MemoryService::new();
        let zone = svc.seed(Zone {
            name: "prod".into(),
            ..Default::default()
        });

        let mut memo = Memo::<Zone>::new();
        for _ in 0..3 {
            let got = memo.get(&svc, &zone.zone_key).await.unwrap();
            assert_eq!(got.name, "prod");
        }

        let gets = svc.trace().iter().filter(|t| t.starts_with("get ")).count();
        assert_eq!(gets, 1);
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_cached() {
        let svc = MemoryService::new();
        let mut memo = Memo::<Zone>::new();

        assert!(memo.get(&svc, &"nope".into()).await.unwrap_err().is_not_found());
        assert_eq!(memo.len(), 0);
    }
}

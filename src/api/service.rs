//! The remote configuration store as seen by the rest of the crate

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ApiObject, Checksum};

/// Create/get/modify/delete/index over every record type.
///
/// Modify and delete carry the checksum read at get/index time; a stale
/// one fails with [`crate::error::Error::Conflict`]. Index with several
/// filters returns the union of their matches, and with none returns
/// every record of the type.
#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn create<T: ApiObject>(&self, object: &T) -> Result<T>;

    async fn get<T: ApiObject>(&self, key: &T::Key) -> Result<T>;

    async fn modify<T: ApiObject>(&self, object: &T) -> Result<T>;

    async fn delete<T: ApiObject>(&self, key: &T::Key, checksum: &Checksum) -> Result<()>;

    async fn index<T: ApiObject>(&self, filters: &[T::Filter]) -> Result<Vec<T>>;
}

use async_trait::async_trait;

use crate::error::StoreError;
use crate::index::IndexFn;
use crate::object::StoreObject;

pub type StoreResult<T> = Result<T, StoreError>;

/// Namespaced CRUD access to one resource kind, plus a secondary-index facility.
///
/// Implementations exist per environment: [`crate::k8s::KubeStore`] talks to the
/// Kubernetes API server, [`crate::memory::MemoryStore`] keeps objects in process
/// for tests.
#[async_trait]
pub trait ObjectStore<K: StoreObject>: Send + Sync {
    /// Fetch one object. Absence is `Ok(None)`, never `Err(NotFound)`.
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>>;

    async fn list(&self, namespace: &str) -> StoreResult<Vec<K>>;

    async fn create(&self, obj: &K) -> StoreResult<K>;

    /// Replace an existing object. A resource version on `obj` that no longer
    /// matches the stored one yields [`StoreError::Conflict`].
    async fn update(&self, obj: &K) -> StoreResult<K>;

    async fn delete(&self, obj: &K) -> StoreResult<()>;

    /// Register a named index extractor. Fails with [`StoreError::IndexConflict`]
    /// if `key` is already taken.
    async fn register_index(
        &self,
        key: &str,
        extractor: IndexFn<K>,
    ) -> StoreResult<()>;

    async fn index_extractor(&self, key: &str) -> Option<IndexFn<K>>;

    /// Objects in `namespace` whose extractor for `key` yields `value`.
    ///
    /// The default lists the namespace and re-derives the filter with the
    /// registered extractor; backends that materialise the index override it.
    async fn list_by_index(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> StoreResult<Vec<K>> {
        let extractor = self
            .index_extractor(key)
            .await
            .ok_or_else(|| StoreError::IndexNotFound(key.to_string()))?;
        let items = self.list(namespace).await?;
        Ok(items
            .into_iter()
            .filter(|obj| extractor(obj).iter().any(|v| v == value))
            .collect())
    }
}

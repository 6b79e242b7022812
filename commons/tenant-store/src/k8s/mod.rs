use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Client;
use kube::api::{Api, DeleteParams, ListParams, PostParams, Preconditions};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::index::{IndexFn, IndexRegistry};
use crate::object::{ObjectKey, StoreObject};
use crate::traits::*;

/// Object store backed by the Kubernetes API server.
///
/// Indexes are not materialised here: `list_by_index` lists the namespace
/// from the server and applies the registered extractor, which keeps it
/// consistent with whatever the server returns.
#[derive(Clone)]
pub struct KubeStore<K> {
    client: Client,
    field_manager: Option<String>,
    indexes: Arc<IndexRegistry<K>>,
}

impl<K> KubeStore<K>
where
    K: StoreObject + kube::Resource<Scope = NamespaceResourceScope>,
{
    pub fn new(client: Client) -> Self {
        Self {
            client,
            field_manager: None,
            indexes: Arc::new(IndexRegistry::new()),
        }
    }

    pub fn with_field_manager(mut self, manager: &str) -> Self {
        self.field_manager = Some(manager.to_string());
        self
    }

    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: self.field_manager.clone(),
            ..Default::default()
        }
    }
}

fn namespace_of(key: &ObjectKey) -> StoreResult<&str> {
    if key.name.is_empty() || key.namespace.is_empty() {
        return Err(StoreError::InvalidObject(format!(
            "object '{}' needs both namespace and name",
            key
        )));
    }
    Ok(&key.namespace)
}

/// Map a client error onto the store taxonomy.
pub fn map_kube_error(key: &ObjectKey, e: kube::Error) -> StoreError {
    match e {
        kube::Error::Api(ae) => match ae.code {
            404 => StoreError::NotFound(key.to_string()),
            409 if ae.reason == "AlreadyExists" => {
                StoreError::AlreadyExists(key.to_string())
            }
            409 => StoreError::Conflict(format!("{}: {}", key, ae.message)),
            500..=599 => StoreError::Unavailable(format!("{}: {}", key, ae.message)),
            _ => StoreError::Rejected(format!(
                "{}: {} ({})",
                key, ae.message, ae.reason
            )),
        },
        kube::Error::SerdeError(e) => {
            StoreError::Internal(format!("{}: {}", key, e))
        }
        other => StoreError::Unavailable(format!("{}: {}", key, other)),
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: StoreObject + kube::Resource<Scope = NamespaceResourceScope>,
{
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>> {
        let key = ObjectKey::new(namespace, name);
        trace!(%key, "kube store: get");
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_kube_error(&key, e))
    }

    async fn list(&self, namespace: &str) -> StoreResult<Vec<K>> {
        let key = ObjectKey::new(namespace, "");
        trace!(%key, "kube store: list");
        let list = self
            .api(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| map_kube_error(&key, e))?;
        Ok(list.items)
    }

    async fn create(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        let ns = namespace_of(&key)?;
        debug!(%key, "kube store: create");
        self.api(ns)
            .create(&self.post_params(), obj)
            .await
            .map_err(|e| map_kube_error(&key, e))
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        let key = ObjectKey::of(obj);
        let ns = namespace_of(&key)?;
        debug!(%key, "kube store: replace");
        self.api(ns)
            .replace(&key.name, &self.post_params(), obj)
            .await
            .map_err(|e| map_kube_error(&key, e))
    }

    async fn delete(&self, obj: &K) -> StoreResult<()> {
        let key = ObjectKey::of(obj);
        let ns = namespace_of(&key)?;
        debug!(%key, "kube store: delete");
        // Pin the delete to the object that was read so a recreated object with
        // the same name is left alone.
        let dp = DeleteParams {
            preconditions: obj.meta().uid.clone().map(|uid| Preconditions {
                uid: Some(uid),
                resource_version: None,
            }),
            ..Default::default()
        };
        self.api(ns)
            .delete(&key.name, &dp)
            .await
            .map(|_| ())
            .map_err(|e| map_kube_error(&key, e))
    }

    async fn register_index(
        &self,
        key: &str,
        extractor: IndexFn<K>,
    ) -> StoreResult<()> {
        self.indexes.register(key, extractor).await
    }

    async fn index_extractor(&self, key: &str) -> Option<IndexFn<K>> {
        self.indexes.get(key).await
    }
}

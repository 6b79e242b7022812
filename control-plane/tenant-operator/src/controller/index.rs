use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use tenant_store::{IndexFn, ObjectStore, StoreResult};
use tracing::info;

/// Index of tenant ConfigMaps by the UID of their first owner reference.
pub const OWNER_UID_INDEX: &str = "ownerReferences.uid";

/// Only the first owner reference counts; children carry at most one here.
pub fn owner_uid(cm: &ConfigMap) -> Vec<String> {
    cm.owner_references()
        .first()
        .map(|r| vec![r.uid.clone()])
        .unwrap_or_default()
}

pub fn owner_uid_extractor() -> IndexFn<ConfigMap> {
    Arc::new(owner_uid)
}

/// Register the owner index with the child store. Must run once at startup,
/// before the controller starts dispatching; a second call fails with
/// `StoreError::IndexConflict`.
pub async fn register_owner_index(
    store: &dyn ObjectStore<ConfigMap>,
) -> StoreResult<()> {
    store
        .register_index(OWNER_UID_INDEX, owner_uid_extractor())
        .await?;
    info!(index = OWNER_UID_INDEX, "ownership index registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use kube::api::ObjectMeta;
    use tenant_store::StoreError;
    use tenant_store::memory::MemoryStore;

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "multitenancy-management.example.com/v1".into(),
            kind: "TenantInfo".into(),
            name: "p".into(),
            uid: uid.into(),
            ..Default::default()
        }
    }

    fn cm_with_owners(owners: Vec<OwnerReference>) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("tenant-a-config".into()),
                namespace: Some("ns".into()),
                owner_references: Some(owners),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn first_owner_reference_is_indexed() {
        let cm = cm_with_owners(vec![owner("u1"), owner("u2")]);
        assert_eq!(owner_uid(&cm), vec!["u1".to_string()]);
    }

    #[test]
    fn unowned_children_are_not_indexed() {
        assert!(owner_uid(&cm_with_owners(vec![])).is_empty());
        assert!(owner_uid(&ConfigMap::default()).is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn registration_happens_once() {
        let store = MemoryStore::<ConfigMap>::new();
        register_owner_index(&store).await.unwrap();
        assert!(logs_contain("ownership index registered"));
        let err = register_owner_index(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::IndexConflict(_)));
    }
}

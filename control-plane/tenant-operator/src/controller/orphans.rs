use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use tenant_store::ObjectStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::desired::DesiredState;
use super::index::{OWNER_UID_INDEX, owner_uid};
use super::naming::tenant_id_from_child_name;
use super::{ReconcileError, guard};

/// Children owned by `parent_uid` whose tenant is no longer desired, in name
/// order.
pub fn select_orphans(
    owned: Vec<ConfigMap>,
    parent_uid: &str,
    desired: &DesiredState,
) -> Vec<ConfigMap> {
    let mut orphans: Vec<ConfigMap> = owned
        .into_iter()
        // the index may lag behind the object it points at
        .filter(|cm| owner_uid(cm).iter().any(|u| u == parent_uid))
        .filter(|cm| {
            !desired.contains_tenant(tenant_id_from_child_name(&cm.name_any()))
        })
        .collect();
    orphans.sort_by_key(|cm| cm.name_any());
    orphans
}

/// Delete children of the parent that no longer match a desired tenant.
/// Returns how many were removed; the first failed delete aborts the rest.
#[instrument(skip_all, fields(ns = %namespace, owner = %parent_uid))]
pub async fn collect_orphans(
    store: &dyn ObjectStore<ConfigMap>,
    namespace: &str,
    parent_uid: &str,
    desired: &DesiredState,
    cancel: &CancellationToken,
) -> Result<usize, ReconcileError> {
    let owned = guard(
        cancel,
        "list owned children",
        store.list_by_index(namespace, OWNER_UID_INDEX, parent_uid),
    )
    .await
    .inspect_err(|e| error!(error = %e, "failed to list child ConfigMaps"))?;
    debug!(owned = owned.len(), "listed owned ConfigMaps");

    let orphans = select_orphans(owned, parent_uid, desired);
    let mut deleted = 0;
    for cm in &orphans {
        let name = cm.name_any();
        info!(%name, "deleting orphaned ConfigMap");
        guard(cancel, "delete orphan", store.delete(cm))
            .await
            .inspect_err(|e| {
                error!(%name, error = %e, "failed to delete ConfigMap")
            })?;
        deleted += 1;
    }
    Ok(deleted)
}

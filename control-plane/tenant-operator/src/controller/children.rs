use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use tenant_store::ObjectStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::crd::TenantInfo;

use super::desired::{DesiredChild, DesiredState};
use super::{ReconcileError, guard};

/// Writes issued for the desired children during one pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChildTally {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl ChildTally {
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChildOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Build a new tenant ConfigMap owned by `parent`. The parent must carry a
/// name and UID, otherwise no owner reference can be formed.
pub fn new_child(
    parent: &TenantInfo,
    namespace: &str,
    child: &DesiredChild,
) -> Result<ConfigMap, ReconcileError> {
    let owner = parent.controller_owner_ref(&()).ok_or_else(|| {
        ReconcileError::OwnerReference(format!(
            "TenantInfo {}/{} has no uid",
            namespace,
            parent.name_any()
        ))
    })?;
    Ok(ConfigMap {
        metadata: ObjectMeta {
            name: Some(child.name.clone()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![OwnerReference {
                block_owner_deletion: Some(true),
                ..owner
            }]),
            ..Default::default()
        },
        data: Some(child.data.clone()),
        ..Default::default()
    })
}

/// Create missing children and overwrite drifted data, one child at a time.
/// The first failure aborts the rest of the list.
#[instrument(skip_all, fields(ns = %namespace, parent = %parent.name_any(), desired = desired.len()))]
pub async fn reconcile_children(
    store: &dyn ObjectStore<ConfigMap>,
    parent: &TenantInfo,
    namespace: &str,
    desired: &DesiredState,
    cancel: &CancellationToken,
) -> Result<ChildTally, ReconcileError> {
    let mut tally = ChildTally::default();
    for child in desired.children() {
        match apply_child(store, parent, namespace, child, cancel).await? {
            ChildOutcome::Created => tally.created += 1,
            ChildOutcome::Updated => tally.updated += 1,
            ChildOutcome::Unchanged => tally.unchanged += 1,
        }
    }
    Ok(tally)
}

async fn apply_child(
    store: &dyn ObjectStore<ConfigMap>,
    parent: &TenantInfo,
    namespace: &str,
    child: &DesiredChild,
    cancel: &CancellationToken,
) -> Result<ChildOutcome, ReconcileError> {
    let tenant_id = child.tenant_id.as_str();
    let existing = guard(cancel, "get child", store.get(namespace, &child.name))
        .await
        .inspect_err(|e| {
            error!(%tenant_id, child = %child.name, error = %e, "failed to get ConfigMap")
        })?;

    let Some(mut found) = existing else {
        let cm = new_child(parent, namespace, child).inspect_err(|e| {
            error!(%tenant_id, error = %e, "failed to set controller reference")
        })?;
        info!(%tenant_id, child = %child.name, "creating ConfigMap for tenant");
        guard(cancel, "create child", store.create(&cm))
            .await
            .inspect_err(|e| {
                error!(%tenant_id, error = %e, "failed to create ConfigMap")
            })?;
        return Ok(ChildOutcome::Created);
    };

    if found.data.as_ref() == Some(&child.data) {
        debug!(%tenant_id, child = %child.name, "ConfigMap up to date");
        return Ok(ChildOutcome::Unchanged);
    }

    found.data = Some(child.data.clone());
    info!(%tenant_id, child = %child.name, "updating ConfigMap for tenant");
    guard(cancel, "update child", store.update(&found))
        .await
        .inspect_err(|e| {
            error!(%tenant_id, error = %e, "failed to update ConfigMap")
        })?;
    Ok(ChildOutcome::Updated)
}

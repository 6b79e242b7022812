use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use tenant_store::ObjectStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::crd::TenantInfo;

use super::children::{ChildTally, reconcile_children};
use super::desired::DesiredState;
use super::orphans::collect_orphans;
use super::{ReconcileError, guard};

/// Progress of a single pass. On error the last reached phase tells which
/// step aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    DesiredComputed,
    ChildrenReconciled,
    OrphansCollected,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => write!(f, "start"),
            Phase::DesiredComputed => write!(f, "desired-computed"),
            Phase::ChildrenReconciled => write!(f, "children-reconciled"),
            Phase::OrphansCollected => write!(f, "orphans-collected"),
            Phase::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub phase: Phase,
    /// The parent no longer exists; nothing was written.
    pub parent_gone: bool,
    pub children: ChildTally,
    pub deleted: usize,
}

impl ReconcileReport {
    fn parent_gone() -> Self {
        Self {
            phase: Phase::Done,
            parent_gone: true,
            children: ChildTally::default(),
            deleted: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.children.writes() + self.deleted
    }
}

/// Converges the tenant ConfigMaps of one TenantInfo per call.
///
/// A pass reads the parent, creates or updates one child per desired tenant,
/// then deletes owned children whose tenant is gone. Passes hold no state
/// between calls and may be repeated or interleaved across parents freely.
#[derive(Clone)]
pub struct Reconciler {
    parents: Arc<dyn ObjectStore<TenantInfo>>,
    children: Arc<dyn ObjectStore<ConfigMap>>,
}

impl Reconciler {
    pub fn new(
        parents: Arc<dyn ObjectStore<TenantInfo>>,
        children: Arc<dyn ObjectStore<ConfigMap>>,
    ) -> Self {
        Self { parents, children }
    }

    #[instrument(skip_all, fields(ns = %namespace, name = %name))]
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut phase = Phase::Start;
        let res = self.run(namespace, name, cancel, &mut phase).await;
        match &res {
            Ok(report) if report.parent_gone => {}
            Ok(report) => info!(
                created = report.children.created,
                updated = report.children.updated,
                unchanged = report.children.unchanged,
                deleted = report.deleted,
                "reconcile: done"
            ),
            Err(e) => warn!(%phase, error = %e, "reconcile: aborted"),
        }
        res
    }

    async fn run(
        &self,
        namespace: &str,
        name: &str,
        cancel: &CancellationToken,
        phase: &mut Phase,
    ) -> Result<ReconcileReport, ReconcileError> {
        let fetched = guard(cancel, "get parent", self.parents.get(namespace, name))
            .await
            .inspect_err(|e| error!(error = %e, "failed to get TenantInfo"))?;
        let Some(parent) = fetched else {
            // Children go away with the parent through owner-reference GC.
            info!("TenantInfo not found; assuming it was deleted");
            return Ok(ReconcileReport::parent_gone());
        };

        let desired = DesiredState::from_tenants(&parent.spec.tenants);
        *phase = Phase::DesiredComputed;

        let children = reconcile_children(
            self.children.as_ref(),
            &parent,
            namespace,
            &desired,
            cancel,
        )
        .await?;
        *phase = Phase::ChildrenReconciled;

        let deleted = match parent.uid() {
            Some(uid) => {
                collect_orphans(
                    self.children.as_ref(),
                    namespace,
                    &uid,
                    &desired,
                    cancel,
                )
                .await?
            }
            None => {
                warn!("TenantInfo has no uid; no children can be owned by it");
                0
            }
        };
        *phase = Phase::OrphansCollected;

        Ok(ReconcileReport {
            phase: Phase::Done,
            parent_gone: false,
            children,
            deleted,
        })
    }
}

pub mod children;
pub mod desired;
pub mod index;
pub mod naming;
pub mod orphans;
pub mod reconcile;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    Client, ResourceExt,
    api::Api,
    runtime::{
        Controller,
        controller::{self, Action},
        watcher::Config,
    },
};
use tenant_store::{StoreError, StoreResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::OperatorConfig;
use crate::crd::TenantInfo;

pub use reconcile::{Phase, ReconcileReport, Reconciler};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cannot set owner reference: {0}")]
    OwnerReference(String),

    #[error("cancelled during {0}")]
    Cancelled(&'static str),

    #[error("reconcile timed out after {0:?}")]
    Timeout(Duration),
}

/// Run one store call, giving up as soon as `cancel` fires.
pub(crate) async fn guard<T, F>(
    cancel: &CancellationToken,
    op: &'static str,
    fut: F,
) -> Result<T, ReconcileError>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled(op)),
        res = fut => res.map_err(ReconcileError::from),
    }
}

#[derive(Clone)]
pub struct ControllerContext {
    pub reconciler: Reconciler,
    pub cfg: OperatorConfig,
    pub shutdown: CancellationToken,
}

/// Watch TenantInfo objects and the ConfigMaps they own, reconciling each
/// parent on change. Returns once the controller shuts down on SIGINT/SIGTERM.
pub async fn run_controller(
    client: Client,
    ctx: ControllerContext,
) -> anyhow::Result<()> {
    let (parents, children): (Api<TenantInfo>, Api<ConfigMap>) =
        match ctx.cfg.watch_namespace() {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client, ns),
            ),
            None => (Api::all(client.clone()), Api::all(client)),
        };
    let concurrency = ctx.cfg.concurrency;

    Controller::new(parents, Config::default())
        .owns(children, Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, Arc::new(ctx))
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(%obj_ref, ?action, "reconciled")
                }
                Err(e) => warn!(error = %e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

async fn reconcile(
    obj: Arc<TenantInfo>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileError> {
    let ns = obj.namespace().unwrap_or_default();
    let name = obj.name_any();
    let cancel = ctx.shutdown.child_token();

    let pass = ctx.reconciler.reconcile(&ns, &name, &cancel);
    within(ctx.cfg.reconcile_timeout(), pass).await?;
    Ok(Action::await_change())
}

/// Bound a whole pass by `limit`; `None` waits indefinitely.
pub(crate) async fn within<T, F>(
    limit: Option<Duration>,
    pass: F,
) -> Result<T, ReconcileError>
where
    F: Future<Output = Result<T, ReconcileError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, pass)
            .await
            .map_err(|_| ReconcileError::Timeout(limit))?,
        None => pass.await,
    }
}

fn error_policy(
    obj: Arc<TenantInfo>,
    error: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let delay = ctx.cfg.error_requeue();
    warn!(
        ns = %obj.namespace().unwrap_or_default(),
        name = %obj.name_any(),
        %error,
        ?delay,
        "requeueing TenantInfo after failed reconcile"
    );
    Action::requeue(delay)
}

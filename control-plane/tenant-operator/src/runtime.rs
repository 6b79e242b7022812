use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::Client;
use tenant_store::k8s::KubeStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    config::OperatorConfig,
    controller::{ControllerContext, Reconciler, index::register_owner_index, run_controller},
    crd::TenantInfo,
};

/// Build the API-server backed stores and register the ownership index.
/// Must complete before the controller starts watching.
pub async fn build_reconciler(
    client: Client,
    cfg: &OperatorConfig,
) -> anyhow::Result<Reconciler> {
    let parents = KubeStore::<TenantInfo>::new(client.clone())
        .with_field_manager(&cfg.field_manager);
    let children =
        KubeStore::<ConfigMap>::new(client).with_field_manager(&cfg.field_manager);
    register_owner_index(&children).await?;
    Ok(Reconciler::new(Arc::new(parents), Arc::new(children)))
}

/// Spawn the Kubernetes controller loop.
pub fn spawn_controller(
    client: Client,
    ctx: ControllerContext,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, ctx).await })
}

/// Cancel `shutdown` on SIGINT or SIGTERM so in-flight store calls unwind.
pub fn spawn_signal_watcher(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        shutdown.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Initialise stores, then run the controller until shutdown.
pub async fn run_all(client: Client, cfg: OperatorConfig) -> anyhow::Result<()> {
    let reconciler = build_reconciler(client.clone(), &cfg).await?;
    let shutdown = CancellationToken::new();
    let signals = spawn_signal_watcher(shutdown.clone());

    let ctx = ControllerContext {
        reconciler,
        cfg,
        shutdown: shutdown.clone(),
    };
    let res = spawn_controller(client, ctx).await;
    shutdown.cancel();
    signals.abort();
    res?
}

// Integration tests require a running Kubernetes cluster with the TenantInfo
// CRD applied (`cargo run --bin crdgen | kubectl apply -f -`). These tests are
// ignored by default.

use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    Client, ResourceExt,
    api::{Api, PostParams},
};
use tenant_operator::controller::Reconciler;
use tenant_operator::controller::index::register_owner_index;
use tenant_operator::crd::{TenantInfo, TenantInfoSpec};
use tenant_store::k8s::KubeStore;
use tokio_util::sync::CancellationToken;

mod common;
use common::{data, tenants, uniq};

struct ParentGuard {
    api: Api<TenantInfo>,
    children: Api<ConfigMap>,
    name: String,
    child_names: Vec<String>,
}

impl Drop for ParentGuard {
    fn drop(&mut self) {
        let api = self.api.clone();
        let children = self.children.clone();
        let name = self.name.clone();
        let child_names = std::mem::take(&mut self.child_names);
        // Best-effort cleanup; GC would remove children eventually anyway.
        tokio::spawn(async move {
            let _ = api.delete(&name, &Default::default()).await;
            for c in child_names {
                let _ = children.delete(&c, &Default::default()).await;
            }
        });
    }
}

async fn reconciler(client: Client) -> Reconciler {
    let parents = KubeStore::<TenantInfo>::new(client.clone())
        .with_field_manager("tenant-operator-it");
    let children = KubeStore::<ConfigMap>::new(client)
        .with_field_manager("tenant-operator-it");
    register_owner_index(&children).await.expect("register index");
    Reconciler::new(Arc::new(parents), Arc::new(children))
}

#[test_log::test(tokio::test)]
#[ignore]
async fn reconciles_children_in_cluster() {
    let client = Client::try_default().await.expect("kube client");
    let ns = "default";
    let name = uniq("tenants-it");
    let parents: Api<TenantInfo> = Api::namespaced(client.clone(), ns);
    let children: Api<ConfigMap> = Api::namespaced(client.clone(), ns);
    let a = uniq("a");
    let b = uniq("b");
    let _guard = ParentGuard {
        api: parents.clone(),
        children: children.clone(),
        name: name.clone(),
        child_names: vec![format!("tenant-{a}-config"), format!("tenant-{b}-config")],
    };

    let spec = TenantInfoSpec {
        tenants: tenants(&[(a.as_str(), "http://a"), (b.as_str(), "http://b")]),
    };
    let created = parents
        .create(&PostParams::default(), &TenantInfo::new(&name, spec))
        .await
        .expect("create TenantInfo");
    let uid = created.uid().expect("uid");

    let r = reconciler(client.clone()).await;
    let cancel = CancellationToken::new();
    let report = r.reconcile(ns, &name, &cancel).await.expect("reconcile #1");
    assert_eq!(report.children.created, 2);

    let cm = children
        .get(&format!("tenant-{a}-config"))
        .await
        .expect("child a");
    assert_eq!(cm.data, Some(data(&a, "http://a")));
    assert_eq!(cm.owner_references()[0].uid, uid);

    // idempotent
    let report = r.reconcile(ns, &name, &cancel).await.expect("reconcile #2");
    assert_eq!(report.writes(), 0);

    // drop tenant b
    let mut current = parents.get(&name).await.expect("get TenantInfo");
    current.spec.tenants.retain(|t| t.tenant_id == a);
    parents
        .replace(&name, &PostParams::default(), &current)
        .await
        .expect("replace TenantInfo");
    let report = r.reconcile(ns, &name, &cancel).await.expect("reconcile #3");
    assert_eq!(report.deleted, 1);
    assert!(
        children
            .get_opt(&format!("tenant-{b}-config"))
            .await
            .expect("get child b")
            .is_none()
    );
}

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use tenant_operator::controller::index::register_owner_index;
use tenant_operator::controller::{ReconcileError, ReconcileReport, Reconciler};
use tenant_operator::crd::{TenantInfo, TenantInfoSpec, TenantSpec};
use tenant_store::ObjectStore;
use tenant_store::memory::MemoryStore;
use tokio_util::sync::CancellationToken;

pub const NS: &str = "tenants";

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn tenants(pairs: &[(&str, &str)]) -> Vec<TenantSpec> {
    pairs
        .iter()
        .map(|(id, url)| TenantSpec::new(id, url))
        .collect()
}

pub fn data(tenant_id: &str, url: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("tenantID".to_string(), tenant_id.to_string()),
        ("webserviceURL".to_string(), url.to_string()),
    ])
}

/// Reconciler wired to in-memory stores with the owner index registered.
pub struct Harness {
    pub parents: MemoryStore<TenantInfo>,
    pub children: MemoryStore<ConfigMap>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub async fn new() -> Self {
        let parents = MemoryStore::<TenantInfo>::new();
        let children = MemoryStore::<ConfigMap>::new();
        register_owner_index(&children)
            .await
            .expect("register owner index");
        let reconciler = Reconciler::new(
            Arc::new(parents.clone()),
            Arc::new(children.clone()),
        );
        Self {
            parents,
            children,
            reconciler,
        }
    }

    pub async fn create_parent(
        &self,
        name: &str,
        tenants: Vec<TenantSpec>,
    ) -> TenantInfo {
        let mut parent = TenantInfo::new(name, TenantInfoSpec { tenants });
        parent.metadata.namespace = Some(NS.to_string());
        self.parents.create(&parent).await.expect("create parent")
    }

    pub async fn set_tenants(&self, name: &str, tenants: Vec<TenantSpec>) {
        let mut parent = self
            .parents
            .get(NS, name)
            .await
            .unwrap()
            .expect("parent exists");
        parent.spec.tenants = tenants;
        self.parents.update(&parent).await.expect("update parent");
    }

    pub async fn reconcile(
        &self,
        name: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        self.reconciler
            .reconcile(NS, name, &CancellationToken::new())
            .await
    }

    /// Names of ConfigMaps in the namespace whose first owner is `uid`.
    pub async fn owned_names(&self, uid: &str) -> Vec<String> {
        self.children
            .list(NS)
            .await
            .unwrap()
            .into_iter()
            .filter(|cm| {
                cm.owner_references().first().map(|r| r.uid.as_str()) == Some(uid)
            })
            .map(|cm| cm.name_any())
            .collect()
    }

    pub async fn child(&self, name: &str) -> Option<ConfigMap> {
        self.children.get(NS, name).await.unwrap()
    }

    pub async fn child_writes(&self) -> usize {
        self.children.writes().await.len()
    }
}

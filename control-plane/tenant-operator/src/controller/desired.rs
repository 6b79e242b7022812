use std::collections::BTreeMap;

use crate::crd::TenantSpec;

use super::naming::child_name;

pub const KEY_TENANT_ID: &str = "tenantID";
pub const KEY_WEBSERVICE_URL: &str = "webserviceURL";

/// Expected contents of one tenant ConfigMap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredChild {
    pub tenant_id: String,
    pub name: String,
    pub data: BTreeMap<String, String>,
}

impl DesiredChild {
    fn from_tenant(t: &TenantSpec) -> Self {
        Self {
            tenant_id: t.tenant_id.clone(),
            name: child_name(&t.tenant_id),
            data: BTreeMap::from([
                (KEY_TENANT_ID.to_string(), t.tenant_id.clone()),
                (KEY_WEBSERVICE_URL.to_string(), t.webservice_url.clone()),
            ]),
        }
    }
}

/// Children a parent should have, keyed by tenant ID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DesiredState {
    children: BTreeMap<String, DesiredChild>,
}

impl DesiredState {
    /// Later entries for the same tenant ID replace earlier ones.
    pub fn from_tenants(tenants: &[TenantSpec]) -> Self {
        let mut children = BTreeMap::new();
        for t in tenants {
            children.insert(t.tenant_id.clone(), DesiredChild::from_tenant(t));
        }
        Self { children }
    }

    pub fn contains_tenant(&self, tenant_id: &str) -> bool {
        self.children.contains_key(tenant_id)
    }

    /// Children in tenant ID order.
    pub fn children(&self) -> impl Iterator<Item = &DesiredChild> {
        self.children.values()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

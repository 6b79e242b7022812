use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const API_GROUP: &str = "multitenancy-management.example.com";

/// Desired tenant set for one namespace. Each tenant gets a ConfigMap named
/// `tenant-<tenantID>-config` owned by this object.
#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema,
)]
#[kube(
    group = "multitenancy-management.example.com",
    version = "v1",
    kind = "TenantInfo",
    plural = "tenantinfoes",
    shortname = "ti",
    namespaced
)]
pub struct TenantInfoSpec {
    /// Ordered tenant list; a repeated tenantID overrides earlier entries.
    #[serde(default)]
    pub tenants: Vec<TenantSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct TenantSpec {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "webserviceURL")]
    pub webservice_url: String,
}

impl TenantSpec {
    pub fn new(tenant_id: &str, webservice_url: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            webservice_url: webservice_url.to_string(),
        }
    }
}

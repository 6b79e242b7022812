use std::time::Duration;

use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Restrict watches to a single namespace; all namespaces when unset.
    /// Env: TENANT_OPERATOR_WATCH_NAMESPACE
    #[envconfig(from = "TENANT_OPERATOR_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Delay before an aborted pass is retried.
    #[envconfig(from = "TENANT_OPERATOR_ERROR_REQUEUE_SECS", default = "30")]
    pub error_requeue_secs: u64,

    /// Upper bound on a single reconciliation pass.
    #[envconfig(from = "TENANT_OPERATOR_RECONCILE_TIMEOUT_SECS", default = "30")]
    pub reconcile_timeout_secs: u64,

    /// Max parents reconciled in parallel; 0 means unbounded.
    #[envconfig(from = "TENANT_OPERATOR_CONCURRENCY", default = "4")]
    pub concurrency: u16,

    #[envconfig(from = "TENANT_OPERATOR_FIELD_MANAGER", default = "tenant-operator")]
    pub field_manager: String,
}

impl OperatorConfig {
    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    /// `None` disables the per-pass timeout.
    pub fn reconcile_timeout(&self) -> Option<Duration> {
        (self.reconcile_timeout_secs > 0)
            .then(|| Duration::from_secs(self.reconcile_timeout_secs))
    }

    pub fn watch_namespace(&self) -> Option<&str> {
        self.watch_namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}

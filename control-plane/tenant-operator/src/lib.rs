pub mod config;
pub mod controller;
pub mod crd;
pub mod runtime;

use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Install the global subscriber. `RUST_LOG` wins; `default_directive` only
/// applies when it is unset.
pub fn init_tracing(default_directive: &str) {
    let directive = default_directive
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .try_init();
}

pub mod tenant_info;

pub use tenant_info::*;

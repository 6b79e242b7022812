pub mod error;
pub mod index;
pub mod k8s;
pub mod object;
pub mod traits;

#[cfg(feature = "memory")]
pub mod memory;

pub use error::*;
pub use index::*;
pub use object::*;
pub use traits::*;

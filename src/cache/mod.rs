//! Caches that persist derived artifacts across solves of the same field.

pub mod matrix_cache;
pub mod preconditioner_cache;
pub mod registry;

pub use matrix_cache::{CacheStats, MatrixAction, MatrixCache, Prepared};
pub use preconditioner_cache::{PreconditionerCache, SharedPreconditioner};
pub use registry::Registry;

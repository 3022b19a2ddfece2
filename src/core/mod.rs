//! Core traits, compute backends and device-resident vectors.

pub mod executor;
pub mod kernels;
pub mod traits;
pub mod vector;

pub use executor::{Executor, ExecutorHandler, ExecutorKind};
pub use traits::{InnerProduct, MatVec, Scalar, safe_div};
pub use vector::DeviceVector;

//! ldubridge: LDU-addressed finite-volume matrices on sparse Krylov solvers
//!
//! This crate converts matrices stored in the lower/diagonal/upper layout of a
//! finite-volume mesh into sorted sparse storage, solves them with CG, BiCGStab or
//! iterative refinement, and caches the derived artifacts (sort permutation,
//! assembled matrix, preconditioner, initial guesses) across the solves of a
//! time-stepping run.

pub mod cache;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use cache::*;
pub use config::*;
pub use context::*;
pub use self::core::*;
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use solver::*;
pub use utils::*;

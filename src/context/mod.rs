//! Context module for ldubridge.
//!
//! The solve context composes the caches, the convergence criterion and the solver
//! factory into one object that lives for a whole simulation run.
//!
//! Modules:
//! - [`ldu_context`]: the `LduSolveContext` orchestrator and the `SolverPerformance` record.

pub mod ldu_context;
pub use ldu_context::{LduSolveContext, SolverPerformance};

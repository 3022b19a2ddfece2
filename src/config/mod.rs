//! Solver configuration.

pub mod options;

pub use options::{ResolvedControls, SolveFlags, SolverControls, Switch};

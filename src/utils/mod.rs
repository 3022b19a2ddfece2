//! Convergence criteria, timing and export helpers.

pub mod convergence;
pub mod export;
pub mod timing;

pub use convergence::{
    CriterionFactory, CriterionParams, CriterionStatus, IterationObserver, ReductionCriterion, ResidualCriterion,
    SolveStats, StoppingCriterion,
};
pub use timing::timed;

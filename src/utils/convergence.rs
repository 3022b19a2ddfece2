//! Convergence tracking & tolerance checks for iterative solvers.
//!
//! Solvers call [`StoppingCriterion::check`] once per iteration with the current
//! residual vector, starting with the initial residual at iteration 0. The criterion
//! owns the iteration counter and the residual history a solve needs to report, and
//! hands them back as a [`SolveStats`] value when the solver finishes.
//!
//! [`ResidualCriterion`] reproduces the finite-volume convention used for the outer
//! solve: the residual norm is the L1 norm of the residual divided by a
//! normalisation factor, checked against an absolute and an optional relative
//! tolerance, gated by a minimum iteration count and capped by a maximum.
//!
//! [`ReductionCriterion`] is the plain `‖r‖₂ ≤ factor · ‖r₀‖₂` test used by inner
//! solvers.

use crate::core::executor::Executor;
use crate::core::traits::{InnerProduct, Scalar};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a criterion within one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionStatus {
    /// Still iterating
    Iterating,
    /// A tolerance was met
    Converged,
    /// The maximum iteration count was reached
    MaxedOut,
}

impl CriterionStatus {
    pub fn is_finished(self) -> bool {
        self != CriterionStatus::Iterating
    }
}

/// Outcome of a solve, reported by its criterion.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub status: CriterionStatus,
}

impl SolveStats {
    pub fn converged(&self) -> bool {
        self.status == CriterionStatus::Converged
    }
}

/// Decides after each iteration whether a solver stops.
pub trait StoppingCriterion<T> {
    /// Evaluate the residual of the current iteration. Returns `true` once a
    /// terminal state is reached.
    fn check(&mut self, exec: &Executor, residual: &[T]) -> bool;
    /// Iterations completed, initial/final residual and status so far.
    fn stats(&self) -> SolveStats;
}

/// Callback invoked once per evaluation with `(iteration, residual_norm)`.
pub type IterationObserver = Arc<dyn Fn(usize, f64) + Send + Sync>;

/// Tolerances and bounds of a [`ResidualCriterion`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CriterionParams {
    pub absolute_tolerance: f64,
    /// `0` disables the relative test.
    pub relative_tolerance: f64,
    pub norm_factor: f64,
    pub min_iter: usize,
    pub max_iter: usize,
}

impl Default for CriterionParams {
    fn default() -> Self {
        Self {
            absolute_tolerance: 1e-6,
            relative_tolerance: 1e-6,
            norm_factor: 1.0,
            min_iter: 0,
            max_iter: 1000,
        }
    }
}

/// Builds a fresh [`ResidualCriterion`] for every solver application.
#[derive(Clone, Default)]
pub struct CriterionFactory {
    pub params: CriterionParams,
    observer: Option<IterationObserver>,
}

impl CriterionFactory {
    pub fn new(params: CriterionParams) -> Self {
        Self { params, observer: None }
    }

    pub fn with_observer(mut self, observer: IterationObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Same criterion with the iteration bound multiplied by `factor`.
    pub fn scale_max_iter(mut self, factor: usize) -> Self {
        self.params.max_iter *= factor;
        self
    }

    pub fn create<T: Scalar>(&self) -> ResidualCriterion<T> {
        let mut c = ResidualCriterion::new(self.params);
        c.observer = self.observer.clone();
        c
    }
}

impl fmt::Debug for CriterionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriterionFactory")
            .field("params", &self.params)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Normalised L1 residual criterion.
pub struct ResidualCriterion<T> {
    params: CriterionParams,
    iter: usize,
    init_residual: f64,
    residual_norm: f64,
    status: CriterionStatus,
    // all-ones vector, built on the first evaluation
    unit: Option<Vec<T>>,
    abs: Vec<T>,
    observer: Option<IterationObserver>,
}

impl<T: Scalar> ResidualCriterion<T> {
    pub fn new(params: CriterionParams) -> Self {
        Self {
            params,
            iter: 0,
            init_residual: 0.0,
            residual_norm: 0.0,
            status: CriterionStatus::Iterating,
            unit: None,
            abs: Vec::new(),
            observer: None,
        }
    }

    pub fn status(&self) -> CriterionStatus {
        self.status
    }

    pub fn residual_norm(&self) -> f64 {
        self.residual_norm
    }

    pub fn init_residual(&self) -> f64 {
        self.init_residual
    }

    fn normalised_norm(&mut self, exec: &Executor, residual: &[T]) -> f64 {
        let n = residual.len();
        let unit = self.unit.get_or_insert_with(|| vec![T::one(); n]);
        self.abs.clear();
        self.abs.extend(residual.iter().map(|r| r.abs()));
        let l1 = exec.dot(&self.abs, unit).to_f64().unwrap_or(f64::NAN);
        l1 / self.params.norm_factor
    }
}

impl<T: Scalar> StoppingCriterion<T> for ResidualCriterion<T> {
    fn check(&mut self, exec: &Executor, residual: &[T]) -> bool {
        let residual_norm = self.normalised_norm(exec, residual);
        self.residual_norm = residual_norm;
        if self.iter == 0 {
            self.init_residual = residual_norm;
        }

        let p = &self.params;
        if self.iter == p.max_iter {
            self.status = CriterionStatus::MaxedOut;
        } else if self.iter > p.min_iter {
            let absolute = residual_norm < p.absolute_tolerance;
            let relative = p.relative_tolerance > 0.0
                && residual_norm < p.relative_tolerance * self.init_residual;
            if absolute || relative {
                self.status = CriterionStatus::Converged;
            }
        }

        log::trace!("iteration {}: normalised residual = {:.6e}", self.iter, residual_norm);
        if let Some(observer) = &self.observer {
            observer(self.iter, residual_norm);
        }
        self.iter += 1;
        self.status.is_finished()
    }

    fn stats(&self) -> SolveStats {
        SolveStats {
            iterations: self.iter.saturating_sub(1),
            initial_residual: self.init_residual,
            final_residual: self.residual_norm,
            status: self.status,
        }
    }
}

/// Stops once `‖r‖₂ ≤ factor · ‖r₀‖₂` or after `max_iter` iterations.
#[derive(Debug, Clone)]
pub struct ReductionCriterion {
    factor: f64,
    max_iter: usize,
    iter: usize,
    init_residual: f64,
    residual_norm: f64,
    status: CriterionStatus,
}

impl ReductionCriterion {
    pub fn new(factor: f64, max_iter: usize) -> Self {
        Self {
            factor,
            max_iter,
            iter: 0,
            init_residual: 0.0,
            residual_norm: 0.0,
            status: CriterionStatus::Iterating,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> for ReductionCriterion {
    fn check(&mut self, exec: &Executor, residual: &[T]) -> bool {
        let norm = exec.norm(residual).to_f64().unwrap_or(f64::NAN);
        self.residual_norm = norm;
        if self.iter == 0 {
            self.init_residual = norm;
        }
        if norm <= self.factor * self.init_residual {
            self.status = CriterionStatus::Converged;
        } else if self.iter >= self.max_iter {
            self.status = CriterionStatus::MaxedOut;
        }
        self.iter += 1;
        self.status.is_finished()
    }

    fn stats(&self) -> SolveStats {
        SolveStats {
            iterations: self.iter.saturating_sub(1),
            initial_residual: self.init_residual,
            final_residual: self.residual_norm,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn params(tol: f64, rel: f64, min_iter: usize, max_iter: usize) -> CriterionParams {
        CriterionParams {
            absolute_tolerance: tol,
            relative_tolerance: rel,
            norm_factor: 1.0,
            min_iter,
            max_iter,
        }
    }

    #[test]
    fn residual_norm_is_normalised_l1() {
        let mut c = ResidualCriterion::<f64>::new(CriterionParams { norm_factor: 2.0, ..params(0.0, 0.0, 0, 10) });
        c.check(&Executor::reference(), &[1.0, -3.0, 0.5]);
        assert_eq!(c.residual_norm(), 2.25);
        assert_eq!(c.init_residual(), 2.25);
    }

    #[test]
    fn relative_tolerance_uses_first_residual() {
        let exec = Executor::reference();
        let mut c = ResidualCriterion::<f64>::new(params(0.0, 0.1, 0, 100));
        assert!(!c.check(&exec, &[10.0]));
        assert!(!c.check(&exec, &[1.5]));
        assert!(c.check(&exec, &[0.9]));
        let s = StoppingCriterion::<f64>::stats(&c);
        assert_eq!(s.iterations, 2);
        assert_eq!(s.initial_residual, 10.0);
        assert_eq!(s.final_residual, 0.9);
        assert!(s.converged());
    }

    #[test]
    fn zero_relative_tolerance_disables_relative_test() {
        let exec = Executor::reference();
        let mut c = ResidualCriterion::<f64>::new(params(1e-12, 0.0, 0, 3));
        assert!(!c.check(&exec, &[10.0]));
        assert!(!c.check(&exec, &[1e-3]));
        assert!(!c.check(&exec, &[1e-6]));
        assert!(c.check(&exec, &[1e-9]));
        assert_eq!(c.status(), CriterionStatus::MaxedOut);
    }

    #[test]
    fn observer_sees_every_evaluation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let factory = CriterionFactory::new(params(0.0, 0.0, 0, 2))
            .with_observer(Arc::new(move |i, r| sink.lock().unwrap().push((i, r))));
        let mut c = factory.create::<f64>();
        let exec = Executor::reference();
        while !c.check(&exec, &[1.0, 1.0]) {}
        assert_eq!(*seen.lock().unwrap(), vec![(0, 2.0), (1, 2.0), (2, 2.0)]);
    }

    #[test]
    fn scaled_bound_doubles_max_iter() {
        let f = CriterionFactory::new(params(0.0, 0.0, 0, 7)).scale_max_iter(2);
        assert_eq!(f.params.max_iter, 14);
    }

    #[test]
    fn reduction_criterion() {
        let exec = Executor::reference();
        let mut c = ReductionCriterion::new(0.1, 50);
        assert!(!StoppingCriterion::<f64>::check(&mut c, &exec, &[3.0, 4.0]));
        assert!(!StoppingCriterion::<f64>::check(&mut c, &exec, &[1.0, 0.0]));
        assert!(StoppingCriterion::<f64>::check(&mut c, &exec, &[0.3, 0.4]));
        assert_eq!(StoppingCriterion::<f64>::stats(&c).iterations, 2);
    }
}

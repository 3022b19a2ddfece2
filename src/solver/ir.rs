//! Iterative refinement.
//!
//! Each outer iteration solves the residual equation `A d = r` approximately with
//! an inner method, applies the correction `x ← x + d` and recomputes `r = b − A x`.
//! The outer stopping criterion is evaluated on every recomputed residual. The inner
//! method is either an unpreconditioned CG stopped once the residual has dropped by
//! a fixed reduction factor, or a single block-Jacobi application.

use crate::core::executor::Executor;
use crate::core::traits::MatVec;
use crate::error::LduError;
use crate::preconditioner::{BlockJacobi, Preconditioner};
use crate::solver::LinearSolver;
use crate::solver::cg::CgSolver;
use crate::utils::convergence::{ReductionCriterion, SolveStats, StoppingCriterion};

/// Inner correction step of an [`IrSolver`].
pub enum InnerStep {
    /// CG on the residual equation, stopped at `‖r‖ ≤ reduction_factor · ‖r₀‖`.
    Cg { reduction_factor: f64 },
    /// `d = M⁻¹ r` with a block-Jacobi `M`.
    Jacobi(BlockJacobi),
}

pub struct IrSolver {
    exec: Executor,
    inner: InnerStep,
}

impl IrSolver {
    pub fn new(exec: &Executor, inner: InnerStep) -> Self {
        Self { exec: exec.clone(), inner }
    }

    fn correction<M: MatVec<f64> + ?Sized>(&self, a: &M, r: &[f64], d: &mut [f64]) -> Result<(), LduError> {
        match &self.inner {
            InnerStep::Cg { reduction_factor } => {
                d.iter_mut().for_each(|di| *di = 0.0);
                // CG terminates in at most n steps in exact arithmetic
                let mut stop = ReductionCriterion::new(*reduction_factor, r.len().max(1));
                CgSolver::new(&self.exec).solve(a, None, &mut stop, r, d)?;
                Ok(())
            }
            InnerStep::Jacobi(bj) => bj.apply(r, d),
        }
    }
}

impl<M> LinearSolver<M, f64> for IrSolver
where
    M: MatVec<f64> + ?Sized,
{
    /// The outer preconditioner is not used; the inner step provides the smoothing.
    fn solve(
        &mut self,
        a: &M,
        _pc: Option<&dyn Preconditioner<f64>>,
        criterion: &mut dyn StoppingCriterion<f64>,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveStats, LduError> {
        LduError::check_len(b.len(), x.len())?;
        let exec = &self.exec;
        let mut r = vec![0.0; b.len()];
        let mut d = vec![0.0; b.len()];
        exec.residual(a, b, x, &mut r);
        while !criterion.check(exec, &r) {
            self.correction(a, &r, &mut d)?;
            exec.axpy(1.0, &d, x);
            exec.residual(a, b, x, &mut r);
        }
        Ok(criterion.stats())
    }
}

//! Krylov solver interfaces and the factory pipeline used by the solve context.
//!
//! A solve follows three steps:
//!
//! 1. [`SolverKind::build`] binds an executor, a criterion factory and an optional
//!    preconditioner into a [`SolverFactory`];
//! 2. [`SolverFactory::generate`] binds the factory to an assembled matrix;
//! 3. [`Solver::apply`] runs the method from an initial guess until the criterion
//!    reaches a terminal state.

use crate::core::executor::Executor;
use crate::error::LduError;
use crate::matrix::device::DeviceMatrix;
use crate::preconditioner::{BlockJacobi, Preconditioner};
use crate::utils::convergence::{CriterionFactory, SolveStats, StoppingCriterion};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Common interface for the iterative methods.
pub trait LinearSolver<M: ?Sized, T> {
    /// Solve A·x = b, writing result into `x`.
    /// `x` holds the initial guess on entry.
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<T>>,
        criterion: &mut dyn StoppingCriterion<T>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, LduError>;
}

pub mod bicgstab;
pub mod cg;
pub mod ir;

pub use bicgstab::BiCgStabSolver;
pub use cg::CgSolver;
pub use ir::{InnerStep, IrSolver};

/// Krylov method selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Conjugate Gradient (SPD matrices)
    Cg,
    /// BiConjugate Gradient Stabilized
    BiCgStab,
    /// Iterative refinement
    Ir,
}

impl SolverKind {
    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Cg => "CG",
            SolverKind::BiCgStab => "BiCGStab",
            SolverKind::Ir => "IR",
        }
    }

    /// Bind executor, stopping criterion and preconditioner into a factory.
    ///
    /// BiCGStab evaluates its criterion twice per iteration, so its iteration
    /// bound is doubled here.
    pub fn build(
        self,
        exec: &Executor,
        criteria: CriterionFactory,
        preconditioner: Option<Arc<dyn Preconditioner<f64>>>,
    ) -> SolverFactory {
        let criteria = match self {
            SolverKind::BiCgStab => criteria.scale_max_iter(2),
            _ => criteria,
        };
        SolverFactory {
            kind: self,
            exec: exec.clone(),
            criteria,
            preconditioner,
            inner: InnerSolverKind::Cg,
            inner_reduction_factor: 1e-2,
            max_block_size: 16,
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = LduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CG" | "cg" | "GKOCG" => Ok(SolverKind::Cg),
            "BiCGStab" | "bicgstab" | "GKOBiCGStab" => Ok(SolverKind::BiCgStab),
            "IR" | "ir" | "GKOIR" => Ok(SolverKind::Ir),
            other => Err(LduError::config(format!(
                "unknown solver '{other}' (expected CG, BiCGStab or IR)"
            ))),
        }
    }
}

/// Inner method of iterative refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerSolverKind {
    Cg,
    ScalarJacobi,
}

impl FromStr for InnerSolverKind {
    type Err = LduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CG" | "cg" => Ok(InnerSolverKind::Cg),
            "scalarJacobi" => Ok(InnerSolverKind::ScalarJacobi),
            other => Err(LduError::config(format!(
                "unknown inner solver '{other}' (expected CG or scalarJacobi)"
            ))),
        }
    }
}

/// A method bound to its executor, criterion and preconditioner.
pub struct SolverFactory {
    kind: SolverKind,
    exec: Executor,
    criteria: CriterionFactory,
    preconditioner: Option<Arc<dyn Preconditioner<f64>>>,
    inner: InnerSolverKind,
    inner_reduction_factor: f64,
    max_block_size: usize,
}

impl SolverFactory {
    /// Configure the inner method used by iterative refinement.
    pub fn with_inner(mut self, inner: InnerSolverKind, reduction_factor: f64, max_block_size: usize) -> Self {
        self.inner = inner;
        self.inner_reduction_factor = reduction_factor;
        self.max_block_size = max_block_size;
        self
    }

    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    pub fn criteria(&self) -> &CriterionFactory {
        &self.criteria
    }

    /// Bind the factory to `matrix`.
    pub fn generate<'a>(&'a self, matrix: &'a DeviceMatrix) -> Result<Solver<'a>, LduError> {
        let method = match self.kind {
            SolverKind::Cg => Method::Cg(CgSolver::new(&self.exec)),
            SolverKind::BiCgStab => Method::BiCgStab(BiCgStabSolver::new(&self.exec)),
            SolverKind::Ir => {
                let inner = match self.inner {
                    InnerSolverKind::Cg => InnerStep::Cg { reduction_factor: self.inner_reduction_factor },
                    InnerSolverKind::ScalarJacobi => {
                        InnerStep::Jacobi(BlockJacobi::generate(matrix, self.max_block_size)?)
                    }
                };
                Method::Ir(IrSolver::new(&self.exec, inner))
            }
        };
        Ok(Solver { factory: self, matrix, method })
    }
}

enum Method {
    Cg(CgSolver),
    BiCgStab(BiCgStabSolver),
    Ir(IrSolver),
}

/// A generated solver, ready to run against its matrix.
pub struct Solver<'a> {
    factory: &'a SolverFactory,
    matrix: &'a DeviceMatrix,
    method: Method,
}

impl Solver<'_> {
    /// Solve `A x = b` from the guess in `x`, with a fresh criterion instance.
    pub fn apply(&mut self, b: &[f64], x: &mut [f64]) -> Result<SolveStats, LduError> {
        LduError::check_len(self.matrix.nrows(), b.len())?;
        let mut criterion = self.factory.criteria.create::<f64>();
        let pc = self.factory.preconditioner.as_deref();
        let a = self.matrix;
        match &mut self.method {
            Method::Cg(s) => s.solve(a, pc, &mut criterion, b, x),
            Method::BiCgStab(s) => s.solve(a, pc, &mut criterion, b, x),
            Method::Ir(s) => s.solve(a, pc, &mut criterion, b, x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::convergence::CriterionParams;

    #[test]
    fn parses_solver_names() {
        assert_eq!("GKOCG".parse::<SolverKind>().unwrap(), SolverKind::Cg);
        assert_eq!("BiCGStab".parse::<SolverKind>().unwrap(), SolverKind::BiCgStab);
        assert_eq!("IR".parse::<SolverKind>().unwrap(), SolverKind::Ir);
        assert!(matches!("GMRES".parse::<SolverKind>(), Err(LduError::Config(_))));
        assert_eq!("scalarJacobi".parse::<InnerSolverKind>().unwrap(), InnerSolverKind::ScalarJacobi);
        assert!("Jacobi".parse::<InnerSolverKind>().is_err());
    }

    #[test]
    fn bicgstab_doubles_iteration_bound() {
        let criteria = CriterionFactory::new(CriterionParams { max_iter: 50, ..Default::default() });
        let exec = Executor::reference();
        assert_eq!(SolverKind::Cg.build(&exec, criteria.clone(), None).criteria().params.max_iter, 50);
        assert_eq!(SolverKind::BiCgStab.build(&exec, criteria, None).criteria().params.max_iter, 100);
    }
}

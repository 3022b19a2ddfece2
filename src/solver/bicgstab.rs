//! Right-preconditioned BiCGStab solver (Saad §7.4.2)
//!
//! The stopping criterion is evaluated twice per iteration: on the intermediate
//! residual `s` after the BiCG half-step and on the new residual `r` after the
//! stabilising half-step. Callers that want a bound of `k` full iterations should
//! allow `2k` criterion evaluations.

use crate::core::executor::Executor;
use crate::core::traits::{InnerProduct, MatVec, Scalar, safe_div};
use crate::error::LduError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::solver::cg::precondition;
use crate::utils::convergence::{SolveStats, StoppingCriterion};

pub struct BiCgStabSolver {
    exec: Executor,
}

impl BiCgStabSolver {
    pub fn new(exec: &Executor) -> Self {
        Self { exec: exec.clone() }
    }
}

impl<M, T> LinearSolver<M, T> for BiCgStabSolver
where
    M: MatVec<T> + ?Sized,
    T: Scalar,
{
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<T>>,
        criterion: &mut dyn StoppingCriterion<T>,
        b: &[T],
        x: &mut [T],
    ) -> Result<SolveStats, LduError> {
        LduError::check_len(b.len(), x.len())?;
        let exec = &self.exec;
        let n = b.len();
        let mut r = vec![T::zero(); n];
        exec.residual(a, b, x, &mut r);
        if criterion.check(exec, &r) {
            return Ok(criterion.stats());
        }

        let r_hat = r.clone(); // shadow residual
        let (mut rho_prev, mut alpha, mut omega) = (T::one(), T::one(), T::one());
        let mut p = vec![T::zero(); n];
        let mut v = vec![T::zero(); n];
        let mut y = vec![T::zero(); n];
        let mut s = vec![T::zero(); n];
        let mut z = vec![T::zero(); n];
        let mut t = vec![T::zero(); n];

        loop {
            let rho = exec.dot(&r_hat, &r);
            let beta = safe_div(rho, rho_prev) * safe_div(alpha, omega);
            // p = r + beta * (p - omega * v)
            exec.axpy(-omega, &v, &mut p);
            exec.aypx(beta, &r, &mut p);

            precondition(pc, &p, &mut y)?;
            a.matvec(&y, &mut v);
            alpha = safe_div(rho, exec.dot(&r_hat, &v));

            // s = r - alpha * v
            s.copy_from_slice(&r);
            exec.axpy(-alpha, &v, &mut s);
            exec.axpy(alpha, &y, x);
            if criterion.check(exec, &s) {
                break;
            }

            precondition(pc, &s, &mut z)?;
            a.matvec(&z, &mut t);
            omega = safe_div(exec.dot(&t, &s), exec.dot(&t, &t));
            exec.axpy(omega, &z, x);

            // r = s - omega * t
            r.copy_from_slice(&s);
            exec.axpy(-omega, &t, &mut r);
            if criterion.check(exec, &r) {
                break;
            }
            rho_prev = rho;
        }
        Ok(criterion.stats())
    }
}

//! Preconditioned Conjugate Gradient per Saad §9.2.

use crate::core::executor::Executor;
use crate::core::traits::{InnerProduct, MatVec, Scalar, safe_div};
use crate::error::LduError;
use crate::preconditioner::Preconditioner;
use crate::solver::LinearSolver;
use crate::utils::convergence::{SolveStats, StoppingCriterion};

pub struct CgSolver {
    exec: Executor,
}

impl CgSolver {
    pub fn new(exec: &Executor) -> Self {
        Self { exec: exec.clone() }
    }
}

pub(crate) fn precondition<T: Scalar>(pc: Option<&dyn Preconditioner<T>>, r: &[T], z: &mut [T]) -> Result<(), LduError> {
    match pc {
        Some(pc) => pc.apply(r, z),
        None => {
            z.copy_from_slice(r);
            Ok(())
        }
    }
}

impl<M, T> LinearSolver<M, T> for CgSolver
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

        let mut z = vec![T::zero(); n];
        precondition(pc, &r, &mut z)?;
        let mut p = z.clone();
        let mut q = vec![T::zero(); n];
        let mut rz = exec.dot(&r, &z);

        loop {
            a.matvec(&p, &mut q);
            let alpha = safe_div(rz, exec.dot(&p, &q));
            exec.axpy(alpha, &p, x);
            exec.axpy(-alpha, &q, &mut r);
            if criterion.check(exec, &r) {
                break;
            }
            precondition(pc, &r, &mut z)?;
            let rz_new = exec.dot(&r, &z);
            let beta = safe_div(rz_new, rz);
            exec.aypx(beta, &z, &mut p);
            rz = rz_new;
        }
        Ok(criterion.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::convergence::{CriterionParams, ResidualCriterion};

    // Simple dense matrix type for testing
    struct DenseMat {
        data: Vec<Vec<f64>>,
    }
    impl MatVec<f64> for DenseMat {
        fn matvec(&self, x: &[f64], y: &mut [f64]) {
            for (i, row) in self.data.iter().enumerate() {
                y[i] = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            }
        }
    }

    fn criterion(tol: f64, max_iter: usize) -> ResidualCriterion<f64> {
        ResidualCriterion::new(CriterionParams {
            absolute_tolerance: tol,
            relative_tolerance: 0.0,
            norm_factor: 1.0,
            min_iter: 0,
            max_iter,
        })
    }

    #[test]
    fn cg_solves_simple_spd() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::new(&Executor::reference());
        let stats = solver.solve(&a, None, &mut criterion(1e-10, 20), &b, &mut x).unwrap();
        let expected = vec![0.09090909090909091, 0.6363636363636364];
        let tol = 1e-8;
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < tol, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged(), "CG did not converge");
        assert!(stats.iterations <= 2);
    }

    #[test]
    fn cg_solves_spd() {
        // Symmetric positive definite system
        // A = [[4,1,0],[1,3,1],[0,1,2]]
        // x_true = [1,2,3]
        let a = DenseMat {
            data: vec![vec![4.0, 1.0, 0.0], vec![1.0, 3.0, 1.0], vec![0.0, 1.0, 2.0]],
        };
        let x_true = vec![1.0, 2.0, 3.0];
        let mut b = vec![0.0; 3];
        a.matvec(&x_true, &mut b);
        let mut x = vec![0.0; 3];
        let mut solver = CgSolver::new(&Executor::reference());
        let stats = solver.solve(&a, None, &mut criterion(1e-10, 100), &b, &mut x).unwrap();
        let mut r_final = vec![0.0; 3];
        a.matvec(&x, &mut r_final);
        let res_norm = r_final
            .iter()
            .zip(&b)
            .map(|(ax, bi)| (bi - ax) * (bi - ax))
            .sum::<f64>()
            .sqrt();
        assert!(res_norm <= 1e-8, "final residual = {:.6}", res_norm);
        assert!(stats.converged(), "CG did not converge");
    }

    #[test]
    fn exact_initial_guess_stops_immediately() {
        let a = DenseMat { data: vec![vec![2.0, 0.0], vec![0.0, 2.0]] };
        let mut x = vec![1.0, 1.0];
        let mut solver = CgSolver::new(&Executor::reference());
        let mut c = criterion(1e-12, 10);
        let stats = solver.solve(&a, None, &mut c, &[2.0, 2.0], &mut x).unwrap();
        // iteration 0 never converges, so a single zero step is taken
        assert_eq!(x, vec![1.0, 1.0]);
        assert!(stats.converged());
        assert_eq!(stats.iterations, 1);
    }
}

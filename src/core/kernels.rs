//! Vector kernels dispatched on an [`Executor`].
//!
//! The reference backend evaluates every kernel serially. The omp backend runs the
//! same kernels with rayon parallel iterators inside the executor's own thread pool,
//! so parallel work never lands on the global rayon pool.
//!
//! # References
//! - [rayon crate documentation](https://docs.rs/rayon)
//! - [num-traits crate documentation](https://docs.rs/num-traits)

use crate::core::executor::Executor;
use crate::core::traits::{InnerProduct, MatVec, Scalar};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

impl<T: Scalar> InnerProduct<T> for Executor {
    /// Computes `x^T y`.
    fn dot(&self, x: &[T], y: &[T]) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                return pool.install(|| {
                    x.par_iter()
                        .zip(y.par_iter())
                        .map(|(xi, yi)| *xi * *yi)
                        .reduce(|| T::zero(), |acc, v| acc + v)
                });
            }
        }
        x.iter()
            .zip(y.iter())
            .fold(T::zero(), |acc, (xi, yi)| acc + *xi * *yi)
    }

    /// Computes `||x||_2`.
    fn norm(&self, x: &[T]) -> T {
        self.dot(x, x).sqrt()
    }
}

impl Executor {
    /// y ← y + alpha · x
    pub fn axpy<T: Scalar>(&self, alpha: T, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                pool.install(|| {
                    y.par_iter_mut()
                        .zip(x.par_iter())
                        .for_each(|(yi, xi)| *yi = *yi + alpha * *xi)
                });
                return;
            }
        }
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi = *yi + alpha * *xi;
        }
    }

    /// y ← x + beta · y
    pub fn aypx<T: Scalar>(&self, beta: T, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                pool.install(|| {
                    y.par_iter_mut()
                        .zip(x.par_iter())
                        .for_each(|(yi, xi)| *yi = *xi + beta * *yi)
                });
                return;
            }
        }
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi = *xi + beta * *yi;
        }
    }

    /// r ← b − A x
    pub fn residual<T: Scalar, M: MatVec<T> + ?Sized>(&self, a: &M, b: &[T], x: &[T], r: &mut [T]) {
        a.matvec(x, r);
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                pool.install(|| {
                    r.par_iter_mut()
                        .zip(b.par_iter())
                        .for_each(|(ri, bi)| *ri = *bi - *ri)
                });
                return;
            }
        }
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = *bi - *ri;
        }
    }

    /// Fill `y[i] = f(i)` for every row, in parallel when the backend allows it.
    pub fn for_each_row<T: Scalar, F>(&self, y: &mut [T], f: F)
    where
        F: Fn(usize) -> T + Send + Sync,
    {
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                pool.install(|| y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = f(i)));
                return;
            }
        }
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = f(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::ExecutorKind;
    use approx::assert_abs_diff_eq;

    fn executors() -> Vec<Executor> {
        vec![Executor::reference(), Executor::select(ExecutorKind::Omp, 2)]
    }

    #[test]
    fn dot_and_norm_agree_across_backends() {
        let x = vec![1.0, -2.0, 3.0, -4.0];
        let y = vec![4.0, 5.0, -6.0, 0.5];
        for exec in executors() {
            assert_abs_diff_eq!(exec.dot(&x[..], &y[..]), 4.0 - 10.0 - 18.0 - 2.0, epsilon = 1e-12);
            assert_abs_diff_eq!(exec.norm(&x[..]), 30.0f64.sqrt(), epsilon = 1e-12);
        }
    }

    #[test]
    fn axpy_and_aypx() {
        for exec in executors() {
            let x = vec![1.0, 2.0, 3.0];
            let mut y = vec![1.0, 1.0, 1.0];
            exec.axpy(2.0, &x, &mut y);
            assert_eq!(y, vec![3.0, 5.0, 7.0]);
            exec.aypx(0.5, &x, &mut y);
            assert_eq!(y, vec![2.5, 4.5, 6.5]);
        }
    }
}

//! Core linear-algebra traits for ldubridge.

use num_traits::Float;

/// Scalar bound shared by the device kernels and Krylov methods.
pub trait Scalar: Float + Send + Sync + std::fmt::Debug + 'static {}

impl<T: Float + Send + Sync + std::fmt::Debug + 'static> Scalar for T {}

/// Matrix–vector product: y ← A x.
pub trait MatVec<T> {
    /// Compute y = A · x.
    fn matvec(&self, x: &[T], y: &mut [T]);
}

/// Inner products & norms, evaluated on a compute backend.
pub trait InnerProduct<T> {
    /// Compute dot(x, y).
    fn dot(&self, x: &[T], y: &[T]) -> T;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &[T]) -> T;
}

/// Division that yields zero instead of NaN/inf when the denominator vanishes.
///
/// Krylov recurrences use it so that an exactly converged residual produces a
/// zero step rather than poisoning the iterate.
#[inline]
pub fn safe_div<T: Float>(num: T, den: T) -> T {
    if den == T::zero() { T::zero() } else { num / den }
}

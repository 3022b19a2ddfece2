// Block-Jacobi preconditioner implementation

use crate::core::executor::Executor;
use crate::error::LduError;
use crate::matrix::device::DeviceMatrix;
use crate::preconditioner::Preconditioner;
use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Block-Jacobi preconditioner over contiguous diagonal blocks.
///
/// Rows are split into blocks of `max_block_size` (the last block may be smaller);
/// each block's dense diagonal submatrix is LU-factored with full pivoting and
/// applied independently.
pub struct BlockJacobi {
    exec: Executor,
    block_size: usize,
    n: usize,
    factors: Vec<FullPivLu<f64>>,
}

impl BlockJacobi {
    /// Extract and factor the diagonal blocks of `a`.
    pub fn generate(a: &DeviceMatrix, max_block_size: usize) -> Result<Self, LduError> {
        if max_block_size == 0 {
            return Err(LduError::config("maxBlockSize must be at least 1"));
        }
        let n = a.nrows();
        let bs = max_block_size;
        let n_blocks = n.div_ceil(bs);
        let block_len = |b: usize| bs.min(n - b * bs);

        // column-major dense storage per block
        let mut dense: Vec<Vec<f64>> = (0..n_blocks).map(|b| vec![0.0; block_len(b) * block_len(b)]).collect();
        a.inner().for_each_entry(&mut |i, j, v| {
            let b = i / bs;
            if j / bs == b {
                let m = block_len(b);
                dense[b][(j - b * bs) * m + (i - b * bs)] += v;
            }
        });

        let mut factors = Vec::with_capacity(n_blocks);
        for (b, data) in dense.iter().enumerate() {
            let m = block_len(b);
            let block = Mat::from_fn(m, m, |i, j| data[j * m + i]);
            let lu = FullPivLu::new(block.as_ref());
            if let Some(k) = singular_pivot(&lu, m) {
                return Err(LduError::ZeroPivot(b * bs + k));
            }
            factors.push(lu);
        }
        log::debug!("block-Jacobi: {n_blocks} blocks of up to {bs} rows");

        Ok(BlockJacobi { exec: a.executor().clone(), block_size: bs, n, factors })
    }

    pub fn num_blocks(&self) -> usize {
        self.factors.len()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

/// First pivot step of `lu` that is zero, non-finite or negligible against the
/// largest pivot. Full pivoting orders pivots by magnitude, so `U[0, 0]` is the largest.
fn singular_pivot(lu: &FullPivLu<f64>, m: usize) -> Option<usize> {
    let u = lu.U();
    let largest = u[(0, 0)].abs();
    let floor = m as f64 * f64::EPSILON * largest;
    (0..m).find(|&k| {
        let p = u[(k, k)];
        !p.is_finite() || p.abs() <= floor || p == 0.0
    })
}

fn solve_block(lu: &FullPivLu<f64>, z: &mut [f64]) {
    let m = z.len();
    lu.solve_in_place_with_conj(Conj::No, MatMut::from_column_major_slice_mut(z, m, 1));
}

impl Preconditioner<f64> for BlockJacobi {
    fn apply(&self, r: &[f64], z: &mut [f64]) -> Result<(), LduError> {
        LduError::check_len(self.n, r.len())?;
        LduError::check_len(self.n, z.len())?;
        z.copy_from_slice(r);
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.exec.pool {
                pool.install(|| {
                    z.par_chunks_mut(self.block_size)
                        .zip(self.factors.par_iter())
                        .for_each(|(zb, lu)| solve_block(lu, zb))
                });
                return Ok(());
            }
        }
        for (zb, lu) in z.chunks_mut(self.block_size).zip(&self.factors) {
            solve_block(lu, zb);
        }
        Ok(())
    }
}

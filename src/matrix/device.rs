//! Assembled system matrix resident on a compute backend.

use crate::core::executor::Executor;
use crate::core::traits::MatVec;
use crate::error::LduError;
use crate::matrix::permutation::Permutation;
use crate::matrix::sparse::{CooMatrix, CsrMatrix, SparseMatrix};
use crate::matrix::sparsity::TripletPattern;

/// Storage format of a [`DeviceMatrix`].
#[derive(Debug, Clone)]
pub enum SparseStorage {
    /// Built from row-major sorted triplets.
    Csr(CsrMatrix<f64>),
    /// Triplets kept in segment order.
    Coo(CooMatrix<f64>),
}

/// Sparse structure plus values on an executor.
#[derive(Debug, Clone)]
pub struct DeviceMatrix {
    exec: Executor,
    storage: SparseStorage,
}

impl DeviceMatrix {
    /// Assemble from the segment-order pattern and values.
    ///
    /// With a permutation the triplets are sorted and stored as CSR; without one they
    /// are stored as COO in segment order.
    pub fn assemble(
        exec: &Executor,
        pattern: &TripletPattern,
        values: Vec<f64>,
        perm: Option<&Permutation>,
    ) -> Result<Self, LduError> {
        LduError::check_len(pattern.len(), values.len())?;
        let storage = match perm {
            Some(perm) => {
                let rows = perm.apply(&pattern.rows)?;
                let cols = perm.apply(&pattern.cols)?;
                let values = perm.apply(&values)?;
                SparseStorage::Csr(CsrMatrix::from_sorted_triplets(pattern.n_cells, &rows, cols, values)?)
            }
            None => SparseStorage::Coo(CooMatrix::from_triplets(
                pattern.n_cells,
                pattern.rows.clone(),
                pattern.cols.clone(),
                values,
            )?),
        };
        Ok(DeviceMatrix { exec: exec.clone(), storage })
    }

    /// Replace the values, given in segment order, keeping structure and layout.
    pub fn update_values(&mut self, values: Vec<f64>, perm: Option<&Permutation>) -> Result<(), LduError> {
        let values = match perm {
            Some(perm) => perm.apply(&values)?,
            None => values,
        };
        self.inner_mut().set_values(values)
    }

    pub fn storage(&self) -> &SparseStorage {
        &self.storage
    }

    pub fn executor(&self) -> &Executor {
        &self.exec
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self.storage, SparseStorage::Csr(_))
    }

    pub fn inner(&self) -> &dyn SparseMatrix<f64> {
        match &self.storage {
            SparseStorage::Csr(m) => m,
            SparseStorage::Coo(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SparseMatrix<f64> {
        match &mut self.storage {
            SparseStorage::Csr(m) => m,
            SparseStorage::Coo(m) => m,
        }
    }

    pub fn nrows(&self) -> usize {
        self.inner().nrows()
    }

    pub fn nnz(&self) -> usize {
        self.inner().nnz()
    }

    /// Dense copy, row-major; only meant for small systems and diagnostics.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.nrows();
        let mut dense = vec![vec![0.0; n]; n];
        self.inner().for_each_entry(&mut |i, j, v| dense[i][j] += v);
        dense
    }
}

impl MatVec<f64> for DeviceMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        self.inner().spmv(&self.exec, x, y);
    }
}

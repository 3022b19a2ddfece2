// SparseMatrix trait and storage formats (CSR, COO)

use crate::core::executor::Executor;
use crate::core::traits::Scalar;
use crate::error::LduError;
use faer::sparse::{SparseRowMat, SymbolicSparseRowMat};
use std::fmt;

/// A read‐only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Number of stored entries.
    fn nnz(&self) -> usize;
    /// Compute y = A * x on `exec`.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, exec: &Executor, x: &[T], y: &mut [T]);
    /// Visit every stored entry as (row, col, value).
    fn for_each_entry(&self, f: &mut dyn FnMut(usize, usize, T));
    /// Stored values, in storage order.
    fn values(&self) -> &[T];
    /// Overwrite the stored values, keeping the structure.
    fn set_values(&mut self, values: Vec<T>) -> Result<(), LduError>;
}

/// Compressed sparse row storage on top of faer's owning CSR.
#[derive(Clone)]
pub struct CsrMatrix<T> {
    inner: SparseRowMat<usize, T>,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, LduError> {
        LduError::check_len(nrows + 1, row_ptr.len())?;
        LduError::check_len(col_idx.len(), values.len())?;
        if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() || row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(LduError::invalid("row pointers are not a valid prefix sum"));
        }
        if col_idx.iter().any(|&c| c >= ncols) {
            return Err(LduError::invalid("column index out of range"));
        }
        // duplicate faces repeat a column within a row
        let symbolic = SymbolicSparseRowMat::new_unsorted_checked(nrows, ncols, row_ptr, None, col_idx);
        let inner = SparseRowMat::new(symbolic, values);
        Ok(Self { inner })
    }

    /// Build a CSR from triplets already ordered by row.
    pub fn from_sorted_triplets(
        n: usize,
        rows: &[usize],
        cols: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, LduError> {
        LduError::check_len(rows.len(), cols.len())?;
        if rows.windows(2).any(|w| w[0] > w[1]) {
            return Err(LduError::invalid("triplets are not ordered by row"));
        }
        if let Some(&r) = rows.iter().find(|&&r| r >= n) {
            return Err(LduError::invalid(format!("row {r} out of range for {n} rows")));
        }
        let row_ptr = (0..=n).map(|i| rows.partition_point(|&r| r < i)).collect();
        Self::from_csr(n, n, row_ptr, cols, values)
    }

    pub fn row_ptr(&self) -> &[usize] {
        self.inner.symbolic().row_ptr()
    }

    pub fn col_idx(&self) -> &[usize] {
        self.inner.symbolic().col_idx()
    }
}

impl<T> fmt::Debug for CsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrMatrix")
            .field("nrows", &self.inner.nrows())
            .field("ncols", &self.inner.ncols())
            .field("nnz", &self.inner.val().len())
            .finish()
    }
}

impl<T: Scalar> SparseMatrix<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
    fn nnz(&self) -> usize {
        self.inner.val().len()
    }
    fn spmv(&self, exec: &Executor, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        let (row_ptr, col_idx, val) = (self.row_ptr(), self.col_idx(), self.inner.val());
        exec.for_each_row(y, |i| {
            let (start, end) = (row_ptr[i], row_ptr[i + 1]);
            col_idx[start..end]
                .iter()
                .zip(&val[start..end])
                .fold(T::zero(), |acc, (&j, &v)| acc + v * x[j])
        });
    }
    fn for_each_entry(&self, f: &mut dyn FnMut(usize, usize, T)) {
        let (row_ptr, col_idx, val) = (self.row_ptr(), self.col_idx(), self.inner.val());
        for i in 0..self.nrows() {
            for k in row_ptr[i]..row_ptr[i + 1] {
                f(i, col_idx[k], val[k]);
            }
        }
    }
    fn values(&self) -> &[T] {
        self.inner.val()
    }
    fn set_values(&mut self, values: Vec<T>) -> Result<(), LduError> {
        LduError::check_len(self.nnz(), values.len())?;
        self.inner.val_mut().copy_from_slice(&values);
        Ok(())
    }
}

/// Coordinate storage, entries in arbitrary order.
#[derive(Debug, Clone)]
pub struct CooMatrix<T> {
    n: usize,
    row_idx: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> CooMatrix<T> {
    pub fn from_triplets(
        n: usize,
        row_idx: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, LduError> {
        LduError::check_len(row_idx.len(), col_idx.len())?;
        LduError::check_len(row_idx.len(), values.len())?;
        if row_idx.iter().chain(&col_idx).any(|&i| i >= n) {
            return Err(LduError::invalid("triplet index out of range"));
        }
        Ok(Self { n, row_idx, col_idx, values })
    }
}

impl<T: Scalar> SparseMatrix<T> for CooMatrix<T> {
    fn nrows(&self) -> usize {
        self.n
    }
    fn ncols(&self) -> usize {
        self.n
    }
    fn nnz(&self) -> usize {
        self.values.len()
    }
    // Scattered rows do not partition into independent chunks, so this stays serial.
    fn spmv(&self, _exec: &Executor, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.n);
        y.iter_mut().for_each(|yi| *yi = T::zero());
        for ((&i, &j), &v) in self.row_idx.iter().zip(&self.col_idx).zip(&self.values) {
            y[i] = y[i] + v * x[j];
        }
    }
    fn for_each_entry(&self, f: &mut dyn FnMut(usize, usize, T)) {
        for ((&i, &j), &v) in self.row_idx.iter().zip(&self.col_idx).zip(&self.values) {
            f(i, j, v);
        }
    }
    fn values(&self) -> &[T] {
        &self.values
    }
    fn set_values(&mut self, values: Vec<T>) -> Result<(), LduError> {
        LduError::check_len(self.values.len(), values.len())?;
        self.values = values;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_spmv() {
        // 3×3 identity in CSR: row_ptr=[0,1,2,3], col_idx=[0,1,2], vals=[1,1,1]
        let m = CsrMatrix::from_csr(3, 3, vec![0, 1, 2, 3], vec![0, 1, 2], vec![1.0, 1.0, 1.0]).unwrap();
        let x = vec![2.0, 3.0, 5.0];
        let mut y = vec![0.0; 3];
        m.spmv(&Executor::reference(), &x, &mut y);
        assert_eq!(y, x);
    }

    #[test]
    fn simple_pattern() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let m = CsrMatrix::from_csr(2, 3, vec![0, 2, 4], vec![0, 1, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        m.spmv(&Executor::reference(), &x, &mut y);
        assert_eq!(y, vec![3.0, 7.0]);
    }

    #[test]
    fn sorted_triplets_build_row_pointers() {
        let rows = vec![0, 0, 1, 2, 2];
        let m = CsrMatrix::from_sorted_triplets(3, &rows, vec![0, 1, 1, 0, 2], vec![1.0; 5]).unwrap();
        assert_eq!(m.row_ptr(), &[0, 2, 3, 5]);
        assert!(CsrMatrix::from_sorted_triplets(3, &[1, 0], vec![0, 0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn coo_and_csr_agree() {
        let coo = CooMatrix::from_triplets(2, vec![1, 0, 0], vec![0, 1, 0], vec![3.0, 2.0, 1.0]).unwrap();
        let csr = CsrMatrix::from_sorted_triplets(2, &[0, 0, 1], vec![0, 1, 0], vec![1.0, 2.0, 3.0]).unwrap();
        let x = vec![1.0, -1.0];
        let (mut y1, mut y2) = (vec![0.0; 2], vec![0.0; 2]);
        coo.spmv(&Executor::reference(), &x, &mut y1);
        csr.spmv(&Executor::reference(), &x, &mut y2);
        assert_eq!(y1, y2);
    }

    #[test]
    fn repeated_columns_stay_separate_entries() {
        // two faces joining cells 0 and 1
        let rows = [0, 0, 0, 1, 1, 1];
        let cols = vec![0, 1, 1, 0, 0, 1];
        let m = CsrMatrix::from_sorted_triplets(2, &rows, cols, vec![1.0, 10.0, 20.0, 30.0, 40.0, 1.0]).unwrap();
        assert_eq!(m.nnz(), 6);
        assert_eq!(m.row_ptr(), &[0, 3, 6]);
        assert_eq!(m.col_idx(), &[0, 1, 1, 0, 0, 1]);
        let mut y = vec![0.0; 2];
        m.spmv(&Executor::reference(), &[1.0, 1.0], &mut y);
        assert_eq!(y, vec![31.0, 71.0]);
    }

    #[test]
    fn malformed_structure_is_an_error() {
        assert!(CsrMatrix::from_csr(2, 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 1, vec![0, 1], vec![3], vec![1.0]).is_err());
        assert!(CsrMatrix::from_sorted_triplets(2, &[0, 2], vec![0, 0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn set_values_checks_length() {
        let mut m = CsrMatrix::from_sorted_triplets(1, &[0], vec![0], vec![1.0]).unwrap();
        assert!(m.set_values(vec![1.0, 2.0]).is_err());
        m.set_values(vec![4.0]).unwrap();
        assert_eq!(m.values(), &[4.0]);
    }
}

//! Triplet sparsity and value assembly from LDU addressing.
//!
//! Entries are laid out in three fixed segments:
//!
//! | segment  | length        | row             | column          | value      |
//! |----------|---------------|-----------------|-----------------|------------|
//! | lower    | nNeighbours   | `lower_addr[f]` | `upper_addr[f]` | `lower[f]` |
//! | diagonal | nCells        | `i`             | `i`             | `diag[i]`  |
//! | upper    | nNeighbours   | `upper_addr[f]` | `lower_addr[f]` | `upper[f]` |
//!
//! The segment order never changes: sort permutations are computed against it and
//! reapplied to every value array assembled later.

use crate::matrix::ldu::LduMatrixSource;

/// Unsorted row/column indices of an LDU matrix in segment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripletPattern {
    pub n_cells: usize,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl TripletPattern {
    /// Build the index arrays, length `nCells + 2 · nNeighbours`.
    pub fn build<S: LduMatrixSource + ?Sized>(ldu: &S) -> Self {
        let n_elems = ldu.n_elems();
        let (l, u) = (ldu.lower_addr(), ldu.upper_addr());
        let mut rows = Vec::with_capacity(n_elems);
        let mut cols = Vec::with_capacity(n_elems);

        rows.extend_from_slice(l);
        cols.extend_from_slice(u);

        rows.extend(0..ldu.n_cells());
        cols.extend(0..ldu.n_cells());

        rows.extend_from_slice(u);
        cols.extend_from_slice(l);

        TripletPattern { n_cells: ldu.n_cells(), rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Concatenate lower, diagonal and upper coefficients in segment order.
pub fn assemble_values<S: LduMatrixSource + ?Sized>(ldu: &S) -> Vec<f64> {
    let mut values = Vec::with_capacity(ldu.n_elems());
    values.extend_from_slice(ldu.lower());
    values.extend_from_slice(ldu.diag());
    values.extend_from_slice(ldu.upper());
    values
}

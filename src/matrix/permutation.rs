//! Row-major sort permutations for triplet arrays.
//!
//! A [`Permutation`] maps *sorted position → original position*. It is computed once
//! per topology from the row/column index arrays in segment order and then reused
//! for every value array assembled in the same order:
//!
//! ```text
//! sorted[i] = original[perm[i]]
//! ```
//!
//! The order is total and stable: entries are ordered by row, ties by column, and
//! entries with equal (row, column) keep their segment order. Applying a permutation
//! to an array of a different length is a topology mismatch and is rejected.

use crate::error::LduError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    map: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Permutation { map: (0..n).collect() }
    }

    /// Wrap an explicit mapping; every index in `0..len` must occur exactly once.
    pub fn from_vec(map: Vec<usize>) -> Result<Self, LduError> {
        let mut seen = vec![false; map.len()];
        for &j in &map {
            if j >= map.len() || seen[j] {
                return Err(LduError::invalid(format!("index {j} breaks the permutation")));
            }
            seen[j] = true;
        }
        Ok(Permutation { map })
    }

    /// Order `(rows[k], cols[k])` by row, then by column.
    ///
    /// Runs a stable counting sort over rows followed by a stable sort of each row's
    /// slice by column, so the cost is linear in the number of entries plus the
    /// per-row sorts.
    pub fn compute(rows: &[usize], cols: &[usize], n_cells: usize) -> Result<Self, LduError> {
        LduError::check_len(rows.len(), cols.len())?;
        if let Some(&bad) = rows.iter().chain(cols).find(|&&i| i >= n_cells) {
            return Err(LduError::invalid(format!(
                "index {bad} out of range for {n_cells} cells"
            )));
        }

        let mut row_start = vec![0usize; n_cells + 1];
        for &r in rows {
            row_start[r + 1] += 1;
        }
        for r in 0..n_cells {
            row_start[r + 1] += row_start[r];
        }

        let mut next = row_start.clone();
        let mut map = vec![0usize; rows.len()];
        for (k, &r) in rows.iter().enumerate() {
            map[next[r]] = k;
            next[r] += 1;
        }

        for r in 0..n_cells {
            map[row_start[r]..row_start[r + 1]].sort_by_key(|&k| cols[k]);
        }

        Ok(Permutation { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &j)| i == j)
    }

    /// Gather `src` into sorted order.
    pub fn apply<T: Copy>(&self, src: &[T]) -> Result<Vec<T>, LduError> {
        LduError::check_len(self.map.len(), src.len())?;
        Ok(self.map.iter().map(|&j| src[j]).collect())
    }

    /// Reorder `data` in place (through a temporary copy).
    pub fn apply_in_place<T: Copy>(&self, data: &mut [T]) -> Result<(), LduError> {
        let sorted = self.apply(data)?;
        data.copy_from_slice(&sorted);
        Ok(())
    }

    /// The permutation equivalent to applying `self` and then `next`.
    pub fn then(&self, next: &Permutation) -> Result<Permutation, LduError> {
        LduError::check_len(self.map.len(), next.map.len())?;
        Ok(Permutation { map: next.map.iter().map(|&j| self.map[j]).collect() })
    }

    /// Maps original position → sorted position.
    pub fn inverse(&self) -> Permutation {
        let mut inv = vec![0usize; self.map.len()];
        for (i, &j) in self.map.iter().enumerate() {
            inv[j] = i;
        }
        Permutation { map: inv }
    }
}

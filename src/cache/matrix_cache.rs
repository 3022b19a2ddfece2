//! Per-field cache of assembled device matrices and initial guesses.
//!
//! Whether the device matrix has to be (re)assembled is decided from two flags:
//!
//! | stored | update requested | action                                         |
//! |--------|------------------|------------------------------------------------|
//! | false  | any              | build sparsity, permutation and matrix         |
//! | true   | false            | reuse the stored matrix verbatim               |
//! | true   | true             | reassemble values only, reusing the structure  |
//!
//! The sort permutation is computed only while the field has none, independent of
//! the two flags. Cached state is tied to the [`Topology`] it was built for; a
//! change of cell count, face count or addressing invalidates every entry of the
//! field before the decision is taken.

use crate::cache::registry::Registry;
use crate::core::executor::Executor;
use crate::core::vector::DeviceVector;
use crate::error::LduError;
use crate::matrix::device::DeviceMatrix;
use crate::matrix::ldu::{LduMatrixSource, Topology};
use crate::matrix::permutation::Permutation;
use crate::matrix::sparsity::{TripletPattern, assemble_values};

/// What [`MatrixCache::prepare`] did to the stored matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixAction {
    Build,
    Reuse,
    UpdateValues,
}

impl MatrixAction {
    pub fn decide(stored: bool, update_requested: bool) -> Self {
        match (stored, update_requested) {
            (false, _) => MatrixAction::Build,
            (true, false) => MatrixAction::Reuse,
            (true, true) => MatrixAction::UpdateValues,
        }
    }

    /// Whether the matrix values may differ from the previous solve.
    pub fn changes_matrix(self) -> bool {
        self != MatrixAction::Reuse
    }
}

/// Result of [`MatrixCache::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared {
    pub action: MatrixAction,
    /// Cached state of the field was dropped because its topology changed.
    pub invalidated: bool,
}

/// Counters of the expensive cache operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub pattern_builds: usize,
    pub permutation_computations: usize,
    pub value_assemblies: usize,
    pub invalidations: usize,
}

struct MatrixEntry {
    topology: Topology,
    perm: Option<Permutation>,
    matrix: DeviceMatrix,
}

#[derive(Default)]
pub struct MatrixCache {
    matrices: Registry<String, MatrixEntry>,
    guesses: Registry<(String, usize), DeviceVector>,
    stats: CacheStats,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the device matrix of `field` current for `ldu`.
    pub fn prepare<S: LduMatrixSource + ?Sized>(
        &mut self,
        field: &str,
        ldu: &S,
        exec: &Executor,
        sort: bool,
        update_requested: bool,
    ) -> Result<Prepared, LduError> {
        let topology = Topology::of(ldu);
        let stale = self
            .matrices
            .get(field)
            .map(|e| e.topology != topology || e.perm.is_some() != sort);
        let invalidated = stale == Some(true);
        if invalidated {
            log::debug!("{field}: topology or layout changed, dropping cached matrix and guesses");
            self.invalidate(field);
        }

        let action = MatrixAction::decide(self.matrices.exists(field), update_requested);
        match action {
            MatrixAction::Build => {
                let pattern = TripletPattern::build(ldu);
                self.stats.pattern_builds += 1;
                let perm = if sort {
                    self.stats.permutation_computations += 1;
                    Some(Permutation::compute(&pattern.rows, &pattern.cols, pattern.n_cells)?)
                } else {
                    None
                };
                let values = assemble_values(ldu);
                self.stats.value_assemblies += 1;
                let matrix = DeviceMatrix::assemble(exec, &pattern, values, perm.as_ref())?;
                log::debug!(
                    "{field}: built {} matrix with {} entries",
                    if sort { "sorted" } else { "unsorted" },
                    matrix.nnz()
                );
                self.matrices.put(field.to_string(), MatrixEntry { topology, perm, matrix });
            }
            MatrixAction::UpdateValues => {
                let values = assemble_values(ldu);
                self.stats.value_assemblies += 1;
                if let Some(entry) = self.matrices.get_mut(field) {
                    entry.matrix.update_values(values, entry.perm.as_ref())?;
                }
                log::debug!("{field}: updated matrix values");
            }
            MatrixAction::Reuse => log::debug!("{field}: reusing cached matrix"),
        }
        Ok(Prepared { action, invalidated })
    }

    pub fn matrix(&self, field: &str) -> Option<&DeviceMatrix> {
        self.matrices.get(field).map(|e| &e.matrix)
    }

    pub fn permutation(&self, field: &str) -> Option<&Permutation> {
        self.matrices.get(field).and_then(|e| e.perm.as_ref())
    }

    pub fn topology(&self, field: &str) -> Option<Topology> {
        self.matrices.get(field).map(|e| e.topology)
    }

    /// Initial guess for component `cmpt` of `field`.
    ///
    /// The cached device vector is handed out when one exists and no refresh was
    /// requested; otherwise a fresh vector is created from `host`.
    pub fn checkout_guess(
        &mut self,
        field: &str,
        cmpt: usize,
        exec: &Executor,
        host: &[f64],
        refresh: bool,
    ) -> DeviceVector {
        let key = (field.to_string(), cmpt);
        match self.guesses.remove(&key) {
            Some(cached) if !refresh && cached.len() == host.len() => cached,
            _ => DeviceVector::from_host(exec, host),
        }
    }

    /// Keep `guess` as the starting point of the next solve of this component.
    pub fn store_guess(&mut self, field: &str, cmpt: usize, guess: DeviceVector) {
        self.guesses.put((field.to_string(), cmpt), guess);
    }

    pub fn has_guess(&self, field: &str, cmpt: usize) -> bool {
        self.guesses.exists(&(field.to_string(), cmpt))
    }

    /// Drop the matrix, permutation and initial guesses of `field`.
    pub fn invalidate(&mut self, field: &str) {
        self.matrices.remove(field);
        self.guesses.remove_where(|(f, _)| f == field);
        self.stats.invalidations += 1;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

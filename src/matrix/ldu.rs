//! LDU-addressed matrices as supplied by a finite-volume mesh.
//!
//! An LDU matrix stores one diagonal coefficient per cell and, for every internal
//! face ("neighbour" pair), one lower and one upper coefficient. The faces are
//! addressed by two arrays of cell indices, `lower_addr` and `upper_addr`.
//!
//! Coefficient placement follows the triplet layout used for assembly:
//! `lower[f]` sits at `(lower_addr[f], upper_addr[f])` and `upper[f]` at
//! `(upper_addr[f], lower_addr[f])`. [`LduMatrixSource::amul`] uses the same
//! placement so that residual normalisation and the assembled matrix agree.

use crate::error::LduError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Guard added to the normalisation factor so it never vanishes.
pub const SMALL: f64 = 1.0e-20;

/// Read access to the coefficients and addressing of an LDU matrix.
///
/// The mesh/matrix data source implements this; the crate never owns the arrays.
pub trait LduMatrixSource {
    fn diag(&self) -> &[f64];
    fn lower(&self) -> &[f64];
    fn upper(&self) -> &[f64];
    fn lower_addr(&self) -> &[usize];
    fn upper_addr(&self) -> &[usize];

    fn n_cells(&self) -> usize {
        self.diag().len()
    }

    fn n_neighbours(&self) -> usize {
        self.upper_addr().len()
    }

    /// Number of triplet entries: `nCells + 2 · nNeighbours`.
    fn n_elems(&self) -> usize {
        self.n_cells() + 2 * self.n_neighbours()
    }

    /// Check array lengths and that every address is a valid cell index.
    fn validate(&self) -> Result<(), LduError> {
        let n_cells = self.n_cells();
        let n_faces = self.n_neighbours();
        for (name, len) in [
            ("lower", self.lower().len()),
            ("upper", self.upper().len()),
            ("lower_addr", self.lower_addr().len()),
        ] {
            if len != n_faces {
                return Err(LduError::invalid(format!(
                    "{name} has {len} entries, expected {n_faces}"
                )));
            }
        }
        let mut addr = self.lower_addr().iter().chain(self.upper_addr());
        if let Some(&bad) = addr.find(|&&c| c >= n_cells) {
            return Err(LduError::invalid(format!(
                "face addresses cell {bad} but the matrix has {n_cells} cells"
            )));
        }
        Ok(())
    }

    /// y ← A x
    fn amul(&self, x: &[f64], y: &mut [f64]) {
        let (l, u) = (self.lower_addr(), self.upper_addr());
        let (lower, upper) = (self.lower(), self.upper());
        for ((yi, d), xi) in y.iter_mut().zip(self.diag()).zip(x) {
            *yi = d * xi;
        }
        for f in 0..l.len() {
            y[l[f]] += lower[f] * x[u[f]];
            y[u[f]] += upper[f] * x[l[f]];
        }
    }

    /// Row sums of A.
    fn sum_a(&self, out: &mut [f64]) {
        out.copy_from_slice(self.diag());
        let (l, u) = (self.lower_addr(), self.upper_addr());
        for f in 0..l.len() {
            out[l[f]] += self.lower()[f];
            out[u[f]] += self.upper()[f];
        }
    }

    /// Residual normalisation factor for the current solution `psi` and `source`:
    /// `Σ(|A ψ − A ψ̄| + |b − A ψ̄|) + SMALL`, where ψ̄ is the mean of `psi`.
    fn norm_factor(&self, psi: &[f64], source: &[f64]) -> f64 {
        let n = self.n_cells();
        if n == 0 {
            return SMALL;
        }
        let x_ref = psi.iter().sum::<f64>() / n as f64;
        let mut w_a = vec![0.0; n];
        let mut p_a = vec![0.0; n];
        self.amul(psi, &mut w_a);
        self.sum_a(&mut p_a);
        p_a.iter_mut().for_each(|p| *p *= x_ref);
        w_a.iter()
            .zip(&p_a)
            .zip(source)
            .map(|((w, p), b)| (w - p).abs() + (b - p).abs())
            .sum::<f64>()
            + SMALL
    }
}

/// Borrowed LDU arrays.
#[derive(Debug, Clone, Copy)]
pub struct LduSystem<'a> {
    pub diag: &'a [f64],
    pub lower: &'a [f64],
    pub upper: &'a [f64],
    pub lower_addr: &'a [usize],
    pub upper_addr: &'a [usize],
}

impl<'a> LduSystem<'a> {
    /// Wrap the arrays after checking that they describe a consistent matrix.
    pub fn new(
        diag: &'a [f64],
        lower: &'a [f64],
        upper: &'a [f64],
        lower_addr: &'a [usize],
        upper_addr: &'a [usize],
    ) -> Result<Self, LduError> {
        let sys = LduSystem { diag, lower, upper, lower_addr, upper_addr };
        sys.validate()?;
        Ok(sys)
    }
}

impl LduMatrixSource for LduSystem<'_> {
    fn diag(&self) -> &[f64] {
        self.diag
    }
    fn lower(&self) -> &[f64] {
        self.lower
    }
    fn upper(&self) -> &[f64] {
        self.upper
    }
    fn lower_addr(&self) -> &[usize] {
        self.lower_addr
    }
    fn upper_addr(&self) -> &[usize] {
        self.upper_addr
    }
}

/// Identity of a mesh addressing configuration.
///
/// Cached sparsity, permutations and matrices are only valid while the topology
/// they were built for is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topology {
    pub n_cells: usize,
    pub n_neighbours: usize,
    fingerprint: u64,
}

impl Topology {
    pub fn of<S: LduMatrixSource + ?Sized>(ldu: &S) -> Self {
        let mut hasher = DefaultHasher::new();
        ldu.lower_addr().hash(&mut hasher);
        ldu.upper_addr().hash(&mut hasher);
        Topology {
            n_cells: ldu.n_cells(),
            n_neighbours: ldu.n_neighbours(),
            fingerprint: hasher.finish(),
        }
    }

    pub fn n_elems(&self) -> usize {
        self.n_cells + 2 * self.n_neighbours
    }
}

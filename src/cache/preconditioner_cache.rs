//! Per-field cache of generated preconditioners.

use crate::cache::registry::Registry;
use crate::error::LduError;
use crate::matrix::device::DeviceMatrix;
use crate::preconditioner::{BlockJacobi, Preconditioner, PreconditionerKind};
use std::sync::Arc;

/// Shared handle to a generated preconditioner.
pub type SharedPreconditioner = Arc<dyn Preconditioner<f64>>;

/// Builds a preconditioner the first time a field asks for one and hands out the
/// cached instance afterwards.
///
/// [`get`](Self::get) performs no staleness check against the matrix; callers drop
/// entries with [`invalidate`](Self::invalidate) when the matrix changes.
#[derive(Default)]
pub struct PreconditionerCache {
    entries: Registry<String, SharedPreconditioner>,
    builds: usize,
}

impl PreconditionerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached preconditioner of `field`, generated from `matrix` when absent.
    /// `PreconditionerKind::None` yields no preconditioner.
    pub fn get(
        &mut self,
        field: &str,
        matrix: &DeviceMatrix,
        kind: PreconditionerKind,
        max_block_size: usize,
    ) -> Result<Option<SharedPreconditioner>, LduError> {
        if kind == PreconditionerKind::None {
            return Ok(None);
        }
        if let Some(pc) = self.entries.get(field) {
            log::debug!("{field}: reusing cached {kind} preconditioner");
            return Ok(Some(Arc::clone(pc)));
        }
        let pc: SharedPreconditioner = match kind {
            PreconditionerKind::BlockJacobi => Arc::new(BlockJacobi::generate(matrix, max_block_size)?),
            PreconditionerKind::None => return Ok(None),
        };
        self.builds += 1;
        log::debug!("{field}: generated {kind} preconditioner");
        self.entries.put(field.to_string(), Arc::clone(&pc));
        Ok(Some(pc))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.exists(field)
    }

    /// Drop the cached preconditioner of `field`; returns whether one existed.
    pub fn invalidate(&mut self, field: &str) -> bool {
        let dropped = self.entries.remove(field).is_some();
        if dropped {
            log::debug!("{field}: dropped cached preconditioner");
        }
        dropped
    }

    /// Number of preconditioners generated so far.
    pub fn builds(&self) -> usize {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::Executor;
    use crate::matrix::ldu::LduSystem;
    use crate::matrix::sparsity::{TripletPattern, assemble_values};

    fn matrix(d: f64) -> DeviceMatrix {
        let diag = vec![d; 4];
        let sys = LduSystem::new(&diag, &[], &[], &[], &[]).unwrap();
        DeviceMatrix::assemble(&Executor::reference(), &TripletPattern::build(&sys), assemble_values(&sys), None)
            .unwrap()
    }

    #[test]
    fn none_yields_no_preconditioner() {
        let mut cache = PreconditionerCache::new();
        assert!(cache.get("p", &matrix(1.0), PreconditionerKind::None, 4).unwrap().is_none());
        assert_eq!(cache.builds(), 0);
    }

    #[test]
    fn cached_instance_is_returned_without_staleness_check() {
        let mut cache = PreconditionerCache::new();
        let first = cache.get("p", &matrix(2.0), PreconditionerKind::BlockJacobi, 2).unwrap().unwrap();
        let second = cache.get("p", &matrix(4.0), PreconditionerKind::BlockJacobi, 2).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.builds(), 1);

        let mut z = vec![0.0; 4];
        second.apply(&[2.0; 4], &mut z).unwrap();
        assert!(z.iter().all(|v| (v - 1.0).abs() < 1e-14));

        assert!(cache.invalidate("p"));
        cache.get("p", &matrix(4.0), PreconditionerKind::BlockJacobi, 2).unwrap();
        assert_eq!(cache.builds(), 2);
    }
}

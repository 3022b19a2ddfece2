//! Compute-backend selection.
//!
//! An [`Executor`] is the resolved target on which vector kernels, sparse
//! matrix-vector products and preconditioner applications run. The names accepted
//! from configuration are `reference`, `omp`, `cuda` and `hip`:
//!
//! - `reference` runs every kernel serially on the calling thread.
//! - `omp` runs kernels on a dedicated rayon thread pool (requires the `rayon` feature).
//! - `cuda` / `hip` are never compiled into this crate; requesting them falls back
//!   to `reference` and logs a warning.
//!
//! Two executors are resolved per solver: the *device* executor where the solve
//! runs and the *application* executor that owns host-facing vectors. They may
//! differ in configuration even though both are host resident after fallback.

use crate::error::LduError;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// Backend requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    /// Serial CPU reference kernels
    Reference,
    /// Shared-memory parallel kernels
    Omp,
    /// NVIDIA GPU
    Cuda,
    /// AMD GPU
    Hip,
}

impl ExecutorKind {
    pub fn name(self) -> &'static str {
        match self {
            ExecutorKind::Reference => "reference",
            ExecutorKind::Omp => "omp",
            ExecutorKind::Cuda => "cuda",
            ExecutorKind::Hip => "hip",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutorKind {
    type Err = LduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reference" | "ref" => Ok(ExecutorKind::Reference),
            "omp" => Ok(ExecutorKind::Omp),
            "cuda" => Ok(ExecutorKind::Cuda),
            "hip" => Ok(ExecutorKind::Hip),
            other => Err(LduError::config(format!(
                "unknown executor '{other}' (expected reference, omp, cuda or hip)"
            ))),
        }
    }
}

/// A resolved compute backend.
#[derive(Clone, Debug)]
pub struct Executor {
    requested: ExecutorKind,
    kind: ExecutorKind,
    #[cfg(feature = "rayon")]
    pub(crate) pool: Option<Arc<rayon::ThreadPool>>,
}

impl Executor {
    /// Serial reference executor.
    pub fn reference() -> Self {
        Self::fallback(ExecutorKind::Reference)
    }

    fn fallback(requested: ExecutorKind) -> Self {
        Executor {
            requested,
            kind: ExecutorKind::Reference,
            #[cfg(feature = "rayon")]
            pool: None,
        }
    }

    /// Resolve `kind` to an available backend.
    ///
    /// `num_threads == 0` sizes the parallel pool to the number of logical cores.
    pub fn select(kind: ExecutorKind, num_threads: usize) -> Self {
        match kind {
            ExecutorKind::Reference => Self::reference(),
            ExecutorKind::Omp => Self::omp(num_threads),
            ExecutorKind::Cuda | ExecutorKind::Hip => {
                log::warn!("{kind} executor is not available in this build, falling back to reference");
                Self::fallback(kind)
            }
        }
    }

    #[cfg(feature = "rayon")]
    fn omp(num_threads: usize) -> Self {
        let threads = if num_threads == 0 { num_cpus::get() } else { num_threads };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Executor {
                requested: ExecutorKind::Omp,
                kind: ExecutorKind::Omp,
                pool: Some(Arc::new(pool)),
            },
            Err(err) => {
                log::warn!("failed to start omp thread pool ({err}), falling back to reference");
                Self::fallback(ExecutorKind::Omp)
            }
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn omp(_num_threads: usize) -> Self {
        log::warn!("omp executor requires the `rayon` feature, falling back to reference");
        Self::fallback(ExecutorKind::Omp)
    }

    /// Backend actually used.
    pub fn kind(&self) -> ExecutorKind {
        self.kind
    }

    /// Backend named in the configuration.
    pub fn requested(&self) -> ExecutorKind {
        self.requested
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether the selected backend differs from the requested one.
    pub fn is_fallback(&self) -> bool {
        self.kind != self.requested
    }

    /// Host-resident backends can wrap caller memory without a copy.
    pub fn is_host(&self) -> bool {
        matches!(self.kind, ExecutorKind::Reference | ExecutorKind::Omp)
    }

    /// Number of worker threads kernels may use.
    pub fn threads(&self) -> usize {
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                return pool.current_num_threads();
            }
        }
        1
    }
}

/// Device and application executors for one solver configuration.
#[derive(Clone, Debug)]
pub struct ExecutorHandler {
    pub device: Executor,
    pub app: Executor,
}

impl ExecutorHandler {
    pub fn new(device: ExecutorKind, app: ExecutorKind, num_threads: usize) -> Self {
        let device_exec = Executor::select(device, num_threads);
        let app_exec = if app == device {
            device_exec.clone()
        } else {
            Executor::select(app, num_threads)
        };
        ExecutorHandler { device: device_exec, app: app_exec }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!("reference".parse::<ExecutorKind>().unwrap(), ExecutorKind::Reference);
        assert_eq!("omp".parse::<ExecutorKind>().unwrap(), ExecutorKind::Omp);
        assert_eq!("cuda".parse::<ExecutorKind>().unwrap(), ExecutorKind::Cuda);
        assert_eq!("hip".parse::<ExecutorKind>().unwrap(), ExecutorKind::Hip);
        assert!(matches!("sycl".parse::<ExecutorKind>(), Err(LduError::Config(_))));
    }

    #[test]
    fn gpu_requests_fall_back_to_reference() {
        let exec = Executor::select(ExecutorKind::Cuda, 0);
        assert_eq!(exec.kind(), ExecutorKind::Reference);
        assert_eq!(exec.requested(), ExecutorKind::Cuda);
        assert!(exec.is_fallback());
        assert!(exec.is_host());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn omp_uses_requested_thread_count() {
        let exec = Executor::select(ExecutorKind::Omp, 2);
        assert_eq!(exec.kind(), ExecutorKind::Omp);
        assert_eq!(exec.threads(), 2);
    }

    #[test]
    fn handler_shares_executor_when_names_match() {
        let h = ExecutorHandler::new(ExecutorKind::Reference, ExecutorKind::Reference, 0);
        assert_eq!(h.device.name(), "reference");
        assert_eq!(h.app.name(), "reference");
    }
}

//! Solve context for LDU-addressed systems.
//!
//! `LduSolveContext` owns everything that survives between solves of a simulation
//! run: the resolved controls, the executors, the matrix cache and the
//! preconditioner cache. Each call to [`LduSolveContext::solve`]
//!
//! 1. validates the LDU arrays and computes the residual normalisation factor,
//! 2. builds, updates or reuses the field's device matrix,
//! 3. drops the cached preconditioner if the matrix changed (unless told to keep it),
//! 4. picks up the initial guess (cached or from the caller's field),
//! 5. obtains the preconditioner and generates the solver with a fresh criterion,
//! 6. runs the solve, copies the result back and returns a [`SolverPerformance`].
//!
//! # Example
//! ```rust,ignore
//! let mut ctx = LduSolveContext::from_json(r#"{"solver": "CG", "tolerance": 1e-8}"#)?;
//! let perf = ctx.solve("p", &ldu, &source, &mut psi)?;
//! ```

use crate::cache::{MatrixCache, PreconditionerCache};
use crate::config::{ResolvedControls, SolveFlags, SolverControls};
use crate::core::executor::ExecutorHandler;
use crate::core::vector::DeviceVector;
use crate::error::LduError;
use crate::matrix::ldu::LduMatrixSource;
use crate::utils::convergence::{CriterionFactory, CriterionParams, IterationObserver, SolveStats};
use crate::utils::export::export_system;
use crate::utils::timing::timed;
use std::fmt;

/// Outcome of one solve, for one field component.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverPerformance {
    pub solver_name: String,
    pub field_name: String,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:  Solving for {}, Initial residual = {:e}, Final residual = {:e}, No Iterations {}",
            self.solver_name, self.field_name, self.initial_residual, self.final_residual, self.iterations
        )
    }
}

const COMPONENTS: [&str; 3] = ["x", "y", "z"];

pub struct LduSolveContext {
    controls: SolverControls,
    resolved: ResolvedControls,
    flags: SolveFlags,
    executors: ExecutorHandler,
    matrices: MatrixCache,
    preconditioners: PreconditionerCache,
    time_name: String,
    observer: Option<IterationObserver>,
}

impl LduSolveContext {
    /// Resolve `controls` and select the executors.
    pub fn new(controls: SolverControls) -> Result<Self, LduError> {
        let resolved = controls.resolve()?;
        let executors = ExecutorHandler::new(resolved.executor, resolved.app_executor, controls.num_threads);
        log::debug!(
            "solver {} on {} (app {}), preconditioner {}",
            resolved.solver,
            executors.device.name(),
            executors.app.name(),
            resolved.preconditioner
        );
        Ok(LduSolveContext {
            flags: controls.flags(),
            controls,
            resolved,
            executors,
            matrices: MatrixCache::new(),
            preconditioners: PreconditionerCache::new(),
            time_name: "0".to_string(),
            observer: None,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, LduError> {
        Self::new(SolverControls::from_json(json)?)
    }

    /// Report every criterion evaluation as `(iteration, residual_norm)`.
    pub fn with_observer(mut self, observer: IterationObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Name of the current time step, used for export directories.
    pub fn set_time(&mut self, name: impl Into<String>) {
        self.time_name = name.into();
    }

    pub fn controls(&self) -> &SolverControls {
        &self.controls
    }

    pub fn executors(&self) -> &ExecutorHandler {
        &self.executors
    }

    pub fn matrix_cache(&self) -> &MatrixCache {
        &self.matrices
    }

    pub fn preconditioner_cache(&self) -> &PreconditionerCache {
        &self.preconditioners
    }

    /// Drop every cached artifact of `field`.
    pub fn invalidate(&mut self, field: &str) {
        self.matrices.invalidate(field);
        self.preconditioners.invalidate(field);
    }

    /// Solve `A ψ = source` for a scalar field, starting from `psi`.
    pub fn solve<S: LduMatrixSource + ?Sized>(
        &mut self,
        field: &str,
        matrix: &S,
        source: &[f64],
        psi: &mut [f64],
    ) -> Result<SolverPerformance, LduError> {
        self.check_system(matrix, source.len(), psi.len())?;
        let update = self.flags.contains(SolveFlags::UPDATE_SYS_MATRIX);
        self.prepare_matrix(field, matrix, update)?;
        self.solve_component(field, 0, field.to_string(), matrix, source, psi)
    }

    /// Solve a three-component field one component at a time.
    ///
    /// The matrix is shared by the components, so it is prepared once per call;
    /// each component keeps its own initial guess.
    pub fn solve_vector<S: LduMatrixSource + ?Sized>(
        &mut self,
        field: &str,
        matrix: &S,
        source: &[[f64; 3]],
        psi: &mut [[f64; 3]],
    ) -> Result<Vec<SolverPerformance>, LduError> {
        self.check_system(matrix, source.len(), psi.len())?;
        let update = self.flags.contains(SolveFlags::UPDATE_SYS_MATRIX);
        self.prepare_matrix(field, matrix, update)?;

        let mut performances = Vec::with_capacity(3);
        for (cmpt, suffix) in COMPONENTS.iter().enumerate() {
            let b: Vec<f64> = source.iter().map(|v| v[cmpt]).collect();
            let mut x: Vec<f64> = psi.iter().map(|v| v[cmpt]).collect();
            let name = format!("{field}{suffix}");
            performances.push(self.solve_component(field, cmpt, name, matrix, &b, &mut x)?);
            for (v, xi) in psi.iter_mut().zip(&x) {
                v[cmpt] = *xi;
            }
        }
        Ok(performances)
    }

    fn check_system<S: LduMatrixSource + ?Sized>(&self, matrix: &S, n_source: usize, n_psi: usize) -> Result<(), LduError> {
        matrix.validate()?;
        let n = matrix.n_cells();
        if n_source != n || n_psi != n {
            return Err(LduError::invalid(format!(
                "matrix has {n} cells but source has {n_source} and psi {n_psi} entries"
            )));
        }
        Ok(())
    }

    fn prepare_matrix<S: LduMatrixSource + ?Sized>(&mut self, field: &str, matrix: &S, update: bool) -> Result<(), LduError> {
        let verbose = self.flags.contains(SolveFlags::VERBOSE);
        let sort = self.flags.contains(SolveFlags::SORT);
        let exec = &self.executors.device;
        let matrices = &mut self.matrices;
        let prepared = timed(verbose, "matrix assembly", || matrices.prepare(field, matrix, exec, sort, update))?;

        let retain = self.flags.contains(SolveFlags::RETAIN_PRECONDITIONER);
        if prepared.invalidated || (prepared.action.changes_matrix() && !retain) {
            self.preconditioners.invalidate(field);
        }
        Ok(())
    }

    fn solve_component<S: LduMatrixSource + ?Sized>(
        &mut self,
        field: &str,
        cmpt: usize,
        name: String,
        matrix: &S,
        source: &[f64],
        psi: &mut [f64],
    ) -> Result<SolverPerformance, LduError> {
        let norm_factor = matrix.norm_factor(psi, source);
        let refresh = self.flags.contains(SolveFlags::UPDATE_INIT_VECTOR);
        let had_guess = self.matrices.has_guess(field, cmpt);
        let mut guess = self.matrices.checkout_guess(field, cmpt, &self.executors.app, psi, refresh);

        let stats = match self.run_solver(field, &name, norm_factor, source, &mut guess) {
            Ok(stats) => stats,
            Err(err) => {
                if had_guess {
                    self.matrices.store_guess(field, cmpt, guess);
                }
                return Err(err);
            }
        };

        let copied = guess.copy_to_host(psi);
        self.matrices.store_guess(field, cmpt, guess);
        copied?;

        let performance = SolverPerformance {
            solver_name: self.resolved.solver.name().to_string(),
            field_name: name,
            initial_residual: stats.initial_residual,
            final_residual: stats.final_residual,
            iterations: stats.iterations,
            converged: stats.converged(),
        };
        if self.flags.contains(SolveFlags::VERBOSE) {
            log::info!("{performance}");
        } else {
            log::debug!("{performance}");
        }
        Ok(performance)
    }

    /// Obtain the preconditioner, generate the solver and run it on `guess`.
    fn run_solver(
        &mut self,
        field: &str,
        name: &str,
        norm_factor: f64,
        source: &[f64],
        guess: &mut DeviceVector,
    ) -> Result<SolveStats, LduError> {
        let verbose = self.flags.contains(SolveFlags::VERBOSE);
        let a = self
            .matrices
            .matrix(field)
            .ok_or_else(|| LduError::invalid(format!("no assembled matrix for {field}")))?;
        let pc = timed(verbose, "preconditioner", || {
            self.preconditioners
                .get(field, a, self.resolved.preconditioner, self.controls.max_block_size)
        })?;

        let mut criteria = CriterionFactory::new(CriterionParams {
            absolute_tolerance: self.controls.tolerance,
            relative_tolerance: self.controls.rel_tol,
            norm_factor,
            min_iter: self.controls.min_iter,
            max_iter: self.controls.max_iter,
        });
        if let Some(observer) = &self.observer {
            criteria = criteria.with_observer(observer.clone());
        }
        let factory = self
            .resolved
            .solver
            .build(&self.executors.device, criteria, pc)
            .with_inner(
                self.resolved.inner_solver,
                self.controls.inner_reduction_factor,
                self.controls.max_block_size,
            );
        let mut solver = factory.generate(a)?;

        if self.flags.contains(SolveFlags::EXPORT) {
            export_system(&self.controls.export_dir, &self.time_name, name, a, guess.as_slice(), source)?;
        }

        // host-resident backends solve directly on the caller's source array
        let device = &self.executors.device;
        let staged;
        let b = if device.is_host() {
            source
        } else {
            staged = DeviceVector::from_host(device, source);
            staged.as_slice()
        };
        timed(verbose, "solve", || solver.apply(b, guess.as_mut_slice()))
    }
}

//! Solver controls as read from a solver dictionary.
//!
//! The `SolverControls` struct mirrors the keys of a field's solver dictionary
//! (camelCase, JSON encoded). Every key is optional; missing keys take the
//! defaults listed on the fields. Names of executors, preconditioners and methods
//! stay strings until [`SolverControls::resolve`] turns them into typed values and
//! rejects unknown names.

use crate::core::executor::ExecutorKind;
use crate::error::LduError;
use crate::preconditioner::PreconditionerKind;
use crate::solver::{InnerSolverKind, SolverKind};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On/off option accepting booleans or the words yes/no, on/off, true/false, y/n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "SwitchRepr", into = "bool")]
pub struct Switch(pub bool);

#[derive(Deserialize)]
#[serde(untagged)]
enum SwitchRepr {
    Bool(bool),
    Word(String),
}

impl TryFrom<SwitchRepr> for Switch {
    type Error = String;

    fn try_from(repr: SwitchRepr) -> Result<Self, Self::Error> {
        match repr {
            SwitchRepr::Bool(b) => Ok(Switch(b)),
            SwitchRepr::Word(w) => match w.as_str() {
                "yes" | "on" | "true" | "y" => Ok(Switch(true)),
                "no" | "off" | "false" | "n" | "none" => Ok(Switch(false)),
                other => Err(format!("'{other}' is not a valid switch")),
            },
        }
    }
}

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        s.0
    }
}

impl From<bool> for Switch {
    fn from(b: bool) -> Self {
        Switch(b)
    }
}

bitflags! {
    /// On/off controls of a solve, packed.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SolveFlags: u32 {
        const SORT                  = 0b00_0001;
        const UPDATE_SYS_MATRIX     = 0b00_0010;
        const UPDATE_INIT_VECTOR    = 0b00_0100;
        const RETAIN_PRECONDITIONER = 0b00_1000;
        const EXPORT                = 0b01_0000;
        const VERBOSE               = 0b10_0000;
    }
}

/// Solver dictionary of one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverControls {
    /// Krylov method: CG, BiCGStab or IR
    #[serde(default = "default_solver")]
    pub solver: String,

    /// Backend running the solve
    #[serde(default = "default_executor")]
    pub executor: String,

    /// Backend owning host-facing vectors
    #[serde(default = "default_executor", alias = "app_executor")]
    pub app_executor: String,

    /// none or BJ
    #[serde(default = "default_preconditioner")]
    pub preconditioner: String,

    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,

    /// Absolute tolerance on the normalised residual
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Relative tolerance; 0 disables it
    #[serde(default = "default_tolerance")]
    pub rel_tol: f64,

    #[serde(default)]
    pub min_iter: usize,

    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Sort triplets into row-major order and store the matrix as CSR
    #[serde(default = "switch_on")]
    pub sort: Switch,

    /// Reassemble matrix values on every solve
    #[serde(default = "switch_on")]
    pub update_sys_matrix: Switch,

    /// Start every solve from the caller's field instead of the cached solution
    #[serde(default)]
    pub update_init_vector: Switch,

    /// Keep the preconditioner when the matrix values change
    #[serde(default)]
    pub retain_preconditioner: Switch,

    /// Dump matrix, guess and rhs in MatrixMarket format
    #[serde(default)]
    pub export: Switch,

    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Log phase timings at info level
    #[serde(default)]
    pub verbose: Switch,

    /// Inner method of IR: CG or scalarJacobi
    #[serde(default = "default_inner_solver")]
    pub inner_solver: String,

    #[serde(default = "default_inner_reduction_factor")]
    pub inner_reduction_factor: f64,

    /// Worker threads of the omp executor; 0 uses every core
    #[serde(default)]
    pub num_threads: usize,
}

fn default_solver() -> String { "CG".to_string() }
fn default_executor() -> String { "reference".to_string() }
fn default_preconditioner() -> String { "none".to_string() }
fn default_max_block_size() -> usize { 16 }
fn default_tolerance() -> f64 { 1e-6 }
fn default_max_iter() -> usize { 1000 }
fn switch_on() -> Switch { Switch(true) }
fn default_export_dir() -> PathBuf { PathBuf::from(".") }
fn default_inner_solver() -> String { "CG".to_string() }
fn default_inner_reduction_factor() -> f64 { 1e-2 }

impl Default for SolverControls {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            executor: default_executor(),
            app_executor: default_executor(),
            preconditioner: default_preconditioner(),
            max_block_size: default_max_block_size(),
            tolerance: default_tolerance(),
            rel_tol: default_tolerance(),
            min_iter: 0,
            max_iter: default_max_iter(),
            sort: switch_on(),
            update_sys_matrix: switch_on(),
            update_init_vector: Switch(false),
            retain_preconditioner: Switch(false),
            export: Switch(false),
            export_dir: default_export_dir(),
            verbose: Switch(false),
            inner_solver: default_inner_solver(),
            inner_reduction_factor: default_inner_reduction_factor(),
            num_threads: 0,
        }
    }
}

/// Controls with every name resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedControls {
    pub solver: SolverKind,
    pub executor: ExecutorKind,
    pub app_executor: ExecutorKind,
    pub preconditioner: PreconditionerKind,
    pub inner_solver: InnerSolverKind,
}

impl SolverControls {
    /// Parse a JSON solver dictionary.
    pub fn from_json(json: &str) -> Result<Self, LduError> {
        let controls: SolverControls =
            serde_json::from_str(json).map_err(|e| LduError::config(format!("invalid solver controls: {e}")))?;
        controls.validate()?;
        Ok(controls)
    }

    /// Read a JSON solver dictionary from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LduError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Check numeric options.
    pub fn validate(&self) -> Result<(), LduError> {
        if self.max_block_size == 0 {
            return Err(LduError::config("maxBlockSize must be at least 1"));
        }
        if self.tolerance < 0.0 || self.rel_tol < 0.0 {
            return Err(LduError::config("tolerances must not be negative"));
        }
        if !(self.inner_reduction_factor > 0.0 && self.inner_reduction_factor < 1.0) {
            return Err(LduError::config("innerReductionFactor must lie in (0, 1)"));
        }
        Ok(())
    }

    pub fn flags(&self) -> SolveFlags {
        let mut flags = SolveFlags::empty();
        flags.set(SolveFlags::SORT, self.sort.0);
        flags.set(SolveFlags::UPDATE_SYS_MATRIX, self.update_sys_matrix.0);
        flags.set(SolveFlags::UPDATE_INIT_VECTOR, self.update_init_vector.0);
        flags.set(SolveFlags::RETAIN_PRECONDITIONER, self.retain_preconditioner.0);
        flags.set(SolveFlags::EXPORT, self.export.0);
        flags.set(SolveFlags::VERBOSE, self.verbose.0);
        flags
    }

    /// Resolve every name, failing on the first unknown one.
    pub fn resolve(&self) -> Result<ResolvedControls, LduError> {
        self.validate()?;
        Ok(ResolvedControls {
            solver: self.solver.parse()?,
            executor: self.executor.parse()?,
            app_executor: self.app_executor.parse()?,
            preconditioner: self.preconditioner.parse()?,
            inner_solver: self.inner_solver.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dictionary_uses_defaults() {
        let c = SolverControls::from_json("{}").unwrap();
        assert_eq!(c.solver, "CG");
        assert_eq!(c.max_block_size, 16);
        assert_eq!(c.max_iter, 1000);
        assert!(c.sort.0 && c.update_sys_matrix.0);
        assert!(!c.update_init_vector.0 && !c.export.0 && !c.verbose.0);
        assert_eq!(c.flags(), SolveFlags::SORT | SolveFlags::UPDATE_SYS_MATRIX);
        let r = c.resolve().unwrap();
        assert_eq!(r.preconditioner, PreconditionerKind::None);
        assert_eq!(r.executor, ExecutorKind::Reference);
    }

    #[test]
    fn switches_accept_words_and_booleans() {
        let c = SolverControls::from_json(
            r#"{"sort": "no", "updateSysMatrix": false, "updateInitVector": "yes",
                "export": "on", "verbose": true, "app_executor": "omp"}"#,
        )
        .unwrap();
        assert!(!c.sort.0);
        assert!(!c.update_sys_matrix.0);
        assert!(c.update_init_vector.0);
        assert!(c.export.0);
        assert!(c.verbose.0);
        assert_eq!(c.app_executor, "omp");
        assert!(SolverControls::from_json(r#"{"sort": "maybe"}"#).is_err());
    }

    #[test]
    fn unknown_names_fail_on_resolve() {
        for json in [
            r#"{"preconditioner": "ILU"}"#,
            r#"{"solver": "GMRES"}"#,
            r#"{"innerSolver": "Jacobi"}"#,
            r#"{"executor": "sycl"}"#,
        ] {
            let c = SolverControls::from_json(json).unwrap();
            assert!(matches!(c.resolve(), Err(LduError::Config(_))), "{json}");
        }
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(SolverControls::from_json(r#"{"maxBlockSize": 0}"#).is_err());
        assert!(SolverControls::from_json(r#"{"innerReductionFactor": 2.0}"#).is_err());
    }
}

//! Preconditioners for linear solvers.
//!
//! This module defines the [`Preconditioner`] trait and the block-Jacobi
//! implementation generated from an assembled [`DeviceMatrix`](crate::matrix::DeviceMatrix).

use crate::error::LduError;
use std::fmt;
use std::str::FromStr;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<T>: Send + Sync {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &[T], z: &mut [T]) -> Result<(), LduError>;
}

pub mod block_jacobi;
pub use block_jacobi::BlockJacobi;

/// Preconditioner named in the solver controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionerKind {
    /// No preconditioning
    None,
    /// Block-Jacobi with contiguous diagonal blocks
    BlockJacobi,
}

impl PreconditionerKind {
    pub fn name(self) -> &'static str {
        match self {
            PreconditionerKind::None => "none",
            PreconditionerKind::BlockJacobi => "BJ",
        }
    }
}

impl fmt::Display for PreconditionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PreconditionerKind {
    type Err = LduError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "None" => Ok(PreconditionerKind::None),
            "BJ" | "bj" | "blockJacobi" => Ok(PreconditionerKind::BlockJacobi),
            other => Err(LduError::config(format!(
                "unknown preconditioner '{other}' (expected none or BJ)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_preconditioner_names() {
        assert_eq!("none".parse::<PreconditionerKind>().unwrap(), PreconditionerKind::None);
        assert_eq!("BJ".parse::<PreconditionerKind>().unwrap(), PreconditionerKind::BlockJacobi);
        match "ILU".parse::<PreconditionerKind>() {
            Err(LduError::Config(msg)) => assert!(msg.contains("ILU")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}

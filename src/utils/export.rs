//! MatrixMarket dumps of assembled systems.
//!
//! Files are written to `<dir>/<time>/<field>_A.mtx`, `<field>_x0.mtx` and
//! `<field>_b.mtx`. The matrix uses the coordinate format with one-based indices,
//! the vectors use the array format.

use crate::error::LduError;
use crate::matrix::device::DeviceMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write `a` in coordinate format.
pub fn write_matrix(path: &Path, a: &DeviceMatrix) -> Result<(), LduError> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(w, "{} {} {}", a.nrows(), a.nrows(), a.nnz())?;
    let mut result = Ok(());
    a.inner().for_each_entry(&mut |i, j, v| {
        if result.is_ok() {
            result = writeln!(w, "{} {} {:e}", i + 1, j + 1, v);
        }
    });
    result?;
    w.flush()?;
    Ok(())
}

/// Write `v` as a dense column.
pub fn write_vector(path: &Path, v: &[f64]) -> Result<(), LduError> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "%%MatrixMarket matrix array real general")?;
    writeln!(w, "{} 1", v.len())?;
    for x in v {
        writeln!(w, "{x:e}")?;
    }
    w.flush()?;
    Ok(())
}

/// Dump matrix, initial guess and right-hand side of one solve.
/// Returns the directory written to.
pub fn export_system(
    dir: &Path,
    time: &str,
    field: &str,
    a: &DeviceMatrix,
    x0: &[f64],
    b: &[f64],
) -> Result<PathBuf, LduError> {
    let out = dir.join(time);
    fs::create_dir_all(&out)?;
    write_matrix(&out.join(format!("{field}_A.mtx")), a)?;
    write_vector(&out.join(format!("{field}_x0.mtx")), x0)?;
    write_vector(&out.join(format!("{field}_b.mtx")), b)?;
    log::debug!("{field}: exported system to {}", out.display());
    Ok(out)
}

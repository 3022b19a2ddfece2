//! Device-resident vectors.

use crate::core::executor::Executor;
use crate::error::LduError;

/// A vector living on a compute backend.
///
/// Initial-guess vectors are created from caller-owned host memory and may be kept
/// in the cache across solves; the result of a solve is copied back to host memory
/// with [`DeviceVector::copy_to_host`].
#[derive(Clone, Debug)]
pub struct DeviceVector {
    exec: Executor,
    values: Vec<f64>,
}

impl DeviceVector {
    /// Copy `host` onto `exec`.
    pub fn from_host(exec: &Executor, host: &[f64]) -> Self {
        DeviceVector { exec: exec.clone(), values: host.to_vec() }
    }

    pub fn zeros(exec: &Executor, n: usize) -> Self {
        DeviceVector { exec: exec.clone(), values: vec![0.0; n] }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn executor(&self) -> &Executor {
        &self.exec
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Write the device values into `host`.
    pub fn copy_to_host(&self, host: &mut [f64]) -> Result<(), LduError> {
        LduError::check_len(self.values.len(), host.len())?;
        host.copy_from_slice(&self.values);
        Ok(())
    }
}

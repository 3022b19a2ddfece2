use thiserror::Error;

// Unified error type for ldubridge

#[derive(Error, Debug)]
pub enum LduError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("topology mismatch: expected {expected} entries, found {found}")]
    TopologyMismatch { expected: usize, found: usize },
    #[error("invalid LDU system: {0}")]
    InvalidSystem(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}

impl LduError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        LduError::Config(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LduError::InvalidSystem(msg.into())
    }

    /// Length check shared by every place that pairs an array with a cached topology.
    pub(crate) fn check_len(expected: usize, found: usize) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(LduError::TopologyMismatch { expected, found })
        }
    }
}

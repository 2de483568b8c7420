use std::io;
use thiserror::Error;

/// Errors raised by the signal-fitting engine and its input readers.
///
/// Numerical soft failures (optimizer evaluation limits, NNLS iteration
/// caps) are not errors; they surface as a [`crate::pipeline::Termination`].
#[derive(Error, Debug)]
pub enum FitError {
    #[error("hsvd: invalid winSize {size} for vector of {len} points")]
    InvalidWindowSize { size: usize, len: usize },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}


//! Error types for the porosity-wave simulator
//!
//! Every failure in the library is terminal for the run: configuration
//! problems are reported before any work starts, numerical failures abort
//! the current step, and I/O failures surface immediately.

use std::path::PathBuf;
use thiserror::Error;

/// Simulation error
#[derive(Error, Debug)]
pub enum SimError {
    /// Missing or invalid parameter
    #[error("configuration error: {0}")]
    Config(String),

    /// File system failure, tagged with the offending path
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// Invalid or inconsistent mesh
    #[error("mesh error: {0}")]
    Mesh(String),

    /// Vector length does not match the function space
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// I - ∇u is singular or produced non-finite values
    #[error("degenerate deformation: {0}")]
    Deformation(String),

    /// Zero pivot encountered during factorisation
    #[error("singular matrix (zero pivot in column {pivot})")]
    SingularMatrix { pivot: usize },

    /// Newton iteration cap reached
    #[error("Newton solver did not converge after {iterations} iterations (|R| = {residual:.3e})")]
    NonConvergence { iterations: usize, residual: f64 },
}

impl SimError {
    /// Wrap an I/O error together with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimError>;

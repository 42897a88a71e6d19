//! Error types for the jjsim junction simulator.
//!
//! This module provides a unified error type [`JjsimError`] that covers
//! invalid model parameters, numerical failures during integration and
//! matrix inversion, and the I/O failures of the sweep drivers.

use thiserror::Error;

/// Result type alias using [`JjsimError`].
pub type Result<T> = std::result::Result<T, JjsimError>;

/// Unified error type for all jjsim operations.
#[derive(Error, Debug)]
pub enum JjsimError {
    // ============ Configuration Errors ============
    /// Invalid physical or configuration parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // ============ Numerical Errors ============
    /// A vector or matrix had an unexpected size
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// Matrix pivot fell below the singularity tolerance
    #[error("Singular matrix - pivot {pivot} has magnitude {magnitude:.2e}")]
    SingularMatrix { pivot: usize, magnitude: f64 },

    /// The averaging window of a bias-current run holds no samples
    #[error("Settling window is empty: {steps} steps with fraction {fraction} (increase the duration)")]
    SettlingWindow { steps: usize, fraction: f64 },

    // ============ I/O Errors ============
    /// Error writing a data file
    #[error("Failed to write data file '{path}': {source}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl JjsimError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    /// Create a file write error
    pub fn file_write(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileWriteError {
            path: path.into(),
            source,
        }
    }
}

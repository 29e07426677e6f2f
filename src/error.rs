//! Error types for the crest-solver library
//!
//! This module provides the main error and result types used throughout the
//! library. All errors use the `thiserror` crate for automatic trait
//! implementations.
//!
//! # Error Hierarchy
//!
//! The library uses a hierarchical error system where:
//! - **`CrestSolverError`** is the top-level error exposed to users via public APIs
//! - **Module errors** (`FunctionError`, `LinAlgError`, `OptimizerError`) are
//!   wrapped inside CrestSolverError
//! - **Error sources** are preserved, allowing full error chain inspection

use crate::{functions::FunctionError, linalg::LinAlgError, optimizer::OptimizerError};
use std::error::Error as StdError;
use thiserror::Error;

/// Main result type used throughout the crest-solver library
pub type CrestSolverResult<T> = Result<T, CrestSolverError>;

/// Main error type for the crest-solver library
///
/// This is the top-level error type exposed by public APIs. It wraps
/// module-specific errors while preserving the full error chain for debugging.
#[derive(Debug, Error)]
pub enum CrestSolverError {
    /// User callback errors (residuals, Jacobians)
    #[error(transparent)]
    Function(#[from] FunctionError),

    /// Linear algebra errors
    #[error(transparent)]
    LinearAlgebra(#[from] LinAlgError),

    /// Optimization algorithm errors
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

impl CrestSolverError {
    /// Get the full error chain as a string for logging and debugging.
    ///
    /// This method traverses the error source chain and returns a formatted
    /// string showing the hierarchy of errors from the top-level error down to
    /// the root cause.
    pub fn chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(format!("  → {err}"));
            source = err.source();
        }

        chain.join("\n")
    }

    /// Get a compact single-line error chain for logging
    ///
    /// Similar to `chain()` but formats as a single line with arrow separators.
    pub fn chain_compact(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }

        chain.join(" → ")
    }
}

//! Optimization drivers.
//!
//! - [`TrustRegionDriver`]: the trust region state machine, parameterized by
//!   an [`OptimizationModel`](model::OptimizationModel) (least squares or
//!   general minimization) and an
//!   [`UpdateStrategy`](crate::update::UpdateStrategy) (Cauchy or Dogleg)
//! - [`LevenbergDriver`]: a dampened Levenberg-Marquardt companion sharing
//!   the same model and Hessian seams

pub mod levenberg;
pub mod model;
pub mod trust_region;

use crate::{functions, linalg};
use thiserror::Error;
use tracing::error;

pub use levenberg::{LevenbergConfig, LevenbergDriver};
pub use trust_region::{RegionInitial, TrustRegionConfig, TrustRegionDriver};

/// Optimizer-specific error types for crest-solver
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid optimization parameters provided
    #[error("Invalid optimization parameters: {0}")]
    InvalidParameters(String),

    /// Numerical instability detected (NaN or Inf in cost, gradient, or
    /// derived quantities)
    #[error("Numerical instability detected: {0}")]
    NumericalInstability(String),

    /// Linear algebra operation failed
    #[error("Linear algebra error: {0}")]
    LinAlg(#[from] linalg::LinAlgError),

    /// User callback failed
    #[error("Function evaluation error: {0}")]
    Function(#[from] functions::FunctionError),
}

impl OptimizerError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// This method allows for a consistent error logging pattern throughout
    /// the optimizer module, ensuring all errors are properly recorded.
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error with the original source error from a third-party library
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for optimizer operations
pub type OptimizerResult<T> = Result<T, OptimizerError>;

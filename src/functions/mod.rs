//! User-supplied function interfaces.
//!
//! Two kinds of problems are supported:
//!
//! - **Nonlinear least squares**: the user provides residuals and their
//!   Jacobian through [`LeastSquaresFunction`]. The Jacobian type is
//!   backend-specific (dense `Mat`, sparse CSC, or the two-piece
//!   [`SchurJacobian`](crate::hessian::SchurJacobian)).
//! - **General minimization**: the user provides the cost together with its
//!   gradient and Hessian through [`MinimizationFunction`].
//!
//! Residual evaluation is split into `set_input` / `residuals` / `jacobian`
//! so a callback can share intermediate state between the residual and
//! Jacobian computations at the same input.

pub mod numerical;

use faer::Mat;
use thiserror::Error;
use tracing::error;

pub use numerical::ForwardDifferenceJacobian;

/// Errors raised by user callbacks.
#[derive(Debug, Clone, Error)]
pub enum FunctionError {
    /// Jacobian could not be evaluated or assembled
    #[error("Jacobian evaluation failed: {0}")]
    Jacobian(String),

    /// Input or output dimensions do not match the function's declaration
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl FunctionError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// Result type for user callback operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// A vector-valued function `r(x): ℝᴺ → ℝᴹ`.
///
/// `set_input` fixes the evaluation point; `residuals` then writes `r(x)`.
/// Implementations may cache work between the two calls.
pub trait ResidualFunction {
    /// Number of parameters N
    fn num_parameters(&self) -> usize;

    /// Number of residuals M
    fn num_residuals(&self) -> usize;

    /// Set the point at which residuals and the Jacobian are evaluated
    fn set_input(&mut self, x: &Mat<f64>);

    /// Write the residual vector at the current input into `residuals` (M×1)
    fn residuals(&mut self, residuals: &mut Mat<f64>);
}

/// A residual function with a coupled Jacobian.
///
/// `jacobian()` evaluates `∂r/∂x` at the input set by the most recent
/// `set_input` call. It must not change the residual state.
pub trait LeastSquaresFunction: ResidualFunction {
    /// Backend-specific Jacobian representation
    type Jacobian;

    /// Evaluate the M×N Jacobian at the current input
    fn jacobian(&mut self) -> FunctionResult<Self::Jacobian>;
}

/// A scalar function with user-supplied derivatives, for general
/// unconstrained minimization.
pub trait MinimizationFunction {
    /// Number of parameters N
    fn num_parameters(&self) -> usize;

    /// Cost at `x`
    fn cost(&mut self, x: &Mat<f64>) -> f64;

    /// Write the gradient (N×1) and Hessian (N×N) at `x`.
    ///
    /// When `same_state_as_cost` is true, `x` is unchanged since the most
    /// recent `cost` call and values cached there may be reused.
    fn gradient_hessian(
        &mut self,
        x: &Mat<f64>,
        same_state_as_cost: bool,
        gradient: &mut Mat<f64>,
        hessian: &mut Mat<f64>,
    );
}

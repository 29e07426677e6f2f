//! Forward-difference Jacobian fallback.
//!
//! Wraps a residual-only function and estimates the Jacobian column by
//! column: `J_j = (r(x + εⱼ eⱼ) − r(x)) / εⱼ` with
//! `εⱼ = √eps · max(1, |xⱼ|)`. Intended for prototyping and for problems
//! where an analytic Jacobian is not worth the effort; the accuracy is
//! limited to roughly half the significant digits of the residuals.

use crate::functions::{FunctionResult, LeastSquaresFunction, ResidualFunction};
use faer::Mat;

/// Numerical Jacobian adapter. Produces a dense Jacobian.
pub struct ForwardDifferenceJacobian<F: ResidualFunction> {
    function: F,
    /// Evaluation point set through `set_input`
    x: Mat<f64>,
    /// Residuals at `x`
    r0: Mat<f64>,
    /// Residuals at the perturbed point
    r_step: Mat<f64>,
}

impl<F: ResidualFunction> ForwardDifferenceJacobian<F> {
    pub fn new(function: F) -> Self {
        let n = function.num_parameters();
        let m = function.num_residuals();
        Self {
            function,
            x: Mat::zeros(n, 1),
            r0: Mat::zeros(m, 1),
            r_step: Mat::zeros(m, 1),
        }
    }

    /// Access the wrapped function
    pub fn inner(&self) -> &F {
        &self.function
    }
}

impl<F: ResidualFunction> ResidualFunction for ForwardDifferenceJacobian<F> {
    fn num_parameters(&self) -> usize {
        self.function.num_parameters()
    }

    fn num_residuals(&self) -> usize {
        self.function.num_residuals()
    }

    fn set_input(&mut self, x: &Mat<f64>) {
        self.x = x.clone();
        self.function.set_input(x);
    }

    fn residuals(&mut self, residuals: &mut Mat<f64>) {
        self.function.residuals(residuals);
    }
}

impl<F: ResidualFunction> LeastSquaresFunction for ForwardDifferenceJacobian<F> {
    type Jacobian = Mat<f64>;

    fn jacobian(&mut self) -> FunctionResult<Self::Jacobian> {
        let n = self.function.num_parameters();
        let m = self.function.num_residuals();
        let sqrt_eps = f64::EPSILON.sqrt();

        let base = self.x.clone();
        self.function.residuals(&mut self.r0);

        let mut jacobian = Mat::zeros(m, n);
        let mut x_perturbed = base.clone();
        for j in 0..n {
            let epsilon = sqrt_eps * base[(j, 0)].abs().max(1.0);
            x_perturbed[(j, 0)] = base[(j, 0)] + epsilon;

            self.function.set_input(&x_perturbed);
            self.function.residuals(&mut self.r_step);
            for i in 0..m {
                jacobian[(i, j)] = (self.r_step[(i, 0)] - self.r0[(i, 0)]) / epsilon;
            }

            x_perturbed[(j, 0)] = base[(j, 0)];
        }

        // leave the wrapped function at the original input
        self.function.set_input(&base);
        Ok(jacobian)
    }
}

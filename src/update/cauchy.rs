//! Cauchy point update.
//!
//! The step lies along the normalized steepest-descent direction
//! `ĝ = g/‖g‖`. With `c = ĝᵀ H ĝ`, the model minimizer along that ray sits
//! at distance `‖g‖/c`; when the model is non-convex along the gradient
//! (`c ≤ 0`) the best the region allows is its boundary. Working with the
//! normalized direction keeps the intermediates well conditioned for badly
//! scaled gradients, and reformulating the predicted reduction as
//! `τ̄(‖g‖ − τ̄c/2)` avoids the Δ³ term of the textbook form.

use crate::hessian::HessianOperator;
use crate::optimizer::{OptimizerError, OptimizerResult};
use faer::Mat;

pub struct CauchyUpdate {
    /// Normalized steepest descent direction `g/‖g‖`
    direction: Mat<f64>,
    gradient_norm: f64,
    /// Curvature along the direction, `ĝᵀ H ĝ`
    gbg: f64,
    predicted_reduction: f64,
    step_length: f64,
}

impl CauchyUpdate {
    pub fn new() -> Self {
        Self {
            direction: Mat::zeros(0, 1),
            gradient_norm: 0.0,
            gbg: 0.0,
            predicted_reduction: 0.0,
            step_length: 0.0,
        }
    }

    pub fn initialize(&mut self, num_parameters: usize) {
        self.direction = Mat::zeros(num_parameters, 1);
    }

    pub fn initialize_update<H: HessianOperator>(
        &mut self,
        hessian: &mut H,
        gradient: &Mat<f64>,
        gradient_norm: f64,
    ) -> OptimizerResult<()> {
        self.gradient_norm = gradient_norm;
        for i in 0..gradient.nrows() {
            self.direction[(i, 0)] = gradient[(i, 0)] / gradient_norm;
        }

        self.gbg = hessian.inner_vector_hessian(&self.direction);
        if !self.gbg.is_finite() {
            return Err(OptimizerError::NumericalInstability(format!(
                "curvature along the gradient is not finite: {}",
                self.gbg
            ))
            .log());
        }
        Ok(())
    }

    pub fn compute_update(&mut self, p: &mut Mat<f64>, region_radius: f64) {
        // boundary when the model is non-convex along the gradient,
        // otherwise the model minimizer capped by the region
        let distance = if self.gbg <= 0.0 {
            region_radius
        } else {
            region_radius.min(self.gradient_norm / self.gbg)
        };

        for i in 0..self.direction.nrows() {
            p[(i, 0)] = -distance * self.direction[(i, 0)];
        }

        self.step_length = distance;
        self.predicted_reduction =
            distance * self.gradient_norm - 0.5 * distance * distance * self.gbg;
    }

    pub fn predicted_reduction(&self) -> f64 {
        self.predicted_reduction
    }

    pub fn step_length(&self) -> f64 {
        self.step_length
    }
}

impl Default for CauchyUpdate {
    fn default() -> Self {
        Self::new()
    }
}

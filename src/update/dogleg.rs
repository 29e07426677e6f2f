//! Powell's Dogleg update.
//!
//! When the Hessian is positive definite the exact trust-region path is
//! approximated by two segments: from the origin to the Cauchy point, then
//! from the Cauchy point to the Gauss-Newton point. Three cases follow from
//! the region radius:
//!
//! - the Gauss-Newton point is inside the region: take it
//! - the Cauchy point is already outside: truncated steepest descent
//! - otherwise: the intersection of the second segment with the boundary
//!
//! When the Hessian is not positive definite (the solve failed, or the
//! curvature along the gradient is non-positive) the step falls back to
//! steepest descent truncated at the boundary.
//!
//! The Gauss-Newton point is computed once per linearization in
//! `initialize_update`; retries after rejected steps only re-run the cheap
//! geometric selection.

use crate::hessian::HessianOperator;
use crate::linalg::ops;
use crate::optimizer::{OptimizerError, OptimizerResult};
use crate::update::predicted_reduction_full;
use faer::Mat;

pub struct DoglegUpdate {
    /// Normalized steepest descent direction `g/‖g‖`
    direction: Mat<f64>,
    gradient_norm: f64,
    /// Curvature along the direction, `ĝᵀ H ĝ`
    gbg: f64,
    /// Solve succeeded and the curvature along the gradient is positive
    positive_definite: bool,
    /// Gauss-Newton step `−H⁻¹ g`
    step_gn: Mat<f64>,
    distance_gn: f64,
    /// Length of the unconstrained Cauchy step `‖g‖/(ĝᵀHĝ)`
    distance_cauchy: f64,
    /// Cauchy point and segment scratch for the combined step
    point_cauchy: Mat<f64>,
    segment: Mat<f64>,
    predicted_reduction: f64,
    step_length: f64,
}

impl DoglegUpdate {
    pub fn new() -> Self {
        Self {
            direction: Mat::zeros(0, 1),
            gradient_norm: 0.0,
            gbg: 0.0,
            positive_definite: false,
            step_gn: Mat::zeros(0, 1),
            distance_gn: 0.0,
            distance_cauchy: 0.0,
            point_cauchy: Mat::zeros(0, 1),
            segment: Mat::zeros(0, 1),
            predicted_reduction: 0.0,
            step_length: 0.0,
        }
    }

    pub fn initialize(&mut self, num_parameters: usize) {
        self.direction = Mat::zeros(num_parameters, 1);
        self.step_gn = Mat::zeros(num_parameters, 1);
        self.point_cauchy = Mat::zeros(num_parameters, 1);
        self.segment = Mat::zeros(num_parameters, 1);
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

        self.positive_definite = false;
        if self.gbg > 0.0 {
            // a failed factorization is fatal; a failed solve only means the
            // Gauss-Newton point is unavailable this iteration
            hessian.initialize_solver()?;
            if hessian.solve(gradient, &mut self.step_gn) {
                for i in 0..self.step_gn.nrows() {
                    self.step_gn[(i, 0)] = -self.step_gn[(i, 0)];
                }
                self.distance_gn = self.step_gn.norm_l2();
                self.distance_cauchy = gradient_norm / self.gbg;
                self.positive_definite = true;
            }
        }
        Ok(())
    }

    pub fn compute_update<H: HessianOperator>(
        &mut self,
        hessian: &H,
        gradient: &Mat<f64>,
        p: &mut Mat<f64>,
        region_radius: f64,
    ) {
        if self.positive_definite {
            if self.distance_gn <= region_radius {
                self.gauss_newton_step(hessian, gradient, p);
            } else if self.distance_cauchy >= region_radius {
                self.cauchy_step(p, region_radius);
            } else {
                self.combined_step(hessian, gradient, p, region_radius);
            }
        } else {
            // steepest descent to the boundary for non-positive-definite
            // systems
            self.cauchy_step(p, region_radius);
        }
    }

    /// Full Gauss-Newton step, strictly inside the region.
    fn gauss_newton_step<H: HessianOperator>(
        &mut self,
        hessian: &H,
        gradient: &Mat<f64>,
        p: &mut Mat<f64>,
    ) {
        for i in 0..self.step_gn.nrows() {
            p[(i, 0)] = self.step_gn[(i, 0)];
        }
        self.step_length = self.distance_gn;
        self.predicted_reduction = predicted_reduction_full(hessian, gradient, p);
    }

    /// Steepest descent truncated at the region boundary.
    fn cauchy_step(&mut self, p: &mut Mat<f64>, region_radius: f64) {
        for i in 0..self.direction.nrows() {
            p[(i, 0)] = -region_radius * self.direction[(i, 0)];
        }
        self.step_length = region_radius;
        self.predicted_reduction = region_radius * self.gradient_norm
            - 0.5 * region_radius * region_radius * self.gbg;
    }

    /// Intersection of the Cauchy→Gauss-Newton segment with the boundary.
    fn combined_step<H: HessianOperator>(
        &mut self,
        hessian: &H,
        gradient: &Mat<f64>,
        p: &mut Mat<f64>,
        region_radius: f64,
    ) {
        for i in 0..self.direction.nrows() {
            self.point_cauchy[(i, 0)] = -self.distance_cauchy * self.direction[(i, 0)];
            self.segment[(i, 0)] = self.step_gn[(i, 0)] - self.point_cauchy[(i, 0)];
        }

        // ‖p_c + t·v‖² = Δ² as a·t² + 2b·t + c = 0; the two root forms avoid
        // cancellation depending on the sign of b
        let a = ops::dot(&self.segment, &self.segment);
        let b = ops::dot(&self.point_cauchy, &self.segment);
        let c = self.distance_cauchy * self.distance_cauchy - region_radius * region_radius;
        let discriminant = (b * b - a * c).max(0.0);

        let t = if a == 0.0 {
            1.0
        } else {
            let root = discriminant.sqrt();
            if b <= 0.0 {
                (-b + root) / a
            } else {
                -c / (b + root)
            }
        };
        let t = t.clamp(0.0, 1.0);

        for i in 0..p.nrows() {
            p[(i, 0)] = self.point_cauchy[(i, 0)] + t * self.segment[(i, 0)];
        }
        self.step_length = region_radius;
        self.predicted_reduction = predicted_reduction_full(hessian, gradient, p);
    }

    pub fn predicted_reduction(&self) -> f64 {
        self.predicted_reduction
    }

    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    pub fn is_positive_definite(&self) -> bool {
        self.positive_definite
    }
}

impl Default for DoglegUpdate {
    fn default() -> Self {
        Self::new()
    }
}

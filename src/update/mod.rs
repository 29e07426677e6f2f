//! Parameter-update strategies for the trust region driver.
//!
//! A strategy answers one question per iteration: given the gradient, the
//! Hessian, and the region radius Δ, what step `p` should be taken, what
//! reduction does the quadratic model predict for it, and how long is it?
//!
//! Two strategies are provided, selected through the [`UpdateStrategy`]
//! variants:
//!
//! - [`CauchyUpdate`]: the minimizer of the quadratic model along steepest
//!   descent, restricted to the region
//! - [`DoglegUpdate`]: Powell's two-segment path from the Cauchy point to
//!   the Gauss-Newton point
//!
//! The expensive work (factorizing the Hessian, solving for the Gauss-Newton
//! point) happens once per linearization in `initialize_update`;
//! `compute_update` is then cheap and can be retried with shrinking radii
//! after rejected steps.

pub mod cauchy;
pub mod dogleg;

use crate::hessian::HessianOperator;
use crate::linalg::ops;
use crate::optimizer::OptimizerResult;
use faer::Mat;

pub use cauchy::CauchyUpdate;
pub use dogleg::DoglegUpdate;

/// Predicted reduction of the quadratic model for a step `p`:
/// `m(0) − m(p) = −gᵀp − ½ pᵀHp`.
pub(crate) fn predicted_reduction_full<H: HessianOperator>(
    hessian: &H,
    gradient: &Mat<f64>,
    p: &Mat<f64>,
) -> f64 {
    -ops::dot(gradient, p) - 0.5 * hessian.inner_vector_hessian(p)
}

/// Tagged choice of update strategy.
///
/// Both variants are stateless between iterations apart from per-iteration
/// scratch, so the choice is a plain enum rather than a trait object.
pub enum UpdateStrategy {
    Cauchy(CauchyUpdate),
    Dogleg(DoglegUpdate),
}

impl UpdateStrategy {
    pub fn cauchy() -> Self {
        Self::Cauchy(CauchyUpdate::new())
    }

    pub fn dogleg() -> Self {
        Self::Dogleg(DoglegUpdate::new())
    }

    /// Reshape scratch storage for a problem with `num_parameters` unknowns.
    pub fn initialize(&mut self, num_parameters: usize) {
        match self {
            Self::Cauchy(update) => update.initialize(num_parameters),
            Self::Dogleg(update) => update.initialize(num_parameters),
        }
    }

    /// Per-linearization setup. Called once after each gradient/Hessian
    /// evaluation, before the first `compute_update` at that point.
    pub fn initialize_update<H: HessianOperator>(
        &mut self,
        hessian: &mut H,
        gradient: &Mat<f64>,
        gradient_norm: f64,
    ) -> OptimizerResult<()> {
        match self {
            Self::Cauchy(update) => update.initialize_update(hessian, gradient, gradient_norm),
            Self::Dogleg(update) => update.initialize_update(hessian, gradient, gradient_norm),
        }
    }

    /// Compute the step `p` for the given region radius.
    pub fn compute_update<H: HessianOperator>(
        &mut self,
        hessian: &H,
        gradient: &Mat<f64>,
        p: &mut Mat<f64>,
        region_radius: f64,
    ) {
        match self {
            Self::Cauchy(update) => update.compute_update(p, region_radius),
            Self::Dogleg(update) => update.compute_update(hessian, gradient, p, region_radius),
        }
    }

    /// Model-predicted reduction of the most recent step.
    pub fn predicted_reduction(&self) -> f64 {
        match self {
            Self::Cauchy(update) => update.predicted_reduction(),
            Self::Dogleg(update) => update.predicted_reduction(),
        }
    }

    /// `‖p‖` of the most recent step.
    pub fn step_length(&self) -> f64 {
        match self {
            Self::Cauchy(update) => update.step_length(),
            Self::Dogleg(update) => update.step_length(),
        }
    }
}

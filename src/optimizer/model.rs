//! The model seam between drivers and user functions.
//!
//! A driver only ever asks two things of the problem: the cost at a point,
//! and the gradient/Hessian pair at a point. [`OptimizationModel`] carries
//! those plus the cost-based convergence test, whose natural form differs
//! between problem families.
//!
//! [`LeastSquaresModel`] derives all three from a residual function
//! (`fx = ½‖r‖²`, `g = Jᵀr`, `H = JᵀJ` through the Hessian backend);
//! [`MinimizationModel`] passes the user's own cost and derivatives through.

use crate::functions::{LeastSquaresFunction, MinimizationFunction};
use crate::hessian::{DenseHessian, HessianOperator};
use crate::optimizer::OptimizerResult;
use faer::Mat;
use std::marker::PhantomData;

/// What the drivers need from an optimization problem.
pub trait OptimizationModel {
    /// Hessian backend used by this model
    type Hessian: HessianOperator;

    /// Number of parameters N
    fn num_parameters(&self) -> usize;

    /// Cost at `x`
    fn cost(&mut self, x: &Mat<f64>) -> OptimizerResult<f64>;

    /// Gradient and Hessian at `x`.
    ///
    /// `same_state_as_cost` is true when `x` is unchanged since the most
    /// recent `cost` call, allowing cached values to be reused.
    fn gradient_hessian(
        &mut self,
        x: &Mat<f64>,
        same_state_as_cost: bool,
        gradient: &mut Mat<f64>,
        hessian: &mut Self::Hessian,
    ) -> OptimizerResult<()>;

    /// Cost-based convergence test for an accepted step.
    ///
    /// The default is the relative least-squares form; models may override
    /// with whatever their problem family defines.
    fn converged_cost(&self, fx_prev: f64, fx_candidate: f64, ftol: f64) -> bool {
        fx_prev - fx_candidate <= ftol * fx_prev.max(fx_candidate.abs())
    }
}

/// Least-squares model over a coupled residual/Jacobian function.
///
/// The Hessian backend is chosen by the type parameter; it must consume the
/// Jacobian representation the function produces.
pub struct LeastSquaresModel<F, H>
where
    F: LeastSquaresFunction,
    H: HessianOperator<Jacobian = F::Jacobian>,
{
    function: F,
    residuals: Mat<f64>,
    _hessian: PhantomData<H>,
}

impl<F, H> LeastSquaresModel<F, H>
where
    F: LeastSquaresFunction,
    H: HessianOperator<Jacobian = F::Jacobian>,
{
    pub fn new(function: F) -> Self {
        let m = function.num_residuals();
        Self {
            function,
            residuals: Mat::zeros(m, 1),
            _hessian: PhantomData,
        }
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    /// Residuals at the most recently evaluated point
    pub fn residuals(&self) -> &Mat<f64> {
        &self.residuals
    }
}

impl<F, H> OptimizationModel for LeastSquaresModel<F, H>
where
    F: LeastSquaresFunction,
    H: HessianOperator<Jacobian = F::Jacobian>,
{
    type Hessian = H;

    fn num_parameters(&self) -> usize {
        self.function.num_parameters()
    }

    fn cost(&mut self, x: &Mat<f64>) -> OptimizerResult<f64> {
        self.function.set_input(x);
        self.function.residuals(&mut self.residuals);
        let norm = self.residuals.norm_l2();
        Ok(0.5 * norm * norm)
    }

    fn gradient_hessian(
        &mut self,
        x: &Mat<f64>,
        same_state_as_cost: bool,
        gradient: &mut Mat<f64>,
        hessian: &mut Self::Hessian,
    ) -> OptimizerResult<()> {
        if !same_state_as_cost {
            self.function.set_input(x);
            self.function.residuals(&mut self.residuals);
        }
        let jacobian = self.function.jacobian()?;
        hessian.compute_hessian(&jacobian)?;
        hessian.compute_gradient(&jacobian, &self.residuals, gradient);
        Ok(())
    }
}

/// General minimization model over user-supplied derivatives.
///
/// Fixed to the dense backend: the callback writes the Hessian matrix
/// directly.
pub struct MinimizationModel<F: MinimizationFunction> {
    function: F,
}

impl<F: MinimizationFunction> MinimizationModel<F> {
    pub fn new(function: F) -> Self {
        Self { function }
    }

    pub fn function(&self) -> &F {
        &self.function
    }
}

impl<F: MinimizationFunction> OptimizationModel for MinimizationModel<F> {
    type Hessian = DenseHessian;

    fn num_parameters(&self) -> usize {
        self.function.num_parameters()
    }

    fn cost(&mut self, x: &Mat<f64>) -> OptimizerResult<f64> {
        Ok(self.function.cost(x))
    }

    fn gradient_hessian(
        &mut self,
        x: &Mat<f64>,
        same_state_as_cost: bool,
        gradient: &mut Mat<f64>,
        hessian: &mut Self::Hessian,
    ) -> OptimizerResult<()> {
        self.function
            .gradient_hessian(x, same_state_as_cost, gradient, hessian.matrix_mut());
        Ok(())
    }
}

//! Dampened Levenberg-Marquardt driver.
//!
//! Solves `(H + λ·diag(H)) p = −g` instead of carrying an explicit region
//! radius: the damping λ interpolates between Gauss-Newton (λ → 0) and
//! scaled steepest descent (λ large). λ adapts on the same gain ratio the
//! trust region driver uses — shrinking smoothly after good steps, doubling
//! after rejected ones, and jumping by a larger factor when the dampened
//! system itself cannot be factorized.
//!
//! The damping is applied through the Hessian diagonal seam
//! (`extract_diagonals` / `set_diagonals`), so every backend — dense,
//! sparse, Schur — works unchanged.

use crate::hessian::HessianOperator;
use crate::linalg::ops;
use crate::optimizer::model::OptimizationModel;
use crate::optimizer::{OptimizerError, OptimizerResult};
use crate::update::predicted_reduction_full;
use faer::Mat;
use faer_ext::IntoNalgebra;
use nalgebra::DVector;
use tracing::debug;

/// Configuration parameters for the Levenberg-Marquardt driver.
#[derive(Debug, Clone)]
pub struct LevenbergConfig {
    /// Initial damping λ
    pub initial_damping: f64,
    /// Lower bound on λ
    pub damping_minimum: f64,
    /// Upper bound on λ
    pub damping_maximum: f64,
    /// Multiplier applied to λ when the dampened system cannot be solved
    pub failure_multiplier: f64,
    /// Gradient infinity-norm convergence tolerance
    pub gtol: f64,
    /// Relative cost-change convergence tolerance
    pub ftol: f64,
}

impl Default for LevenbergConfig {
    fn default() -> Self {
        Self {
            initial_damping: 1e-4,
            damping_minimum: 1e-12,
            damping_maximum: 1e12,
            failure_multiplier: 10.0,
            gtol: 1e-8,
            ftol: 1e-12,
        }
    }
}

impl LevenbergConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_damping(mut self, initial_damping: f64) -> Self {
        self.initial_damping = initial_damping;
        self
    }

    pub fn with_damping_bounds(mut self, minimum: f64, maximum: f64) -> Self {
        self.damping_minimum = minimum;
        self.damping_maximum = maximum;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    pub fn validate(&self) -> OptimizerResult<()> {
        if !(self.initial_damping > 0.0) {
            return Err(OptimizerError::InvalidParameters(format!(
                "initial damping must be positive, got {}",
                self.initial_damping
            ))
            .log());
        }
        if self.damping_minimum <= 0.0 || self.damping_maximum <= self.damping_minimum {
            return Err(OptimizerError::InvalidParameters(format!(
                "damping bounds must satisfy 0 < min < max, got [{}, {}]",
                self.damping_minimum, self.damping_maximum
            ))
            .log());
        }
        if self.failure_multiplier <= 1.0 {
            return Err(OptimizerError::InvalidParameters(format!(
                "failure multiplier must exceed 1, got {}",
                self.failure_multiplier
            ))
            .log());
        }
        if self.gtol < 0.0 || self.ftol < 0.0 {
            return Err(OptimizerError::InvalidParameters(format!(
                "tolerances must be non-negative, got gtol={} ftol={}",
                self.gtol, self.ftol
            ))
            .log());
        }
        Ok(())
    }
}

/// Levenberg-Marquardt driver over the same model/Hessian seams as the trust
/// region driver.
pub struct LevenbergDriver<M: OptimizationModel> {
    model: M,
    hessian: M::Hessian,
    config: LevenbergConfig,

    x: Mat<f64>,
    x_next: Mat<f64>,
    p: Mat<f64>,
    gradient: Mat<f64>,
    gradient_norm: f64,
    /// Undamped Hessian diagonal of the current linearization
    diagonals: Mat<f64>,
    /// Scratch for the dampened diagonal
    dampened: Mat<f64>,
    fx: f64,
    damping: f64,
    minimum_cost: f64,
    same_state_as_cost: bool,
    /// True while the stored gradient/Hessian describe the current `x`
    linearization_valid: bool,
    converged: bool,

    total_full_steps: usize,
    total_retries: usize,
    verbose: bool,
}

impl<M: OptimizationModel> LevenbergDriver<M> {
    pub fn new(model: M, hessian: M::Hessian) -> Self {
        Self {
            model,
            hessian,
            config: LevenbergConfig::default(),
            x: Mat::zeros(0, 1),
            x_next: Mat::zeros(0, 1),
            p: Mat::zeros(0, 1),
            gradient: Mat::zeros(0, 1),
            gradient_norm: 0.0,
            diagonals: Mat::zeros(0, 1),
            dampened: Mat::zeros(0, 1),
            fx: 0.0,
            damping: 0.0,
            minimum_cost: 0.0,
            same_state_as_cost: false,
            linearization_valid: false,
            converged: false,
            total_full_steps: 0,
            total_retries: 0,
            verbose: false,
        }
    }

    /// Replace the configuration. Fails fast on invalid settings.
    pub fn configure(&mut self, config: LevenbergConfig) -> OptimizerResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Specify the initial state of the search and the completion criteria.
    pub fn initialize(&mut self, initial: &DVector<f64>, minimum_cost: f64) -> OptimizerResult<()> {
        let n = self.model.num_parameters();
        if initial.len() != n {
            return Err(OptimizerError::InvalidParameters(format!(
                "initial state has {} parameters, the function expects {n}",
                initial.len()
            ))
            .log());
        }

        self.x = Mat::from_fn(n, 1, |i, _| initial[i]);
        self.x_next = Mat::zeros(n, 1);
        self.p = Mat::zeros(n, 1);
        self.gradient = Mat::zeros(n, 1);
        self.diagonals = Mat::zeros(n, 1);
        self.dampened = Mat::zeros(n, 1);
        self.hessian.resize(n);

        self.minimum_cost = minimum_cost;
        self.fx = self.model.cost(&self.x)?;
        self.same_state_as_cost = true;
        self.damping = self.config.initial_damping;
        self.linearization_valid = false;
        self.converged = self.fx <= minimum_cost;
        self.total_full_steps = 0;
        self.total_retries = 0;
        Ok(())
    }

    /// Perform one iteration; returns true once the run has converged.
    pub fn iterate(&mut self) -> OptimizerResult<bool> {
        if self.converged {
            return Ok(true);
        }

        if !self.linearization_valid {
            self.total_full_steps += 1;
            self.model.gradient_hessian(
                &self.x,
                self.same_state_as_cost,
                &mut self.gradient,
                &mut self.hessian,
            )?;

            if ops::max_abs(&self.gradient) <= self.config.gtol {
                self.converged = true;
                return Ok(true);
            }
            self.gradient_norm = self.gradient.norm_l2();
            if !self.gradient_norm.is_finite() {
                return Err(OptimizerError::NumericalInstability(format!(
                    "gradient norm = {}",
                    self.gradient_norm
                ))
                .log());
            }

            self.hessian.extract_diagonals(&mut self.diagonals);
            self.linearization_valid = true;
        } else {
            self.total_retries += 1;
        }

        // dampen, solve, restore
        for i in 0..self.diagonals.nrows() {
            self.dampened[(i, 0)] = self.diagonals[(i, 0)] * (1.0 + self.damping);
        }
        self.hessian.set_diagonals(&self.dampened)?;
        let solved =
            self.hessian.initialize_solver().is_ok() && self.hessian.solve(&self.gradient, &mut self.p);
        self.hessian.set_diagonals(&self.diagonals)?;

        if !solved {
            self.raise_damping(self.config.failure_multiplier);
            if self.verbose {
                debug!(
                    "{} dampened solve failed, damping={:.3e}",
                    self.total_full_steps, self.damping
                );
            }
            return Ok(false);
        }

        for i in 0..self.p.nrows() {
            self.p[(i, 0)] = -self.p[(i, 0)];
        }
        if !ops::is_finite(&self.p) {
            self.raise_damping(self.config.failure_multiplier);
            return Ok(false);
        }

        for i in 0..self.x.nrows() {
            self.x_next[(i, 0)] = self.x[(i, 0)] + self.p[(i, 0)];
        }
        let fx_candidate = self.model.cost(&self.x_next)?;
        self.same_state_as_cost = true;

        // gain ratio against the undamped model
        let predicted_reduction = predicted_reduction_full(&self.hessian, &self.gradient, &self.p);
        let actual_reduction = self.fx - fx_candidate;
        let ratio = if predicted_reduction.abs() < 1e-15 {
            if actual_reduction > 0.0 { 1.0 } else { 0.0 }
        } else {
            actual_reduction / predicted_reduction
        };

        if self.verbose {
            debug!(
                "{} fx_candidate={:.6e} ratio={:.3} damping={:.3e}",
                self.total_full_steps, fx_candidate, ratio, self.damping
            );
        }

        if fx_candidate < self.fx && ratio > 0.0 {
            let converged = self
                .model
                .converged_cost(self.fx, fx_candidate, self.config.ftol)
                || fx_candidate <= self.minimum_cost;
            self.fx = fx_candidate;
            std::mem::swap(&mut self.x, &mut self.x_next);
            self.linearization_valid = false;

            let shifted = 2.0 * ratio - 1.0;
            self.damping *= (1.0_f64 / 3.0).max(1.0 - shifted * shifted * shifted);
            self.damping = self.damping.max(self.config.damping_minimum);

            self.converged = converged;
            Ok(converged)
        } else {
            self.raise_damping(2.0);
            Ok(false)
        }
    }

    fn raise_damping(&mut self, factor: f64) {
        self.damping = (self.damping * factor).min(self.config.damping_maximum);
    }

    /// Current parameter state.
    pub fn parameters(&self) -> DVector<f64> {
        self.x.as_ref().into_nalgebra().column(0).into_owned()
    }

    /// Cost at the current parameter state.
    pub fn cost(&self) -> f64 {
        self.fx
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn total_full_steps(&self) -> usize {
        self.total_full_steps
    }

    pub fn total_retries(&self) -> usize {
        self.total_retries
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }
}

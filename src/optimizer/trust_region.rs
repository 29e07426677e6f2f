//! Trust region driver.
//!
//! The driver assumes a quadratic model of the cost is valid within a region
//! of radius Δ around the current iterate. Each iteration solves the trust
//! region subproblem through the configured
//! [`UpdateStrategy`](crate::update::UpdateStrategy), then compares the
//! reduction the model predicted against the reduction actually observed.
//! The ratio of the two drives both step acceptance and the adaptation of Δ.
//!
//! Diagonal scaling can optionally be turned on. The region is then
//! non-symmetric: the length of each axis is determined by the absolute
//! value of the corresponding Hessian diagonal, clamped to the configured
//! bounds. Scaling is equivalent to reparameterizing `x = s ⊙ y` and removes
//! the dependence of convergence on the natural scale of each parameter.
//!
//! References:
//! - Nocedal & Wright, "Numerical Optimization" 2nd ed., Springer 2006,
//!   chapter 4
//! - Madsen, Nielsen, Tingleff, "Methods for Non-Linear Least Squares
//!   Problems" 2nd ed., IMM DTU 2004

use crate::hessian::HessianOperator;
use crate::linalg::ops;
use crate::optimizer::model::OptimizationModel;
use crate::optimizer::{OptimizerError, OptimizerResult};
use crate::update::UpdateStrategy;
use faer::Mat;
use faer_ext::IntoNalgebra;
use nalgebra::DVector;
use tracing::debug;

/// Initial region radius policy.
///
/// The numeric encoding (`> 0` literal, `−1` unconstrained, `−2` Cauchy)
/// is accepted only at the configuration boundary through
/// [`RegionInitial::from_value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionInitial {
    /// Use the given radius directly
    Explicit(f64),
    /// Derive Δ from the length of the first unconstrained step; falls back
    /// to `Cauchy` when that length is unusable
    Unconstrained,
    /// Derive Δ from ten times the unconstrained Cauchy step length
    Cauchy,
}

impl RegionInitial {
    /// Decode the numeric configuration convention.
    pub fn from_value(value: f64) -> OptimizerResult<Self> {
        if value > 0.0 {
            Ok(Self::Explicit(value))
        } else if value == -1.0 {
            Ok(Self::Unconstrained)
        } else if value == -2.0 {
            Ok(Self::Cauchy)
        } else {
            Err(OptimizerError::InvalidParameters(format!(
                "initial region radius must be positive, -1, or -2; got {value}"
            ))
            .log())
        }
    }
}

/// Configuration parameters for the trust region driver.
#[derive(Debug, Clone)]
pub struct TrustRegionConfig {
    /// Initial region radius policy
    pub region_initial: RegionInitial,
    /// Upper bound on the region radius
    pub region_maximum: f64,
    /// Gradient infinity-norm convergence tolerance
    pub gtol: f64,
    /// Relative cost-change convergence tolerance
    pub ftol: f64,
    /// Lower clamp on the scaling vector; scaling is active iff
    /// `scaling_maximum > scaling_minimum`
    pub scaling_minimum: f64,
    /// Upper clamp on the scaling vector
    pub scaling_maximum: f64,
}

impl Default for TrustRegionConfig {
    fn default() -> Self {
        Self {
            region_initial: RegionInitial::Explicit(1.0),
            region_maximum: f64::MAX,
            gtol: 1e-8,
            ftol: 1e-12,
            // off: maximum not greater than minimum
            scaling_minimum: 1.0,
            scaling_maximum: 1.0,
        }
    }
}

impl TrustRegionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region_initial(mut self, region_initial: RegionInitial) -> Self {
        self.region_initial = region_initial;
        self
    }

    pub fn with_region_maximum(mut self, region_maximum: f64) -> Self {
        self.region_maximum = region_maximum;
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

    /// Enable diagonal scaling with the given clamp bounds.
    pub fn with_scaling(mut self, minimum: f64, maximum: f64) -> Self {
        self.scaling_minimum = minimum;
        self.scaling_maximum = maximum;
        self
    }

    /// Check the configuration. Called by
    /// [`TrustRegionDriver::configure`]; invalid settings never reach the
    /// iteration loop.
    pub fn validate(&self) -> OptimizerResult<()> {
        if let RegionInitial::Explicit(radius) = self.region_initial {
            if !(radius > 0.0 && radius.is_finite()) {
                return Err(OptimizerError::InvalidParameters(format!(
                    "explicit initial region radius must be positive and finite, got {radius}"
                ))
                .log());
            }
        }
        if !(self.region_maximum > 0.0) {
            return Err(OptimizerError::InvalidParameters(format!(
                "region maximum must be positive, got {}",
                self.region_maximum
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
        if self.scaling_maximum > self.scaling_minimum && self.scaling_minimum <= 0.0 {
            return Err(OptimizerError::InvalidParameters(format!(
                "scaling minimum must be positive when scaling is active, got {}",
                self.scaling_minimum
            ))
            .log());
        }
        Ok(())
    }
}

/// Which processing step the driver is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FullStep,
    Retry,
    Converged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accept,
    Reject,
}

/// Deferred automatic initial-radius mode, resolved on the first
/// compute-and-consider.
#[derive(Debug, Clone, Copy)]
enum AutoRadius {
    Unconstrained,
    Cauchy,
}

/// The trust region state machine.
///
/// A run is `initialize` followed by repeated `iterate` calls; `iterate`
/// returns true once the run has converged. The caller bounds a stuck run by
/// capping the number of calls — rejected steps are not errors, they only
/// shrink the region.
pub struct TrustRegionDriver<M: OptimizationModel> {
    model: M,
    hessian: M::Hessian,
    update: UpdateStrategy,
    config: TrustRegionConfig,

    mode: Mode,
    /// Current parameter state
    x: Mat<f64>,
    /// Proposed next parameter state
    x_next: Mat<f64>,
    /// Proposed change in state
    p: Mat<f64>,
    gradient: Mat<f64>,
    gradient_norm: f64,
    /// Per-parameter scale factors; all ones when scaling is off
    scaling: Mat<f64>,
    /// Cost at `x`
    fx: f64,
    region_radius: f64,
    pending_auto: Option<AutoRadius>,
    /// True when `x` for the next derivative evaluation equals the point of
    /// the most recent cost evaluation
    same_state_as_cost: bool,
    minimum_cost: f64,

    total_full_steps: usize,
    total_retries: usize,
    verbose: bool,
}

impl<M: OptimizationModel> TrustRegionDriver<M> {
    pub fn new(model: M, hessian: M::Hessian, update: UpdateStrategy) -> Self {
        Self {
            model,
            hessian,
            update,
            config: TrustRegionConfig::default(),
            mode: Mode::FullStep,
            x: Mat::zeros(0, 1),
            x_next: Mat::zeros(0, 1),
            p: Mat::zeros(0, 1),
            gradient: Mat::zeros(0, 1),
            gradient_norm: 0.0,
            scaling: Mat::zeros(0, 1),
            fx: 0.0,
            region_radius: 0.0,
            pending_auto: None,
            same_state_as_cost: false,
            minimum_cost: 0.0,
            total_full_steps: 0,
            total_retries: 0,
            verbose: false,
        }
    }

    /// Replace the configuration. Fails fast on invalid settings.
    pub fn configure(&mut self, config: TrustRegionConfig) -> OptimizerResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &TrustRegionConfig {
        &self.config
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Specify the initial state of the search and the completion criteria.
    ///
    /// `minimum_cost` is the lowest value the cost can take; reaching it
    /// converges the run immediately.
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
        self.scaling = Mat::from_fn(n, 1, |_, _| 1.0);
        self.hessian.resize(n);
        self.update.initialize(n);

        self.minimum_cost = minimum_cost;
        self.fx = self.model.cost(&self.x)?;
        self.same_state_as_cost = true;

        self.total_full_steps = 0;
        self.total_retries = 0;

        match self.config.region_initial {
            RegionInitial::Explicit(radius) => {
                self.region_radius = radius;
                self.pending_auto = None;
            }
            RegionInitial::Unconstrained => {
                self.region_radius = 0.0;
                self.pending_auto = Some(AutoRadius::Unconstrained);
            }
            RegionInitial::Cauchy => {
                self.region_radius = 0.0;
                self.pending_auto = Some(AutoRadius::Cauchy);
            }
        }

        // a perfect initial guess is a pathological case, handled here
        self.mode = if self.fx <= minimum_cost {
            Mode::Converged
        } else {
            Mode::FullStep
        };
        Ok(())
    }

    /// Perform one iteration.
    ///
    /// Returns true once the run has converged; further calls are no-ops
    /// returning true.
    pub fn iterate(&mut self) -> OptimizerResult<bool> {
        let converged = match self.mode {
            Mode::FullStep => {
                self.total_full_steps += 1;
                if self.update_state()? {
                    true
                } else {
                    self.compute_and_consider()?
                }
            }
            Mode::Retry => {
                self.total_retries += 1;
                self.compute_and_consider()?
            }
            Mode::Converged => return Ok(true),
        };

        if converged {
            self.mode = Mode::Converged;
        }
        Ok(converged)
    }

    /// Compute the derived state at `x` and prepare the update strategy.
    /// Returns true when the gradient test converges the run.
    fn update_state(&mut self) -> OptimizerResult<bool> {
        self.model.gradient_hessian(
            &self.x,
            self.same_state_as_cost,
            &mut self.gradient,
            &mut self.hessian,
        )?;

        if self.is_scaling() {
            self.compute_scaling();
            self.apply_scaling()?;
        }

        // convergence is tested on scaled variables so their arbitrary
        // natural scale does not influence it
        if ops::max_abs(&self.gradient) <= self.config.gtol {
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

        self.update
            .initialize_update(&mut self.hessian, &self.gradient, self.gradient_norm)?;
        Ok(false)
    }

    /// Ask the update strategy for a step at the current radius, evaluate the
    /// candidate, and accept or shrink.
    fn compute_and_consider(&mut self) -> OptimizerResult<bool> {
        match self.pending_auto.take() {
            Some(AutoRadius::Unconstrained) => {
                self.update
                    .compute_update(&self.hessian, &self.gradient, &mut self.p, f64::MAX);
                let length = self.update.step_length();
                if length.is_finite() && length != f64::MAX {
                    self.region_radius = length;
                    if self.verbose {
                        debug!(
                            "unconstrained initialization radius={:.6e}",
                            self.region_radius
                        );
                    }
                    self.update.compute_update(
                        &self.hessian,
                        &self.gradient,
                        &mut self.p,
                        self.region_radius,
                    );
                } else {
                    if self.verbose {
                        debug!(
                            "unconstrained initialization failed, using Cauchy initialization instead"
                        );
                    }
                    self.initialize_cauchy_radius()?;
                }
            }
            Some(AutoRadius::Cauchy) => self.initialize_cauchy_radius()?,
            None => {
                self.update.compute_update(
                    &self.hessian,
                    &self.gradient,
                    &mut self.p,
                    self.region_radius,
                );
            }
        }

        let predicted_reduction = self.update.predicted_reduction();
        // the step length refers to the scaled-space step, which is what the
        // ratio test below needs
        let step_length = self.update.step_length();

        if self.is_scaling() {
            self.undo_scaling_on_parameters();
        }

        // a solver can report success and still hand back non-finite values
        // when the radius is far larger than the conditioning supports;
        // shrink the region and retry instead of aborting
        if !ops::is_finite(&self.p) {
            self.region_radius *= 0.5;
            self.mode = Mode::Retry;
            return Ok(false);
        }

        for i in 0..self.x.nrows() {
            self.x_next[(i, 0)] = self.x[(i, 0)] + self.p[(i, 0)];
        }
        let fx_candidate = self.model.cost(&self.x_next)?;
        self.same_state_as_cost = true;

        match self.consider_candidate(fx_candidate, self.fx, predicted_reduction, step_length) {
            Decision::Accept => {
                let converged =
                    self.model
                        .converged_cost(self.fx, fx_candidate, self.config.ftol)
                        || fx_candidate <= self.minimum_cost;
                self.fx = fx_candidate;
                std::mem::swap(&mut self.x, &mut self.x_next);
                self.mode = if converged {
                    Mode::Converged
                } else {
                    Mode::FullStep
                };
                Ok(converged)
            }
            Decision::Reject => {
                self.mode = Mode::Retry;
                Ok(false)
            }
        }
    }

    /// Resolve the automatic Cauchy initial radius: ten times the
    /// unconstrained Cauchy step length.
    fn initialize_cauchy_radius(&mut self) -> OptimizerResult<()> {
        let curvature = self.hessian.inner_vector_hessian(&self.gradient);
        let radius = 10.0 * self.gradient_norm * self.gradient_norm / curvature;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(OptimizerError::NumericalInstability(format!(
                "automatic Cauchy region radius is unusable: {radius}"
            ))
            .log());
        }
        self.region_radius = radius;
        if self.verbose {
            debug!("cauchy initialization radius={:.6e}", self.region_radius);
        }
        self.update
            .compute_update(&self.hessian, &self.gradient, &mut self.p, self.region_radius);
        Ok(())
    }

    /// Ratio test: decide on the candidate and adapt the region radius.
    ///
    /// The region grows only when the model over-predicted the reduction
    /// *and* the step reached the boundary (`3‖p‖ ≥ Δ`); an interior step
    /// never inflates the region.
    fn consider_candidate(
        &mut self,
        fx_candidate: f64,
        fx_prev: f64,
        predicted_reduction: f64,
        step_length: f64,
    ) -> Decision {
        let actual_reduction = fx_prev - fx_candidate;

        // degenerate but not harmful, and dividing would be
        if actual_reduction == 0.0 || predicted_reduction == 0.0 {
            if self.verbose {
                debug!("{} reduction of zero", self.total_full_steps);
            }
            return Decision::Accept;
        }

        let ratio = actual_reduction / predicted_reduction;

        if fx_candidate > fx_prev || ratio < 0.25 {
            self.region_radius *= 0.5;
        } else if ratio > 0.75 {
            self.region_radius = (3.0 * step_length)
                .max(self.region_radius)
                .min(self.config.region_maximum);
        }

        if self.verbose {
            debug!(
                "{} fx_candidate={:.6e} ratio={:.3} region={:.3e}",
                self.total_full_steps, fx_candidate, ratio, self.region_radius
            );
        }

        if fx_candidate < fx_prev && ratio > 0.0 {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }

    /// True if scaling is turned on.
    pub fn is_scaling(&self) -> bool {
        self.config.scaling_maximum > self.config.scaling_minimum
    }

    /// Scaling is the square root of the Hessian diagonal, clamped.
    fn compute_scaling(&mut self) {
        self.hessian.extract_diagonals(&mut self.scaling);
        for i in 0..self.scaling.nrows() {
            // mathematically never negative, but clamp anyway
            let scale = self.scaling[(i, 0)].abs().sqrt();
            self.scaling[(i, 0)] =
                scale.clamp(self.config.scaling_minimum, self.config.scaling_maximum);
        }
    }

    fn apply_scaling(&mut self) -> OptimizerResult<()> {
        for i in 0..self.gradient.nrows() {
            self.gradient[(i, 0)] /= self.scaling[(i, 0)];
        }
        self.hessian.divide_rows_cols(&self.scaling)?;
        Ok(())
    }

    /// Undo scaling on the estimated step before applying it to `x`.
    fn undo_scaling_on_parameters(&mut self) {
        for i in 0..self.p.nrows() {
            self.p[(i, 0)] /= self.scaling[(i, 0)];
        }
    }

    /// Current parameter state.
    pub fn parameters(&self) -> DVector<f64> {
        self.x.as_ref().into_nalgebra().column(0).into_owned()
    }

    /// Cost at the current parameter state.
    pub fn cost(&self) -> f64 {
        self.fx
    }

    pub fn region_radius(&self) -> f64 {
        self.region_radius
    }

    pub fn total_full_steps(&self) -> usize {
        self.total_full_steps
    }

    pub fn total_retries(&self) -> usize {
        self.total_retries
    }

    pub fn is_converged(&self) -> bool {
        self.mode == Mode::Converged
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn hessian(&self) -> &M::Hessian {
        &self.hessian
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{FunctionResult, LeastSquaresFunction, ResidualFunction};
    use crate::hessian::DenseHessian;
    use crate::optimizer::model::LeastSquaresModel;

    /// r₀ = x₀ − 2, r₁ = x₁ − 0.1; minimum at (2, 0.1)
    struct LinearResiduals {
        x: Mat<f64>,
    }

    impl LinearResiduals {
        fn new() -> Self {
            Self {
                x: Mat::zeros(2, 1),
            }
        }
    }

    impl ResidualFunction for LinearResiduals {
        fn num_parameters(&self) -> usize {
            2
        }
        fn num_residuals(&self) -> usize {
            2
        }
        fn set_input(&mut self, x: &Mat<f64>) {
            self.x = x.clone();
        }
        fn residuals(&mut self, residuals: &mut Mat<f64>) {
            residuals[(0, 0)] = self.x[(0, 0)] - 2.0;
            residuals[(1, 0)] = self.x[(1, 0)] - 0.1;
        }
    }

    impl LeastSquaresFunction for LinearResiduals {
        type Jacobian = Mat<f64>;
        fn jacobian(&mut self) -> FunctionResult<Self::Jacobian> {
            Ok(Mat::identity(2, 2))
        }
    }

    fn linear_driver() -> TrustRegionDriver<LeastSquaresModel<LinearResiduals, DenseHessian>> {
        TrustRegionDriver::new(
            LeastSquaresModel::new(LinearResiduals::new()),
            DenseHessian::new(),
            UpdateStrategy::dogleg(),
        )
    }

    #[test]
    fn test_zero_actual_reduction_is_accepted_without_radius_change() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();
        driver.region_radius = 2.0;

        let decision = driver.consider_candidate(1.0, 1.0, 0.5, 1.0);
        assert_eq!(decision, Decision::Accept);
        assert_eq!(driver.region_radius, 2.0);
    }

    #[test]
    fn test_zero_predicted_reduction_is_accepted() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();
        driver.region_radius = 2.0;

        let decision = driver.consider_candidate(0.9, 1.0, 0.0, 1.0);
        assert_eq!(decision, Decision::Accept);
        assert_eq!(driver.region_radius, 2.0);
    }

    #[test]
    fn test_poor_ratio_halves_the_region() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();
        driver.region_radius = 2.0;

        // actual 0.1, predicted 1.0 → ratio 0.1 < 0.25
        let decision = driver.consider_candidate(0.9, 1.0, 1.0, 1.0);
        assert_eq!(decision, Decision::Accept); // still an improvement
        assert_eq!(driver.region_radius, 1.0);
    }

    #[test]
    fn test_cost_increase_rejects_and_halves() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();
        driver.region_radius = 2.0;

        let decision = driver.consider_candidate(1.5, 1.0, 1.0, 1.0);
        assert_eq!(decision, Decision::Reject);
        assert_eq!(driver.region_radius, 1.0);
    }

    #[test]
    fn test_good_ratio_grows_region_only_to_step_bound() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();

        // boundary step: 3‖p‖ > Δ, region grows to 3‖p‖
        driver.region_radius = 2.0;
        let decision = driver.consider_candidate(0.0, 1.0, 1.0, 1.0);
        assert_eq!(decision, Decision::Accept);
        assert_eq!(driver.region_radius, 3.0);

        // interior step: 3‖p‖ < Δ, region unchanged
        driver.region_radius = 10.0;
        let _ = driver.consider_candidate(0.0, 1.0, 1.0, 1.0);
        assert_eq!(driver.region_radius, 10.0);
    }

    #[test]
    fn test_region_growth_respects_maximum() {
        let mut driver = linear_driver();
        let config = TrustRegionConfig::new().with_region_maximum(2.5);
        driver.configure(config).unwrap();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();
        driver.region_radius = 2.0;

        let _ = driver.consider_candidate(0.0, 1.0, 1.0, 1.0);
        assert_eq!(driver.region_radius, 2.5);
    }

    #[test]
    fn test_linear_problem_converges() {
        let mut driver = linear_driver();
        driver
            .configure(TrustRegionConfig::new().with_gtol(1e-6).with_ftol(1e-6))
            .unwrap();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();

        let mut calls = 0;
        let mut converged = false;
        let mut previous_cost = driver.cost();
        for _ in 0..200 {
            calls += 1;
            converged = driver.iterate().unwrap();
            // accepted steps strictly reduce the cost
            assert!(driver.cost() <= previous_cost);
            previous_cost = driver.cost();
            if converged {
                break;
            }
        }
        assert!(converged, "did not converge");
        assert_eq!(driver.total_full_steps() + driver.total_retries(), calls);

        let solution = driver.parameters();
        assert!((solution[0] - 2.0).abs() < 1e-4);
        assert!((solution[1] - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_perfect_initial_guess_converges_immediately() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![2.0, 0.1]), 1e-30)
            .unwrap();

        assert!(driver.iterate().unwrap());
        assert_eq!(driver.total_full_steps(), 0);
        assert_eq!(driver.total_retries(), 0);
    }

    #[test]
    fn test_iterate_after_convergence_is_a_no_op() {
        let mut driver = linear_driver();
        driver
            .initialize(&DVector::from_vec(vec![2.0, 0.1]), 1e-30)
            .unwrap();

        assert!(driver.iterate().unwrap());
        let full_steps = driver.total_full_steps();
        assert!(driver.iterate().unwrap());
        assert_eq!(driver.total_full_steps(), full_steps);
    }

    #[test]
    fn test_invalid_region_initial_value_is_rejected() {
        assert!(RegionInitial::from_value(-3.0).is_err());
        assert!(RegionInitial::from_value(0.0).is_err());
        assert!(matches!(
            RegionInitial::from_value(-1.0).unwrap(),
            RegionInitial::Unconstrained
        ));
        assert!(matches!(
            RegionInitial::from_value(-2.0).unwrap(),
            RegionInitial::Cauchy
        ));
        assert!(matches!(
            RegionInitial::from_value(0.5).unwrap(),
            RegionInitial::Explicit(_)
        ));
    }

    #[test]
    fn test_configure_rejects_bad_settings() {
        let mut driver = linear_driver();
        let mut config = TrustRegionConfig::new();
        config.region_initial = RegionInitial::Explicit(-1.0);
        assert!(driver.configure(config).is_err());

        let mut config = TrustRegionConfig::new();
        config.ftol = -1.0;
        assert!(driver.configure(config).is_err());

        // active scaling with a non-positive minimum
        let config = TrustRegionConfig::new().with_scaling(0.0, 100.0);
        assert!(driver.configure(config).is_err());
    }

    #[test]
    fn test_unconstrained_initial_radius() {
        let mut driver = linear_driver();
        driver
            .configure(
                TrustRegionConfig::new()
                    .with_region_initial(RegionInitial::Unconstrained)
                    .with_gtol(1e-6)
                    .with_ftol(1e-6),
            )
            .unwrap();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();

        let mut converged = false;
        for _ in 0..50 {
            if driver.iterate().unwrap() {
                converged = true;
                break;
            }
        }
        assert!(converged);
        let solution = driver.parameters();
        assert!((solution[0] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_cauchy_initial_radius() {
        let mut driver = linear_driver();
        driver
            .configure(
                TrustRegionConfig::new()
                    .with_region_initial(RegionInitial::Cauchy)
                    .with_gtol(1e-6)
                    .with_ftol(1e-6),
            )
            .unwrap();
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();

        let mut converged = false;
        for _ in 0..50 {
            if driver.iterate().unwrap() {
                converged = true;
                break;
            }
        }
        assert!(converged);
        let solution = driver.parameters();
        assert!((solution[1] - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_scaling_preserves_convergence() {
        let mut driver = linear_driver();
        driver
            .configure(
                TrustRegionConfig::new()
                    .with_gtol(1e-6)
                    .with_ftol(1e-6)
                    .with_scaling(1e-4, 1e4),
            )
            .unwrap();
        assert!(driver.is_scaling());
        driver
            .initialize(&DVector::from_vec(vec![1.0, 0.5]), 0.0)
            .unwrap();

        let mut converged = false;
        for _ in 0..200 {
            if driver.iterate().unwrap() {
                converged = true;
                break;
            }
        }
        assert!(converged);
        let solution = driver.parameters();
        assert!((solution[0] - 2.0).abs() < 1e-4);
        assert!((solution[1] - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_initialize_rejects_dimension_mismatch() {
        let mut driver = linear_driver();
        assert!(driver.initialize(&DVector::from_vec(vec![1.0]), 0.0).is_err());
    }
}

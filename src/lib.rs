//! # Crest Solver
//!
//! A Rust library for nonlinear least squares and unconstrained minimization
//! built around the trust region family of methods.
//!
//! ## Features
//!
//! - **Trust region driver**: ratio-based step acceptance with adaptive region
//!   radius, diagonal scaling, and automatic initial-radius selection
//! - **Two update strategies**: Cauchy point and Powell's Dogleg
//! - **Three Hessian backends**: dense, sparse CSC, and a Schur-complement
//!   backend for the bordered `[A B; Bᵀ D]` block structure of bundle
//!   adjustment style problems
//! - **Levenberg-Marquardt**: a dampened companion solver sharing the same
//!   Hessian abstraction
//! - **High performance**: built on the faer linear algebra library
//!
//! ## Solver types
//!
//! - **Cauchy**: steepest descent restricted to the trust region; cheap and
//!   robust, linear convergence
//! - **Dogleg**: combines the Gauss-Newton and steepest descent directions;
//!   quadratic convergence near the solution
//! - **Levenberg-Marquardt**: implicit trust region through diagonal damping
//!
//! ## Hessian backends
//!
//! - [`DenseHessian`]: small or dense problems
//! - [`SparseHessian`]: large problems with general sparsity
//! - [`SchurHessian`]: 2×2 block Hessians solved by the Schur complement

pub mod error;
pub mod functions;
pub mod hessian;
pub mod linalg;
pub mod logger;
pub mod optimizer;
pub mod update;

pub use error::{CrestSolverError, CrestSolverResult};
pub use functions::{
    ForwardDifferenceJacobian, LeastSquaresFunction, MinimizationFunction, ResidualFunction,
};
pub use hessian::{DenseHessian, HessianOperator, SchurHessian, SchurJacobian, SparseHessian};
pub use logger::{init_logger, init_logger_with_level};
pub use optimizer::model::{LeastSquaresModel, MinimizationModel, OptimizationModel};
pub use optimizer::{
    LevenbergConfig, LevenbergDriver, RegionInitial, TrustRegionConfig, TrustRegionDriver,
};
pub use update::UpdateStrategy;

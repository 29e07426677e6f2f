//! The Hessian abstraction.
//!
//! The trust region and Levenberg-Marquardt drivers never touch matrix
//! storage directly; everything they need from the (approximate) Hessian
//! goes through [`HessianOperator`]. Three backends implement it:
//!
//! - [`DenseHessian`] for small problems and general minimization
//! - [`SparseHessian`] for large problems with general sparsity
//! - [`SchurHessian`] for the bordered `[A B; Bᵀ D]` block structure,
//!   solved by block elimination through the Schur complement
//!
//! The backend owns its factorization and all scratch matrices for the
//! duration of an optimization run.

pub mod dense;
pub mod schur;
pub mod sparse;

use crate::linalg::LinAlgResult;
use faer::Mat;

pub use dense::DenseHessian;
pub use schur::{SchurHessian, SchurJacobian};
pub use sparse::SparseHessian;

/// Operations the optimizers require from a Hessian representation.
///
/// `initialize_solver` and `solve` are split so that one factorization can
/// serve several solves, and so the callers can distinguish a fatally
/// singular system (an error from `initialize_solver`) from a merely
/// non-positive-definite one (`solve` returning `false`).
pub trait HessianOperator {
    /// Jacobian representation this backend consumes
    type Jacobian;

    /// Prepare internal storage for a problem with `n` parameters.
    /// Invalidates any previous factorization.
    fn resize(&mut self, n: usize);

    /// Form the Gauss-Newton Hessian `Jᵀ J` from a Jacobian.
    fn compute_hessian(&mut self, jacobian: &Self::Jacobian) -> LinAlgResult<()>;

    /// Form the gradient `Jᵀ r` into `gradient` (N×1).
    fn compute_gradient(
        &self,
        jacobian: &Self::Jacobian,
        residuals: &Mat<f64>,
        gradient: &mut Mat<f64>,
    );

    /// Copy the Hessian diagonal into `diag` (N×1).
    fn extract_diagonals(&self, diag: &mut Mat<f64>);

    /// Overwrite the Hessian diagonal from `diag` (N×1).
    fn set_diagonals(&mut self, diag: &Mat<f64>) -> LinAlgResult<()>;

    /// Symmetric scaling `H ← diag(1/s) · H · diag(1/s)`.
    fn divide_rows_cols(&mut self, scaling: &Mat<f64>) -> LinAlgResult<()>;

    /// Inner product `vᵀ H v`.
    fn inner_vector_hessian(&self, v: &Mat<f64>) -> f64;

    /// Factorize the system so that `solve` can be called.
    ///
    /// An error means the matrix is singular or ill-conditioned and is fatal
    /// for the surrounding optimization run.
    fn initialize_solver(&mut self) -> LinAlgResult<()>;

    /// Solve `H p = g`, writing into `solution`.
    ///
    /// Returns `false` when the system could not be solved with the current
    /// factorization; callers treat this as a non-positive-definite signal,
    /// not as an error.
    fn solve(&mut self, rhs: &Mat<f64>, solution: &mut Mat<f64>) -> bool;
}

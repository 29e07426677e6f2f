//! Dense Hessian backend.
//!
//! Stores `H` as a dense faer matrix and solves with a dense Cholesky
//! factorization. This is the backend for small least-squares problems and
//! for general minimization, where the user callback writes the Hessian
//! directly through [`DenseHessian::matrix_mut`].

use crate::hessian::HessianOperator;
use crate::linalg::{LinAlgError, LinAlgResult, ops};
use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};

pub struct DenseHessian {
    matrix: Mat<f64>,
    factorization: Option<Llt<f64>>,
}

impl DenseHessian {
    pub fn new() -> Self {
        Self {
            matrix: Mat::zeros(0, 0),
            factorization: None,
        }
    }

    pub fn matrix(&self) -> &Mat<f64> {
        &self.matrix
    }

    /// Mutable access for callbacks that supply the Hessian directly
    /// (general minimization). Invalidates the current factorization.
    pub fn matrix_mut(&mut self) -> &mut Mat<f64> {
        self.factorization = None;
        &mut self.matrix
    }
}

impl Default for DenseHessian {
    fn default() -> Self {
        Self::new()
    }
}

impl HessianOperator for DenseHessian {
    type Jacobian = Mat<f64>;

    fn resize(&mut self, n: usize) {
        if self.matrix.nrows() != n {
            self.matrix = Mat::zeros(n, n);
        }
        self.factorization = None;
    }

    fn compute_hessian(&mut self, jacobian: &Self::Jacobian) -> LinAlgResult<()> {
        self.matrix = jacobian.transpose() * jacobian;
        self.factorization = None;
        Ok(())
    }

    fn compute_gradient(
        &self,
        jacobian: &Self::Jacobian,
        residuals: &Mat<f64>,
        gradient: &mut Mat<f64>,
    ) {
        *gradient = jacobian.transpose() * residuals;
    }

    fn extract_diagonals(&self, diag: &mut Mat<f64>) {
        ops::extract_diag_dense(&self.matrix, diag, 0);
    }

    fn set_diagonals(&mut self, diag: &Mat<f64>) -> LinAlgResult<()> {
        for i in 0..self.matrix.ncols() {
            self.matrix[(i, i)] = diag[(i, 0)];
        }
        self.factorization = None;
        Ok(())
    }

    fn divide_rows_cols(&mut self, scaling: &Mat<f64>) -> LinAlgResult<()> {
        ops::divide_rows_cols_dense(scaling, &mut self.matrix);
        self.factorization = None;
        Ok(())
    }

    fn inner_vector_hessian(&self, v: &Mat<f64>) -> f64 {
        let hv = &self.matrix * v;
        ops::dot(v, &hv)
    }

    fn initialize_solver(&mut self) -> LinAlgResult<()> {
        let cholesky = Llt::new(self.matrix.as_ref(), Side::Lower)
            .map_err(|e| LinAlgError::SingularMatrix.log_with_source(e))?;
        self.factorization = Some(cholesky);
        Ok(())
    }

    fn solve(&mut self, rhs: &Mat<f64>, solution: &mut Mat<f64>) -> bool {
        match &self.factorization {
            Some(factorization) => {
                *solution = factorization.solve(rhs);
                true
            }
            None => false,
        }
    }
}

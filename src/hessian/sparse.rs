//! Sparse CSC Hessian backend.
//!
//! Stores `H = Jᵀ J` as a faer `SparseColMat` and solves with a sparse
//! Cholesky factorization. The symbolic analysis is redone at every
//! factorization: the nonzero pattern of `Jᵀ J` can change between
//! iterations when a multiply drops entries that cancel numerically, and a
//! factorization locked to a stale pattern silently corrupts the solve.

use crate::hessian::HessianOperator;
use crate::linalg::{LinAlgError, LinAlgResult, ops};
use faer::{
    Mat, Side,
    linalg::solvers::Solve,
    sparse::SparseColMat,
    sparse::linalg::solvers::{Llt, SymbolicLlt},
};
use std::ops::Mul;

pub struct SparseHessian {
    matrix: Option<SparseColMat<usize, f64>>,
    factorization: Option<Llt<usize, f64>>,
}

impl SparseHessian {
    pub fn new() -> Self {
        Self {
            matrix: None,
            factorization: None,
        }
    }

    pub fn matrix(&self) -> Option<&SparseColMat<usize, f64>> {
        self.matrix.as_ref()
    }

    fn matrix_or_err(&self) -> LinAlgResult<&SparseColMat<usize, f64>> {
        self.matrix.as_ref().ok_or_else(|| {
            LinAlgError::FactorizationFailed("Hessian has not been computed".to_string()).log()
        })
    }
}

impl Default for SparseHessian {
    fn default() -> Self {
        Self::new()
    }
}

impl HessianOperator for SparseHessian {
    type Jacobian = SparseColMat<usize, f64>;

    fn resize(&mut self, _n: usize) {
        self.matrix = None;
        self.factorization = None;
    }

    fn compute_hessian(&mut self, jacobian: &Self::Jacobian) -> LinAlgResult<()> {
        let jt = jacobian.as_ref().transpose();
        let hessian = jt
            .to_col_major()
            .map_err(|e| {
                LinAlgError::MatrixConversion(
                    "Failed to convert transposed Jacobian to column-major format".to_string(),
                )
                .log_with_source(e)
            })?
            .mul(jacobian.as_ref());

        self.matrix = Some(hessian);
        self.factorization = None;
        Ok(())
    }

    fn compute_gradient(
        &self,
        jacobian: &Self::Jacobian,
        residuals: &Mat<f64>,
        gradient: &mut Mat<f64>,
    ) {
        *gradient = jacobian.as_ref().transpose().mul(residuals);
    }

    fn extract_diagonals(&self, diag: &mut Mat<f64>) {
        if let Some(matrix) = &self.matrix {
            ops::extract_diag_sparse(matrix, diag, 0);
        }
    }

    fn set_diagonals(&mut self, diag: &Mat<f64>) -> LinAlgResult<()> {
        let updated = ops::with_diagonal(self.matrix_or_err()?, diag, 0)?;
        self.matrix = Some(updated);
        self.factorization = None;
        Ok(())
    }

    fn divide_rows_cols(&mut self, scaling: &Mat<f64>) -> LinAlgResult<()> {
        let scaled = ops::divide_rows_cols_sparse(scaling, 0, self.matrix_or_err()?, scaling, 0)?;
        self.matrix = Some(scaled);
        self.factorization = None;
        Ok(())
    }

    fn inner_vector_hessian(&self, v: &Mat<f64>) -> f64 {
        match &self.matrix {
            Some(matrix) => ops::inner_product_sparse(v, 0, matrix, v, 0),
            None => 0.0,
        }
    }

    fn initialize_solver(&mut self) -> LinAlgResult<()> {
        let matrix = self.matrix_or_err()?;

        let symbolic = SymbolicLlt::try_new(matrix.symbolic(), Side::Lower).map_err(|e| {
            LinAlgError::FactorizationFailed("Symbolic Cholesky decomposition failed".to_string())
                .log_with_source(e)
        })?;
        let cholesky = Llt::try_new_with_symbolic(symbolic, matrix.as_ref(), Side::Lower)
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

//! Schur-complement Hessian backend for 2×2 block Hessians.
//!
//! The Gauss-Newton Hessian of a bordered problem (bundle adjustment and
//! relatives) has the block form
//!
//! ```text
//!       ┌ A   B ┐
//! H =   │       │     A: L×L,  D: R×R
//!       └ Bᵀ  D ┘
//! ```
//!
//! with the Jacobian presented in two sparse pieces `J_L` (M×L) and `J_R`
//! (M×R), so that `A = J_Lᵀ J_L`, `B = J_Lᵀ J_R`, `D = J_Rᵀ J_R`.
//!
//! `H p = g` is solved by block elimination:
//!
//! 1. `y = A⁻¹ b₁`
//! 2. `b₂′ = b₂ − Bᵀ y`
//! 3. `M = A⁻¹ B`
//! 4. `D′ = D − Bᵀ M` (the Schur complement, symmetric)
//! 5. factor `D′`, solve `D′ x₂ = b₂′`
//! 6. back-substitute `A x₁ = b₁ − B x₂`
//!
//! Two independent Cholesky solvers are kept, one for `A` and one for `D′`.
//! Their symbolic analyses are redone at every factorization: the pattern of
//! `D′` depends on numeric fill that can change between iterations, and a
//! factorization locked to a stale pattern silently corrupts the solve.

use crate::hessian::HessianOperator;
use crate::linalg::{LinAlgError, LinAlgResult, ops};
use faer::{
    Mat, Side,
    linalg::solvers::Solve,
    sparse::linalg::solvers::{Llt, SymbolicLlt},
    sparse::{SparseColMat, Triplet},
};
use std::ops::Mul;

/// A Jacobian split column-wise into the two block widths of the Hessian.
pub struct SchurJacobian {
    /// M×L left piece (columns of the eliminated-last block `A`)
    pub left: SparseColMat<usize, f64>,
    /// M×R right piece (columns of the reduced block `D`)
    pub right: SparseColMat<usize, f64>,
}

impl SchurJacobian {
    pub fn new(
        left: SparseColMat<usize, f64>,
        right: SparseColMat<usize, f64>,
    ) -> LinAlgResult<Self> {
        if left.nrows() != right.nrows() {
            return Err(LinAlgError::MatrixConversion(format!(
                "Jacobian pieces disagree on the residual count: {} vs {}",
                left.nrows(),
                right.nrows()
            ))
            .log());
        }
        Ok(Self { left, right })
    }

    /// Total number of parameters L + R
    pub fn num_parameters(&self) -> usize {
        self.left.ncols() + self.right.ncols()
    }
}

pub struct SchurHessian {
    a: Option<SparseColMat<usize, f64>>,
    b: Option<SparseColMat<usize, f64>>,
    d: Option<SparseColMat<usize, f64>>,
    factor_a: Option<Llt<usize, f64>>,
    factor_d: Option<Llt<usize, f64>>,
}

impl SchurHessian {
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            d: None,
            factor_a: None,
            factor_d: None,
        }
    }

    /// Build directly from the three blocks, bypassing the Jacobian products.
    pub fn from_blocks(
        a: SparseColMat<usize, f64>,
        b: SparseColMat<usize, f64>,
        d: SparseColMat<usize, f64>,
    ) -> LinAlgResult<Self> {
        if a.nrows() != a.ncols() || d.nrows() != d.ncols() {
            return Err(
                LinAlgError::MatrixConversion("diagonal blocks must be square".to_string()).log(),
            );
        }
        if b.nrows() != a.nrows() || b.ncols() != d.ncols() {
            return Err(LinAlgError::MatrixConversion(format!(
                "coupling block is {}×{}, expected {}×{}",
                b.nrows(),
                b.ncols(),
                a.nrows(),
                d.ncols()
            ))
            .log());
        }
        Ok(Self {
            a: Some(a),
            b: Some(b),
            d: Some(d),
            factor_a: None,
            factor_d: None,
        })
    }

    /// Width of the `A` block, zero before the Hessian is computed.
    pub fn block_split(&self) -> usize {
        self.a.as_ref().map_or(0, |a| a.ncols())
    }

    fn blocks_or_err(
        &self,
    ) -> LinAlgResult<(
        &SparseColMat<usize, f64>,
        &SparseColMat<usize, f64>,
        &SparseColMat<usize, f64>,
    )> {
        match (&self.a, &self.b, &self.d) {
            (Some(a), Some(b), Some(d)) => Ok((a, b, d)),
            _ => Err(
                LinAlgError::FactorizationFailed("Hessian has not been computed".to_string())
                    .log(),
            ),
        }
    }

    /// Assemble the full (L+R)×(L+R) Hessian as a dense matrix.
    ///
    /// Intended for diagnostics and tests; the optimizers never call this.
    pub fn to_dense(&self) -> LinAlgResult<Mat<f64>> {
        let (a, b, d) = self.blocks_or_err()?;
        let l = a.ncols();
        let r = d.ncols();
        let mut full = Mat::zeros(l + r, l + r);

        let a_dense = ops::to_dense(a);
        let b_dense = ops::to_dense(b);
        let d_dense = ops::to_dense(d);
        for i in 0..l {
            for j in 0..l {
                full[(i, j)] = a_dense[(i, j)];
            }
        }
        for i in 0..l {
            for j in 0..r {
                full[(i, l + j)] = b_dense[(i, j)];
                full[(l + j, i)] = b_dense[(i, j)];
            }
        }
        for i in 0..r {
            for j in 0..r {
                full[(l + i, l + j)] = d_dense[(i, j)];
            }
        }
        Ok(full)
    }
}

impl Default for SchurHessian {
    fn default() -> Self {
        Self::new()
    }
}

impl HessianOperator for SchurHessian {
    type Jacobian = SchurJacobian;

    fn resize(&mut self, _n: usize) {
        self.a = None;
        self.b = None;
        self.d = None;
        self.factor_a = None;
        self.factor_d = None;
    }

    fn compute_hessian(&mut self, jacobian: &Self::Jacobian) -> LinAlgResult<()> {
        let jl_t = jacobian
            .left
            .as_ref()
            .transpose()
            .to_col_major()
            .map_err(|e| {
                LinAlgError::MatrixConversion(
                    "Failed to convert transposed left Jacobian to column-major format"
                        .to_string(),
                )
                .log_with_source(e)
            })?;
        let jr_t = jacobian
            .right
            .as_ref()
            .transpose()
            .to_col_major()
            .map_err(|e| {
                LinAlgError::MatrixConversion(
                    "Failed to convert transposed right Jacobian to column-major format"
                        .to_string(),
                )
                .log_with_source(e)
            })?;

        self.b = Some(jl_t.clone().mul(&jacobian.right));
        self.a = Some(jl_t.mul(&jacobian.left));
        self.d = Some(jr_t.mul(&jacobian.right));
        self.factor_a = None;
        self.factor_d = None;
        Ok(())
    }

    fn compute_gradient(
        &self,
        jacobian: &Self::Jacobian,
        residuals: &Mat<f64>,
        gradient: &mut Mat<f64>,
    ) {
        let l = jacobian.left.ncols();
        let r = jacobian.right.ncols();
        if gradient.nrows() != l + r {
            *gradient = Mat::zeros(l + r, 1);
        }

        let g_left = jacobian.left.as_ref().transpose() * residuals;
        let g_right = jacobian.right.as_ref().transpose() * residuals;
        ops::insert_rows(&g_left, gradient, 0);
        ops::insert_rows(&g_right, gradient, l);
    }

    fn extract_diagonals(&self, diag: &mut Mat<f64>) {
        if let (Some(a), Some(d)) = (&self.a, &self.d) {
            ops::extract_diag_sparse(a, diag, 0);
            ops::extract_diag_sparse(d, diag, a.ncols());
        }
    }

    fn set_diagonals(&mut self, diag: &Mat<f64>) -> LinAlgResult<()> {
        let (a, _, d) = self.blocks_or_err()?;
        let l = a.ncols();
        let new_a = ops::with_diagonal(a, diag, 0)?;
        let new_d = ops::with_diagonal(d, diag, l)?;
        self.a = Some(new_a);
        self.d = Some(new_d);
        self.factor_a = None;
        self.factor_d = None;
        Ok(())
    }

    fn divide_rows_cols(&mut self, scaling: &Mat<f64>) -> LinAlgResult<()> {
        let (a, b, d) = self.blocks_or_err()?;
        let l = a.ncols();
        let new_a = ops::divide_rows_cols_sparse(scaling, 0, a, scaling, 0)?;
        let new_b = ops::divide_rows_cols_sparse(scaling, 0, b, scaling, l)?;
        let new_d = ops::divide_rows_cols_sparse(scaling, l, d, scaling, l)?;
        self.a = Some(new_a);
        self.b = Some(new_b);
        self.d = Some(new_d);
        self.factor_a = None;
        self.factor_d = None;
        Ok(())
    }

    fn inner_vector_hessian(&self, v: &Mat<f64>) -> f64 {
        match (&self.a, &self.b, &self.d) {
            (Some(a), Some(b), Some(d)) => {
                let l = a.ncols();
                let mut sum = ops::inner_product_sparse(v, 0, a, v, 0);
                sum += 2.0 * ops::inner_product_sparse(v, 0, b, v, l);
                sum += ops::inner_product_sparse(v, l, d, v, l);
                sum
            }
            _ => 0.0,
        }
    }

    fn initialize_solver(&mut self) -> LinAlgResult<()> {
        let (a, _, _) = self.blocks_or_err()?;

        let symbolic = SymbolicLlt::try_new(a.symbolic(), Side::Lower).map_err(|e| {
            LinAlgError::FactorizationFailed(
                "Symbolic Cholesky decomposition of A failed".to_string(),
            )
            .log_with_source(e)
        })?;
        let cholesky = Llt::try_new_with_symbolic(symbolic, a.as_ref(), Side::Lower)
            .map_err(|e| LinAlgError::SingularMatrix.log_with_source(e))?;

        self.factor_a = Some(cholesky);
        self.factor_d = None;
        Ok(())
    }

    fn solve(&mut self, rhs: &Mat<f64>, solution: &mut Mat<f64>) -> bool {
        let (Some(b), Some(d)) = (&self.b, &self.d) else {
            return false;
        };
        let Some(factor_a) = &self.factor_a else {
            return false;
        };

        let l = b.nrows();
        let r = b.ncols();

        let b1 = ops::extract_rows(rhs, 0, l);
        let b2 = ops::extract_rows(rhs, l, r);

        // y = A⁻¹ b₁
        let y = factor_a.solve(&b1);

        // b₂′ = b₂ − Bᵀ y
        let bt_y = b.as_ref().transpose() * &y;
        let b2_reduced = &b2 - &bt_y;

        // M = A⁻¹ B, with B densified; R is small so the dense right-hand
        // side stays cheap while A keeps its sparse factorization
        let b_dense = ops::to_dense(b);
        let m = factor_a.solve(&b_dense);

        // D′ = D − Bᵀ M
        let bt_m = b.as_ref().transpose() * &m;
        let d_dense = ops::to_dense(d);
        let mut triplets = Vec::with_capacity(r * r);
        for col in 0..r {
            for row in 0..r {
                triplets.push(Triplet::new(
                    row,
                    col,
                    d_dense[(row, col)] - bt_m[(row, col)],
                ));
            }
        }
        let Ok(d_reduced) = SparseColMat::try_new_from_triplets(r, r, &triplets) else {
            return false;
        };

        // factor and solve the reduced system D′ x₂ = b₂′
        let Ok(symbolic) = SymbolicLlt::try_new(d_reduced.symbolic(), Side::Lower) else {
            return false;
        };
        let Ok(factor_d) = Llt::try_new_with_symbolic(symbolic, d_reduced.as_ref(), Side::Lower)
        else {
            return false;
        };
        let x2 = factor_d.solve(&b2_reduced);

        // back-substitution: A x₁ = b₁ − B x₂
        let b_x2 = b * &x2;
        let rhs1 = &b1 - &b_x2;
        let x1 = factor_a.solve(&rhs1);

        if solution.nrows() != l + r {
            *solution = Mat::zeros(l + r, 1);
        }
        ops::insert_rows(&x1, solution, 0);
        ops::insert_rows(&x2, solution, l);
        self.factor_d = Some(factor_d);

        true
    }
}

//! Small dense and sparse kernels used by the Hessian backends.
//!
//! faer covers products and factorizations; the operations here are the
//! diagonal and scaling primitives the optimizers need, written once per
//! backend. The sparse variants take row/column offsets so that block
//! Hessians can address a full-length vector without copying slices out.

use crate::linalg::{LinAlgError, LinAlgResult};
use faer::Mat;
use faer::sparse::{SparseColMat, Triplet};

/// Largest absolute element of a column vector.
pub fn max_abs(v: &Mat<f64>) -> f64 {
    let mut max = 0.0_f64;
    for i in 0..v.nrows() {
        max = max.max(v[(i, 0)].abs());
    }
    max
}

/// Dot product of two column vectors.
pub fn dot(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
    let mut sum = 0.0;
    for i in 0..a.nrows() {
        sum += a[(i, 0)] * b[(i, 0)];
    }
    sum
}

/// True if every element of the vector is finite.
pub fn is_finite(v: &Mat<f64>) -> bool {
    for i in 0..v.nrows() {
        if !v[(i, 0)].is_finite() {
            return false;
        }
    }
    true
}

/// Copy `src` into `dst` starting at row `offset`.
pub fn insert_rows(src: &Mat<f64>, dst: &mut Mat<f64>, offset: usize) {
    for i in 0..src.nrows() {
        dst[(offset + i, 0)] = src[(i, 0)];
    }
}

/// Extract rows `[offset, offset + len)` of `src` into a new vector.
pub fn extract_rows(src: &Mat<f64>, offset: usize, len: usize) -> Mat<f64> {
    Mat::from_fn(len, 1, |i, _| src[(offset + i, 0)])
}

/// Write the diagonal of a dense matrix into `diag` starting at `offset`.
pub fn extract_diag_dense(mat: &Mat<f64>, diag: &mut Mat<f64>, offset: usize) {
    for i in 0..mat.ncols() {
        diag[(offset + i, 0)] = mat[(i, i)];
    }
}

/// Write the diagonal of a sparse matrix into `diag` starting at `offset`.
///
/// A structurally missing diagonal entry reads as zero.
pub fn extract_diag_sparse(mat: &SparseColMat<usize, f64>, diag: &mut Mat<f64>, offset: usize) {
    let symbolic = mat.symbolic();
    for col in 0..mat.ncols() {
        let mut value = 0.0;
        let row_indices = symbolic.row_idx_of_col_raw(col);
        let col_values = mat.val_of_col(col);
        for (idx, &row) in row_indices.iter().enumerate() {
            if row == col {
                value = col_values[idx];
                break;
            }
        }
        diag[(offset + col, 0)] = value;
    }
}

/// Rebuild a sparse matrix with its diagonal replaced by
/// `diag[offset..offset + n]`.
///
/// Structurally missing diagonal entries are inserted.
pub fn with_diagonal(
    mat: &SparseColMat<usize, f64>,
    diag: &Mat<f64>,
    offset: usize,
) -> LinAlgResult<SparseColMat<usize, f64>> {
    let n = mat.ncols();
    let mut triplets = Vec::new();
    let mut diag_present = vec![false; n];

    let symbolic = mat.symbolic();
    for col in 0..n {
        let row_indices = symbolic.row_idx_of_col_raw(col);
        let col_values = mat.val_of_col(col);
        for (idx, &row) in row_indices.iter().enumerate() {
            if row == col {
                diag_present[col] = true;
                triplets.push(Triplet::new(row, col, diag[(offset + col, 0)]));
            } else {
                triplets.push(Triplet::new(row, col, col_values[idx]));
            }
        }
    }
    for (col, present) in diag_present.iter().enumerate() {
        if !present {
            triplets.push(Triplet::new(col, col, diag[(offset + col, 0)]));
        }
    }

    SparseColMat::try_new_from_triplets(mat.nrows(), n, &triplets).map_err(|e| {
        LinAlgError::SparseMatrixCreation("diagonal replacement".to_string()).log_with_source(e)
    })
}

/// In-place symmetric scaling of a dense matrix:
/// `M ← diag(1/s) · M · diag(1/s)`.
pub fn divide_rows_cols_dense(scaling: &Mat<f64>, mat: &mut Mat<f64>) {
    for col in 0..mat.ncols() {
        for row in 0..mat.nrows() {
            mat[(row, col)] /= scaling[(row, 0)] * scaling[(col, 0)];
        }
    }
}

/// Rebuild a sparse matrix with rows divided by
/// `row_scale[row_offset + i]` and columns by `col_scale[col_offset + j]`.
///
/// The offsets let a block of a larger Hessian address the scaling vector of
/// the full parameter space.
pub fn divide_rows_cols_sparse(
    row_scale: &Mat<f64>,
    row_offset: usize,
    mat: &SparseColMat<usize, f64>,
    col_scale: &Mat<f64>,
    col_offset: usize,
) -> LinAlgResult<SparseColMat<usize, f64>> {
    let mut triplets = Vec::new();
    let symbolic = mat.symbolic();

    for col in 0..mat.ncols() {
        let row_indices = symbolic.row_idx_of_col_raw(col);
        let col_values = mat.val_of_col(col);
        let cs = col_scale[(col_offset + col, 0)];
        for (idx, &row) in row_indices.iter().enumerate() {
            let rs = row_scale[(row_offset + row, 0)];
            triplets.push(Triplet::new(row, col, col_values[idx] / (rs * cs)));
        }
    }

    SparseColMat::try_new_from_triplets(mat.nrows(), mat.ncols(), &triplets).map_err(|e| {
        LinAlgError::SparseMatrixCreation("row/column scaling".to_string()).log_with_source(e)
    })
}

/// Inner product `v[row_offset..]ᵀ · M · w[col_offset..]` against a sparse
/// matrix, without materializing the sub-vectors.
pub fn inner_product_sparse(
    v: &Mat<f64>,
    row_offset: usize,
    mat: &SparseColMat<usize, f64>,
    w: &Mat<f64>,
    col_offset: usize,
) -> f64 {
    let symbolic = mat.symbolic();
    let mut sum = 0.0;

    for col in 0..mat.ncols() {
        let wj = w[(col_offset + col, 0)];
        if wj == 0.0 {
            continue;
        }
        let row_indices = symbolic.row_idx_of_col_raw(col);
        let col_values = mat.val_of_col(col);
        for (idx, &row) in row_indices.iter().enumerate() {
            sum += v[(row_offset + row, 0)] * col_values[idx] * wj;
        }
    }

    sum
}

/// Densify a sparse matrix.
pub fn to_dense(mat: &SparseColMat<usize, f64>) -> Mat<f64> {
    let mut dense = Mat::zeros(mat.nrows(), mat.ncols());
    let symbolic = mat.symbolic();
    for col in 0..mat.ncols() {
        let row_indices = symbolic.row_idx_of_col_raw(col);
        let col_values = mat.val_of_col(col);
        for (idx, &row) in row_indices.iter().enumerate() {
            dense[(row, col)] = col_values[idx];
        }
    }
    dense
}

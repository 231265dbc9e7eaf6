//! # Covariance Matrix Calculations
//!
//! Covariance, correlation and standard errors from the Jacobian of the
//! residuals at the solution, plus the numerical rank used to flag fits whose
//! parameters are not all identifiable.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::error::{EisFitError, Result};
use crate::utils::matrix_convert::ndarray_to_nalgebra;

/// Relative singular-value threshold below which a direction is treated as null.
pub const RANK_TOLERANCE: f64 = 1e-10;

/// Singular values and right singular vectors (as rows of `Vᵀ`).
fn svd(matrix: DMatrix<f64>) -> Result<(Vec<f64>, DMatrix<f64>)> {
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(EisFitError::LinearAlgebraError(
            "matrix has non-finite entries".to_string(),
        ));
    }
    let svd = matrix
        .try_svd(false, true, f64::EPSILON, 0)
        .ok_or_else(|| EisFitError::LinearAlgebraError("SVD did not converge".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| EisFitError::LinearAlgebraError("SVD produced no V".to_string()))?;
    Ok((svd.singular_values.iter().copied().collect(), v_t))
}

/// Numerical rank of the Jacobian after scaling each column to unit norm.
///
/// Column scaling makes the test insensitive to parameter units (ohms next
/// to farads). An all-zero column contributes nothing to the rank.
pub fn numerical_rank(jacobian: &Array2<f64>) -> Result<usize> {
    if jacobian.is_empty() {
        return Ok(0);
    }

    let mut scaled = jacobian.clone();
    for mut column in scaled.columns_mut() {
        let norm = column.dot(&column).sqrt();
        if norm > 0.0 && norm.is_finite() {
            column.mapv_inplace(|v| v / norm);
        }
    }

    let (singular_values, _) = svd(ndarray_to_nalgebra(&scaled))?;
    let s_max = singular_values.iter().cloned().fold(0.0, f64::max);
    if s_max == 0.0 {
        return Ok(0);
    }
    Ok(singular_values
        .iter()
        .filter(|&&s| s > RANK_TOLERANCE * s_max)
        .count())
}

/// Calculate covariance matrix from Jacobian matrix.
///
/// For nonlinear least-squares problems, the covariance matrix is estimated as:
///   covar = redchi * pinv(J^T * J)
/// computed from the SVD of J, dropping singular values below
/// [`RANK_TOLERANCE`] relative to the largest.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Result<Array2<f64>> {
    let n = jacobian.ncols();
    if jacobian.nrows() == 0 || n == 0 {
        return Err(EisFitError::DimensionMismatch(
            "covariance needs a non-empty Jacobian".to_string(),
        ));
    }

    let (singular_values, v_t) = svd(ndarray_to_nalgebra(jacobian))?;
    let s_max = singular_values.iter().cloned().fold(0.0, f64::max);

    let mut covar = Array2::<f64>::zeros((n, n));
    for (k, &s) in singular_values.iter().enumerate() {
        if s <= RANK_TOLERANCE * s_max || s == 0.0 {
            continue;
        }
        let inv_s2 = 1.0 / (s * s);
        for i in 0..n {
            for j in 0..n {
                covar[[i, j]] += v_t[(k, i)] * v_t[(k, j)] * inv_s2;
            }
        }
    }

    Ok(covar * redchi)
}

/// Calculate correlation matrix from covariance matrix.
///
/// correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}

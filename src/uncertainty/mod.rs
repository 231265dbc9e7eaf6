//! # Uncertainty Calculation
//!
//! Linearized parameter uncertainties from the Jacobian at the solution. This
//! is the covariance the solver exposes; no confidence intervals or resampling.

mod covariance;

pub use covariance::{
    calculate_correlation, calculate_covariance, numerical_rank,
    standard_errors_from_covariance, RANK_TOLERANCE,
};

use ndarray::{Array1, Array2};
use tracing::warn;

use crate::error::Result;

/// Covariance-derived quantities for one fit.
#[derive(Debug, Clone)]
pub struct CovarianceEstimate {
    /// Numerical rank of the column-scaled Jacobian
    pub rank: usize,
    /// True when the rank is below the parameter count
    pub rank_deficient: bool,
    /// Reduced chi-square, `cost / (m − n)`; `None` without degrees of freedom
    pub redchi: Option<f64>,
    /// Covariance matrix; only for full-rank fits with degrees of freedom
    pub covariance: Option<Array2<f64>>,
    pub standard_errors: Option<Array1<f64>>,
    pub correlation: Option<Array2<f64>>,
}

/// Estimate parameter covariance from the residual Jacobian and the final cost.
pub fn estimate(jacobian: &Array2<f64>, cost: f64) -> Result<CovarianceEstimate> {
    let (m, n) = jacobian.dim();
    if jacobian.iter().any(|v| !v.is_finite()) {
        warn!("non-finite Jacobian at the solution; skipping covariance");
        return Ok(CovarianceEstimate {
            rank: 0,
            rank_deficient: true,
            redchi: None,
            covariance: None,
            standard_errors: None,
            correlation: None,
        });
    }
    let rank = numerical_rank(jacobian)?;
    let rank_deficient = rank < n;
    let redchi = if m > n {
        Some(cost / (m - n) as f64)
    } else {
        None
    };

    let covariance = match redchi {
        Some(redchi) if !rank_deficient => Some(calculate_covariance(jacobian, redchi)?),
        _ => None,
    };
    let standard_errors = covariance.as_ref().map(standard_errors_from_covariance);
    let correlation = covariance.as_ref().map(calculate_correlation);

    Ok(CovarianceEstimate {
        rank,
        rank_deficient,
        redchi,
        covariance,
        standard_errors,
        correlation,
    })
}

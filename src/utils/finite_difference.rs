//! Finite difference methods for numerical differentiation.

use crate::error::{EisFitError, Result};
use crate::parameters::Bounds;
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step size: the square root of machine epsilon.
pub const DEFAULT_EPSILON: f64 = 1.4901161193847656e-8;

/// Compute the Jacobian matrix using forward finite differences.
///
/// The Jacobian is the matrix of partial derivatives of the residuals with
/// respect to the parameters: J[i,j] = ∂residual[i]/∂param[j].
pub fn jacobian<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    jacobian_from_residuals(problem, params, &residuals, epsilon)
}

/// Forward-difference Jacobian reusing residuals already evaluated at `params`.
///
/// Costs exactly `params.len()` residual evaluations.
pub fn jacobian_from_residuals<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    difference_jacobian(problem, params, residuals, epsilon, |_, _| false)
}

/// Finite-difference Jacobian that never steps outside `bounds`.
///
/// Columns whose forward step would cross the upper bound use a backward
/// step instead.
pub fn jacobian_within_bounds<P: Problem + ?Sized>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    bounds: &[Bounds],
) -> Result<Array2<f64>> {
    if bounds.len() != params.len() {
        return Err(EisFitError::DimensionMismatch(format!(
            "Expected bounds for {} parameters, got {}",
            params.len(),
            bounds.len()
        )));
    }
    difference_jacobian(problem, params, residuals, None, |j, stepped| {
        stepped > bounds[j].max
    })
}

fn difference_jacobian<P, F>(
    problem: &P,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
    step_backward: F,
) -> Result<Array2<f64>>
where
    P: Problem + ?Sized,
    F: Fn(usize, f64) -> bool,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = residuals.len();

    if n_residuals != problem.residual_count() {
        return Err(EisFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            problem.residual_count(),
            n_residuals
        )));
    }

    let mut jac = Array2::zeros((n_residuals, n_params));

    for j in 0..n_params {
        let mut params_perturbed = params.clone();

        // Step scales with the parameter magnitude
        let param_j = params[j];
        let eps_j = if param_j.abs() > eps {
            param_j.abs() * eps
        } else {
            eps
        };
        params_perturbed[j] = if step_backward(j, param_j + eps_j) {
            param_j - eps_j
        } else {
            param_j + eps_j
        };
        // Use the representable step
        let h = params_perturbed[j] - param_j;

        let residuals_perturbed = problem.eval(&params_perturbed)?;

        for i in 0..n_residuals {
            jac[[i, j]] = (residuals_perturbed[i] - residuals[i]) / h;
        }
    }

    Ok(jac)
}

//! Problem definition trait and the bounds adapter.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm,
//! and [`BoundedProblem`], which lets an unconstrained solver work on a
//! problem whose parameters carry bounds.

use ndarray::{Array1, Array2};

use crate::error::{EisFitError, Result};
use crate::parameters::ParameterMapping;

/// A trait representing a nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Check if this problem provides a custom Jacobian implementation.
    ///
    /// When false the optimizer builds the finite-difference Jacobian itself
    /// and reuses the residuals it already holds.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Exposes a bounded problem to the solver in unconstrained internal coordinates.
///
/// Every evaluation maps the internal vector through the per-parameter bounds
/// transform before calling the wrapped problem, so the wrapped problem only
/// ever sees feasible parameters.
pub struct BoundedProblem<'a, P: Problem> {
    inner: &'a P,
    mapping: ParameterMapping,
}

impl<'a, P: Problem> BoundedProblem<'a, P> {
    pub fn new(inner: &'a P, mapping: ParameterMapping) -> Result<Self> {
        if mapping.len() != inner.parameter_count() {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected bounds for {} parameters, got {}",
                inner.parameter_count(),
                mapping.len()
            )));
        }
        Ok(Self { inner, mapping })
    }

    pub fn mapping(&self) -> &ParameterMapping {
        &self.mapping
    }

    pub fn to_external(&self, internal: &Array1<f64>) -> Array1<f64> {
        self.mapping.to_external(internal)
    }

    pub fn to_internal(&self, external: &Array1<f64>) -> Result<Array1<f64>> {
        Ok(self.mapping.to_internal(external)?)
    }
}

impl<'a, P: Problem> Problem for BoundedProblem<'a, P> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.inner.eval(&self.mapping.to_external(params))
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }
}

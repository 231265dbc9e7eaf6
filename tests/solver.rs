//! Integration tests for the Problem trait and the Levenberg-Marquardt solver.

use approx::assert_relative_eq;
use eisfit_rs::lm::LevenbergMarquardt;
use eisfit_rs::parameters::{Bounds, ParameterMapping};
use eisfit_rs::problem::BoundedProblem;
use eisfit_rs::utils::finite_difference;
use eisfit_rs::{EisFitError, Problem, Result};
use ndarray::{Array1, Array2};

/// RC relaxation after a current step: v(t) = v0·exp(−t/τ).
struct Relaxation {
    t: Array1<f64>,
    v: Array1<f64>,
    analytic: bool,
}

impl Relaxation {
    fn new(v0: f64, tau: f64, analytic: bool) -> Self {
        let t = Array1::linspace(0.0, 5.0, 20);
        let v = t.mapv(|t| v0 * (-t / tau).exp());
        Self { t, v, analytic }
    }
}

impl Problem for Relaxation {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != 2 {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }
        let (v0, tau) = (params[0], params[1]);
        Ok(self
            .t
            .iter()
            .zip(self.v.iter())
            .map(|(t, v)| v0 * (-t / tau).exp() - v)
            .collect())
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.t.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        if !self.analytic {
            return finite_difference::jacobian(self, params, None);
        }
        let (v0, tau) = (params[0], params[1]);
        let mut jac = Array2::zeros((self.t.len(), 2));
        for (i, t) in self.t.iter().enumerate() {
            let e = (-t / tau).exp();
            jac[[i, 0]] = e;
            jac[[i, 1]] = v0 * e * t / (tau * tau);
        }
        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        self.analytic
    }
}

#[test]
fn test_analytic_jacobian_matches_finite_differences() -> Result<()> {
    let problem = Relaxation::new(3.0, 1.5, true);
    let params = Array1::from(vec![2.0, 0.8]);

    let analytic = problem.jacobian(&params)?;
    let numeric = finite_difference::jacobian(&problem, &params, None)?;
    for (a, n) in analytic.iter().zip(numeric.iter()) {
        assert_relative_eq!(*a, *n, epsilon = 1e-6, max_relative = 1e-5);
    }
    Ok(())
}

#[test]
fn test_relaxation_fit_with_both_jacobians() -> Result<()> {
    for analytic in [true, false] {
        let problem = Relaxation::new(3.0, 1.5, analytic);
        let result = LevenbergMarquardt::new().minimize(&problem, Array1::from(vec![1.0, 0.5]))?;

        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.params[0], 3.0, max_relative = 1e-6);
        assert_relative_eq!(result.params[1], 1.5, max_relative = 1e-6);
        assert!(result.cost < 1e-12);
    }
    Ok(())
}

#[test]
fn test_bounded_problem_recovers_interior_solution() -> Result<()> {
    let problem = Relaxation::new(3.0, 1.5, false);
    let bounds = [Bounds::min_only(1e-12), Bounds::new(0.1, 10.0)?];
    let bounded = BoundedProblem::new(&problem, ParameterMapping::new(&bounds))?;

    let start = bounded.to_internal(&Array1::from(vec![1.0, 0.5]))?;
    let result = LevenbergMarquardt::new().minimize(&bounded, start)?;
    let values = bounded.to_external(&result.params);

    assert!(result.success, "{}", result.message);
    assert_relative_eq!(values[0], 3.0, max_relative = 1e-6);
    assert_relative_eq!(values[1], 1.5, max_relative = 1e-6);
    Ok(())
}

#[test]
fn test_bounded_problem_never_leaves_its_box() -> Result<()> {
    // True τ = 2.0 lies above the allowed range
    let problem = Relaxation::new(3.0, 2.0, false);
    let bounds = [Bounds::min_only(1e-12), Bounds::new(0.1, 0.5)?];
    let bounded = BoundedProblem::new(&problem, ParameterMapping::new(&bounds))?;

    let start = bounded.to_internal(&Array1::from(vec![1.0, 0.3]))?;
    let result = LevenbergMarquardt::new().minimize(&bounded, start)?;
    let values = bounded.to_external(&result.params);

    assert!(values[1] <= 0.5);
    assert!(values[1] > 0.4, "tau = {}", values[1]);
    assert!(values[0] > 0.0);
    assert!(result.iterations <= 2000);
    Ok(())
}

#[test]
fn test_evaluation_errors_propagate() {
    let problem = Relaxation::new(3.0, 1.5, true);
    let err = LevenbergMarquardt::new().minimize(&problem, Array1::from(vec![1.0, 2.0, 3.0]));
    assert!(err.is_err());
}

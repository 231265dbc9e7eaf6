//! Implementation of the Levenberg-Marquardt algorithm.

use ndarray::{Array1, Array2};
use std::fmt;
use tracing::{debug, trace};

use crate::error::{EisFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference::jacobian_from_residuals;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::LmStep;
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted iterations
    pub iterations: usize,

    /// Number of residual evaluations, including those spent on Jacobians
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// Why the optimization stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// The Jacobian matrix at the solution (if requested)
    pub jacobian: Option<Array2<f64>>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for the relative cost reduction.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for the relative step length.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set whether to calculate and return the Jacobian at the solution.
    pub fn with_calc_jacobian(mut self, calc_jacobian: bool) -> Self {
        self.config.calc_jacobian = calc_jacobian;
        self
    }

    fn validate_config(&self) -> Result<()> {
        let c = &self.config;
        if c.max_iterations == 0 {
            return Err(EisFitError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        for (name, value) in [("ftol", c.ftol), ("xtol", c.xtol), ("gtol", c.gtol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(EisFitError::InvalidInput(format!(
                    "{} must be a non-negative finite number, got {}",
                    name, value
                )));
            }
        }
        if !(c.initial_lambda > 0.0 && c.initial_lambda < c.max_lambda) {
            return Err(EisFitError::InvalidInput(format!(
                "initial lambda {} must be positive and below the maximum {}",
                c.initial_lambda, c.max_lambda
            )));
        }
        if !(c.lambda_up_factor > 1.0 && c.lambda_down_factor > 0.0 && c.lambda_down_factor < 1.0)
        {
            return Err(EisFitError::InvalidInput(
                "lambda factors must satisfy up > 1 and 0 < down < 1".to_string(),
            ));
        }
        Ok(())
    }

    fn jacobian<P: Problem>(
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
        func_evals: &mut usize,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(params)
        } else {
            *func_evals += params.len();
            jacobian_from_residuals(problem, params, residuals, None)
        }
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Evaluation errors raised by the problem propagate unchanged. Running out
    /// of iterations or damping is not an error: it is reported through
    /// [`LmResult::success`] and [`LmResult::status`] along with the best
    /// parameters found.
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        self.validate_config()?;

        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let criteria = ConvergenceCriteria::from_config(&self.config);
        let mut trust_region = TrustRegion::from_config(&self.config);

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;
        if residuals.len() != problem.residual_count() {
            return Err(EisFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        let mut cost: f64 = residuals.iter().map(|r| r.powi(2)).sum();
        if !cost.is_finite() {
            return Err(EisFitError::ModelEvaluation(
                "initial parameters produce non-finite residuals".to_string(),
            ));
        }
        let mut iterations = 0;

        let status = 'outer: loop {
            let jacobian = Self::jacobian(problem, &params, &residuals, &mut func_evals)?;
            let j_t_j = jacobian.t().dot(&jacobian);
            let gradient = jacobian.t().dot(&residuals);
            let gradient_norm = gradient.dot(&gradient).sqrt();

            let status = criteria.check_start(gradient_norm, iterations);
            if status.is_terminated() {
                break status;
            }

            let scaling = LmStep::scaling(&j_t_j);
            let param_norm = params.dot(&params).sqrt();

            // Inner loop: raise damping until a step is accepted
            loop {
                let lambda = trust_region.lambda;
                let step = match LmStep::calculate_step(&j_t_j, &gradient, &scaling, lambda) {
                    Some(step) => step,
                    None => {
                        trust_region.increase();
                        if trust_region.is_saturated() {
                            break 'outer ConvergenceStatus::DampingSaturated;
                        }
                        continue;
                    }
                };

                let step_norm = step.step.dot(&step.step).sqrt();
                let status = criteria.check_step(step_norm, param_norm);
                if status.is_terminated() {
                    break 'outer status;
                }

                let new_params = &params + &step.step;
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost: f64 = new_residuals.iter().map(|r| r.powi(2)).sum();

                let rho = TrustRegion::gain_ratio(cost, new_cost, step.predicted_reduction);
                trace!(lambda, cost, new_cost, rho, "trial step");

                if trust_region.update_lambda(rho) {
                    let old_cost = cost;
                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    iterations += 1;
                    debug!(
                        iteration = iterations,
                        cost,
                        lambda = trust_region.lambda,
                        "accepted step"
                    );

                    let status = criteria.check_cost(old_cost, new_cost);
                    if status.is_terminated() {
                        break 'outer status;
                    }
                    break;
                }

                if trust_region.is_saturated() {
                    break 'outer ConvergenceStatus::DampingSaturated;
                }
            }
        };

        let jacobian = if self.config.calc_jacobian {
            Some(Self::jacobian(problem, &params, &residuals, &mut func_evals)?)
        } else {
            None
        };

        let message = match status {
            ConvergenceStatus::MaxIterationsReached => format!(
                "Maximum iterations ({}) reached",
                self.config.max_iterations
            ),
            other => other.description().to_string(),
        };

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            status,
            message,
            jacobian,
        })
    }
}

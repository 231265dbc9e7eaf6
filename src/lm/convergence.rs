//! Convergence criteria for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

use super::config::LmConfig;

/// Possible convergence states for an optimization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The algorithm has converged due to a small parameter change.
    ParameterConvergence,

    /// The algorithm has converged due to a small function value change.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small gradient.
    GradientConvergence,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// No acceptable step was found before the damping parameter hit its ceiling.
    DampingSaturated,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => {
                "Converged: small function value change"
            }
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::DampingSaturated => {
                "Terminated: damping reached its maximum without an acceptable step"
            }
        }
    }
}

/// Criteria for determining when an optimization algorithm has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for the relative step length.
    pub xtol: f64,

    /// Tolerance for the relative cost reduction.
    pub ftol: f64,

    /// Tolerance for gradient norm.
    pub gtol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_iterations,
        }
    }

    pub fn from_config(config: &LmConfig) -> Self {
        Self::new(config.xtol, config.ftol, config.gtol, config.max_iterations)
    }

    /// Checks the conditions evaluated before a step is attempted.
    pub fn check_start(&self, gradient_norm: f64, iterations: usize) -> ConvergenceStatus {
        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }
        if gradient_norm < self.gtol {
            return ConvergenceStatus::GradientConvergence;
        }
        ConvergenceStatus::Running
    }

    /// A trial step with `‖δ‖ ≤ xtol·(‖x‖ + xtol)` cannot move the parameters
    /// any further in a meaningful way.
    pub fn check_step(&self, step_norm: f64, param_norm: f64) -> ConvergenceStatus {
        if step_norm <= self.xtol * (param_norm + self.xtol) {
            ConvergenceStatus::ParameterConvergence
        } else {
            ConvergenceStatus::Running
        }
    }

    /// Checks the relative cost reduction of an accepted step.
    pub fn check_cost(&self, cost: f64, new_cost: f64) -> ConvergenceStatus {
        if cost - new_cost <= self.ftol * cost {
            ConvergenceStatus::FunctionValueConvergence
        } else {
            ConvergenceStatus::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convergence_criteria() {
        let criteria = ConvergenceCriteria::new(1e-8, 1e-8, 1e-8, 100);

        assert_eq!(
            criteria.check_start(0.1, 100),
            ConvergenceStatus::MaxIterationsReached
        );
        assert_eq!(
            criteria.check_start(1e-9, 50),
            ConvergenceStatus::GradientConvergence
        );
        assert_eq!(criteria.check_start(0.1, 50), ConvergenceStatus::Running);

        assert_eq!(
            criteria.check_step(1e-9, 1.0),
            ConvergenceStatus::ParameterConvergence
        );
        assert_eq!(criteria.check_step(1e-3, 1.0), ConvergenceStatus::Running);

        assert_eq!(
            criteria.check_cost(10.0, 9.99999999999),
            ConvergenceStatus::FunctionValueConvergence
        );
        assert_eq!(criteria.check_cost(10.0, 9.0), ConvergenceStatus::Running);
        // A zero cost is already converged
        assert_eq!(
            criteria.check_cost(0.0, 0.0),
            ConvergenceStatus::FunctionValueConvergence
        );
    }

    #[test]
    fn test_convergence_status_methods() {
        assert!(!ConvergenceStatus::Running.is_terminated());
        assert!(ConvergenceStatus::ParameterConvergence.is_terminated());
        assert!(ConvergenceStatus::DampingSaturated.is_terminated());

        assert!(ConvergenceStatus::ParameterConvergence.is_converged());
        assert!(ConvergenceStatus::FunctionValueConvergence.is_converged());
        assert!(ConvergenceStatus::GradientConvergence.is_converged());
        assert!(!ConvergenceStatus::MaxIterationsReached.is_converged());
        assert!(!ConvergenceStatus::DampingSaturated.is_converged());
    }
}

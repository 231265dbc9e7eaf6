//! Fit driver.
//!
//! [`fit_spectrum`] resolves seeds and bounds for a topology, runs the bounded
//! Levenberg-Marquardt solver over the residual builder, and packages the
//! outcome as a [`FitResult`]. Non-convergence, bound saturation and rank
//! deficiency are reported on the result; only input and model-evaluation
//! errors are returned as `Err`.

pub mod guess;

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, info, warn};

use crate::circuit::{ParameterKind, Topology};
use crate::error::{EisFitError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::parameters::{BoundSide, Bounds, ParameterMapping};
use crate::problem::{BoundedProblem, Problem};
use crate::residual::{ImpedanceProblem, Weighting};
use crate::spectrum::Spectrum;
use crate::uncertainty;
use crate::utils::finite_difference::jacobian_within_bounds;

/// Overall outcome of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Succeeded,
    Failed,
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitStatus::Succeeded => write!(f, "succeeded"),
            FitStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One fitted parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterEstimate {
    pub name: String,
    pub unit: &'static str,
    pub value: f64,
    /// Linearized standard error, when the covariance is available
    pub std_error: Option<f64>,
    pub bounds: Bounds,
    /// Set when the value ended on a bound
    pub at_bound: Option<BoundSide>,
}

/// Everything known about one completed fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub topology: Topology,
    pub parameters: Vec<ParameterEstimate>,
    /// `√cost`
    pub residual_norm: f64,
    /// Sum of squared (weighted) residuals
    pub cost: f64,
    /// `√(cost / residual count)`
    pub rmse: f64,
    pub iterations: usize,
    pub func_evals: usize,
    pub status: FitStatus,
    pub message: String,
    pub rank_deficient: bool,
    /// `cost / (m − n)`; `None` without degrees of freedom
    pub redchi: Option<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    pub covariance: Option<Array2<f64>>,
    #[serde(serialize_with = "serialize_matrix")]
    pub correlation: Option<Array2<f64>>,
}

fn serialize_matrix<S: Serializer>(
    matrix: &Option<Array2<f64>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let rows: Option<Vec<Vec<f64>>> = matrix
        .as_ref()
        .map(|m| m.rows().into_iter().map(|row| row.to_vec()).collect());
    rows.serialize(serializer)
}

impl FitResult {
    pub fn is_success(&self) -> bool {
        self.status == FitStatus::Succeeded
    }

    /// Fitted values in the topology's parameter order.
    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }

    /// Look up a parameter by name (ASCII case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&ParameterEstimate> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Parameters that ended on a bound.
    pub fn bound_hits(&self) -> impl Iterator<Item = &ParameterEstimate> {
        self.parameters.iter().filter(|p| p.at_bound.is_some())
    }

    /// Parameter pairs whose correlation magnitude is at least `threshold`.
    pub fn strong_correlations(&self, threshold: f64) -> Vec<(&str, &str, f64)> {
        let Some(correlation) = &self.correlation else {
            return Vec::new();
        };
        let mut pairs = Vec::new();
        for i in 0..self.parameters.len() {
            for j in (i + 1)..self.parameters.len() {
                let r = correlation[[i, j]];
                if r.abs() >= threshold {
                    pairs.push((
                        self.parameters[i].name.as_str(),
                        self.parameters[j].name.as_str(),
                        r,
                    ));
                }
            }
        }
        pairs
    }

    /// Model impedance at `frequencies` (Hz) using the fitted values.
    pub fn predict(&self, frequencies: &[f64]) -> Result<Vec<Complex64>> {
        self.topology.evaluate(frequencies, &self.values())
    }
}

/// Knobs for one fit. Everything is optional; the defaults fit with derived
/// seeds, physical bounds and unit weighting.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Full seed vector replacing the derived initial guess
    pub initial_values: Option<Vec<f64>>,
    /// Per-parameter seed overrides, applied after `initial_values`
    pub initial_overrides: Vec<(String, f64)>,
    /// Per-parameter bounds overrides
    pub bounds_overrides: Vec<(String, Bounds)>,
    pub weighting: Weighting,
    pub solver: LmConfig,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_values(mut self, values: Vec<f64>) -> Self {
        self.initial_values = Some(values);
        self
    }

    pub fn with_initial(mut self, name: impl Into<String>, value: f64) -> Self {
        self.initial_overrides.push((name.into(), value));
        self
    }

    pub fn with_bounds(mut self, name: impl Into<String>, bounds: Bounds) -> Self {
        self.bounds_overrides.push((name.into(), bounds));
        self
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_solver(mut self, solver: LmConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.solver.max_iterations = max_iterations;
        self
    }

    /// Bounds for every parameter of `topology`, defaults replaced by overrides.
    pub fn resolve_bounds(&self, topology: &Topology) -> Result<Vec<Bounds>> {
        let specs = topology.parameters();
        let mut bounds = topology.default_bounds();

        for (name, b) in &self.bounds_overrides {
            let index = lookup(topology, name)?;
            let kind = specs[index].kind;
            let max_ok = if b.max == f64::INFINITY {
                kind != ParameterKind::CpeExponent
            } else {
                kind.contains(b.max)
            };
            if !kind.contains(b.min) || !max_ok {
                return Err(EisFitError::ParameterError(format!(
                    "bounds [{}, {}] for {} leave its physical domain",
                    b.min, b.max, name
                )));
            }
            bounds[index] = *b;
        }
        Ok(bounds)
    }

    /// Seeds for every parameter, moved strictly inside `bounds`.
    pub fn resolve_seeds(
        &self,
        topology: &Topology,
        spectrum: &Spectrum,
        bounds: &[Bounds],
    ) -> Result<Vec<f64>> {
        let mut seeds = match &self.initial_values {
            Some(values) => {
                if values.len() != topology.parameter_count() {
                    return Err(EisFitError::DimensionMismatch(format!(
                        "{} expects {} initial values, got {}",
                        topology,
                        topology.parameter_count(),
                        values.len()
                    )));
                }
                values.clone()
            }
            None => guess::initial_guess(topology, spectrum),
        };

        for (name, value) in &self.initial_overrides {
            seeds[lookup(topology, name)?] = *value;
        }

        let names = topology.parameter_names();
        for (i, seed) in seeds.iter_mut().enumerate() {
            if !seed.is_finite() {
                return Err(EisFitError::ParameterError(format!(
                    "initial value for {} must be finite, got {}",
                    names[i], seed
                )));
            }
            let inside = bounds[i].interior(*seed);
            if inside != *seed {
                debug!(
                    parameter = %names[i],
                    from = *seed,
                    to = inside,
                    "moved seed inside bounds"
                );
                *seed = inside;
            }
        }
        Ok(seeds)
    }
}

fn lookup(topology: &Topology, name: &str) -> Result<usize> {
    topology.index_of(name).ok_or_else(|| {
        EisFitError::ParameterError(format!(
            "unknown parameter '{}' for {}; expected one of {}",
            name,
            topology,
            topology.parameter_names().join(", ")
        ))
    })
}

/// Fit `topology` to `spectrum`.
pub fn fit_spectrum(
    spectrum: &Spectrum,
    topology: Topology,
    options: &FitOptions,
) -> Result<FitResult> {
    let bounds = options.resolve_bounds(&topology)?;
    let seeds = options.resolve_seeds(&topology, spectrum, &bounds)?;
    debug!(%topology, ?seeds, "initial guess");

    let problem = ImpedanceProblem::new(topology, spectrum, &options.weighting)?;
    let bounded = BoundedProblem::new(&problem, ParameterMapping::new(&bounds))?;
    let internal = bounded.to_internal(&Array1::from(seeds))?;

    let solver = LevenbergMarquardt::with_config(options.solver.clone());
    let outcome = solver.minimize(&bounded, internal)?;

    let values = bounded.to_external(&outcome.params);
    let residuals = problem.eval(&values)?;
    let jacobian = jacobian_within_bounds(&problem, &values, &residuals, &bounds)?;
    let estimate = uncertainty::estimate(&jacobian, outcome.cost)?;
    let steps = coordinate_steps(&jacobian, &residuals);

    let underdetermined = problem.residual_count() < problem.parameter_count();
    let (status, message) = if underdetermined {
        (
            FitStatus::Failed,
            format!(
                "underdetermined: {} residuals for {} parameters ({})",
                problem.residual_count(),
                problem.parameter_count(),
                outcome.message
            ),
        )
    } else if outcome.success {
        (FitStatus::Succeeded, outcome.message.clone())
    } else {
        (FitStatus::Failed, outcome.message.clone())
    };

    let parameters: Vec<ParameterEstimate> = topology
        .parameters()
        .into_iter()
        .enumerate()
        .map(|(i, spec)| ParameterEstimate {
            unit: spec.unit(),
            name: spec.name,
            value: values[i],
            std_error: estimate.standard_errors.as_ref().map(|e| e[i]),
            bounds: bounds[i],
            at_bound: bounds[i].saturated_side(values[i], steps[i]),
        })
        .collect();

    let result = FitResult {
        topology,
        residual_norm: outcome.cost.sqrt(),
        cost: outcome.cost,
        rmse: (outcome.cost / problem.residual_count() as f64).sqrt(),
        iterations: outcome.iterations,
        func_evals: outcome.func_evals,
        status,
        message,
        rank_deficient: estimate.rank_deficient,
        redchi: estimate.redchi,
        covariance: estimate.covariance,
        correlation: estimate.correlation,
        parameters,
    };

    log_outcome(&result);
    Ok(result)
}

/// Per-parameter Gauss-Newton step `−(Jᵀr)ᵢ / (JᵀJ)ᵢᵢ` at the solution.
///
/// Columns without curvature, or with non-finite entries, get a zero step.
fn coordinate_steps(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> Vec<f64> {
    jacobian
        .columns()
        .into_iter()
        .map(|column| {
            let curvature = column.dot(&column);
            let step = -column.dot(residuals) / curvature;
            if curvature > 0.0 && step.is_finite() {
                step
            } else {
                0.0
            }
        })
        .collect()
}

fn log_outcome(result: &FitResult) {
    let topology = &result.topology;
    match result.status {
        FitStatus::Succeeded => info!(
            %topology,
            iterations = result.iterations,
            residual_norm = result.residual_norm,
            "fit converged: {}",
            result.message
        ),
        FitStatus::Failed => warn!(
            %topology,
            iterations = result.iterations,
            residual_norm = result.residual_norm,
            "fit did not converge: {}",
            result.message
        ),
    }
    for p in result.bound_hits() {
        warn!(
            %topology,
            parameter = %p.name,
            value = p.value,
            side = ?p.at_bound,
            "parameter ended on a bound"
        );
    }
    if result.rank_deficient {
        warn!(%topology, "Jacobian is rank deficient; some parameters are not identifiable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum() -> Spectrum {
        Spectrum::from_triples(&[
            (1e4, 12.0, -3.0),
            (1e3, 20.0, -9.0),
            (1e2, 45.0, -14.0),
            (1e1, 70.0, -8.0),
            (1.0, 80.0, -6.0),
        ])
        .unwrap()
    }

    #[test]
    fn unknown_parameter_names_are_rejected() {
        let options = FitOptions::new().with_initial("Qdl", 1e-4);
        let bounds = Topology::Randles.default_bounds();
        assert!(matches!(
            options.resolve_seeds(&Topology::Randles, &spectrum(), &bounds),
            Err(EisFitError::ParameterError(_))
        ));
    }

    #[test]
    fn bounds_overrides_must_stay_physical() {
        let topology = Topology::ModifiedRandles;
        let bad = FitOptions::new().with_bounds("alpha_dl", Bounds::new(0.5, 1.5).unwrap());
        assert!(bad.resolve_bounds(&topology).is_err());

        let negative = FitOptions::new().with_bounds("Rs", Bounds::new(-1.0, 10.0).unwrap());
        assert!(negative.resolve_bounds(&topology).is_err());

        let good = FitOptions::new().with_bounds("alpha_dl", Bounds::new(0.3, 1.0).unwrap());
        let bounds = good.resolve_bounds(&topology).unwrap();
        assert_eq!(bounds[6].min, 0.3);
    }

    #[test]
    fn seeds_are_moved_inside_bounds() {
        let topology = Topology::ModifiedRandles;
        let options = FitOptions::new()
            .with_initial("alpha_sei", 1.0)
            .with_initial("Rs", 0.0);
        let bounds = options.resolve_bounds(&topology).unwrap();
        let seeds = options.resolve_seeds(&topology, &spectrum(), &bounds).unwrap();

        assert!(seeds[0] > bounds[0].min);
        assert!(seeds[3] < 1.0);
        for (seed, b) in seeds.iter().zip(&bounds) {
            assert!(b.is_within_bounds(*seed));
        }
    }

    #[test]
    fn initial_values_length_is_checked() {
        let options = FitOptions::new().with_initial_values(vec![1.0, 2.0]);
        assert!(matches!(
            fit_spectrum(&spectrum(), Topology::Randles, &options),
            Err(EisFitError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn fit_result_serializes_to_json() {
        let result = fit_spectrum(
            &spectrum(),
            Topology::TheveninMultiRc { stages: 1 },
            &FitOptions::new(),
        )
        .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["topology"]["kind"], "thevenin_multi_rc");
        assert_eq!(json["parameters"].as_array().unwrap().len(), 3);
        assert_eq!(json["parameters"][0]["bounds"]["max"], serde_json::Value::Null);
        assert!(result.parameter("r1").is_some());
    }
}

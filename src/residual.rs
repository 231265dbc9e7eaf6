//! Residual builder.
//!
//! Bridges the complex-valued impedance models to the real-valued solver. For
//! `n` samples the residual vector has length `2n`: the first `n` entries are
//! the real-part differences and the last `n` the imaginary-part differences,
//! both in sample order. Weights multiply the real and imaginary difference of
//! the same sample.

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::circuit::Topology;
use crate::error::{EisFitError, Result};
use crate::problem::Problem;
use crate::spectrum::Spectrum;

/// How residuals are weighted before squaring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Plain differences.
    #[default]
    Unit,
    /// Divide each sample's differences by `|Z_measured|`.
    Modulus,
    /// Divide each sample's differences by a per-point standard deviation.
    Sigma(Vec<f64>),
}

impl Weighting {
    /// Per-sample multipliers for `spectrum`.
    pub fn weights(&self, spectrum: &Spectrum) -> Result<Vec<f64>> {
        match self {
            Weighting::Unit => Ok(vec![1.0; spectrum.len()]),
            Weighting::Modulus => spectrum
                .samples()
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let modulus = s.impedance.norm();
                    if modulus > 0.0 {
                        Ok(1.0 / modulus)
                    } else {
                        Err(EisFitError::InvalidInput(format!(
                            "sample {} has zero impedance; modulus weighting is undefined",
                            i
                        )))
                    }
                })
                .collect(),
            Weighting::Sigma(sigmas) => {
                if sigmas.len() != spectrum.len() {
                    return Err(EisFitError::DimensionMismatch(format!(
                        "{} uncertainties for {} samples",
                        sigmas.len(),
                        spectrum.len()
                    )));
                }
                sigmas
                    .iter()
                    .enumerate()
                    .map(|(i, &sigma)| {
                        if sigma.is_finite() && sigma > 0.0 {
                            Ok(1.0 / sigma)
                        } else {
                            Err(EisFitError::InvalidInput(format!(
                                "uncertainty of sample {} must be positive and finite, got {}",
                                i, sigma
                            )))
                        }
                    })
                    .collect()
            }
        }
    }
}

/// Unweighted residuals `[Re(model − measured)…, Im(model − measured)…]`.
pub fn residual_vector(
    topology: &Topology,
    frequencies: &[f64],
    measured: &[Complex64],
    params: &[f64],
) -> Result<Array1<f64>> {
    if frequencies.len() != measured.len() {
        return Err(EisFitError::DimensionMismatch(format!(
            "{} frequencies for {} impedances",
            frequencies.len(),
            measured.len()
        )));
    }
    let predicted = topology.evaluate(frequencies, params)?;
    Ok(stack_differences(&predicted, measured, None))
}

fn stack_differences(
    predicted: &[Complex64],
    measured: &[Complex64],
    weights: Option<&[f64]>,
) -> Array1<f64> {
    let n = measured.len();
    let mut out = Array1::zeros(2 * n);
    for (i, (p, m)) in predicted.iter().zip(measured).enumerate() {
        let w = weights.map_or(1.0, |w| w[i]);
        out[i] = w * (p.re - m.re);
        out[n + i] = w * (p.im - m.im);
    }
    out
}

/// A spectrum and a topology, posed as a least-squares problem over the
/// topology's parameter vector.
#[derive(Debug, Clone)]
pub struct ImpedanceProblem {
    topology: Topology,
    frequencies: Vec<f64>,
    measured: Vec<Complex64>,
    weights: Vec<f64>,
}

impl ImpedanceProblem {
    pub fn new(topology: Topology, spectrum: &Spectrum, weighting: &Weighting) -> Result<Self> {
        Ok(Self {
            topology,
            frequencies: spectrum.frequencies(),
            measured: spectrum.impedances(),
            weights: weighting.weights(spectrum)?,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn sample_count(&self) -> usize {
        self.frequencies.len()
    }
}

impl Problem for ImpedanceProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let params = params.to_vec();
        let predicted = self.topology.evaluate(&self.frequencies, &params)?;
        Ok(stack_differences(
            &predicted,
            &self.measured,
            Some(&self.weights),
        ))
    }

    fn parameter_count(&self) -> usize {
        self.topology.parameter_count()
    }

    fn residual_count(&self) -> usize {
        2 * self.frequencies.len()
    }
}

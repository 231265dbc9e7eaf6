//! Equivalent-circuit topologies and their parameter schemas.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use super::elements::{capacitor_admittance, r_cpe_parallel, rc_parallel, reciprocal, warburg};
use crate::error::{EisFitError, Result};
use crate::parameters::Bounds;
use crate::spectrum::validate_frequency;

/// Smallest value any strictly positive circuit parameter may take during a fit.
pub const PARAMETER_EPSILON: f64 = 1e-12;

/// Number of RC stages used when a Thevenin model is requested without a count.
pub const DEFAULT_THEVENIN_STAGES: usize = 2;

/// Physical kind of a circuit parameter. Determines its unit and domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Resistance,
    Capacitance,
    CpeCoefficient,
    CpeExponent,
    WarburgCoefficient,
}

impl ParameterKind {
    pub fn unit(&self) -> &'static str {
        match self {
            ParameterKind::Resistance => "Ohm",
            ParameterKind::Capacitance => "F",
            ParameterKind::CpeCoefficient => "S*s^a",
            ParameterKind::CpeExponent => "-",
            ParameterKind::WarburgCoefficient => "Ohm*s^-1/2",
        }
    }

    /// Whether `value` lies in the physical domain: `(0, 1]` for CPE
    /// exponents, `(0, ∞)` for everything else.
    pub fn contains(&self, value: f64) -> bool {
        match self {
            ParameterKind::CpeExponent => value > 0.0 && value <= 1.0,
            _ => value > 0.0 && value.is_finite(),
        }
    }

    /// Fit bounds used unless overridden.
    pub fn default_bounds(&self) -> Bounds {
        match self {
            ParameterKind::CpeExponent => Bounds {
                min: PARAMETER_EPSILON,
                max: 1.0,
            },
            _ => Bounds::min_only(PARAMETER_EPSILON),
        }
    }
}

/// Name and kind of one entry of a topology's parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
}

impl ParameterSpec {
    fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }
}

/// The supported equivalent circuits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// `Rs + 1/(jωCdl + 1/(Rct + Zw))`
    Randles,
    /// `Rs + (Rsei ‖ CPEsei) + (Rct ‖ CPEdl) + Zw`
    ModifiedRandles,
    /// `Rs + Σ Ri/(1 + jωRiCi)`
    TheveninMultiRc { stages: usize },
}

impl Topology {
    /// Thevenin model with `stages` RC stages. At least one stage is required.
    pub fn thevenin(stages: usize) -> Result<Self> {
        if stages == 0 {
            return Err(EisFitError::InvalidInput(
                "a Thevenin model needs at least one RC stage".to_string(),
            ));
        }
        Ok(Topology::TheveninMultiRc { stages })
    }

    /// Short identifier, safe for file names.
    pub fn slug(&self) -> String {
        match self {
            Topology::Randles => "randles".to_string(),
            Topology::ModifiedRandles => "modified_randles".to_string(),
            Topology::TheveninMultiRc { stages } => format!("thevenin_{}rc", stages),
        }
    }

    /// Ordered parameter schema.
    pub fn parameters(&self) -> Vec<ParameterSpec> {
        use ParameterKind::*;

        match self {
            Topology::Randles => vec![
                ParameterSpec::new("Rs", Resistance),
                ParameterSpec::new("Rct", Resistance),
                ParameterSpec::new("Cdl", Capacitance),
                ParameterSpec::new("sigma", WarburgCoefficient),
            ],
            Topology::ModifiedRandles => vec![
                ParameterSpec::new("Rs", Resistance),
                ParameterSpec::new("Rsei", Resistance),
                ParameterSpec::new("Qsei", CpeCoefficient),
                ParameterSpec::new("alpha_sei", CpeExponent),
                ParameterSpec::new("Rct", Resistance),
                ParameterSpec::new("Qdl", CpeCoefficient),
                ParameterSpec::new("alpha_dl", CpeExponent),
                ParameterSpec::new("sigma", WarburgCoefficient),
            ],
            Topology::TheveninMultiRc { stages } => {
                let mut specs = Vec::with_capacity(1 + 2 * stages);
                specs.push(ParameterSpec::new("Rs", Resistance));
                for i in 1..=*stages {
                    specs.push(ParameterSpec::new(format!("R{}", i), Resistance));
                    specs.push(ParameterSpec::new(format!("C{}", i), Capacitance));
                }
                specs
            }
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Topology::Randles => 4,
            Topology::ModifiedRandles => 8,
            Topology::TheveninMultiRc { stages } => 1 + 2 * stages,
        }
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters().into_iter().map(|p| p.name).collect()
    }

    /// Position of a parameter by name (ASCII case-insensitive).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters()
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn default_bounds(&self) -> Vec<Bounds> {
        self.parameters()
            .iter()
            .map(|p| p.kind.default_bounds())
            .collect()
    }

    /// Reject parameter vectors of the wrong length or outside the physical domain.
    pub fn check_parameters(&self, params: &[f64]) -> Result<()> {
        if params.len() != self.parameter_count() {
            return Err(EisFitError::DimensionMismatch(format!(
                "{} expects {} parameters, got {}",
                self,
                self.parameter_count(),
                params.len()
            )));
        }
        for (spec, &value) in self.parameters().iter().zip(params) {
            if !spec.kind.contains(value) {
                return Err(EisFitError::ModelEvaluation(format!(
                    "{} = {} is outside its physical domain",
                    spec.name, value
                )));
            }
        }
        Ok(())
    }

    /// Impedance at angular frequency `omega` for an already checked parameter vector.
    fn impedance_unchecked(&self, omega: f64, p: &[f64]) -> Result<Complex64> {
        let z = match self {
            Topology::Randles => {
                let faradaic = Complex64::new(p[1], 0.0) + warburg(p[3], omega);
                let admittance = capacitor_admittance(p[2], omega)
                    + reciprocal(faradaic, "Randles faradaic branch")?;
                p[0] + reciprocal(admittance, "Randles parallel branch")?
            }
            Topology::ModifiedRandles => {
                p[0] + r_cpe_parallel(p[1], p[2], p[3], omega)?
                    + r_cpe_parallel(p[4], p[5], p[6], omega)?
                    + warburg(p[7], omega)
            }
            Topology::TheveninMultiRc { stages } => {
                let mut z = Complex64::new(p[0], 0.0);
                for i in 0..*stages {
                    z += rc_parallel(p[1 + 2 * i], p[2 + 2 * i], omega)?;
                }
                z
            }
        };

        if !z.re.is_finite() || !z.im.is_finite() {
            return Err(EisFitError::ModelEvaluation(format!(
                "{} produced a non-finite impedance at omega = {}",
                self, omega
            )));
        }
        Ok(z)
    }

    /// Impedance at a single angular frequency.
    pub fn impedance(&self, omega: f64, params: &[f64]) -> Result<Complex64> {
        if !omega.is_finite() || omega <= 0.0 {
            return Err(EisFitError::InvalidInput(format!(
                "angular frequency must be positive and finite, got {}",
                omega
            )));
        }
        self.check_parameters(params)?;
        self.impedance_unchecked(omega, params)
    }

    /// Impedance at each frequency (Hz).
    pub fn evaluate(&self, frequencies: &[f64], params: &[f64]) -> Result<Vec<Complex64>> {
        self.check_parameters(params)?;
        frequencies
            .iter()
            .map(|&f| {
                validate_frequency(f)?;
                self.impedance_unchecked(2.0 * PI * f, params)
            })
            .collect()
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Randles => write!(f, "Randles"),
            Topology::ModifiedRandles => write!(f, "Modified Randles"),
            Topology::TheveninMultiRc { stages } => write!(f, "Thevenin {}-RC", stages),
        }
    }
}

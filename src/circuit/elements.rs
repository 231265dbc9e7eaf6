//! Circuit element primitives.
//!
//! Every function takes an angular frequency `omega` (rad/s, strictly positive)
//! and returns a complex impedance or admittance. Compositions go through
//! [`reciprocal`], which scales before dividing so that very large or very small
//! branch impedances near ω→0 and ω→∞ do not overflow into NaN.

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;

use crate::error::{EisFitError, Result};

/// Semi-infinite Warburg diffusion impedance `σ(1 − j)/√ω`.
pub fn warburg(sigma: f64, omega: f64) -> Complex64 {
    let magnitude = sigma / omega.sqrt();
    Complex64::new(magnitude, -magnitude)
}

/// Constant-phase element admittance `Q(jω)^α = Qω^α·e^{jαπ/2}`.
pub fn cpe_admittance(q: f64, alpha: f64, omega: f64) -> Complex64 {
    Complex64::from_polar(q * omega.powf(alpha), alpha * FRAC_PI_2)
}

/// Constant-phase element impedance `1/(Q(jω)^α)`.
pub fn cpe_impedance(q: f64, alpha: f64, omega: f64) -> Result<Complex64> {
    reciprocal(cpe_admittance(q, alpha, omega), "constant-phase element")
}

/// Ideal capacitor admittance `jωC`.
pub fn capacitor_admittance(c: f64, omega: f64) -> Complex64 {
    Complex64::new(0.0, omega * c)
}

/// Resistor in parallel with a capacitor: `R/(1 + jωRC)`.
pub fn rc_parallel(r: f64, c: f64, omega: f64) -> Result<Complex64> {
    let denominator = Complex64::new(1.0, omega * r * c);
    Ok(reciprocal(denominator, "RC stage")? * r)
}

/// Resistor in parallel with a constant-phase element: `1/(1/R + Q(jω)^α)`.
pub fn r_cpe_parallel(r: f64, q: f64, alpha: f64, omega: f64) -> Result<Complex64> {
    let admittance = Complex64::new(1.0 / r, 0.0) + cpe_admittance(q, alpha, omega);
    reciprocal(admittance, "R-CPE stage")
}

/// Complex reciprocal that rejects singular and non-finite inputs.
pub fn reciprocal(z: Complex64, what: &str) -> Result<Complex64> {
    if !z.re.is_finite() || !z.im.is_finite() {
        return Err(EisFitError::ModelEvaluation(format!(
            "non-finite denominator in {}: {}",
            what, z
        )));
    }
    let scale = z.re.abs().max(z.im.abs());
    if scale == 0.0 {
        return Err(EisFitError::ModelEvaluation(format!(
            "singular denominator in {}",
            what
        )));
    }
    let scaled = z / scale;
    Ok(scaled.conj() / scaled.norm_sqr() / scale)
}

//! Measured impedance spectra.
//!
//! A [`Spectrum`] is an ordered list of `(frequency, impedance)` samples. It is
//! validated once on construction and immutable afterwards, so every consumer
//! downstream (residuals, fitting, reporting) can rely on strictly positive,
//! finite frequencies and finite impedances.

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{EisFitError, Result};

/// A single measurement: frequency in Hz and complex impedance in Ω.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub frequency: f64,
    pub impedance: Complex64,
}

impl Sample {
    pub fn new(frequency: f64, z_real: f64, z_imag: f64) -> Self {
        Self {
            frequency,
            impedance: Complex64::new(z_real, z_imag),
        }
    }

    /// Angular frequency ω = 2πf.
    pub fn omega(&self) -> f64 {
        2.0 * PI * self.frequency
    }
}

/// A validated impedance spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    samples: Vec<Sample>,
}

impl Spectrum {
    /// Build a spectrum, rejecting empty input, non-positive or non-finite
    /// frequencies and non-finite impedances.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(EisFitError::InvalidInput(
                "spectrum contains no samples".to_string(),
            ));
        }

        for (i, s) in samples.iter().enumerate() {
            validate_frequency(s.frequency)
                .map_err(|e| EisFitError::InvalidInput(format!("sample {}: {}", i, e)))?;
            if !s.impedance.re.is_finite() || !s.impedance.im.is_finite() {
                return Err(EisFitError::InvalidInput(format!(
                    "sample {}: impedance must be finite, got {}",
                    i, s.impedance
                )));
            }
        }

        Ok(Self { samples })
    }

    /// Build a spectrum from `(frequency, Zreal, Zimag)` triples.
    pub fn from_triples(triples: &[(f64, f64, f64)]) -> Result<Self> {
        Self::new(
            triples
                .iter()
                .map(|&(f, re, im)| Sample::new(f, re, im))
                .collect(),
        )
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed spectrum; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.frequency).collect()
    }

    pub fn impedances(&self) -> Vec<Complex64> {
        self.samples.iter().map(|s| s.impedance).collect()
    }

    /// Frequency range as `(min, max)`.
    pub fn frequency_range(&self) -> (f64, f64) {
        self.samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.frequency), hi.max(s.frequency))
            })
    }

    /// The sample measured at the highest frequency.
    pub fn highest_frequency_sample(&self) -> &Sample {
        // Non-empty by construction.
        let mut best = &self.samples[0];
        for s in &self.samples[1..] {
            if s.frequency > best.frequency {
                best = s;
            }
        }
        best
    }

    /// Samples sorted by descending frequency.
    pub fn sorted_descending(&self) -> Vec<Sample> {
        let mut out = self.samples.clone();
        out.sort_by(|a, b| {
            b.frequency
                .partial_cmp(&a.frequency)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }
}

/// Reject frequencies outside the supported domain `(0, ∞)`.
pub fn validate_frequency(frequency: f64) -> Result<()> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(EisFitError::InvalidInput(format!(
            "frequency must be positive and finite, got {}",
            frequency
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_spectrum() {
        assert!(matches!(
            Spectrum::new(Vec::new()),
            Err(EisFitError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_bad_frequencies_and_impedances() {
        assert!(Spectrum::from_triples(&[(0.0, 1.0, -1.0)]).is_err());
        assert!(Spectrum::from_triples(&[(-10.0, 1.0, -1.0)]).is_err());
        assert!(Spectrum::from_triples(&[(f64::NAN, 1.0, -1.0)]).is_err());
        assert!(Spectrum::from_triples(&[(10.0, f64::INFINITY, -1.0)]).is_err());
        assert!(Spectrum::from_triples(&[(10.0, 1.0, f64::NAN)]).is_err());
    }

    #[test]
    fn highest_frequency_sample_ignores_order() {
        let spectrum =
            Spectrum::from_triples(&[(10.0, 5.0, -1.0), (1000.0, 2.0, -0.5), (1.0, 9.0, -3.0)])
                .unwrap();
        assert_eq!(spectrum.highest_frequency_sample().frequency, 1000.0);
        assert_eq!(spectrum.frequency_range(), (1.0, 1000.0));

        let sorted = spectrum.sorted_descending();
        assert_eq!(sorted[0].frequency, 1000.0);
        assert_eq!(sorted[2].frequency, 1.0);
    }
}

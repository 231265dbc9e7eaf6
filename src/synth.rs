//! Synthetic spectra for demos, tests and benchmarks.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::circuit::Topology;
use crate::error::{EisFitError, Result};
use crate::spectrum::{validate_frequency, Sample, Spectrum};

/// Relative Gaussian noise applied independently to the real and imaginary parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Noise {
    /// Standard deviation as a fraction of `|Z|` at each frequency
    pub relative_sigma: f64,
    pub seed: u64,
}

/// `n` log-spaced frequencies from `f_max` down to `f_min` (Hz), inclusive.
pub fn log_frequencies(f_max: f64, f_min: f64, n: usize) -> Result<Vec<f64>> {
    validate_frequency(f_max)?;
    validate_frequency(f_min)?;
    if n == 0 {
        return Err(EisFitError::InvalidInput(
            "at least one frequency is required".to_string(),
        ));
    }
    if n == 1 {
        return Ok(vec![f_max]);
    }

    let (log_hi, log_lo) = (f_max.log10(), f_min.log10());
    Ok((0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            10f64.powf(log_hi + t * (log_lo - log_hi))
        })
        .collect())
}

/// Evaluate `topology` at `frequencies`, optionally adding seeded noise.
pub fn synthesize(
    topology: &Topology,
    params: &[f64],
    frequencies: &[f64],
    noise: Option<Noise>,
) -> Result<Spectrum> {
    let impedances = topology.evaluate(frequencies, params)?;

    let samples = match noise {
        None => frequencies
            .iter()
            .zip(&impedances)
            .map(|(&f, z)| Sample::new(f, z.re, z.im))
            .collect(),
        Some(noise) => {
            let normal = Normal::new(0.0, noise.relative_sigma).map_err(|e| {
                EisFitError::InvalidInput(format!("invalid noise level: {}", e))
            })?;
            let mut rng = StdRng::seed_from_u64(noise.seed);
            frequencies
                .iter()
                .zip(&impedances)
                .map(|(&f, z)| {
                    let scale = z.norm();
                    let re = z.re + scale * normal.sample(&mut rng);
                    let im = z.im + scale * normal.sample(&mut rng);
                    Sample::new(f, re, im)
                })
                .collect()
        }
    };

    Spectrum::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn log_frequencies_are_descending_and_inclusive() {
        let freqs = log_frequencies(1e5, 0.1, 7).unwrap();
        assert_eq!(freqs.len(), 7);
        assert_relative_eq!(freqs[0], 1e5, max_relative = 1e-12);
        assert_relative_eq!(freqs[1], 1e4, max_relative = 1e-12);
        assert_relative_eq!(freqs[6], 0.1, max_relative = 1e-12);

        assert!(log_frequencies(0.0, 1.0, 5).is_err());
        assert!(log_frequencies(10.0, 1.0, 0).is_err());
    }

    #[test]
    fn noise_is_reproducible() {
        let topology = Topology::TheveninMultiRc { stages: 1 };
        let params = [1.0, 10.0, 1e-3];
        let freqs = log_frequencies(1e4, 1.0, 10).unwrap();
        let noise = Some(Noise {
            relative_sigma: 0.01,
            seed: 7,
        });

        let a = synthesize(&topology, &params, &freqs, noise).unwrap();
        let b = synthesize(&topology, &params, &freqs, noise).unwrap();
        let clean = synthesize(&topology, &params, &freqs, None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, clean);
    }
}

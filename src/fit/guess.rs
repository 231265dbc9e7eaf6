//! Initial-guess policy.
//!
//! Seeds are derived from the spectrum's shape: the series resistance from the
//! high-frequency real intercept and the charge-transfer (or stage)
//! resistances from the width of the visible semicircle. Capacitive terms
//! start from typical literature values, except for the CPE model, whose
//! coefficients are placed so each arc relaxes at an observed −Im peak.

use crate::circuit::{Topology, PARAMETER_EPSILON};
use crate::spectrum::Spectrum;

/// Semicircle width used when the spectrum has no measurable spread.
pub const FALLBACK_DIAMETER: f64 = 500.0;

/// Warburg coefficient seed for the CPE model and for degenerate spectra.
pub const DEFAULT_SIGMA: f64 = 50.0;

/// Nominal CPE exponents used for the SEI and double-layer seeds.
const ALPHA_SEI: f64 = 0.8;
const ALPHA_DL: f64 = 0.9;

/// Real part of the highest-frequency sample, kept strictly positive.
pub fn series_resistance(spectrum: &Spectrum) -> f64 {
    spectrum
        .highest_frequency_sample()
        .impedance
        .re
        .max(PARAMETER_EPSILON)
}

/// Spread of the real impedance over the mid-frequency range.
///
/// With ten or more samples the top and bottom decile (by frequency) are
/// dropped first. Returns `None` when the spread is not positive.
pub fn semicircle_diameter(spectrum: &Spectrum) -> Option<f64> {
    let sorted = spectrum.sorted_descending();
    let n = sorted.len();
    let trim = if n >= 10 { n / 10 } else { 0 };
    let mid = &sorted[trim..n - trim];

    let (lo, hi) = mid
        .iter()
        .map(|s| s.impedance.re)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), re| {
            (lo.min(re), hi.max(re))
        });

    let diameter = hi - lo;
    if diameter.is_finite() && diameter > PARAMETER_EPSILON {
        Some(diameter)
    } else {
        None
    }
}

/// A local maximum of −Im Z: its angular frequency and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPeak {
    pub omega: f64,
    pub height: f64,
}

/// Interior local maxima of −Im Z, tallest first.
///
/// Endpoints are excluded so a diffusion tail at the lowest frequency is not
/// mistaken for an arc.
pub fn arc_peaks(spectrum: &Spectrum) -> Vec<ArcPeak> {
    let sorted = spectrum.sorted_descending();
    let height = |i: usize| -sorted[i].impedance.im;

    let mut peaks: Vec<ArcPeak> = (1..sorted.len().saturating_sub(1))
        .filter(|&i| {
            height(i) > 0.0 && height(i) > height(i - 1) && height(i) >= height(i + 1)
        })
        .map(|i| ArcPeak {
            omega: sorted[i].omega(),
            height: height(i),
        })
        .collect();
    peaks.sort_by(|a, b| {
        b.height
            .partial_cmp(&a.height)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    peaks
}

/// Split the spectrum into a high-frequency (SEI) and a low-frequency
/// (charge-transfer) arc.
///
/// Returns `(omega_sei, omega_ct, sei_share)`, where `sei_share` is the
/// fraction of the semicircle diameter assigned to the SEI arc. Two arcs are
/// recognised when a second peak lies at least a decade away from the tallest;
/// otherwise the tallest point is taken as the charge-transfer arc and the SEI
/// arc is placed two decades above it.
fn split_arcs(spectrum: &Spectrum) -> (f64, f64, f64) {
    let peaks = arc_peaks(spectrum);
    if let Some(first) = peaks.first() {
        let second = peaks[1..]
            .iter()
            .find(|p| (p.omega / first.omega).log10().abs() >= 1.0);
        if let Some(second) = second {
            let (hi, lo) = if first.omega > second.omega {
                (first, second)
            } else {
                (second, first)
            };
            return (hi.omega, lo.omega, hi.height / (hi.height + lo.height));
        }
    }

    // First (highest-frequency) sample wins ties.
    let sorted = spectrum.sorted_descending();
    let mut tallest = &sorted[0];
    for s in &sorted[1..] {
        if -s.impedance.im > -tallest.impedance.im {
            tallest = s;
        }
    }
    let omega = tallest.omega();
    (100.0 * omega, omega, 0.2)
}

/// CPE coefficient that puts the `R ‖ CPE` relaxation at `omega`.
fn cpe_coefficient(resistance: f64, omega: f64, alpha: f64) -> f64 {
    1.0 / (resistance * omega.powf(alpha))
}

/// Initial parameter vector for `topology`, in the topology's parameter order.
pub fn initial_guess(topology: &Topology, spectrum: &Spectrum) -> Vec<f64> {
    let rs = series_resistance(spectrum);
    let measured = semicircle_diameter(spectrum);
    let diameter = measured.unwrap_or(FALLBACK_DIAMETER);

    match topology {
        Topology::Randles => {
            let sigma = measured.map_or(DEFAULT_SIGMA, |d| d / 10.0);
            vec![rs, diameter, 1e-5, sigma]
        }
        Topology::ModifiedRandles => {
            let (omega_sei, omega_ct, share) = split_arcs(spectrum);
            let r_sei = share * diameter;
            let r_ct = (1.0 - share) * diameter;
            vec![
                rs,
                r_sei,
                cpe_coefficient(r_sei, omega_sei, ALPHA_SEI),
                ALPHA_SEI,
                r_ct,
                cpe_coefficient(r_ct, omega_ct, ALPHA_DL),
                ALPHA_DL,
                measured.map_or(DEFAULT_SIGMA, |d| d / 10.0),
            ]
        }
        Topology::TheveninMultiRc { stages } => {
            let stages = *stages;
            let mut seeds = Vec::with_capacity(1 + 2 * stages);
            seeds.push(rs);
            for i in 0..stages {
                let fraction = if stages > 1 {
                    i as f64 / (stages - 1) as f64
                } else {
                    0.0
                };
                seeds.push(diameter / stages as f64);
                seeds.push(10f64.powf(-4.0 + 3.0 * fraction));
            }
            seeds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arc() -> Spectrum {
        // 20 samples, real part rising from 10 to 105 as frequency falls
        let triples: Vec<(f64, f64, f64)> = (0..20)
            .map(|i| {
                let f = 1e5 / 2f64.powi(i);
                (f, 10.0 + 5.0 * i as f64, -1.0)
            })
            .collect();
        Spectrum::from_triples(&triples).unwrap()
    }

    #[test]
    fn diameter_skips_outer_deciles() {
        // Drops two samples at each end: re from 20 to 95
        assert_relative_eq!(semicircle_diameter(&arc()).unwrap(), 75.0);
        assert_relative_eq!(series_resistance(&arc()), 10.0);
    }

    #[test]
    fn degenerate_spectrum_uses_fallbacks() {
        let single = Spectrum::from_triples(&[(1000.0, -5.0, -1.0)]).unwrap();
        assert!(semicircle_diameter(&single).is_none());
        assert_eq!(
            initial_guess(&Topology::Randles, &single),
            vec![PARAMETER_EPSILON, FALLBACK_DIAMETER, 1e-5, DEFAULT_SIGMA]
        );
    }

    #[test]
    fn thevenin_seeds_spread_capacitances() {
        let seeds = initial_guess(&Topology::TheveninMultiRc { stages: 3 }, &arc());
        assert_eq!(seeds.len(), 7);
        assert_relative_eq!(seeds[1], 25.0);
        assert_relative_eq!(seeds[2], 1e-4, max_relative = 1e-12);
        assert_relative_eq!(seeds[4], 10f64.powf(-2.5), max_relative = 1e-12);
        assert_relative_eq!(seeds[6], 1e-1, max_relative = 1e-12);
    }

    #[test]
    fn guesses_match_parameter_counts() {
        for topology in [
            Topology::Randles,
            Topology::ModifiedRandles,
            Topology::TheveninMultiRc { stages: 2 },
        ] {
            assert_eq!(
                initial_guess(&topology, &arc()).len(),
                topology.parameter_count()
            );
        }
    }

    fn relaxation_omega(resistance: f64, q: f64, alpha: f64) -> f64 {
        (resistance * q).powf(-1.0 / alpha)
    }

    #[test]
    fn cpe_seeds_follow_both_arcs() {
        let truth = [10.0, 25.0, 5e-5, 0.85, 80.0, 2e-3, 0.9, 15.0];
        let freqs = crate::synth::log_frequencies(1e5, 0.1, 50).unwrap();
        let spectrum =
            crate::synth::synthesize(&Topology::ModifiedRandles, &truth, &freqs, None).unwrap();

        let peaks = arc_peaks(&spectrum);
        assert_eq!(peaks.len(), 2);
        // Charge-transfer arc is the taller one, near 1 Hz; SEI near 350 Hz
        let f_ct = peaks[0].omega / (2.0 * std::f64::consts::PI);
        let f_sei = peaks[1].omega / (2.0 * std::f64::consts::PI);
        assert!(f_ct > 0.5 && f_ct < 2.0, "{}", f_ct);
        assert!(f_sei > 200.0 && f_sei < 600.0, "{}", f_sei);

        let seeds = initial_guess(&Topology::ModifiedRandles, &spectrum);
        assert!(seeds[1] < seeds[4]);
        assert_relative_eq!(
            seeds[1] + seeds[4],
            semicircle_diameter(&spectrum).unwrap(),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            relaxation_omega(seeds[1], seeds[2], seeds[3]),
            peaks[1].omega,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            relaxation_omega(seeds[4], seeds[5], seeds[6]),
            peaks[0].omega,
            max_relative = 1e-9
        );
    }

    #[test]
    fn single_arc_places_sei_two_decades_higher() {
        let freqs = crate::synth::log_frequencies(1e5, 0.1, 50).unwrap();
        let topology = Topology::TheveninMultiRc { stages: 1 };
        let spectrum =
            crate::synth::synthesize(&topology, &[5.0, 100.0, 1e-4], &freqs, None).unwrap();
        assert_eq!(arc_peaks(&spectrum).len(), 1);

        let peak = arc_peaks(&spectrum)[0].omega;
        let diameter = semicircle_diameter(&spectrum).unwrap();
        let seeds = initial_guess(&Topology::ModifiedRandles, &spectrum);
        assert_relative_eq!(seeds[1], 0.2 * diameter, max_relative = 1e-12);
        assert_relative_eq!(
            relaxation_omega(seeds[1], seeds[2], seeds[3]),
            100.0 * peak,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            relaxation_omega(seeds[4], seeds[5], seeds[6]),
            peak,
            max_relative = 1e-9
        );
    }

    #[test]
    fn endpoints_are_not_peaks() {
        let tail =
            Spectrum::from_triples(&[(100.0, 1.0, -1.0), (10.0, 2.0, -2.0), (1.0, 3.0, -3.0)])
                .unwrap();
        assert!(arc_peaks(&tail).is_empty());
    }
}

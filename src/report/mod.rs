//! Result reporter: parameter tables and Nyquist comparison series.
//!
//! The reporter only prepares data and text; SVG rendering lives in [`plot`]
//! and is the only part that touches the filesystem.

pub mod format;
pub mod plot;

pub use format::format_parameter_table;

use num_complex::Complex64;
use serde::Serialize;

use crate::error::Result;
use crate::fit::FitResult;
use crate::spectrum::Spectrum;
use crate::synth::log_frequencies;

/// A point in the Nyquist plane: `(Re Z, −Im Z)`.
pub fn nyquist_point(z: Complex64) -> (f64, f64) {
    (z.re, -z.im)
}

/// Measured and fitted series ready for a Nyquist plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NyquistSeries {
    /// Frequencies of the measured samples (Hz), in spectrum order
    pub frequencies: Vec<f64>,
    pub measured: Vec<(f64, f64)>,
    /// Model at the measured frequencies
    pub fitted: Vec<(f64, f64)>,
    /// Dense log grid over the measured range (Hz), descending
    pub smooth_frequencies: Vec<f64>,
    /// Model on `smooth_frequencies`; empty when not requested
    pub smooth: Vec<(f64, f64)>,
}

impl NyquistSeries {
    /// Build the series for `result` over `spectrum`, with `dense_points`
    /// extra model points for a smooth curve (0 to skip).
    pub fn build(result: &FitResult, spectrum: &Spectrum, dense_points: usize) -> Result<Self> {
        let frequencies = spectrum.frequencies();
        let measured = spectrum
            .impedances()
            .into_iter()
            .map(nyquist_point)
            .collect();
        let fitted = result
            .predict(&frequencies)?
            .into_iter()
            .map(nyquist_point)
            .collect();

        let smooth_frequencies = if dense_points > 0 {
            let (f_min, f_max) = spectrum.frequency_range();
            log_frequencies(f_max, f_min, dense_points)?
        } else {
            Vec::new()
        };
        let smooth = result
            .predict(&smooth_frequencies)?
            .into_iter()
            .map(nyquist_point)
            .collect();

        Ok(Self {
            frequencies,
            measured,
            fitted,
            smooth_frequencies,
            smooth,
        })
    }

    /// Axis ranges with a shared span so that one unit has the same length
    /// on both axes. Adds 5% padding; never returns an empty range.
    pub fn axis_ranges(&self) -> ((f64, f64), (f64, f64)) {
        let points = self
            .measured
            .iter()
            .chain(&self.fitted)
            .chain(&self.smooth)
            .filter(|(x, y)| x.is_finite() && y.is_finite());

        let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) = (
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        );
        for &(x, y) in points {
            x_lo = x_lo.min(x);
            x_hi = x_hi.max(x);
            y_lo = y_lo.min(y);
            y_hi = y_hi.max(y);
        }
        if !x_lo.is_finite() {
            return ((0.0, 1.0), (0.0, 1.0));
        }
        // Nyquist plots conventionally include the real axis
        y_lo = y_lo.min(0.0);

        let span = (x_hi - x_lo).max(y_hi - y_lo);
        let span = if span > 0.0 { span * 1.05 } else { 1.0 };
        let x_mid = 0.5 * (x_lo + x_hi);
        let y_mid = 0.5 * (y_lo + y_hi);
        (
            (x_mid - span / 2.0, x_mid + span / 2.0),
            (y_mid - span / 2.0, y_mid + span / 2.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nyquist_point_flips_imaginary_sign() {
        assert_eq!(nyquist_point(Complex64::new(3.0, -4.0)), (3.0, 4.0));
    }

    #[test]
    fn axis_ranges_share_a_span() {
        let series = NyquistSeries {
            frequencies: vec![1.0, 2.0],
            measured: vec![(10.0, 1.0), (110.0, 20.0)],
            fitted: vec![(12.0, 2.0), (100.0, 18.0)],
            smooth_frequencies: Vec::new(),
            smooth: Vec::new(),
        };
        let ((x0, x1), (y0, y1)) = series.axis_ranges();
        assert_relative_eq!(x1 - x0, y1 - y0, max_relative = 1e-12);
        assert!(x0 <= 10.0 && x1 >= 110.0);
        assert!(y0 <= 0.0 && y1 >= 20.0);
    }
}

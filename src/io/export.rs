//! Exports: Nyquist series and spectra as CSV, fit results as JSON.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::Result;
use crate::fit::FitResult;
use crate::report::NyquistSeries;
use crate::spectrum::Spectrum;

/// Write the Nyquist series as long-format CSV:
/// `series,frequency_hz,z_real,minus_z_imag`.
pub fn write_series_csv(path: &Path, series: &NyquistSeries) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["series", "frequency_hz", "z_real", "minus_z_imag"])?;

    let rows = [
        ("measured", &series.frequencies, &series.measured),
        ("fitted", &series.frequencies, &series.fitted),
        ("smooth", &series.smooth_frequencies, &series.smooth),
    ];
    for (name, frequencies, points) in rows {
        for (f, (x, y)) in frequencies.iter().zip(points.iter()) {
            writer.write_record([
                name.to_string(),
                format!("{:.10e}", f),
                format!("{:.10e}", x),
                format!("{:.10e}", y),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write a spectrum in the loader's format: header, units row, samples.
pub fn write_spectrum_csv(path: &Path, spectrum: &Spectrum) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Freq", "Zreal", "Zimag"])?;
    writer.write_record(["Hz", "Ohm", "Ohm"])?;
    for s in spectrum.samples() {
        writer.write_record([
            format!("{:.10e}", s.frequency),
            format!("{:.10e}", s.impedance.re),
            format!("{:.10e}", s.impedance.im),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a fit result as pretty-printed JSON.
pub fn write_fit_json(path: &Path, result: &FitResult) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, result)?;
    Ok(())
}

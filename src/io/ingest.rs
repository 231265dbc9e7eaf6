//! Spectrum CSV ingest.
//!
//! Expected layout: a header row naming `Freq`, `Zreal` and `Zimag` (any
//! order, any case, extra columns ignored), then optionally a units row, then
//! one sample per row.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::error::{EisFitError, Result};
use crate::spectrum::{Sample, Spectrum};

const FREQ: &str = "freq";
const ZREAL: &str = "zreal";
const ZIMAG: &str = "zimag";

/// Load a spectrum from a CSV file.
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let file = File::open(path).map_err(|e| {
        EisFitError::InvalidInput(format!("failed to open '{}': {}", path.display(), e))
    })?;
    read_spectrum(file)
}

/// Parse a spectrum from any CSV reader.
pub fn read_spectrum<R: Read>(input: R) -> Result<Spectrum> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| EisFitError::Parse {
            line: 1,
            message: format!("failed to read header: {}", e),
        })?
        .clone();
    let header_map = build_header_map(&headers);
    let columns = [FREQ, ZREAL, ZIMAG]
        .iter()
        .map(|name| {
            header_map.get(*name).copied().ok_or_else(|| EisFitError::Parse {
                line: 1,
                message: format!("missing required column '{}'", name),
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut samples = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // records() starts after the header; lines are 1-based
        let line = idx + 2;
        let record = record.map_err(|e| EisFitError::Parse {
            line,
            message: format!("CSV parse error: {}", e),
        })?;

        if idx == 0 && is_units_row(&record, columns[0]) {
            continue;
        }

        samples.push(parse_row(&record, &columns, line)?);
    }

    if samples.is_empty() {
        return Err(EisFitError::InvalidInput(
            "spectrum file contains no samples".to_string(),
        ));
    }
    Spectrum::new(samples)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn is_units_row(record: &StringRecord, freq_column: usize) -> bool {
    record
        .get(freq_column)
        .map_or(false, |field| field.parse::<f64>().is_err())
}

fn parse_row(record: &StringRecord, columns: &[usize], line: usize) -> Result<Sample> {
    let field = |column: usize, name: &str| -> Result<f64> {
        let raw = record.get(column).ok_or_else(|| EisFitError::Parse {
            line,
            message: format!("missing {} value", name),
        })?;
        let value: f64 = raw.parse().map_err(|_| EisFitError::Parse {
            line,
            message: format!("non-numeric {} value '{}'", name, raw),
        })?;
        if !value.is_finite() {
            return Err(EisFitError::Parse {
                line,
                message: format!("{} must be finite, got {}", name, raw),
            });
        }
        Ok(value)
    };

    let frequency = field(columns[0], "Freq")?;
    if frequency <= 0.0 {
        return Err(EisFitError::Parse {
            line,
            message: format!("frequency must be positive, got {}", frequency),
        });
    }
    let z_real = field(columns[1], "Zreal")?;
    let z_imag = field(columns[2], "Zimag")?;

    Ok(Sample::new(frequency, z_real, z_imag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_normalized() {
        assert_eq!(normalize_header_name("\u{feff}Freq "), "freq");
        assert_eq!(normalize_header_name("ZIMAG"), "zimag");
    }

    #[test]
    fn units_row_is_only_skipped_first() {
        let csv = "Freq,Zreal,Zimag\nHz,Ohm,Ohm\n100,1,-1\nHz,Ohm,Ohm\n";
        match read_spectrum(csv.as_bytes()) {
            Err(EisFitError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }
}

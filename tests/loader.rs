//! CSV spectrum loading and exports.

use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;
use eisfit_rs::circuit::Topology;
use eisfit_rs::error::{EisFitError, Result};
use eisfit_rs::io::{load_spectrum, read_spectrum, write_spectrum_csv};
use eisfit_rs::synth::{log_frequencies, synthesize};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("eisfit_{}_{}", std::process::id(), name))
}

#[test]
fn test_reads_header_and_units_row() -> Result<()> {
    let csv = "Freq,Zreal,Zimag\nHz,Ohm,Ohm\n\
               100000,123.456,-234.567\n\
               50000,345.678,-456.789\n\
               10000,612.0,-301.2\n";
    let spectrum = read_spectrum(csv.as_bytes())?;

    assert_eq!(spectrum.len(), 3);
    assert_eq!(spectrum.frequencies(), vec![100000.0, 50000.0, 10000.0]);
    assert_relative_eq!(spectrum.impedances()[2].re, 612.0);
    assert_relative_eq!(spectrum.impedances()[2].im, -301.2);
    Ok(())
}

#[test]
fn test_header_is_case_insensitive_and_reorderable() -> Result<()> {
    let csv = "\u{feff}ZIMAG , index, freq,zReal\n-1.5,0,10,2.5\n-0.5,1,1,3.5\n";
    let spectrum = read_spectrum(csv.as_bytes())?;

    assert_eq!(spectrum.len(), 2);
    assert_eq!(spectrum.samples()[0].frequency, 10.0);
    assert_relative_eq!(spectrum.samples()[0].impedance.re, 2.5);
    assert_relative_eq!(spectrum.samples()[0].impedance.im, -1.5);
    Ok(())
}

#[test]
fn test_malformed_rows_report_their_line() {
    let cases = [
        ("Freq,Zreal,Zimag\nHz,Ohm,Ohm\n10,1,-1\n5,abc,-1\n", 4),
        ("Freq,Zreal,Zimag\nHz,Ohm,Ohm\n0,1,-1\n", 3),
        ("Freq,Zreal,Zimag\n-10,1,-1\n", 2),
        ("Freq,Zreal,Zimag\n10,1,NaN\n", 2),
        ("Freq,Zreal,Zimag\n10,1\n", 2),
    ];

    for (csv, expected_line) in cases {
        match read_spectrum(csv.as_bytes()) {
            Err(EisFitError::Parse { line, .. }) => assert_eq!(line, expected_line, "{}", csv),
            other => panic!("expected parse error for {:?}, got {:?}", csv, other),
        }
    }
}

#[test]
fn test_missing_columns_and_empty_files() {
    assert!(matches!(
        read_spectrum("Freq,Zreal\n10,1\n".as_bytes()),
        Err(EisFitError::Parse { line: 1, .. })
    ));
    assert!(matches!(
        read_spectrum("Freq,Zreal,Zimag\nHz,Ohm,Ohm\n".as_bytes()),
        Err(EisFitError::InvalidInput(_))
    ));
    assert!(load_spectrum(&temp_path("does_not_exist.csv")).is_err());
}

#[test]
fn test_simulated_spectrum_round_trips_through_csv() -> Result<()> {
    let frequencies = log_frequencies(1e4, 1.0, 12)?;
    let spectrum = synthesize(&Topology::Randles, &[20.0, 150.0, 2e-5, 40.0], &frequencies, None)?;

    let path = temp_path("simulated.csv");
    write_spectrum_csv(&path, &spectrum)?;
    let text = fs::read_to_string(&path)?;
    assert!(text.starts_with("Freq,Zreal,Zimag\nHz,Ohm,Ohm\n"));

    let loaded = load_spectrum(&path)?;
    fs::remove_file(&path)?;

    assert_eq!(loaded.len(), spectrum.len());
    for (a, b) in loaded.samples().iter().zip(spectrum.samples()) {
        assert_relative_eq!(a.frequency, b.frequency, max_relative = 1e-9);
        assert_relative_eq!(a.impedance.re, b.impedance.re, max_relative = 1e-9);
        assert_relative_eq!(a.impedance.im, b.impedance.im, max_relative = 1e-9);
    }
    Ok(())
}

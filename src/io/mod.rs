//! Input/output helpers.
//!
//! - CSV spectrum ingest (`ingest`)
//! - series, spectrum and fit-result exports (`export`)

pub mod export;
pub mod ingest;

pub use export::{write_fit_json, write_series_csv, write_spectrum_csv};
pub use ingest::{load_spectrum, read_spectrum};

//! # eisfit-rs
//!
//! Equivalent-circuit fitting of electrochemical impedance spectra (EIS).
//!
//! The library provides:
//! - Impedance models for the Randles, modified Randles (CPE) and Thevenin
//!   multi-RC circuits
//! - A residual builder stacking real and imaginary misfits into one real vector
//! - A bounded Levenberg-Marquardt solver with covariance-based standard errors
//! - Parameter tables, Nyquist series and SVG plots of the fit
//!
//! ## Basic Usage
//!
//! ```
//! use eisfit_rs::{fit_spectrum, synth, FitOptions, Topology};
//!
//! let frequencies = synth::log_frequencies(1e5, 0.1, 40).unwrap();
//! let truth = [20.0, 150.0, 2e-5, 40.0];
//! let spectrum = synth::synthesize(&Topology::Randles, &truth, &frequencies, None).unwrap();
//!
//! let options = FitOptions::new().with_initial_values(vec![25.0, 120.0, 1.5e-5, 30.0]);
//! let result = fit_spectrum(&spectrum, Topology::Randles, &options).unwrap();
//! assert!(result.is_success());
//! println!("{}", eisfit_rs::report::format_parameter_table(&result));
//! ```

pub mod error;

pub mod spectrum;

pub mod circuit;

pub mod parameters;

pub mod utils;

pub mod problem;

pub mod residual;

pub mod lm;

pub mod uncertainty;

pub mod fit;

pub mod synth;

pub mod report;

pub mod io;

pub mod cli;

pub mod app;

// Re-exports for convenience
pub use circuit::Topology;
pub use error::{EisFitError, Result};
pub use fit::{fit_spectrum, FitOptions, FitResult, FitStatus};
pub use lm::LevenbergMarquardt;
pub use problem::Problem;
pub use residual::Weighting;
pub use spectrum::{Sample, Spectrum};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

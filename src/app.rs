//! Top-level application orchestration for the `eisfit` binary.
//!
//! `src/main.rs` only maps the outcome to an exit code; this module parses
//! arguments, installs logging, loads spectra, fits, prints reports and
//! writes plots and exports.

use std::path::{Path, PathBuf};

use clap::Parser;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::circuit::Topology;
use crate::cli::{Cli, Command, FitArgs, SimulateArgs};
use crate::error::{EisFitError, Result};
use crate::fit::{fit_spectrum, FitOptions, FitResult};
use crate::report::{format_parameter_table, plot::render_nyquist_svg, NyquistSeries};
use crate::spectrum::Spectrum;
use crate::synth::{self, Noise};

/// Points on the smooth model curve drawn through the Nyquist plot.
const SMOOTH_POINTS: usize = 200;

/// Entry point for the `eisfit` binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Randles(args) => handle_fit(Topology::Randles, &args),
        Command::ModifiedRandles(args) => handle_fit(Topology::ModifiedRandles, &args),
        Command::Thevenin(args) => handle_fit(Topology::thevenin(args.stages)?, &args.fit),
        Command::Simulate(args) => handle_simulate(&args),
    }
}

/// Install a stderr `tracing` subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second install (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn fit_options_from_args(args: &FitArgs) -> FitOptions {
    let mut options = FitOptions::new().with_weighting(args.weighting.into());
    for (name, value) in &args.inits {
        options = options.with_initial(name.clone(), *value);
    }
    for (name, bounds) in &args.bounds {
        options = options.with_bounds(name.clone(), *bounds);
    }
    if let Some(max_iterations) = args.max_iterations {
        options = options.with_max_iterations(max_iterations);
    }
    options
}

fn handle_fit(topology: Topology, args: &FitArgs) -> Result<()> {
    let options = fit_options_from_args(args);
    let multiple = args.inputs.len() > 1;

    // Fits are independent; collect keeps input order for the reports
    let outcomes: Vec<Result<(Spectrum, FitResult)>> = args
        .inputs
        .par_iter()
        .map(|path| {
            let spectrum = crate::io::load_spectrum(path)?;
            info!(path = %path.display(), samples = spectrum.len(), "loaded spectrum");
            let result = fit_spectrum(&spectrum, topology, &options)?;
            Ok((spectrum, result))
        })
        .collect();

    let mut first_error = None;
    let mut failed_fits = 0usize;
    for (input, outcome) in args.inputs.iter().zip(outcomes) {
        if multiple {
            println!("# {}", input.display());
        }
        let (spectrum, result) = match outcome {
            Ok(pair) => pair,
            Err(err) => {
                eprintln!("{}: {}", input.display(), err);
                first_error.get_or_insert(err);
                continue;
            }
        };

        println!("{}", format_parameter_table(&result));
        if !result.is_success() {
            failed_fits += 1;
        }

        if let Err(err) = write_outputs(input, &topology, &spectrum, &result, args, multiple) {
            eprintln!("{}: {}", input.display(), err);
            first_error.get_or_insert(err);
        }
    }

    match first_error {
        Some(err) => Err(err),
        None if failed_fits > 0 => Err(EisFitError::ConvergenceFailure(format!(
            "{} of {} fits did not converge",
            failed_fits,
            args.inputs.len()
        ))),
        None => Ok(()),
    }
}

fn write_outputs(
    input: &Path,
    topology: &Topology,
    spectrum: &Spectrum,
    result: &FitResult,
    args: &FitArgs,
    multiple: bool,
) -> Result<()> {
    if let Some(path) = &args.export_json {
        let path = per_input_path(path, input, multiple);
        crate::io::write_fit_json(&path, result)?;
        info!(path = %path.display(), "wrote fit result");
    }

    let wants_series = args.export_series.is_some() || !args.no_plot;
    if !wants_series {
        return Ok(());
    }
    let series = NyquistSeries::build(result, spectrum, SMOOTH_POINTS)?;

    if let Some(path) = &args.export_series {
        let path = per_input_path(path, input, multiple);
        crate::io::write_series_csv(&path, &series)?;
        info!(path = %path.display(), "wrote Nyquist series");
    }

    if !args.no_plot {
        let path = match &args.plot {
            Some(path) => per_input_path(path, input, multiple),
            None => default_plot_path(input, topology),
        };
        let title = format!("{} fit: {}", topology, file_label(input));
        // Plot failures never invalidate the fit
        match render_nyquist_svg(&path, &series, &title) {
            Ok(()) => println!("Nyquist plot: {}", path.display()),
            Err(err) => warn!(path = %path.display(), error = %err, "plot rendering failed"),
        }
    }
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<()> {
    let topology = args.topology.to_topology(args.stages)?;
    let frequencies = synth::log_frequencies(args.f_max, args.f_min, args.points)?;
    let noise = (args.noise > 0.0).then_some(Noise {
        relative_sigma: args.noise,
        seed: args.seed,
    });

    let spectrum = synth::synthesize(&topology, &args.params, &frequencies, noise)?;
    crate::io::write_spectrum_csv(&args.output, &spectrum)?;
    println!(
        "Wrote {} samples of {} to {}",
        spectrum.len(),
        topology,
        args.output.display()
    );
    Ok(())
}

/// `nyquist_<topology>.svg` in the input's directory.
pub fn default_plot_path(input: &Path, topology: &Topology) -> PathBuf {
    let name = format!("nyquist_{}.svg", topology.slug());
    match input.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// With several inputs, `out.ext` becomes `out_<input stem>.ext`.
fn per_input_path(path: &Path, input: &Path, multiple: bool) -> PathBuf {
    if !multiple {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let tag = file_label(input);
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, tag, ext),
        None => format!("{}_{}", stem, tag),
    };
    path.with_file_name(name)
}

fn file_label(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

//! Command-line parsing for the `eisfit` binary.
//!
//! Argument parsing lives here; dispatch and I/O live in [`crate::app`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::circuit::{Topology, DEFAULT_THEVENIN_STAGES};
use crate::error::Result;
use crate::parameters::Bounds;
use crate::residual::Weighting;

/// Default spectrum location, relative to the working directory.
pub const DEFAULT_INPUT: &str = "data/EIS_data.csv";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "eisfit",
    version,
    about = "Equivalent-circuit fitting of electrochemical impedance spectra"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the Randles circuit: Rs + (Cdl || (Rct + Warburg)).
    Randles(FitArgs),
    /// Fit the modified Randles circuit with SEI and double-layer CPEs.
    ModifiedRandles(FitArgs),
    /// Fit a Thevenin chain of parallel RC stages.
    Thevenin(TheveninArgs),
    /// Write a synthetic spectrum CSV in the loader's format.
    Simulate(SimulateArgs),
}

/// Residual weighting selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeightingArg {
    Unit,
    Modulus,
}

impl From<WeightingArg> for Weighting {
    fn from(arg: WeightingArg) -> Self {
        match arg {
            WeightingArg::Unit => Weighting::Unit,
            WeightingArg::Modulus => Weighting::Modulus,
        }
    }
}

/// Options shared by every fitting subcommand.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Spectrum CSV files (columns Freq, Zreal, Zimag).
    #[arg(value_name = "CSV", default_value = DEFAULT_INPUT)]
    pub inputs: Vec<PathBuf>,

    /// SVG path for the Nyquist plot (default: nyquist_<topology>.svg next to the input).
    #[arg(long, value_name = "SVG")]
    pub plot: Option<PathBuf>,

    /// Skip the Nyquist plot.
    #[arg(long, conflicts_with = "plot")]
    pub no_plot: bool,

    /// Residual weighting.
    #[arg(long, value_enum, default_value_t = WeightingArg::Unit)]
    pub weighting: WeightingArg,

    /// Override an initial guess, e.g. `--init Rct=150`. Repeatable.
    #[arg(long = "init", value_name = "NAME=VALUE", value_parser = parse_init)]
    pub inits: Vec<(String, f64)>,

    /// Override a parameter's bounds, e.g. `--bound alpha_dl=0.5:1`.
    /// An empty side is unbounded. Repeatable.
    #[arg(long = "bound", value_name = "NAME=MIN:MAX", value_parser = parse_bound)]
    pub bounds: Vec<(String, Bounds)>,

    /// Solver iteration budget.
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Write the fit result as JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Write the Nyquist series (measured, fitted, smooth) as CSV.
    #[arg(long, value_name = "CSV")]
    pub export_series: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TheveninArgs {
    /// Number of parallel RC stages.
    #[arg(long, default_value_t = DEFAULT_THEVENIN_STAGES)]
    pub stages: usize,

    #[command(flatten)]
    pub fit: FitArgs,
}

/// Topology names accepted by `simulate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TopologyArg {
    Randles,
    ModifiedRandles,
    Thevenin,
}

impl TopologyArg {
    pub fn to_topology(self, stages: usize) -> Result<Topology> {
        match self {
            TopologyArg::Randles => Ok(Topology::Randles),
            TopologyArg::ModifiedRandles => Ok(Topology::ModifiedRandles),
            TopologyArg::Thevenin => Topology::thevenin(stages),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Circuit to evaluate.
    #[arg(long, value_enum)]
    pub topology: TopologyArg,

    /// RC stages when `--topology thevenin`.
    #[arg(long, default_value_t = DEFAULT_THEVENIN_STAGES)]
    pub stages: usize,

    /// Parameter values in the topology's order, comma separated.
    #[arg(
        long,
        required = true,
        value_delimiter = ',',
        num_args = 1..,
        allow_negative_numbers = true
    )]
    pub params: Vec<f64>,

    /// Highest frequency (Hz).
    #[arg(long, default_value_t = 1e5)]
    pub f_max: f64,

    /// Lowest frequency (Hz).
    #[arg(long, default_value_t = 0.1)]
    pub f_min: f64,

    /// Number of log-spaced frequencies.
    #[arg(long, default_value_t = 50)]
    pub points: usize,

    /// Relative Gaussian noise level (fraction of |Z|); 0 disables noise.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Noise seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,
}

fn parse_init(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = split_assignment(raw)?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value in '{}'", raw))?;
    if !value.is_finite() {
        return Err(format!("value in '{}' must be finite", raw));
    }
    Ok((name, value))
}

fn parse_bound(raw: &str) -> std::result::Result<(String, Bounds), String> {
    let (name, range) = split_assignment(raw)?;
    let (lo, hi) = range
        .split_once(':')
        .ok_or_else(|| format!("expected NAME=MIN:MAX, got '{}'", raw))?;

    let side = |text: &str, open: f64| -> std::result::Result<f64, String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(open);
        }
        text.parse::<f64>()
            .map_err(|_| format!("invalid bound '{}' in '{}'", text, raw))
    };
    let bounds = Bounds::new(side(lo, f64::NEG_INFINITY)?, side(hi, f64::INFINITY)?)
        .map_err(|e| e.to_string())?;
    Ok((name, bounds))
}

fn split_assignment(raw: &str) -> std::result::Result<(String, &str), String> {
    let (name, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=..., got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    Ok((name.to_string(), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init_overrides() {
        assert_eq!(parse_init("Rct=150").unwrap(), ("Rct".to_string(), 150.0));
        assert_eq!(parse_init(" sigma = 2e1").unwrap(), ("sigma".to_string(), 20.0));
        assert!(parse_init("Rct").is_err());
        assert!(parse_init("=3").is_err());
        assert!(parse_init("Rct=abc").is_err());
        assert!(parse_init("Rct=inf").is_err());
    }

    #[test]
    fn parses_bound_overrides() {
        let (name, bounds) = parse_bound("alpha_dl=0.5:1").unwrap();
        assert_eq!(name, "alpha_dl");
        assert_eq!(bounds, Bounds::new(0.5, 1.0).unwrap());

        let (_, open) = parse_bound("Rs=1e-3:").unwrap();
        assert_eq!(open.min, 1e-3);
        assert!(open.max.is_infinite());

        assert!(parse_bound("Rs=2:1").is_err());
        assert!(parse_bound("Rs=1").is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::parse_from([
            "eisfit", "-vv", "thevenin", "--stages", "3", "a.csv", "b.csv", "--no-plot",
            "--init", "R1=10",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Thevenin(args) => {
                assert_eq!(args.stages, 3);
                assert_eq!(args.fit.inputs.len(), 2);
                assert!(args.fit.no_plot);
                assert_eq!(args.fit.inits, vec![("R1".to_string(), 10.0)]);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["eisfit", "randles"]);
        match cli.command {
            Command::Randles(args) => {
                assert_eq!(args.inputs, vec![PathBuf::from(DEFAULT_INPUT)]);
                assert_eq!(args.weighting, WeightingArg::Unit);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

//! Fit the Randles and modified Randles circuits to synthetic spectra.
//!
//! Run with `cargo run --example fit_randles`.

use eisfit_rs::circuit::Topology;
use eisfit_rs::fit::{fit_spectrum, FitOptions};
use eisfit_rs::report::format_parameter_table;
use eisfit_rs::residual::Weighting;
use eisfit_rs::synth::{log_frequencies, synthesize, Noise};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Randles fitting example");
    println!("=======================\n");

    let frequencies = log_frequencies(1e5, 0.1, 60)?;

    // 1. Randles cell with 0.5% noise, seeds derived from the spectrum
    let truth = [20.0, 150.0, 2e-5, 40.0];
    let noise = Noise {
        relative_sigma: 0.005,
        seed: 42,
    };
    let spectrum = synthesize(&Topology::Randles, &truth, &frequencies, Some(noise))?;
    let options = FitOptions::new().with_weighting(Weighting::Modulus);
    let result = fit_spectrum(&spectrum, Topology::Randles, &options)?;

    println!("{}", format_parameter_table(&result));
    println!("True values: {:?}\n", truth);

    // 2. Two-arc cell fitted with the CPE model
    let truth = [10.0, 25.0, 5e-5, 0.85, 80.0, 2e-3, 0.9, 15.0];
    let spectrum = synthesize(&Topology::ModifiedRandles, &truth, &frequencies, None)?;
    let result = fit_spectrum(&spectrum, Topology::ModifiedRandles, &FitOptions::new())?;

    println!("{}", format_parameter_table(&result));
    println!("True values: {:?}", truth);

    Ok(())
}

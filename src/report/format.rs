//! Text rendering of fit results.

use crate::circuit::Topology;
use crate::fit::FitResult;
use crate::parameters::BoundSide;

/// Correlation magnitude from which a parameter pair is listed in the table.
pub const STRONG_CORRELATION: f64 = 0.95;

/// Format a fit as a parameter table with units and diagnostics.
pub fn format_parameter_table(result: &FitResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} fit ===\n", result.topology));
    out.push_str(&format!("Status: {} ({})\n", result.status, result.message));

    out.push_str(
        format!(
            "{:<10} {:>12} {:<11} {:>12} {}\n",
            "parameter", "value", "unit", "std_error", "note"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12} {:-<11} {:-<12}\n", "", "", "", "").trim_end());
    out.push('\n');

    for p in &result.parameters {
        let std_error = p
            .std_error
            .map(|e| format!("{e:.4e}"))
            .unwrap_or_else(|| "-".to_string());
        let note = match p.at_bound {
            Some(BoundSide::Lower) => "at lower bound",
            Some(BoundSide::Upper) => "at upper bound",
            None => "",
        };
        out.push_str(
            format!(
                "{:<10} {:>12.4e} {:<11} {:>12} {}\n",
                p.name, p.value, p.unit, std_error, note
            )
            .trim_end(),
        );
        out.push('\n');
    }

    if let Topology::TheveninMultiRc { stages } = result.topology {
        let values = result.values();
        out.push_str("\nTime constants:\n");
        for i in 0..stages {
            let tau = values[1 + 2 * i] * values[2 + 2 * i];
            out.push_str(&format!("tau{} = R{}*C{} = {:.4e} s\n", i + 1, i + 1, i + 1, tau));
        }
    }

    out.push_str(&format!(
        "\nIterations: {} | evaluations: {} | residual norm: {:.4e} | rmse: {:.4e}\n",
        result.iterations, result.func_evals, result.residual_norm, result.rmse
    ));
    if let Some(redchi) = result.redchi {
        out.push_str(&format!("Reduced chi-square: {:.4e}\n", redchi));
    }
    let correlated = result.strong_correlations(STRONG_CORRELATION);
    if !correlated.is_empty() {
        out.push_str("Strong correlations:\n");
        for (a, b, r) in correlated {
            out.push_str(&format!("  {} / {}: {:+.3}\n", a, b, r));
        }
    }
    if result.rank_deficient {
        out.push_str("Warning: Jacobian is rank deficient; some parameters are not identifiable\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{FitStatus, ParameterEstimate};
    use crate::parameters::Bounds;

    fn estimate(name: &str, unit: &'static str, value: f64) -> ParameterEstimate {
        ParameterEstimate {
            name: name.to_string(),
            unit,
            value,
            std_error: None,
            bounds: Bounds::min_only(1e-12),
            at_bound: None,
        }
    }

    #[test]
    fn thevenin_table_lists_time_constants() {
        let mut r1 = estimate("R1", "Ohm", 20.0);
        r1.at_bound = Some(BoundSide::Lower);
        let result = FitResult {
            topology: Topology::TheveninMultiRc { stages: 1 },
            parameters: vec![estimate("Rs", "Ohm", 1.5), r1, estimate("C1", "F", 0.5)],
            residual_norm: 0.1,
            cost: 0.01,
            rmse: 0.05,
            iterations: 3,
            func_evals: 20,
            status: FitStatus::Succeeded,
            message: "ok".to_string(),
            rank_deficient: true,
            redchi: None,
            covariance: None,
            correlation: None,
        };

        let table = format_parameter_table(&result);
        assert!(table.starts_with("=== Thevenin 1-RC fit ===\n"));
        assert!(table.contains("Status: succeeded (ok)"));
        assert!(table.contains("2.0000e1"));
        assert!(table.contains("at lower bound"));
        assert!(table.contains("tau1 = R1*C1 = 1.0000e1 s"));
        assert!(table.contains("rank deficient"));
    }

    #[test]
    fn table_lists_redchi_and_strong_correlations() {
        let result = FitResult {
            topology: Topology::Randles,
            parameters: vec![
                estimate("Rs", "Ohm", 20.0),
                estimate("Rct", "Ohm", 150.0),
                estimate("Cdl", "F", 2e-5),
                estimate("sigma", "Ohm*s^-1/2", 40.0),
            ],
            residual_norm: 0.5,
            cost: 0.25,
            rmse: 0.05,
            iterations: 6,
            func_evals: 40,
            status: FitStatus::Succeeded,
            message: "ok".to_string(),
            rank_deficient: false,
            redchi: Some(0.0025),
            covariance: None,
            correlation: Some(ndarray::arr2(&[
                [1.0, 0.2, 0.1, 0.0],
                [0.2, 1.0, -0.97, 0.3],
                [0.1, -0.97, 1.0, 0.5],
                [0.0, 0.3, 0.5, 1.0],
            ])),
        };

        let table = format_parameter_table(&result);
        assert!(table.contains("Reduced chi-square: 2.5000e-3"));
        assert!(table.contains("Rct / Cdl: -0.970"));
        assert!(!table.contains("Rs / Rct"));
        assert!(!table.contains("rank deficient"));
    }
}

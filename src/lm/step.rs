//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! Solves the damped normal equations `(JᵀJ + λD)δ = −Jᵀr` with Marquardt
//! scaling `D = diag(JᵀJ)`, floored so that columns with a vanishing
//! derivative still get some damping.

use ndarray::{Array1, Array2};

use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// Reduction in `‖r‖²` predicted by the linearized model
    pub predicted_reduction: f64,

    /// The damping parameter used to calculate the step
    pub lambda: f64,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Marquardt scaling: the diagonal of `JᵀJ`, floored relative to its largest entry.
    pub fn scaling(j_t_j: &Array2<f64>) -> Array1<f64> {
        let diag = j_t_j.diag();
        let max_diag = diag.iter().cloned().fold(0.0, f64::max);
        let floor = (f64::EPSILON * max_diag).max(f64::MIN_POSITIVE);
        diag.mapv(|d| d.max(floor))
    }

    /// Calculates the damped step for the given `JᵀJ`, gradient `Jᵀr` and scaling.
    ///
    /// Returns `None` when the damped system cannot be solved, in which case the
    /// caller should increase lambda and retry.
    pub fn calculate_step(
        j_t_j: &Array2<f64>,
        gradient: &Array1<f64>,
        scaling: &Array1<f64>,
        lambda: f64,
    ) -> Option<StepResult> {
        let mut augmented = j_t_j.clone();
        for i in 0..augmented.nrows() {
            augmented[[i, i]] += lambda * scaling[i];
        }

        let step = Self::solve(&augmented, &(-gradient))?;
        let predicted_reduction = Self::predicted_reduction(gradient, scaling, &step, lambda);

        Some(StepResult {
            step,
            predicted_reduction,
            lambda,
        })
    }

    /// Solves `A x = b`, trying Cholesky first and LU as a fallback.
    fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
        let a_na = ndarray_to_nalgebra(a);
        let b_na = ndarray_vec_to_nalgebra(b);

        let x = match a_na.clone().cholesky() {
            Some(chol) => chol.solve(&b_na),
            None => a_na.lu().solve(&b_na)?,
        };

        if x.iter().all(|v| v.is_finite()) {
            Some(nalgebra_vec_to_ndarray(&x))
        } else {
            None
        }
    }

    /// For a step solving the damped system, the linearized cost reduction
    /// `‖r‖² − ‖r + Jδ‖²` simplifies to `δᵀ(λDδ − Jᵀr)`.
    fn predicted_reduction(
        gradient: &Array1<f64>,
        scaling: &Array1<f64>,
        step: &Array1<f64>,
        lambda: f64,
    ) -> f64 {
        step.iter()
            .zip(scaling.iter())
            .zip(gradient.iter())
            .map(|((&d, &s), &g)| d * (lambda * s * d - g))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_small_lambda_approaches_gauss_newton() {
        // J = I, r = [1, -2]: the Gauss-Newton step is -r
        let j_t_j = array![[1.0, 0.0], [0.0, 1.0]];
        let gradient = array![1.0, -2.0];
        let scaling = LmStep::scaling(&j_t_j);

        let result = LmStep::calculate_step(&j_t_j, &gradient, &scaling, 1e-12).unwrap();
        assert_relative_eq!(result.step[0], -1.0, epsilon = 1e-9);
        assert_relative_eq!(result.step[1], 2.0, epsilon = 1e-9);
        // Full reduction of ‖r‖² = 5
        assert_relative_eq!(result.predicted_reduction, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_large_lambda_shrinks_step() {
        let j_t_j = array![[4.0, 1.0], [1.0, 2.0]];
        let gradient = array![1.0, 1.0];
        let scaling = LmStep::scaling(&j_t_j);

        let small = LmStep::calculate_step(&j_t_j, &gradient, &scaling, 1e-3).unwrap();
        let large = LmStep::calculate_step(&j_t_j, &gradient, &scaling, 1e3).unwrap();
        let norm = |v: &Array1<f64>| v.dot(v).sqrt();
        assert!(norm(&large.step) < norm(&small.step));
        assert!(large.predicted_reduction > 0.0);
    }

    #[test]
    fn test_scaling_floors_zero_columns() {
        let j_t_j = array![[2.0, 0.0], [0.0, 0.0]];
        let scaling = LmStep::scaling(&j_t_j);
        assert_eq!(scaling[0], 2.0);
        assert!(scaling[1] > 0.0);

        // Singular JᵀJ is still solvable once damped
        let step = LmStep::calculate_step(&j_t_j, &array![1.0, 0.0], &scaling, 1e-3);
        assert!(step.is_some());
    }
}

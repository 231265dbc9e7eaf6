//! Levenberg-Marquardt algorithm implementation.
//!
//! An unconstrained, Marquardt-scaled Levenberg-Marquardt solver with a
//! gain-ratio damping update. Bounds are handled outside the solver by
//! [`crate::problem::BoundedProblem`].

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;
pub mod trust_region;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, StepResult};
pub use trust_region::TrustRegion;

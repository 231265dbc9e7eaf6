//! Impedance model library.
//!
//! Pure functions from `(frequencies, parameters)` to complex impedance for
//! each supported equivalent circuit. No I/O and no state.

pub mod elements;
pub mod topology;

pub use topology::{
    ParameterKind, ParameterSpec, Topology, DEFAULT_THEVENIN_STAGES, PARAMETER_EPSILON,
};

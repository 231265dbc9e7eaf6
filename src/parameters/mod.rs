//! # Parameter bounds
//!
//! Circuit parameters are physical quantities with a domain (resistances and
//! capacitances strictly positive, CPE exponents in (0, 1]). The solver itself
//! is unconstrained; [`BoundsTransform`] maps between the solver's internal
//! coordinates and the bounded external values, and [`ParameterMapping`]
//! applies one transform per parameter to whole vectors.

pub mod bounds;

pub use bounds::{BoundSide, Bounds, BoundsError, BoundsTransform};

use ndarray::Array1;

/// Per-parameter transforms for a full parameter vector.
#[derive(Debug, Clone)]
pub struct ParameterMapping {
    transforms: Vec<BoundsTransform>,
}

impl ParameterMapping {
    pub fn new(bounds: &[Bounds]) -> Self {
        Self {
            transforms: bounds.iter().copied().map(BoundsTransform::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn to_external(&self, internal: &Array1<f64>) -> Array1<f64> {
        internal
            .iter()
            .zip(&self.transforms)
            .map(|(&u, t)| t.to_external(u))
            .collect()
    }

    pub fn to_internal(&self, external: &Array1<f64>) -> Result<Array1<f64>, BoundsError> {
        external
            .iter()
            .zip(&self.transforms)
            .map(|(&x, t)| t.to_internal(x))
            .collect()
    }
}

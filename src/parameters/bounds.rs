//! Parameter bounds and the Minuit-style bounds transform.
//!
//! The solver works on an unconstrained internal vector. Each bounded parameter
//! is mapped between its internal value `u` and its external (physical) value
//! `x` so that every internal step lands inside the feasible region.

use std::f64::{INFINITY, NEG_INFINITY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Infinite parameter value is not allowed")]
    InfiniteValue,
}

/// Which side of its bounds a fitted parameter ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundSide {
    Lower,
    Upper,
}

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Bounds", 2)?;

        // JSON has no infinity; open ends become null
        if self.min.is_infinite() && self.min.is_sign_negative() {
            state.serialize_field("min", &serde_json::Value::Null)?;
        } else {
            state.serialize_field("min", &self.min)?;
        }

        if self.max.is_infinite() && self.max.is_sign_positive() {
            state.serialize_field("max", &serde_json::Value::Null)?;
        } else {
            state.serialize_field("max", &self.max)?;
        }

        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            min: Option<f64>,

            #[serde(default)]
            max: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;

        let min = helper.min.unwrap_or(NEG_INFINITY);
        let max = helper.max.unwrap_or(INFINITY);

        Bounds::new(min, max).map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint.
    ///
    /// Fails unless `min < max`. NaN on either side is rejected too.
    ///
    /// # Examples
    ///
    /// ```
    /// use eisfit_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// assert!(Bounds::new(1.0, 1.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min >= max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Create a bounds constraint with only a minimum value
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Create a bounds constraint with only a maximum value
    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    /// Check if a value is within the bounds (inclusive)
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if the bounds are finite (both min and max are finite)
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Move a value strictly inside the bounds.
    ///
    /// Values on or beyond a finite bound are pulled in by a small margin:
    /// 0.1% of the range for two-sided bounds, otherwise 0.1% of the bound's
    /// magnitude (at least machine epsilon).
    pub fn interior(&self, value: f64) -> f64 {
        let margin = if self.is_finite() {
            1e-3 * (self.max - self.min)
        } else {
            let anchor = if self.has_lower_bound() { self.min } else { self.max };
            (1e-3 * anchor.abs()).max(f64::EPSILON)
        };

        if self.has_lower_bound() && value <= self.min {
            self.min + margin
        } else if self.has_upper_bound() && value >= self.max {
            self.max - margin
        } else {
            value
        }
    }

    /// Report whether `value` is held on one of the bounds.
    ///
    /// `step` is the unconstrained step the data asks for in this parameter at
    /// the solution. The transform only approaches a bound asymptotically, so a
    /// value counts as held when it is on the bound, or when the step points
    /// into the bound and the remaining distance is below `1e-3 * |step|`.
    pub fn saturated_side(&self, value: f64, step: f64) -> Option<BoundSide> {
        const HELD_FRACTION: f64 = 1e-3;

        if self.has_lower_bound()
            && (value <= self.min || (step < 0.0 && value - self.min <= HELD_FRACTION * -step))
        {
            return Some(BoundSide::Lower);
        }
        if self.has_upper_bound()
            && (value >= self.max || (step > 0.0 && self.max - value <= HELD_FRACTION * step))
        {
            return Some(BoundSide::Upper);
        }
        None
    }
}

/// Implements the Minuit-style parameter transformations for handling bounds constraints
///
/// This allows the optimizer to work with unbounded parameters internally, while the
/// external values are constrained to be within the specified bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Transform an internal parameter value to an external value.
    ///
    /// One-sided bounds use `min + u²/(√(u²+1)+1)`, which equals
    /// `min − 1 + √(u²+1)` without the cancellation near `u = 0`.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        let lower = self.bounds.has_lower_bound();
        let upper = self.bounds.has_upper_bound();

        match (lower, upper) {
            (false, false) => internal_value,
            (true, false) => self.bounds.min + one_sided_offset(internal_value),
            (false, true) => self.bounds.max - one_sided_offset(internal_value),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                let x = self.bounds.min + (internal_value.sin() + 1.0) * bound_range / 2.0;
                self.bounds.clamp(x)
            }
        }
    }

    /// Transform an external parameter value to an internal value
    ///
    /// Returns an error if the external value is not finite or is outside bounds.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        let lower = self.bounds.has_lower_bound();
        let upper = self.bounds.has_upper_bound();

        let internal = match (lower, upper) {
            (false, false) => external_value,
            (true, false) => one_sided_inverse(external_value - self.bounds.min),
            (false, true) => one_sided_inverse(self.bounds.max - external_value),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                let scaled = 2.0 * (external_value - self.bounds.min) / bound_range - 1.0;
                scaled.clamp(-1.0, 1.0).asin()
            }
        };
        Ok(internal)
    }
}

/// `√(u²+1) − 1`, rewritten to stay accurate for small `u`.
fn one_sided_offset(u: f64) -> f64 {
    let u2 = u * u;
    u2 / ((u2 + 1.0).sqrt() + 1.0)
}

/// Inverse of [`one_sided_offset`] for a distance `d ≥ 0` from the bound.
fn one_sided_inverse(d: f64) -> f64 {
    (d * (d + 2.0)).sqrt()
}

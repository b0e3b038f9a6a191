//! Allocation hints for baking lattice segments.
//!
//! An allocation describes the range of values that reach a segment, so a
//! lattice sampled on `[0, 1]` covers it. The forward transform maps that
//! range onto `[0, 1]`; the inverse maps it back.

use super::{LogOpData, MatrixOpData, OpData, TransformDirection};
use crate::error::{OpError, OpResult};

/// Range of values a lattice must cover.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Allocation {
    /// Linear fit of `[min, max]`.
    Uniform {
        /// Lowest value.
        min: f64,
        /// Highest value.
        max: f64,
    },
    /// Base-2 log fit; `min` and `max` are in log2 units.
    Lg2 {
        /// Lowest log2 value.
        min: f64,
        /// Highest log2 value.
        max: f64,
        /// Added to linear values before the log.
        offset: Option<f64>,
    },
}

impl Default for Allocation {
    fn default() -> Self {
        Self::Uniform { min: 0.0, max: 1.0 }
    }
}

impl Allocation {
    /// Checks that the range is finite and non-empty.
    pub fn validate(&self) -> OpResult<()> {
        let (min, max, offset) = match *self {
            Self::Uniform { min, max } => (min, max, None),
            Self::Lg2 { min, max, offset } => (min, max, offset),
        };
        if !min.is_finite() || !max.is_finite() || offset.is_some_and(|o| !o.is_finite()) {
            return Err(OpError::invalid("allocation variables must be finite"));
        }
        if min >= max {
            return Err(OpError::invalid(format!(
                "allocation minimum {min} must be below maximum {max}"
            )));
        }
        Ok(())
    }

    /// Operators mapping the allocated range onto `[0, 1]` (forward) or
    /// back (inverse).
    pub fn ops(&self, direction: TransformDirection) -> OpResult<Vec<OpData>> {
        self.validate()?;
        let mut ops: Vec<OpData> = Vec::with_capacity(3);
        match *self {
            Self::Uniform { min, max } => match direction {
                TransformDirection::Forward => ops.push(MatrixOpData::fit(min, max, 0.0, 1.0).into()),
                TransformDirection::Inverse => ops.push(MatrixOpData::fit(0.0, 1.0, min, max).into()),
            },
            Self::Lg2 { min, max, offset } => match direction {
                TransformDirection::Forward => {
                    if let Some(o) = offset {
                        ops.push(MatrixOpData::scale_offset([1.0; 4], [o, o, o, 0.0]).into());
                    }
                    ops.push(LogOpData::with_base(2.0).into());
                    ops.push(MatrixOpData::fit(min, max, 0.0, 1.0).into());
                }
                TransformDirection::Inverse => {
                    ops.push(MatrixOpData::fit(0.0, 1.0, min, max).into());
                    ops.push(LogOpData::with_base(2.0).with_direction(TransformDirection::Inverse).into());
                    if let Some(o) = offset {
                        ops.push(MatrixOpData::scale_offset([1.0; 4], [-o, -o, -o, 0.0]).into());
                    }
                }
            },
        }
        Ok(ops)
    }

    /// Allocation digest.
    pub fn cache_id(&self) -> String {
        match *self {
            Self::Uniform { min, max } => format!("uniform {min} {max}"),
            Self::Lg2 { min, max, offset } => match offset {
                Some(o) => format!("lg2 {min} {max} {o}"),
                None => format!("lg2 {min} {max}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uniform_fits_unit_range() {
        let alloc = Allocation::Uniform { min: -0.5, max: 3.5 };
        let fwd = alloc.ops(TransformDirection::Forward).unwrap();
        let OpData::Matrix(m) = &fwd[0] else {
            panic!("expected matrix");
        };
        let out = m.apply([3.5, -0.5, 1.5, 1.0]).unwrap();
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn lg2_inverse_reverses_forward() {
        let alloc = Allocation::Lg2 { min: -8.0, max: 4.0, offset: Some(0.01) };
        let fwd = alloc.ops(TransformDirection::Forward).unwrap();
        let inv = alloc.ops(TransformDirection::Inverse).unwrap();
        assert_eq!(fwd.len(), 3);
        assert_eq!(inv.len(), 3);
        for (a, b) in fwd.iter().zip(inv.iter().rev()) {
            assert!(a.is_inverse(b), "{} vs {}", a.cache_id(), b.cache_id());
        }
    }

    #[test]
    fn malformed_ranges_fail() {
        let empty = Allocation::Uniform { min: 1.0, max: 1.0 };
        assert!(empty.ops(TransformDirection::Forward).is_err());
        let nan = Allocation::Lg2 { min: f64::NAN, max: 1.0, offset: None };
        assert!(nan.validate().is_err());
    }
}

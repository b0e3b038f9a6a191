//! Scale, offset and clamp.
//!
//! ```text
//! both pairs:  scale = (maxOut − minOut) / (maxIn − minIn)
//!              offset = minOut − scale · minIn
//! min only:    scale = 1, offset = minOut − minIn
//! max only:    scale = 1, offset = maxOut − maxIn
//! out = clamp(in · scale + offset, minOut, maxOut)
//! ```
//!
//! Unset bounds are infinite. A range with no bound set is a no-op.

use super::{FormatMetadata, MatrixOpData, OpData, TransformDirection};
use crate::error::{OpError, OpResult};
use std::fmt::Write;

/// Affine map with optional clamps.
///
/// ```rust
/// use vfx_colorops::opdata::RangeOpData;
///
/// let r = RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0));
/// assert_eq!(r.scale(), 2.0);
/// assert_eq!(r.apply(0.75), 1.5);
/// assert_eq!(r.apply(3.0), 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RangeOpData {
    /// Lower input bound.
    pub min_in: Option<f64>,
    /// Upper input bound.
    pub max_in: Option<f64>,
    /// Lower output bound.
    pub min_out: Option<f64>,
    /// Upper output bound.
    pub max_out: Option<f64>,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

fn max_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

fn min_opt(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

impl RangeOpData {
    /// Creates a range from its four bounds.
    pub fn new(
        min_in: Option<f64>,
        max_in: Option<f64>,
        min_out: Option<f64>,
        max_out: Option<f64>,
    ) -> Self {
        Self {
            min_in,
            max_in,
            min_out,
            max_out,
            metadata: FormatMetadata::default(),
        }
    }

    /// Range with no bounds.
    pub fn no_op() -> Self {
        Self::default()
    }

    /// Pure clamp to `[lower, upper]`.
    pub fn clamp(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self::new(lower, upper, lower, upper)
    }

    /// Clamp to `[0, 1]`.
    pub fn unit() -> Self {
        Self::clamp(Some(0.0), Some(1.0))
    }

    /// Ranges have no direction of their own.
    pub fn direction(&self) -> TransformDirection {
        TransformDirection::Forward
    }

    /// Checks bound pairing and ordering.
    pub fn validate(&self) -> OpResult<()> {
        if self.min_in.is_some() != self.min_out.is_some() {
            return Err(OpError::invalid("range minIn and minOut must be set together"));
        }
        if self.max_in.is_some() != self.max_out.is_some() {
            return Err(OpError::invalid("range maxIn and maxOut must be set together"));
        }
        let bounds = [self.min_in, self.max_in, self.min_out, self.max_out];
        if bounds.iter().flatten().any(|v| !v.is_finite()) {
            return Err(OpError::invalid("range bounds must be finite"));
        }
        if let (Some(lo), Some(hi)) = (self.min_in, self.max_in) {
            if lo > hi {
                return Err(OpError::invalid("range minIn exceeds maxIn"));
            }
            if lo == hi {
                return Err(OpError::invalid("range input interval is empty"));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_out, self.max_out) {
            if lo > hi {
                return Err(OpError::invalid("range minOut exceeds maxOut"));
            }
        }
        Ok(())
    }

    /// Multiplier applied before the offset.
    pub fn scale(&self) -> f64 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(a), Some(b), Some(c), Some(d)) => (d - c) / (b - a),
            _ => 1.0,
        }
    }

    /// Offset applied after scaling.
    pub fn offset(&self) -> f64 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(a), Some(_), Some(c), Some(_)) => c - self.scale() * a,
            (Some(a), _, Some(c), _) => c - a,
            (_, Some(b), _, Some(d)) => d - b,
            _ => 0.0,
        }
    }

    /// Lower output clamp.
    pub fn lower_bound(&self) -> Option<f64> {
        self.min_out
    }

    /// Upper output clamp.
    pub fn upper_bound(&self) -> Option<f64> {
        self.max_out
    }

    /// Evaluates the range in `f64`.
    pub fn apply(&self, x: f64) -> f64 {
        let mut v = x * self.scale() + self.offset();
        if let Some(lo) = self.lower_bound() {
            v = v.max(lo);
        }
        if let Some(hi) = self.upper_bound() {
            v = v.min(hi);
        }
        v
    }

    /// No bound is set.
    pub fn is_no_op(&self) -> bool {
        self.min_in.is_none() && self.max_in.is_none() && self.min_out.is_none() && self.max_out.is_none()
    }

    /// Scale 1 and offset 0; clamping allowed.
    pub fn is_identity(&self) -> bool {
        self.min_in == self.min_out && self.max_in == self.max_out
    }

    /// Identity that only clamps outside `[0, 1]`.
    ///
    /// Such a range has no effect on normalized integer code values.
    pub fn is_unit_passthrough(&self) -> bool {
        self.is_identity()
            && self.lower_bound().is_none_or(|lo| lo <= 0.0)
            && self.upper_bound().is_none_or(|hi| hi >= 1.0)
    }

    /// Ranges never mix channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// Clamp to the input domain, or an identity matrix when unbounded.
    pub fn identity_replacement(&self) -> OpData {
        if self.is_no_op() {
            MatrixOpData::identity().into()
        } else {
            Self::clamp(self.min_in, self.max_in).into()
        }
    }

    /// Swaps input and output bounds.
    pub fn inverse(&self) -> Self {
        Self {
            min_in: self.min_out,
            max_in: self.max_out,
            min_out: self.min_in,
            max_out: self.max_in,
            metadata: self.metadata.clone(),
        }
    }

    /// Whether `other` has the swapped bounds of `self`.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.min_in == other.min_out
            && self.max_in == other.max_out
            && self.min_out == other.min_in
            && self.max_out == other.max_in
    }

    /// `self` followed by `next` as a single range, or a scale/offset
    /// matrix when the result has no clamp.
    ///
    /// Returns `None` when the result is constant or a one-sided clamp
    /// with a scale other than 1.
    pub fn compose(&self, next: &Self) -> Option<OpData> {
        let (s1, o1) = (self.scale(), self.offset());
        let (s2, o2) = (next.scale(), next.offset());
        if s1 <= 0.0 || s2 <= 0.0 {
            return None;
        }
        let through = |v: f64| s2 * v + o2;
        let lo = max_opt(self.lower_bound().map(through), next.lower_bound());
        let hi = min_opt(self.upper_bound().map(through), next.upper_bound());
        let s = s1 * s2;
        let o = s2 * o1 + o2;
        let mut composed = match (lo, hi) {
            (Some(l), Some(h)) => {
                if l >= h {
                    return None;
                }
                Self::new(Some((l - o) / s), Some((h - o) / s), Some(l), Some(h))
            }
            (Some(l), None) if s == 1.0 => Self::new(Some(l - o), None, Some(l), None),
            (None, Some(h)) if s == 1.0 => Self::new(None, Some(h - o), None, Some(h)),
            (None, None) => {
                if s == 1.0 && o == 0.0 {
                    Self::no_op()
                } else {
                    let mut m = MatrixOpData::scale_offset([s, s, s, 1.0], [o, o, o, 0.0]);
                    m.metadata = self.metadata.clone();
                    return Some(m.into());
                }
            }
            _ => return None,
        };
        composed.metadata = self.metadata.clone();
        Some(composed.into())
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = String::from("Range");
        for (name, v) in [
            ("minIn", self.min_in),
            ("maxIn", self.max_in),
            ("minOut", self.min_out),
            ("maxOut", self.max_out),
        ] {
            match v {
                Some(v) => {
                    let _ = write!(id, " {name}={v}");
                }
                None => {
                    let _ = write!(id, " {name}=-");
                }
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn as_range(d: OpData) -> RangeOpData {
        match d {
            OpData::Range(r) => r,
            other => panic!("expected range, got {:?}", other.op_type()),
        }
    }

    #[test]
    fn validation() {
        assert!(RangeOpData::new(Some(0.0), None, None, None).validate().is_err());
        assert!(RangeOpData::new(Some(1.0), Some(0.0), Some(0.0), Some(1.0)).validate().is_err());
        assert!(RangeOpData::new(Some(0.0), Some(1.0), Some(1.0), Some(0.0)).validate().is_err());
        assert!(RangeOpData::new(Some(0.5), Some(0.5), Some(0.0), Some(1.0)).validate().is_err());
        assert!(RangeOpData::unit().validate().is_ok());
        assert!(RangeOpData::no_op().validate().is_ok());
    }

    #[test]
    fn one_sided_shift() {
        let r = RangeOpData::new(Some(0.1), None, Some(0.3), None);
        assert_abs_diff_eq!(r.apply(0.5), 0.7, epsilon = 1e-12);
        assert_eq!(r.apply(-5.0), 0.3);
        assert!(!r.is_identity());
    }

    #[test]
    fn identity_and_no_op() {
        assert!(RangeOpData::no_op().is_no_op());
        assert!(RangeOpData::unit().is_identity());
        assert!(!RangeOpData::unit().is_no_op());
        assert!(RangeOpData::unit().is_unit_passthrough());
        assert!(RangeOpData::clamp(Some(-1.0), None).is_unit_passthrough());
        assert!(!RangeOpData::clamp(Some(0.2), Some(1.0)).is_unit_passthrough());
    }

    #[test]
    fn compose_clamps_intersect() {
        let a = RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0));
        let b = RangeOpData::clamp(Some(0.5), Some(1.5));
        let c = as_range(a.compose(&b).unwrap());
        for x in [-1.0, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 2.0] {
            assert_abs_diff_eq!(c.apply(x), b.apply(a.apply(x)), epsilon = 1e-12);
        }
    }

    #[test]
    fn compose_one_sided() {
        let a = RangeOpData::clamp(Some(0.0), None);
        let b = RangeOpData::new(Some(0.0), None, Some(0.25), None);
        let c = as_range(a.compose(&b).unwrap());
        for x in [-1.0, 0.0, 0.5, 3.0] {
            assert_abs_diff_eq!(c.apply(x), b.apply(a.apply(x)), epsilon = 1e-12);
        }
    }

    #[test]
    fn compose_disjoint_is_rejected() {
        let a = RangeOpData::clamp(Some(0.0), Some(0.2));
        let b = RangeOpData::clamp(Some(0.5), Some(1.0));
        assert!(a.compose(&b).is_none());
    }

    #[test]
    fn inverse_swaps() {
        let a = RangeOpData::new(Some(0.0), Some(1.0), Some(0.0), Some(2.0));
        assert!(a.is_inverse(&a.inverse()));
        assert_eq!(a.inverse().apply(1.5), 0.75);
    }
}

//! ASC color decision list: slope, offset, power and saturation.
//!
//! Forward evaluation:
//!
//! ```text
//! v = in · slope + offset
//! v = v ≥ 0 ? pow(v, power) : v        (no-clamp styles)
//! v = pow(clamp(v, 0, 1), power)       (v1.2 styles)
//! out = luma + sat · (v − luma)        (Rec.709 luma)
//! ```
//!
//! The v1.2 styles clamp the result to `[0, 1]` again; reverse styles run
//! the steps backwards with reciprocal parameters.

use super::{FormatMetadata, MatrixOpData, OpData, RangeOpData, TransformDirection, push_values};
use crate::error::{OpError, OpResult};

/// Clamping behavior and direction of a CDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CdlStyle {
    /// ASC v1.2 forward, clamping to `[0, 1]`.
    #[default]
    V1_2Fwd,
    /// ASC v1.2 reverse.
    V1_2Rev,
    /// Forward without clamping; negatives skip the power.
    NoClampFwd,
    /// Reverse without clamping.
    NoClampRev,
}

impl CdlStyle {
    /// Same clamping, opposite direction.
    pub const fn inverse(self) -> Self {
        match self {
            Self::V1_2Fwd => Self::V1_2Rev,
            Self::V1_2Rev => Self::V1_2Fwd,
            Self::NoClampFwd => Self::NoClampRev,
            Self::NoClampRev => Self::NoClampFwd,
        }
    }

    /// Whether this is a forward style.
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::V1_2Fwd | Self::NoClampFwd)
    }

    /// Whether this style clamps to `[0, 1]`.
    pub const fn is_clamping(self) -> bool {
        matches!(self, Self::V1_2Fwd | Self::V1_2Rev)
    }

    /// Style name used in cache ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::V1_2Fwd => "v1.2_Fwd",
            Self::V1_2Rev => "v1.2_Rev",
            Self::NoClampFwd => "noClampFwd",
            Self::NoClampRev => "noClampRev",
        }
    }
}

/// Color decision list parameters.
#[derive(Debug, Clone)]
pub struct CdlOpData {
    /// Clamping and direction.
    pub style: CdlStyle,
    /// RGB slope.
    pub slope: [f64; 3],
    /// RGB offset.
    pub offset: [f64; 3],
    /// RGB power.
    pub power: [f64; 3],
    /// Saturation around Rec.709 luma.
    pub saturation: f64,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl Default for CdlOpData {
    fn default() -> Self {
        Self::new(CdlStyle::V1_2Fwd, [1.0; 3], [0.0; 3], [1.0; 3], 1.0)
    }
}

impl CdlOpData {
    /// CDL with explicit parameters.
    pub fn new(
        style: CdlStyle,
        slope: [f64; 3],
        offset: [f64; 3],
        power: [f64; 3],
        saturation: f64,
    ) -> Self {
        Self {
            style,
            slope,
            offset,
            power,
            saturation,
            metadata: FormatMetadata::default(),
        }
    }

    /// Direction implied by the style.
    pub fn direction(&self) -> TransformDirection {
        if self.style.is_forward() {
            TransformDirection::Forward
        } else {
            TransformDirection::Inverse
        }
    }

    /// Forward styles accept zero slope, power and saturation; reverse
    /// styles divide by them.
    pub fn validate(&self) -> OpResult<()> {
        let all = self
            .slope
            .iter()
            .chain(&self.offset)
            .chain(&self.power)
            .chain(std::iter::once(&self.saturation));
        if all.into_iter().any(|v| !v.is_finite()) {
            return Err(OpError::invalid("CDL parameters must be finite"));
        }
        let strict = !self.style.is_forward();
        let bad = |v: f64| if strict { v <= 0.0 } else { v < 0.0 };
        if self.slope.iter().any(|&v| bad(v)) {
            return Err(OpError::invalid(format!("CDL slope out of range: {:?}", self.slope)));
        }
        if self.power.iter().any(|&v| bad(v)) {
            return Err(OpError::invalid(format!("CDL power out of range: {:?}", self.power)));
        }
        if bad(self.saturation) {
            return Err(OpError::invalid(format!(
                "CDL saturation out of range: {}",
                self.saturation
            )));
        }
        Ok(())
    }

    /// Unit slope, power and saturation with zero offset.
    pub fn is_identity(&self) -> bool {
        self.slope == [1.0; 3] && self.offset == [0.0; 3] && self.power == [1.0; 3] && self.saturation == 1.0
    }

    /// Identity that does not clamp.
    pub fn is_no_op(&self) -> bool {
        self.is_identity() && !self.style.is_clamping()
    }

    /// Saturation mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.saturation != 1.0
    }

    /// Unit clamp for v1.2 styles, identity matrix otherwise.
    pub fn identity_replacement(&self) -> OpData {
        if self.style.is_clamping() {
            RangeOpData::unit().into()
        } else {
            MatrixOpData::identity().into()
        }
    }

    /// Same parameters, opposite style.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.style = self.style.inverse();
        inv
    }

    /// Opposite styles over equal parameters.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.style.inverse() == other.style
            && self.slope == other.slope
            && self.offset == other.offset
            && self.power == other.power
            && self.saturation == other.saturation
    }

    /// Matrices and clamps equivalent to a CDL with unit power.
    ///
    /// Returns an empty list when the power is not 1 or the CDL is an
    /// identity.
    pub fn simpler_replacement(&self) -> Vec<OpData> {
        if self.power != [1.0; 3] || self.is_identity() {
            return Vec::new();
        }
        let [sr, sg, sb] = self.slope;
        let [or, og, ob] = self.offset;
        let slope_offset = MatrixOpData::scale_offset([sr, sg, sb, 1.0], [or, og, ob, 0.0]);
        let saturation = MatrixOpData::saturation(self.saturation);
        let clamp = || OpData::from(RangeOpData::unit());

        let mut ops: Vec<OpData> = Vec::with_capacity(5);
        if self.style.is_forward() {
            ops.push(slope_offset.into());
            if self.style.is_clamping() {
                ops.push(clamp());
            }
            ops.push(saturation.into());
            if self.style.is_clamping() {
                ops.push(clamp());
            }
        } else {
            let inverse = TransformDirection::Inverse;
            if self.style.is_clamping() {
                ops.push(clamp());
            }
            ops.push(saturation.with_direction(inverse).into());
            if self.style.is_clamping() {
                ops.push(clamp());
            }
            ops.push(slope_offset.with_direction(inverse).into());
            if self.style.is_clamping() {
                ops.push(clamp());
            }
        }
        for op in &mut ops {
            *op.metadata_mut() = self.metadata.clone();
        }
        ops
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = format!("CDL {} ", self.style.name());
        let values: Vec<f64> = self
            .slope
            .iter()
            .chain(&self.offset)
            .chain(&self.power)
            .copied()
            .chain(std::iter::once(self.saturation))
            .collect();
        push_values(&mut id, &values);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opdata::OpType;

    fn scenario_cdl(style: CdlStyle) -> CdlOpData {
        CdlOpData::new(style, [1.35, 1.1, 0.071], [0.05, -0.23, 0.11], [1.0; 3], 1.0)
    }

    #[test]
    fn validation_depends_on_direction() {
        let zero_slope = CdlOpData::new(CdlStyle::V1_2Fwd, [0.0, 1.0, 1.0], [0.0; 3], [1.0; 3], 1.0);
        assert!(zero_slope.validate().is_ok());
        assert!(zero_slope.inverse().validate().is_err());
        let negative_power = CdlOpData::new(CdlStyle::NoClampFwd, [1.0; 3], [0.0; 3], [-1.0, 1.0, 1.0], 1.0);
        assert!(negative_power.validate().is_err());
    }

    #[test]
    fn identity_and_no_op() {
        let id = CdlOpData::default();
        assert!(id.is_identity());
        assert!(!id.is_no_op());
        let nc = CdlOpData::new(CdlStyle::NoClampFwd, [1.0; 3], [0.0; 3], [1.0; 3], 1.0);
        assert!(nc.is_no_op());
        assert!(nc.identity_replacement().is_no_op());
    }

    #[test]
    fn no_clamp_forward_becomes_two_matrices() {
        let ops = scenario_cdl(CdlStyle::NoClampFwd).simpler_replacement();
        let types: Vec<OpType> = ops.iter().map(OpData::op_type).collect();
        assert_eq!(types, vec![OpType::Matrix, OpType::Matrix]);
    }

    #[test]
    fn clamping_reverse_is_wrapped_in_ranges() {
        let ops = scenario_cdl(CdlStyle::V1_2Rev).simpler_replacement();
        let types: Vec<OpType> = ops.iter().map(OpData::op_type).collect();
        assert_eq!(
            types,
            vec![OpType::Range, OpType::Matrix, OpType::Range, OpType::Matrix, OpType::Range]
        );
        assert!(!ops[3].direction().is_forward());
    }

    #[test]
    fn power_blocks_replacement() {
        let mut cdl = scenario_cdl(CdlStyle::NoClampFwd);
        cdl.power = [1.2, 1.0, 1.0];
        assert!(cdl.simpler_replacement().is_empty());
    }

    #[test]
    fn crosstalk_follows_saturation() {
        let mut cdl = scenario_cdl(CdlStyle::V1_2Fwd);
        assert!(!cdl.has_channel_crosstalk());
        cdl.saturation = 0.8;
        assert!(cdl.has_channel_crosstalk());
    }
}

//! Operator parameter records.
//!
//! [`OpData`] is a closed sum type over every operator variant. Each
//! variant lives in its own module and exposes the same set of queries:
//!
//! | Query | Meaning |
//! |-------|---------|
//! | `validate` | parameters are usable |
//! | `is_no_op` | output equals input for every value |
//! | `is_identity` | passthrough on the intended domain, clamping allowed |
//! | `has_channel_crosstalk` | an output channel reads another input channel |
//! | `identity_replacement` | Matrix or Range carrying the identity's clamping |
//! | `inverse` / `is_inverse` | direction flip and pair detection |
//! | `cache_id` | deterministic parameter digest |
//!
//! Metadata never takes part in equality or cache ids.

mod allocation;
mod cdl;
mod exponent;
mod exposure_contrast;
mod fixed_function;
mod gamma;
mod log;
mod lut1d;
mod lut3d;
mod matrix;
mod noop;
mod range;

pub use allocation::Allocation;
pub use cdl::{CdlOpData, CdlStyle};
pub use exponent::{ExponentOpData, NegativeStyle};
pub use exposure_contrast::{
    ExposureContrastOpData, ExposureContrastStyle, MIN_CONTRAST, MIN_PIVOT, VIDEO_OETF_POWER,
};
pub use fixed_function::{ACES_DARK_TO_DIM_GAMMA, FixedFunctionOpData, FixedFunctionStyle};
pub use gamma::{GammaOpData, GammaParams, GammaStyle};
pub use log::{CameraSegment, LogChannel, LogOpData, LogParams};
pub use lut1d::Lut1DOpData;
pub use lut3d::Lut3DOpData;
pub use matrix::{MATRIX_IDENTITY_TOLERANCE, MatrixOpData};
pub use noop::{NoOpData, NoOpKind};
pub use range::RangeOpData;

pub(crate) use gamma::MoncurveCoefs;

use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::OpResult;
use sha2::{Digest, Sha256};
use std::fmt::Write;

// ============================================================================
// Direction and metadata
// ============================================================================

/// Direction an operator is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransformDirection {
    /// Evaluate as authored.
    #[default]
    Forward,
    /// Evaluate the inverse.
    Inverse,
}

impl TransformDirection {
    /// The opposite direction.
    #[inline]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }

    /// Whether this is [`TransformDirection::Forward`].
    #[inline]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }

    /// Direction of applying `other` inside `self`.
    #[inline]
    pub const fn combine(self, other: Self) -> Self {
        if self.is_forward() { other } else { other.inverse() }
    }

    /// Short lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Inverse => "inverse",
        }
    }
}

/// Free-form descriptive metadata carried by every operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatMetadata {
    /// Identifier from the source document.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description lines.
    pub descriptions: Vec<String>,
}

impl FormatMetadata {
    /// Metadata with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a description line.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.descriptions.push(text.into());
        self
    }

    /// Whether nothing is set.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.name.is_empty() && self.descriptions.is_empty()
    }
}

// ============================================================================
// Op type tags
// ============================================================================

/// Tag of an [`OpData`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpType {
    /// 4x4 matrix with offset.
    Matrix,
    /// Scale, offset and clamp.
    Range,
    /// Per-channel lookup table.
    Lut1D,
    /// Cube lookup table.
    Lut3D,
    /// Basic and moncurve gamma.
    Gamma,
    /// Per-channel power.
    Exponent,
    /// Logarithm with affine parameters.
    Log,
    /// ASC color decision list.
    Cdl,
    /// Exposure and contrast around a pivot.
    ExposureContrast,
    /// Analytic fixed function.
    FixedFunction,
    /// Bookkeeping marker.
    NoOp,
}

impl OpType {
    /// Every tag.
    pub const ALL: [OpType; 11] = [
        Self::Matrix,
        Self::Range,
        Self::Lut1D,
        Self::Lut3D,
        Self::Gamma,
        Self::Exponent,
        Self::Log,
        Self::Cdl,
        Self::ExposureContrast,
        Self::FixedFunction,
        Self::NoOp,
    ];

    /// Type name used in cache ids and diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Matrix => "Matrix",
            Self::Range => "Range",
            Self::Lut1D => "Lut1D",
            Self::Lut3D => "Lut3D",
            Self::Gamma => "Gamma",
            Self::Exponent => "Exponent",
            Self::Log => "Log",
            Self::Cdl => "CDL",
            Self::ExposureContrast => "ExposureContrast",
            Self::FixedFunction => "FixedFunction",
            Self::NoOp => "NoOp",
        }
    }
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// OpData
// ============================================================================

/// Parameters of a single color operator.
#[derive(Debug, Clone)]
pub enum OpData {
    /// See [`MatrixOpData`].
    Matrix(MatrixOpData),
    /// See [`RangeOpData`].
    Range(RangeOpData),
    /// See [`Lut1DOpData`].
    Lut1D(Lut1DOpData),
    /// See [`Lut3DOpData`].
    Lut3D(Lut3DOpData),
    /// See [`GammaOpData`].
    Gamma(GammaOpData),
    /// See [`ExponentOpData`].
    Exponent(ExponentOpData),
    /// See [`LogOpData`].
    Log(LogOpData),
    /// See [`CdlOpData`].
    Cdl(CdlOpData),
    /// See [`ExposureContrastOpData`].
    ExposureContrast(ExposureContrastOpData),
    /// See [`FixedFunctionOpData`].
    FixedFunction(FixedFunctionOpData),
    /// See [`NoOpData`].
    NoOp(NoOpData),
}

macro_rules! dispatch {
    ($value:expr, $d:ident => $body:expr) => {
        match $value {
            OpData::Matrix($d) => $body,
            OpData::Range($d) => $body,
            OpData::Lut1D($d) => $body,
            OpData::Lut3D($d) => $body,
            OpData::Gamma($d) => $body,
            OpData::Exponent($d) => $body,
            OpData::Log($d) => $body,
            OpData::Cdl($d) => $body,
            OpData::ExposureContrast($d) => $body,
            OpData::FixedFunction($d) => $body,
            OpData::NoOp($d) => $body,
        }
    };
}

macro_rules! impl_from_variant {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for OpData {
                fn from(d: $ty) -> Self {
                    OpData::$variant(d)
                }
            }
        )*
    };
}

impl_from_variant!(
    MatrixOpData => Matrix,
    RangeOpData => Range,
    Lut1DOpData => Lut1D,
    Lut3DOpData => Lut3D,
    GammaOpData => Gamma,
    ExponentOpData => Exponent,
    LogOpData => Log,
    CdlOpData => Cdl,
    ExposureContrastOpData => ExposureContrast,
    FixedFunctionOpData => FixedFunction,
    NoOpData => NoOp,
);

impl OpData {
    /// Variant tag.
    pub fn op_type(&self) -> OpType {
        match self {
            Self::Matrix(_) => OpType::Matrix,
            Self::Range(_) => OpType::Range,
            Self::Lut1D(_) => OpType::Lut1D,
            Self::Lut3D(_) => OpType::Lut3D,
            Self::Gamma(_) => OpType::Gamma,
            Self::Exponent(_) => OpType::Exponent,
            Self::Log(_) => OpType::Log,
            Self::Cdl(_) => OpType::Cdl,
            Self::ExposureContrast(_) => OpType::ExposureContrast,
            Self::FixedFunction(_) => OpType::FixedFunction,
            Self::NoOp(_) => OpType::NoOp,
        }
    }

    /// Descriptive metadata.
    pub fn metadata(&self) -> &FormatMetadata {
        dispatch!(self, d => &d.metadata)
    }

    /// Mutable descriptive metadata.
    pub fn metadata_mut(&mut self) -> &mut FormatMetadata {
        dispatch!(self, d => &mut d.metadata)
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        dispatch!(self, d => d.direction())
    }

    /// Checks the parameters.
    pub fn validate(&self) -> OpResult<()> {
        dispatch!(self, d => d.validate())
    }

    /// Whether the operator leaves every value unchanged.
    pub fn is_no_op(&self) -> bool {
        dispatch!(self, d => d.is_no_op())
    }

    /// Whether the operator is a passthrough on its intended domain.
    pub fn is_identity(&self) -> bool {
        dispatch!(self, d => d.is_identity())
    }

    /// Whether an output channel depends on another input channel.
    pub fn has_channel_crosstalk(&self) -> bool {
        dispatch!(self, d => d.has_channel_crosstalk())
    }

    /// Whether alpha can change.
    pub fn affects_alpha(&self) -> bool {
        match self {
            Self::Matrix(d) => {
                let m = &d.matrix.m;
                m[3] != [0.0, 0.0, 0.0, 1.0] || d.offset[3] != 0.0
            }
            Self::Exponent(d) => d.exponent[3] != 1.0,
            Self::Gamma(d) => d.params[3] != GammaParams::IDENTITY,
            _ => false,
        }
    }

    /// Whether the legacy GPU path can express the operator as text.
    pub fn is_legacy_compatible(&self) -> bool {
        match self {
            Self::Lut1D(_) | Self::Lut3D(_) | Self::FixedFunction(_) => false,
            Self::ExposureContrast(d) => !d.is_dynamic(),
            _ => true,
        }
    }

    /// Allocation carried by a marker, if any.
    pub fn allocation(&self) -> Option<&Allocation> {
        match self {
            Self::NoOp(d) => d.allocation_hint(),
            _ => None,
        }
    }

    /// Deterministic digest of the parameters.
    pub fn cache_id(&self) -> String {
        dispatch!(self, d => d.cache_id())
    }

    /// Matrix or Range with the clamping of an identity instance of this
    /// operator.
    pub fn identity_replacement(&self) -> OpData {
        dispatch!(self, d => d.identity_replacement())
    }

    /// Operator evaluating the inverse.
    pub fn inverse(&self) -> OpData {
        dispatch!(self, d => OpData::from(d.inverse()))
    }

    /// Whether `other` undoes `self` when applied right after it.
    pub fn is_inverse(&self, other: &OpData) -> bool {
        match (self, other) {
            (Self::Matrix(a), Self::Matrix(b)) => a.is_inverse(b),
            (Self::Range(a), Self::Range(b)) => a.is_inverse(b),
            (Self::Lut1D(a), Self::Lut1D(b)) => a.is_inverse(b),
            (Self::Lut3D(a), Self::Lut3D(b)) => a.is_inverse(b),
            (Self::Gamma(a), Self::Gamma(b)) => a.is_inverse(b),
            (Self::Exponent(a), Self::Exponent(b)) => a.is_inverse(b),
            (Self::Log(a), Self::Log(b)) => a.is_inverse(b),
            (Self::Cdl(a), Self::Cdl(b)) => a.is_inverse(b),
            (Self::ExposureContrast(a), Self::ExposureContrast(b)) => a.is_inverse(b),
            (Self::FixedFunction(a), Self::FixedFunction(b)) => a.is_inverse(b),
            _ => false,
        }
    }

    /// Single-operator equivalent of `self` followed by `next`.
    ///
    /// Returns `None` when the pair has no combined form. The result may be
    /// empty (the pair is a no-op) or hold several operators.
    pub fn compose(&self, next: &OpData) -> OpResult<Option<Vec<OpData>>> {
        let composed = match (self, next) {
            (Self::Matrix(a), Self::Matrix(b)) => {
                let m = a.compose(b)?;
                if m.is_no_op() {
                    Some(Vec::new())
                } else {
                    Some(vec![m.into()])
                }
            }
            (Self::Range(a), Self::Range(b)) => a.compose(b).map(|d| vec![d]),
            (Self::Lut1D(a), Self::Lut1D(b)) => a.compose(b).map(|d| vec![d.into()]),
            (Self::Lut3D(a), Self::Lut3D(b)) => a.compose(b).map(|d| vec![d.into()]),
            (Self::Gamma(a), Self::Gamma(b)) => a.compose(b).map(|d| vec![d.into()]),
            (Self::Exponent(a), Self::Exponent(b)) => a.compose(b).map(|d| vec![d.into()]),
            _ => None,
        };
        Ok(composed)
    }

    /// Cheaper equivalent sequence, or empty when none exists.
    pub fn simpler_replacement(&self) -> Vec<OpData> {
        match self {
            Self::Cdl(d) => d.simpler_replacement(),
            _ => Vec::new(),
        }
    }

    /// Per-operator preparation run once by pipeline finalization.
    pub fn finalize(&mut self) -> OpResult<()> {
        match self {
            Self::Matrix(d) => d.finalize(),
            Self::Lut1D(d) => {
                d.finalize();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Dynamic property handles held by this operator.
    pub fn dynamic_properties(&self) -> Vec<&DynamicProperty> {
        match self {
            Self::ExposureContrast(d) => d.properties().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether any held property is dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic_properties().iter().any(|p| p.is_dynamic())
    }

    /// Handle of kind `kind`, if held and dynamic.
    pub fn dynamic_property(&self, kind: DynamicPropertyType) -> Option<&DynamicProperty> {
        self.dynamic_properties()
            .into_iter()
            .find(|p| p.kind() == kind && p.is_dynamic())
    }

    /// Replaces the held handle of the same kind with `prop`.
    ///
    /// Returns false when no dynamic handle of that kind is held.
    pub fn replace_dynamic_property(&mut self, prop: &DynamicProperty) -> bool {
        match self {
            Self::ExposureContrast(d) => d.replace_property(prop),
            _ => false,
        }
    }

    /// Detaches every dynamic handle, keeping the current values.
    pub fn remove_dynamic_properties(&mut self) {
        if let Self::ExposureContrast(d) = self {
            d.freeze();
        }
    }
}

// ============================================================================
// Cache id helpers
// ============================================================================

/// Appends values as a space-separated list.
pub(crate) fn push_values(out: &mut String, values: &[f64]) {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{v}");
    }
}

/// Hex digest of sample tables.
pub(crate) fn digest_samples<'a>(tables: impl IntoIterator<Item = &'a [f32]>) -> String {
    let mut hasher = Sha256::new();
    for table in tables {
        hasher.update((table.len() as u64).to_le_bytes());
        for v in table {
            hasher.update(v.to_le_bytes());
        }
    }
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_combine() {
        use TransformDirection::*;
        assert_eq!(Forward.combine(Inverse), Inverse);
        assert_eq!(Inverse.combine(Inverse), Forward);
        assert_eq!(Forward.inverse(), Inverse);
    }

    #[test]
    fn metadata_is_ignored_by_cache_id() {
        let mut a: OpData = MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).into();
        let b = a.clone();
        *a.metadata_mut() = FormatMetadata::new("m1").with_name("scale");
        assert_eq!(a.cache_id(), b.cache_id());
    }

    #[test]
    fn different_types_are_never_inverses() {
        let m: OpData = MatrixOpData::identity().into();
        let r: OpData = RangeOpData::no_op().into();
        assert!(!m.is_inverse(&r));
        assert!(!r.is_inverse(&m));
    }

    #[test]
    fn sample_digest_depends_on_values() {
        let a = [0.0f32, 0.5, 1.0];
        let b = [0.0f32, 0.5, 0.9];
        assert_ne!(digest_samples([&a[..]]), digest_samples([&b[..]]));
        assert_eq!(digest_samples([&a[..]]).len(), 32);
    }
}

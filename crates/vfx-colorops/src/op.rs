//! Runtime operator wrapper.
//!
//! An [`Op`] holds its [`OpData`] behind an [`Arc`]. Cloning an op or a
//! pipeline shares the parameters; the first mutation through
//! [`Op::data_mut`] copies them if another op still refers to them.

use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::OpResult;
use crate::opdata::{Allocation, OpData, OpType, TransformDirection};
use std::fmt;
use std::sync::Arc;

/// Operator in a pipeline.
///
/// ```rust
/// use vfx_colorops::Op;
/// use vfx_colorops::opdata::MatrixOpData;
///
/// let a = Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
/// let mut b = a.clone();
/// assert!(a.shares_data(&b));
///
/// b.data_mut().metadata_mut().name = "doubled".into();
/// assert!(!a.shares_data(&b));
/// ```
#[derive(Clone)]
pub struct Op {
    data: Arc<OpData>,
}

impl Op {
    /// Wraps operator parameters.
    pub fn new(data: impl Into<OpData>) -> Self {
        Self {
            data: Arc::new(data.into()),
        }
    }

    /// Parameters.
    #[inline]
    pub fn data(&self) -> &OpData {
        &self.data
    }

    /// Mutable parameters, copied first if shared.
    pub fn data_mut(&mut self) -> &mut OpData {
        Arc::make_mut(&mut self.data)
    }

    /// Whether both ops refer to the same parameter record.
    pub fn shares_data(&self, other: &Op) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Variant tag.
    #[inline]
    pub fn op_type(&self) -> OpType {
        self.data.op_type()
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        self.data.direction()
    }

    /// Checks the parameters.
    pub fn validate(&self) -> OpResult<()> {
        self.data.validate()
    }

    /// Whether the op leaves every value unchanged.
    pub fn is_no_op(&self) -> bool {
        self.data.is_no_op()
    }

    /// Whether the op is a passthrough on its intended domain.
    pub fn is_identity(&self) -> bool {
        self.data.is_identity()
    }

    /// Whether an output channel depends on another input channel.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.data.has_channel_crosstalk()
    }

    /// Whether alpha can change.
    pub fn affects_alpha(&self) -> bool {
        self.data.affects_alpha()
    }

    /// Whether any held property is dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.data.is_dynamic()
    }

    /// Whether a dynamic property of `kind` is held.
    pub fn has_dynamic_property(&self, kind: DynamicPropertyType) -> bool {
        self.data.dynamic_property(kind).is_some()
    }

    /// Dynamic handle of `kind`.
    pub fn dynamic_property(&self, kind: DynamicPropertyType) -> Option<&DynamicProperty> {
        self.data.dynamic_property(kind)
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        self.data.cache_id()
    }

    /// Whether both ops have the same variant.
    pub fn is_same_type(&self, other: &Op) -> bool {
        self.op_type() == other.op_type()
    }

    /// Whether `other` undoes `self` when applied right after it.
    ///
    /// Dynamic ops never pair up since their values may change later.
    pub fn is_inverse(&self, other: &Op) -> bool {
        self.is_same_type(other)
            && !self.is_dynamic()
            && !other.is_dynamic()
            && self.data.is_inverse(&other.data)
    }

    /// Whether [`combine_with`](Self::combine_with) may find a combined
    /// form. A `true` here does not guarantee one exists.
    pub fn can_combine_with(&self, other: &Op) -> bool {
        self.is_same_type(other)
            && !self.is_dynamic()
            && !other.is_dynamic()
            && matches!(
                self.op_type(),
                OpType::Matrix
                    | OpType::Range
                    | OpType::Lut1D
                    | OpType::Lut3D
                    | OpType::Gamma
                    | OpType::Exponent
            )
    }

    /// Ops equivalent to `self` followed by `other`.
    ///
    /// `None` when the pair has no combined form; an empty list when the
    /// pair is a no-op.
    pub fn combine_with(&self, other: &Op) -> OpResult<Option<Vec<Op>>> {
        if !self.can_combine_with(other) {
            return Ok(None);
        }
        let composed = self.data.compose(&other.data)?;
        Ok(composed.map(|ops| ops.into_iter().map(Op::new).collect()))
    }

    /// Matrix or Range carrying the clamping of an identity instance.
    pub fn identity_replacement(&self) -> Op {
        Op::new(self.data.identity_replacement())
    }

    /// Cheaper equivalent sequence, empty when none exists.
    pub fn simpler_replacement(&self) -> Vec<Op> {
        self.data.simpler_replacement().into_iter().map(Op::new).collect()
    }

    /// Op evaluating the inverse. Markers are cloned.
    pub fn inverse(&self) -> Op {
        match self.data() {
            OpData::NoOp(_) => self.clone(),
            d => Op::new(d.inverse()),
        }
    }

    /// Whether the legacy GPU path can express the op as text.
    pub fn is_legacy_compatible(&self) -> bool {
        self.data.is_legacy_compatible()
    }

    /// Allocation carried by a marker, if any.
    pub fn allocation(&self) -> Option<&Allocation> {
        self.data.allocation()
    }

    /// Whether the op is a marker carrying an allocation.
    pub fn defines_allocation(&self) -> bool {
        self.allocation().is_some()
    }

    /// Per-op preparation run by pipeline finalization.
    pub fn finalize(&mut self) -> OpResult<()> {
        // only touch the record when there is work, keeping shared data shared
        let needs_work = match self.data() {
            OpData::Matrix(m) => !m.direction.is_forward(),
            OpData::Lut1D(l) => !l.direction.is_forward(),
            _ => false,
        };
        if needs_work {
            self.data_mut().finalize()?;
        }
        Ok(())
    }

    /// Detaches dynamic handles, keeping their values.
    pub fn freeze_dynamic_properties(&mut self) {
        if self.is_dynamic() {
            self.data_mut().remove_dynamic_properties();
        }
    }
}

impl From<OpData> for Op {
    fn from(data: OpData) -> Self {
        Op::new(data)
    }
}

macro_rules! impl_op_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Op {
                fn from(data: $ty) -> Self {
                    Op::new(data)
                }
            }
        )*
    };
}

impl_op_from!(
    crate::opdata::MatrixOpData,
    crate::opdata::RangeOpData,
    crate::opdata::Lut1DOpData,
    crate::opdata::Lut3DOpData,
    crate::opdata::GammaOpData,
    crate::opdata::ExponentOpData,
    crate::opdata::LogOpData,
    crate::opdata::CdlOpData,
    crate::opdata::ExposureContrastOpData,
    crate::opdata::FixedFunctionOpData,
    crate::opdata::NoOpData,
);

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.data, f)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.op_type(), self.direction().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opdata::{
        ExposureContrastOpData, GammaOpData, GammaStyle, Lut1DOpData, MatrixOpData, NoOpData,
        RangeOpData,
    };
    use vfx_lut::Lut1D;

    #[test]
    fn copy_on_write() {
        let a = Op::new(RangeOpData::unit());
        let mut b = a.clone();
        assert!(a.shares_data(&b));
        if let OpData::Range(r) = b.data_mut() {
            r.max_out = Some(2.0);
            r.max_in = Some(2.0);
        }
        assert!(!a.shares_data(&b));
        assert_ne!(a.cache_id(), b.cache_id());
    }

    #[test]
    fn finalize_keeps_forward_ops_shared() {
        let a = Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
        let mut b = a.clone();
        b.finalize().unwrap();
        assert!(a.shares_data(&b));

        let inv = Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).with_direction(TransformDirection::Inverse));
        let mut c = inv.clone();
        c.finalize().unwrap();
        assert!(c.direction().is_forward());
        assert!(!inv.shares_data(&c));
    }

    #[test]
    fn combine_gates() {
        let g = Op::new(GammaOpData::basic(GammaStyle::BasicFwd, [2.2; 3]));
        let m = Op::new(MatrixOpData::identity());
        assert!(!g.can_combine_with(&m));
        assert!(g.can_combine_with(&g.inverse()));
        let combined = g.combine_with(&g.inverse()).unwrap().unwrap();
        assert_eq!(combined.len(), 1);
        assert!(combined[0].is_identity());
    }

    #[test]
    fn dynamic_ops_do_not_pair() {
        let mut ec = ExposureContrastOpData::default().with_values(1.0, 1.0, 1.0);
        let inv = Op::new(ec.inverse());
        ec.make_dynamic(crate::dynamic::DynamicPropertyType::Exposure);
        let dynamic = Op::new(ec);
        assert!(!dynamic.is_inverse(&inv));
        assert!(dynamic.has_dynamic_property(crate::dynamic::DynamicPropertyType::Exposure));
    }

    #[test]
    fn legacy_compatibility() {
        assert!(Op::new(MatrixOpData::identity()).is_legacy_compatible());
        assert!(!Op::new(Lut1DOpData::new(Lut1D::identity(8))).is_legacy_compatible());
        let marker = Op::new(NoOpData::file_reference("a.clf"));
        assert!(marker.is_legacy_compatible());
        assert!(marker.inverse().shares_data(&marker));
    }

    #[test]
    fn alpha_detection() {
        assert!(!Op::new(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0])).affects_alpha());
        assert!(Op::new(MatrixOpData::scale([1.0, 1.0, 1.0, 0.5])).affects_alpha());
        assert!(!Op::new(GammaOpData::basic(GammaStyle::BasicFwd, [2.2; 3])).affects_alpha());
    }
}

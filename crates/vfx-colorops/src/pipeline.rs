//! Ordered operator sequences.

use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::OpResult;
use crate::flags::OptimizationFlags;
use crate::op::Op;
use crate::opdata::OpType;
use crate::optimizer::{self, OptimizationReport};
use sha2::{Digest, Sha256};
use std::ops::RangeBounds;
use vfx_core::BitDepth;

/// Cache id of an empty pipeline.
pub const NO_OP_CACHE_ID: &str = "<NOOP>";

/// Ordered sequence of operators.
///
/// Cloning copies the op handles, not the parameters they refer to.
///
/// ```rust
/// use vfx_colorops::{OpPipeline, OptimizationFlags};
/// use vfx_colorops::opdata::MatrixOpData;
///
/// let mut pipeline = OpPipeline::new();
/// pipeline.append(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
/// pipeline.append(MatrixOpData::scale([0.5, 0.5, 0.5, 1.0]));
/// pipeline.finalize(OptimizationFlags::COMP_MATRIX).unwrap();
/// assert!(pipeline.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpPipeline {
    ops: Vec<Op>,
}

impl OpPipeline {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline over existing ops.
    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        Self {
            ops: ops.into_iter().collect(),
        }
    }

    /// Number of ops.
    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether there are no ops.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over the ops in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Op> {
        self.ops.iter()
    }

    /// The ops in order.
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub(crate) fn ops_mut(&mut self) -> &mut Vec<Op> {
        &mut self.ops
    }

    /// Op at `index`.
    pub fn get(&self, index: usize) -> Option<&Op> {
        self.ops.get(index)
    }

    /// Appends an op.
    pub fn append(&mut self, op: impl Into<Op>) {
        self.ops.push(op.into());
    }

    /// Appends every op of `other`, sharing their parameters.
    pub fn extend_from(&mut self, other: &OpPipeline) {
        self.ops.extend(other.ops.iter().cloned());
    }

    /// Inserts ops before `pos`; positions past the end append.
    pub fn insert(&mut self, pos: usize, ops: impl IntoIterator<Item = Op>) {
        let pos = pos.min(self.ops.len());
        self.ops.splice(pos..pos, ops);
    }

    /// Removes the ops in `range`, clamped to the pipeline.
    pub fn erase(&mut self, range: impl RangeBounds<usize>) {
        use std::ops::Bound;
        let len = self.ops.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .clamp(start, len);
        self.ops.drain(start..end);
    }

    /// Removes every op.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Reverses the order and replaces each op by its inverse.
    pub fn invert(&mut self) {
        self.ops = self.ops.iter().rev().map(Op::inverse).collect();
    }

    /// Inverted copy.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.invert();
        inv
    }

    /// Whether every op leaves values unchanged.
    pub fn is_no_op(&self) -> bool {
        self.ops.iter().all(Op::is_no_op)
    }

    /// Whether any op mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.ops.iter().any(Op::has_channel_crosstalk)
    }

    /// Whether any op holds a dynamic property.
    pub fn is_dynamic(&self) -> bool {
        self.ops.iter().any(Op::is_dynamic)
    }

    /// Whether any op holds a dynamic property of `kind`.
    pub fn has_dynamic_property(&self, kind: DynamicPropertyType) -> bool {
        self.ops.iter().any(|op| op.has_dynamic_property(kind))
    }

    /// First dynamic handle of `kind`.
    pub fn dynamic_property(&self, kind: DynamicPropertyType) -> Option<DynamicProperty> {
        self.ops.iter().find_map(|op| op.dynamic_property(kind).cloned())
    }

    /// Makes every op holding a dynamic kind share the handle of the first
    /// op holding it.
    pub fn unify_dynamic_properties(&mut self) {
        let mut published: Vec<DynamicProperty> = Vec::new();
        for op in &mut self.ops {
            if !op.is_dynamic() {
                continue;
            }
            for kind in DynamicPropertyType::ALL {
                let Some(prop) = op.dynamic_property(kind).cloned() else {
                    continue;
                };
                match published.iter().find(|p| p.kind() == kind) {
                    Some(first) if first.ptr_eq(&prop) => {}
                    Some(first) => {
                        op.data_mut().replace_dynamic_property(first);
                    }
                    None => published.push(prop),
                }
            }
        }
    }

    /// Gives the ops fresh dynamic handles holding the current values.
    ///
    /// Ops sharing a handle before the call share the new one afterwards.
    pub fn detach_dynamic_properties(&mut self) {
        let mut mapping: Vec<(DynamicProperty, DynamicProperty)> = Vec::new();
        for op in &mut self.ops {
            if !op.is_dynamic() {
                continue;
            }
            for kind in DynamicPropertyType::ALL {
                let Some(prop) = op.dynamic_property(kind).cloned() else {
                    continue;
                };
                let fresh = match mapping.iter().find(|(old, _)| old.ptr_eq(&prop)) {
                    Some((_, fresh)) => fresh.clone(),
                    None => {
                        let fresh = prop.detached();
                        mapping.push((prop, fresh.clone()));
                        fresh
                    }
                };
                op.data_mut().replace_dynamic_property(&fresh);
            }
        }
    }

    /// Validates every op, failing on the first error.
    pub fn validate(&self) -> OpResult<()> {
        self.ops.iter().try_for_each(Op::validate)
    }

    /// Removes markers, validates, prepares each op and optimizes under
    /// `flags`.
    pub fn finalize(&mut self, flags: OptimizationFlags) -> OpResult<OptimizationReport> {
        self.ops.retain(|op| op.op_type() != OpType::NoOp);
        self.validate()?;
        for op in &mut self.ops {
            op.finalize()?;
        }
        if flags.is_empty() {
            return Ok(OptimizationReport::default());
        }
        optimizer::optimize(&mut self.ops, flags)
    }

    /// Bit-depth aware rewrites; call after [`finalize`](Self::finalize).
    pub fn optimize_for_bitdepth(
        &mut self,
        in_bd: BitDepth,
        out_bd: BitDepth,
        flags: OptimizationFlags,
    ) -> OpResult<()> {
        optimizer::optimize_for_bitdepth(&mut self.ops, in_bd, out_bd, flags)
    }

    /// Stable digest of the op parameters.
    pub fn cache_id(&self) -> String {
        if self.ops.is_empty() {
            return NO_OP_CACHE_ID.to_string();
        }
        let mut hasher = Sha256::new();
        for op in &self.ops {
            hasher.update(op.cache_id().as_bytes());
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a OpPipeline {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl FromIterator<Op> for OpPipeline {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        Self::from_ops(iter)
    }
}

//! Bookkeeping markers with no effect on pixels.

use super::{Allocation, FormatMetadata, MatrixOpData, OpData, TransformDirection};
use crate::error::OpResult;

/// What a marker records.
#[derive(Debug, Clone, PartialEq)]
pub enum NoOpKind {
    /// Range the following segment is allocated over.
    Allocation(Allocation),
    /// Source file a group of operators came from.
    FileReference(String),
    /// Look a group of operators came from.
    LookReference(String),
}

/// Marker operator.
#[derive(Debug, Clone)]
pub struct NoOpData {
    /// Marker payload.
    pub kind: NoOpKind,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl NoOpData {
    /// Allocation marker.
    pub fn allocation(allocation: Allocation) -> Self {
        Self::new(NoOpKind::Allocation(allocation))
    }

    /// File reference marker.
    pub fn file_reference(path: impl Into<String>) -> Self {
        Self::new(NoOpKind::FileReference(path.into()))
    }

    /// Look reference marker.
    pub fn look_reference(look: impl Into<String>) -> Self {
        Self::new(NoOpKind::LookReference(look.into()))
    }

    fn new(kind: NoOpKind) -> Self {
        Self {
            kind,
            metadata: FormatMetadata::default(),
        }
    }

    /// Allocation carried by this marker, if any.
    pub fn allocation_hint(&self) -> Option<&Allocation> {
        match &self.kind {
            NoOpKind::Allocation(a) => Some(a),
            _ => None,
        }
    }

    /// Whether this marker carries an allocation.
    pub fn defines_allocation(&self) -> bool {
        self.allocation_hint().is_some()
    }

    /// Markers have no direction.
    pub fn direction(&self) -> TransformDirection {
        TransformDirection::Forward
    }

    /// Allocation markers check their range; others always pass.
    pub fn validate(&self) -> OpResult<()> {
        match &self.kind {
            NoOpKind::Allocation(a) => a.validate(),
            _ => Ok(()),
        }
    }

    /// Always true.
    pub fn is_identity(&self) -> bool {
        true
    }

    /// Always true.
    pub fn is_no_op(&self) -> bool {
        true
    }

    /// Always false.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// Identity matrix.
    pub fn identity_replacement(&self) -> OpData {
        MatrixOpData::identity().into()
    }

    /// Markers are their own inverse.
    pub fn inverse(&self) -> Self {
        self.clone()
    }

    /// Markers never pair up.
    pub fn is_inverse(&self, _other: &Self) -> bool {
        false
    }

    /// Marker digest.
    pub fn cache_id(&self) -> String {
        match &self.kind {
            NoOpKind::Allocation(a) => format!("NoOp allocation {}", a.cache_id()),
            NoOpKind::FileReference(p) => format!("NoOp file {p}"),
            NoOpKind::LookReference(l) => format!("NoOp look {l}"),
        }
    }
}

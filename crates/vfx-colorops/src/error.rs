//! Error types for operator pipelines.
//!
//! Errors are grouped by what the caller can do about them:
//! - bad operator parameters or impossible requests
//! - operators a target cannot express
//! - unresolved external resources
//! - broken internal invariants (bugs)

use thiserror::Error;

/// Result type for pipeline operations.
pub type OpResult<T> = Result<T, OpError>;

/// Errors raised while building, optimizing or finalizing a pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// Operator parameters failed validation, or a request carries
    /// impossible arguments.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// An operator cannot be expressed for the requested target.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An external resource referenced by a marker could not be resolved.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OpError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<vfx_lut::LutError> for OpError {
    fn from(err: vfx_lut::LutError) -> Self {
        Self::InvalidParameters(err.to_string())
    }
}

impl From<vfx_core::Error> for OpError {
    fn from(err: vfx_core::Error) -> Self {
        Self::InvalidParameters(err.to_string())
    }
}

//! LUT error types.

use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur during LUT operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LutError {
    /// Invalid LUT size.
    #[error("invalid LUT size: {0}")]
    InvalidSize(String),

    /// Channels of a 1D LUT have different lengths.
    #[error("channel length mismatch: red {red}, green {green}, blue {blue}")]
    ChannelMismatch {
        /// Red channel length
        red: usize,
        /// Green channel length
        green: usize,
        /// Blue channel length
        blue: usize,
    },

    /// Interpolation not available for this table type.
    #[error("unsupported interpolation: {0}")]
    UnsupportedInterpolation(&'static str),
}

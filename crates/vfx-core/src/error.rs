//! Error types for vfx-core.
//!
//! Only image descriptions can fail in this crate: a buffer that is too
//! short for its declared geometry, or a sample type that cannot hold the
//! declared bit depth.
//!
//! ```rust
//! use vfx_core::{BitDepth, Error, PackedImage};
//!
//! let data = [0u8; 5];
//! let err = PackedImage::new(&data[..], 2, 1, 3, BitDepth::U8).unwrap_err();
//! assert!(matches!(err, Error::BufferTooSmall { .. }));
//! ```

use crate::format::{BitDepth, DataFormat};
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while describing pixel buffers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },

    /// Only interleaved RGB and RGBA buffers are supported.
    #[error("unsupported channel count {0}, expected 3 or 4")]
    UnsupportedChannels(usize),

    /// Row stride shorter than one row of samples.
    #[error("row stride {stride} is less than minimum {min_stride}")]
    InvalidStride {
        /// Provided stride in samples
        stride: usize,
        /// Minimum stride in samples
        min_stride: usize,
    },

    /// The slice does not cover the described image.
    #[error("buffer holds {actual} samples, image needs {needed}")]
    BufferTooSmall {
        /// Samples required by width, height and stride
        needed: usize,
        /// Samples available in the slice
        actual: usize,
    },

    /// The sample type cannot store the declared bit depth.
    #[error("{bit_depth} samples cannot be stored as {storage:?}")]
    FormatMismatch {
        /// Declared bit depth
        bit_depth: BitDepth,
        /// Storage type of the slice
        storage: DataFormat,
    },

    /// Source and destination descriptions differ in size.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First image width
        a_width: usize,
        /// First image height
        a_height: usize,
        /// Second image width
        b_width: usize,
        /// Second image height
        b_height: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidDimensions { width: 0, height: 4 };
        assert_eq!(err.to_string(), "invalid dimensions: 0x4");

        let err = Error::FormatMismatch {
            bit_depth: BitDepth::U10,
            storage: DataFormat::U8,
        };
        assert!(err.to_string().contains("10-bit"));
    }
}

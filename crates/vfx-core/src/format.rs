//! Bit depths and storage formats.
//!
//! # Types
//!
//! - [`BitDepth`] - closed set of bit depths a processor reads and writes
//! - [`DataFormat`] - byte-aligned storage type backing a bit depth
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::format::{BitDepth, DataFormat};
//!
//! // 10-bit code values live in u16 storage
//! assert_eq!(BitDepth::U10.storage_format(), DataFormat::U16);
//! assert_eq!(BitDepth::U10.scale(), 1023.0);
//!
//! // Float depths are already normalized
//! assert_eq!(BitDepth::F16.scale(), 1.0);
//! ```

/// Bit depth of pixel data entering or leaving a processor.
///
/// Integer depths carry code values in `[0, 2^bits - 1]`; float depths
/// carry normalized values where 1.0 is full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitDepth {
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer (DPX, broadcast).
    U10,
    /// 12-bit unsigned integer (cinema cameras).
    U12,
    /// 14-bit unsigned integer.
    U14,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    #[default]
    F32,
}

impl BitDepth {
    /// Every supported bit depth, integer depths first.
    pub const ALL: [BitDepth; 8] = [
        Self::U8,
        Self::U10,
        Self::U12,
        Self::U14,
        Self::U16,
        Self::U32,
        Self::F16,
        Self::F32,
    ];

    /// Number of bits per channel.
    #[inline]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U10 => 10,
            Self::U12 => 12,
            Self::U14 => 14,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::F16 => 16,
            Self::F32 => 32,
        }
    }

    /// Whether this is a floating-point format.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Whether this is an integer format.
    #[inline]
    pub const fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Number of distinct code values when the depth can index a table
    /// (integer depths up to 16 bits and half float), `None` otherwise.
    ///
    /// ```rust
    /// use vfx_core::BitDepth;
    /// assert_eq!(BitDepth::U10.code_count(), Some(1024));
    /// assert_eq!(BitDepth::F16.code_count(), Some(65536));
    /// assert_eq!(BitDepth::U32.code_count(), None);
    /// ```
    #[inline]
    pub const fn code_count(&self) -> Option<usize> {
        match self {
            Self::U8 | Self::U10 | Self::U12 | Self::U14 | Self::U16 | Self::F16 => {
                Some(1usize << self.bits())
            }
            Self::U32 | Self::F32 => None,
        }
    }

    /// Largest integer code value. Float depths report 1.
    #[inline]
    pub const fn max_value(&self) -> u32 {
        match self {
            Self::U8 => 255,
            Self::U10 => 1023,
            Self::U12 => 4095,
            Self::U14 => 16383,
            Self::U16 => 65535,
            Self::U32 => u32::MAX,
            Self::F16 | Self::F32 => 1,
        }
    }

    /// Full-scale value: the code that represents 1.0.
    #[inline]
    pub fn scale(&self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U10 => 1023.0,
            Self::U12 => 4095.0,
            Self::U14 => 16383.0,
            Self::U16 => 65535.0,
            Self::U32 => 4294967295.0,
            Self::F16 | Self::F32 => 1.0,
        }
    }

    /// Converts a code value of this depth to a normalized float.
    ///
    /// Every conversion of integer code values to floats in the workspace
    /// goes through this function so baked tables reproduce the unbaked
    /// arithmetic bit for bit.
    #[inline]
    pub fn normalize(&self, code: f32) -> f32 {
        if self.is_float() { code } else { code / self.scale() }
    }

    /// Returns the smallest [`DataFormat`] that can store this bit depth.
    #[inline]
    pub const fn storage_format(&self) -> DataFormat {
        match self {
            Self::U8 => DataFormat::U8,
            Self::U10 | Self::U12 | Self::U14 | Self::U16 => DataFormat::U16,
            Self::U32 => DataFormat::U32,
            Self::F16 => DataFormat::F16,
            Self::F32 => DataFormat::F32,
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U10 => write!(f, "10-bit"),
            Self::U12 => write!(f, "12-bit"),
            Self::U14 => write!(f, "14-bit"),
            Self::U16 => write!(f, "16-bit"),
            Self::U32 => write!(f, "32-bit"),
            Self::F16 => write!(f, "half"),
            Self::F32 => write!(f, "float"),
        }
    }
}

/// Runtime storage type of pixel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataFormat {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    #[default]
    F32,
}

impl DataFormat {
    /// Number of bytes per channel.
    #[inline]
    pub const fn bytes_per_channel(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_depths_scale_to_max_code() {
        for bd in BitDepth::ALL {
            if bd.is_integer() {
                assert_eq!(bd.scale(), bd.max_value() as f32);
            } else {
                assert_eq!(bd.scale(), 1.0);
            }
        }
    }

    #[test]
    fn code_count_matches_bits() {
        assert_eq!(BitDepth::U8.code_count(), Some(256));
        assert_eq!(BitDepth::U12.code_count(), Some(4096));
        assert_eq!(BitDepth::U14.code_count(), Some(16384));
        assert_eq!(BitDepth::U16.code_count(), Some(65536));
        assert_eq!(BitDepth::F32.code_count(), None);
    }

    #[test]
    fn normalize_integer_codes() {
        assert_eq!(BitDepth::U8.normalize(255.0), 1.0);
        assert_eq!(BitDepth::U8.normalize(0.0), 0.0);
        assert_eq!(BitDepth::F32.normalize(3.5), 3.5);
    }

    #[test]
    fn storage_formats() {
        assert_eq!(BitDepth::U8.storage_format(), DataFormat::U8);
        assert_eq!(BitDepth::U14.storage_format(), DataFormat::U16);
        assert_eq!(BitDepth::U32.storage_format(), DataFormat::U32);
        assert_eq!(DataFormat::F16.bytes_per_channel(), 2);
    }
}

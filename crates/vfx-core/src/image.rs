//! Packed image descriptions.
//!
//! A processor reads and writes interleaved RGB or RGBA buffers owned by the
//! caller. [`PackedImage`] and [`PackedImageMut`] describe such a buffer:
//! a typed sample slice, its geometry, and the [`BitDepth`] its samples are
//! encoded in.
//!
//! # Memory Layout
//!
//! ```text
//! row 0: [R G B A R G B A ... padding]   <- row_stride samples
//! row 1: [R G B A R G B A ... padding]
//! ```
//!
//! Integer depths between 10 and 16 bits share `u16` storage; the declared
//! bit depth decides the code range.
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::{BitDepth, PackedImageMut};
//!
//! let mut data = vec![0.5f32; 4 * 4 * 2];
//! let img = PackedImageMut::new(&mut data[..], 4, 2, 4, BitDepth::F32).unwrap();
//! assert_eq!(img.width(), 4);
//! assert_eq!(img.row_stride(), 16);
//! ```

use crate::error::{Error, Result};
use crate::format::{BitDepth, DataFormat};
use half::f16;
use std::ops::Range;

/// A pixel sample type that can back a packed image.
pub trait Sample: Copy + Send + Sync + 'static {
    /// Storage format of this sample type.
    const FORMAT: DataFormat;

    /// Numeric value of the sample (code value for integers).
    fn to_f32(self) -> f32;

    /// Converts an already scaled and rounded value, saturating at the
    /// type bounds.
    fn from_f32(v: f32) -> Self;

    /// Table index addressed by this sample: the code value for integers,
    /// the bit pattern for half floats.
    fn table_index(self) -> usize;
}

impl Sample for u8 {
    const FORMAT: DataFormat = DataFormat::U8;
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v as u8
    }
    #[inline]
    fn table_index(self) -> usize {
        self as usize
    }
}

impl Sample for u16 {
    const FORMAT: DataFormat = DataFormat::U16;
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v as u16
    }
    #[inline]
    fn table_index(self) -> usize {
        self as usize
    }
}

impl Sample for u32 {
    const FORMAT: DataFormat = DataFormat::U32;
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v as u32
    }
    #[inline]
    fn table_index(self) -> usize {
        self as usize
    }
}

impl Sample for f16 {
    const FORMAT: DataFormat = DataFormat::F16;
    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v)
    }
    #[inline]
    fn table_index(self) -> usize {
        self.to_bits() as usize
    }
}

impl Sample for f32 {
    const FORMAT: DataFormat = DataFormat::F32;
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn table_index(self) -> usize {
        self as usize
    }
}

/// Borrowed sample storage of a packed image.
#[derive(Debug, Clone, Copy)]
pub enum SampleSlice<'a> {
    /// 8-bit samples.
    U8(&'a [u8]),
    /// 10 to 16-bit samples.
    U16(&'a [u16]),
    /// 32-bit integer samples.
    U32(&'a [u32]),
    /// Half-float samples.
    F16(&'a [f16]),
    /// Float samples.
    F32(&'a [f32]),
}

/// Mutable sample storage of a packed image.
#[derive(Debug)]
pub enum SampleSliceMut<'a> {
    /// 8-bit samples.
    U8(&'a mut [u8]),
    /// 10 to 16-bit samples.
    U16(&'a mut [u16]),
    /// 32-bit integer samples.
    U32(&'a mut [u32]),
    /// Half-float samples.
    F16(&'a mut [f16]),
    /// Float samples.
    F32(&'a mut [f32]),
}

macro_rules! impl_sample_slices {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a [$ty]> for SampleSlice<'a> {
                fn from(data: &'a [$ty]) -> Self {
                    SampleSlice::$variant(data)
                }
            }

            impl<'a> From<&'a mut [$ty]> for SampleSliceMut<'a> {
                fn from(data: &'a mut [$ty]) -> Self {
                    SampleSliceMut::$variant(data)
                }
            }
        )*
    };
}

impl_sample_slices!(u8 => U8, u16 => U16, u32 => U32, f16 => F16, f32 => F32);

impl SampleSlice<'_> {
    /// Storage format of the samples.
    pub fn format(&self) -> DataFormat {
        match self {
            Self::U8(_) => DataFormat::U8,
            Self::U16(_) => DataFormat::U16,
            Self::U32(_) => DataFormat::U32,
            Self::F16(_) => DataFormat::F16,
            Self::F32(_) => DataFormat::F32,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(d) => d.len(),
            Self::U16(d) => d.len(),
            Self::U32(d) => d.len(),
            Self::F16(d) => d.len(),
            Self::F32(d) => d.len(),
        }
    }

    /// Whether the slice holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSliceMut<'_> {
    /// Storage format of the samples.
    pub fn format(&self) -> DataFormat {
        match self {
            Self::U8(_) => DataFormat::U8,
            Self::U16(_) => DataFormat::U16,
            Self::U32(_) => DataFormat::U32,
            Self::F16(_) => DataFormat::F16,
            Self::F32(_) => DataFormat::F32,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(d) => d.len(),
            Self::U16(d) => d.len(),
            Self::U32(d) => d.len(),
            Self::F16(d) => d.len(),
            Self::F32(d) => d.len(),
        }
    }

    /// Whether the slice holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    width: usize,
    height: usize,
    channels: usize,
    row_stride: usize,
    bit_depth: BitDepth,
}

impl Geometry {
    fn validate(self, format: DataFormat, len: usize) -> Result<Self> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.channels != 3 && self.channels != 4 {
            return Err(Error::UnsupportedChannels(self.channels));
        }
        let min_stride = self.width * self.channels;
        if self.row_stride < min_stride {
            return Err(Error::InvalidStride {
                stride: self.row_stride,
                min_stride,
            });
        }
        let needed = (self.height - 1) * self.row_stride + min_stride;
        if len < needed {
            return Err(Error::BufferTooSmall { needed, actual: len });
        }
        if self.bit_depth.storage_format() != format {
            return Err(Error::FormatMismatch {
                bit_depth: self.bit_depth,
                storage: format,
            });
        }
        Ok(self)
    }

    fn row_range(&self, y: usize) -> Range<usize> {
        let start = y * self.row_stride;
        start..start + self.width * self.channels
    }
}

/// Read-only description of an interleaved image buffer.
#[derive(Debug, Clone, Copy)]
pub struct PackedImage<'a> {
    data: SampleSlice<'a>,
    geometry: Geometry,
}

impl<'a> PackedImage<'a> {
    /// Describes a tightly packed buffer (row stride = `width * channels`).
    pub fn new(
        data: impl Into<SampleSlice<'a>>,
        width: usize,
        height: usize,
        channels: usize,
        bit_depth: BitDepth,
    ) -> Result<Self> {
        Self::with_row_stride(data, width, height, channels, width * channels, bit_depth)
    }

    /// Describes a buffer whose rows are `row_stride` samples apart.
    pub fn with_row_stride(
        data: impl Into<SampleSlice<'a>>,
        width: usize,
        height: usize,
        channels: usize,
        row_stride: usize,
        bit_depth: BitDepth,
    ) -> Result<Self> {
        let data = data.into();
        let geometry = Geometry {
            width,
            height,
            channels,
            row_stride,
            bit_depth,
        }
        .validate(data.format(), data.len())?;
        Ok(Self { data, geometry })
    }

    /// Sample storage.
    pub fn data(&self) -> SampleSlice<'a> {
        self.data
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.geometry.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.geometry.height
    }

    /// Channels per pixel (3 or 4).
    pub fn channels(&self) -> usize {
        self.geometry.channels
    }

    /// Distance between rows in samples.
    pub fn row_stride(&self) -> usize {
        self.geometry.row_stride
    }

    /// Bit depth of the samples.
    pub fn bit_depth(&self) -> BitDepth {
        self.geometry.bit_depth
    }

    /// Sample range of row `y`, excluding padding.
    pub fn row_range(&self, y: usize) -> Range<usize> {
        self.geometry.row_range(y)
    }
}

/// Mutable description of an interleaved image buffer.
#[derive(Debug)]
pub struct PackedImageMut<'a> {
    data: SampleSliceMut<'a>,
    geometry: Geometry,
}

impl<'a> PackedImageMut<'a> {
    /// Describes a tightly packed buffer (row stride = `width * channels`).
    pub fn new(
        data: impl Into<SampleSliceMut<'a>>,
        width: usize,
        height: usize,
        channels: usize,
        bit_depth: BitDepth,
    ) -> Result<Self> {
        Self::with_row_stride(data, width, height, channels, width * channels, bit_depth)
    }

    /// Describes a buffer whose rows are `row_stride` samples apart.
    pub fn with_row_stride(
        data: impl Into<SampleSliceMut<'a>>,
        width: usize,
        height: usize,
        channels: usize,
        row_stride: usize,
        bit_depth: BitDepth,
    ) -> Result<Self> {
        let data = data.into();
        let geometry = Geometry {
            width,
            height,
            channels,
            row_stride,
            bit_depth,
        }
        .validate(data.format(), data.len())?;
        Ok(Self { data, geometry })
    }

    /// Mutable sample storage.
    pub fn data_mut(&mut self) -> &mut SampleSliceMut<'a> {
        &mut self.data
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.geometry.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.geometry.height
    }

    /// Channels per pixel (3 or 4).
    pub fn channels(&self) -> usize {
        self.geometry.channels
    }

    /// Distance between rows in samples.
    pub fn row_stride(&self) -> usize {
        self.geometry.row_stride
    }

    /// Bit depth of the samples.
    pub fn bit_depth(&self) -> BitDepth {
        self.geometry.bit_depth
    }

    /// Sample range of row `y`, excluding padding.
    pub fn row_range(&self, y: usize) -> Range<usize> {
        self.geometry.row_range(y)
    }

    /// Checks that `other` has the same pixel dimensions.
    pub fn check_same_size(&self, other: &PackedImage<'_>) -> Result<()> {
        if self.width() != other.width() || self.height() != other.height() {
            return Err(Error::DimensionMismatch {
                a_width: other.width(),
                a_height: other.height(),
                b_width: self.width(),
                b_height: self.height(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_rgb_u8() {
        let data = vec![0u8; 3 * 4 * 2];
        let img = PackedImage::new(&data[..], 4, 2, 3, BitDepth::U8).unwrap();
        assert_eq!(img.row_stride(), 12);
        assert_eq!(img.row_range(1), 12..24);
        assert_eq!(img.data().format(), DataFormat::U8);
    }

    #[test]
    fn padded_rows_allow_short_last_row() {
        // 2 rows of 2 RGBA pixels with 10-sample stride, last row unpadded
        let data = vec![0.0f32; 10 + 8];
        let img = PackedImage::with_row_stride(&data[..], 2, 2, 4, 10, BitDepth::F32).unwrap();
        assert_eq!(img.row_range(1), 10..18);
    }

    #[test]
    fn rejects_bad_geometry() {
        let data = vec![0u16; 16];
        assert!(matches!(
            PackedImage::new(&data[..], 0, 2, 4, BitDepth::U16),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            PackedImage::new(&data[..], 2, 2, 2, BitDepth::U16),
            Err(Error::UnsupportedChannels(2))
        ));
        assert!(matches!(
            PackedImage::with_row_stride(&data[..], 2, 2, 4, 6, BitDepth::U16),
            Err(Error::InvalidStride { .. })
        ));
        assert!(matches!(
            PackedImage::new(&data[..], 2, 2, 4, BitDepth::U8),
            Err(Error::FormatMismatch { .. })
        ));
    }

    #[test]
    fn ten_bit_uses_u16_storage() {
        let mut data = vec![0u16; 12];
        let img = PackedImageMut::new(&mut data[..], 2, 2, 3, BitDepth::U10).unwrap();
        assert_eq!(img.bit_depth(), BitDepth::U10);
    }

    #[test]
    fn same_size_check() {
        let src = vec![0.0f32; 12];
        let mut dst = vec![0u8; 9];
        let src = PackedImage::new(&src[..], 2, 2, 3, BitDepth::F32).unwrap();
        let dst = PackedImageMut::new(&mut dst[..], 3, 1, 3, BitDepth::U8).unwrap();
        assert!(dst.check_same_size(&src).is_err());
    }

    #[test]
    fn half_sample_indexes_by_bits() {
        let one = f16::from_f32(1.0);
        assert_eq!(one.table_index(), 0x3c00);
        assert_eq!(Sample::to_f32(one), 1.0);
        assert_eq!(<u8 as Sample>::from_f32(300.0), 255);
    }
}

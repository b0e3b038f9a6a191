//! Bit-depth conversion at the processor boundaries.
//!
//! Kernels only see normalized RGBA `f32`. The input converter expands a
//! packed row into that form, the output converter quantizes it back.

use vfx_core::{BitDepth, Sample};
use vfx_lut::Lut1D;

/// Expands packed rows into normalized RGBA.
#[derive(Debug, Clone)]
pub(crate) struct InputConverter {
    bit_depth: BitDepth,
    /// Tables indexed by raw sample code, absorbing a leading 1D LUT.
    codes: Option<[Vec<f32>; 3]>,
}

impl InputConverter {
    pub fn new(bit_depth: BitDepth) -> Self {
        Self {
            bit_depth,
            codes: None,
        }
    }

    /// Converter that looks RGB codes up in `lut` directly.
    ///
    /// Returns `None` unless `lut` has exactly one entry per code value of
    /// the bit depth and the matching domain.
    pub fn with_lut(bit_depth: BitDepth, lut: &Lut1D) -> Option<Self> {
        let count = bit_depth.code_count()?;
        let half = bit_depth == BitDepth::F16;
        if lut.size() != count || lut.half_domain != half {
            return None;
        }
        Some(Self {
            bit_depth,
            codes: Some([lut.r.clone(), lut.g.clone(), lut.b.clone()]),
        })
    }

    /// Whether a leading LUT was absorbed.
    pub fn absorbs_lut(&self) -> bool {
        self.codes.is_some()
    }

    /// Fills `dst` (4 floats per pixel) from `src` (`channels` samples per
    /// pixel). Missing alpha becomes 1.
    pub fn load<T: Sample>(&self, src: &[T], channels: usize, dst: &mut [f32]) {
        let bd = self.bit_depth;
        for (s, d) in src.chunks_exact(channels).zip(dst.chunks_exact_mut(4)) {
            match &self.codes {
                Some(t) => {
                    for c in 0..3 {
                        d[c] = t[c][s[c].table_index().min(t[c].len() - 1)];
                    }
                }
                None => {
                    for c in 0..3 {
                        d[c] = bd.normalize(s[c].to_f32());
                    }
                }
            }
            d[3] = if channels == 4 { bd.normalize(s[3].to_f32()) } else { 1.0 };
        }
    }
}

/// Quantizes normalized RGBA into packed rows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputConverter {
    bit_depth: BitDepth,
}

impl OutputConverter {
    pub fn new(bit_depth: BitDepth) -> Self {
        Self { bit_depth }
    }

    /// Writes `src` (4 floats per pixel) into `dst`, dropping alpha for
    /// 3-channel rows.
    ///
    /// Integer depths round to the nearest code and clamp to the code
    /// range; NaN becomes code 0.
    pub fn store<T: Sample>(&self, src: &[f32], channels: usize, dst: &mut [T]) {
        let bd = self.bit_depth;
        if bd.is_float() {
            for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(channels)) {
                for c in 0..channels {
                    d[c] = T::from_f32(s[c]);
                }
            }
            return;
        }
        let scale = bd.scale();
        let max = bd.max_value() as f32;
        for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(channels)) {
            for c in 0..channels {
                let v = (s[c] * scale).round();
                d[c] = T::from_f32(if v.is_nan() { 0.0 } else { v.clamp(0.0, max) });
            }
        }
    }
}

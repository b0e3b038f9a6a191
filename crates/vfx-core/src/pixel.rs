//! Per-pixel constants and half-float indexing.
//!
//! - Rec.709 luma weights used by saturation and CDL math
//! - [`half_index`], the continuous position of a float inside a table
//!   indexed by IEEE-754 half bit patterns
//!
//! The half-domain index is computed from the exponent and mantissa of the
//! value so that it matches the index a shader derives with `log2`/`exp2`:
//! within one exponent band adjacent halves are evenly spaced, so linear
//! interpolation in index space equals linear interpolation in value.

use half::f16;

// ============================================================================
// Rec.709 Luminance Constants
// ============================================================================

/// Rec.709 luminance coefficient for red channel.
///
/// Used in the standard luminance formula: `Y = 0.2126*R + 0.7152*G + 0.0722*B`
pub const REC709_LUMA_R: f32 = 0.2126;

/// Rec.709 luminance coefficient for green channel.
pub const REC709_LUMA_G: f32 = 0.7152;

/// Rec.709 luminance coefficient for blue channel.
pub const REC709_LUMA_B: f32 = 0.0722;

/// Rec.709 luminance coefficients as an array.
pub const REC709_LUMA: [f32; 3] = [REC709_LUMA_R, REC709_LUMA_G, REC709_LUMA_B];

// ============================================================================
// Half-float domain
// ============================================================================

/// Number of entries in a half-domain table.
pub const HALF_DOMAIN_SIZE: usize = 65536;

/// Largest finite half value.
pub const HALF_MAX: f32 = 65504.0;

/// Smallest positive normal half value (2^-14).
pub const HALF_MIN_NORMAL: f32 = 6.103_515_6e-5;

/// Offset added to the index of non-positive values (the sign bit).
pub const HALF_NEG_OFFSET: f32 = 32768.0;

/// Continuous half-domain index of `x`.
///
/// Exact halves land on integer indexes equal to their bit pattern. Values
/// beyond the finite half range clamp to the largest finite entry of their
/// sign. `+0.0` maps to the `-0.0` entry, the way the shader expression does.
///
/// ```rust
/// use vfx_core::pixel::half_index;
/// assert_eq!(half_index(1.0), 15360.0);          // 0x3c00
/// assert_eq!(half_index(-1.0), 15360.0 + 32768.0);
/// assert_eq!(half_index(0.5), 14336.0);          // 0x3800
/// ```
#[inline]
pub fn half_index(x: f32) -> f32 {
    let a = x.abs().min(HALF_MAX);
    let magnitude = if a >= HALF_MIN_NORMAL {
        let bits = a.to_bits();
        let exp = ((bits >> 23) & 0xff) as i32 - 127;
        let mant = (bits & 0x7f_ffff) as f32 / 8_388_608.0;
        (exp + 15) as f32 * 1024.0 + mant * 1024.0
    } else {
        a * 16_777_216.0
    };
    if x <= 0.0 { magnitude + HALF_NEG_OFFSET } else { magnitude }
}

/// Float value represented by half bit pattern `index`.
#[inline]
pub fn half_value(index: usize) -> f32 {
    f16::from_bits(index as u16).to_f32()
}

/// Whether half bit pattern `index` is a finite number.
#[inline]
pub fn is_finite_half_index(index: usize) -> bool {
    f16::from_bits(index as u16).is_finite()
}

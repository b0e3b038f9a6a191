//! Interpolation utilities for LUT evaluation.
//!
//! ```rust
//! use vfx_math::lerp;
//!
//! assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
//! ```

/// Linear interpolation between two values.
///
/// Returns `a` exactly when `t == 0.0`, even if `b` is infinite, so table
/// lookups at exact sample positions reproduce the stored sample.
///
/// ```rust
/// use vfx_math::lerp;
///
/// assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
/// assert_eq!(lerp(0.0, 10.0, 1.0), 10.0);
/// assert_eq!(lerp(2.0, f32::INFINITY, 0.0), 2.0);
/// ```
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    if t == 0.0 { a } else { a + (b - a) * t }
}

/// Clamps a value to [0, 1]. NaN maps to 0.
///
/// ```rust
/// use vfx_math::saturate;
///
/// assert_eq!(saturate(-0.5), 0.0);
/// assert_eq!(saturate(1.5), 1.0);
/// assert_eq!(saturate(f32::NAN), 0.0);
/// ```
#[inline]
pub fn saturate(value: f32) -> f32 {
    value.max(0.0).min(1.0)
}

/// Fractional part of a value.
///
/// ```rust
/// use vfx_math::fract;
///
/// assert!((fract(1.75) - 0.75).abs() < 1e-6);
/// assert!((fract(-0.25) - 0.75).abs() < 1e-6);
/// ```
#[inline]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Splits a continuous table position into a base index and a fraction.
///
/// The position is clamped to `[0, len - 1]`; the returned index is at
/// most `len - 2` so `index + 1` is always valid (tables have at least two
/// entries).
#[inline]
pub fn table_position(pos: f32, len: usize) -> (usize, f32) {
    let last = (len - 1) as f32;
    let p = pos.max(0.0).min(last);
    let i = (p.floor() as usize).min(len - 2);
    (i, p - i as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_bounds() {
        assert_eq!(lerp(1.0, 3.0, 0.5), 2.0);
        assert_eq!(lerp(1.0, 3.0, 1.0), 3.0);
    }

    #[test]
    fn table_position_clamps() {
        assert_eq!(table_position(-1.0, 4), (0, 0.0));
        assert_eq!(table_position(1.5, 4), (1, 0.5));
        // the last sample is reached with fraction 1
        assert_eq!(table_position(3.0, 4), (2, 1.0));
        assert_eq!(table_position(10.0, 4), (2, 1.0));
        assert_eq!(table_position(f32::NAN, 4), (0, 0.0));
    }
}

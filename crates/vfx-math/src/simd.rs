//! 4-lane RGBA kernels.
//!
//! Pixel buffers inside a processor are interleaved RGBA `f32`, so one
//! pixel fits exactly one `f32x4` register.
//!
//! ```rust
//! use vfx_math::simd::scale_offset_rgba;
//!
//! let mut px = [0.5, 0.5, 0.5, 1.0];
//! scale_offset_rgba(&mut px, [2.0, 2.0, 2.0, 1.0], [0.1, 0.1, 0.1, 0.0]);
//! assert!((px[0] - 1.1).abs() < 1e-6);
//! ```

use wide::f32x4;

/// Applies `out = M * in + offset` to every pixel of an RGBA line.
///
/// `rows` is row-major. Trailing samples that do not form a whole pixel are
/// left untouched.
pub fn matrix_offset_rgba(rgba: &mut [f32], rows: &[[f32; 4]; 4], offset: [f32; 4]) {
    // columns of M as registers: out = c0*r + c1*g + c2*b + c3*a
    let col = |j: usize| f32x4::from([rows[0][j], rows[1][j], rows[2][j], rows[3][j]]);
    let (c0, c1, c2, c3) = (col(0), col(1), col(2), col(3));
    let off = f32x4::from(offset);

    for px in rgba.chunks_exact_mut(4) {
        let out = c0 * f32x4::splat(px[0])
            + c1 * f32x4::splat(px[1])
            + c2 * f32x4::splat(px[2])
            + c3 * f32x4::splat(px[3])
            + off;
        px.copy_from_slice(&out.to_array());
    }
}

/// Same as [`matrix_offset_rgba`] for matrices whose alpha row is
/// `[0, 0, 0, 1]` with no alpha offset: only RGB is written, so alpha stays
/// exact even when a color channel is NaN.
pub fn matrix_offset_rgb(rgba: &mut [f32], rows: &[[f32; 4]; 4], offset: [f32; 4]) {
    let col = |j: usize| f32x4::from([rows[0][j], rows[1][j], rows[2][j], 0.0]);
    let (c0, c1, c2, c3) = (col(0), col(1), col(2), col(3));
    let off = f32x4::from([offset[0], offset[1], offset[2], 0.0]);

    for px in rgba.chunks_exact_mut(4) {
        let out = c0 * f32x4::splat(px[0])
            + c1 * f32x4::splat(px[1])
            + c2 * f32x4::splat(px[2])
            + c3 * f32x4::splat(px[3])
            + off;
        px[..3].copy_from_slice(&out.to_array()[..3]);
    }
}

/// Applies a per-channel `out = in * scale + offset` to an RGBA line.
pub fn scale_offset_rgba(rgba: &mut [f32], scale: [f32; 4], offset: [f32; 4]) {
    let s = f32x4::from(scale);
    let o = f32x4::from(offset);
    for px in rgba.chunks_exact_mut(4) {
        let v = f32x4::from([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&(v * s + o).to_array());
    }
}

/// Per-channel scale of an RGBA line.
pub fn scale_rgba(rgba: &mut [f32], scale: [f32; 4]) {
    let s = f32x4::from(scale);
    for px in rgba.chunks_exact_mut(4) {
        let v = f32x4::from([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&(v * s).to_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_swaps_channels() {
        let rows = [
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let mut line = [0.1, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 0.5];
        matrix_offset_rgba(&mut line, &rows, [0.0, 0.0, 0.5, 0.0]);
        assert_eq!(&line[..4], &[0.2, 0.1, 0.8, 1.0]);
        assert_eq!(&line[4..], &[0.5, 0.4, 1.1, 0.5]);
    }

    #[test]
    fn rgb_matrix_leaves_alpha_alone() {
        let rows = [
            [0.5, 0.5, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let mut full = [f32::NAN, 0.2, 0.3, 0.5];
        let mut rgb = full;
        matrix_offset_rgba(&mut full, &rows, [0.0; 4]);
        matrix_offset_rgb(&mut rgb, &rows, [0.0; 4]);
        assert!(full[3].is_nan());
        assert!(rgb[0].is_nan());
        assert_eq!(&rgb[1..], &[0.2, 0.3, 0.5]);
    }

    #[test]
    fn scale_keeps_partial_pixel() {
        let mut line = [1.0, 2.0, 3.0, 4.0, 9.0];
        scale_rgba(&mut line, [2.0, 2.0, 2.0, 1.0]);
        assert_eq!(line, [2.0, 4.0, 6.0, 4.0, 9.0]);
    }
}

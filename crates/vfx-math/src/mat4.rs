//! 4x4 matrix type for RGBA transforms.
//!
//! # Convention
//!
//! Row-major storage, column vectors:
//!
//! ```text
//! | m00 m01 m02 m03 |   | r |
//! | m10 m11 m12 m13 | * | g |
//! | m20 m21 m22 m23 |   | b |
//! | m30 m31 m32 m33 |   | a |
//! ```

use glam::DMat4;

/// Determinant magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// A 4x4 matrix in `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    /// Matrix elements in row-major order.
    pub m: [[f64; 4]; 4],
}

impl Mat4 {
    /// Zero matrix.
    pub const ZERO: Self = Self { m: [[0.0; 4]; 4] };

    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a matrix from row arrays.
    #[inline]
    pub const fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self { m: rows }
    }

    /// Creates a matrix from 16 values in row-major order.
    pub fn from_row_major(values: [f64; 16]) -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, v) in values.into_iter().enumerate() {
            m[i / 4][i % 4] = v;
        }
        Self { m }
    }

    /// Embeds a 3x3 RGB matrix, leaving alpha untouched.
    pub fn from_rgb(rows: [[f64; 3]; 3]) -> Self {
        let mut m = Self::IDENTITY;
        for (i, row) in rows.iter().enumerate() {
            m.m[i][..3].copy_from_slice(row);
        }
        m
    }

    /// Creates a diagonal matrix.
    ///
    /// ```rust
    /// use vfx_math::Mat4;
    ///
    /// let m = Mat4::diagonal([2.0, 3.0, 4.0, 1.0]);
    /// assert_eq!(m.mul_vec4([1.0, 1.0, 1.0, 1.0]), [2.0, 3.0, 4.0, 1.0]);
    /// ```
    #[inline]
    pub const fn diagonal(d: [f64; 4]) -> Self {
        Self::from_rows([
            [d[0], 0.0, 0.0, 0.0],
            [0.0, d[1], 0.0, 0.0],
            [0.0, 0.0, d[2], 0.0],
            [0.0, 0.0, 0.0, d[3]],
        ])
    }

    /// Values in row-major order.
    pub fn to_row_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.m[i / 4][i % 4];
        }
        out
    }

    /// Diagonal elements.
    #[inline]
    pub fn diag(&self) -> [f64; 4] {
        [self.m[0][0], self.m[1][1], self.m[2][2], self.m[3][3]]
    }

    /// Matrix product `self * other`.
    pub fn mul_mat(&self, other: &Self) -> Self {
        Self::from_glam(self.to_glam() * other.to_glam())
    }

    /// Transforms a column vector.
    #[inline]
    pub fn mul_vec4(&self, v: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (i, o) in out.iter_mut().enumerate() {
            let row = &self.m[i];
            *o = row[0] * v[0] + row[1] * v[1] + row[2] * v[2] + row[3] * v[3];
        }
        out
    }

    /// Determinant.
    pub fn determinant(&self) -> f64 {
        self.to_glam().determinant()
    }

    /// Inverse, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let g = self.to_glam();
        if g.determinant().abs() < SINGULAR_EPSILON {
            return None;
        }
        Some(Self::from_glam(g.inverse()))
    }

    /// Whether every element is within `tol` of the identity.
    pub fn is_identity(&self, tol: f64) -> bool {
        self.max_abs_diff(&Self::IDENTITY) <= tol
    }

    /// Whether every off-diagonal element is within `tol` of zero.
    pub fn is_diagonal(&self, tol: f64) -> bool {
        (0..4).all(|i| (0..4).all(|j| i == j || self.m[i][j].abs() <= tol))
    }

    /// Whether any RGB output depends on another RGB input.
    pub fn has_rgb_crosstalk(&self, tol: f64) -> bool {
        (0..3).any(|i| (0..3).any(|j| i != j && self.m[i][j].abs() > tol))
    }

    /// Whether alpha is read or written by anything but the identity.
    pub fn touches_alpha(&self, tol: f64) -> bool {
        (0..3).any(|i| self.m[i][3].abs() > tol || self.m[3][i].abs() > tol)
            || (self.m[3][3] - 1.0).abs() > tol
    }

    /// Largest absolute elementwise difference.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        let mut diff: f64 = 0.0;
        for i in 0..4 {
            for j in 0..4 {
                diff = diff.max((self.m[i][j] - other.m[i][j]).abs());
            }
        }
        diff
    }

    /// Returns true if all elements are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|x| x.is_finite())
    }

    /// Narrows to `f32` rows for pixel kernels.
    pub fn to_f32_rows(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                out[i][j] = self.m[i][j] as f32;
            }
        }
        out
    }

    /// Converts to glam (column-major).
    #[inline]
    pub fn to_glam(&self) -> DMat4 {
        DMat4::from_cols_array_2d(&self.m).transpose()
    }

    /// Creates from glam.
    #[inline]
    pub fn from_glam(m: DMat4) -> Self {
        Self {
            m: m.transpose().to_cols_array_2d(),
        }
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn glam_round_trip_keeps_row_major() {
        let m = Mat4::from_row_major([
            1.0, 2.0, 3.0, 4.0, //
            5.0, 6.0, 7.0, 8.0, //
            9.0, 10.0, 11.0, 12.0, //
            13.0, 14.0, 15.0, 16.0,
        ]);
        assert_eq!(Mat4::from_glam(m.to_glam()), m);
        assert_eq!(m.m[0][3], 4.0);
        assert_eq!(m.to_row_major()[4], 5.0);
    }

    #[test]
    fn product_order() {
        // scale then swap red/green
        let scale = Mat4::diagonal([2.0, 1.0, 1.0, 1.0]);
        let swap = Mat4::from_rgb([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let combined = swap.mul_mat(&scale);
        assert_eq!(combined.mul_vec4([1.0, 0.0, 0.0, 1.0]), [0.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn inverse_of_rgb_matrix() {
        let m = Mat4::from_rgb([[1.0, 2.0, 3.0], [0.0, 1.0, 4.0], [5.0, 6.0, 0.0]]);
        let inv = m.inverse().unwrap();
        let p = m.mul_mat(&inv);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(p.m[i][j], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn singular_has_no_inverse() {
        let m = Mat4::from_rgb([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [1.0, 1.0, 1.0]]);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn structure_queries() {
        let d = Mat4::diagonal([2.0, 3.0, 4.0, 1.0]);
        assert!(d.is_diagonal(0.0));
        assert!(!d.has_rgb_crosstalk(0.0));
        assert!(!d.touches_alpha(0.0));
        assert!(Mat4::diagonal([1.0, 1.0, 1.0, 0.5]).touches_alpha(0.0));

        let mut x = Mat4::IDENTITY;
        x.m[0][1] = 0.1;
        assert!(x.has_rgb_crosstalk(0.0));
        assert!(!x.is_identity(0.01));
        assert!(x.is_identity(0.2));
    }
}

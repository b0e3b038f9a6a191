//! Matrix with offset: `out = M · in + offset`.
//!
//! The inverse direction is kept symbolic until finalization, where it is
//! normalized to a forward matrix; a singular matrix fails there.

use super::{FormatMetadata, OpData, TransformDirection, push_values};
use crate::error::{OpError, OpResult};
use vfx_core::REC709_LUMA;
use vfx_math::Mat4;

/// Elementwise tolerance for treating a matrix and offset as the identity.
pub const MATRIX_IDENTITY_TOLERANCE: f64 = 1e-10;

/// 4x4 RGBA matrix plus offset.
///
/// ```rust
/// use vfx_colorops::opdata::MatrixOpData;
///
/// let a = MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]);
/// let b = MatrixOpData::scale([0.5, 0.5, 0.5, 1.0]);
/// assert!(a.compose(&b).unwrap().is_identity());
/// ```
#[derive(Debug, Clone)]
pub struct MatrixOpData {
    /// Row-major coefficients.
    pub matrix: Mat4,
    /// Offset added after the product.
    pub offset: [f64; 4],
    /// Evaluation direction.
    pub direction: TransformDirection,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl Default for MatrixOpData {
    fn default() -> Self {
        Self::identity()
    }
}

impl MatrixOpData {
    /// Creates a forward matrix.
    pub fn new(matrix: Mat4, offset: [f64; 4]) -> Self {
        Self {
            matrix,
            offset,
            direction: TransformDirection::Forward,
            metadata: FormatMetadata::default(),
        }
    }

    /// Identity.
    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY, [0.0; 4])
    }

    /// Per-channel scale.
    pub fn scale(scale: [f64; 4]) -> Self {
        Self::new(Mat4::diagonal(scale), [0.0; 4])
    }

    /// Per-channel scale followed by an offset.
    pub fn scale_offset(scale: [f64; 4], offset: [f64; 4]) -> Self {
        Self::new(Mat4::diagonal(scale), offset)
    }

    /// RGB 3x3 matrix with alpha passthrough.
    pub fn from_rgb(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Mat4::from_rgb(rows), [0.0; 4])
    }

    /// Saturation around Rec.709 luma: `sat · rgb + (1 − sat) · Y`.
    pub fn saturation(sat: f64) -> Self {
        let luma = REC709_LUMA.map(f64::from);
        let mut rows = [[0.0; 3]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (1.0 - sat) * luma[j] + if i == j { sat } else { 0.0 };
            }
        }
        Self::from_rgb(rows)
    }

    /// Maps `[old_min, old_max]` onto `[new_min, new_max]` on RGB.
    pub fn fit(old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> Self {
        let s = (new_max - new_min) / (old_max - old_min);
        let o = new_min - s * old_min;
        Self::scale_offset([s, s, s, 1.0], [o, o, o, 0.0])
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: TransformDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// Checks that every value is finite and an inverse matrix is
    /// invertible.
    pub fn validate(&self) -> OpResult<()> {
        if !self.matrix.is_finite() || self.offset.iter().any(|v| !v.is_finite()) {
            return Err(OpError::invalid("matrix has non-finite coefficients"));
        }
        if !self.direction.is_forward() && self.matrix.inverse().is_none() {
            return Err(OpError::invalid("singular matrix cannot be inverted"));
        }
        Ok(())
    }

    /// Forward-direction equivalent.
    pub fn resolved(&self) -> OpResult<Self> {
        if self.direction.is_forward() {
            return Ok(self.clone());
        }
        let inv = self
            .matrix
            .inverse()
            .ok_or_else(|| OpError::invalid("singular matrix cannot be inverted"))?;
        let o = inv.mul_vec4(self.offset);
        Ok(Self {
            matrix: inv,
            offset: [-o[0], -o[1], -o[2], -o[3]],
            direction: TransformDirection::Forward,
            metadata: self.metadata.clone(),
        })
    }

    /// Replaces an inverse matrix by its forward equivalent.
    pub fn finalize(&mut self) -> OpResult<()> {
        if !self.direction.is_forward() {
            *self = self.resolved()?;
        }
        Ok(())
    }

    /// Identity in either direction.
    pub fn is_identity(&self) -> bool {
        self.matrix.is_identity(MATRIX_IDENTITY_TOLERANCE)
            && self.offset.iter().all(|v| v.abs() <= MATRIX_IDENTITY_TOLERANCE)
    }

    /// Matrices never clamp.
    pub fn is_no_op(&self) -> bool {
        self.is_identity()
    }

    /// Whether any off-diagonal coefficient is non-zero.
    pub fn has_channel_crosstalk(&self) -> bool {
        !self.matrix.is_diagonal(0.0)
    }

    /// Whether any offset is non-zero.
    pub fn has_offset(&self) -> bool {
        self.offset.iter().any(|&v| v != 0.0)
    }

    /// Identity matrix.
    pub fn identity_replacement(&self) -> OpData {
        Self::identity().into()
    }

    /// Same coefficients, opposite direction.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.direction = self.direction.inverse();
        inv
    }

    /// Whether `self` followed by `other` is the identity.
    pub fn is_inverse(&self, other: &Self) -> bool {
        if self.direction != other.direction
            && self.matrix == other.matrix
            && self.offset == other.offset
        {
            return true;
        }
        self.compose(other).is_ok_and(|m| m.is_identity())
    }

    /// `self` followed by `next`: `M = Mn·Ms`, `o = Mn·os + on`.
    pub fn compose(&self, next: &Self) -> OpResult<Self> {
        let a = self.resolved()?;
        let b = next.resolved()?;
        let matrix = b.matrix.mul_mat(&a.matrix);
        let mo = b.matrix.mul_vec4(a.offset);
        let offset = [
            mo[0] + b.offset[0],
            mo[1] + b.offset[1],
            mo[2] + b.offset[2],
            mo[3] + b.offset[3],
        ];
        let mut out = Self::new(matrix, offset);
        out.metadata = self.metadata.clone();
        Ok(out)
    }

    /// Applies the matrix in `f64`.
    pub fn apply(&self, rgba: [f64; 4]) -> OpResult<[f64; 4]> {
        let m = self.resolved()?;
        let v = m.matrix.mul_vec4(rgba);
        Ok([
            v[0] + m.offset[0],
            v[1] + m.offset[1],
            v[2] + m.offset[2],
            v[3] + m.offset[3],
        ])
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = format!("Matrix {} m[", self.direction.name());
        push_values(&mut id, &self.matrix.to_row_major());
        id.push_str("] o[");
        push_values(&mut id, &self.offset);
        id.push(']');
        id
    }
}

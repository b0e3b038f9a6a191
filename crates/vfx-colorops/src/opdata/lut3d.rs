//! Cube lookup table operator.

use super::{FormatMetadata, OpData, RangeOpData, TransformDirection, digest_samples};
use crate::error::{OpError, OpResult};
use vfx_lut::{FAST_INVERSE_GRID, Lut3D, MAX_GRID_SIZE};

/// 3D LUT in either direction.
///
/// The inverse direction is evaluated by Newton iteration on the CPU; the
/// fast path and the GPU bake it into a forward cube of
/// [`FAST_INVERSE_GRID`] points per edge.
#[derive(Debug, Clone)]
pub struct Lut3DOpData {
    /// Forward cube.
    pub lut: Lut3D,
    /// Evaluation direction.
    pub direction: TransformDirection,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl Lut3DOpData {
    /// Forward cube.
    pub fn new(lut: Lut3D) -> Self {
        Self {
            lut,
            direction: TransformDirection::Forward,
            metadata: FormatMetadata::default(),
        }
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

    /// Checks the edge length against the sample count.
    pub fn validate(&self) -> OpResult<()> {
        let e = self.lut.size;
        if !(2..=MAX_GRID_SIZE).contains(&e) {
            return Err(OpError::invalid(format!(
                "3D LUT edge length must be in 2..={MAX_GRID_SIZE}, got {e}"
            )));
        }
        if self.lut.data.len() != e * e * e {
            return Err(OpError::invalid(format!(
                "3D LUT of edge {e} needs {} entries, got {}",
                e * e * e,
                self.lut.data.len()
            )));
        }
        Ok(())
    }

    /// Whether the cube reproduces its input grid.
    pub fn is_identity(&self) -> bool {
        self.lut.is_identity(1e-6)
    }

    /// Cubes clamp to `[0, 1]`.
    pub fn is_no_op(&self) -> bool {
        false
    }

    /// Every output reads all three inputs.
    pub fn has_channel_crosstalk(&self) -> bool {
        true
    }

    /// Clamp to the unit cube.
    pub fn identity_replacement(&self) -> OpData {
        RangeOpData::unit().into()
    }

    /// Same cube, opposite direction.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.direction = self.direction.inverse();
        inv
    }

    /// Opposite directions over the same cube.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.direction != other.direction
            && self.lut.size == other.lut.size
            && self.lut.data == other.lut.data
    }

    /// Two forward cubes as one, sampled on the larger grid.
    pub fn compose(&self, next: &Self) -> Option<Self> {
        if !self.direction.is_forward() || !next.direction.is_forward() {
            return None;
        }
        let size = self.lut.size.max(next.lut.size).min(MAX_GRID_SIZE);
        let lut = Lut3D::from_fn(size, |rgb| next.lut.apply(self.lut.apply(rgb)))
            .with_interpolation(self.lut.interpolation);
        let mut out = Self::new(lut);
        out.metadata = self.metadata.clone();
        Some(out)
    }

    /// Forward cube approximating the inverse.
    pub fn bake_inverse(&self) -> Self {
        let mut out = Self::new(self.lut.bake_inverse(FAST_INVERSE_GRID));
        out.metadata = self.metadata.clone();
        out
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let flat: Vec<f32> = self.lut.data.iter().flatten().copied().collect();
        format!(
            "Lut3D {} {} {} {}",
            self.direction.name(),
            self.lut.size,
            self.lut.interpolation.name(),
            digest_samples([&flat[..]]),
        )
    }
}

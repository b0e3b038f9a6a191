//! Interpolation methods for LUT evaluation.

/// Interpolation method for LUT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// Nearest neighbor (no interpolation).
    Nearest,

    /// Linear interpolation (1D) / Trilinear (3D).
    ///
    /// Default method, good balance of quality and speed.
    #[default]
    Linear,

    /// Tetrahedral interpolation (3D only).
    ///
    /// Higher quality than trilinear, especially for smooth gradients.
    Tetrahedral,
}

impl Interpolation {
    /// Short lowercase name, used in cache identifiers.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::Tetrahedral => "tetrahedral",
        }
    }
}

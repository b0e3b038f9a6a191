//! # vfx-core
//!
//! Core types shared by the color operator crates.
//!
//! - [`BitDepth`] - the closed set of pixel bit depths a processor accepts
//! - [`PackedImage`], [`PackedImageMut`] - typed views of interleaved RGB/RGBA buffers
//! - [`pixel`] - Rec.709 luma weights and half-float index helpers
//!
//! ## Crate Structure
//!
//! ```text
//! vfx-core (this crate)
//!    ^
//!    |
//!    +-- vfx-lut (LUT containers and evaluators)
//!    +-- vfx-colorops (operator pipeline, CPU and GPU processors)
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - derive `Serialize`/`Deserialize` for [`BitDepth`] and [`DataFormat`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod image;
pub mod pixel;

pub use error::*;
pub use format::*;
pub use image::*;
pub use pixel::{REC709_LUMA, REC709_LUMA_B, REC709_LUMA_G, REC709_LUMA_R};

/// Prelude module for convenient imports.
///
/// ```
/// use vfx_core::prelude::*;
///
/// assert!(BitDepth::F16.is_float());
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::format::{BitDepth, DataFormat};
    pub use crate::image::{PackedImage, PackedImageMut, Sample, SampleSlice, SampleSliceMut};
    pub use crate::pixel::REC709_LUMA;
}

//! # vfx-lut
//!
//! Look-Up Table (LUT) types for color operator pipelines.
//!
//! # LUT Types
//!
//! - [`Lut1D`] - per-channel curves over the `[0, 1]` or half-float domain
//! - [`Lut3D`] - 3-dimensional RGB cube
//! - [`Lut1DInverse`] - exact inverse of a 1D LUT, with fast baking
//!
//! # Usage
//!
//! ```rust
//! use vfx_lut::{Interpolation, Lut1D, Lut3D};
//!
//! let lut = Lut1D::gamma(1024, 2.2);
//! let out = lut.apply([0.5, 0.5, 0.5]);
//!
//! let cube = Lut3D::identity(33).with_interpolation(Interpolation::Tetrahedral);
//! let rgb = cube.apply([0.5, 0.3, 0.2]);
//! # let _ = (out, rgb);
//! ```
//!
//! # Interpolation
//!
//! - 1D LUTs: nearest or linear
//! - 3D LUTs: nearest, trilinear or tetrahedral
//!
//! # Inversion
//!
//! Both table types invert exactly (monotonic search for 1D, Newton
//! iteration for 3D) or bake a forward table approximating the inverse.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod interp;
mod lut1d;
mod lut3d;

pub use error::{LutError, LutResult};
pub use interp::Interpolation;
pub use lut1d::{FAST_INVERSE_SIZE, Lut1D, Lut1DInverse};
pub use lut3d::{FAST_INVERSE_GRID, Lut3D, MAX_GRID_SIZE};

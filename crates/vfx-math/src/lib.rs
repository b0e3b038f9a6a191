//! # vfx-math
//!
//! Math utilities for color operator pipelines.
//!
//! - [`Mat4`] - 4x4 matrices in `f64` for RGBA linear transforms
//! - Interpolation helpers ([`lerp`], [`saturate`], [`fract`])
//! - [`simd`] - 4-lane RGBA kernels built on `wide`
//!
//! # Design
//!
//! Matrices are stored **row-major** and multiply **column vectors**:
//!
//! ```text
//! out = M * [r, g, b, a]^T + offset
//! ```
//!
//! Composition and inversion run in `f64` through [`glam::DMat4`]; pixel
//! kernels narrow to `f32` once, at finalization.
//!
//! # Usage
//!
//! ```rust
//! use vfx_math::Mat4;
//!
//! let m = Mat4::diagonal([2.0, 2.0, 2.0, 1.0]);
//! let inv = m.inverse().unwrap();
//! assert!(m.mul_mat(&inv).is_identity(1e-12));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod interp;
mod mat4;
pub mod simd;

pub use interp::*;
pub use mat4::*;

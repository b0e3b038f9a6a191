//! CPU finalization: float kernels bound between bit-depth converters.
//!
//! A [`CpuProcessor`] holds one [`Kernel`] per optimized op. Image applies
//! expand each row to normalized RGBA `f32`, run the kernels and quantize
//! back, so the kernels never see the storage format.

mod convert;
mod kernels;
mod processor;

pub use kernels::{Kernel, build_kernel};
pub use processor::CpuProcessor;

pub(crate) use kernels::{
    CDL_RECIPROCAL_FLOOR, D65_U, D65_V, LUV_EPSILON, LUV_KAPPA, MAX_HSV_SAT, surround_luma,
};

//! Shader generation.
//!
//! A [`GpuProcessor`] turns a finalized pipeline into a single shader
//! function written into a [`GpuShaderCreator`]:
//!
//! ```text
//! vec4 <function>(vec4 inPixel)
//! {
//!   vec4 <pixel> = inPixel;
//!   ... one block per op ...
//!   return <pixel>;
//! }
//! ```
//!
//! Every texture, uniform and helper is named under a resource key derived
//! from the creator's unique id and the pipeline id, so several functions
//! can share one program.
//!
//! In legacy mode the shader is text plus at most one 3D texture: the ops a
//! legacy target cannot express analytically are baked into a lattice.

mod assembler;
mod emit;
mod shader_creator;

pub use assembler::{GpuProcessor, resource_key};
pub use emit::MAX_LUT1D_WIDTH;
pub use shader_creator::{
    DEFAULT_FUNCTION_NAME, DEFAULT_LATTICE_EDGE_LEN, DEFAULT_PIXEL_NAME, GpuShaderCreator,
    GpuTexture, GpuUniform, TextureDimensions, float_lit,
};

use std::fmt;

/// Target shading language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GpuLanguage {
    /// GLSL 1.0 (`texture2D`, `texture3D`).
    Glsl1_0,
    /// GLSL 1.3 (`texture`).
    #[default]
    Glsl1_3,
    /// Cg (`float3`, `tex3D`, `mul`).
    Cg,
}

impl GpuLanguage {
    /// Language name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Glsl1_0 => "glsl_1.0",
            Self::Glsl1_3 => "glsl_1.3",
            Self::Cg => "cg",
        }
    }
}

impl fmt::Display for GpuLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

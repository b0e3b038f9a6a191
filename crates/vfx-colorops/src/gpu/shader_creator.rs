//! Shader text accumulator.
//!
//! Emitters never write language keywords directly; they ask the creator
//! for the spelling of vector types, built-ins and texture lookups so one
//! emitter serves every [`GpuLanguage`].

use super::GpuLanguage;
use crate::dynamic::DynamicProperty;
use sha2::{Digest, Sha256};
use vfx_lut::Interpolation;

/// Default name of the generated function.
pub const DEFAULT_FUNCTION_NAME: &str = "ColorTransform";

/// Default name of the pixel variable inside the function.
pub const DEFAULT_PIXEL_NAME: &str = "outColor";

/// Default edge length of the legacy lattice texture.
pub const DEFAULT_LATTICE_EDGE_LEN: usize = 32;

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimensions {
    /// Sampled with 2D coordinates.
    Tex2D,
    /// Sampled with 3D coordinates.
    Tex3D,
}

/// Texture the caller must upload before running the shader.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuTexture {
    /// Sampler name used in the shader.
    pub name: String,
    /// 2D or 3D.
    pub dimensions: TextureDimensions,
    /// Texels along x.
    pub width: usize,
    /// Texels along y.
    pub height: usize,
    /// Texels along z; 1 for 2D textures.
    pub depth: usize,
    /// Samples per texel.
    pub channels: usize,
    /// Filtering the sampler must use.
    pub interpolation: Interpolation,
    /// Texels with x fastest, then y, then z.
    pub data: Vec<f32>,
}

impl GpuTexture {
    /// Texel at integer coordinates, clamped to the edges.
    pub fn texel(&self, x: isize, y: isize, z: isize) -> &[f32] {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        let cz = z.clamp(0, self.depth as isize - 1) as usize;
        let i = ((cz * self.height + cy) * self.width + cx) * self.channels;
        &self.data[i..i + self.channels]
    }
}

/// Scalar uniform driven by a dynamic property.
#[derive(Debug, Clone)]
pub struct GpuUniform {
    /// Uniform name used in the shader.
    pub name: String,
    /// Handle the value is read from.
    pub property: DynamicProperty,
}

impl GpuUniform {
    /// Current value to upload.
    pub fn value(&self) -> f64 {
        self.property.double()
    }
}

/// Collects the pieces of one generated shader function.
///
/// ```rust
/// use vfx_colorops::gpu::{GpuLanguage, GpuShaderCreator};
///
/// let creator = GpuShaderCreator::new(GpuLanguage::Glsl1_3)
///     .with_function_name("Display")
///     .with_unique_id("viewer");
/// assert_eq!(creator.vec3(), "vec3");
/// assert_eq!(creator.function_name(), "Display");
/// ```
#[derive(Debug, Clone)]
pub struct GpuShaderCreator {
    language: GpuLanguage,
    function_name: String,
    pixel_name: String,
    unique_id: String,
    legacy: bool,
    lattice_edge_len: usize,

    resource_prefix: String,
    next_resource: usize,
    declarations: String,
    helpers: String,
    header: String,
    body: String,
    footer: String,
    textures: Vec<GpuTexture>,
    uniforms: Vec<GpuUniform>,

    shader_text: String,
    cache_id: String,
}

impl GpuShaderCreator {
    /// Creator for `language` with default names.
    pub fn new(language: GpuLanguage) -> Self {
        Self {
            language,
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            pixel_name: DEFAULT_PIXEL_NAME.to_string(),
            unique_id: String::new(),
            legacy: false,
            lattice_edge_len: DEFAULT_LATTICE_EDGE_LEN,
            resource_prefix: String::new(),
            next_resource: 0,
            declarations: String::new(),
            helpers: String::new(),
            header: String::new(),
            body: String::new(),
            footer: String::new(),
            textures: Vec::new(),
            uniforms: Vec::new(),
            shader_text: String::new(),
            cache_id: String::new(),
        }
    }

    /// Sets the generated function's name.
    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    /// Sets the pixel variable's name.
    pub fn with_pixel_name(mut self, name: impl Into<String>) -> Self {
        self.pixel_name = name.into();
        self
    }

    /// Sets the caller's id, mixed into the resource prefix.
    pub fn with_unique_id(mut self, id: impl Into<String>) -> Self {
        self.unique_id = id.into();
        self
    }

    /// Requests a text-only shader with one lattice texture of
    /// `edge_len`³ entries.
    pub fn with_legacy(mut self, edge_len: usize) -> Self {
        self.legacy = true;
        self.lattice_edge_len = edge_len.max(2);
        self
    }

    /// Target language.
    pub fn language(&self) -> GpuLanguage {
        self.language
    }

    /// Generated function's name.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Pixel variable's name.
    pub fn pixel_name(&self) -> &str {
        &self.pixel_name
    }

    /// Caller's id.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Whether the legacy text-only mode is requested.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Edge length of the legacy lattice.
    pub fn lattice_edge_len(&self) -> usize {
        self.lattice_edge_len
    }

    /// Namespace of every emitted resource.
    pub fn resource_prefix(&self) -> &str {
        &self.resource_prefix
    }

    /// Clears previous output and sets the resource namespace.
    pub(crate) fn begin(&mut self, resource_prefix: String) {
        self.resource_prefix = resource_prefix;
        self.next_resource = 0;
        self.declarations.clear();
        self.helpers.clear();
        self.header.clear();
        self.body.clear();
        self.footer.clear();
        self.textures.clear();
        self.uniforms.clear();
        self.shader_text.clear();
        self.cache_id.clear();
    }

    // ========================================================================
    // Syntax
    // ========================================================================

    /// Two-component vector type.
    pub fn vec2(&self) -> &'static str {
        match self.language {
            GpuLanguage::Cg => "float2",
            _ => "vec2",
        }
    }

    /// Three-component vector type.
    pub fn vec3(&self) -> &'static str {
        match self.language {
            GpuLanguage::Cg => "float3",
            _ => "vec3",
        }
    }

    /// Four-component vector type.
    pub fn vec4(&self) -> &'static str {
        match self.language {
            GpuLanguage::Cg => "float4",
            _ => "vec4",
        }
    }

    /// Four-by-four matrix type.
    pub fn mat4(&self) -> &'static str {
        match self.language {
            GpuLanguage::Cg => "float4x4",
            _ => "mat4",
        }
    }

    /// Linear blend built-in.
    pub fn mix(&self) -> &'static str {
        match self.language {
            GpuLanguage::Cg => "lerp",
            _ => "mix",
        }
    }

    /// Fractional part built-in.
    pub fn fract(&self) -> &'static str {
        match self.language {
            GpuLanguage::Cg => "frac",
            _ => "fract",
        }
    }

    /// Vector of 3 or 4 components from literals.
    pub fn vec_lit(&self, values: &[f32]) -> String {
        let ty = if values.len() == 4 { self.vec4() } else { self.vec3() };
        let parts: Vec<String> = values.iter().map(|&v| float_lit(v)).collect();
        format!("{ty}({})", parts.join(", "))
    }

    /// Three-component vector with every component equal to `expr`.
    pub fn splat3(&self, expr: &str) -> String {
        format!("{}({expr}, {expr}, {expr})", self.vec3())
    }

    /// Product of a row-major matrix with the vector expression `v`.
    pub fn mat_mul(&self, rows: &[[f32; 4]; 4], v: &str) -> String {
        let mut values = Vec::with_capacity(16);
        match self.language {
            // float4x4 takes rows
            GpuLanguage::Cg => {
                for row in rows {
                    values.extend(row.iter().map(|&x| float_lit(x)));
                }
                format!("mul({}({}), {v})", self.mat4(), values.join(", "))
            }
            // mat4 takes columns
            _ => {
                for c in 0..4 {
                    values.extend(rows.iter().map(|row| float_lit(row[c])));
                }
                format!("{}({}) * {v}", self.mat4(), values.join(", "))
            }
        }
    }

    /// 2D texture lookup expression.
    pub fn sample_2d(&self, sampler: &str, coords: &str) -> String {
        match self.language {
            GpuLanguage::Glsl1_0 => format!("texture2D({sampler}, {coords})"),
            GpuLanguage::Glsl1_3 => format!("texture({sampler}, {coords})"),
            GpuLanguage::Cg => format!("tex2D({sampler}, {coords})"),
        }
    }

    /// 3D texture lookup expression.
    pub fn sample_3d(&self, sampler: &str, coords: &str) -> String {
        match self.language {
            GpuLanguage::Glsl1_0 => format!("texture3D({sampler}, {coords})"),
            GpuLanguage::Glsl1_3 => format!("texture({sampler}, {coords})"),
            GpuLanguage::Cg => format!("tex3D({sampler}, {coords})"),
        }
    }

    // ========================================================================
    // Accumulation
    // ========================================================================

    /// Fresh resource name `<prefix>_<base>_<n>`.
    pub fn resource_name(&mut self, base: &str) -> String {
        let name = format!("{}_{base}_{}", self.resource_prefix, self.next_resource);
        self.next_resource += 1;
        name
    }

    /// Appends a global declaration line.
    pub fn add_declaration(&mut self, line: &str) {
        self.declarations.push_str(line);
        self.declarations.push('\n');
    }

    /// Appends a helper function.
    pub fn add_helper(&mut self, text: &str) {
        self.helpers.push_str(text);
        if !text.ends_with('\n') {
            self.helpers.push('\n');
        }
        self.helpers.push('\n');
    }

    /// Appends a body line, indented one level.
    pub fn add_line(&mut self, line: &str) {
        self.body.push_str("  ");
        self.body.push_str(line);
        self.body.push('\n');
    }

    /// Declares the sampler of `texture` and registers it for upload.
    pub fn add_texture(&mut self, texture: GpuTexture) {
        let sampler = match texture.dimensions {
            TextureDimensions::Tex2D => "sampler2D",
            TextureDimensions::Tex3D => "sampler3D",
        };
        self.add_declaration(&format!("uniform {sampler} {};", texture.name));
        self.textures.push(texture);
    }

    /// Uniform bound to `property`, declared once per handle.
    pub fn uniform_for(&mut self, property: &DynamicProperty) -> String {
        if let Some(u) = self.uniforms.iter().find(|u| u.property.ptr_eq(property)) {
            return u.name.clone();
        }
        let name = format!("{}_{}", self.resource_prefix, property.kind().name());
        self.add_declaration(&format!("uniform float {name};"));
        self.uniforms.push(GpuUniform {
            name: name.clone(),
            property: property.clone(),
        });
        name
    }

    pub(crate) fn write_header(&mut self) {
        let v4 = self.vec4();
        self.header = format!(
            "{v4} {}({v4} inPixel)\n{{\n  {v4} {} = inPixel;\n",
            self.function_name, self.pixel_name
        );
    }

    pub(crate) fn write_footer(&mut self) {
        self.footer = format!("  return {};\n}}\n", self.pixel_name);
    }

    /// Assembles the text and computes its cache id.
    pub(crate) fn finalize(&mut self) {
        let mut text = String::new();
        if !self.declarations.is_empty() {
            text.push_str(&self.declarations);
            text.push('\n');
        }
        text.push_str(&self.helpers);
        text.push_str(&self.header);
        text.push_str(&self.body);
        text.push_str(&self.footer);

        let mut hasher = Sha256::new();
        hasher.update(self.language.name().as_bytes());
        hasher.update(text.as_bytes());
        for t in &self.textures {
            hasher.update(t.name.as_bytes());
            for n in [t.width, t.height, t.depth, t.channels] {
                hasher.update((n as u64).to_le_bytes());
            }
            for v in &t.data {
                hasher.update(v.to_le_bytes());
            }
        }
        for u in &self.uniforms {
            hasher.update(u.name.as_bytes());
        }
        self.cache_id = hex::encode(hasher.finalize());
        self.shader_text = text;
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Complete shader text: declarations, helpers and the function.
    pub fn shader_text(&self) -> &str {
        &self.shader_text
    }

    /// Digest of the text and resources.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Textures to upload.
    pub fn textures(&self) -> &[GpuTexture] {
        &self.textures
    }

    /// Uniforms to update before each draw.
    pub fn uniforms(&self) -> &[GpuUniform] {
        &self.uniforms
    }

    /// Texture by sampler name.
    pub fn texture(&self, name: &str) -> Option<&GpuTexture> {
        self.textures.iter().find(|t| t.name == name)
    }
}

/// Float literal readable by every target language.
///
/// Non-finite values are replaced by the nearest finite `f32`, NaN by 0.
pub fn float_lit(v: f32) -> String {
    let v = if v.is_nan() {
        0.0
    } else {
        v.clamp(f32::MIN, f32::MAX)
    };
    format!("{v:?}")
}

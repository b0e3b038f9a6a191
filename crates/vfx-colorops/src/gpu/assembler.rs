//! Shader assembly and the legacy partition.

use super::emit::emit_op;
use super::shader_creator::GpuShaderCreator;
use crate::cpu::build_kernel;
use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::{OpError, OpResult};
use crate::flags::OptimizationFlags;
use crate::op::Op;
use crate::opdata::{Lut3DOpData, OpData, TransformDirection};
use crate::pipeline::OpPipeline;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use vfx_lut::{Interpolation, Lut3D};

/// Hex digits of the resource key.
const RESOURCE_KEY_LEN: usize = 8;

/// Pipeline ready to be written out as shader code.
///
/// Holds the raw ops for legacy requests, which partition around markers,
/// and the finalized ops for analytical requests.
#[derive(Debug, Clone)]
pub struct GpuProcessor {
    raw: OpPipeline,
    pipeline: OpPipeline,
    flags: OptimizationFlags,
    cache_id: String,
}

impl GpuProcessor {
    /// Finalizes a copy of `pipeline`. Inverse LUTs are always baked.
    pub fn new(pipeline: &OpPipeline, flags: OptimizationFlags) -> OpResult<Self> {
        let flags = flags | OptimizationFlags::LUT_INV_FAST;
        let mut finalized = pipeline.clone();
        finalized.finalize(flags)?;
        let cache_id = format!("GPU {}", finalized.cache_id());
        debug!(ops = finalized.len(), "gpu processor built");
        Ok(Self {
            raw: pipeline.clone(),
            pipeline: finalized,
            flags,
            cache_id,
        })
    }

    /// The finalized ops of the analytical shader.
    pub fn pipeline(&self) -> &OpPipeline {
        &self.pipeline
    }

    /// Whether no op changes values.
    pub fn is_no_op(&self) -> bool {
        self.pipeline.is_no_op()
    }

    /// Whether any op mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.pipeline.has_channel_crosstalk()
    }

    /// Whether a dynamic property of `kind` is held; these become uniforms.
    pub fn has_dynamic_property(&self, kind: DynamicPropertyType) -> bool {
        self.pipeline.has_dynamic_property(kind)
    }

    /// Dynamic handle of `kind`.
    pub fn dynamic_property(&self, kind: DynamicPropertyType) -> Option<DynamicProperty> {
        self.pipeline.dynamic_property(kind)
    }

    /// Identifier of the finalized ops.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Writes the shader function, textures and uniforms into `creator`.
    ///
    /// ```rust
    /// use vfx_colorops::OpPipeline;
    /// use vfx_colorops::gpu::{GpuLanguage, GpuProcessor, GpuShaderCreator};
    /// use vfx_colorops::opdata::MatrixOpData;
    /// use vfx_colorops::OptimizationFlags;
    ///
    /// let mut pipeline = OpPipeline::new();
    /// pipeline.append(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
    /// let gpu = GpuProcessor::new(&pipeline, OptimizationFlags::DEFAULT).unwrap();
    ///
    /// let mut creator = GpuShaderCreator::new(GpuLanguage::Glsl1_3);
    /// gpu.extract_shader_info(&mut creator).unwrap();
    /// assert!(creator.shader_text().contains("vec4 ColorTransform(vec4 inPixel)"));
    /// ```
    pub fn extract_shader_info(&self, creator: &mut GpuShaderCreator) -> OpResult<()> {
        let key = resource_key(creator.unique_id(), &self.pipeline.cache_id());
        creator.begin(key);

        let ops = if creator.is_legacy() {
            self.legacy_ops(creator.lattice_edge_len())?
        } else {
            self.pipeline.clone()
        };

        for op in &ops {
            trace!(%op, "emitting");
            emit_op(creator, op)?;
        }
        creator.write_header();
        creator.write_footer();
        creator.finalize();
        debug!(
            ops = ops.len(),
            textures = creator.textures().len(),
            uniforms = creator.uniforms().len(),
            legacy = creator.is_legacy(),
            "shader assembled"
        );
        Ok(())
    }

    /// Analytical prefix, baked lattice and analytical suffix.
    fn legacy_ops(&self, edge_len: usize) -> OpResult<OpPipeline> {
        if self.raw.is_dynamic() {
            return Err(OpError::unsupported(
                "legacy shaders cannot carry dynamic properties",
            ));
        }
        let mut parts = partition_legacy(&self.raw)?;
        parts.pre.finalize(self.flags)?;
        parts.lattice.finalize(self.flags)?;
        parts.post.finalize(self.flags)?;

        let mut ops = parts.pre;
        if !parts.lattice.is_empty() {
            let lut = bake_lattice(&parts.lattice, edge_len)?;
            ops.append(lut);
        }
        ops.extend_from(&parts.post);
        ops.finalize(self.flags)?;
        Ok(ops)
    }
}

/// Namespace of the emitted resources: hex digits of a digest of the
/// caller's id and the pipeline id, starting with a letter.
pub fn resource_key(unique_id: &str, pipeline_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(unique_id.as_bytes());
    hasher.update(pipeline_id.as_bytes());
    let digest = hex::encode(hasher.finalize());
    let short = &digest[..RESOURCE_KEY_LEN];
    if short.starts_with(|c: char| c.is_ascii_alphabetic()) {
        short.to_string()
    } else {
        format!("k{short}")
    }
}

/// The three segments of a legacy request.
#[derive(Debug, Default)]
pub(crate) struct LegacyPartition {
    pub pre: OpPipeline,
    pub lattice: OpPipeline,
    pub post: OpPipeline,
}

/// Splits `ops` around its legacy-incompatible span.
///
/// The lattice runs from the first to the last incompatible op. When an
/// allocation marker precedes the first incompatible op, the cut moves back
/// to the nearest one and its forward allocation closes the prefix while
/// the inverse opens the lattice.
pub(crate) fn partition_legacy(ops: &OpPipeline) -> OpResult<LegacyPartition> {
    let list = ops.ops();
    let Some(first) = list.iter().position(|op| !op.is_legacy_compatible()) else {
        return Ok(LegacyPartition {
            pre: ops.clone(),
            ..Default::default()
        });
    };
    let last = list
        .iter()
        .rposition(|op| !op.is_legacy_compatible())
        .unwrap_or(first);
    let start = (0..=first)
        .rev()
        .find(|&i| list[i].defines_allocation())
        .unwrap_or(first);
    if start > last || last >= list.len() {
        return Err(OpError::invalid(format!(
            "legacy partition [{start}, {last}] outside pipeline of {} ops",
            list.len()
        )));
    }

    let mut parts = LegacyPartition {
        pre: OpPipeline::from_ops(list[..start].iter().cloned()),
        ..Default::default()
    };
    if let Some(alloc) = list[start].allocation() {
        for data in alloc.ops(TransformDirection::Forward)? {
            parts.pre.append(data);
        }
        for data in alloc.ops(TransformDirection::Inverse)? {
            parts.lattice.append(data);
        }
    }
    parts.lattice.insert(parts.lattice.len(), list[start..=last].iter().cloned());
    parts.post = OpPipeline::from_ops(list[last + 1..].iter().cloned());
    debug!(
        pre = parts.pre.len(),
        lattice = parts.lattice.len(),
        post = parts.post.len(),
        "legacy partition"
    );
    Ok(parts)
}

/// Samples an identity grid of `edge_len`³ through `lattice` into a
/// linear 3D LUT.
pub(crate) fn bake_lattice(lattice: &OpPipeline, edge_len: usize) -> OpResult<Op> {
    let kernels = lattice
        .iter()
        .map(build_kernel)
        .collect::<OpResult<Vec<_>>>()?;
    let lut = Lut3D::from_fn(edge_len, |rgb| {
        let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
        for k in &kernels {
            k.apply(&mut px);
        }
        [px[0], px[1], px[2]]
    })
    .with_interpolation(Interpolation::Linear);
    Ok(Op::new(OpData::Lut3D(Lut3DOpData::new(lut))))
}

//! Top-level processor: a raw pipeline plus caches of its finalized forms.

use crate::cache::{CacheConfig, KeyedCache};
use crate::cpu::CpuProcessor;
use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::OpResult;
use crate::flags::OptimizationFlags;
use crate::gpu::GpuProcessor;
use crate::pipeline::OpPipeline;
use std::sync::Arc;
use tracing::debug;
use vfx_core::BitDepth;

type DepthKey = (BitDepth, BitDepth, OptimizationFlags);

/// Entry point for applying a pipeline.
///
/// Requested flags pass through [`OptimizationFlags::resolve`], so the
/// `VFX_OPTIMIZATION_FLAGS` override applies to every artifact.
///
/// ```rust
/// use vfx_colorops::{OpPipeline, OptimizationFlags, Processor};
/// use vfx_colorops::opdata::MatrixOpData;
/// use vfx_core::BitDepth;
///
/// let mut pipeline = OpPipeline::new();
/// pipeline.append(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
/// let processor = Processor::new(pipeline);
///
/// let cpu = processor.cpu_processor(BitDepth::F32, BitDepth::F32, OptimizationFlags::DEFAULT).unwrap();
/// let mut px = [0.25f32, 0.5, 1.0];
/// cpu.apply_rgb(&mut px);
/// assert_eq!(px, [0.5, 1.0, 2.0]);
/// ```
#[derive(Debug)]
pub struct Processor {
    pipeline: OpPipeline,
    config: CacheConfig,
    cache_id: String,
    optimized: KeyedCache<DepthKey, OpPipeline>,
    cpu: KeyedCache<DepthKey, CpuProcessor>,
    gpu: KeyedCache<OptimizationFlags, GpuProcessor>,
}

impl Processor {
    /// Processor over `pipeline` with the environment's cache policy.
    ///
    /// Dynamic properties of the same kind are unified first.
    pub fn new(pipeline: OpPipeline) -> Self {
        Self::with_cache_config(pipeline, CacheConfig::from_env())
    }

    /// Processor over `pipeline` with an explicit cache policy.
    pub fn with_cache_config(mut pipeline: OpPipeline, config: CacheConfig) -> Self {
        pipeline.unify_dynamic_properties();
        let cache_id = pipeline.cache_id();
        debug!(ops = pipeline.len(), caching = config.enabled, "processor created");
        Self {
            pipeline,
            config,
            cache_id,
            optimized: KeyedCache::new("optimized", config.enabled),
            cpu: KeyedCache::new("cpu", config.enabled),
            gpu: KeyedCache::new("gpu", config.enabled),
        }
    }

    /// The raw ops.
    pub fn pipeline(&self) -> &OpPipeline {
        &self.pipeline
    }

    /// Cache policy.
    pub fn cache_config(&self) -> CacheConfig {
        self.config
    }

    /// Digest of the raw ops; `"<NOOP>"` when empty.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Whether no op changes values.
    pub fn is_no_op(&self) -> bool {
        self.pipeline.is_no_op()
    }

    /// Whether any op mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.pipeline.has_channel_crosstalk()
    }

    /// Whether a dynamic property of `kind` is held.
    pub fn has_dynamic_property(&self, kind: DynamicPropertyType) -> bool {
        self.pipeline.has_dynamic_property(kind)
    }

    /// Shared dynamic handle of `kind`.
    pub fn dynamic_property(&self, kind: DynamicPropertyType) -> Option<DynamicProperty> {
        self.pipeline.dynamic_property(kind)
    }

    /// Finalized and bit-depth optimized copy of the ops.
    pub fn optimized_pipeline(
        &self,
        in_bd: BitDepth,
        out_bd: BitDepth,
        flags: OptimizationFlags,
    ) -> OpResult<Arc<OpPipeline>> {
        let flags = OptimizationFlags::resolve(flags);
        self.optimized
            .get_or_try_insert_with((in_bd, out_bd, flags), || {
                let mut ops = self.pipeline.clone();
                ops.finalize(flags)?;
                ops.optimize_for_bitdepth(in_bd, out_bd, flags)?;
                Ok(ops)
            })
    }

    /// CPU processor for the given bit depths.
    ///
    /// With `share_dynamic_properties` off, dynamic pipelines get a fresh
    /// processor with its own property handles on every call.
    pub fn cpu_processor(
        &self,
        in_bd: BitDepth,
        out_bd: BitDepth,
        flags: OptimizationFlags,
    ) -> OpResult<Arc<CpuProcessor>> {
        let flags = OptimizationFlags::resolve(flags);
        let build = || {
            let ops = self.optimized_pipeline(in_bd, out_bd, flags)?;
            CpuProcessor::from_optimized(ops.as_ref().clone(), in_bd, out_bd)
        };
        if !self.config.share_dynamic_properties && self.pipeline.is_dynamic() {
            debug!("dynamic pipeline bypasses the cpu cache");
            let mut ops = self.optimized_pipeline(in_bd, out_bd, flags)?.as_ref().clone();
            ops.detach_dynamic_properties();
            return CpuProcessor::from_optimized(ops, in_bd, out_bd).map(Arc::new);
        }
        self.cpu.get_or_try_insert_with((in_bd, out_bd, flags), build)
    }

    /// GPU processor; shader text comes from
    /// [`GpuProcessor::extract_shader_info`].
    pub fn gpu_processor(&self, flags: OptimizationFlags) -> OpResult<Arc<GpuProcessor>> {
        let flags = OptimizationFlags::resolve(flags);
        self.gpu
            .get_or_try_insert_with(flags, || GpuProcessor::new(&self.pipeline, flags))
    }
}

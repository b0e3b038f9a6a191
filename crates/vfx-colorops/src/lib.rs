//! Color operator pipelines.
//!
//! A pipeline is an ordered list of color operators (matrices, ranges,
//! 1D and 3D LUTs, gammas, logs, CDLs, exposure/contrast, fixed functions).
//! This crate optimizes pipelines and turns them into:
//! - a [`CpuProcessor`] applying float kernels between bit-depth converters
//! - a [`GpuProcessor`] writing one shader function plus its textures and
//!   uniforms into a [`GpuShaderCreator`]
//!
//! # Quick Start
//!
//! ```
//! use vfx_colorops::{OpPipeline, OptimizationFlags, Processor};
//! use vfx_colorops::opdata::{GammaOpData, GammaStyle, MatrixOpData};
//! use vfx_core::BitDepth;
//!
//! let mut pipeline = OpPipeline::new();
//! pipeline.append(MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]));
//! pipeline.append(GammaOpData::basic(GammaStyle::BasicFwd, [2.0; 3]));
//!
//! let processor = Processor::new(pipeline);
//! let cpu = processor
//!     .cpu_processor(BitDepth::F32, BitDepth::F32, OptimizationFlags::DEFAULT)
//!     .unwrap();
//!
//! let mut px = [0.25f32, 0.5, 0.0];
//! cpu.apply_rgb(&mut px);
//! assert_eq!(px, [0.25, 1.0, 0.0]);
//! ```
//!
//! # Optimization
//!
//! [`OpPipeline::finalize`] removes markers, validates every op and runs the
//! optimizer passes enabled by [`OptimizationFlags`]: identity removal,
//! pair-inverse cancellation, composition, simplification and inverse LUT
//! baking. [`OpPipeline::optimize_for_bitdepth`] then bakes separable
//! prefixes into LUTs sized for integer inputs.
//!
//! # Dynamic properties
//!
//! Exposure/contrast ops may bind their values to [`DynamicProperty`]
//! handles. [`Processor::new`] unifies handles of the same kind, so editing
//! one handle affects every op and every processor built from it. Edits
//! must not race with `apply` calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod cpu;
pub mod dynamic;
pub mod error;
pub mod flags;
pub mod gpu;
pub mod op;
pub mod opdata;
pub mod optimizer;
pub mod pipeline;
pub mod processor;

pub use cache::CacheConfig;
pub use cpu::CpuProcessor;
pub use dynamic::{DynamicProperty, DynamicPropertyType, DynamicValue};
pub use error::{OpError, OpResult};
pub use flags::OptimizationFlags;
pub use gpu::{GpuLanguage, GpuProcessor, GpuShaderCreator};
pub use op::Op;
pub use optimizer::OptimizationReport;
pub use pipeline::OpPipeline;
pub use processor::Processor;

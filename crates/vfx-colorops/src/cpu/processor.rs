//! Finalized CPU processor.

use super::convert::{InputConverter, OutputConverter};
use super::kernels::{Kernel, build_kernel};
use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::{OpError, OpResult};
use crate::flags::OptimizationFlags;
use crate::opdata::OpData;
use crate::pipeline::OpPipeline;
use tracing::debug;
use vfx_core::{BitDepth, PackedImage, PackedImageMut, Sample, SampleSlice, SampleSliceMut};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Geometry of one side of an apply call.
#[derive(Debug, Clone, Copy)]
struct Layout {
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl Layout {
    fn of(img: &PackedImage<'_>) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            channels: img.channels(),
            stride: img.row_stride(),
        }
    }

    fn of_mut(img: &PackedImageMut<'_>) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            channels: img.channels(),
            stride: img.row_stride(),
        }
    }

    #[inline]
    fn row_len(&self) -> usize {
        self.width * self.channels
    }
}

/// Pipeline bound to float kernels and bit-depth converters.
///
/// The kernels are fixed at construction. Every apply method takes `&self`
/// and may run concurrently from several threads; only dynamic property
/// edits need to be serialized against apply calls by the caller.
///
/// ```rust
/// use vfx_colorops::{CpuProcessor, OpPipeline, OptimizationFlags};
/// use vfx_colorops::opdata::MatrixOpData;
/// use vfx_core::{BitDepth, PackedImageMut};
///
/// let mut pipeline = OpPipeline::new();
/// pipeline.append(MatrixOpData::scale([0.5, 0.5, 0.5, 1.0]));
/// let cpu = CpuProcessor::new(&pipeline, BitDepth::U8, BitDepth::U8, OptimizationFlags::DEFAULT).unwrap();
///
/// let mut data = [200u8, 100, 50];
/// let mut img = PackedImageMut::new(&mut data[..], 1, 1, 3, BitDepth::U8).unwrap();
/// cpu.apply(&mut img).unwrap();
/// assert_eq!(data, [100, 50, 25]);
/// ```
#[derive(Debug)]
pub struct CpuProcessor {
    in_bd: BitDepth,
    out_bd: BitDepth,
    input: InputConverter,
    /// One kernel per op of `pipeline`.
    kernels: Vec<Box<dyn Kernel>>,
    /// Leading kernels folded into `input` for image applies.
    absorbed: usize,
    output: OutputConverter,
    pipeline: OpPipeline,
    cache_id: String,
}

impl CpuProcessor {
    /// Finalizes a copy of `pipeline` under `flags` and binds it.
    pub fn new(
        pipeline: &OpPipeline,
        in_bd: BitDepth,
        out_bd: BitDepth,
        flags: OptimizationFlags,
    ) -> OpResult<Self> {
        let mut ops = pipeline.clone();
        ops.finalize(flags)?;
        ops.optimize_for_bitdepth(in_bd, out_bd, flags)?;
        Self::from_optimized(ops, in_bd, out_bd)
    }

    /// Binds an already finalized and optimized pipeline.
    pub fn from_optimized(pipeline: OpPipeline, in_bd: BitDepth, out_bd: BitDepth) -> OpResult<Self> {
        let kernels = pipeline
            .iter()
            .map(build_kernel)
            .collect::<OpResult<Vec<_>>>()?;

        let absorbing = match pipeline.get(0).map(|op| op.data()) {
            Some(OpData::Lut1D(l)) if l.direction.is_forward() => {
                InputConverter::with_lut(in_bd, &l.lut)
            }
            _ => None,
        };
        let (input, absorbed) = match absorbing {
            Some(conv) => (conv, 1),
            None => (InputConverter::new(in_bd), 0),
        };

        let cache_id = format!("CPU {in_bd} {out_bd} {}", pipeline.cache_id());
        debug!(
            ops = pipeline.len(),
            absorbed,
            %in_bd,
            %out_bd,
            "cpu processor built"
        );
        Ok(Self {
            in_bd,
            out_bd,
            input,
            kernels,
            absorbed,
            output: OutputConverter::new(out_bd),
            pipeline,
            cache_id,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Bit depth images passed in must have.
    pub fn input_bit_depth(&self) -> BitDepth {
        self.in_bd
    }

    /// Bit depth written out.
    pub fn output_bit_depth(&self) -> BitDepth {
        self.out_bd
    }

    /// The optimized ops the kernels were built from.
    pub fn pipeline(&self) -> &OpPipeline {
        &self.pipeline
    }

    /// No op changes values and both bit depths match.
    pub fn is_no_op(&self) -> bool {
        self.in_bd == self.out_bd && self.is_identity()
    }

    /// No op changes values; bit depths are ignored.
    pub fn is_identity(&self) -> bool {
        self.pipeline.is_no_op()
    }

    /// Whether any op mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.pipeline.has_channel_crosstalk()
    }

    /// Whether any op holds a dynamic property.
    pub fn is_dynamic(&self) -> bool {
        self.pipeline.is_dynamic()
    }

    /// Whether a dynamic property of `kind` is held.
    pub fn has_dynamic_property(&self, kind: DynamicPropertyType) -> bool {
        self.pipeline.has_dynamic_property(kind)
    }

    /// Dynamic handle of `kind`; setting its value affects later applies.
    pub fn dynamic_property(&self, kind: DynamicPropertyType) -> Option<DynamicProperty> {
        self.pipeline.dynamic_property(kind)
    }

    /// Identifier of the ops and bit depths.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    // ========================================================================
    // Float pixels
    // ========================================================================

    fn run_kernels(&self, kernels: &[Box<dyn Kernel>], rgba: &mut [f32]) {
        for k in kernels {
            k.apply(rgba);
        }
    }

    /// Applies the float kernels to one RGB pixel. Bit depths are ignored.
    pub fn apply_rgb(&self, pixel: &mut [f32; 3]) {
        let mut rgba = [pixel[0], pixel[1], pixel[2], 1.0];
        self.run_kernels(&self.kernels, &mut rgba);
        pixel.copy_from_slice(&rgba[..3]);
    }

    /// Applies the float kernels to one RGBA pixel. Bit depths are ignored.
    pub fn apply_rgba(&self, pixel: &mut [f32; 4]) {
        self.run_kernels(&self.kernels, pixel);
    }

    // ========================================================================
    // Images
    // ========================================================================

    fn check_depth(&self, what: &str, actual: BitDepth, expected: BitDepth) -> OpResult<()> {
        if actual != expected {
            return Err(OpError::invalid(format!(
                "{what} is {actual}, processor expects {expected}"
            )));
        }
        Ok(())
    }

    /// Transforms `image` in place.
    ///
    /// Requires equal input and output bit depths, matching the image's.
    pub fn apply(&self, image: &mut PackedImageMut<'_>) -> OpResult<()> {
        self.check_depth("image", image.bit_depth(), self.in_bd)?;
        self.check_depth("image", image.bit_depth(), self.out_bd)?;
        let layout = Layout::of_mut(image);
        match image.data_mut() {
            SampleSliceMut::U8(d) => self.run_in_place(d, layout),
            SampleSliceMut::U16(d) => self.run_in_place(d, layout),
            SampleSliceMut::U32(d) => self.run_in_place(d, layout),
            SampleSliceMut::F16(d) => self.run_in_place(d, layout),
            SampleSliceMut::F32(d) => self.run_in_place(d, layout),
        }
        Ok(())
    }

    /// Reads `src` and writes the result into `dst` of the same size.
    ///
    /// Channel counts may differ; a missing source alpha reads as 1.
    pub fn apply_to(&self, src: &PackedImage<'_>, dst: &mut PackedImageMut<'_>) -> OpResult<()> {
        self.check_depth("source", src.bit_depth(), self.in_bd)?;
        self.check_depth("destination", dst.bit_depth(), self.out_bd)?;
        dst.check_same_size(src)?;
        let sl = Layout::of(src);
        match src.data() {
            SampleSlice::U8(s) => self.apply_from(s, sl, dst),
            SampleSlice::U16(s) => self.apply_from(s, sl, dst),
            SampleSlice::U32(s) => self.apply_from(s, sl, dst),
            SampleSlice::F16(s) => self.apply_from(s, sl, dst),
            SampleSlice::F32(s) => self.apply_from(s, sl, dst),
        }
        Ok(())
    }

    fn apply_from<I: Sample>(&self, src: &[I], sl: Layout, dst: &mut PackedImageMut<'_>) {
        let dl = Layout::of_mut(dst);
        match dst.data_mut() {
            SampleSliceMut::U8(d) => self.run_copy(src, sl, d, dl),
            SampleSliceMut::U16(d) => self.run_copy(src, sl, d, dl),
            SampleSliceMut::U32(d) => self.run_copy(src, sl, d, dl),
            SampleSliceMut::F16(d) => self.run_copy(src, sl, d, dl),
            SampleSliceMut::F32(d) => self.run_copy(src, sl, d, dl),
        }
    }

    fn process_row<I: Sample, O: Sample>(
        &self,
        scratch: &mut Vec<f32>,
        src: &[I],
        src_channels: usize,
        dst: &mut [O],
        dst_channels: usize,
    ) {
        let pixels = src.len() / src_channels;
        scratch.resize(pixels * 4, 0.0);
        self.input.load(src, src_channels, scratch);
        self.run_kernels(&self.kernels[self.absorbed..], scratch);
        self.output.store(scratch, dst_channels, dst);
    }

    fn run_in_place<T: Sample>(&self, data: &mut [T], l: Layout) {
        let len = l.row_len();
        let process = |scratch: &mut Vec<f32>, row: &mut [T]| {
            let row = &mut row[..len];
            let pixels = l.width;
            scratch.resize(pixels * 4, 0.0);
            self.input.load(row, l.channels, scratch);
            self.run_kernels(&self.kernels[self.absorbed..], scratch);
            self.output.store(scratch, l.channels, row);
        };

        #[cfg(feature = "parallel")]
        data.par_chunks_mut(l.stride)
            .take(l.height)
            .for_each_init(Vec::new, process);

        #[cfg(not(feature = "parallel"))]
        {
            let mut scratch = Vec::new();
            for row in data.chunks_mut(l.stride).take(l.height) {
                process(&mut scratch, row);
            }
        }
    }

    fn run_copy<I: Sample, O: Sample>(&self, src: &[I], sl: Layout, dst: &mut [O], dl: Layout) {
        let process = |scratch: &mut Vec<f32>, (y, row): (usize, &mut [O])| {
            let start = y * sl.stride;
            let src_row = &src[start..start + sl.row_len()];
            self.process_row(scratch, src_row, sl.channels, &mut row[..dl.row_len()], dl.channels);
        };

        #[cfg(feature = "parallel")]
        dst.par_chunks_mut(dl.stride)
            .take(dl.height)
            .enumerate()
            .for_each_init(Vec::new, process);

        #[cfg(not(feature = "parallel"))]
        {
            let mut scratch = Vec::new();
            for item in dst.chunks_mut(dl.stride).take(dl.height).enumerate() {
                process(&mut scratch, item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opdata::{GammaOpData, GammaStyle, Lut1DOpData, MatrixOpData, RangeOpData};
    use approx::assert_abs_diff_eq;
    use half::f16;
    use vfx_lut::Lut1D;

    fn build(p: &OpPipeline, i: BitDepth, o: BitDepth) -> CpuProcessor {
        CpuProcessor::new(p, i, o, OptimizationFlags::DEFAULT).unwrap()
    }

    #[test]
    fn identity_queries() {
        let empty = OpPipeline::new();
        let same = build(&empty, BitDepth::F32, BitDepth::F32);
        assert!(same.is_no_op() && same.is_identity());
        let widening = build(&empty, BitDepth::U8, BitDepth::F32);
        assert!(!widening.is_no_op());
        assert!(widening.is_identity());
        assert_ne!(same.cache_id(), widening.cache_id());
    }

    #[test]
    fn rgb_and_rgba_pixels() {
        let mut p = OpPipeline::new();
        p.append(MatrixOpData::scale([2.0, 2.0, 2.0, 0.5]));
        let cpu = build(&p, BitDepth::F32, BitDepth::F32);
        let mut rgb = [0.1f32, 0.2, 0.3];
        cpu.apply_rgb(&mut rgb);
        assert_abs_diff_eq!(rgb[2], 0.6, epsilon = 1e-6);
        let mut rgba = [0.1f32, 0.2, 0.3, 1.0];
        cpu.apply_rgba(&mut rgba);
        assert_abs_diff_eq!(rgba[3], 0.5);
    }

    #[test]
    fn converts_between_depths() {
        let p = OpPipeline::new();
        let cpu = build(&p, BitDepth::U8, BitDepth::U16);
        let src = [255u8, 0, 51];
        let img = PackedImage::new(&src[..], 1, 1, 3, BitDepth::U8).unwrap();
        let mut out = [0u16; 4];
        let mut dst = PackedImageMut::new(&mut out[..], 1, 1, 4, BitDepth::U16).unwrap();
        cpu.apply_to(&img, &mut dst).unwrap();
        assert_eq!(out, [65535, 0, 13107, 65535]);
    }

    #[test]
    fn rejects_wrong_depth() {
        let cpu = build(&OpPipeline::new(), BitDepth::U8, BitDepth::F32);
        let mut data = [0.0f32; 3];
        let mut img = PackedImageMut::new(&mut data[..], 1, 1, 3, BitDepth::F32).unwrap();
        assert!(matches!(cpu.apply(&mut img), Err(OpError::InvalidParameters(_))));
    }

    #[test]
    fn strided_rows_keep_padding() {
        let mut p = OpPipeline::new();
        p.append(MatrixOpData::scale([0.5, 0.5, 0.5, 1.0]));
        let cpu = build(&p, BitDepth::F32, BitDepth::F32);
        // 1x2 RGB with one padding sample per row
        let mut data = [1.0f32, 1.0, 1.0, 9.0, 2.0, 2.0, 2.0, 9.0];
        let mut img = PackedImageMut::with_row_stride(&mut data[..], 1, 2, 3, 4, BitDepth::F32).unwrap();
        cpu.apply(&mut img).unwrap();
        assert_eq!(data, [0.5, 0.5, 0.5, 9.0, 1.0, 1.0, 1.0, 9.0]);
    }

    #[test]
    fn leading_lut_is_absorbed() {
        let lut = Lut1D::from_fn(256, |x| [x * x, x, 1.0 - x]);
        let mut p = OpPipeline::new();
        p.append(Lut1DOpData::new(lut.clone()));
        p.append(RangeOpData::unit());
        let cpu = build(&p, BitDepth::U8, BitDepth::F32);
        assert_eq!(cpu.absorbed, 1);

        let src: Vec<u8> = (0..=255).flat_map(|i| [i, i, i]).collect();
        let img = PackedImage::new(&src[..], 256, 1, 3, BitDepth::U8).unwrap();
        let mut out = vec![0.0f32; 256 * 3];
        let mut dst = PackedImageMut::new(&mut out[..], 256, 1, 3, BitDepth::F32).unwrap();
        cpu.apply_to(&img, &mut dst).unwrap();
        for i in 0..256 {
            assert_abs_diff_eq!(out[i * 3], lut.r[i], epsilon = 1e-6);
            assert_abs_diff_eq!(out[i * 3 + 2], lut.b[i], epsilon = 1e-6);
        }

        // the float path still runs the LUT
        let mut px = [1.0f32, 1.0, 1.0];
        cpu.apply_rgb(&mut px);
        assert_abs_diff_eq!(px[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn half_images() {
        let mut p = OpPipeline::new();
        p.append(GammaOpData::basic(GammaStyle::BasicFwd, [2.0; 3]));
        let cpu = build(&p, BitDepth::F16, BitDepth::F16);
        let mut data = [f16::from_f32(0.5), f16::from_f32(-1.0), f16::from_f32(3.0), f16::ONE];
        let mut img = PackedImageMut::new(&mut data[..], 1, 1, 4, BitDepth::F16).unwrap();
        cpu.apply(&mut img).unwrap();
        assert_eq!(data[0].to_f32(), 0.25);
        assert_eq!(data[1].to_f32(), 0.0);
        assert_eq!(data[2].to_f32(), 9.0);
        assert_eq!(data[3], f16::ONE);
    }
}

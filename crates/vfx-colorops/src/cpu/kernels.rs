//! Float pixel kernels.
//!
//! Every kernel transforms a line of interleaved RGBA `f32` samples in
//! place. The variant-specific parameter subset is resolved once in
//! [`build_kernel`]; `apply` itself never inspects operator parameters.

use crate::dynamic::DynamicProperty;
use crate::error::{OpError, OpResult};
use crate::op::Op;
use crate::opdata::{
    CdlOpData, ExposureContrastOpData, ExposureContrastStyle, FixedFunctionOpData,
    FixedFunctionStyle, GammaOpData, GammaParams, GammaStyle, LogChannel, LogOpData,
    MIN_CONTRAST, MIN_PIVOT, MatrixOpData, MoncurveCoefs, NegativeStyle, OpData, RangeOpData,
    VIDEO_OETF_POWER,
};
use std::fmt::Debug;
use vfx_core::REC709_LUMA;
use vfx_lut::{Lut1D, Lut1DInverse, Lut3D};
use vfx_math::{saturate, simd};

/// Per-line float transform.
pub trait Kernel: Send + Sync + Debug {
    /// Transforms every whole RGBA pixel of `rgba` in place.
    fn apply(&self, rgba: &mut [f32]);
}

/// Selects the kernel for `op`.
///
/// Markers have no kernel and fail with [`OpError::Internal`].
pub fn build_kernel(op: &Op) -> OpResult<Box<dyn Kernel>> {
    let kernel: Box<dyn Kernel> = match op.data() {
        OpData::Matrix(d) => matrix_kernel(d)?,
        OpData::Range(d) => range_kernel(d),
        OpData::Lut1D(d) => {
            if d.direction.is_forward() {
                Box::new(Lut1DKernel { lut: d.lut.clone() })
            } else {
                Box::new(Lut1DInverseKernel {
                    inverse: d.lut.inverse(),
                })
            }
        }
        OpData::Lut3D(d) => {
            if d.direction.is_forward() {
                Box::new(Lut3DKernel { lut: d.lut.clone() })
            } else {
                Box::new(Lut3DInverseKernel { lut: d.lut.clone() })
            }
        }
        OpData::Gamma(d) => gamma_kernel(d),
        OpData::Exponent(d) => {
            let curve = match d.negative_style {
                NegativeStyle::Clamp => clamp_pow as PowFn,
                NegativeStyle::Mirror => mirror_pow,
                NegativeStyle::PassThru => pass_thru_pow,
            };
            let exponent = d.effective_exponent().map(|e| e as f32);
            Box::new(PowerKernel {
                exponent,
                channels: if exponent[3] == 1.0 { 3 } else { 4 },
                curve,
            })
        }
        OpData::Log(d) => Box::new(LogKernel::new(d)),
        OpData::Cdl(d) => Box::new(CdlKernel::new(d)),
        OpData::ExposureContrast(d) => Box::new(ExposureContrastKernel::new(d)),
        OpData::FixedFunction(d) => fixed_function_kernel(d)?,
        OpData::NoOp(_) => {
            return Err(OpError::internal(format!("no kernel for marker {op}")));
        }
    };
    Ok(kernel)
}

// ============================================================================
// Matrix and range
// ============================================================================

fn matrix_kernel(d: &MatrixOpData) -> OpResult<Box<dyn Kernel>> {
    let m = d.resolved()?;
    let offset = m.offset.map(|v| v as f32);
    if m.matrix.is_diagonal(0.0) {
        let scale = m.matrix.diag().map(|v| v as f32);
        if m.has_offset() {
            Ok(Box::new(ScaleOffsetKernel { scale, offset }))
        } else {
            Ok(Box::new(ScaleKernel { scale }))
        }
    } else {
        let rows = m.matrix.to_f32_rows();
        Ok(Box::new(MatrixKernel {
            rgb_only: rows[3] == [0.0, 0.0, 0.0, 1.0] && offset[3] == 0.0,
            rows,
            offset,
        }))
    }
}

#[derive(Debug)]
struct ScaleKernel {
    scale: [f32; 4],
}

impl Kernel for ScaleKernel {
    fn apply(&self, rgba: &mut [f32]) {
        simd::scale_rgba(rgba, self.scale);
    }
}

#[derive(Debug)]
struct ScaleOffsetKernel {
    scale: [f32; 4],
    offset: [f32; 4],
}

impl Kernel for ScaleOffsetKernel {
    fn apply(&self, rgba: &mut [f32]) {
        simd::scale_offset_rgba(rgba, self.scale, self.offset);
    }
}

#[derive(Debug)]
struct MatrixKernel {
    rows: [[f32; 4]; 4],
    offset: [f32; 4],
    /// Alpha row is a passthrough.
    rgb_only: bool,
}

impl Kernel for MatrixKernel {
    fn apply(&self, rgba: &mut [f32]) {
        if self.rgb_only {
            simd::matrix_offset_rgb(rgba, &self.rows, self.offset);
        } else {
            simd::matrix_offset_rgba(rgba, &self.rows, self.offset);
        }
    }
}

fn range_kernel(d: &RangeOpData) -> Box<dyn Kernel> {
    let (scale, offset) = (d.scale() as f32, d.offset() as f32);
    let lower = d.lower_bound().map_or(f32::NEG_INFINITY, |v| v as f32);
    let upper = d.upper_bound().map_or(f32::INFINITY, |v| v as f32);
    if scale == 1.0 && offset == 0.0 && lower == 0.0 && upper == f32::INFINITY {
        return Box::new(ClampNegsKernel);
    }
    Box::new(RangeKernel {
        scale,
        offset,
        lower,
        upper,
    })
}

/// `max(0, x)` on RGB.
#[derive(Debug)]
struct ClampNegsKernel;

impl Kernel for ClampNegsKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            px[0] = px[0].max(0.0);
            px[1] = px[1].max(0.0);
            px[2] = px[2].max(0.0);
        }
    }
}

#[derive(Debug)]
struct RangeKernel {
    scale: f32,
    offset: f32,
    lower: f32,
    upper: f32,
}

impl Kernel for RangeKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for v in &mut px[..3] {
                *v = (*v * self.scale + self.offset).max(self.lower).min(self.upper);
            }
        }
    }
}

// ============================================================================
// Lookup tables
// ============================================================================

#[derive(Debug)]
struct Lut1DKernel {
    lut: Lut1D,
}

impl Kernel for Lut1DKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..3 {
                px[c] = self.lut.apply_channel(c, px[c]);
            }
        }
    }
}

/// Exact inverse; the search tables are built on first use.
#[derive(Debug)]
struct Lut1DInverseKernel {
    inverse: Lut1DInverse,
}

impl Kernel for Lut1DInverseKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..3 {
                px[c] = self.inverse.apply_channel(c, px[c]);
            }
        }
    }
}

#[derive(Debug)]
struct Lut3DKernel {
    lut: Lut3D,
}

impl Kernel for Lut3DKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let out = self.lut.apply([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
    }
}

#[derive(Debug)]
struct Lut3DInverseKernel {
    lut: Lut3D,
}

impl Kernel for Lut3DInverseKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let out = self.lut.invert_point([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
    }
}

// ============================================================================
// Gamma and exponent
// ============================================================================

type PowFn = fn(f32, f32) -> f32;

fn clamp_pow(x: f32, e: f32) -> f32 {
    x.max(0.0).powf(e)
}

fn mirror_pow(x: f32, e: f32) -> f32 {
    x.abs().powf(e).copysign(x)
}

fn pass_thru_pow(x: f32, e: f32) -> f32 {
    if x < 0.0 { x } else { x.powf(e) }
}

/// Per-channel power with a fixed negative policy. Alpha is skipped when
/// its exponent is 1.
#[derive(Debug)]
struct PowerKernel {
    exponent: [f32; 4],
    channels: usize,
    curve: PowFn,
}

impl Kernel for PowerKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..self.channels {
                px[c] = (self.curve)(px[c], self.exponent[c]);
            }
        }
    }
}

type MoncurveFn = fn(&MoncurveCoefs, f32) -> f32;

fn moncurve_fwd(k: &MoncurveCoefs, x: f32) -> f32 {
    k.forward(x)
}

fn moncurve_rev(k: &MoncurveCoefs, y: f32) -> f32 {
    k.reverse(y)
}

fn moncurve_mirror_fwd(k: &MoncurveCoefs, x: f32) -> f32 {
    k.forward(x.abs()).copysign(x)
}

fn moncurve_mirror_rev(k: &MoncurveCoefs, y: f32) -> f32 {
    k.reverse(y.abs()).copysign(y)
}

#[derive(Debug)]
struct MoncurveKernel {
    coefs: [MoncurveCoefs; 4],
    channels: usize,
    curve: MoncurveFn,
}

impl Kernel for MoncurveKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            for c in 0..self.channels {
                px[c] = (self.curve)(&self.coefs[c], px[c]);
            }
        }
    }
}

fn gamma_kernel(d: &GammaOpData) -> Box<dyn Kernel> {
    let channels = if d.params[3] == GammaParams::IDENTITY { 3 } else { 4 };
    let style = d.style;
    if style.is_moncurve() {
        let curve: MoncurveFn = match style {
            GammaStyle::MoncurveFwd => moncurve_fwd,
            GammaStyle::MoncurveRev => moncurve_rev,
            GammaStyle::MoncurveMirrorFwd => moncurve_mirror_fwd,
            _ => moncurve_mirror_rev,
        };
        return Box::new(MoncurveKernel {
            coefs: d.params.map(MoncurveCoefs::new),
            channels,
            curve,
        });
    }
    let exponent = d.params.map(|p| {
        let g = p.gamma as f32;
        if style.is_forward() { g } else { 1.0 / g }
    });
    let curve: PowFn = if style.is_mirror() {
        mirror_pow
    } else if style.is_pass_thru() {
        pass_thru_pow
    } else {
        clamp_pow
    };
    Box::new(PowerKernel {
        exponent,
        channels,
        curve,
    })
}

// ============================================================================
// Log
// ============================================================================

#[derive(Debug)]
struct LogKernel {
    channels: [LogChannel; 3],
    to_log: bool,
}

impl LogKernel {
    fn new(d: &LogOpData) -> Self {
        Self {
            channels: d.channels(),
            to_log: d.direction.is_forward(),
        }
    }
}

impl Kernel for LogKernel {
    fn apply(&self, rgba: &mut [f32]) {
        if self.to_log {
            for px in rgba.chunks_exact_mut(4) {
                for c in 0..3 {
                    px[c] = self.channels[c].lin_to_log(px[c]);
                }
            }
        } else {
            for px in rgba.chunks_exact_mut(4) {
                for c in 0..3 {
                    px[c] = self.channels[c].log_to_lin(px[c]);
                }
            }
        }
    }
}

// ============================================================================
// CDL
// ============================================================================

/// Reverse styles divide by parameters floored at this value.
pub(crate) const CDL_RECIPROCAL_FLOOR: f32 = 1e-2;

fn reciprocal(x: f32) -> f32 {
    1.0 / x.max(CDL_RECIPROCAL_FLOOR)
}

/// Slope, offset, power and saturation with the style's clamping.
///
/// Reverse styles hold reciprocal slope, power and saturation and a negated
/// offset.
#[derive(Debug)]
struct CdlKernel {
    slope: [f32; 3],
    offset: [f32; 3],
    power: [f32; 3],
    saturation: f32,
    clamp: bool,
    forward: bool,
}

impl CdlKernel {
    fn new(d: &CdlOpData) -> Self {
        let slope = d.slope.map(|v| v as f32);
        let offset = d.offset.map(|v| v as f32);
        let power = d.power.map(|v| v as f32);
        let saturation = d.saturation as f32;
        let forward = d.style.is_forward();
        if forward {
            Self {
                slope,
                offset,
                power,
                saturation,
                clamp: d.style.is_clamping(),
                forward,
            }
        } else {
            Self {
                slope: slope.map(reciprocal),
                offset: offset.map(|v| -v),
                power: power.map(reciprocal),
                saturation: reciprocal(saturation),
                clamp: d.style.is_clamping(),
                forward,
            }
        }
    }

    /// Clamps to `[0, 1]` with NaN mapped to 0, like the range kernel the
    /// clamping styles simplify into.
    #[inline]
    fn clamp(&self, px: &mut [f32]) {
        if self.clamp {
            for v in &mut px[..3] {
                *v = saturate(*v);
            }
        }
    }

    /// Negatives and NaN pass the no-clamp power untouched, so a unit power
    /// behaves like the matrices it simplifies into.
    #[inline]
    fn power(&self, px: &mut [f32]) {
        for c in 0..3 {
            let v = px[c];
            px[c] = if self.clamp {
                saturate(v).powf(self.power[c])
            } else if !(v >= 0.0) {
                v
            } else {
                v.powf(self.power[c])
            };
        }
    }

    #[inline]
    fn apply_saturation(&self, px: &mut [f32]) {
        if self.saturation == 1.0 {
            return;
        }
        let luma = px[0] * REC709_LUMA[0] + px[1] * REC709_LUMA[1] + px[2] * REC709_LUMA[2];
        for v in &mut px[..3] {
            *v = luma + self.saturation * (*v - luma);
        }
    }
}

impl Kernel for CdlKernel {
    fn apply(&self, rgba: &mut [f32]) {
        if self.forward {
            for px in rgba.chunks_exact_mut(4) {
                for c in 0..3 {
                    px[c] = px[c] * self.slope[c] + self.offset[c];
                }
                self.power(px);
                self.apply_saturation(px);
                self.clamp(px);
            }
        } else {
            for px in rgba.chunks_exact_mut(4) {
                self.clamp(px);
                self.apply_saturation(px);
                self.power(px);
                for c in 0..3 {
                    px[c] = (px[c] + self.offset[c]) * self.slope[c];
                }
                self.clamp(px);
            }
        }
    }
}

// ============================================================================
// Exposure and contrast
// ============================================================================

/// Reads exposure, contrast and gamma from their handles on every call, so
/// dynamic edits are seen by the next apply.
#[derive(Debug)]
struct ExposureContrastKernel {
    style: ExposureContrastStyle,
    forward: bool,
    exposure: DynamicProperty,
    contrast: DynamicProperty,
    gamma: DynamicProperty,
    /// Pivot in the style's encoding.
    pivot: f32,
    log_exposure_step: f32,
}

impl ExposureContrastKernel {
    fn new(d: &ExposureContrastOpData) -> Self {
        let pivot = d.pivot.max(MIN_PIVOT);
        let pivot = match d.style {
            ExposureContrastStyle::Linear => pivot,
            ExposureContrastStyle::Video => pivot.powf(VIDEO_OETF_POWER),
            ExposureContrastStyle::Logarithmic => {
                ((pivot / 0.18).log2() * d.log_exposure_step + d.log_mid_gray).max(0.0)
            }
        };
        Self {
            style: d.style,
            forward: d.direction.is_forward(),
            exposure: d.exposure.clone(),
            contrast: d.contrast.clone(),
            gamma: d.gamma.clone(),
            pivot: pivot as f32,
            log_exposure_step: d.log_exposure_step as f32,
        }
    }

    fn apply_gain(&self, rgba: &mut [f32], gain: f32) {
        let contrast = (self.contrast.double() * self.gamma.double()).max(MIN_CONTRAST) as f32;
        let pivot = self.pivot;
        if self.forward {
            if contrast == 1.0 {
                simd::scale_rgba(rgba, [gain, gain, gain, 1.0]);
                return;
            }
            let k = gain / pivot;
            for px in rgba.chunks_exact_mut(4) {
                for v in &mut px[..3] {
                    *v = (*v * k).max(0.0).powf(contrast) * pivot;
                }
            }
        } else {
            if contrast == 1.0 {
                let inv = 1.0 / gain;
                simd::scale_rgba(rgba, [inv, inv, inv, 1.0]);
                return;
            }
            let inv_contrast = 1.0 / contrast;
            let out_scale = pivot / gain;
            for px in rgba.chunks_exact_mut(4) {
                for v in &mut px[..3] {
                    *v = (*v / pivot).max(0.0).powf(inv_contrast) * out_scale;
                }
            }
        }
    }

    fn apply_log(&self, rgba: &mut [f32]) {
        let exposure = self.exposure.double() as f32 * self.log_exposure_step;
        let product = self.contrast.double() * self.gamma.double();
        let pivot = self.pivot;
        let (scale, offset) = if self.forward {
            let contrast = product.max(MIN_CONTRAST) as f32;
            (contrast, (exposure - pivot) * contrast + pivot)
        } else {
            let inv_contrast = (1.0 / product).max(MIN_CONTRAST) as f32;
            (inv_contrast, pivot - pivot * inv_contrast - exposure)
        };
        simd::scale_offset_rgba(rgba, [scale, scale, scale, 1.0], [offset, offset, offset, 0.0]);
    }
}

impl Kernel for ExposureContrastKernel {
    fn apply(&self, rgba: &mut [f32]) {
        let stops = self.exposure.double();
        match self.style {
            ExposureContrastStyle::Linear => self.apply_gain(rgba, 2f64.powf(stops) as f32),
            ExposureContrastStyle::Video => {
                self.apply_gain(rgba, 2f64.powf(stops).powf(VIDEO_OETF_POWER) as f32)
            }
            ExposureContrastStyle::Logarithmic => self.apply_log(rgba),
        }
    }
}

// ============================================================================
// Fixed functions
// ============================================================================

fn fixed_function_kernel(d: &FixedFunctionOpData) -> OpResult<Box<dyn Kernel>> {
    use FixedFunctionStyle as S;
    if let Some(power) = d.surround_power() {
        let (weights, min_lum) = surround_luma(d.style);
        return Ok(Box::new(SurroundKernel {
            power: power as f32,
            weights,
            min_lum,
        }));
    }
    let pixel: PixelFn = match d.style {
        S::RgbToHsv => rgb_to_hsv,
        S::HsvToRgb => hsv_to_rgb,
        S::XyzToXyy => xyz_to_xyy,
        S::XyyToXyz => xyy_to_xyz,
        S::XyzToUvy => xyz_to_uvy,
        S::UvyToXyz => uvy_to_xyz,
        S::XyzToLuv => xyz_to_luv,
        S::LuvToXyz => luv_to_xyz,
        other => {
            return Err(OpError::invalid(format!(
                "fixed function {} is missing its parameter",
                other.name()
            )));
        }
    };
    Ok(Box::new(PixelKernel { pixel }))
}

type PixelFn = fn([f32; 3]) -> [f32; 3];

/// Applies an RGB function to every pixel; alpha passes through.
#[derive(Debug)]
struct PixelKernel {
    pixel: PixelFn,
}

impl Kernel for PixelKernel {
    fn apply(&self, rgba: &mut [f32]) {
        for px in rgba.chunks_exact_mut(4) {
            let out = (self.pixel)([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
    }
}

const REC2100_LUMA: [f32; 3] = [0.2627, 0.6780, 0.0593];
const AP1_LUMA: [f32; 3] = [0.272_228_72, 0.674_081_8, 0.053_689_517];

/// Luminance weights and floor of a surround style.
pub(crate) fn surround_luma(style: FixedFunctionStyle) -> ([f32; 3], f32) {
    match style {
        FixedFunctionStyle::Rec2100SurroundFwd | FixedFunctionStyle::Rec2100SurroundInv => {
            (REC2100_LUMA, 1e-4)
        }
        _ => (AP1_LUMA, 1e-10),
    }
}

/// `rgb · Y^power` with luminance floored at `min_lum`.
#[derive(Debug)]
struct SurroundKernel {
    power: f32,
    weights: [f32; 3],
    min_lum: f32,
}

impl Kernel for SurroundKernel {
    fn apply(&self, rgba: &mut [f32]) {
        let w = self.weights;
        for px in rgba.chunks_exact_mut(4) {
            let y = (w[0] * px[0] + w[1] * px[1] + w[2] * px[2]).max(self.min_lum);
            let gain = y.powf(self.power);
            px[0] *= gain;
            px[1] *= gain;
            px[2] *= gain;
        }
    }
}

/// Extended-range HSV: hue in `[0, 1)`, saturation up to 2 for mixed-sign
/// input.
pub(crate) fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let min = r.min(g).min(b);
    let max = r.max(g).max(b);
    let mut val = max;
    let mut sat = 0.0;
    let mut hue = 0.0;
    if min != max {
        let delta = max - min;
        if max != 0.0 {
            sat = delta / max;
        }
        hue = if r == max {
            (g - b) / delta
        } else if g == max {
            2.0 + (b - r) / delta
        } else {
            4.0 + (r - g) / delta
        };
        if hue < 0.0 {
            hue += 6.0;
        }
        hue /= 6.0;
    }
    if min < 0.0 {
        val += min;
    }
    if -min > max {
        sat = (max - min) / -min;
    }
    [hue, sat, val]
}

/// Largest saturation accepted by [`hsv_to_rgb`].
pub(crate) const MAX_HSV_SAT: f32 = 1.999;

pub(crate) fn hsv_to_rgb([h, s, v]: [f32; 3]) -> [f32; 3] {
    let hue = (h - h.floor()) * 6.0;
    let sat = s.clamp(0.0, MAX_HSV_SAT);
    let r = ((hue - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let g = (2.0 - (hue - 2.0).abs()).clamp(0.0, 1.0);
    let b = (2.0 - (hue - 4.0).abs()).clamp(0.0, 1.0);
    let mut max = v;
    let mut min = v * (1.0 - sat);
    if sat > 1.0 {
        min = v * (1.0 - sat) / (2.0 - sat);
        max = v - min;
    }
    if v < 0.0 {
        min = v / (2.0 - sat);
        max = v - min;
    }
    let delta = max - min;
    [r * delta + min, g * delta + min, b * delta + min]
}

#[inline]
fn safe_recip(d: f32) -> f32 {
    if d == 0.0 { 0.0 } else { 1.0 / d }
}

fn xyz_to_xyy([x, y, z]: [f32; 3]) -> [f32; 3] {
    let d = safe_recip(x + y + z);
    [x * d, y * d, y]
}

fn xyy_to_xyz([x, y, big_y]: [f32; 3]) -> [f32; 3] {
    let d = safe_recip(y);
    [big_y * x * d, big_y, big_y * (1.0 - x - y) * d]
}

fn xyz_to_uvy([x, y, z]: [f32; 3]) -> [f32; 3] {
    let d = safe_recip(x + 15.0 * y + 3.0 * z);
    [4.0 * x * d, 9.0 * y * d, y]
}

fn uvy_to_xyz([u, v, y]: [f32; 3]) -> [f32; 3] {
    let d = safe_recip(v);
    [
        2.25 * y * u * d,
        y,
        0.75 * y * (4.0 - u - 6.666_666_7 * v) * d,
    ]
}

/// u'v' of the D65 white point.
pub(crate) const D65_U: f32 = 0.197_830_01;
pub(crate) const D65_V: f32 = 0.468_319_99;

/// CIE κ and ε scaled for L* in `[0, 1]`.
pub(crate) const LUV_KAPPA: f32 = 9.032_963;
pub(crate) const LUV_EPSILON: f32 = 0.008_856_452;

fn xyz_to_luv(xyz: [f32; 3]) -> [f32; 3] {
    let [u, v, y] = xyz_to_uvy(xyz);
    let l = if y <= LUV_EPSILON {
        LUV_KAPPA * y
    } else {
        1.16 * y.powf(1.0 / 3.0) - 0.16
    };
    [l, 13.0 * l * (u - D65_U), 13.0 * l * (v - D65_V)]
}

fn luv_to_xyz([l, us, vs]: [f32; 3]) -> [f32; 3] {
    let d = if l == 0.0 { 0.0 } else { 1.0 / (13.0 * l) };
    let u = us * d + D65_U;
    let v = vs * d + D65_V;
    let t = (l + 0.16) / 1.16;
    let y = if l <= 0.08 { l / LUV_KAPPA } else { t * t * t };
    let dd = if v == 0.0 { 0.0 } else { 0.25 / v };
    [9.0 * y * u * dd, y, y * (12.0 - 3.0 * u - 20.0 * v) * dd]
}

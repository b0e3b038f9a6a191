//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod glsl;

use vfx_colorops::{CpuProcessor, OpPipeline, OptimizationFlags};
use vfx_core::BitDepth;

/// Channel values spanning negatives, the unit interval, overrange,
/// half-float boundaries and NaN.
pub const CHANNEL_VALUES: [f32; 15] = [
    f32::NAN, -1.5, -0.1, 0.0, 6.1e-5, 0.001, 0.02, 0.18, 0.5, 0.75, 1.0, 1.2, 4.0, 100.0,
    65504.0,
];

/// Channel values inside `[0, 1]`.
pub const UNIT_VALUES: [f32; 9] = [0.0, 0.001, 0.02, 0.1, 0.18, 0.5, 0.75, 0.9, 1.0];

/// Pixels combining `values` per channel with a rotating pattern, alpha 1.
pub fn pixels(values: &[f32]) -> Vec<[f32; 4]> {
    let n = values.len();
    let mut out = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            out.push([values[i], values[j], values[(i + j) % n], 1.0]);
        }
    }
    out
}

/// CPU processor over float buffers.
pub fn float_cpu(pipeline: &OpPipeline, flags: OptimizationFlags) -> CpuProcessor {
    CpuProcessor::new(pipeline, BitDepth::F32, BitDepth::F32, flags).unwrap()
}

/// Runs `cpu` on one pixel.
pub fn run(cpu: &CpuProcessor, mut px: [f32; 4]) -> [f32; 4] {
    cpu.apply_rgba(&mut px);
    px
}

/// Whether `a` and `b` agree within `tol`, scaled by magnitude above 1.
/// NaN only matches NaN.
pub fn close(a: f32, b: f32, tol: f32) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a == b {
        return true;
    }
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

/// Panics with context when two pixels differ beyond `tol`.
pub fn assert_pixels_close(actual: [f32; 4], expected: [f32; 4], tol: f32, input: [f32; 4]) {
    for c in 0..4 {
        assert!(
            close(actual[c], expected[c], tol),
            "channel {c} of {input:?}: {actual:?} vs {expected:?} (tol {tol})"
        );
    }
}

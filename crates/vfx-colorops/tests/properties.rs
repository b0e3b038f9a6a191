//! Properties every optimization level must keep: optimized pipelines
//! evaluate like the raw ones, inverse pairs collapse to clamps, identities
//! vanish, and processors are shared only when that is safe.

mod support;

use std::sync::Arc;
use support::{CHANNEL_VALUES, UNIT_VALUES, assert_pixels_close, close, float_cpu, pixels, run};
use vfx_colorops::opdata::{
    CdlOpData, CdlStyle, ExponentOpData, ExposureContrastOpData, ExposureContrastStyle,
    FixedFunctionOpData, FixedFunctionStyle, GammaOpData, GammaStyle, LogOpData, Lut1DOpData, Lut3DOpData, MatrixOpData, OpData, OpType,
    RangeOpData, TransformDirection,
};
use vfx_colorops::optimizer::MAX_OPTIMIZATION_PASSES;
use vfx_colorops::{
    CacheConfig, CpuProcessor, DynamicPropertyType, OpPipeline, OptimizationFlags, Processor,
};
use vfx_core::{BitDepth, PackedImage, PackedImageMut};
use vfx_lut::{Lut1D, Lut3D};

/// Values that keep cross-channel rounding small.
const MIXING_VALUES: [f32; 9] = [-1.5, -0.1, 0.0, 0.001, 0.18, 0.5, 1.0, 1.2, 4.0];

/// Values mixing NaN with in-range and out-of-range samples.
const NAN_VALUES: [f32; 7] = [f32::NAN, -0.1, 0.0, 0.18, 0.5, 1.0, 4.0];

const MIX: [[f64; 3]; 3] = [[0.6, 0.3, 0.1], [0.2, 0.7, 0.1], [0.05, 0.15, 0.8]];

fn pipeline(ops: Vec<OpData>) -> OpPipeline {
    let mut p = OpPipeline::new();
    for op in ops {
        p.append(op);
    }
    p
}

fn types(p: &OpPipeline) -> Vec<OpType> {
    p.iter().map(|op| op.op_type()).collect()
}

fn finalized(p: &OpPipeline, flags: OptimizationFlags) -> OpPipeline {
    let mut out = p.clone();
    out.finalize(flags).unwrap();
    out
}

fn assert_same_results(p: &OpPipeline, flags: OptimizationFlags, values: &[f32], tol: f32) {
    let optimized = float_cpu(p, flags);
    let reference = float_cpu(p, OptimizationFlags::NONE);
    for px in pixels(values) {
        let a = run(&optimized, px);
        let b = run(&reference, px);
        assert_pixels_close(a, b, tol, px);
    }
}

// ============================================================================
// Semantic preservation
// ============================================================================

const PRESETS: [OptimizationFlags; 4] = [
    OptimizationFlags::LOSSLESS,
    OptimizationFlags::VERY_GOOD,
    OptimizationFlags::GOOD,
    OptimizationFlags::DRAFT,
];

#[test]
fn matrices_keep_results() {
    let p = pipeline(vec![
        MatrixOpData::from_rgb(MIX).into(),
        MatrixOpData::scale_offset([1.1, 0.9, 1.0, 1.0], [0.01, 0.0, -0.02, 0.0]).into(),
        MatrixOpData::fit(0.0, 1.0, 0.1, 0.9).into(),
        MatrixOpData::from_rgb(MIX)
            .with_direction(TransformDirection::Inverse)
            .into(),
    ]);
    for flags in PRESETS {
        assert_same_results(&p, flags, &MIXING_VALUES, 1e-4);
    }
    assert_eq!(types(&finalized(&p, OptimizationFlags::LOSSLESS)), [OpType::Matrix]);
}

#[test]
fn ranges_keep_results() {
    let p = pipeline(vec![
        RangeOpData::new(Some(0.0), Some(1.0), Some(0.1), Some(0.9)).into(),
        RangeOpData::clamp(Some(-0.5), None).into(),
        RangeOpData::new(Some(0.2), Some(0.8), Some(0.0), Some(1.0)).into(),
    ]);
    for flags in PRESETS {
        assert_same_results(&p, flags, &CHANNEL_VALUES, 1e-5);
    }
}

#[test]
fn powers_keep_results() {
    let p = pipeline(vec![
        ExponentOpData::new([2.0, 2.0, 2.0, 1.0]).into(),
        ExponentOpData::new([0.5, 0.5, 0.5, 1.0]).into(),
        GammaOpData::basic(GammaStyle::BasicFwd, [2.4; 3]).into(),
        GammaOpData::basic(GammaStyle::BasicRev, [2.4; 3]).into(),
        GammaOpData::moncurve(GammaStyle::MoncurveFwd, [2.4; 3], [0.055; 3]).into(),
    ]);
    for flags in PRESETS {
        assert_same_results(&p, flags, &CHANNEL_VALUES, 1e-5);
    }
}

#[test]
fn gammas_keep_negatives_without_identity_rewrite() {
    let p = pipeline(vec![
        GammaOpData::basic(GammaStyle::BasicMirrorFwd, [2.2; 3]).into(),
        GammaOpData::basic(GammaStyle::BasicMirrorRev, [1.1; 3]).into(),
        GammaOpData::basic(GammaStyle::BasicMirrorRev, [2.0; 3]).into(),
    ]);
    let flags = OptimizationFlags::LOSSLESS.without(OptimizationFlags::IDENTITY_GAMMA);
    assert_same_results(&p, flags, &MIXING_VALUES, 1e-5);
}

#[test]
fn logs_keep_results() {
    let log = LogOpData::with_base(2.0);
    let p = pipeline(vec![
        log.clone().into(),
        MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).into(),
        MatrixOpData::scale([0.5, 0.5, 0.5, 1.0]).into(),
        log.with_direction(TransformDirection::Inverse).into(),
    ]);
    for flags in PRESETS {
        assert_same_results(&p, flags, &CHANNEL_VALUES, 1e-5);
    }
    assert_eq!(types(&finalized(&p, OptimizationFlags::LOSSLESS)), [OpType::Range]);
}

#[test]
fn grading_keeps_results() {
    let p = pipeline(vec![
        CdlOpData::new(
            CdlStyle::NoClampFwd,
            [1.2, 0.95, 1.05],
            [0.02, -0.01, 0.0],
            [1.0; 3],
            0.9,
        )
        .into(),
        MatrixOpData::from_rgb(MIX).into(),
        ExposureContrastOpData::new(ExposureContrastStyle::Linear)
            .with_values(0.5, 1.0, 1.0)
            .into(),
    ]);
    for flags in PRESETS {
        assert_same_results(&p, flags, &MIXING_VALUES, 1e-4);
    }
}

#[test]
fn lut_chains_stay_close() {
    let lut = |f: fn(f32) -> f32, size| Lut1D::from_fn(size, move |x| [f(x); 3]);
    let p = pipeline(vec![
        Lut1DOpData::new(lut(|x| 0.5 * x + 0.5 * x * x, 1024)).into(),
        Lut1DOpData::new(Lut1D::gamma(1024, 1.2)).into(),
        Lut1DOpData::new(lut(|x| 0.1 + 0.8 * x, 256))
            .with_direction(TransformDirection::Inverse)
            .into(),
    ]);
    assert_same_results(&p, OptimizationFlags::LOSSLESS, &UNIT_VALUES, 1e-6);
    for flags in [OptimizationFlags::VERY_GOOD, OptimizationFlags::DRAFT] {
        assert_same_results(&p, flags, &UNIT_VALUES, 1e-3);
    }
    assert_eq!(types(&finalized(&p, OptimizationFlags::VERY_GOOD)), [OpType::Lut1D]);
}

#[test]
fn affine_cubes_compose_exactly() {
    let first = Lut3D::from_fn(17, |[r, g, b]| [0.8 * r + 0.1, 0.9 * g, 0.5 * b + 0.25]);
    let second = Lut3D::from_fn(17, |[r, g, b]| {
        [0.7 * r + 0.3 * g, 0.2 * r + 0.8 * b, 0.5 * g + 0.5 * b]
    });
    let p = pipeline(vec![Lut3DOpData::new(first).into(), Lut3DOpData::new(second).into()]);
    for flags in [OptimizationFlags::GOOD, OptimizationFlags::DRAFT] {
        assert_same_results(&p, flags, &UNIT_VALUES, 1e-5);
        assert_eq!(types(&finalized(&p, flags)), [OpType::Lut3D]);
    }
    assert_eq!(
        types(&finalized(&p, OptimizationFlags::VERY_GOOD)),
        [OpType::Lut3D, OpType::Lut3D]
    );
}

#[test]
fn nan_survives_scale_composition() {
    let p = pipeline(vec![
        MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).into(),
        MatrixOpData::scale([3.0, 3.0, 3.0, 1.0]).into(),
    ]);
    let optimized = float_cpu(&p, OptimizationFlags::LOSSLESS);
    let reference = float_cpu(&p, OptimizationFlags::NONE);
    let px = [f32::NAN, 0.5, 1.0, 1.0];
    let a = run(&optimized, px);
    assert_pixels_close(a, run(&reference, px), 1e-6, px);
    assert!(a[0].is_nan());
    assert_eq!(&a[1..], &[3.0, 6.0, 1.0]);
}

#[test]
fn nan_inputs_keep_results() {
    let cases: Vec<(&str, OpPipeline, f32)> = vec![
        (
            "matrix chain",
            pipeline(vec![
                MatrixOpData::scale_offset([1.1, 0.9, 1.0, 1.0], [0.01, 0.0, -0.02, 0.0]).into(),
                MatrixOpData::from_rgb(MIX).into(),
                MatrixOpData::fit(0.0, 1.0, 0.1, 0.9).into(),
            ]),
            1e-4,
        ),
        (
            "clamping cdl",
            pipeline(vec![
                CdlOpData::new(
                    CdlStyle::V1_2Fwd,
                    [1.35, 1.1, 0.071],
                    [0.05, -0.23, 0.11],
                    [1.0; 3],
                    0.8,
                )
                .into(),
            ]),
            1e-5,
        ),
        (
            "unclamped grade",
            pipeline(vec![
                CdlOpData::new(CdlStyle::NoClampFwd, [1.2, 0.95, 1.05], [0.02, -0.01, 0.0], [1.0; 3], 0.9)
                    .into(),
                MatrixOpData::from_rgb(MIX).into(),
                ExposureContrastOpData::new(ExposureContrastStyle::Linear)
                    .with_values(0.5, 1.0, 1.0)
                    .into(),
            ]),
            1e-4,
        ),
        (
            "power chain",
            pipeline(vec![
                ExponentOpData::new([2.0, 2.0, 2.0, 1.0]).into(),
                GammaOpData::basic(GammaStyle::BasicFwd, [1.5; 3]).into(),
                GammaOpData::basic(GammaStyle::BasicRev, [1.5; 3]).into(),
            ]),
            1e-5,
        ),
        (
            "lut chain",
            pipeline(vec![
                Lut1DOpData::new(Lut1D::gamma(1024, 1.2)).into(),
                Lut1DOpData::new(Lut1D::from_fn(256, |x| [0.1 + 0.8 * x; 3]))
                    .with_direction(TransformDirection::Inverse)
                    .into(),
            ]),
            1e-3,
        ),
        (
            "fixed function",
            pipeline(vec![
                FixedFunctionOpData::from_style(FixedFunctionStyle::XyzToXyy).into(),
                MatrixOpData::scale_offset([1.1, 0.9, 1.0, 1.0], [0.01, 0.0, -0.02, 0.0]).into(),
                MatrixOpData::from_rgb(MIX).into(),
            ]),
            1e-4,
        ),
    ];
    for (name, p, tol) in cases {
        for flags in PRESETS {
            let optimized = float_cpu(&p, flags);
            let reference = float_cpu(&p, OptimizationFlags::NONE);
            for px in pixels(&NAN_VALUES) {
                let a = run(&optimized, px);
                let b = run(&reference, px);
                assert!(
                    (0..4).all(|c| close(a[c], b[c], tol)),
                    "{name} under {flags:?} on {px:?}: {a:?} vs {b:?}"
                );
            }
        }
    }
}

#[test]
fn clamping_cdl_maps_nan_to_zero_when_simplified() {
    let p = pipeline(vec![
        CdlOpData::new(CdlStyle::V1_2Fwd, [1.35, 1.1, 0.071], [0.05, -0.23, 0.11], [1.0; 3], 1.0)
            .into(),
    ]);
    let px = [f32::NAN, 0.5, 0.5, 1.0];
    for flags in [OptimizationFlags::NONE, OptimizationFlags::DEFAULT] {
        let out = run(&float_cpu(&p, flags), px);
        assert_pixels_close(out, [0.0, 0.32, 0.1455, 1.0], 1e-6, px);
    }
}

// ============================================================================
// Inverse pairs and identities
// ============================================================================

#[test]
fn inverse_pairs_collapse_to_a_clamp() {
    let cases: Vec<(OpData, OptimizationFlags)> = vec![
        (MatrixOpData::from_rgb(MIX).into(), OptimizationFlags::PAIR_IDENTITY_MATRIX),
        (
            ExponentOpData::new([2.2, 2.2, 2.2, 1.0]).into(),
            OptimizationFlags::PAIR_IDENTITY_EXPONENT,
        ),
        (
            GammaOpData::basic(GammaStyle::BasicFwd, [2.4; 3]).into(),
            OptimizationFlags::PAIR_IDENTITY_GAMMA,
        ),
        (LogOpData::with_base(10.0).into(), OptimizationFlags::PAIR_IDENTITY_LOG),
        (
            CdlOpData::new(CdlStyle::V1_2Fwd, [1.1; 3], [0.05; 3], [1.2; 3], 0.9).into(),
            OptimizationFlags::PAIR_IDENTITY_CDL,
        ),
        (
            Lut1DOpData::new(Lut1D::gamma(64, 2.0)).into(),
            OptimizationFlags::PAIR_IDENTITY_LUT1D,
        ),
    ];
    for (data, flags) in cases {
        let op = vfx_colorops::Op::new(data);
        let mut p = OpPipeline::new();
        p.append(op.clone());
        p.append(op.inverse());
        let out = finalized(&p, flags);
        assert!(out.len() <= 1, "{:?} left {:?}", op.op_type(), types(&out));
        assert!(
            out.iter().all(|o| o.op_type() == OpType::Range),
            "{:?} left {:?}",
            op.op_type(),
            types(&out)
        );
    }
}

#[test]
fn lut_pair_bounds_follow_direction() {
    let lut = Lut1D::from_fn(128, |x| [0.1 + 0.8 * x; 3]);
    let (lo, hi) = lut.output_range();
    let fwd = Lut1DOpData::new(lut);
    let inv = fwd.clone().with_direction(TransformDirection::Inverse);
    let bounds = |p: &OpPipeline| match p.get(0).map(|op| op.data()) {
        Some(OpData::Range(r)) => (r.lower_bound(), r.upper_bound()),
        other => panic!("expected a range, got {other:?}"),
    };
    let flags = OptimizationFlags::PAIR_IDENTITY_LUT1D;

    let fwd_inv = finalized(&pipeline(vec![fwd.clone().into(), inv.clone().into()]), flags);
    assert_eq!(bounds(&fwd_inv), (Some(0.0), Some(1.0)));

    let inv_fwd = finalized(&pipeline(vec![inv.into(), fwd.into()]), flags);
    assert_eq!(bounds(&inv_fwd), (Some(lo as f64), Some(hi as f64)));
}

#[test]
fn identities_vanish() {
    let cases: Vec<OpData> = vec![
        MatrixOpData::identity().into(),
        RangeOpData::no_op().into(),
        Lut1DOpData::new(Lut1D::half_domain_identity()).into(),
        GammaOpData::basic(GammaStyle::BasicFwd, [1.0; 3]).into(),
        CdlOpData::new(CdlStyle::NoClampFwd, [1.0; 3], [0.0; 3], [1.0; 3], 1.0).into(),
    ];
    for data in cases {
        let p = pipeline(vec![data]);
        let out = finalized(&p, OptimizationFlags::LOSSLESS);
        assert!(out.is_empty(), "{:?} left {:?}", types(&p), types(&out));
    }
}

#[test]
fn normal_domain_identity_lut_keeps_its_clamp() {
    let p = pipeline(vec![Lut1DOpData::new(Lut1D::identity(256)).into()]);
    let out = finalized(&p, OptimizationFlags::LOSSLESS);
    assert_eq!(types(&out), [OpType::Range]);
    assert_same_results(&p, OptimizationFlags::LOSSLESS, &CHANNEL_VALUES, 1e-6);
}

// ============================================================================
// Bit-depth prefix
// ============================================================================

#[test]
fn baked_prefix_matches_unbaked_codes() {
    let p = pipeline(vec![
        GammaOpData::basic(GammaStyle::BasicFwd, [2.2, 2.4, 2.6]).into(),
        RangeOpData::new(Some(0.0), Some(1.0), Some(0.05), Some(0.95)).into(),
        MatrixOpData::from_rgb(MIX).into(),
    ]);
    let baked_flags = OptimizationFlags::DEFAULT;
    let plain_flags = OptimizationFlags::DEFAULT.without(OptimizationFlags::COMP_SEPARABLE_PREFIX);

    for bd in [BitDepth::U8, BitDepth::U10, BitDepth::U12, BitDepth::U16] {
        let codes = bd.code_count().unwrap();
        let baked = CpuProcessor::new(&p, bd, BitDepth::F32, baked_flags).unwrap();
        let plain = CpuProcessor::new(&p, bd, BitDepth::F32, plain_flags).unwrap();
        assert_eq!(baked.pipeline().get(0).map(|op| op.op_type()), Some(OpType::Lut1D));
        match baked.pipeline().get(0).map(|op| op.data()) {
            Some(OpData::Lut1D(l)) => assert_eq!(l.lut.size(), codes),
            other => panic!("expected a baked table, got {other:?}"),
        }
        assert_eq!(plain.pipeline().get(0).map(|op| op.op_type()), Some(OpType::Gamma));

        let mut a = vec![0.0f32; codes * 3];
        let mut b = vec![0.0f32; codes * 3];
        if bd == BitDepth::U8 {
            let src: Vec<u8> = (0..codes)
                .flat_map(|i| [i as u8, (codes - 1 - i) as u8, (i / 2) as u8])
                .collect();
            let img = PackedImage::new(&src[..], codes, 1, 3, bd).unwrap();
            baked
                .apply_to(&img, &mut PackedImageMut::new(&mut a[..], codes, 1, 3, BitDepth::F32).unwrap())
                .unwrap();
            plain
                .apply_to(&img, &mut PackedImageMut::new(&mut b[..], codes, 1, 3, BitDepth::F32).unwrap())
                .unwrap();
        } else {
            let src: Vec<u16> = (0..codes)
                .flat_map(|i| [i as u16, (codes - 1 - i) as u16, (i / 2) as u16])
                .collect();
            let img = PackedImage::new(&src[..], codes, 1, 3, bd).unwrap();
            baked
                .apply_to(&img, &mut PackedImageMut::new(&mut a[..], codes, 1, 3, BitDepth::F32).unwrap())
                .unwrap();
            plain
                .apply_to(&img, &mut PackedImageMut::new(&mut b[..], codes, 1, 3, BitDepth::F32).unwrap())
                .unwrap();
        }
        assert_eq!(a, b, "{bd}");
    }
}

#[test]
fn cheap_prefix_is_not_baked() {
    let p = pipeline(vec![
        MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).into(),
        RangeOpData::unit().into(),
    ]);
    let cpu = CpuProcessor::new(&p, BitDepth::U10, BitDepth::U10, OptimizationFlags::DEFAULT).unwrap();
    assert_eq!(types(cpu.pipeline()), [OpType::Matrix]);
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn optimization_terminates() {
    let mut p = OpPipeline::new();
    for i in 0..40 {
        let g = 1.0 + (i % 5) as f64 * 0.1;
        p.append(MatrixOpData::scale([g, g, g, 1.0]));
        p.append(GammaOpData::basic(GammaStyle::BasicFwd, [g; 3]));
        p.append(RangeOpData::clamp(Some(-(i as f64)), None));
        p.append(ExponentOpData::new([g, g, g, 1.0]).with_direction(TransformDirection::Inverse));
        p.append(LogOpData::with_base(2.0));
        p.append(LogOpData::with_base(2.0).with_direction(TransformDirection::Inverse));
    }
    for flags in [
        OptimizationFlags::LOSSLESS,
        OptimizationFlags::DEFAULT,
        OptimizationFlags::DRAFT,
    ] {
        let mut q = p.clone();
        let report = q.finalize(flags).unwrap();
        assert!(report.passes >= 1);
        assert!(report.passes <= 2 * MAX_OPTIMIZATION_PASSES, "{report:?}");
        assert!(q.len() < p.len());
    }
}

#[test]
fn repeated_finalization_is_stable() {
    let p = pipeline(vec![
        CdlOpData::new(CdlStyle::V1_2Fwd, [1.1; 3], [0.0; 3], [1.0; 3], 1.0).into(),
        GammaOpData::basic(GammaStyle::BasicFwd, [2.2; 3]).into(),
        MatrixOpData::from_rgb(MIX).into(),
    ]);
    let once = finalized(&p, OptimizationFlags::DEFAULT);
    let mut twice = once.clone();
    let report = twice.finalize(OptimizationFlags::DEFAULT).unwrap();
    assert_eq!(report.changes, 0);
    assert!(report.converged);
    assert_eq!(once.cache_id(), twice.cache_id());
}

// ============================================================================
// Dynamic properties and caching
// ============================================================================

fn dynamic_exposure() -> ExposureContrastOpData {
    let mut ec = ExposureContrastOpData::new(ExposureContrastStyle::Linear);
    ec.make_dynamic(DynamicPropertyType::Exposure);
    ec
}

#[test]
fn dynamic_properties_are_unified() {
    let mut p = OpPipeline::new();
    p.append(dynamic_exposure());
    p.append(MatrixOpData::scale([1.0, 1.0, 1.0, 1.0]));
    p.append(dynamic_exposure());

    let processor = Processor::with_cache_config(p, CacheConfig::default());
    assert!(processor.has_dynamic_property(DynamicPropertyType::Exposure));
    assert!(!processor.has_dynamic_property(DynamicPropertyType::Contrast));

    let cpu = processor
        .cpu_processor(BitDepth::F32, BitDepth::F32, OptimizationFlags::DEFAULT)
        .unwrap();
    let handle = processor.dynamic_property(DynamicPropertyType::Exposure).unwrap();
    assert!(handle.ptr_eq(&cpu.dynamic_property(DynamicPropertyType::Exposure).unwrap()));

    // one edit drives both ops
    handle.set_double(0.5);
    let out = run(&cpu, [0.5, 0.25, 0.125, 1.0]);
    assert_pixels_close(out, [1.0, 0.5, 0.25, 1.0], 1e-6, [0.5, 0.25, 0.125, 1.0]);

    let gpu = processor.gpu_processor(OptimizationFlags::DEFAULT).unwrap();
    assert!(gpu.has_dynamic_property(DynamicPropertyType::Exposure));
    let mut creator = vfx_colorops::GpuShaderCreator::new(vfx_colorops::GpuLanguage::Glsl1_3);
    gpu.extract_shader_info(&mut creator).unwrap();
    assert_eq!(creator.uniforms().len(), 1);
    assert_eq!(creator.uniforms()[0].value(), 0.5);
}

#[test]
fn frozen_dynamics_ignore_edits() {
    let mut p = OpPipeline::new();
    p.append(dynamic_exposure());
    let processor = Processor::with_cache_config(p, CacheConfig::default());
    let flags = OptimizationFlags::DEFAULT | OptimizationFlags::NO_DYNAMIC_PROPERTIES;
    let cpu = processor.cpu_processor(BitDepth::F32, BitDepth::F32, flags).unwrap();
    assert!(!cpu.is_dynamic());
    processor
        .dynamic_property(DynamicPropertyType::Exposure)
        .unwrap()
        .set_double(1.0);
    let mut px = [0.5f32; 3];
    cpu.apply_rgb(&mut px);
    assert_eq!(px, [0.5; 3]);
}

#[test]
fn cached_processors_match_fresh_ones() {
    let p = pipeline(vec![
        GammaOpData::basic(GammaStyle::BasicFwd, [2.2; 3]).into(),
        MatrixOpData::from_rgb(MIX).into(),
    ]);
    let cached = Processor::with_cache_config(p.clone(), CacheConfig::default());
    let uncached = Processor::with_cache_config(p, CacheConfig::default().with_enabled(false));
    let flags = OptimizationFlags::DEFAULT;

    let a1 = cached.cpu_processor(BitDepth::F32, BitDepth::F32, flags).unwrap();
    let a2 = cached.cpu_processor(BitDepth::F32, BitDepth::F32, flags).unwrap();
    assert!(Arc::ptr_eq(&a1, &a2));
    let other_flags = cached
        .cpu_processor(BitDepth::F32, BitDepth::F32, OptimizationFlags::LOSSLESS)
        .unwrap();
    assert!(!Arc::ptr_eq(&a1, &other_flags));

    let b1 = uncached.cpu_processor(BitDepth::F32, BitDepth::F32, flags).unwrap();
    let b2 = uncached.cpu_processor(BitDepth::F32, BitDepth::F32, flags).unwrap();
    assert!(!Arc::ptr_eq(&b1, &b2));

    assert_eq!(a1.cache_id(), b1.cache_id());
    for px in pixels(&UNIT_VALUES) {
        assert_eq!(run(&a1, px), run(&b1, px));
    }
}

#[test]
fn cache_ids_track_parameters() {
    let a = pipeline(vec![MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).into()]);
    let b = pipeline(vec![MatrixOpData::scale([2.0, 2.0, 2.0, 1.0]).into()]);
    let c = pipeline(vec![MatrixOpData::scale([2.0, 2.0, 2.5, 1.0]).into()]);
    assert_eq!(a.cache_id(), b.cache_id());
    assert_ne!(a.cache_id(), c.cache_id());

    let pa = Processor::with_cache_config(a, CacheConfig::default());
    let pc = Processor::with_cache_config(c, CacheConfig::default());
    assert_ne!(pa.cache_id(), pc.cache_id());
}

//! Fixed-point rewriting of operator sequences.
//!
//! Each pass runs, in order:
//!
//! 1. removal of no-ops
//! 2. identity replacement ([`OptimizationFlags::IDENTITY`], gammas under
//!    [`OptimizationFlags::IDENTITY_GAMMA`])
//! 3. pair-inverse cancellation (`PAIR_IDENTITY_*`)
//! 4. composition of adjacent ops of one type (`COMP_*`)
//! 5. simpler replacements ([`OptimizationFlags::SIMPLIFY_OPS`])
//!
//! Passes repeat until one makes no change, at most
//! [`MAX_OPTIMIZATION_PASSES`] times. Inverse LUTs are then baked into
//! forward LUTs under [`OptimizationFlags::LUT_INV_FAST`], followed by one
//! more round of passes if anything was baked.

use crate::cpu::{Kernel, build_kernel};
use crate::error::{OpError, OpResult};
use crate::flags::OptimizationFlags;
use crate::op::Op;
use crate::opdata::{Lut1DOpData, MatrixOpData, OpData, OpType};
use tracing::{debug, trace, warn};
use vfx_core::BitDepth;
use vfx_lut::Lut1D;

/// Upper bound on optimizer passes per round.
pub const MAX_OPTIMIZATION_PASSES: usize = 8;

/// What an optimization run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationReport {
    /// Passes run, over every round.
    pub passes: usize,
    /// Whether the last round reached a pass with no change.
    pub converged: bool,
    /// Total rewrites.
    pub changes: usize,
}

// ============================================================================
// Flag tables
// ============================================================================

/// Flag enabling pair-inverse cancellation for `op_type`.
pub fn pair_flag(op_type: OpType) -> Option<OptimizationFlags> {
    match op_type {
        OpType::Matrix => Some(OptimizationFlags::PAIR_IDENTITY_MATRIX),
        OpType::Lut1D => Some(OptimizationFlags::PAIR_IDENTITY_LUT1D),
        OpType::Lut3D => Some(OptimizationFlags::PAIR_IDENTITY_LUT3D),
        OpType::Gamma => Some(OptimizationFlags::PAIR_IDENTITY_GAMMA),
        OpType::Exponent => Some(OptimizationFlags::PAIR_IDENTITY_EXPONENT),
        OpType::Log => Some(OptimizationFlags::PAIR_IDENTITY_LOG),
        OpType::Cdl => Some(OptimizationFlags::PAIR_IDENTITY_CDL),
        OpType::ExposureContrast => Some(OptimizationFlags::PAIR_IDENTITY_EXPOSURE_CONTRAST),
        OpType::FixedFunction => Some(OptimizationFlags::PAIR_IDENTITY_FIXED_FUNCTION),
        OpType::Range | OpType::NoOp => None,
    }
}

/// Flag enabling composition of adjacent `op_type` ops.
pub fn comp_flag(op_type: OpType) -> Option<OptimizationFlags> {
    match op_type {
        OpType::Matrix => Some(OptimizationFlags::COMP_MATRIX),
        OpType::Range => Some(OptimizationFlags::COMP_RANGE),
        OpType::Lut1D => Some(OptimizationFlags::COMP_LUT1D),
        OpType::Lut3D => Some(OptimizationFlags::COMP_LUT3D),
        OpType::Gamma => Some(OptimizationFlags::COMP_GAMMA),
        OpType::Exponent => Some(OptimizationFlags::COMP_EXPONENT),
        OpType::Log
        | OpType::Cdl
        | OpType::ExposureContrast
        | OpType::FixedFunction
        | OpType::NoOp => None,
    }
}

fn enabled(flag: Option<OptimizationFlags>, flags: OptimizationFlags) -> bool {
    flag.is_some_and(|f| flags.contains(f))
}

// ============================================================================
// Rewrites
// ============================================================================

fn remove_no_ops(ops: &mut Vec<Op>) -> usize {
    let before = ops.len();
    ops.retain(|op| !op.is_no_op());
    before - ops.len()
}

fn remove_identities(ops: &mut [Op], flags: OptimizationFlags) -> usize {
    let mut count = 0;
    for op in ops.iter_mut() {
        if op.is_no_op() || !op.is_identity() {
            continue;
        }
        let replacement = if op.op_type() == OpType::Gamma {
            // dropping the negative clamp is what the gamma flag opts into
            if !flags.contains(OptimizationFlags::IDENTITY_GAMMA) {
                continue;
            }
            Op::new(MatrixOpData::identity())
        } else {
            if !flags.contains(OptimizationFlags::IDENTITY) {
                continue;
            }
            let replacement = op.identity_replacement();
            if op.op_type() == OpType::Range && replacement.op_type() == OpType::Range {
                continue;
            }
            replacement
        };
        trace!(op = %op, replacement = %replacement, "identity replaced");
        *op = replacement;
        count += 1;
    }
    count
}

fn remove_inverses(ops: &mut Vec<Op>, flags: OptimizationFlags) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i + 1 < ops.len() {
        let (a, b) = (&ops[i], &ops[i + 1]);
        if enabled(pair_flag(a.op_type()), flags) && a.is_inverse(b) {
            let replacement = a.identity_replacement();
            trace!(first = %a, second = %b, replacement = %replacement, "inverse pair removed");
            if replacement.is_no_op() {
                ops.drain(i..i + 2);
            } else {
                ops.splice(i..i + 2, [replacement]);
            }
            count += 1;
            i = i.saturating_sub(1);
            continue;
        }
        i += 1;
    }
    count
}

fn combine(ops: &mut Vec<Op>, flags: OptimizationFlags) -> OpResult<usize> {
    let mut count = 0;
    let mut i = 0;
    while i + 1 < ops.len() {
        let (a, b) = (&ops[i], &ops[i + 1]);
        if enabled(comp_flag(a.op_type()), flags) && a.can_combine_with(b) {
            if let Some(combined) = a.combine_with(b)? {
                trace!(first = %a, second = %b, results = combined.len(), "ops combined");
                ops.splice(i..i + 2, combined);
                count += 1;
                i = i.saturating_sub(1);
                continue;
            }
        }
        i += 1;
    }
    Ok(count)
}

fn simplify(ops: &mut Vec<Op>) -> usize {
    let mut count = 0;
    let mut i = 0;
    while i < ops.len() {
        let replacement = ops[i].simpler_replacement();
        if replacement.is_empty() {
            i += 1;
            continue;
        }
        trace!(op = %ops[i], results = replacement.len(), "simpler replacement");
        let n = replacement.len();
        ops.splice(i..i + 1, replacement);
        count += 1;
        i += n;
    }
    count
}

fn freeze_dynamic(ops: &mut [Op]) -> usize {
    let mut count = 0;
    for op in ops.iter_mut().filter(|op| op.is_dynamic()) {
        op.freeze_dynamic_properties();
        count += 1;
    }
    count
}

fn bake_inverse_luts(ops: &mut [Op]) -> usize {
    let mut count = 0;
    for op in ops.iter_mut() {
        let baked = match op.data() {
            OpData::Lut1D(l) if !l.direction.is_forward() => Op::new(l.bake_inverse()),
            OpData::Lut3D(l) if !l.direction.is_forward() => Op::new(l.bake_inverse()),
            _ => continue,
        };
        trace!(op = %op, "inverse LUT baked");
        *op = baked;
        count += 1;
    }
    count
}

// ============================================================================
// Drivers
// ============================================================================

fn run_passes(ops: &mut Vec<Op>, flags: OptimizationFlags) -> OpResult<OptimizationReport> {
    let mut report = OptimizationReport::default();
    while report.passes < MAX_OPTIMIZATION_PASSES {
        report.passes += 1;
        let no_ops = remove_no_ops(ops);
        let identities = remove_identities(ops, flags);
        let inverses = remove_inverses(ops, flags);
        let combines = combine(ops, flags)?;
        let simplified = if flags.contains(OptimizationFlags::SIMPLIFY_OPS) {
            simplify(ops)
        } else {
            0
        };
        let changes = no_ops + identities + inverses + combines + simplified;
        debug!(
            pass = report.passes,
            no_ops,
            identities,
            inverses,
            combines,
            simplified,
            remaining = ops.len(),
            "optimizer pass"
        );
        report.changes += changes;
        if changes == 0 {
            report.converged = true;
            return Ok(report);
        }
    }
    warn!(
        passes = report.passes,
        remaining = ops.len(),
        "optimizer reached the pass limit without converging"
    );
    Ok(report)
}

/// Optimizes finalized ops under `flags`.
pub(crate) fn optimize(ops: &mut Vec<Op>, flags: OptimizationFlags) -> OpResult<OptimizationReport> {
    if let Some(marker) = ops.iter().find(|op| op.op_type() == OpType::NoOp) {
        return Err(OpError::internal(format!(
            "marker {} survived finalization",
            marker.cache_id()
        )));
    }
    let mut frozen = 0;
    if flags.contains(OptimizationFlags::NO_DYNAMIC_PROPERTIES) {
        frozen = freeze_dynamic(ops);
    }

    let mut report = run_passes(ops, flags)?;
    report.changes += frozen;

    if flags.contains(OptimizationFlags::LUT_INV_FAST) {
        let baked = bake_inverse_luts(ops);
        if baked > 0 {
            let again = run_passes(ops, flags)?;
            report.passes += again.passes;
            report.converged = again.converged;
            report.changes += baked + again.changes;
        }
    }
    debug!(
        passes = report.passes,
        changes = report.changes,
        converged = report.converged,
        remaining = ops.len(),
        "optimization finished"
    );
    Ok(report)
}

// ============================================================================
// Bit-depth rewrites
// ============================================================================

fn is_passthrough_clamp(op: &Op) -> bool {
    matches!(op.data(), OpData::Range(r) if r.is_unit_passthrough())
}

/// Removes clamps the integer conversions already perform and bakes the
/// leading separable ops into a table indexed by input code value.
pub(crate) fn optimize_for_bitdepth(
    ops: &mut Vec<Op>,
    in_bd: BitDepth,
    out_bd: BitDepth,
    flags: OptimizationFlags,
) -> OpResult<()> {
    if in_bd.is_integer() {
        let leading = ops.iter().take_while(|op| is_passthrough_clamp(op)).count();
        if leading > 0 {
            trace!(count = leading, %in_bd, "leading clamps removed");
            ops.drain(..leading);
        }
    }
    if out_bd.is_integer() {
        while ops.last().is_some_and(is_passthrough_clamp) {
            trace!(%out_bd, "trailing clamp removed");
            ops.pop();
        }
    }
    if flags.contains(OptimizationFlags::COMP_SEPARABLE_PREFIX) {
        bake_separable_prefix(ops, in_bd)?;
    }
    Ok(())
}

/// Length of the longest leading run of ops that act on each color channel
/// independently, leave alpha alone and have fixed parameters.
pub fn separable_prefix_len(ops: &[Op]) -> usize {
    ops.iter()
        .take_while(|op| !op.has_channel_crosstalk() && !op.is_dynamic() && !op.affects_alpha())
        .count()
}

fn bake_separable_prefix(ops: &mut Vec<Op>, in_bd: BitDepth) -> OpResult<()> {
    let Some(codes) = in_bd.code_count() else {
        return Ok(());
    };
    let len = separable_prefix_len(ops);
    let prefix = &ops[..len];
    let expensive = prefix
        .iter()
        .any(|op| !matches!(op.op_type(), OpType::Matrix | OpType::Range));
    if !expensive {
        return Ok(());
    }
    if let [only] = prefix {
        if let OpData::Lut1D(l) = only.data() {
            let half = in_bd == BitDepth::F16;
            if l.direction.is_forward() && l.lut.half_domain == half && l.lut.size() == codes {
                return Ok(());
            }
        }
    }

    let kernels: Vec<Box<dyn Kernel>> = prefix.iter().map(build_kernel).collect::<OpResult<_>>()?;
    let eval = |x: f32| {
        let mut px = [x, x, x, 1.0];
        for k in &kernels {
            k.apply(&mut px);
        }
        [px[0], px[1], px[2]]
    };
    let lut = if in_bd == BitDepth::F16 {
        Lut1D::from_half_fn(eval)
    } else {
        // sample at the same normalized code values the input conversion produces
        let channels: Vec<[f32; 3]> = (0..codes).map(|i| eval(in_bd.normalize(i as f32))).collect();
        Lut1D::from_channels(
            channels.iter().map(|c| c[0]).collect(),
            channels.iter().map(|c| c[1]).collect(),
            channels.iter().map(|c| c[2]).collect(),
            false,
        )?
    };
    debug!(ops = len, entries = lut.size(), %in_bd, "separable prefix baked");
    let mut baked = Lut1DOpData::new(lut);
    baked.metadata = prefix[0].data().metadata().clone();
    ops.splice(..len, [Op::new(baked)]);
    Ok(())
}

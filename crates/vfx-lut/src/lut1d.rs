//! 1-dimensional lookup table.
//!
//! A 1D LUT applies an independent curve to each RGB channel. Two input
//! domains are supported:
//!
//! - **Normal domain**: `N` evenly spaced samples over `[0, 1]`; inputs are
//!   clamped to that range.
//! - **Half domain**: 65536 samples, one per IEEE-754 half bit pattern, so
//!   the table covers the whole half range including negatives. Lookup uses
//!   [`half_index`], which interpolates linearly between adjacent halves.
//!
//! Inversion lives in [`Lut1DInverse`], which builds its search tables on
//! first use and can bake a fast forward approximation of the inverse.

use std::sync::OnceLock;

use vfx_core::pixel::{HALF_DOMAIN_SIZE, half_index, half_value, is_finite_half_index};
use vfx_math::{lerp, saturate, table_position};

use crate::{Interpolation, LutError, LutResult};

/// Entry count of a fast inverse baked over the normal domain.
pub const FAST_INVERSE_SIZE: usize = 4096;

/// Slack allowed before output is considered to leave `[0, 1]`.
const RANGE_TOLERANCE: f32 = 1e-6;

// Last finite positive and negative half bit patterns.
const HALF_POS_LAST: usize = 0x7bff;
const HALF_NEG_FIRST: usize = 0x8000;
const HALF_NEG_LAST: usize = 0xfbff;

/// A 1-dimensional lookup table with three channels.
///
/// Single-channel curves are expanded on construction, so every channel
/// always holds [`size`](Self::size) entries.
///
/// # Example
///
/// ```rust
/// use vfx_lut::Lut1D;
///
/// let lut = Lut1D::gamma(1024, 2.0);
/// let out = lut.apply([0.5, 0.5, 0.5]);
/// assert!((out[0] - 0.25).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    /// Red channel samples.
    pub r: Vec<f32>,
    /// Green channel samples.
    pub g: Vec<f32>,
    /// Blue channel samples.
    pub b: Vec<f32>,
    /// Whether the table is indexed by half bit patterns.
    pub half_domain: bool,
    /// Interpolation between samples.
    pub interpolation: Interpolation,
}

impl Lut1D {
    /// Creates an identity LUT over the normal domain.
    ///
    /// ```rust
    /// use vfx_lut::Lut1D;
    ///
    /// let lut = Lut1D::identity(256);
    /// assert!(lut.is_identity(1e-6));
    /// ```
    pub fn identity(size: usize) -> Self {
        Self::from_fn(size, |x| [x, x, x])
    }

    /// Creates an identity LUT over the half domain.
    pub fn half_domain_identity() -> Self {
        Self::from_half_fn(|x| [x, x, x])
    }

    /// Creates a gamma curve LUT: `out = in^gamma`.
    pub fn gamma(size: usize, gamma: f32) -> Self {
        Self::from_fn(size, |x| {
            let v = x.powf(gamma);
            [v, v, v]
        })
    }

    /// Samples `f` at `size` evenly spaced inputs over `[0, 1]`.
    ///
    /// Sizes below 2 are raised to 2.
    pub fn from_fn(size: usize, f: impl Fn(f32) -> [f32; 3]) -> Self {
        let size = size.max(2);
        let last = (size - 1) as f32;
        let mut lut = Self::with_capacity(size, false);
        for i in 0..size {
            lut.push(f(i as f32 / last));
        }
        lut
    }

    /// Samples `f` at every finite half value.
    ///
    /// Entries for infinite and NaN bit patterns copy the nearest finite
    /// entry of the same sign.
    pub fn from_half_fn(f: impl Fn(f32) -> [f32; 3]) -> Self {
        let mut lut = Self::with_capacity(HALF_DOMAIN_SIZE, true);
        for i in 0..HALF_DOMAIN_SIZE {
            if is_finite_half_index(i) {
                lut.push(f(half_value(i)));
            } else {
                lut.push([0.0; 3]);
            }
        }
        lut.sanitize_half_domain();
        lut
    }

    /// Creates a LUT from per-channel samples.
    ///
    /// Half-domain tables must hold exactly 65536 entries per channel.
    pub fn from_channels(
        r: Vec<f32>,
        g: Vec<f32>,
        b: Vec<f32>,
        half_domain: bool,
    ) -> LutResult<Self> {
        if r.len() != g.len() || r.len() != b.len() {
            return Err(LutError::ChannelMismatch {
                red: r.len(),
                green: g.len(),
                blue: b.len(),
            });
        }
        if r.len() < 2 {
            return Err(LutError::InvalidSize(format!(
                "1D LUT needs at least 2 entries, got {}",
                r.len()
            )));
        }
        if half_domain && r.len() != HALF_DOMAIN_SIZE {
            return Err(LutError::InvalidSize(format!(
                "half-domain LUT needs {HALF_DOMAIN_SIZE} entries, got {}",
                r.len()
            )));
        }
        let mut lut = Self {
            r,
            g,
            b,
            half_domain,
            interpolation: Interpolation::Linear,
        };
        if half_domain {
            lut.sanitize_half_domain();
        }
        Ok(lut)
    }

    /// Creates a LUT applying the same curve to every channel.
    pub fn from_mono(data: Vec<f32>, half_domain: bool) -> LutResult<Self> {
        Self::from_channels(data.clone(), data.clone(), data, half_domain)
    }

    /// Sets the interpolation method.
    ///
    /// Tetrahedral interpolation does not apply to 1D tables.
    pub fn with_interpolation(mut self, interp: Interpolation) -> LutResult<Self> {
        if interp == Interpolation::Tetrahedral {
            return Err(LutError::UnsupportedInterpolation("tetrahedral on a 1D LUT"));
        }
        self.interpolation = interp;
        Ok(self)
    }

    fn with_capacity(size: usize, half_domain: bool) -> Self {
        Self {
            r: Vec::with_capacity(size),
            g: Vec::with_capacity(size),
            b: Vec::with_capacity(size),
            half_domain,
            interpolation: Interpolation::Linear,
        }
    }

    fn push(&mut self, rgb: [f32; 3]) {
        self.r.push(rgb[0]);
        self.g.push(rgb[1]);
        self.b.push(rgb[2]);
    }

    fn sanitize_half_domain(&mut self) {
        for ch in [&mut self.r, &mut self.g, &mut self.b] {
            let pos = ch[HALF_POS_LAST];
            ch[HALF_POS_LAST + 1..HALF_NEG_FIRST].fill(pos);
            let neg = ch[HALF_NEG_LAST];
            ch[HALF_NEG_LAST + 1..].fill(neg);
        }
    }

    /// Returns the number of entries per channel.
    #[inline]
    pub fn size(&self) -> usize {
        self.r.len()
    }

    /// Samples of channel `c` (0 = red, 1 = green, 2 = blue).
    #[inline]
    pub fn channel(&self, c: usize) -> &[f32] {
        match c {
            0 => &self.r,
            1 => &self.g,
            _ => &self.b,
        }
    }

    /// Returns true if all three channels hold the same curve.
    pub fn is_mono(&self) -> bool {
        self.r == self.g && self.r == self.b
    }

    /// Input value that entry `i` is sampled at.
    #[inline]
    pub fn input_value(&self, i: usize) -> f32 {
        if self.half_domain {
            half_value(i)
        } else {
            i as f32 / (self.size() - 1) as f32
        }
    }

    /// Whether entry `i` corresponds to a finite input.
    #[inline]
    pub fn is_valid_index(&self, i: usize) -> bool {
        !self.half_domain || is_finite_half_index(i)
    }

    /// Applies `f` to every sample, in place.
    pub fn map_values(&mut self, f: impl Fn(f32) -> f32) {
        for ch in [&mut self.r, &mut self.g, &mut self.b] {
            ch.iter_mut().for_each(|v| *v = f(*v));
        }
    }

    /// Evaluates channel `c` at `x`.
    ///
    /// Normal-domain inputs are clamped to `[0, 1]` and NaN reads entry 0.
    /// Half-domain inputs clamp to the largest finite half of their sign.
    pub fn apply_channel(&self, c: usize, x: f32) -> f32 {
        let t = self.channel(c);
        if self.half_domain {
            let pos = half_index(if x.is_nan() { 0.0 } else { x });
            match self.interpolation {
                Interpolation::Nearest => t[pos.round() as usize],
                _ => {
                    let i = pos as usize;
                    let frac = pos - i as f32;
                    if frac == 0.0 { t[i] } else { lerp(t[i], t[i + 1], frac) }
                }
            }
        } else {
            let n = t.len();
            let pos = saturate(x) * (n - 1) as f32;
            match self.interpolation {
                Interpolation::Nearest => t[pos.round() as usize],
                _ => {
                    let (i, frac) = table_position(pos, n);
                    lerp(t[i], t[i + 1], frac)
                }
            }
        }
    }

    /// Applies the LUT to an RGB triplet.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        [
            self.apply_channel(0, rgb[0]),
            self.apply_channel(1, rgb[1]),
            self.apply_channel(2, rgb[2]),
        ]
    }

    /// Smallest and largest finite output over all channels.
    pub fn output_range(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for c in 0..3 {
            for (i, &v) in self.channel(c).iter().enumerate() {
                if v.is_finite() && self.is_valid_index(i) {
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
        }
        if lo > hi { (0.0, 0.0) } else { (lo, hi) }
    }

    /// Whether any output lies outside `[0, 1]`.
    pub fn has_extended_range(&self) -> bool {
        let (lo, hi) = self.output_range();
        lo < -RANGE_TOLERANCE || hi > 1.0 + RANGE_TOLERANCE
    }

    /// Whether every sample equals its input within `tol`.
    ///
    /// The tolerance is relative for inputs above 1 in magnitude.
    pub fn is_identity(&self, tol: f32) -> bool {
        (0..self.size()).filter(|&i| self.is_valid_index(i)).all(|i| {
            let x = self.input_value(i);
            let bound = tol * x.abs().max(1.0);
            (0..3).all(|c| (self.channel(c)[i] - x).abs() <= bound)
        })
    }

    /// Inverse evaluator for this LUT.
    pub fn inverse(&self) -> Lut1DInverse {
        Lut1DInverse::new(self.clone())
    }
}

/// Monotonic samples of one channel ordered by increasing input.
#[derive(Debug, Clone)]
struct InverseChannel {
    inputs: Vec<f32>,
    /// Non-decreasing; negated when the channel decreases.
    outputs: Vec<f32>,
    negate: bool,
    /// Effective range, excluding flat runs at both ends.
    start: usize,
    end: usize,
}

impl InverseChannel {
    fn new(inputs: Vec<f32>, mut outputs: Vec<f32>) -> Self {
        let n = outputs.len();
        let negate = outputs[n - 1] < outputs[0];
        if negate {
            outputs.iter_mut().for_each(|v| *v = -*v);
        }
        // Flatten reversals; NaN samples take the running value.
        let mut running = f32::NEG_INFINITY;
        for v in outputs.iter_mut() {
            running = running.max(*v);
            *v = running;
        }

        let first = outputs[0];
        let last = outputs[n - 1];
        let mut start = outputs.iter().rposition(|&v| v == first).unwrap_or(0);
        let mut end = outputs.iter().position(|&v| v == last).unwrap_or(n - 1);
        if start >= end {
            start = start.min(end);
            end = start;
        }

        Self {
            inputs,
            outputs,
            negate,
            start,
            end,
        }
    }

    fn eval(&self, y: f32) -> f32 {
        let y = if self.negate { -y } else { y };
        if !(y > self.outputs[self.start]) {
            return self.inputs[self.start];
        }
        if y >= self.outputs[self.end] {
            return self.inputs[self.end];
        }
        let below = self.outputs[self.start..=self.end].partition_point(|&v| v <= y);
        let i = self.start + below - 1;
        let (o0, o1) = (self.outputs[i], self.outputs[i + 1]);
        let t = if o1 > o0 { (y - o0) / (o1 - o0) } else { 0.0 };
        lerp(self.inputs[i], self.inputs[i + 1], t)
    }
}

/// Exact inverse of a [`Lut1D`].
///
/// Each channel is treated as monotonic: reversals are flattened and flat
/// runs at either end are skipped, so outputs outside the effective range
/// invert to its first or last input. The search tables are built once, on
/// first evaluation.
///
/// ```rust
/// use vfx_lut::Lut1D;
///
/// let lut = Lut1D::gamma(1024, 2.0);
/// let inv = lut.inverse();
/// let x = inv.apply([0.25, 0.25, 0.25]);
/// assert!((x[0] - 0.5).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct Lut1DInverse {
    lut: Lut1D,
    tables: OnceLock<[InverseChannel; 3]>,
}

impl Lut1DInverse {
    /// Wraps a forward LUT.
    pub fn new(lut: Lut1D) -> Self {
        Self {
            lut,
            tables: OnceLock::new(),
        }
    }

    /// The forward LUT being inverted.
    pub fn lut(&self) -> &Lut1D {
        &self.lut
    }

    fn tables(&self) -> &[InverseChannel; 3] {
        self.tables.get_or_init(|| {
            let order = self.input_order();
            let inputs: Vec<f32> = order.iter().map(|&i| self.lut.input_value(i)).collect();
            let build = |c: usize| {
                let ch = self.lut.channel(c);
                InverseChannel::new(inputs.clone(), order.iter().map(|&i| ch[i]).collect())
            };
            [build(0), build(1), build(2)]
        })
    }

    /// Valid entry indexes sorted by increasing input.
    fn input_order(&self) -> Vec<usize> {
        if self.lut.half_domain {
            (HALF_NEG_FIRST..=HALF_NEG_LAST)
                .rev()
                .chain(0..=HALF_POS_LAST)
                .collect()
        } else {
            (0..self.lut.size()).collect()
        }
    }

    /// Inverts channel `c` at output value `y`.
    #[inline]
    pub fn apply_channel(&self, c: usize, y: f32) -> f32 {
        self.tables()[c.min(2)].eval(y)
    }

    /// Inverts an RGB triplet.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let t = self.tables();
        [t[0].eval(rgb[0]), t[1].eval(rgb[1]), t[2].eval(rgb[2])]
    }

    /// Bakes a forward LUT approximating the inverse.
    ///
    /// When the forward output leaves `[0, 1]` the result is a half-domain
    /// table; otherwise it has [`FAST_INVERSE_SIZE`] normal-domain entries.
    pub fn bake(&self) -> Lut1D {
        if self.lut.has_extended_range() {
            Lut1D::from_half_fn(|y| self.apply([y, y, y]))
        } else {
            Lut1D::from_fn(FAST_INVERSE_SIZE, |y| self.apply([y, y, y]))
        }
    }
}

//! Basic and moncurve gamma.
//!
//! Basic styles raise to a power (`g` forward, `1/g` reverse) and differ in
//! negative handling: clamp to zero, mirror around zero, or pass through.
//! Moncurve styles splice a linear segment below a break point:
//!
//! ```text
//! bp    = o / (g − 1)
//! slope = (o·g / ((g − 1)(1 + o)))^g · (g − 1) / o
//! fwd   = x > bp ? ((x + o) / (1 + o))^g : x · slope
//! rev   = y > bp·slope ? y^(1/g) · (1 + o) − o : y / slope
//! ```

use super::{FormatMetadata, MatrixOpData, OpData, RangeOpData, TransformDirection, push_values};
use crate::error::{OpError, OpResult};

/// Gamma style, encoding direction and negative handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GammaStyle {
    /// `max(0, x)^g`.
    BasicFwd,
    /// `max(0, x)^(1/g)`.
    BasicRev,
    /// `sign(x)·|x|^g`.
    BasicMirrorFwd,
    /// `sign(x)·|x|^(1/g)`.
    BasicMirrorRev,
    /// `x^g`, negatives unchanged.
    BasicPassThruFwd,
    /// `x^(1/g)`, negatives unchanged.
    BasicPassThruRev,
    /// Moncurve, linear segment continues below zero.
    MoncurveFwd,
    /// Inverse moncurve.
    MoncurveRev,
    /// Moncurve mirrored around zero.
    MoncurveMirrorFwd,
    /// Inverse mirrored moncurve.
    MoncurveMirrorRev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasicFamily {
    Clamp,
    Mirror,
    PassThru,
}

impl GammaStyle {
    /// Style evaluating the inverse curve.
    pub const fn inverse(self) -> Self {
        match self {
            Self::BasicFwd => Self::BasicRev,
            Self::BasicRev => Self::BasicFwd,
            Self::BasicMirrorFwd => Self::BasicMirrorRev,
            Self::BasicMirrorRev => Self::BasicMirrorFwd,
            Self::BasicPassThruFwd => Self::BasicPassThruRev,
            Self::BasicPassThruRev => Self::BasicPassThruFwd,
            Self::MoncurveFwd => Self::MoncurveRev,
            Self::MoncurveRev => Self::MoncurveFwd,
            Self::MoncurveMirrorFwd => Self::MoncurveMirrorRev,
            Self::MoncurveMirrorRev => Self::MoncurveMirrorFwd,
        }
    }

    /// Whether the style evaluates the authored curve.
    pub const fn is_forward(self) -> bool {
        matches!(
            self,
            Self::BasicFwd
                | Self::BasicMirrorFwd
                | Self::BasicPassThruFwd
                | Self::MoncurveFwd
                | Self::MoncurveMirrorFwd
        )
    }

    /// Whether the style has a linear segment.
    pub const fn is_moncurve(self) -> bool {
        matches!(
            self,
            Self::MoncurveFwd | Self::MoncurveRev | Self::MoncurveMirrorFwd | Self::MoncurveMirrorRev
        )
    }

    /// Whether negative inputs are mirrored.
    pub const fn is_mirror(self) -> bool {
        matches!(
            self,
            Self::BasicMirrorFwd | Self::BasicMirrorRev | Self::MoncurveMirrorFwd | Self::MoncurveMirrorRev
        )
    }

    /// Whether negative inputs pass unchanged.
    pub const fn is_pass_thru(self) -> bool {
        matches!(self, Self::BasicPassThruFwd | Self::BasicPassThruRev)
    }

    /// Whether negative inputs clamp to zero.
    pub const fn is_clamping(self) -> bool {
        matches!(self, Self::BasicFwd | Self::BasicRev)
    }

    /// Style name used in cache ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BasicFwd => "basicFwd",
            Self::BasicRev => "basicRev",
            Self::BasicMirrorFwd => "basicMirrorFwd",
            Self::BasicMirrorRev => "basicMirrorRev",
            Self::BasicPassThruFwd => "basicPassThruFwd",
            Self::BasicPassThruRev => "basicPassThruRev",
            Self::MoncurveFwd => "moncurveFwd",
            Self::MoncurveRev => "moncurveRev",
            Self::MoncurveMirrorFwd => "moncurveMirrorFwd",
            Self::MoncurveMirrorRev => "moncurveMirrorRev",
        }
    }

    fn basic_family(self) -> Option<BasicFamily> {
        match self {
            Self::BasicFwd | Self::BasicRev => Some(BasicFamily::Clamp),
            Self::BasicMirrorFwd | Self::BasicMirrorRev => Some(BasicFamily::Mirror),
            Self::BasicPassThruFwd | Self::BasicPassThruRev => Some(BasicFamily::PassThru),
            _ => None,
        }
    }
}

/// Gamma and offset of one channel. Basic styles ignore the offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaParams {
    /// Exponent.
    pub gamma: f64,
    /// Moncurve offset.
    pub offset: f64,
}

impl GammaParams {
    /// Identity parameters.
    pub const IDENTITY: Self = Self { gamma: 1.0, offset: 0.0 };

    /// Basic parameters.
    pub const fn basic(gamma: f64) -> Self {
        Self { gamma, offset: 0.0 }
    }

    /// Moncurve parameters.
    pub const fn moncurve(gamma: f64, offset: f64) -> Self {
        Self { gamma, offset }
    }

    fn is_identity(&self, style: GammaStyle) -> bool {
        self.gamma == 1.0 && (!style.is_moncurve() || self.offset == 0.0)
    }
}

/// Basic gamma exponent bounds.
const BASIC_GAMMA_RANGE: (f64, f64) = (0.01, 100.0);
/// Moncurve gamma bounds.
const MONCURVE_GAMMA_RANGE: (f64, f64) = (1.0, 10.0);
/// Moncurve offset bounds.
const MONCURVE_OFFSET_RANGE: (f64, f64) = (0.0, 0.9);

/// Gamma curve applied per channel, alpha included.
#[derive(Debug, Clone)]
pub struct GammaOpData {
    /// Curve style.
    pub style: GammaStyle,
    /// Red, green, blue and alpha parameters.
    pub params: [GammaParams; 4],
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl GammaOpData {
    /// Creates a gamma op from all four channel parameters.
    pub fn new(style: GammaStyle, params: [GammaParams; 4]) -> Self {
        Self {
            style,
            params,
            metadata: FormatMetadata::default(),
        }
    }

    /// Basic style with RGB exponents and identity alpha.
    pub fn basic(style: GammaStyle, gamma: [f64; 3]) -> Self {
        Self::new(
            style,
            [
                GammaParams::basic(gamma[0]),
                GammaParams::basic(gamma[1]),
                GammaParams::basic(gamma[2]),
                GammaParams::IDENTITY,
            ],
        )
    }

    /// Moncurve style with RGB parameters and identity alpha.
    pub fn moncurve(style: GammaStyle, gamma: [f64; 3], offset: [f64; 3]) -> Self {
        Self::new(
            style,
            [
                GammaParams::moncurve(gamma[0], offset[0]),
                GammaParams::moncurve(gamma[1], offset[1]),
                GammaParams::moncurve(gamma[2], offset[2]),
                GammaParams::IDENTITY,
            ],
        )
    }

    /// Direction implied by the style.
    pub fn direction(&self) -> TransformDirection {
        if self.style.is_forward() {
            TransformDirection::Forward
        } else {
            TransformDirection::Inverse
        }
    }

    /// Checks the parameter bounds of the style.
    pub fn validate(&self) -> OpResult<()> {
        for p in &self.params {
            if !p.gamma.is_finite() || !p.offset.is_finite() {
                return Err(OpError::invalid("gamma parameters must be finite"));
            }
            if self.style.is_moncurve() {
                let (glo, ghi) = MONCURVE_GAMMA_RANGE;
                let (olo, ohi) = MONCURVE_OFFSET_RANGE;
                if p.gamma < glo || p.gamma > ghi {
                    return Err(OpError::invalid(format!(
                        "moncurve gamma {} outside [{glo}, {ghi}]",
                        p.gamma
                    )));
                }
                if p.offset < olo || p.offset > ohi {
                    return Err(OpError::invalid(format!(
                        "moncurve offset {} outside [{olo}, {ohi}]",
                        p.offset
                    )));
                }
                if p.offset > 0.0 && p.gamma == 1.0 {
                    return Err(OpError::invalid("moncurve with an offset needs gamma above 1"));
                }
            } else {
                let (lo, hi) = BASIC_GAMMA_RANGE;
                if p.gamma < lo || p.gamma > hi {
                    return Err(OpError::invalid(format!("gamma {} outside [{lo}, {hi}]", p.gamma)));
                }
            }
        }
        Ok(())
    }

    /// Every channel has exponent 1 (and offset 0 for moncurves).
    pub fn is_identity(&self) -> bool {
        self.params.iter().all(|p| p.is_identity(self.style))
    }

    /// Identity that does not clamp negatives.
    pub fn is_no_op(&self) -> bool {
        self.is_identity() && !self.style.is_clamping()
    }

    /// Channels are independent.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// Clamping styles keep `[0, +∞)`; other styles become a matrix.
    pub fn identity_replacement(&self) -> OpData {
        if self.style.is_clamping() {
            RangeOpData::clamp(Some(0.0), None).into()
        } else {
            MatrixOpData::identity().into()
        }
    }

    /// Same parameters, inverse style.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.style = self.style.inverse();
        inv
    }

    /// Inverse styles with equal parameters.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.style.inverse() == other.style && self.params == other.params
    }

    /// Combines two basic curves by multiplying their effective exponents.
    ///
    /// Clamping absorbs mirror and pass-thru handling; mirror and pass-thru
    /// do not mix. Moncurves never compose.
    pub fn compose(&self, next: &Self) -> Option<Self> {
        use BasicFamily::*;
        let fa = self.style.basic_family()?;
        let fb = next.style.basic_family()?;
        let family = match (fa, fb) {
            (Clamp, _) | (_, Clamp) => Clamp,
            (Mirror, Mirror) => Mirror,
            (PassThru, PassThru) => PassThru,
            _ => return None,
        };
        let effective = |style: GammaStyle, g: f64| if style.is_forward() { g } else { 1.0 / g };
        let mut gammas = [0.0; 4];
        for (c, g) in gammas.iter_mut().enumerate() {
            let v = effective(self.style, self.params[c].gamma) * effective(next.style, next.params[c].gamma);
            *g = round_around_one(v);
        }
        let mut style = match family {
            Clamp => GammaStyle::BasicFwd,
            Mirror => GammaStyle::BasicMirrorFwd,
            PassThru => GammaStyle::BasicPassThruFwd,
        };
        // keep exponents above 1
        if gammas[..3].iter().all(|&g| g < 1.0) {
            gammas.iter_mut().for_each(|g| *g = 1.0 / *g);
            style = style.inverse();
        }
        let mut out = Self::new(style, gammas.map(GammaParams::basic));
        out.metadata = self.metadata.clone();
        Some(out)
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = format!("Gamma {} ", self.style.name());
        let values: Vec<f64> = self.params.iter().flat_map(|p| [p.gamma, p.offset]).collect();
        push_values(&mut id, &values);
        id
    }
}

/// Snaps products like `2.2 · (1/2.2)` to exactly 1.
fn round_around_one(v: f64) -> f64 {
    if (v - 1.0).abs() < 1e-9 { 1.0 } else { v }
}

/// Precomputed moncurve coefficients of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MoncurveCoefs {
    pub gamma: f64,
    pub offset: f64,
    /// Forward break point.
    pub break_point: f64,
    /// Slope of the linear segment.
    pub slope: f64,
}

impl MoncurveCoefs {
    pub fn new(p: GammaParams) -> Self {
        let (g, o) = (p.gamma, p.offset);
        let (break_point, slope) = if o == 0.0 {
            // pure power; the linear segment collapses
            (0.0, if g == 1.0 { 1.0 } else { 0.0 })
        } else {
            let bp = o / (g - 1.0);
            let slope = (o * g / ((g - 1.0) * (1.0 + o))).powf(g) * (g - 1.0) / o;
            (bp, slope)
        };
        Self {
            gamma: g,
            offset: o,
            break_point,
            slope,
        }
    }

    /// Break point of the reverse curve.
    pub fn reverse_break(&self) -> f64 {
        self.break_point * self.slope
    }

    pub fn forward(&self, x: f32) -> f32 {
        if f64::from(x) > self.break_point {
            ((x + self.offset as f32) / (1.0 + self.offset as f32)).powf(self.gamma as f32)
        } else {
            x * self.slope as f32
        }
    }

    pub fn reverse(&self, y: f32) -> f32 {
        if f64::from(y) > self.reverse_break() {
            y.powf(1.0 / self.gamma as f32) * (1.0 + self.offset as f32) - self.offset as f32
        } else if self.slope > 0.0 {
            y / self.slope as f32
        } else {
            0.0
        }
    }
}

//! Analytic color-space functions with no free-form parameters.

use super::{FormatMetadata, MatrixOpData, OpData, TransformDirection, push_values};
use crate::error::{OpError, OpResult};

/// Gamma of the ACES dark-to-dim surround compensation.
pub const ACES_DARK_TO_DIM_GAMMA: f64 = 0.9811;

/// Supported fixed functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixedFunctionStyle {
    /// RGB to hue, saturation, value.
    RgbToHsv,
    /// Hue, saturation, value to RGB.
    HsvToRgb,
    /// CIE XYZ to chromaticity plus luminance.
    XyzToXyy,
    /// Chromaticity plus luminance to CIE XYZ.
    XyyToXyz,
    /// CIE XYZ to u'v' plus luminance.
    XyzToUvy,
    /// u'v' plus luminance to CIE XYZ.
    UvyToXyz,
    /// CIE XYZ to L*u*v* (D65 white).
    XyzToLuv,
    /// L*u*v* to CIE XYZ (D65 white).
    LuvToXyz,
    /// Rec.2100 surround compensation `rgb · Y^(g−1)`.
    Rec2100SurroundFwd,
    /// Inverse of the Rec.2100 surround compensation.
    Rec2100SurroundInv,
    /// ACES 1.0 dark to dim surround compensation.
    AcesDarkToDim10Fwd,
    /// ACES 1.0 dim to dark surround compensation.
    AcesDarkToDim10Inv,
}

impl FixedFunctionStyle {
    /// Style evaluating the inverse function.
    pub const fn inverse(self) -> Self {
        match self {
            Self::RgbToHsv => Self::HsvToRgb,
            Self::HsvToRgb => Self::RgbToHsv,
            Self::XyzToXyy => Self::XyyToXyz,
            Self::XyyToXyz => Self::XyzToXyy,
            Self::XyzToUvy => Self::UvyToXyz,
            Self::UvyToXyz => Self::XyzToUvy,
            Self::XyzToLuv => Self::LuvToXyz,
            Self::LuvToXyz => Self::XyzToLuv,
            Self::Rec2100SurroundFwd => Self::Rec2100SurroundInv,
            Self::Rec2100SurroundInv => Self::Rec2100SurroundFwd,
            Self::AcesDarkToDim10Fwd => Self::AcesDarkToDim10Inv,
            Self::AcesDarkToDim10Inv => Self::AcesDarkToDim10Fwd,
        }
    }

    /// Whether this is the forward member of its pair.
    pub const fn is_forward(self) -> bool {
        matches!(
            self,
            Self::RgbToHsv
                | Self::XyzToXyy
                | Self::XyzToUvy
                | Self::XyzToLuv
                | Self::Rec2100SurroundFwd
                | Self::AcesDarkToDim10Fwd
        )
    }

    /// Number of parameters the style takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Rec2100SurroundFwd | Self::Rec2100SurroundInv => 1,
            _ => 0,
        }
    }

    /// Style name used in cache ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::RgbToHsv => "RGB_TO_HSV",
            Self::HsvToRgb => "HSV_TO_RGB",
            Self::XyzToXyy => "XYZ_TO_xyY",
            Self::XyyToXyz => "xyY_TO_XYZ",
            Self::XyzToUvy => "XYZ_TO_uvY",
            Self::UvyToXyz => "uvY_TO_XYZ",
            Self::XyzToLuv => "XYZ_TO_LUV",
            Self::LuvToXyz => "LUV_TO_XYZ",
            Self::Rec2100SurroundFwd => "REC2100_Surround_FWD",
            Self::Rec2100SurroundInv => "REC2100_Surround_INV",
            Self::AcesDarkToDim10Fwd => "ACES_DarkToDim10_FWD",
            Self::AcesDarkToDim10Inv => "ACES_DarkToDim10_INV",
        }
    }
}

/// Fixed function with its parameter vector.
#[derive(Debug, Clone)]
pub struct FixedFunctionOpData {
    /// Function and direction.
    pub style: FixedFunctionStyle,
    /// Parameters, as many as the style's arity.
    pub params: Vec<f64>,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl FixedFunctionOpData {
    /// Function with parameters.
    pub fn new(style: FixedFunctionStyle, params: Vec<f64>) -> Self {
        Self {
            style,
            params,
            metadata: FormatMetadata::default(),
        }
    }

    /// Parameterless function.
    pub fn from_style(style: FixedFunctionStyle) -> Self {
        Self::new(style, Vec::new())
    }

    /// Direction implied by the style.
    pub fn direction(&self) -> TransformDirection {
        if self.style.is_forward() {
            TransformDirection::Forward
        } else {
            TransformDirection::Inverse
        }
    }

    /// Checks the parameter count and bounds.
    pub fn validate(&self) -> OpResult<()> {
        let arity = self.style.arity();
        if self.params.len() != arity {
            return Err(OpError::invalid(format!(
                "fixed function {} takes {arity} parameters, got {}",
                self.style.name(),
                self.params.len()
            )));
        }
        if arity == 1 {
            let g = self.params[0];
            if !g.is_finite() || !(0.01..=100.0).contains(&g) {
                return Err(OpError::invalid(format!(
                    "surround gamma must be in [0.01, 100], got {g}"
                )));
            }
        }
        Ok(())
    }

    /// Fixed functions are never identities.
    pub fn is_identity(&self) -> bool {
        false
    }

    /// Fixed functions are never no-ops.
    pub fn is_no_op(&self) -> bool {
        false
    }

    /// Every style mixes channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        true
    }

    /// Pairs undo each other exactly.
    pub fn identity_replacement(&self) -> OpData {
        MatrixOpData::identity().into()
    }

    /// Opposite style, same parameters.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.style = self.style.inverse();
        inv
    }

    /// Opposite styles with equal parameters, or the same surround style
    /// with reciprocal gamma.
    pub fn is_inverse(&self, other: &Self) -> bool {
        if self.style == other.style {
            return match self.style {
                FixedFunctionStyle::Rec2100SurroundFwd | FixedFunctionStyle::Rec2100SurroundInv => {
                    matches!((self.params.first(), other.params.first()), (Some(a), Some(b)) if *a == 1.0 / *b)
                }
                _ => false,
            };
        }
        self.style.inverse() == other.style && self.params == other.params
    }

    /// Surround compensation exponent applied to luminance, `g − 1`.
    ///
    /// `None` for styles without surround gamma.
    pub fn surround_power(&self) -> Option<f64> {
        let gamma = match self.style {
            FixedFunctionStyle::Rec2100SurroundFwd => self.params.first().copied()?,
            FixedFunctionStyle::Rec2100SurroundInv => 1.0 / self.params.first().copied()?,
            FixedFunctionStyle::AcesDarkToDim10Fwd => ACES_DARK_TO_DIM_GAMMA,
            FixedFunctionStyle::AcesDarkToDim10Inv => 1.0 / ACES_DARK_TO_DIM_GAMMA,
            _ => return None,
        };
        Some(gamma - 1.0)
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = format!("FixedFunction {} ", self.style.name());
        push_values(&mut id, &self.params);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_is_checked() {
        use FixedFunctionStyle::*;
        assert!(FixedFunctionOpData::from_style(RgbToHsv).validate().is_ok());
        assert!(FixedFunctionOpData::new(RgbToHsv, vec![1.0]).validate().is_err());
        assert!(FixedFunctionOpData::from_style(Rec2100SurroundFwd).validate().is_err());
        assert!(FixedFunctionOpData::new(Rec2100SurroundFwd, vec![0.78]).validate().is_ok());
        assert!(FixedFunctionOpData::new(Rec2100SurroundFwd, vec![0.0]).validate().is_err());
    }

    #[test]
    fn styles_pair_up() {
        for style in [
            FixedFunctionStyle::RgbToHsv,
            FixedFunctionStyle::XyzToXyy,
            FixedFunctionStyle::XyzToUvy,
            FixedFunctionStyle::XyzToLuv,
            FixedFunctionStyle::AcesDarkToDim10Fwd,
        ] {
            let f = FixedFunctionOpData::from_style(style);
            assert!(f.direction().is_forward());
            assert!(!f.inverse().direction().is_forward());
            assert!(f.is_inverse(&f.inverse()));
            assert!(!f.is_inverse(&f));
        }
    }

    #[test]
    fn surround_with_reciprocal_gamma_is_a_pair() {
        let a = FixedFunctionOpData::new(FixedFunctionStyle::Rec2100SurroundFwd, vec![0.8]);
        let b = FixedFunctionOpData::new(FixedFunctionStyle::Rec2100SurroundFwd, vec![1.25]);
        assert!(a.is_inverse(&b));
        assert_eq!(a.surround_power(), Some(0.8 - 1.0));
        assert_eq!(a.inverse().surround_power(), Some(1.25 - 1.0));
    }
}

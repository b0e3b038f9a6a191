//! Per-channel power with selectable negative handling.

use super::{FormatMetadata, MatrixOpData, OpData, RangeOpData, TransformDirection, push_values};
use crate::error::{OpError, OpResult};

/// How an exponent treats negative inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NegativeStyle {
    /// Negatives become zero.
    #[default]
    Clamp,
    /// `sign(x)·|x|^e`.
    Mirror,
    /// Negatives are unchanged.
    PassThru,
}

impl NegativeStyle {
    /// Style name used in cache ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Mirror => "mirror",
            Self::PassThru => "passThru",
        }
    }
}

/// `x^e` per RGBA channel.
#[derive(Debug, Clone)]
pub struct ExponentOpData {
    /// Red, green, blue and alpha exponents.
    pub exponent: [f64; 4],
    /// Negative handling.
    pub negative_style: NegativeStyle,
    /// Evaluation direction; inverse uses `1/e`.
    pub direction: TransformDirection,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl ExponentOpData {
    /// Forward exponent with clamped negatives.
    pub fn new(exponent: [f64; 4]) -> Self {
        Self {
            exponent,
            negative_style: NegativeStyle::Clamp,
            direction: TransformDirection::Forward,
            metadata: FormatMetadata::default(),
        }
    }

    /// Sets the negative handling.
    pub fn with_negative_style(mut self, style: NegativeStyle) -> Self {
        self.negative_style = style;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: TransformDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// Exponents as applied, after direction.
    pub fn effective_exponent(&self) -> [f64; 4] {
        if self.direction.is_forward() {
            self.exponent
        } else {
            self.exponent.map(|e| 1.0 / e)
        }
    }

    /// Exponents must be finite and positive.
    pub fn validate(&self) -> OpResult<()> {
        if self.exponent.iter().any(|e| !e.is_finite() || *e <= 0.0) {
            return Err(OpError::invalid("exponents must be finite and positive"));
        }
        Ok(())
    }

    /// Every exponent is 1.
    pub fn is_identity(&self) -> bool {
        self.exponent.iter().all(|&e| e == 1.0)
    }

    /// Identity that keeps negatives.
    pub fn is_no_op(&self) -> bool {
        self.is_identity() && self.negative_style != NegativeStyle::Clamp
    }

    /// Channels are independent.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// `[0, +∞)` for the clamping style, identity matrix otherwise.
    pub fn identity_replacement(&self) -> OpData {
        match self.negative_style {
            NegativeStyle::Clamp => RangeOpData::clamp(Some(0.0), None).into(),
            _ => MatrixOpData::identity().into(),
        }
    }

    /// Same exponents, opposite direction.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.direction = self.direction.inverse();
        inv
    }

    /// Same style and effective exponents that multiply to 1.
    pub fn is_inverse(&self, other: &Self) -> bool {
        if self.negative_style != other.negative_style {
            return false;
        }
        if self.direction != other.direction {
            return self.exponent == other.exponent;
        }
        let a = self.effective_exponent();
        let b = other.effective_exponent();
        a.iter().zip(b).all(|(x, y)| (x * y - 1.0).abs() < 1e-12)
    }

    /// Multiplies effective exponents of two ops with the same style.
    pub fn compose(&self, next: &Self) -> Option<Self> {
        if self.negative_style != next.negative_style {
            return None;
        }
        let a = self.effective_exponent();
        let b = next.effective_exponent();
        let mut exponent = [0.0; 4];
        for (c, e) in exponent.iter_mut().enumerate() {
            let v = a[c] * b[c];
            *e = if (v - 1.0).abs() < 1e-9 { 1.0 } else { v };
        }
        let mut out = Self::new(exponent).with_negative_style(self.negative_style);
        out.metadata = self.metadata.clone();
        Some(out)
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = format!("Exponent {} {} ", self.direction.name(), self.negative_style.name());
        push_values(&mut id, &self.exponent);
        id
    }
}

//! Exposure, contrast and gamma around a pivot.
//!
//! Exposure, contrast and gamma are held as [`DynamicProperty`] handles so
//! they can be adjusted after finalization when marked dynamic. Alpha
//! passes through unchanged.

use super::{FormatMetadata, MatrixOpData, OpData, RangeOpData, TransformDirection, push_values};
use crate::dynamic::{DynamicProperty, DynamicPropertyType};
use crate::error::{OpError, OpResult};

/// Smallest effective contrast.
pub const MIN_CONTRAST: f64 = 0.001;
/// Smallest effective pivot.
pub const MIN_PIVOT: f64 = 0.001;
/// Power approximating a video OETF.
pub const VIDEO_OETF_POWER: f64 = 0.54;

/// Encoding the adjustment assumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExposureContrastStyle {
    /// Scene-linear input.
    #[default]
    Linear,
    /// Video-encoded input.
    Video,
    /// Log-encoded input.
    Logarithmic,
}

impl ExposureContrastStyle {
    /// Style name used in cache ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Video => "video",
            Self::Logarithmic => "log",
        }
    }
}

/// Exposure and contrast parameters.
#[derive(Debug, Clone)]
pub struct ExposureContrastOpData {
    /// Encoding.
    pub style: ExposureContrastStyle,
    /// Evaluation direction.
    pub direction: TransformDirection,
    /// Exposure in stops.
    pub exposure: DynamicProperty,
    /// Contrast around the pivot.
    pub contrast: DynamicProperty,
    /// Extra power multiplied into the contrast.
    pub gamma: DynamicProperty,
    /// Value contrast pivots around.
    pub pivot: f64,
    /// Log units per stop, log style only.
    pub log_exposure_step: f64,
    /// Log value of 18% grey, log style only.
    pub log_mid_gray: f64,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl Default for ExposureContrastOpData {
    fn default() -> Self {
        Self::new(ExposureContrastStyle::Linear)
    }
}

impl ExposureContrastOpData {
    /// Identity parameters with default pivot and log constants.
    pub fn new(style: ExposureContrastStyle) -> Self {
        Self {
            style,
            direction: TransformDirection::Forward,
            exposure: DynamicProperty::new_double(DynamicPropertyType::Exposure, 0.0, false),
            contrast: DynamicProperty::new_double(DynamicPropertyType::Contrast, 1.0, false),
            gamma: DynamicProperty::new_double(DynamicPropertyType::Gamma, 1.0, false),
            pivot: 0.18,
            log_exposure_step: 0.088,
            log_mid_gray: 0.435,
            metadata: FormatMetadata::default(),
        }
    }

    /// Sets static exposure, contrast and gamma.
    pub fn with_values(mut self, exposure: f64, contrast: f64, gamma: f64) -> Self {
        self.exposure = DynamicProperty::new_double(DynamicPropertyType::Exposure, exposure, false);
        self.contrast = DynamicProperty::new_double(DynamicPropertyType::Contrast, contrast, false);
        self.gamma = DynamicProperty::new_double(DynamicPropertyType::Gamma, gamma, false);
        self
    }

    /// Sets the pivot.
    pub fn with_pivot(mut self, pivot: f64) -> Self {
        self.pivot = pivot;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: TransformDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Makes the property of `kind` dynamic, keeping its value, and
    /// returns the new handle.
    ///
    /// Returns `None` for kinds this operator does not hold.
    pub fn make_dynamic(&mut self, kind: DynamicPropertyType) -> Option<DynamicProperty> {
        let slot = self.slot_mut(kind)?;
        let prop = DynamicProperty::new(kind, slot.value(), true);
        *slot = prop.clone();
        Some(prop)
    }

    fn slot_mut(&mut self, kind: DynamicPropertyType) -> Option<&mut DynamicProperty> {
        match kind {
            DynamicPropertyType::Exposure => Some(&mut self.exposure),
            DynamicPropertyType::Contrast => Some(&mut self.contrast),
            DynamicPropertyType::Gamma => Some(&mut self.gamma),
            _ => None,
        }
    }

    /// Evaluation direction.
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// Held property handles.
    pub fn properties(&self) -> [&DynamicProperty; 3] {
        [&self.exposure, &self.contrast, &self.gamma]
    }

    /// Whether any handle is dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.properties().iter().any(|p| p.is_dynamic())
    }

    /// Replaces the dynamic handle of the same kind with `prop`.
    pub fn replace_property(&mut self, prop: &DynamicProperty) -> bool {
        match self.slot_mut(prop.kind()) {
            Some(slot) if slot.is_dynamic() => {
                *slot = prop.clone();
                true
            }
            _ => false,
        }
    }

    /// Replaces every handle with a static copy of its current value.
    pub fn freeze(&mut self) {
        for slot in [&mut self.exposure, &mut self.contrast, &mut self.gamma] {
            if slot.is_dynamic() {
                *slot = slot.frozen();
            }
        }
    }

    /// Checks the pivot and log constants.
    pub fn validate(&self) -> OpResult<()> {
        if !self.pivot.is_finite() || self.pivot <= 0.0 {
            return Err(OpError::invalid(format!(
                "exposure/contrast pivot must be positive, got {}",
                self.pivot
            )));
        }
        if !self.log_exposure_step.is_finite() || self.log_exposure_step <= 0.0 {
            return Err(OpError::invalid("log exposure step must be positive"));
        }
        if !self.log_mid_gray.is_finite() || self.log_mid_gray <= 0.0 {
            return Err(OpError::invalid("log mid gray must be positive"));
        }
        Ok(())
    }

    /// Static zero exposure with unit contrast and gamma.
    pub fn is_identity(&self) -> bool {
        !self.is_dynamic()
            && self.exposure.double() == 0.0
            && self.contrast.double() == 1.0
            && self.gamma.double() == 1.0
    }

    /// Same as [`is_identity`](Self::is_identity).
    pub fn is_no_op(&self) -> bool {
        self.is_identity()
    }

    /// Channels are independent.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// Linear and video pairs with contrast clamp negatives to zero; other
    /// pairs need nothing.
    pub fn identity_replacement(&self) -> OpData {
        let contrast = self.contrast.double() * self.gamma.double();
        match self.style {
            ExposureContrastStyle::Linear | ExposureContrastStyle::Video if contrast != 1.0 => {
                RangeOpData::clamp(Some(0.0), None).into()
            }
            _ => MatrixOpData::identity().into(),
        }
    }

    /// Same parameters, opposite direction.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.direction = self.direction.inverse();
        inv
    }

    /// Opposite directions over equal static parameters.
    pub fn is_inverse(&self, other: &Self) -> bool {
        !self.is_dynamic()
            && !other.is_dynamic()
            && self.direction != other.direction
            && self.style == other.style
            && self.exposure.double() == other.exposure.double()
            && self.contrast.double() == other.contrast.double()
            && self.gamma.double() == other.gamma.double()
            && self.pivot == other.pivot
            && self.log_exposure_step == other.log_exposure_step
            && self.log_mid_gray == other.log_mid_gray
    }

    /// Parameter digest; dynamic values are left out.
    pub fn cache_id(&self) -> String {
        let mut id = format!(
            "ExposureContrast {} {} {} {} {} ",
            self.style.name(),
            self.direction.name(),
            self.exposure.cache_id(),
            self.contrast.cache_id(),
            self.gamma.cache_id()
        );
        push_values(&mut id, &[self.pivot, self.log_exposure_step, self.log_mid_gray]);
        id
    }
}

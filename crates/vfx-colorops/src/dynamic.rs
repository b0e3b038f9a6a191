//! Dynamic properties for runtime parameter adjustment.
//!
//! A [`DynamicProperty`] is a shared handle to a parameter value that may
//! change between `apply` calls without rebuilding the processor. Ops that
//! reference the same handle observe the same value; a pipeline unifies
//! handles of each kind so that one mutation reaches every op.
//!
//! Reads and writes are individually synchronized, but callers must not
//! mutate a property while an `apply` that reads it is running if they
//! need a consistent value across the whole image.
//!
//! # Example
//!
//! ```rust
//! use vfx_colorops::{DynamicProperty, DynamicPropertyType};
//!
//! let exposure = DynamicProperty::new_double(DynamicPropertyType::Exposure, 0.0, true);
//! let shared = exposure.clone();
//! exposure.set_double(1.5);
//! assert_eq!(shared.double(), 1.5);
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Kinds of dynamic property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynamicPropertyType {
    /// Exposure in stops.
    Exposure,
    /// Contrast multiplier around a pivot.
    Contrast,
    /// Gamma power.
    Gamma,
    /// Grading primary parameter block.
    GradingPrimary,
    /// Grading RGB curve parameter block.
    GradingRgbCurve,
    /// Grading tone parameter block.
    GradingTone,
}

impl DynamicPropertyType {
    /// Every kind.
    pub const ALL: [DynamicPropertyType; 6] = [
        Self::Exposure,
        Self::Contrast,
        Self::Gamma,
        Self::GradingPrimary,
        Self::GradingRgbCurve,
        Self::GradingTone,
    ];

    /// Lowercase name, used in shader uniform names.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exposure => "exposure",
            Self::Contrast => "contrast",
            Self::Gamma => "gamma",
            Self::GradingPrimary => "grading_primary",
            Self::GradingRgbCurve => "grading_rgbcurve",
            Self::GradingTone => "grading_tone",
        }
    }
}

/// Value held by a dynamic property.
///
/// Grading kinds carry an opaque parameter block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynamicValue {
    /// A scalar (exposure, contrast, gamma).
    Double(f64),
    /// A parameter block.
    Params(Vec<f64>),
}

struct Inner {
    kind: DynamicPropertyType,
    dynamic: bool,
    value: RwLock<DynamicValue>,
}

/// Shared handle to a runtime-adjustable parameter.
///
/// Cloning shares the underlying value. Whether a handle is dynamic is
/// fixed at creation; [`frozen`](Self::frozen) returns a detached static
/// copy.
#[derive(Clone)]
pub struct DynamicProperty(Arc<Inner>);

impl DynamicProperty {
    /// Creates a scalar property.
    pub fn new_double(kind: DynamicPropertyType, value: f64, dynamic: bool) -> Self {
        Self::new(kind, DynamicValue::Double(value), dynamic)
    }

    /// Creates a property holding any value.
    pub fn new(kind: DynamicPropertyType, value: DynamicValue, dynamic: bool) -> Self {
        Self(Arc::new(Inner {
            kind,
            dynamic,
            value: RwLock::new(value),
        }))
    }

    /// Kind of this property.
    #[inline]
    pub fn kind(&self) -> DynamicPropertyType {
        self.0.kind
    }

    /// Whether the value may change after finalization.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.0.dynamic
    }

    /// Current value.
    pub fn value(&self) -> DynamicValue {
        self.0
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current scalar value; parameter blocks report their first entry.
    pub fn double(&self) -> f64 {
        match &*self.0.value.read().unwrap_or_else(PoisonError::into_inner) {
            DynamicValue::Double(v) => *v,
            DynamicValue::Params(p) => p.first().copied().unwrap_or(0.0),
        }
    }

    /// Replaces the value.
    pub fn set_value(&self, value: DynamicValue) {
        *self.0.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Replaces the value with a scalar.
    pub fn set_double(&self, value: f64) {
        self.set_value(DynamicValue::Double(value));
    }

    /// Whether both handles share the same underlying value.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Detached, non-dynamic copy holding the current value.
    pub fn frozen(&self) -> Self {
        Self::new(self.kind(), self.value(), false)
    }

    /// Unshared copy of the handle holding the current value.
    pub fn detached(&self) -> Self {
        Self::new(self.kind(), self.value(), self.is_dynamic())
    }

    /// Identifier of the current value for cache ids.
    ///
    /// Dynamic handles contribute only their kind, since their value is
    /// read at apply time.
    pub fn cache_id(&self) -> String {
        if self.is_dynamic() {
            format!("{}:dynamic", self.kind().name())
        } else {
            match self.value() {
                DynamicValue::Double(v) => format!("{}:{v:.7}", self.kind().name()),
                DynamicValue::Params(p) => format!("{}:{p:?}", self.kind().name()),
            }
        }
    }
}

impl fmt::Debug for DynamicProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicProperty")
            .field("kind", &self.kind())
            .field("dynamic", &self.is_dynamic())
            .field("value", &self.value())
            .finish()
    }
}

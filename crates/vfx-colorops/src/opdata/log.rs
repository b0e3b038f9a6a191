//! Logarithm with affine parameters and an optional camera toe.
//!
//! Forward maps linear to log:
//!
//! ```text
//! y = logSlope · log_base(max(linSlope · x + linOffset, FLT_MIN)) + logOffset
//! ```
//!
//! Camera style replaces the curve below `linSideBreak` with the straight
//! line that meets it there, by default with matching slope.

use super::{FormatMetadata, MatrixOpData, OpData, RangeOpData, TransformDirection, push_values};
use crate::error::{OpError, OpResult};

/// Parameters of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogParams {
    /// Multiplier of the logarithm.
    pub log_slope: f64,
    /// Offset added after the logarithm.
    pub log_offset: f64,
    /// Multiplier of the linear input.
    pub lin_slope: f64,
    /// Offset added to the scaled linear input.
    pub lin_offset: f64,
    /// Camera break point on the linear side.
    pub lin_side_break: Option<f64>,
    /// Slope of the camera linear segment; derived when unset.
    pub linear_slope: Option<f64>,
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            log_slope: 1.0,
            log_offset: 0.0,
            lin_slope: 1.0,
            lin_offset: 0.0,
            lin_side_break: None,
            linear_slope: None,
        }
    }
}

impl LogParams {
    /// Affine log parameters.
    pub fn affine(log_slope: f64, log_offset: f64, lin_slope: f64, lin_offset: f64) -> Self {
        Self {
            log_slope,
            log_offset,
            lin_slope,
            lin_offset,
            ..Default::default()
        }
    }

    /// Adds a camera break point.
    pub fn with_break(mut self, lin_side_break: f64, linear_slope: Option<f64>) -> Self {
        self.lin_side_break = Some(lin_side_break);
        self.linear_slope = linear_slope;
        self
    }

    fn values(&self) -> [f64; 6] {
        [
            self.log_slope,
            self.log_offset,
            self.lin_slope,
            self.lin_offset,
            self.lin_side_break.unwrap_or(f64::NAN),
            self.linear_slope.unwrap_or(f64::NAN),
        ]
    }
}

/// Log curve per RGB channel; alpha passes through.
#[derive(Debug, Clone)]
pub struct LogOpData {
    /// Logarithm base.
    pub base: f64,
    /// Red, green and blue parameters.
    pub params: [LogParams; 3],
    /// Evaluation direction.
    pub direction: TransformDirection,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl LogOpData {
    /// Plain `log_base(x)` forward.
    pub fn with_base(base: f64) -> Self {
        Self::new(base, [LogParams::default(); 3])
    }

    /// Log with per-channel parameters.
    pub fn new(base: f64, params: [LogParams; 3]) -> Self {
        Self {
            base,
            params,
            direction: TransformDirection::Forward,
            metadata: FormatMetadata::default(),
        }
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

    /// Whether the channels carry a camera break.
    pub fn is_camera(&self) -> bool {
        self.params[0].lin_side_break.is_some()
    }

    /// Whether all channels share parameters.
    pub fn is_channel_uniform(&self) -> bool {
        self.params[0] == self.params[1] && self.params[0] == self.params[2]
    }

    /// Checks the base, slopes and camera break.
    pub fn validate(&self) -> OpResult<()> {
        if !self.base.is_finite() || self.base <= 1.0 {
            return Err(OpError::invalid(format!("log base must exceed 1, got {}", self.base)));
        }
        let camera = self.is_camera();
        for p in &self.params {
            if [p.log_slope, p.log_offset, p.lin_slope, p.lin_offset]
                .iter()
                .any(|v| !v.is_finite())
            {
                return Err(OpError::invalid("log parameters must be finite"));
            }
            if p.log_slope == 0.0 {
                return Err(OpError::invalid("log slopes cannot be zero"));
            }
            // the pair replacement clamps from below, so the domain must open upwards
            if p.lin_slope <= 0.0 {
                return Err(OpError::invalid(format!(
                    "linear slope must be positive, got {}",
                    p.lin_slope
                )));
            }
            if p.lin_side_break.is_some() != camera {
                return Err(OpError::invalid("camera break must be set on every channel"));
            }
            if p.linear_slope.is_some() && p.lin_side_break.is_none() {
                return Err(OpError::invalid("linear slope needs a camera break"));
            }
            if let Some(brk) = p.lin_side_break {
                if !brk.is_finite() || p.lin_slope * brk + p.lin_offset <= 0.0 {
                    return Err(OpError::invalid("camera break must lie inside the log domain"));
                }
            }
        }
        Ok(())
    }

    /// Logs are never identities.
    pub fn is_identity(&self) -> bool {
        false
    }

    /// Logs are never no-ops.
    pub fn is_no_op(&self) -> bool {
        false
    }

    /// Channels are independent.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// Forward-then-inverse clamps to the log domain; the other order and
    /// camera logs need nothing.
    ///
    /// Inverse-then-forward becomes a plain identity, so a NaN input stays
    /// NaN. Evaluating the pair instead floors NaN at the smallest positive
    /// float inside the log, giving `log_base(f32::MIN_POSITIVE)` (about -126
    /// for base 2). The replacement keeps the NaN on purpose.
    pub fn identity_replacement(&self) -> OpData {
        if self.direction.is_forward() && !self.is_camera() {
            let p = &self.params[0];
            let min = -p.lin_offset / p.lin_slope;
            RangeOpData::clamp(Some(min), None).into()
        } else {
            MatrixOpData::identity().into()
        }
    }

    /// Same parameters, opposite direction.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.direction = self.direction.inverse();
        inv
    }

    /// Opposite directions over the same channel-uniform parameters.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.direction != other.direction
            && self.base == other.base
            && self.is_channel_uniform()
            && other.is_channel_uniform()
            && self.params[0] == other.params[0]
    }

    /// Per-channel evaluation constants.
    pub fn channels(&self) -> [LogChannel; 3] {
        self.params.map(|p| LogChannel::new(self.base, p))
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        let mut id = format!("Log {} base={} ", self.direction.name(), self.base);
        let values: Vec<f64> = self.params.iter().flat_map(|p| p.values()).collect();
        push_values(&mut id, &values);
        id
    }
}

/// Evaluation constants of one log channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogChannel {
    /// `logSlope / ln(base)`.
    pub log_scale: f64,
    /// Offset after the logarithm.
    pub log_offset: f64,
    /// Linear-side slope.
    pub lin_slope: f64,
    /// Linear-side offset.
    pub lin_offset: f64,
    /// Camera segment: linear-side break, log-side break, slope, offset.
    pub camera: Option<CameraSegment>,
}

/// Straight segment below the camera break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSegment {
    /// Break on the linear side.
    pub lin_break: f64,
    /// Break on the log side.
    pub log_break: f64,
    /// Segment slope.
    pub slope: f64,
    /// Segment offset.
    pub offset: f64,
}

impl LogChannel {
    fn new(base: f64, p: LogParams) -> Self {
        let log_scale = p.log_slope / base.ln();
        let camera = p.lin_side_break.map(|brk| {
            let inner = p.lin_slope * brk + p.lin_offset;
            let log_break = log_scale * inner.ln() + p.log_offset;
            let slope = p.linear_slope.unwrap_or(log_scale * p.lin_slope / inner);
            CameraSegment {
                lin_break: brk,
                log_break,
                slope,
                offset: log_break - slope * brk,
            }
        });
        Self {
            log_scale,
            log_offset: p.log_offset,
            lin_slope: p.lin_slope,
            lin_offset: p.lin_offset,
            camera,
        }
    }

    /// Linear to log.
    pub fn lin_to_log(&self, x: f32) -> f32 {
        if let Some(c) = &self.camera {
            if f64::from(x) <= c.lin_break {
                return (c.slope as f32) * x + c.offset as f32;
            }
        }
        let inner = (self.lin_slope as f32 * x + self.lin_offset as f32).max(f32::MIN_POSITIVE);
        self.log_scale as f32 * inner.ln() + self.log_offset as f32
    }

    /// Log to linear.
    pub fn log_to_lin(&self, y: f32) -> f32 {
        if let Some(c) = &self.camera {
            if f64::from(y) <= c.log_break {
                return (y - c.offset as f32) / c.slope as f32;
            }
        }
        (((y - self.log_offset as f32) / self.log_scale as f32).exp() - self.lin_offset as f32)
            / self.lin_slope as f32
    }
}

//! Per-channel lookup table operator.

use super::{FormatMetadata, MatrixOpData, OpData, RangeOpData, TransformDirection, digest_samples};
use crate::error::{OpError, OpResult};
use vfx_core::pixel::HALF_DOMAIN_SIZE;
use vfx_lut::{Interpolation, Lut1D};

/// Tolerance used to recognize identity tables.
pub(crate) const LUT1D_IDENTITY_TOLERANCE: f32 = 1e-6;

/// 1D LUT in either direction.
///
/// The inverse direction evaluates the exact inverse of the table on the
/// CPU. Finalization flattens non-monotonic segments of inverse tables so
/// the inverse is well defined.
#[derive(Debug, Clone)]
pub struct Lut1DOpData {
    /// Forward table.
    pub lut: Lut1D,
    /// Evaluation direction.
    pub direction: TransformDirection,
    /// Descriptive metadata.
    pub metadata: FormatMetadata,
}

impl Lut1DOpData {
    /// Forward LUT.
    pub fn new(lut: Lut1D) -> Self {
        Self {
            lut,
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

    /// Checks table sizes and interpolation.
    pub fn validate(&self) -> OpResult<()> {
        let n = self.lut.r.len();
        if self.lut.g.len() != n || self.lut.b.len() != n {
            return Err(OpError::invalid("1D LUT channels differ in length"));
        }
        if n < 2 {
            return Err(OpError::invalid("1D LUT needs at least 2 entries"));
        }
        if self.lut.half_domain && n != HALF_DOMAIN_SIZE {
            return Err(OpError::invalid(format!(
                "half-domain 1D LUT needs {HALF_DOMAIN_SIZE} entries, got {n}"
            )));
        }
        if self.lut.interpolation == Interpolation::Tetrahedral {
            return Err(OpError::invalid("1D LUT cannot use tetrahedral interpolation"));
        }
        Ok(())
    }

    /// Flattens inverse tables to monotonic curves.
    ///
    /// Each channel keeps the overall direction of its end points; samples
    /// that step backwards repeat the previous value.
    pub fn finalize(&mut self) {
        if self.direction.is_forward() {
            return;
        }
        let half = self.lut.half_domain;
        for ch in [&mut self.lut.r, &mut self.lut.g, &mut self.lut.b] {
            if half {
                // positive half first, then negatives from -0 downwards
                flatten(&mut ch[..0x7c00]);
                let neg = &mut ch[0x8000..0xfc00];
                flatten(neg);
            } else {
                flatten(ch);
            }
        }
    }

    /// Whether the table reproduces its input.
    pub fn is_identity(&self) -> bool {
        self.lut.is_identity(LUT1D_IDENTITY_TOLERANCE)
    }

    /// Normal-domain tables clamp to `[0, 1]`.
    pub fn is_no_op(&self) -> bool {
        false
    }

    /// Tables are applied per channel.
    pub fn has_channel_crosstalk(&self) -> bool {
        false
    }

    /// Clamp of a forward identity: `[0, 1]` for normal-domain tables,
    /// nothing for half-domain tables; an inverse clamps to the forward
    /// output extremes.
    pub fn identity_replacement(&self) -> OpData {
        if self.direction.is_forward() {
            if self.lut.half_domain {
                MatrixOpData::identity().into()
            } else {
                RangeOpData::unit().into()
            }
        } else {
            let (lo, hi) = self.lut.output_range();
            RangeOpData::clamp(Some(lo as f64), Some(hi as f64)).into()
        }
    }

    /// Same table, opposite direction.
    pub fn inverse(&self) -> Self {
        let mut inv = self.clone();
        inv.direction = self.direction.inverse();
        inv
    }

    /// Opposite directions over the same table.
    pub fn is_inverse(&self, other: &Self) -> bool {
        self.direction != other.direction
            && self.lut.half_domain == other.lut.half_domain
            && self.lut.r == other.lut.r
            && self.lut.g == other.lut.g
            && self.lut.b == other.lut.b
    }

    /// Two forward tables as one.
    ///
    /// The result keeps the domain of `self`: half-domain stays half-domain,
    /// normal-domain uses the larger of the two sizes.
    pub fn compose(&self, next: &Self) -> Option<Self> {
        if !self.direction.is_forward() || !next.direction.is_forward() {
            return None;
        }
        let lut = if self.lut.half_domain {
            Lut1D::from_half_fn(|x| next.lut.apply(self.lut.apply([x, x, x])))
        } else {
            let size = self.lut.size().max(next.lut.size());
            Lut1D::from_fn(size, |x| next.lut.apply(self.lut.apply([x, x, x])))
        };
        let mut out = Self::new(lut);
        out.metadata = self.metadata.clone();
        Some(out)
    }

    /// Forward table approximating the inverse.
    pub fn bake_inverse(&self) -> Self {
        let mut out = Self::new(self.lut.inverse().bake());
        out.metadata = self.metadata.clone();
        out
    }

    /// Parameter digest.
    pub fn cache_id(&self) -> String {
        format!(
            "Lut1D {} {} {} {}",
            self.direction.name(),
            if self.lut.half_domain { "half" } else { "normal" },
            self.lut.interpolation.name(),
            digest_samples([&self.lut.r[..], &self.lut.g[..], &self.lut.b[..]]),
        )
    }
}

/// Makes `values` monotonic in the direction of its end points.
fn flatten(values: &mut [f32]) {
    let Some((&first, &last)) = values.first().zip(values.last()) else {
        return;
    };
    let increasing = last >= first;
    let mut prev = first;
    for v in values.iter_mut().skip(1) {
        let stepped_back = if increasing { *v < prev } else { *v > prev };
        if stepped_back {
            *v = prev;
        } else {
            prev = *v;
        }
    }
}

//! Optimization flags.
//!
//! A bitmask selecting which rewrites the optimizer may perform. Each flag
//! is independently toggleable; the presets bundle them by how much
//! precision they trade for speed.
//!
//! # Environment Variables
//!
//! - `VFX_OPTIMIZATION_FLAGS` - overrides the requested mask. Parsed as an
//!   unsigned integer: `0x` hex, `0b` binary, `0o` or leading `0` octal,
//!   decimal otherwise.
//!
//! # Example
//!
//! ```rust
//! use vfx_colorops::OptimizationFlags;
//!
//! let flags = OptimizationFlags::LOSSLESS | OptimizationFlags::COMP_LUT1D;
//! assert!(flags.contains(OptimizationFlags::COMP_MATRIX));
//! assert!(!OptimizationFlags::LOSSLESS.contains(OptimizationFlags::LUT_INV_FAST));
//! ```

use std::env;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Environment variable overriding the requested flags.
pub const OPTIMIZATION_FLAGS_ENV: &str = "VFX_OPTIMIZATION_FLAGS";

/// Bitmask of optimizer rewrites.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationFlags(pub u32);

impl OptimizationFlags {
    /// No optimization at all.
    pub const NONE: Self = Self(0);

    /// Replace identity operators (other than gammas) with a matrix or range.
    pub const IDENTITY: Self = Self(0x0000_0001);
    /// Replace identity gammas.
    pub const IDENTITY_GAMMA: Self = Self(0x0000_0002);

    /// Cancel adjacent inverse CDL pairs.
    pub const PAIR_IDENTITY_CDL: Self = Self(0x0000_0040);
    /// Cancel adjacent inverse exposure/contrast pairs.
    pub const PAIR_IDENTITY_EXPOSURE_CONTRAST: Self = Self(0x0000_0080);
    /// Cancel adjacent inverse fixed-function pairs.
    pub const PAIR_IDENTITY_FIXED_FUNCTION: Self = Self(0x0000_0100);
    /// Cancel adjacent inverse gamma pairs.
    pub const PAIR_IDENTITY_GAMMA: Self = Self(0x0000_0200);
    /// Cancel adjacent inverse 1D LUT pairs.
    pub const PAIR_IDENTITY_LUT1D: Self = Self(0x0000_0400);
    /// Cancel adjacent inverse 3D LUT pairs.
    pub const PAIR_IDENTITY_LUT3D: Self = Self(0x0000_0800);
    /// Cancel adjacent inverse log pairs.
    pub const PAIR_IDENTITY_LOG: Self = Self(0x0000_1000);
    /// Cancel adjacent inverse exponent pairs.
    pub const PAIR_IDENTITY_EXPONENT: Self = Self(0x0000_4000);
    /// Cancel adjacent inverse matrix pairs.
    pub const PAIR_IDENTITY_MATRIX: Self = Self(0x0000_8000);

    /// Every pair-inverse flag.
    pub const PAIR_IDENTITIES: Self = Self(
        Self::PAIR_IDENTITY_CDL.0
            | Self::PAIR_IDENTITY_EXPOSURE_CONTRAST.0
            | Self::PAIR_IDENTITY_FIXED_FUNCTION.0
            | Self::PAIR_IDENTITY_GAMMA.0
            | Self::PAIR_IDENTITY_LUT1D.0
            | Self::PAIR_IDENTITY_LUT3D.0
            | Self::PAIR_IDENTITY_LOG.0
            | Self::PAIR_IDENTITY_EXPONENT.0
            | Self::PAIR_IDENTITY_MATRIX.0,
    );

    /// Compose adjacent exponents.
    pub const COMP_EXPONENT: Self = Self(0x0004_0000);
    /// Compose adjacent basic gammas.
    pub const COMP_GAMMA: Self = Self(0x0008_0000);
    /// Compose adjacent matrices.
    pub const COMP_MATRIX: Self = Self(0x0010_0000);
    /// Compose adjacent 1D LUTs (resamples, lossy).
    pub const COMP_LUT1D: Self = Self(0x0020_0000);
    /// Compose adjacent 3D LUTs (resamples, lossy).
    pub const COMP_LUT3D: Self = Self(0x0040_0000);
    /// Compose adjacent ranges.
    pub const COMP_RANGE: Self = Self(0x0080_0000);
    /// Bake a separable prefix into a 1D LUT for table-indexable inputs.
    pub const COMP_SEPARABLE_PREFIX: Self = Self(0x0100_0000);

    /// Replace inverse LUTs with baked forward approximations.
    pub const LUT_INV_FAST: Self = Self(0x0200_0000);
    /// Substitute simpler operator forms (CDL to matrices).
    pub const SIMPLIFY_OPS: Self = Self(0x0800_0000);
    /// Freeze dynamic properties before optimizing.
    pub const NO_DYNAMIC_PROPERTIES: Self = Self(0x1000_0000);

    /// Every flag.
    pub const ALL: Self = Self(0xffff_ffff);

    /// Rewrites that do not change results beyond float rounding.
    pub const LOSSLESS: Self = Self(
        Self::IDENTITY.0
            | Self::IDENTITY_GAMMA.0
            | Self::PAIR_IDENTITIES.0
            | Self::COMP_EXPONENT.0
            | Self::COMP_GAMMA.0
            | Self::COMP_MATRIX.0
            | Self::COMP_RANGE.0
            | Self::SIMPLIFY_OPS.0,
    );

    /// Lossless plus 1D LUT composition, fast inverses and prefix baking.
    pub const VERY_GOOD: Self = Self(
        Self::LOSSLESS.0
            | Self::COMP_LUT1D.0
            | Self::LUT_INV_FAST.0
            | Self::COMP_SEPARABLE_PREFIX.0,
    );

    /// Very good plus 3D LUT composition.
    pub const GOOD: Self = Self(Self::VERY_GOOD.0 | Self::COMP_LUT3D.0);

    /// Everything, including dynamic property freezing.
    pub const DRAFT: Self = Self::ALL;

    /// Default preset.
    pub const DEFAULT: Self = Self::VERY_GOOD;

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no flag is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Sets the bits of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Copy with the bits of `other` cleared.
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Applies the environment override, if any.
    ///
    /// An unparsable override is ignored with a warning and `requested` is
    /// returned unchanged.
    pub fn resolve(requested: Self) -> Self {
        match env::var(OPTIMIZATION_FLAGS_ENV) {
            Ok(raw) => match parse_unsigned(&raw) {
                Some(bits) => {
                    tracing::debug!(
                        requested = requested.0,
                        overridden = bits,
                        "optimization flags overridden from environment"
                    );
                    Self(bits)
                }
                None => {
                    tracing::warn!(
                        value = %raw,
                        "ignoring unparsable {OPTIMIZATION_FLAGS_ENV}"
                    );
                    requested
                }
            },
            Err(_) => requested,
        }
    }
}

/// Parses an unsigned integer, detecting the base from its prefix.
///
/// ```rust
/// use vfx_colorops::flags::parse_unsigned;
///
/// assert_eq!(parse_unsigned("0x10"), Some(16));
/// assert_eq!(parse_unsigned("0b101"), Some(5));
/// assert_eq!(parse_unsigned("017"), Some(15));
/// assert_eq!(parse_unsigned("42"), Some(42));
/// assert_eq!(parse_unsigned("0"), Some(0));
/// assert_eq!(parse_unsigned("fast"), None);
/// ```
pub fn parse_unsigned(s: &str) -> Option<u32> {
    let s = s.trim();
    let (digits, radix) = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (rest, 2)
    } else if let Some(rest) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        (rest, 8)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

impl BitOr for OptimizationFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OptimizationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for OptimizationFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for OptimizationFlags {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for OptimizationFlags {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for OptimizationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OptimizationFlags({:#010x})", self.0)
    }
}

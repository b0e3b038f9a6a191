//! 3-dimensional lookup table.
//!
//! A 3D LUT maps RGB input to RGB output through a cube of color values
//! sampled over `[0, 1]^3`. Inputs outside the cube are clamped; NaN reads
//! as 0.

use vfx_math::saturate;

use crate::{Interpolation, LutError, LutResult};

/// Grid size of a baked fast inverse.
pub const FAST_INVERSE_GRID: usize = 48;

/// Largest grid edge produced by composition.
pub const MAX_GRID_SIZE: usize = 129;

// Newton-Raphson settings for exact inversion.
const NEWTON_MAX_ITERS: usize = 30;
const NEWTON_TOLERANCE: f32 = 1e-6;
const NEWTON_DAMPING: f32 = 0.8;
const JACOBIAN_DELTA: f32 = 1e-4;

/// A 3-dimensional lookup table.
///
/// Stores a cube of RGB values indexed by input RGB. Standard sizes are
/// 17x17x17, 33x33x33, or 65x65x65.
///
/// # Structure
///
/// - `size^3` entries, each containing RGB output values
/// - Stored in R-major order: R varies fastest, then G, then B
/// - Nearest, trilinear or tetrahedral interpolation for lookup
///
/// # Example
///
/// ```rust
/// use vfx_lut::Lut3D;
///
/// let lut = Lut3D::identity(33);
/// let output = lut.apply([0.5, 0.3, 0.2]);
/// assert!((output[1] - 0.3).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// LUT data: [R][G][B] -> [R', G', B']
    /// Flattened as: [(r0,g0,b0), (r1,g0,b0), ..., (rN,gN,bN)]
    pub data: Vec<[f32; 3]>,
    /// Cube size (typically 17, 33, or 65)
    pub size: usize,
    /// Interpolation method
    pub interpolation: Interpolation,
}

impl Lut3D {
    /// Creates an identity (pass-through) 3D LUT.
    ///
    /// ```rust
    /// use vfx_lut::Lut3D;
    ///
    /// let lut = Lut3D::identity(17);
    /// assert!(lut.is_identity(1e-6));
    /// ```
    pub fn identity(size: usize) -> Self {
        Self::from_fn(size, |rgb| rgb)
    }

    /// Samples `f` on a `size^3` grid over the unit cube.
    ///
    /// Sizes below 2 are raised to 2.
    pub fn from_fn(size: usize, f: impl Fn([f32; 3]) -> [f32; 3]) -> Self {
        let size = size.max(2);
        let n = (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push(f([r as f32 / n, g as f32 / n, b as f32 / n]));
                }
            }
        }
        Self {
            data,
            size,
            interpolation: Interpolation::Linear,
        }
    }

    /// Creates a 3D LUT from raw data.
    ///
    /// Data must be in R-major order with exactly `size^3` entries.
    pub fn from_data(data: Vec<[f32; 3]>, size: usize) -> LutResult<Self> {
        if size < 2 {
            return Err(LutError::InvalidSize(format!(
                "3D LUT needs at least 2 entries per edge, got {size}"
            )));
        }
        let expected = size * size * size;
        if data.len() != expected {
            return Err(LutError::InvalidSize(format!(
                "expected {} entries for size {}, got {}",
                expected,
                size,
                data.len()
            )));
        }
        Ok(Self {
            data,
            size,
            interpolation: Interpolation::Linear,
        })
    }

    /// Sets the interpolation method.
    pub fn with_interpolation(mut self, interp: Interpolation) -> Self {
        self.interpolation = interp;
        self
    }

    /// Returns the total number of entries in the LUT.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.size * self.size * self.size
    }

    /// Returns the index for a given (r, g, b) grid position.
    #[inline]
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        (b * self.size + g) * self.size + r
    }

    /// Gets the value at grid position (r, g, b).
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[self.index(r, g, b)]
    }

    /// Applies the LUT with its own interpolation method.
    #[inline]
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.apply_with(self.interpolation, rgb)
    }

    /// Applies the LUT with an explicit interpolation method.
    pub fn apply_with(&self, interp: Interpolation, rgb: [f32; 3]) -> [f32; 3] {
        match interp {
            Interpolation::Nearest => self.apply_nearest(rgb),
            Interpolation::Linear => self.apply_trilinear(rgb),
            Interpolation::Tetrahedral => self.apply_tetrahedral(rgb),
        }
    }

    fn apply_nearest(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = (self.size - 1) as f32;
        let ri = (saturate(rgb[0]) * n).round() as usize;
        let gi = (saturate(rgb[1]) * n).round() as usize;
        let bi = (saturate(rgb[2]) * n).round() as usize;
        self.get(ri, gi, bi)
    }

    /// Base grid cell and fractional position inside it, per axis.
    #[inline]
    fn cell(&self, rgb: [f32; 3]) -> ([usize; 3], [f32; 3]) {
        let n = (self.size - 1) as f32;
        let mut base = [0usize; 3];
        let mut frac = [0.0f32; 3];
        for i in 0..3 {
            let p = saturate(rgb[i]) * n;
            base[i] = (p.floor() as usize).min(self.size - 2);
            frac[i] = p - base[i] as f32;
        }
        (base, frac)
    }

    /// The eight lattice values around `base`, indexed by corner bits
    /// (1 = +red, 2 = +green, 4 = +blue).
    #[inline]
    fn corners(&self, [r, g, b]: [usize; 3]) -> [[f32; 3]; 8] {
        std::array::from_fn(|k| self.get(r + (k & 1), g + ((k >> 1) & 1), b + ((k >> 2) & 1)))
    }

    fn apply_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (base, [fr, fg, fb]) = self.cell(rgb);
        let c = self.corners(base);
        let mix = |a: f32, b: f32, t: f32| a * (1.0 - t) + b * t;
        std::array::from_fn(|i| {
            let lo = mix(mix(c[0][i], c[1][i], fr), mix(c[2][i], c[3][i], fr), fg);
            let hi = mix(mix(c[4][i], c[5][i], fr), mix(c[6][i], c[7][i], fr), fg);
            mix(lo, hi, fb)
        })
    }

    fn apply_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (base, frac) = self.cell(rgb);
        let c = self.corners(base);

        // Walk from the low corner to the high one, taking the axis with the
        // largest fraction first; ties prefer red, then green.
        let mut axes = [0usize, 1, 2];
        axes.sort_by(|&a, &b| frac[b].total_cmp(&frac[a]));
        let first = 1 << axes[0];
        let second = first | (1 << axes[1]);

        std::array::from_fn(|i| {
            c[0][i]
                + frac[axes[0]] * (c[first][i] - c[0][i])
                + frac[axes[1]] * (c[second][i] - c[first][i])
                + frac[axes[2]] * (c[7][i] - c[second][i])
        })
    }

    /// Whether every grid entry equals its input within `tol`.
    pub fn is_identity(&self, tol: f32) -> bool {
        let n = (self.size - 1) as f32;
        let size = self.size;
        self.data.iter().enumerate().all(|(idx, v)| {
            let input = [
                (idx % size) as f32 / n,
                ((idx / size) % size) as f32 / n,
                (idx / (size * size)) as f32 / n,
            ];
            (0..3).all(|c| (v[c] - input[c]).abs() <= tol)
        })
    }

    /// Smallest and largest finite output component.
    pub fn output_range(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for v in self.data.iter().flatten().filter(|v| v.is_finite()) {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
        if lo > hi { (0.0, 0.0) } else { (lo, hi) }
    }

    /// Finds the input that maps to `target` using Newton-Raphson iteration.
    ///
    /// The search stays inside the unit cube, so targets outside the LUT's
    /// gamut resolve to the closest reachable input. Nearest-neighbor LUTs
    /// are inverted through their tetrahedral interpolant. NaN targets are
    /// read as 0, the way forward lookups read NaN inputs.
    pub fn invert_point(&self, target: [f32; 3]) -> [f32; 3] {
        let target = target.map(|v| if v.is_nan() { 0.0 } else { v });
        let interp = match self.interpolation {
            Interpolation::Nearest => Interpolation::Tetrahedral,
            other => other,
        };
        let eval = |p: [f32; 3]| self.apply_with(interp, p);

        let mut guess = [saturate(target[0]), saturate(target[1]), saturate(target[2])];
        for _ in 0..NEWTON_MAX_ITERS {
            let out = eval(guess);
            let err = [out[0] - target[0], out[1] - target[1], out[2] - target[2]];
            let err_mag = (err[0] * err[0] + err[1] * err[1] + err[2] * err[2]).sqrt();
            if !(err_mag >= NEWTON_TOLERANCE) {
                break;
            }

            // Numerical Jacobian; step backwards at the upper face.
            let mut jacobian = [[0.0f32; 3]; 3];
            for j in 0..3 {
                let mut stepped = guess;
                let step = if guess[j] + JACOBIAN_DELTA <= 1.0 {
                    JACOBIAN_DELTA
                } else {
                    -JACOBIAN_DELTA
                };
                stepped[j] += step;
                let out_stepped = eval(stepped);
                for i in 0..3 {
                    jacobian[i][j] = (out_stepped[i] - out[i]) / step;
                }
            }

            let dx = solve_3x3(&jacobian, &[-err[0], -err[1], -err[2]]);
            if dx == [0.0; 3] {
                break;
            }
            for i in 0..3 {
                guess[i] = saturate(guess[i] + NEWTON_DAMPING * dx[i]);
            }
        }
        guess
    }

    /// Bakes a `grid`-sized LUT approximating the inverse.
    ///
    /// ```rust
    /// use vfx_lut::Lut3D;
    ///
    /// let lut = Lut3D::from_fn(9, |c| [c[0] * 0.5 + 0.25, c[1], c[2]]);
    /// let inv = lut.bake_inverse(17);
    /// let back = inv.apply(lut.apply([0.4, 0.3, 0.2]));
    /// assert!((back[0] - 0.4).abs() < 1e-3);
    /// ```
    pub fn bake_inverse(&self, grid: usize) -> Self {
        Self::from_fn(grid, |target| self.invert_point(target))
            .with_interpolation(Interpolation::Tetrahedral)
    }
}

fn cross(u: [f32; 3], v: [f32; 3]) -> [f32; 3] {
    [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ]
}

/// Solves `a * x = b` through the adjugate: the columns of `a⁻¹` are the
/// cross products of the rows of `a`, scaled by `1 / det`.
///
/// Returns zeros for a singular system.
fn solve_3x3(a: &[[f32; 3]; 3], b: &[f32; 3]) -> [f32; 3] {
    let cols = [cross(a[1], a[2]), cross(a[2], a[0]), cross(a[0], a[1])];
    let det = a[0][0] * cols[0][0] + a[0][1] * cols[0][1] + a[0][2] * cols[0][2];
    if !(det.abs() >= 1e-10) {
        return [0.0; 3];
    }
    std::array::from_fn(|i| (b[0] * cols[0][i] + b[1] * cols[1][i] + b[2] * cols[2][i]) / det)
}

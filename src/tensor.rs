//! Small fixed-size tensor helpers for three spatial dimensions.
//!
//! Symmetric rank-2 tensors store their six independent components in the order
//! given by [`SYM_PAIRS`]. All algebra in the evolution system is written as
//! `from_fn`/`sum` comprehensions over these tables rather than unrolled per component.

use std::ops::{Index, IndexMut};

use thiserror::Error;

/// Independent index pairs of a symmetric 3×3 tensor, in storage order.
pub const SYM_PAIRS: [[usize; 2]; 6] = [[0, 0], [0, 1], [0, 2], [1, 1], [1, 2], [2, 2]];

/// Maps an index pair (in either order) to its storage slot in [`SYM_PAIRS`].
pub const fn sym(i: usize, j: usize) -> usize {
    const TABLE: [[usize; 3]; 3] = [[0, 1, 2], [1, 3, 4], [2, 4, 5]];
    TABLE[i][j]
}

/// Kronecker delta δᵢⱼ.
pub const fn delta(i: usize, j: usize) -> f64 {
    if i == j {
        1.0
    } else {
        0.0
    }
}

/// A spatial axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A direction index outside `0..3` was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid spatial axis {0}, expected 0, 1 or 2")]
pub struct InvalidAxis(pub usize);

impl TryFrom<usize> for Axis {
    type Error = InvalidAxis;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            2 => Ok(Axis::Z),
            _ => Err(InvalidAxis(value)),
        }
    }
}

pub type Vector = [f64; 3];

/// Sum over one repeated index.
#[inline]
pub fn sum1(mut f: impl FnMut(usize) -> f64) -> f64 {
    f(0) + f(1) + f(2)
}

/// Sum over two repeated indices.
#[inline]
pub fn sum2(mut f: impl FnMut(usize, usize) -> f64) -> f64 {
    let mut result = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            result += f(i, j);
        }
    }
    result
}

/// Sum over three repeated indices.
#[inline]
pub fn sum3(mut f: impl FnMut(usize, usize, usize) -> f64) -> f64 {
    let mut result = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                result += f(i, j, k);
            }
        }
    }
    result
}

/// A symmetric rank-2 tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Symmetric(pub [f64; 6]);

impl Symmetric {
    /// Builds a tensor by evaluating `f` once per independent component.
    #[inline]
    pub fn from_fn(mut f: impl FnMut([usize; 2]) -> f64) -> Self {
        Self(std::array::from_fn(|slot| f(SYM_PAIRS[slot])))
    }

    /// Full contraction `Tⁱʲ Sᵢⱼ` of a raised tensor with a lowered one.
    pub fn contract(&self, other: &Symmetric) -> f64 {
        sum2(|i, j| self[[i, j]] * other[[i, j]])
    }

    /// Raises both indices with `inverse`.
    pub fn raise(&self, inverse: &Symmetric) -> Symmetric {
        Symmetric::from_fn(|[i, j]| sum2(|k, l| inverse[[i, k]] * inverse[[j, l]] * self[[k, l]]))
    }
}

impl Index<[usize; 2]> for Symmetric {
    type Output = f64;

    #[inline]
    fn index(&self, [i, j]: [usize; 2]) -> &f64 {
        &self.0[sym(i, j)]
    }
}

impl IndexMut<[usize; 2]> for Symmetric {
    #[inline]
    fn index_mut(&mut self, [i, j]: [usize; 2]) -> &mut f64 {
        &mut self.0[sym(i, j)]
    }
}

/// `1 - det(δ + d)` for a difference metric `d`, expanded so that no term is
/// formed by subtracting nearly equal quantities.
pub fn one_minus_det(d: &Symmetric) -> f64 {
    let [d11, d12, d13, d22, d23, d33] = d.0;

    -(d11 + d22 + d33)
        - (d11 * d22 + d11 * d33 + d22 * d33)
        + (d12 * d12 + d13 * d13 + d23 * d23)
        - d11 * d22 * d33
        - 2.0 * d12 * d13 * d23
        + d11 * d23 * d23
        + d22 * d13 * d13
        + d33 * d12 * d12
}

/// Inverse of `δ + d` assuming it has unit determinant, from its cofactors.
pub fn unit_inverse(d: &Symmetric) -> Symmetric {
    let [d11, d12, d13, d22, d23, d33] = d.0;

    Symmetric([
        1.0 + d22 + d33 - d23 * d23 + d22 * d33,
        d13 * d23 - d12 * (1.0 + d33),
        d12 * d23 - d13 * (1.0 + d22),
        1.0 + d11 + d33 - d13 * d13 + d11 * d33,
        d12 * d13 - d23 * (1.0 + d11),
        1.0 + d11 + d22 - d12 * d12 + d11 * d22,
    ])
}

#[cfg(test)]
fn inverse(m: &Symmetric) -> Symmetric {
    let [a, b, c, d, e, f] = m.0;
    let det = determinant(m);

    Symmetric([
        (d * f - e * e) / det,
        (c * e - b * f) / det,
        (b * e - c * d) / det,
        (a * f - c * c) / det,
        (b * c - a * e) / det,
        (a * d - b * b) / det,
    ])
}

#[cfg(test)]
pub(crate) fn determinant(m: &Symmetric) -> f64 {
    let [a, b, c, d, e, f] = m.0;
    a * (d * f - e * e) - b * (b * f - c * e) + c * (b * e - c * d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_indexing() {
        let t = Symmetric::from_fn(|[i, j]| (10 * i + j) as f64);
        assert_eq!(t[[0, 1]], 1.0);
        assert_eq!(t[[1, 0]], 1.0);
        assert_eq!(t[[2, 1]], 12.0);
        assert_eq!(sym(2, 0), 2);
    }

    #[test]
    fn expanded_determinant() {
        let d = Symmetric([0.1, 0.02, -0.03, -0.05, 0.04, 0.07]);
        let full = Symmetric::from_fn(|[i, j]| delta(i, j) + d[[i, j]]);
        assert!((one_minus_det(&d) - (1.0 - determinant(&full))).abs() < 1e-15);
    }

    #[test]
    fn cofactor_inverse() {
        // Rescale to unit determinant, then compare against the general inverse.
        let d = Symmetric([0.1, 0.02, -0.03, -0.05, 0.04, 0.07]);
        let full = Symmetric::from_fn(|[i, j]| delta(i, j) + d[[i, j]]);
        let factor = determinant(&full).powf(-1.0 / 3.0);
        let unit = Symmetric::from_fn(|[i, j]| factor * full[[i, j]]);
        let d = Symmetric::from_fn(|[i, j]| unit[[i, j]] - delta(i, j));

        let a = unit_inverse(&d);
        let b = inverse(&unit);
        for slot in 0..6 {
            assert!((a.0[slot] - b.0[slot]).abs() < 1e-14);
        }

        let identity = Symmetric::from_fn(|[i, j]| sum1(|k| unit[[i, k]] * a[[k, j]]));
        for slot in 0..6 {
            let [i, j] = SYM_PAIRS[slot];
            assert!((identity.0[slot] - delta(i, j)).abs() < 1e-14);
        }
    }

    #[test]
    fn axis_conversion() {
        assert_eq!(Axis::try_from(2), Ok(Axis::Z));
        assert_eq!(Axis::try_from(3), Err(InvalidAxis(3)));
    }
}

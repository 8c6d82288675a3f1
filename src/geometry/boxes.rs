use std::array;

use serde::{Deserialize, Serialize};

use super::IndexSpace;

/// A half-open rectangular box `[lower, upper)` of cells in a level's global index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBox {
    pub lower: [i64; 3],
    pub upper: [i64; 3],
}

impl IndexBox {
    pub fn new(lower: [i64; 3], upper: [i64; 3]) -> Self {
        Self { lower, upper }
    }

    /// Box spanning `[0, size)` along every axis.
    pub fn from_size(size: [usize; 3]) -> Self {
        Self {
            lower: [0; 3],
            upper: array::from_fn(|axis| size[axis] as i64),
        }
    }

    /// Number of cells along each axis (zero for an inverted box).
    pub fn size(&self) -> [usize; 3] {
        array::from_fn(|axis| (self.upper[axis] - self.lower[axis]).max(0) as usize)
    }

    pub fn cell_count(&self) -> usize {
        self.size().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    pub fn contains(&self, cell: [i64; 3]) -> bool {
        (0..3).all(|axis| cell[axis] >= self.lower[axis] && cell[axis] < self.upper[axis])
    }

    /// Does this box lie entirely within `other`?
    pub fn is_within(&self, other: &IndexBox) -> bool {
        (0..3).all(|axis| self.lower[axis] >= other.lower[axis] && self.upper[axis] <= other.upper[axis])
    }

    pub fn intersect(&self, other: &IndexBox) -> IndexBox {
        IndexBox {
            lower: array::from_fn(|axis| self.lower[axis].max(other.lower[axis])),
            upper: array::from_fn(|axis| self.upper[axis].min(other.upper[axis])),
        }
    }

    /// Grows the box by `width` cells on every side.
    pub fn grow(&self, width: usize) -> IndexBox {
        let width = width as i64;
        IndexBox {
            lower: self.lower.map(|l| l - width),
            upper: self.upper.map(|u| u + width),
        }
    }

    /// Shrinks the box by `width` cells on every side.
    pub fn shrink(&self, width: usize) -> IndexBox {
        let width = width as i64;
        IndexBox {
            lower: self.lower.map(|l| l + width),
            upper: self.upper.map(|u| u - width),
        }
    }

    /// Maps a cell into the box assuming the box tiles space periodically.
    pub fn wrap(&self, cell: [i64; 3]) -> [i64; 3] {
        array::from_fn(|axis| {
            let size = self.upper[axis] - self.lower[axis];
            self.lower[axis] + (cell[axis] - self.lower[axis]).rem_euclid(size)
        })
    }

    /// Nearest cell of the box.
    pub fn clamp(&self, cell: [i64; 3]) -> [i64; 3] {
        array::from_fn(|axis| cell[axis].clamp(self.lower[axis], self.upper[axis] - 1))
    }

    /// Maps the box to the index space of a level `ratio` times finer.
    pub fn refine(&self, ratio: usize) -> IndexBox {
        let ratio = ratio as i64;
        IndexBox {
            lower: self.lower.map(|l| l * ratio),
            upper: self.upper.map(|u| u * ratio),
        }
    }

    /// Smallest box on a level `ratio` times coarser that covers this box.
    pub fn coarsen(&self, ratio: usize) -> IndexBox {
        let ratio = ratio as i64;
        IndexBox {
            lower: self.lower.map(|l| l.div_euclid(ratio)),
            upper: self.upper.map(|u| (u + ratio - 1).div_euclid(ratio)),
        }
    }

    /// Are both corners multiples of `ratio`, so that the box coarsens exactly?
    pub fn is_aligned(&self, ratio: usize) -> bool {
        let ratio = ratio as i64;
        (0..3).all(|axis| self.lower[axis] % ratio == 0 && self.upper[axis] % ratio == 0)
    }

    /// Iterates all cells in the box in storage order (first axis fastest).
    pub fn iter(&self) -> impl Iterator<Item = [i64; 3]> + '_ {
        IndexSpace::new(self.size())
            .iter()
            .map(move |offset| array::from_fn(|axis| self.lower[axis] + offset[axis] as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refine_and_coarsen() {
        let region = IndexBox::new([1, 2, -3], [4, 6, 1]);
        let fine = region.refine(2);
        assert_eq!(fine, IndexBox::new([2, 4, -6], [8, 12, 2]));
        assert!(fine.is_aligned(2));
        assert_eq!(fine.coarsen(2), region);

        let odd = IndexBox::new([-1, 0, 3], [3, 1, 6]);
        assert_eq!(odd.coarsen(2), IndexBox::new([-1, 0, 1], [2, 1, 3]));
        assert!(!odd.is_aligned(2));
    }

    #[test]
    fn wrap_and_clamp() {
        let domain = IndexBox::from_size([8, 4, 4]);
        assert_eq!(domain.wrap([-1, 4, 2]), [7, 0, 2]);
        assert_eq!(domain.wrap([17, -5, 3]), [1, 3, 3]);
        assert_eq!(domain.clamp([-2, 4, 2]), [0, 3, 2]);
        assert_eq!(domain.shrink(1), IndexBox::new([1, 1, 1], [7, 3, 3]));
    }

    #[test]
    fn intersection_and_containment() {
        let a = IndexBox::from_size([8, 8, 8]);
        let b = IndexBox::new([4, -2, 6], [12, 3, 7]);
        let c = a.intersect(&b);
        assert_eq!(c, IndexBox::new([4, 0, 6], [8, 3, 7]));
        assert_eq!(c.cell_count(), 4 * 3);
        assert!(c.is_within(&a));
        assert!(!b.is_within(&a));
        assert!(a.contains([7, 0, 0]));
        assert!(!a.contains([8, 0, 0]));

        let disjoint = a.intersect(&IndexBox::new([10, 0, 0], [12, 2, 2]));
        assert!(disjoint.is_empty());
        assert_eq!(disjoint.iter().count(), 0);
        assert_eq!(a.grow(2).size(), [12, 12, 12]);
    }
}

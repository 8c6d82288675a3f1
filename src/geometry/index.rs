use std::array;

/// Describes an abstract index space. Allows for iteration of indices
/// in N dimensions, and transformations between cartesian and linear
/// indices. The first axis varies fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpace<const N: usize> {
    size: [usize; N],
}

impl<const N: usize> IndexSpace<N> {
    /// Constructs a new index space.
    pub const fn new(size: [usize; N]) -> Self {
        Self { size }
    }

    /// Returns the number of indices in the index space.
    pub fn index_count(&self) -> usize {
        self.size.iter().product()
    }

    /// Returns the dimensions of the index space along each axis.
    pub fn size(self) -> [usize; N] {
        self.size
    }

    /// Distance in linear storage between neighbouring indices along each axis.
    pub fn strides(self) -> [usize; N] {
        let mut result = [1; N];

        for axis in 1..N {
            result[axis] = result[axis - 1] * self.size[axis - 1];
        }

        result
    }

    /// Converts a linear index into a cartesian index.
    pub fn cartesian_from_linear(self, mut linear: usize) -> [usize; N] {
        debug_assert!(linear < self.index_count());

        array::from_fn(|axis| {
            let result = linear % self.size[axis];
            linear /= self.size[axis];
            result
        })
    }

    /// Converts a cartesian index into a linear index.
    pub fn linear_from_cartesian(self, cartesian: [usize; N]) -> usize {
        let mut result = 0;
        let mut stride = 1;

        for axis in 0..N {
            debug_assert!(cartesian[axis] < self.size[axis]);
            result += stride * cartesian[axis];
            stride *= self.size[axis];
        }

        result
    }

    /// Iterates all cartesian indices in the index space.
    pub const fn iter(self) -> CartesianIter<N> {
        CartesianIter {
            size: self.size,
            cursor: [0; N],
        }
    }
}

impl<const N: usize> IntoIterator for IndexSpace<N> {
    type IntoIter = CartesianIter<N>;
    type Item = [usize; N];

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the cartesian indices of an `IndexSpace`.
#[derive(Debug, Clone)]
pub struct CartesianIter<const N: usize> {
    size: [usize; N],
    cursor: [usize; N],
}

impl<const N: usize> Iterator for CartesianIter<N> {
    type Item = [usize; N];

    fn next(&mut self) -> Option<Self::Item> {
        if self.size.contains(&0) || self.cursor[N - 1] == self.size[N - 1] {
            return None;
        }

        let result = self.cursor;

        for axis in 0..N {
            self.cursor[axis] += 1;
            // Wrap every axis except the last, which signals the end of iteration.
            if self.cursor[axis] == self.size[axis] && axis < N - 1 {
                self.cursor[axis] = 0;
                continue;
            }

            break;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_iteration() {
        let space = IndexSpace::new([3, 2]);
        let mut indices = space.iter();

        assert_eq!(indices.next(), Some([0, 0]));
        assert_eq!(indices.next(), Some([1, 0]));
        assert_eq!(indices.next(), Some([2, 0]));
        assert_eq!(indices.next(), Some([0, 1]));
        assert_eq!(indices.next(), Some([1, 1]));
        assert_eq!(indices.next(), Some([2, 1]));
        assert_eq!(indices.next(), None);

        assert_eq!(IndexSpace::new([0, 10]).iter().next(), None);

        let space = IndexSpace::new([2, 3, 4]);
        for (i, index) in space.iter().enumerate() {
            assert_eq!(i, space.linear_from_cartesian(index));
            assert_eq!(space.cartesian_from_linear(i), index);
        }
    }

    #[test]
    fn strides() {
        let space = IndexSpace::new([5, 3, 7]);
        assert_eq!(space.strides(), [1, 5, 15]);
        assert_eq!(space.linear_from_cartesian([1, 2, 3]), 1 + 2 * 5 + 3 * 15);
    }
}

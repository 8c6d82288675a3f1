use std::array;

use datasize::DataSize;

use crate::fields::{FieldLayout, FieldStore};
use crate::geometry::{IndexBox, IndexSpace};

/// A rectangular block of cells on one level, together with the storage of every
/// field register over the block and a surrounding band of ghost cells.
#[derive(Clone, Debug, DataSize)]
pub struct Patch {
    #[data_size(skip)]
    bounds: IndexBox,
    ghost: usize,
    pub store: FieldStore,
}

impl Patch {
    pub fn new(bounds: IndexBox, ghost: usize, layout: &FieldLayout) -> Self {
        let points = bounds.grow(ghost).cell_count();

        Self {
            bounds,
            ghost,
            store: FieldStore::new(layout.len(), points),
        }
    }

    /// Interior cells in the level's global index space.
    pub fn bounds(&self) -> IndexBox {
        self.bounds
    }

    /// Interior and ghost cells in the level's global index space.
    pub fn storage_bounds(&self) -> IndexBox {
        self.bounds.grow(self.ghost)
    }

    pub fn ghost(&self) -> usize {
        self.ghost
    }

    /// Ghost-inclusive index space of the storage.
    pub fn space(&self) -> IndexSpace<3> {
        IndexSpace::new(self.storage_bounds().size())
    }

    /// Position of the cell with local index zero, given the origin and spacing of the level.
    pub fn origin(&self, origin: [f64; 3], spacing: [f64; 3]) -> [f64; 3] {
        let lower = self.storage_bounds().lower;
        array::from_fn(|axis| origin[axis] + (lower[axis] as f64 + 0.5) * spacing[axis])
    }

    /// Storage index of a global cell, which must lie within the storage bounds.
    pub fn local(&self, global: [i64; 3]) -> usize {
        let lower = self.storage_bounds().lower;
        self.space()
            .linear_from_cartesian(array::from_fn(|axis| (global[axis] - lower[axis]) as usize))
    }

    /// Global cell of a storage index.
    pub fn global(&self, point: usize) -> [i64; 3] {
        let lower = self.storage_bounds().lower;
        let local = self.space().cartesian_from_linear(point);
        array::from_fn(|axis| lower[axis] + local[axis] as i64)
    }

    pub fn is_interior(&self, point: usize) -> bool {
        self.bounds.contains(self.global(point))
    }

    /// Storage indices of the interior cells.
    pub fn interior_points(&self) -> impl Iterator<Item = usize> + '_ {
        self.bounds.iter().map(|cell| self.local(cell))
    }

    /// Storage indices of the ghost cells.
    pub fn ghost_points(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.space().index_count()).filter(|&point| !self.is_interior(point))
    }
}

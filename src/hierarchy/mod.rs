//! Block-structured refinement hierarchy.
//!
//! Level zero tiles the whole domain with a regular grid of patches. Every finer level
//! refines the one below it by a factor of two and consists of an arbitrary list of
//! non-overlapping boxes, each properly nested in the next coarser level.

mod patch;

use std::array;

use datasize::DataSize;
use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::fields::FieldLayout;
use crate::geometry::{IndexBox, IndexSpace};
use crate::rk4::{LevelGeometry, RkStage};

pub use patch::Patch;

/// Refinement ratio between neighbouring levels.
pub const RATIO: usize = 2;

/// Extent and resolution of the coarsest level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Number of cells along each axis.
    pub cells: [usize; 3],
    /// Physical size of the domain along each axis.
    pub length: [f64; 3],
    /// Position of the lower corner of the domain.
    pub origin: [f64; 3],
    /// Number of patches level zero is split into along each axis.
    pub blocks: [usize; 3],
    /// Ghost width, defaulting to the width the stencils need.
    pub ghost: Option<usize>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            cells: [16; 3],
            length: [1.0; 3],
            origin: [0.0; 3],
            blocks: [1; 3],
            ghost: None,
        }
    }
}

/// All patches at one resolution.
#[derive(Clone, Debug)]
pub struct Level {
    pub patches: Vec<Patch>,
    domain: IndexBox,
    spacing: [f64; 3],
    /// Time of the Previous register.
    pub previous_time: f64,
    /// Time of the Active register.
    pub time: f64,
    pub stage: RkStage,
}

impl Level {
    /// The whole domain in this level's index space.
    pub fn domain(&self) -> IndexBox {
        self.domain
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Volume of a single cell.
    pub fn cell_volume(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// Index of the patch whose interior contains `cell`.
    pub fn find_interior(&self, cell: [i64; 3]) -> Option<usize> {
        self.patches
            .iter()
            .position(|patch| patch.bounds().contains(cell))
    }

    /// Index of the first patch whose ghost-inclusive storage contains `cell`.
    pub fn find_storage(&self, cell: [i64; 3]) -> Option<usize> {
        self.patches
            .iter()
            .position(|patch| patch.storage_bounds().contains(cell))
    }

    /// Total number of interior cells.
    pub fn cell_count(&self) -> usize {
        self.patches
            .iter()
            .map(|patch| patch.bounds().cell_count())
            .sum()
    }
}

/// An ordered collection of levels, coarsest first.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    levels: Vec<Level>,
    origin: [f64; 3],
    ghost: usize,
    layout: FieldLayout,
    periodic: bool,
}

impl Hierarchy {
    /// Builds level zero from `domain`, with storage for every field of `layout`.
    pub fn new(
        domain: &DomainConfig,
        ghost: usize,
        layout: FieldLayout,
        periodic: bool,
    ) -> Result<Self, SetupError> {
        for axis in 0..3 {
            if domain.cells[axis] == 0 || domain.blocks[axis] == 0 {
                return Err(SetupError::EmptyLevel { level: 0 });
            }

            if domain.blocks[axis] > domain.cells[axis] {
                return Err(SetupError::InvalidParameter(format!(
                    "cannot split {} cells into {} blocks along axis {axis}",
                    domain.cells[axis], domain.blocks[axis]
                )));
            }

            if domain.length[axis].is_nan() || domain.length[axis] <= 0.0 {
                return Err(SetupError::InvalidParameter(format!(
                    "domain length along axis {axis} must be positive"
                )));
            }
        }

        let cells = domain.cells;
        let blocks = domain.blocks;

        // Split each axis as evenly as possible, with earlier blocks taking the remainder.
        let split = |axis: usize, block: usize| -> i64 {
            let base = cells[axis] / blocks[axis];
            let extra = cells[axis] % blocks[axis];
            (block * base + block.min(extra)) as i64
        };

        let patches = IndexSpace::new(blocks)
            .iter()
            .map(|block| {
                let bounds = IndexBox::new(
                    array::from_fn(|axis| split(axis, block[axis])),
                    array::from_fn(|axis| split(axis, block[axis] + 1)),
                );
                Patch::new(bounds, ghost, &layout)
            })
            .collect();

        let level = Level {
            patches,
            domain: IndexBox::from_size(cells),
            spacing: array::from_fn(|axis| domain.length[axis] / cells[axis] as f64),
            previous_time: 0.0,
            time: 0.0,
            stage: RkStage::Uninitialized,
        };

        Ok(Self {
            levels: vec![level],
            origin: domain.origin,
            ghost,
            layout,
            periodic,
        })
    }

    /// Appends a level refining the current finest level by [`RATIO`]. `boxes` are given
    /// in the index space of the new level. The new level is allocated but not filled.
    pub fn add_level(&mut self, boxes: &[IndexBox]) -> Result<usize, SetupError> {
        let level = self.levels.len();
        self.validate_level(level, boxes)?;

        let coarse = self.finest();
        let spacing = coarse.spacing.map(|dx| dx / RATIO as f64);
        let domain = coarse.domain.refine(RATIO);
        let time = coarse.time;

        let patches = boxes
            .iter()
            .map(|&bounds| Patch::new(bounds, self.ghost, &self.layout))
            .collect();

        self.levels.push(Level {
            patches,
            domain,
            spacing,
            previous_time: time,
            time,
            stage: RkStage::Uninitialized,
        });

        log::debug!(
            "Added level {level} with {} patches and {} cells",
            boxes.len(),
            self.levels[level].cell_count()
        );

        Ok(level)
    }

    fn validate_level(&self, level: usize, boxes: &[IndexBox]) -> Result<(), SetupError> {
        if boxes.is_empty() || boxes.iter().any(IndexBox::is_empty) {
            return Err(SetupError::EmptyLevel { level });
        }

        let coarse = self.finest();
        let domain = coarse.domain.refine(RATIO);

        for (patch, bounds) in boxes.iter().enumerate() {
            if !bounds.is_aligned(RATIO) {
                return Err(SetupError::MisalignedPatch {
                    level,
                    patch,
                    ratio: RATIO,
                });
            }

            if !bounds.is_within(&domain) {
                return Err(SetupError::UnnestedPatch { level, patch });
            }

            // Every coarse cell that ghost interpolation may touch must be a coarse interior cell.
            let support = bounds.grow(self.ghost).coarsen(RATIO).grow(1);
            let nested = support.iter().all(|cell| {
                let cell = if self.periodic {
                    coarse.domain.wrap(cell)
                } else {
                    coarse.domain.clamp(cell)
                };
                coarse.find_interior(cell).is_some()
            });

            if !nested {
                return Err(SetupError::UnnestedPatch { level, patch });
            }
        }

        for a in 0..boxes.len() {
            for b in a + 1..boxes.len() {
                if !boxes[a].intersect(&boxes[b]).is_empty() {
                    return Err(SetupError::OverlappingPatches { level, a, b });
                }
            }
        }

        Ok(())
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [Level] {
        &mut self.levels
    }

    pub fn level(&self, level: usize) -> &Level {
        &self.levels[level]
    }

    pub fn level_mut(&mut self, level: usize) -> &mut Level {
        &mut self.levels[level]
    }

    fn finest(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn ghost(&self) -> usize {
        self.ghost
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Geometry of `level` as seen by the patch integrator.
    pub fn geometry(&self, level: usize) -> LevelGeometry {
        let level = &self.levels[level];
        LevelGeometry {
            domain: level.domain,
            spacing: level.spacing,
            origin: self.origin,
            periodic: self.periodic,
        }
    }

    /// Sets the time of both registers of `level`.
    pub fn set_level_time(&mut self, level: usize, previous: f64, time: f64) {
        let level = &mut self.levels[level];
        level.previous_time = previous;
        level.time = time;
    }

    /// Is the cell `cell` of `level` covered by the interior of the next finer level?
    pub fn is_refined(&self, level: usize, cell: [i64; 3]) -> bool {
        let Some(finer) = self.levels.get(level + 1) else {
            return false;
        };

        let child = cell.map(|c| c * RATIO as i64);
        finer.find_interior(child).is_some()
    }
}

impl DataSize for Hierarchy {
    const IS_DYNAMIC: bool = true;
    const STATIC_HEAP_SIZE: usize = 0;

    fn estimate_heap_size(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|level| level.patches.iter())
            .map(|patch| patch.estimate_heap_size() + std::mem::size_of::<Patch>())
            .sum()
    }
}

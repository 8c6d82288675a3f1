//! Data exchange between patches and between levels.
//!
//! Ghost cells are filled, in order of preference, from the interior of a patch on the
//! same level (after wrapping periodic domains or clamping to the edge of open ones),
//! and otherwise by interpolating the next coarser level in space and time.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::SetupError;
use crate::fields::{Field, FieldLayout, Register, FIELD_COUNT};
use crate::geometry::IndexBox;
use crate::hierarchy::{Hierarchy, Level, RATIO};

/// Inter-patch and inter-level transfer operations on a hierarchy. Every operation is
/// collective: it returns only once every patch involved is up to date.
pub trait Transfer: Sync {
    /// Checks that every field of `layout` can be transferred.
    fn prepare(&self, layout: &FieldLayout) -> Result<(), SetupError>;

    /// Fills the ghost cells of every patch of `level` with data valid at `time`.
    fn fill_ghost_data(&self, hierarchy: &mut Hierarchy, level: usize, time: f64);

    /// Replaces coarse interior cells covered by level `fine` with the average of
    /// their children.
    fn coarsen_data(&self, hierarchy: &mut Hierarchy, fine: usize);

    /// Initializes every register of `level` from the next coarser level.
    fn refine_level(&self, hierarchy: &mut Hierarchy, level: usize);
}

/// Prolongation from a coarse level onto a fine cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefineOperator {
    /// Copies the parent cell.
    Constant,
    /// Trilinear interpolation between the eight nearest coarse cells.
    Trilinear,
}

/// Transfer between the patches of an in-memory [`Hierarchy`]. Coarsening is always a
/// volume average; the refine operator is chosen per field.
#[derive(Clone, Debug)]
pub struct BlockTransfer {
    operators: HashMap<Field, RefineOperator>,
    fallback: Option<RefineOperator>,
}

impl Default for BlockTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTransfer {
    /// Trilinear refinement of every field.
    pub fn new() -> Self {
        Self {
            operators: HashMap::new(),
            fallback: Some(RefineOperator::Trilinear),
        }
    }

    /// A transfer with no registered operators.
    pub fn empty() -> Self {
        Self {
            operators: HashMap::new(),
            fallback: None,
        }
    }

    pub fn register(&mut self, field: Field, operator: RefineOperator) -> &mut Self {
        self.operators.insert(field, operator);
        self
    }

    pub fn operator(&self, field: Field) -> Option<RefineOperator> {
        self.operators.get(&field).copied().or(self.fallback)
    }

    fn resolve(&self, layout: &FieldLayout) -> Vec<RefineOperator> {
        layout
            .fields()
            .iter()
            .map(|&field| match self.operator(field) {
                Some(operator) => operator,
                None => panic!("no transfer operator registered for field {field}"),
            })
            .collect()
    }
}

/// Maps a cell outside the domain back inside it.
fn restrict_to_domain(domain: &IndexBox, periodic: bool, cell: [i64; 3]) -> [i64; 3] {
    if domain.contains(cell) {
        cell
    } else if periodic {
        domain.wrap(cell)
    } else {
        domain.clamp(cell)
    }
}

/// Reads a coarse level at a fixed time, interpolating linearly between its Previous
/// and Active registers.
struct CoarseSampler<'a> {
    level: &'a Level,
    operators: &'a [RefineOperator],
    periodic: bool,
    theta: f64,
}

impl<'a> CoarseSampler<'a> {
    fn new(level: &'a Level, operators: &'a [RefineOperator], periodic: bool, time: f64) -> Self {
        let span = level.time - level.previous_time;
        let theta = if span == 0.0 {
            1.0
        } else {
            (time - level.previous_time) / span
        };

        Self {
            level,
            operators,
            periodic,
            theta,
        }
    }

    fn sample(&self, cell: [i64; 3], out: &mut [f64; FIELD_COUNT]) {
        let cell = restrict_to_domain(&self.level.domain(), self.periodic, cell);

        let index = match self
            .level
            .find_interior(cell)
            .or_else(|| self.level.find_storage(cell))
        {
            Some(index) => index,
            None => panic!("coarse cell {cell:?} is not covered by any patch"),
        };

        let patch = &self.level.patches[index];
        let point = patch.local(cell);
        let active = patch.store.register(Register::Active);
        let previous = patch.store.register(Register::Previous);

        for slot in 0..self.operators.len() {
            let a = active.channel(slot)[point];
            out[slot] = if self.theta == 1.0 {
                a
            } else {
                let p = previous.channel(slot)[point];
                (1.0 - self.theta) * p + self.theta * a
            };
        }
    }

    /// Prolongs coarse data onto the fine cell `cell`.
    fn interpolate(&self, cell: [i64; 3], out: &mut [f64]) {
        let ratio = RATIO as f64;
        let mut buffer = [0.0; FIELD_COUNT];

        out.fill(0.0);

        // Position of the fine cell centre in coarse index coordinates.
        let coarse: [f64; 3] = cell.map(|c| (c as f64 + 0.5) / ratio - 0.5);
        let base: [i64; 3] = coarse.map(|x| x.floor() as i64);
        let weights: [f64; 3] = std::array::from_fn(|axis| coarse[axis] - base[axis] as f64);

        for corner in 0..8 {
            let mut weight = 1.0;
            let mut index = base;
            for axis in 0..3 {
                if corner & (1 << axis) != 0 {
                    index[axis] += 1;
                    weight *= weights[axis];
                } else {
                    weight *= 1.0 - weights[axis];
                }
            }

            self.sample(index, &mut buffer);
            for (slot, operator) in self.operators.iter().enumerate() {
                if *operator == RefineOperator::Trilinear {
                    out[slot] += weight * buffer[slot];
                }
            }
        }

        if self.operators.contains(&RefineOperator::Constant) {
            self.sample(cell.map(|c| c.div_euclid(RATIO as i64)), &mut buffer);
            for (slot, operator) in self.operators.iter().enumerate() {
                if *operator == RefineOperator::Constant {
                    out[slot] = buffer[slot];
                }
            }
        }
    }
}

impl Transfer for BlockTransfer {
    fn prepare(&self, layout: &FieldLayout) -> Result<(), SetupError> {
        for &field in layout.fields() {
            if self.operator(field).is_none() {
                return Err(SetupError::MissingTransferOperator(field));
            }
        }
        Ok(())
    }

    fn fill_ghost_data(&self, hierarchy: &mut Hierarchy, level: usize, time: f64) {
        let operators = self.resolve(hierarchy.layout());
        let periodic = hierarchy.is_periodic();
        let channels = operators.len();

        let (coarser, rest) = hierarchy.levels_mut().split_at_mut(level);
        let target = &mut rest[0];
        let sampler = coarser
            .last()
            .map(|coarse| CoarseSampler::new(coarse, &operators, periodic, time));

        let updates: Vec<(Vec<usize>, Vec<f64>)> = {
            let target: &Level = target;
            let domain = target.domain();

            target
                .patches
                .par_iter()
                .map(|patch| {
                    let ghosts: Vec<usize> = patch.ghost_points().collect();
                    let mut values = vec![0.0; ghosts.len() * channels];

                    for (out, &point) in values.chunks_exact_mut(channels.max(1)).zip(&ghosts) {
                        let cell = restrict_to_domain(&domain, periodic, patch.global(point));

                        match (target.find_interior(cell), &sampler) {
                            (Some(index), _) => {
                                let source = &target.patches[index];
                                let active = source.store.register(Register::Active);
                                let local = source.local(cell);
                                for (slot, value) in out.iter_mut().enumerate() {
                                    *value = active.channel(slot)[local];
                                }
                            }
                            (None, Some(sampler)) => sampler.interpolate(cell, out),
                            (None, None) => unreachable!("level zero covers the whole domain"),
                        }
                    }

                    (ghosts, values)
                })
                .collect()
        };

        target
            .patches
            .par_iter_mut()
            .zip(updates)
            .for_each(|(patch, (ghosts, values))| {
                let active = patch.store.register_mut(Register::Active);
                for (slot, channel) in active.channels_mut().enumerate() {
                    for (k, &point) in ghosts.iter().enumerate() {
                        channel[point] = values[k * channels + slot];
                    }
                }
            });
    }

    fn coarsen_data(&self, hierarchy: &mut Hierarchy, fine: usize) {
        assert!(fine > 0, "level zero has no coarser level");

        let (lower, upper) = hierarchy.levels_mut().split_at_mut(fine);
        let coarse = &mut lower[fine - 1];
        let fine = &upper[0];
        let ratio = RATIO as i64;
        let children = RATIO.pow(3) as f64;

        coarse.patches.par_iter_mut().for_each(|patch| {
            let bounds = patch.bounds();

            for cell in bounds.iter() {
                let child = cell.map(|c| c * ratio);
                let Some(index) = fine.find_interior(child) else {
                    continue;
                };

                let source = &fine.patches[index];
                let source_active = source.store.register(Register::Active);
                let block = IndexBox::new(child, child.map(|c| c + ratio));
                let points: Vec<usize> = block.iter().map(|c| source.local(c)).collect();

                let point = patch.local(cell);
                let active = patch.store.register_mut(Register::Active);

                for (slot, channel) in active.channels_mut().enumerate() {
                    let data = source_active.channel(slot);
                    let sum: f64 = points.iter().map(|&p| data[p]).sum();
                    channel[point] = sum / children;
                }
            }
        });
    }

    fn refine_level(&self, hierarchy: &mut Hierarchy, level: usize) {
        assert!(level > 0, "level zero has no coarser level");

        let operators = self.resolve(hierarchy.layout());
        let periodic = hierarchy.is_periodic();
        let channels = operators.len();

        let time = {
            let (coarser, rest) = hierarchy.levels_mut().split_at_mut(level);
            let coarse = &coarser[level - 1];
            let target = &mut rest[0];
            let sampler = CoarseSampler::new(coarse, &operators, periodic, coarse.time);
            let domain = target.domain();

            target.patches.par_iter_mut().for_each(|patch| {
                let points = patch.space().index_count();
                let mut values = vec![0.0; points * channels];

                for (point, out) in values.chunks_exact_mut(channels.max(1)).enumerate() {
                    let cell = restrict_to_domain(&domain, periodic, patch.global(point));
                    sampler.interpolate(cell, out);
                }

                let active = patch.store.register_mut(Register::Active);
                for (slot, channel) in active.channels_mut().enumerate() {
                    for (point, value) in channel.iter_mut().enumerate() {
                        *value = values[point * channels + slot];
                    }
                }
                patch.store.copy_active_to_previous();
            });

            coarse.time
        };

        hierarchy.set_level_time(level, time, time);
        log::debug!("Refined level {level} from level {} at t = {time}", level - 1);

        self.fill_ghost_data(hierarchy, level, time);
    }
}

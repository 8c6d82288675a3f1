//! Berger-Oliger time subcycling over a refinement hierarchy.

use rayon::prelude::*;

use crate::bssn::BssnSystem;
use crate::comm::Communicator;
use crate::error::SetupError;
use crate::fields::Register;
use crate::hierarchy::Hierarchy;
use crate::normalize::restore_invariants;
use crate::rk4::{self, RkStage};
use crate::transfer::Transfer;

/// Advances a hierarchy with a fixed system, transfer and communicator.
pub struct Stepper<'a, T, C> {
    pub system: &'a BssnSystem,
    pub transfer: &'a T,
    pub comm: &'a C,
}

impl<'a, T: Transfer, C: Communicator> Stepper<'a, T, C> {
    pub fn new(system: &'a BssnSystem, transfer: &'a T, comm: &'a C) -> Self {
        Self {
            system,
            transfer,
            comm,
        }
    }

    /// Prepares every level for a new coarse step: checks the transfer operators,
    /// restores the algebraic constraints of the Active register (ghost cells included)
    /// and stores it as the start of the step.
    pub fn step_init(&self, hierarchy: &mut Hierarchy) -> Result<(), SetupError> {
        self.transfer.prepare(hierarchy.layout())?;

        let normalize = self.system.config.normalize;
        let layout = self.system.layout();

        for level in 0..hierarchy.num_levels() {
            let level = hierarchy.level_mut(level);
            level.stage.transition(RkStage::StepInit);

            level.patches.par_iter_mut().for_each(|patch| {
                if normalize {
                    restore_invariants(layout, patch.store.register_mut(Register::Active));
                }
                patch.store.copy_active_to_previous();
            });

            level.previous_time = level.time;
        }

        Ok(())
    }

    /// Advances `level` and, recursively, every finer level from `from` to `to`. Finer
    /// levels take two steps of half the size, after which their data replaces the
    /// coarse data they cover.
    pub fn advance_level(&self, hierarchy: &mut Hierarchy, level: usize, from: f64, to: f64) {
        if level >= hierarchy.num_levels() {
            return;
        }

        self.evolve_level(hierarchy, level, from, to);
        hierarchy.set_level_time(level, from, to);

        if level + 1 < hierarchy.num_levels() {
            let mid = from + 0.5 * (to - from);
            self.advance_level(hierarchy, level + 1, from, mid);
            self.advance_level(hierarchy, level + 1, mid, to);

            self.comm.barrier();
            self.transfer.coarsen_data(hierarchy, level + 1);
            self.comm.barrier();
            self.transfer.fill_ghost_data(hierarchy, level, to);
        }

        hierarchy
            .level_mut(level)
            .patches
            .par_iter_mut()
            .for_each(|patch| patch.store.copy_active_to_previous());
        hierarchy.set_level_time(level, to, to);
    }

    /// Runs the four RK4 stages on every patch of `level`, exchanging ghost data after
    /// each stage.
    pub fn evolve_level(&self, hierarchy: &mut Hierarchy, level: usize, from: f64, to: f64) {
        let dt = to - from;
        let geometry = hierarchy.geometry(level);
        let system = self.system;

        log::trace!("Evolving level {level} from {from} to {to}");

        for n in 1..=4 {
            let time = rk4::stage_input_time(n, from, to);

            let current = hierarchy.level_mut(level);
            current.stage.transition(RkStage::evolve(n));
            current.patches.par_iter_mut().for_each(|patch| {
                rk4::write_sources(system, patch, &geometry, time);
                rk4::evolve_patch(system, patch, &geometry, n, time, dt);
            });

            self.comm.barrier();

            current.stage.transition(RkStage::finalize(n));
            current
                .patches
                .par_iter_mut()
                .for_each(|patch| rk4::finalize_patch(patch, n, dt));

            self.comm.barrier();

            self.transfer
                .fill_ghost_data(hierarchy, level, rk4::stage_output_time(n, from, to));
        }

        hierarchy.level_mut(level).stage.transition(RkStage::Complete);
    }
}

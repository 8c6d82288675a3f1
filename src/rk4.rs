//! Four-stage Runge-Kutta integration of a single patch.
//!
//! Each stage evaluates every right-hand side into a dedicated stage register, then
//! combines the stages with the Previous register to produce the input of the next
//! stage in the Active register.

use rayon::prelude::*;

use crate::bssn::{BssnSystem, PatchView};
use crate::fd::Stencils;
use crate::fields::{Channels, Extra, Register, EXTRA_COUNT};
use crate::geometry::IndexBox;
use crate::hierarchy::Patch;
use crate::matter::SourceTerms;

/// Progress of a level through one RK4 step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RkStage {
    #[default]
    Uninitialized,
    StepInit,
    K1Evolve,
    K1Finalize,
    K2Evolve,
    K2Finalize,
    K3Evolve,
    K3Finalize,
    K4Evolve,
    K4Finalize,
    Complete,
}

impl RkStage {
    /// Evolve state of stage `n` (1..=4).
    pub fn evolve(n: usize) -> Self {
        match n {
            1 => RkStage::K1Evolve,
            2 => RkStage::K2Evolve,
            3 => RkStage::K3Evolve,
            4 => RkStage::K4Evolve,
            _ => panic!("RK4 has stages 1 through 4, got {n}"),
        }
    }

    /// Finalize state of stage `n` (1..=4).
    pub fn finalize(n: usize) -> Self {
        match n {
            1 => RkStage::K1Finalize,
            2 => RkStage::K2Finalize,
            3 => RkStage::K3Finalize,
            4 => RkStage::K4Finalize,
            _ => panic!("RK4 has stages 1 through 4, got {n}"),
        }
    }

    /// Is `self -> next` a legal transition?
    pub fn can_transition(self, next: RkStage) -> bool {
        use RkStage::*;

        matches!(
            (self, next),
            (Uninitialized | Complete, StepInit)
                | (StepInit | Complete, K1Evolve)
                | (K1Evolve, K1Finalize)
                | (K1Finalize, K2Evolve)
                | (K2Evolve, K2Finalize)
                | (K2Finalize, K3Evolve)
                | (K3Evolve, K3Finalize)
                | (K3Finalize, K4Evolve)
                | (K4Evolve, K4Finalize)
                | (K4Finalize, Complete)
        )
    }

    /// Moves to `next`, panicking on an illegal transition.
    pub fn transition(&mut self, next: RkStage) {
        assert!(
            self.can_transition(next),
            "illegal RK4 transition {self:?} -> {next:?}"
        );
        log::trace!("RK4 stage {self:?} -> {next:?}");
        *self = next;
    }
}

/// Time at which stage `n` reads the Active register.
pub fn stage_input_time(n: usize, from: f64, to: f64) -> f64 {
    let mid = 0.5 * (from + to);
    [from, mid, mid, to][n - 1]
}

/// Time at which the Active register is valid after finalizing stage `n`.
pub fn stage_output_time(n: usize, from: f64, to: f64) -> f64 {
    let mid = 0.5 * (from + to);
    [mid, mid, to, to][n - 1]
}

/// Geometry shared by every patch of a level.
#[derive(Clone, Copy, Debug)]
pub struct LevelGeometry {
    pub domain: IndexBox,
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub periodic: bool,
}

fn view<'a>(
    system: &'a BssnSystem,
    patch: &Patch,
    active: &'a Channels,
    sources: &'a Channels,
    geometry: &LevelGeometry,
    time: f64,
) -> PatchView<'a> {
    let space = patch.space();
    PatchView {
        layout: system.layout(),
        active,
        sources,
        stencils: Stencils::new(system.config.order, geometry.spacing, space.strides()),
        space,
        origin: patch.origin(geometry.origin, geometry.spacing),
        time,
    }
}

/// Evaluates matter source terms from the Active register at every storage point.
pub fn write_sources(system: &BssnSystem, patch: &mut Patch, geometry: &LevelGeometry, time: f64) {
    let points = patch.space().index_count();

    let terms: Vec<SourceTerms> = {
        let store = &patch.store;
        let view = view(
            system,
            patch,
            store.register(Register::Active),
            store.sources(),
            geometry,
            time,
        );

        (0..points)
            .into_par_iter()
            .map(|point| {
                let frw = system.background.values(time, view.position(point));
                system.matter.sources(&view, point, &frw)
            })
            .collect()
    };

    let sources = patch.store.sources_mut();
    for (point, terms) in terms.iter().enumerate() {
        terms.store(sources, point);
    }
}

/// Evaluates every right-hand side at the interior points of `patch` into stage
/// register `n`. Interior points within the boundary width of an open domain edge
/// take their right-hand side from the boundary instead.
pub fn evolve_patch(
    system: &BssnSystem,
    patch: &mut Patch,
    geometry: &LevelGeometry,
    n: usize,
    time: f64,
    dt: f64,
) {
    let fields = system.layout().fields();
    let width = fields.len() + EXTRA_COUNT;

    let band = if geometry.periodic {
        0
    } else {
        system.boundary.width()
    };
    let inner = geometry.domain.shrink(band);

    let points: Vec<(usize, bool)> = patch
        .interior_points()
        .map(|point| (point, !inner.contains(patch.global(point))))
        .collect();

    let mut buffer = vec![0.0; points.len() * width];

    {
        let store = &patch.store;
        let view = view(
            system,
            patch,
            store.register(Register::Active),
            store.sources(),
            geometry,
            time,
        );

        buffer
            .par_chunks_mut(width)
            .zip(points.par_iter())
            .for_each(|(out, &(point, on_boundary))| {
                let bd = system.point(&view, point);

                for (slot, &field) in fields.iter().enumerate() {
                    out[slot] = if on_boundary {
                        system.boundary.rhs(field, &view, point)
                    } else {
                        system.rhs(field, &bd, &view, dt)
                    };
                }

                out[fields.len() + Extra::Ricci.channel()] = bd.ricci_scalar;
                out[fields.len() + Extra::AijAij.channel()] = bd.aij_aij;
            });
    }

    let (_, _, target, extras) = patch.store.split_for_update(Register::Stage(n));

    for (slot, channel) in target.channels_mut().enumerate() {
        for (k, &(point, _)) in points.iter().enumerate() {
            channel[point] = buffer[k * width + slot];
        }
    }

    for (slot, channel) in extras.channels_mut().enumerate() {
        for (k, &(point, _)) in points.iter().enumerate() {
            channel[point] = buffer[k * width + fields.len() + slot];
        }
    }
}

/// Combines the stage registers with Previous into Active over the patch interior.
///
/// Stages 1 and 2 build the half-step input P + dt/2 K, stage 3 the full-step input
/// P + dt K₃, and stage 4 the RK4 combination P + dt/6 (K₁ + 2K₂ + 2K₃ + K₄), which is
/// also stored in Final.
pub fn finalize_patch(patch: &mut Patch, n: usize, dt: f64) {
    let interior: Vec<usize> = patch.interior_points().collect();
    let points = patch.space().index_count();
    let registers = patch.store.registers_mut();

    let previous = registers.previous.storage();
    let stages = &registers.stages;
    let active = registers.active.storage_mut();
    let channels = active.len() / points.max(1);

    for channel in 0..channels {
        let offset = channel * points;

        for &point in &interior {
            let index = offset + point;
            let p = previous[index];

            active[index] = match n {
                1 | 2 => p + 0.5 * dt * stages[n - 1].storage()[index],
                3 => p + dt * stages[2].storage()[index],
                4 => {
                    let k = |s: usize| stages[s].storage()[index];
                    p + dt / 6.0 * (k(0) + 2.0 * k(1) + 2.0 * k(2) + k(3))
                }
                _ => panic!("RK4 has stages 1 through 4, got {n}"),
            };
        }
    }

    if n == 4 {
        registers.final_.copy_from(&registers.active);
    }
}

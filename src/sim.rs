//! The top-level evolution loop.

use rayon::prelude::*;

use crate::bssn::BssnSystem;
use crate::comm::{Communicator, SingleProcess};
use crate::diagnostics::{constraint_statistics, ConstraintStatistics};
use crate::driver::Stepper;
use crate::error::{EvolveError, SetupError};
use crate::geometry::IndexBox;
use crate::hierarchy::{DomainConfig, Hierarchy};
use crate::initial::{self, InitialData};
use crate::rk4;
use crate::transfer::{BlockTransfer, Transfer};
use crate::validity::{FiniteCheck, ValidityChecker};

/// A BSSN system evolved on a refinement hierarchy, together with the collaborators
/// that move data between patches, synchronize participants and detect blow-up.
pub struct Simulation<T = BlockTransfer, C = SingleProcess, V = FiniteCheck> {
    system: BssnSystem,
    hierarchy: Hierarchy,
    transfer: T,
    comm: C,
    validity: V,
    dt_frac: f64,
    time: f64,
    steps: usize,
}

impl Simulation {
    /// Builds a single-process simulation with the default transfer and validity check.
    ///
    /// `refinement` lists the boxes of each refined level, in that level's index space.
    pub fn new(
        system: BssnSystem,
        domain: &DomainConfig,
        refinement: &[Vec<IndexBox>],
        initial: &dyn InitialData,
        dt_frac: f64,
    ) -> Result<Self, SetupError> {
        Self::with_collaborators(
            system,
            domain,
            refinement,
            initial,
            dt_frac,
            BlockTransfer::new(),
            SingleProcess,
            FiniteCheck,
        )
    }
}

impl<T: Transfer, C: Communicator, V: ValidityChecker> Simulation<T, C, V> {
    pub fn with_collaborators(
        system: BssnSystem,
        domain: &DomainConfig,
        refinement: &[Vec<IndexBox>],
        initial: &dyn InitialData,
        dt_frac: f64,
        transfer: T,
        comm: C,
        validity: V,
    ) -> Result<Self, SetupError> {
        if !dt_frac.is_finite() || dt_frac <= 0.0 {
            return Err(SetupError::InvalidParameter(format!(
                "time step fraction must be positive, got {dt_frac}"
            )));
        }

        let required = system.config.order.ghost_width();
        let ghost = domain.ghost.unwrap_or(required);
        if ghost < required {
            return Err(SetupError::GhostTooNarrow { ghost, required });
        }

        transfer.prepare(system.layout())?;

        let mut hierarchy = Hierarchy::new(
            domain,
            ghost,
            system.layout().clone(),
            system.boundary.is_periodic(),
        )?;

        for boxes in refinement {
            hierarchy.add_level(boxes)?;
        }

        initial::apply(initial, &mut hierarchy);
        for level in 0..hierarchy.num_levels() {
            transfer.fill_ghost_data(&mut hierarchy, level, 0.0);
        }

        log::info!(
            "Initialized {} levels with {} fields, {} bytes of field storage",
            hierarchy.num_levels(),
            system.layout().len(),
            datasize::data_size(&hierarchy)
        );

        for (index, level) in hierarchy.levels().iter().enumerate() {
            log::debug!(
                "Level {index}: {} patches, {} cells, spacing {:?}",
                level.patches.len(),
                level.cell_count(),
                level.spacing()
            );
        }

        Ok(Self {
            system,
            hierarchy,
            transfer,
            comm,
            validity,
            dt_frac,
            time: 0.0,
            steps: 0,
        })
    }

    pub fn system(&self) -> &BssnSystem {
        &self.system
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed coarse steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Coarse time step, the smallest coarse spacing scaled by the step fraction.
    pub fn dt(&self) -> f64 {
        let spacing = self.hierarchy.level(0).spacing();
        spacing.iter().copied().fold(f64::INFINITY, f64::min) * self.dt_frac
    }

    /// Appends a refined level and fills it from the current finest level.
    pub fn add_level(&mut self, boxes: &[IndexBox]) -> Result<usize, SetupError> {
        let level = self.hierarchy.add_level(boxes)?;
        self.transfer.refine_level(&mut self.hierarchy, level);
        Ok(level)
    }

    /// Scans every evolved field of every patch, failing on the first non-finite value.
    pub fn check_validity(&self) -> Result<(), EvolveError> {
        let fields = self.system.layout().fields();

        for (index, level) in self.hierarchy.levels().iter().enumerate() {
            for (patch_index, patch) in level.patches.iter().enumerate() {
                for (slot, &field) in fields.iter().enumerate() {
                    if self.validity.has_nans(patch, slot) {
                        log::error!(
                            "Field {field} became non-finite on level {index}, patch {patch_index} at t = {}",
                            self.time
                        );

                        return Err(EvolveError::NonFinite {
                            level: index,
                            patch: patch_index,
                            field,
                            time: self.time,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn update_sources(&mut self) {
        let system = &self.system;
        let time = self.time;

        for level in 0..self.hierarchy.num_levels() {
            let geometry = self.hierarchy.geometry(level);
            self.hierarchy
                .level_mut(level)
                .patches
                .par_iter_mut()
                .for_each(|patch| rk4::write_sources(system, patch, &geometry, time));
        }
    }

    /// Constraint statistics of the current Active register.
    pub fn statistics(&mut self) -> ConstraintStatistics {
        self.update_sources();
        constraint_statistics(&self.system, &self.hierarchy, &self.comm, self.time)
    }

    /// Advances the whole hierarchy by one coarse step. Returns the constraint
    /// statistics at the start of the step.
    pub fn run_step(&mut self) -> Result<ConstraintStatistics, EvolveError> {
        self.check_validity()?;

        let dt = self.dt();
        let from = self.time;

        Stepper::new(&self.system, &self.transfer, &self.comm).step_init(&mut self.hierarchy)?;

        let stats = self.statistics();
        log::info!("Step {}, t = {from:.6}, dt = {dt:.6e}", self.steps);
        stats.log();

        Stepper::new(&self.system, &self.transfer, &self.comm).advance_level(
            &mut self.hierarchy,
            0,
            from,
            from + dt,
        );

        self.time = from + dt;
        self.steps += 1;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Sommerfeld;
    use crate::config::BssnConfig;
    use crate::fields::{Field, Register};
    use crate::gauge::{GaugeConfig, LapseCondition, ShiftCondition};
    use crate::initial::{LinearWave, Minkowski, ScalarPulse, StaticBlackHole};
    use crate::matter::ScalarField;
    use crate::tensor::sym;

    fn wave_domain(cells: [usize; 3], dx: f64) -> DomainConfig {
        DomainConfig {
            cells,
            length: cells.map(|c| c as f64 * dx),
            ..Default::default()
        }
    }

    const WAVE: LinearWave = LinearWave {
        amplitude: 1e-8,
        wavelength: 1.0,
    };

    /// Largest deviation of Δγ̄_yy from the exact wave over the interior of `level`.
    fn wave_error(sim: &Simulation, level: usize) -> f64 {
        let h = sim.hierarchy();
        let slot = h.layout().channel(Field::Metric(sym(1, 1)));
        let current = h.level(level);
        let spacing = current.spacing();
        let mut error = 0.0f64;

        for patch in &current.patches {
            let data = patch.store.register(Register::Active).channel(slot);
            for cell in patch.bounds().iter() {
                let position = cell.map(|c| (c as f64 + 0.5) * spacing[0]);
                let exact = WAVE.exact(Field::Metric(sym(1, 1)), position, sim.time());
                error = error.max((data[patch.local(cell)] - exact).abs());
            }
        }

        error
    }

    fn evolve_wave(n: usize, steps: usize) -> Simulation {
        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let domain = wave_domain([n, 4, 4], 1.0 / n as f64);
        let mut sim = Simulation::new(system, &domain, &[], &WAVE, 0.25).unwrap();

        for _ in 0..steps {
            sim.run_step().unwrap();
        }
        sim
    }

    #[test]
    fn flat_space_stays_flat() {
        let mut config = BssnConfig::default();
        config.ko_damping_coefficient = 0.1;
        config.features.z4c = true;
        config.features.shift = true;
        config.features.gamma_driver = true;
        config.features.expansion = true;
        config.gauge = GaugeConfig {
            lapse: LapseCondition::OnePlusLog,
            shift: ShiftCondition::GammaDriver,
            eta: 2.0,
        };

        let system = BssnSystem::new(config).unwrap();
        let domain = wave_domain([8, 8, 8], 0.125);
        let refinement = [vec![IndexBox::new([4, 4, 4], [12, 12, 12])]];
        let mut sim = Simulation::new(system, &domain, &refinement, &Minkowski, 0.25).unwrap();

        for _ in 0..3 {
            sim.run_step().unwrap();
        }

        assert_eq!(sim.steps(), 3);
        assert!((sim.time() - 3.0 * 0.125 * 0.25).abs() < 1e-15);

        for level in sim.hierarchy().levels() {
            assert!((level.time - sim.time()).abs() < 1e-15);
            for patch in &level.patches {
                let active = patch.store.register(Register::Active);
                assert!(active.storage().iter().all(|&v| v == 0.0));
            }
        }

        let stats = sim.statistics();
        assert_eq!(stats.hamiltonian.max, 0.0);
        assert_eq!(stats.momentum.max, 0.0);
        assert_eq!(stats.determinant.mean, 0.0);
    }

    #[test]
    fn linear_wave_converges_at_fourth_order() {
        // Both runs end at t = 0.25.
        let coarse = evolve_wave(16, 16);
        let fine = evolve_wave(32, 32);
        assert!((coarse.time() - 0.25).abs() < 1e-12);
        assert!((fine.time() - 0.25).abs() < 1e-12);

        let ratio = wave_error(&coarse, 0) / wave_error(&fine, 0);
        assert!(ratio > 12.0 && ratio < 20.0, "convergence ratio {ratio}");
        assert!(wave_error(&fine, 0) < 1e-2 * WAVE.amplitude);
    }

    #[test]
    fn subcycled_levels_match_a_uniform_fine_run() {
        let steps = 8;

        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let domain = wave_domain([32, 4, 4], 1.0 / 32.0);
        let refinement = [vec![IndexBox::new([16, 0, 0], [48, 8, 8])]];
        let mut layered = Simulation::new(system, &domain, &refinement, &WAVE, 0.25).unwrap();

        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let domain = wave_domain([64, 8, 8], 1.0 / 64.0);
        let mut uniform = Simulation::new(system, &domain, &[], &WAVE, 0.25).unwrap();

        for _ in 0..steps {
            layered.run_step().unwrap();
        }
        for _ in 0..2 * steps {
            uniform.run_step().unwrap();
        }
        assert!((layered.time() - uniform.time()).abs() < 1e-15);

        let slot = layered.hierarchy().layout().channel(Field::Metric(sym(1, 1)));
        let fine = &layered.hierarchy().level(1).patches[0];
        let reference = &uniform.hierarchy().level(0).patches[0];

        let mut difference = 0.0f64;
        for cell in fine.bounds().iter() {
            let a = fine.store.register(Register::Active).channel(slot)[fine.local(cell)];
            let b = reference.store.register(Register::Active).channel(slot)[reference.local(cell)];
            difference = difference.max((a - b).abs());
        }

        assert!(difference < 0.05 * WAVE.amplitude, "difference {difference}");
        assert!(wave_error(&layered, 0) < 0.05 * WAVE.amplitude);
    }

    #[test]
    fn black_hole_constraints_stay_bounded() {
        let mut config = BssnConfig::default();
        config.ko_damping_coefficient = 0.1;
        config.gauge.lapse = LapseCondition::OnePlusLog;

        let system = BssnSystem::new(config)
            .unwrap()
            .with_boundary(Sommerfeld::new([0.0; 3]));
        let domain = DomainConfig {
            cells: [16; 3],
            length: [8.0; 3],
            origin: [-4.0; 3],
            blocks: [2, 2, 2],
            ghost: None,
        };
        let hole = StaticBlackHole {
            mass: 1.0,
            center: [0.0; 3],
            precollapse: true,
        };
        let mut sim = Simulation::new(system, &domain, &[], &hole, 0.25).unwrap();

        let initial = sim.statistics();
        assert!(initial.hamiltonian.max > 0.0);
        assert!(initial.determinant.max < 1e-14);

        for _ in 0..2 {
            sim.run_step().unwrap();
        }
        sim.check_validity().unwrap();

        let after = sim.statistics();
        assert!(after.hamiltonian.max.is_finite());
        assert!(after.hamiltonian.max <= 10.0 * initial.hamiltonian.max);
        assert!(after.momentum.max.is_finite());
    }

    #[test]
    fn non_finite_values_abort_the_run() {
        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let domain = wave_domain([8, 8, 8], 0.125);
        let mut sim = Simulation::new(system, &domain, &[], &Minkowski, 0.25).unwrap();

        let slot = sim.hierarchy().layout().channel(Field::Trace);
        let patch = &mut sim.hierarchy_mut().level_mut(0).patches[0];
        let point = patch.local([3, 4, 5]);
        patch.store.register_mut(Register::Active).channel_mut(slot)[point] = f64::NAN;

        match sim.run_step() {
            Err(EvolveError::NonFinite { level, field, .. }) => {
                assert_eq!(level, 0);
                assert_eq!(field, Field::Trace);
            }
            other => panic!("expected a non-finite error, got {other:?}"),
        }
        assert_eq!(sim.steps(), 0);
    }

    #[test]
    fn invalid_setups_are_rejected() {
        let domain = DomainConfig {
            ghost: Some(1),
            ..Default::default()
        };
        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        assert!(matches!(
            Simulation::new(system, &domain, &[], &Minkowski, 0.25),
            Err(SetupError::GhostTooNarrow { ghost: 1, required: 3 })
        ));

        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        assert!(matches!(
            Simulation::new(system, &DomainConfig::default(), &[], &Minkowski, 0.0),
            Err(SetupError::InvalidParameter(_))
        ));

        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let transfer = BlockTransfer::empty();
        assert!(matches!(
            Simulation::with_collaborators(
                system,
                &DomainConfig::default(),
                &[],
                &Minkowski,
                0.25,
                transfer,
                SingleProcess,
                FiniteCheck,
            ),
            Err(SetupError::MissingTransferOperator(_))
        ));
    }

    #[test]
    fn added_levels_are_filled_from_coarse_data() {
        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let domain = wave_domain([16, 4, 4], 1.0 / 16.0);
        let mut sim = Simulation::new(system, &domain, &[], &WAVE, 0.25).unwrap();
        sim.run_step().unwrap();

        let level = sim.add_level(&[IndexBox::new([8, 0, 0], [24, 8, 8])]).unwrap();
        assert_eq!(level, 1);
        assert_eq!(sim.hierarchy().level(1).time, sim.time());

        // Trilinear prolongation of a smooth wave is accurate to second order.
        assert!(wave_error(&sim, 1) < 0.05 * WAVE.amplitude);
        sim.run_step().unwrap();
        assert!(wave_error(&sim, 1) < 0.05 * WAVE.amplitude);
    }

    #[test]
    fn scalar_pulse_spreads() {
        let system = BssnSystem::new(BssnConfig::default())
            .unwrap()
            .with_matter(ScalarField::default());
        assert!(system.layout().contains(Field::ScalarMomentum));

        let pulse = ScalarPulse {
            amplitude: 1e-4,
            width: 0.15,
            center: [0.5; 3],
        };
        let domain = wave_domain([16, 16, 16], 1.0 / 16.0);
        let mut sim = Simulation::new(system, &domain, &[], &pulse, 0.25).unwrap();

        let slot = sim.hierarchy().layout().channel(Field::Scalar);
        let peak = |sim: &Simulation| {
            let patch = &sim.hierarchy().level(0).patches[0];
            let data = patch.store.register(Register::Active).channel(slot);
            patch
                .interior_points()
                .map(|point| data[point].abs())
                .fold(0.0, f64::max)
        };

        let initial = peak(&sim);
        for _ in 0..4 {
            sim.run_step().unwrap();
        }
        sim.check_validity().unwrap();

        // The pulse starts at rest and disperses.
        let after = peak(&sim);
        assert!(after < initial, "peak grew from {initial} to {after}");
        assert!(after > 0.1 * initial);

        let stats = sim.statistics();
        assert!(stats.hamiltonian.max > 0.0);
        assert!(stats.hamiltonian.max < 1e-2);
    }
}

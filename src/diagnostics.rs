//! Global constraint statistics.
//!
//! Every interior cell of every level is weighted by its volume, except cells covered by
//! the next finer level, which are weighted by zero. Each physical point is therefore
//! counted once, at its finest resolution.

use std::fmt;

use rayon::prelude::*;

use crate::bssn::{BssnSystem, PatchView, Residual};
use crate::comm::Communicator;
use crate::fd::Stencils;
use crate::fields::Register;
use crate::hierarchy::Hierarchy;
use crate::tensor::Axis;

const KINDS: usize = 5;

/// Summary of one constraint over the hierarchy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Statistics {
    pub mean: f64,
    pub stdev: f64,
    /// Largest absolute residual.
    pub max: f64,
    /// Mean magnitude of the terms the residual is built from.
    pub scale_mean: f64,
    pub scaled_mean: f64,
    pub scaled_stdev: f64,
    /// Largest absolute residual relative to its scale.
    pub scaled_max: f64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean {:.5e}, stdev {:.5e}, max {:.5e} (scaled mean {:.5e}, max {:.5e})",
            self.mean, self.stdev, self.max, self.scaled_mean, self.scaled_max
        )
    }
}

/// Statistics of every constraint tracked by the evolution.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstraintStatistics {
    pub hamiltonian: Statistics,
    /// Euclidean norm of Mᵢ.
    pub momentum: Statistics,
    /// Euclidean norm of Gⁱ.
    pub christoffel: Statistics,
    /// Trace of Āᵢⱼ.
    pub trace: Statistics,
    /// 1 - det γ̄.
    pub determinant: Statistics,
}

impl ConstraintStatistics {
    fn from_array(stats: [Statistics; KINDS]) -> Self {
        let [hamiltonian, momentum, christoffel, trace, determinant] = stats;
        Self {
            hamiltonian,
            momentum,
            christoffel,
            trace,
            determinant,
        }
    }

    /// Logs the Hamiltonian constraint at info level and the rest at debug level.
    pub fn log(&self) {
        log::info!("Hamiltonian constraint: {}", self.hamiltonian);
        log::debug!("Momentum constraint: {}", self.momentum);
        log::debug!("Christoffel constraint: {}", self.christoffel);
        log::debug!("Trace constraint: {}", self.trace);
        log::debug!("Determinant constraint: {}", self.determinant);
    }
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    weight: f64,
    residuals: [Residual; KINDS],
}

fn norm(residuals: [Residual; 3]) -> Residual {
    Residual {
        value: residuals.iter().map(|r| r.value * r.value).sum::<f64>().sqrt(),
        scale: residuals.iter().map(|r| r.scale * r.scale).sum::<f64>().sqrt(),
    }
}

/// Evaluates every constraint at every interior cell of the hierarchy. Matter sources
/// must be current.
fn samples(system: &BssnSystem, hierarchy: &Hierarchy, time: f64) -> Vec<Sample> {
    let origin = hierarchy.origin();
    let mut result = Vec::new();

    for (index, level) in hierarchy.levels().iter().enumerate() {
        let spacing = level.spacing();
        let volume = level.cell_volume();

        for patch in &level.patches {
            let space = patch.space();
            let view = PatchView {
                layout: system.layout(),
                active: patch.store.register(Register::Active),
                sources: patch.store.sources(),
                stencils: Stencils::new(system.config.order, spacing, space.strides()),
                space,
                origin: patch.origin(origin, spacing),
                time,
            };

            let cells: Vec<[i64; 3]> = patch.bounds().iter().collect();
            let samples: Vec<Sample> = cells
                .par_iter()
                .map(|&cell| {
                    let bd = system.point(&view, patch.local(cell));
                    let weight = if hierarchy.is_refined(index, cell) {
                        0.0
                    } else {
                        volume
                    };

                    Sample {
                        weight,
                        residuals: [
                            bd.hamiltonian_constraint(),
                            norm(Axis::ALL.map(|axis| bd.momentum(axis))),
                            norm(Axis::ALL.map(|axis| bd.christoffel_residual(axis))),
                            bd.trace_constraint(),
                            bd.determinant_constraint(),
                        ],
                    }
                })
                .collect();

            result.extend(samples);
        }
    }

    result
}

/// Two-pass weighted statistics of every constraint, reduced across `comm`.
pub fn constraint_statistics<C: Communicator>(
    system: &BssnSystem,
    hierarchy: &Hierarchy,
    comm: &C,
    time: f64,
) -> ConstraintStatistics {
    let samples = samples(system, hierarchy, time);

    let total = comm.sum(samples.iter().map(|s| s.weight).sum());
    let total = if total > 0.0 { total } else { 1.0 };

    let mut stats = [Statistics::default(); KINDS];

    // First pass: means and maxima.
    for (kind, stat) in stats.iter_mut().enumerate() {
        let mut value = 0.0;
        let mut scale = 0.0;
        let mut scaled = 0.0;
        let mut max = 0.0f64;
        let mut scaled_max = 0.0f64;

        for sample in &samples {
            let residual = sample.residuals[kind];
            value += sample.weight * residual.value;
            scale += sample.weight * residual.scale;
            scaled += sample.weight * residual.normalized();

            if sample.weight > 0.0 {
                max = max.max(residual.value.abs());
                scaled_max = scaled_max.max(residual.normalized().abs());
            }
        }

        stat.mean = comm.sum(value) / total;
        stat.scale_mean = comm.sum(scale) / total;
        stat.scaled_mean = comm.sum(scaled) / total;
        stat.max = comm.max(max);
        stat.scaled_max = comm.max(scaled_max);
    }

    comm.barrier();

    // Second pass: deviations about the global means.
    for (kind, stat) in stats.iter_mut().enumerate() {
        let mut variance = 0.0;
        let mut scaled_variance = 0.0;

        for sample in &samples {
            let residual = sample.residuals[kind];
            variance += sample.weight * (residual.value - stat.mean).powi(2);
            scaled_variance += sample.weight * (residual.normalized() - stat.scaled_mean).powi(2);
        }

        stat.stdev = (comm.sum(variance) / total).sqrt();
        stat.scaled_stdev = (comm.sum(scaled_variance) / total).sqrt();
    }

    ConstraintStatistics::from_array(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcess;
    use crate::config::BssnConfig;
    use crate::fields::Field;
    use crate::geometry::IndexBox;
    use crate::hierarchy::DomainConfig;
    use crate::initial::{self, Minkowski, StaticBlackHole};
    use crate::tensor::sym;
    use crate::transfer::{BlockTransfer, Transfer};

    fn setup(refined: bool) -> (BssnSystem, Hierarchy) {
        let system = BssnSystem::new(BssnConfig::default()).unwrap();
        let domain = DomainConfig {
            cells: [8; 3],
            length: [1.0; 3],
            ..Default::default()
        };
        let mut h = Hierarchy::new(&domain, 3, system.layout().clone(), true).unwrap();
        if refined {
            h.add_level(&[IndexBox::new([4; 3], [12; 3])]).unwrap();
        }
        (system, h)
    }

    #[test]
    fn minkowski_has_no_violations() {
        let (system, mut h) = setup(true);
        initial::apply(&Minkowski, &mut h);

        let stats = constraint_statistics(&system, &h, &SingleProcess, 0.0);
        assert_eq!(stats, ConstraintStatistics::default());
    }

    #[test]
    fn black_hole_violates_only_differential_constraints() {
        let (system, mut h) = setup(false);
        let hole = StaticBlackHole {
            mass: 0.1,
            center: [0.5; 3],
            precollapse: false,
        };
        initial::apply(&hole, &mut h);
        BlockTransfer::new().fill_ghost_data(&mut h, 0, 0.0);

        let stats = constraint_statistics(&system, &h, &SingleProcess, 0.0);
        assert!(stats.hamiltonian.max > 0.0);
        assert!(stats.hamiltonian.stdev > 0.0);
        assert!(stats.hamiltonian.scaled_max <= 1.0 + 1e-12);
        assert_eq!(stats.momentum.max, 0.0);
        assert_eq!(stats.trace.max, 0.0);
        assert_eq!(stats.determinant.max, 0.0);
    }

    #[test]
    fn refined_cells_are_not_counted() {
        let (system, mut h) = setup(true);
        let slot = h.layout().channel(Field::Metric(sym(0, 0)));

        // Perturb every coarse cell covered by the fine level, plus one that is not.
        let patch = &mut h.level_mut(0).patches[0];
        let mut cells: Vec<[i64; 3]> = IndexBox::new([2; 3], [6; 3]).iter().collect();
        cells.push([0, 0, 0]);
        for cell in cells {
            let point = patch.local(cell);
            patch.store.register_mut(Register::Active).channel_mut(slot)[point] = 0.1;
        }

        let stats = constraint_statistics(&system, &h, &SingleProcess, 0.0);
        let volume = 1.0 / 512.0;

        assert!((stats.determinant.max - 0.1).abs() < 1e-12);
        assert!((stats.determinant.mean - 0.1 * volume).abs() < 1e-12);
        assert!((stats.determinant.scale_mean - 0.1 * volume).abs() < 1e-12);
        assert!(stats.determinant.stdev > 0.0);
        assert!((stats.determinant.scaled_max - 1.0).abs() < 1e-12);
    }
}

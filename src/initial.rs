//! Analytic initial data.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::fields::{Field, Register};
use crate::hierarchy::Hierarchy;
use crate::tensor::sym;

/// Initial values of every evolved difference variable as a function of position.
pub trait InitialData: Sync {
    /// Value of `field` at `position`. Fields the data does not mention are zero.
    fn value(&self, field: Field, position: [f64; 3]) -> f64;
}

/// Flat space in Cartesian coordinates with unit lapse.
#[derive(Clone, Copy, Debug, Default)]
pub struct Minkowski;

impl InitialData for Minkowski {
    fn value(&self, _field: Field, _position: [f64; 3]) -> f64 {
        0.0
    }
}

/// A Schwarzschild black hole in isotropic coordinates, ψ = 1 + M/2r with φ = ln ψ.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticBlackHole {
    pub mass: f64,
    pub center: [f64; 3],
    /// Start from the pre-collapsed lapse α = ψ⁻² instead of α = 1.
    pub precollapse: bool,
}

impl StaticBlackHole {
    pub fn conformal_factor(&self, position: [f64; 3]) -> f64 {
        let r = distance(position, self.center);
        1.0 + self.mass / (2.0 * r)
    }
}

impl InitialData for StaticBlackHole {
    fn value(&self, field: Field, position: [f64; 3]) -> f64 {
        let psi = self.conformal_factor(position);

        match field {
            Field::Conformal => psi.ln(),
            Field::Lapse if self.precollapse => psi.powi(-2) - 1.0,
            _ => 0.0,
        }
    }
}

/// A linearized plane gravitational wave with + polarization travelling along x:
/// γ̄_yy = 1 + A sin k(x - t), γ̄_zz = 1 - A sin k(x - t).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearWave {
    pub amplitude: f64,
    pub wavelength: f64,
}

impl LinearWave {
    fn wavenumber(&self) -> f64 {
        2.0 * PI / self.wavelength
    }

    /// The linearized solution at time `t`.
    pub fn exact(&self, field: Field, position: [f64; 3], t: f64) -> f64 {
        let k = self.wavenumber();
        let phase = k * (position[0] - t);
        let metric = self.amplitude * phase.sin();
        let curvature = 0.5 * self.amplitude * k * phase.cos();

        match field {
            Field::Metric(c) if c == sym(1, 1) => metric,
            Field::Metric(c) if c == sym(2, 2) => -metric,
            Field::Curvature(c) if c == sym(1, 1) => curvature,
            Field::Curvature(c) if c == sym(2, 2) => -curvature,
            _ => 0.0,
        }
    }
}

impl InitialData for LinearWave {
    fn value(&self, field: Field, position: [f64; 3]) -> f64 {
        self.exact(field, position, 0.0)
    }
}

/// A Gaussian pulse of a scalar field at rest on a flat background.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalarPulse {
    pub amplitude: f64,
    pub width: f64,
    pub center: [f64; 3],
}

impl InitialData for ScalarPulse {
    fn value(&self, field: Field, position: [f64; 3]) -> f64 {
        let r2 = distance(position, self.center).powi(2);
        let profile = self.amplitude * (-r2 / (self.width * self.width)).exp();

        match field {
            Field::Scalar => profile,
            Field::ScalarGradient(i) => {
                -2.0 * (position[i] - self.center[i]) / (self.width * self.width) * profile
            }
            _ => 0.0,
        }
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum::<f64>().sqrt()
}

/// Initial data selection as it appears in run configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConfig {
    pub kind: String,
    pub mass: f64,
    pub center: [f64; 3],
    pub precollapse: bool,
    pub amplitude: f64,
    pub wavelength: f64,
    pub width: f64,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            kind: "minkowski".into(),
            mass: 1.0,
            center: [0.0; 3],
            precollapse: false,
            amplitude: 1e-8,
            wavelength: 1.0,
            width: 1.0,
        }
    }
}

impl InitialConfig {
    pub fn build(&self) -> Result<Box<dyn InitialData>, SetupError> {
        let positive = |name: &str, value: f64| {
            if value > 0.0 {
                Ok(())
            } else {
                Err(SetupError::InvalidParameter(format!(
                    "{name} of {} initial data must be positive",
                    self.kind
                )))
            }
        };

        Ok(match self.kind.as_str() {
            "minkowski" => Box::new(Minkowski),
            "static_blackhole" => {
                positive("mass", self.mass)?;
                Box::new(StaticBlackHole {
                    mass: self.mass,
                    center: self.center,
                    precollapse: self.precollapse,
                })
            }
            "linear_wave" => {
                positive("wavelength", self.wavelength)?;
                Box::new(LinearWave {
                    amplitude: self.amplitude,
                    wavelength: self.wavelength,
                })
            }
            "scalar_pulse" => {
                positive("width", self.width)?;
                Box::new(ScalarPulse {
                    amplitude: self.amplitude,
                    width: self.width,
                    center: self.center,
                })
            }
            other => return Err(SetupError::UnsupportedInitialData(other.to_string())),
        })
    }
}

/// Evaluates `data` at every storage point, ghost cells included, of every level and
/// writes it into both the Active and Previous registers.
pub fn apply(data: &dyn InitialData, hierarchy: &mut Hierarchy) {
    let origin = hierarchy.origin();
    let fields = hierarchy.layout().fields().to_vec();

    for level in hierarchy.levels_mut() {
        let spacing = level.spacing();

        for patch in &mut level.patches {
            let patch_origin = patch.origin(origin, spacing);
            let space = patch.space();
            let active = patch.store.register_mut(Register::Active);

            for (point, index) in space.iter().enumerate() {
                let position: [f64; 3] =
                    std::array::from_fn(|axis| patch_origin[axis] + index[axis] as f64 * spacing[axis]);

                for (slot, &field) in fields.iter().enumerate() {
                    active.channel_mut(slot)[point] = data.value(field, position);
                }
            }

            patch.store.copy_active_to_previous();
        }
    }
}

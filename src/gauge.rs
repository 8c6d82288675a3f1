//! Gauge conditions for the lapse and shift.

use serde::{Deserialize, Serialize};

use crate::bssn::BssnData;

/// Pluggable slicing and shift conditions. Both return the time derivative of the
/// evolved difference variable, excluding advection along the shift.
pub trait Gauge: Sync {
    fn lapse(&self, bd: &BssnData) -> f64;
    fn shift(&self, bd: &BssnData, axis: usize) -> f64;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LapseCondition {
    /// ∂ₜα = 0
    #[default]
    Static,
    /// ∂ₜα = -α²ΔK
    Harmonic,
    /// ∂ₜα = -2αΔK
    OnePlusLog,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftCondition {
    /// ∂ₜβⁱ = 0
    #[default]
    Static,
    /// ∂ₜβⁱ = Bⁱ when the auxiliary field is evolved, otherwise ¾Γ̄ⁱ - ηβⁱ.
    GammaDriver,
}

/// The standard family of gauge conditions, selected at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    pub lapse: LapseCondition,
    pub shift: ShiftCondition,
    /// Damping parameter η of the Gamma-driver.
    pub eta: f64,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            lapse: LapseCondition::Static,
            shift: ShiftCondition::Static,
            eta: 1.0,
        }
    }
}

impl Gauge for GaugeConfig {
    fn lapse(&self, bd: &BssnData) -> f64 {
        match self.lapse {
            LapseCondition::Static => 0.0,
            LapseCondition::Harmonic => -bd.alpha * bd.alpha * bd.k_diff,
            LapseCondition::OnePlusLog => -2.0 * bd.alpha * bd.k_diff,
        }
    }

    fn shift(&self, bd: &BssnData, axis: usize) -> f64 {
        match self.shift {
            ShiftCondition::Static => 0.0,
            ShiftCondition::GammaDriver => match bd.driver {
                Some(driver) => driver[axis],
                None => 0.75 * bd.conn[axis] - self.eta * bd.beta[axis],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slicing_conditions() {
        let bd = BssnData {
            alpha: 0.5,
            k_diff: 0.2,
            conn: [0.4, 0.0, 0.0],
            beta: [0.1, 0.0, 0.0],
            ..Default::default()
        };

        let mut gauge = GaugeConfig::default();
        assert_eq!(gauge.lapse(&bd), 0.0);
        gauge.lapse = LapseCondition::Harmonic;
        assert!((gauge.lapse(&bd) + 0.05).abs() < 1e-15);
        gauge.lapse = LapseCondition::OnePlusLog;
        assert!((gauge.lapse(&bd) + 0.2).abs() < 1e-15);

        gauge.shift = ShiftCondition::GammaDriver;
        gauge.eta = 2.0;
        assert!((gauge.shift(&bd, 0) - (0.3 - 0.2)).abs() < 1e-15);

        let driven = BssnData {
            driver: Some([0.0, 0.7, 0.0]),
            ..bd
        };
        assert_eq!(gauge.shift(&driven, 1), 0.7);
    }
}

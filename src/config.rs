//! Runtime configuration of the evolution system.

use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::fd::Order;
use crate::fields::{Field, FieldLayout};
use crate::gauge::GaugeConfig;

/// Optional parts of the evolution system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Evolve the Z4c damping scalar θ.
    pub z4c: bool,
    /// Evolve the shift vector.
    pub shift: bool,
    /// Evolve the auxiliary Gamma-driver field Bⁱ (requires `shift`).
    pub gamma_driver: bool,
    /// Track the local number of e-folds.
    pub expansion: bool,
    /// Drop terms quadratic in the perturbation from the Ricci tensor and K equation.
    pub exclude_second_order_frw: bool,
}

/// Constraint damping amplitudes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Damping {
    /// Hamiltonian damping of the conformal metric, curvature and conformal factor.
    pub bs_h: f64,
    /// Hamiltonian damping of the extrinsic curvature trace.
    pub jm_k: f64,
    /// Z4c κ₁.
    pub z4c_k1: f64,
    /// Z4c κ₂.
    pub z4c_k2: f64,
}

/// Configuration of the BSSN system and its integrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BssnConfig {
    /// Order of accuracy of the finite-difference stencils.
    pub order: Order,
    /// Kreiss-Oliger dissipation strength. Zero disables the term entirely.
    #[serde(alias = "KO_damping_coefficient")]
    pub ko_damping_coefficient: f64,
    pub features: Features,
    pub damping: Damping,
    pub gauge: GaugeConfig,
    /// Restore det γ̄ = 1 and tr Ā = 0 at the start of every step.
    pub normalize: bool,
}

impl Default for BssnConfig {
    fn default() -> Self {
        Self {
            order: Order::Fourth,
            ko_damping_coefficient: 0.0,
            features: Features::default(),
            damping: Damping::default(),
            gauge: GaugeConfig::default(),
            normalize: true,
        }
    }
}

impl BssnConfig {
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.features.gamma_driver && !self.features.shift {
            return Err(SetupError::InvalidParameter(
                "the Gamma-driver auxiliary field requires shift evolution".into(),
            ));
        }

        if !self.ko_damping_coefficient.is_finite() || self.ko_damping_coefficient < 0.0 {
            return Err(SetupError::InvalidParameter(format!(
                "Kreiss-Oliger coefficient must be finite and non-negative, got {}",
                self.ko_damping_coefficient
            )));
        }

        Ok(())
    }

    /// Gravitational fields evolved under this configuration.
    pub fn fields(&self) -> Vec<Field> {
        let mut result: Vec<Field> = Field::core().collect();

        if self.features.z4c {
            result.push(Field::Theta);
        }

        if self.features.shift {
            result.extend((0..3).map(Field::Shift));
        }

        if self.features.expansion {
            result.push(Field::Expansion);
        }

        if self.features.gamma_driver {
            result.extend((0..3).map(Field::Driver));
        }

        result
    }

    /// Layout of the gravitational fields followed by `matter` fields.
    pub fn layout(&self, matter: &[Field]) -> FieldLayout {
        FieldLayout::new(self.fields().into_iter().chain(matter.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::{LapseCondition, ShiftCondition};

    #[test]
    fn parse_toml() {
        let config: BssnConfig = toml::from_str(
            r#"
            order = 6
            KO_damping_coefficient = 0.05

            [features]
            z4c = true
            shift = true
            gamma_driver = true

            [damping]
            z4c_k1 = 0.1

            [gauge]
            lapse = "one_plus_log"
            shift = "gamma_driver"
            eta = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.order, Order::Sixth);
        assert_eq!(config.ko_damping_coefficient, 0.05);
        assert!(config.features.z4c && config.features.gamma_driver);
        assert!(!config.features.expansion);
        assert_eq!(config.damping.z4c_k1, 0.1);
        assert_eq!(config.damping.jm_k, 0.0);
        assert_eq!(config.gauge.lapse, LapseCondition::OnePlusLog);
        assert_eq!(config.gauge.shift, ShiftCondition::GammaDriver);
        assert!(config.normalize);
        assert!(config.validate().is_ok());

        let layout = config.layout(&[]);
        assert_eq!(layout.len(), 18 + 1 + 3 + 3);
        assert!(layout.contains(Field::Driver(2)));
    }

    #[test]
    fn rejects_inconsistent_features() {
        let mut config = BssnConfig::default();
        config.features.gamma_driver = true;
        assert!(matches!(config.validate(), Err(SetupError::InvalidParameter(_))));

        let config: Result<BssnConfig, _> = toml::from_str("order = 3");
        assert!(config.is_err());
    }
}

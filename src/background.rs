//! Reference backgrounds subtracted from the evolved difference variables.

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Background quantities at one point and time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundValues {
    /// Trace of the extrinsic curvature, K_FRW.
    pub k: f64,
    /// Energy density, ρ_FRW.
    pub rho: f64,
    /// Trace of the stress, S_FRW.
    pub s: f64,
    /// Conformal factor exponent, φ_FRW.
    pub phi: f64,
}

/// Supplies the homogeneous reference cosmology the evolved fields are measured against.
pub trait Background: Sync {
    fn values(&self, time: f64, position: [f64; 3]) -> BackgroundValues;
}

/// Flat, empty background. Every difference variable is then the full variable
/// (minus one for the lapse and the identity for the metric).
#[derive(Clone, Copy, Debug, Default)]
pub struct Vacuum;

impl Background for Vacuum {
    fn values(&self, _time: f64, _position: [f64; 3]) -> BackgroundValues {
        BackgroundValues::default()
    }
}

/// A background with fixed, user supplied values.
#[derive(Clone, Copy, Debug, Default)]
pub struct Constant(pub BackgroundValues);

impl Background for Constant {
    fn values(&self, _time: f64, _position: [f64; 3]) -> BackgroundValues {
        self.0
    }
}

impl<B: Background + ?Sized> Background for &B {
    fn values(&self, time: f64, position: [f64; 3]) -> BackgroundValues {
        (**self).values(time, position)
    }
}

impl<B: Background + ?Sized> Background for Box<B> {
    fn values(&self, time: f64, position: [f64; 3]) -> BackgroundValues {
        (**self).values(time, position)
    }
}

/// Background selection as it appears in run configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub kind: String,
    /// Values of a `constant` background.
    #[serde(flatten)]
    pub values: BackgroundValues,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            kind: "vacuum".into(),
            values: BackgroundValues::default(),
        }
    }
}

impl BackgroundConfig {
    pub fn build(&self) -> Result<Box<dyn Background>, SetupError> {
        match self.kind.as_str() {
            "vacuum" => Ok(Box::new(Vacuum)),
            "constant" => {
                let values = self.values;
                if ![values.k, values.rho, values.s, values.phi].iter().all(|v| v.is_finite()) {
                    return Err(SetupError::InvalidParameter(
                        "constant background values must be finite".into(),
                    ));
                }
                Ok(Box::new(Constant(values)))
            }
            other => Err(SetupError::InvalidParameter(format!(
                "unknown background \"{other}\""
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_background_from_toml() {
        let config: BackgroundConfig = toml::from_str(
            r#"
            kind = "constant"
            k = -0.3
            rho = 0.015
            "#,
        )
        .unwrap();

        let background = config.build().unwrap();
        let values = background.values(1.0, [0.0; 3]);
        assert_eq!(values.k, -0.3);
        assert_eq!(values.rho, 0.015);
        assert_eq!(values.phi, 0.0);

        let vacuum = BackgroundConfig::default().build().unwrap();
        assert_eq!(vacuum.values(0.0, [1.0; 3]), BackgroundValues::default());

        let config = BackgroundConfig {
            kind: "de_sitter".into(),
            ..Default::default()
        };
        assert!(config.build().is_err());
    }
}

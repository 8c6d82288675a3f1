//! Matter models that source the BSSN equations.

mod scalar;

use serde::{Deserialize, Serialize};

use crate::background::BackgroundValues;
use crate::bssn::{BssnData, PatchView};
use crate::error::SetupError;
use crate::fields::{Channels, Field, Source};
use crate::tensor::{Symmetric, Vector};

pub use scalar::ScalarField;

/// Stress-energy projections at one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourceTerms {
    /// ρ
    pub rho: f64,
    /// S = γⁱʲSᵢⱼ
    pub s: f64,
    /// Sᵢ
    pub s_i: Vector,
    /// Sᵢⱼ
    pub s_ij: Symmetric,
}

impl SourceTerms {
    /// Stores these terms at `point` of a source grid.
    pub fn store(&self, sources: &mut Channels, point: usize) {
        sources.channel_mut(Source::Density.channel())[point] = self.rho;
        sources.channel_mut(Source::Trace.channel())[point] = self.s;
        for i in 0..3 {
            sources.channel_mut(Source::Momentum(i).channel())[point] = self.s_i[i];
        }
        for c in 0..6 {
            sources.channel_mut(Source::Stress(c).channel())[point] = self.s_ij.0[c];
        }
    }
}

/// A matter model evolved alongside the gravitational fields.
pub trait Matter: Sync {
    /// Additional evolved fields.
    fn fields(&self) -> Vec<Field>;

    /// Source terms at `point`, computed from the Active register.
    fn sources(&self, view: &PatchView<'_>, point: usize, frw: &BackgroundValues) -> SourceTerms;

    /// Time derivative of one of this model's fields, excluding dissipation.
    fn rhs(&self, field: Field, bd: &BssnData, view: &PatchView<'_>) -> f64;
}

/// Vacuum.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMatter;

impl Matter for NoMatter {
    fn fields(&self) -> Vec<Field> {
        Vec::new()
    }

    fn sources(&self, _view: &PatchView<'_>, _point: usize, _frw: &BackgroundValues) -> SourceTerms {
        SourceTerms::default()
    }

    fn rhs(&self, _field: Field, _bd: &BssnData, _view: &PatchView<'_>) -> f64 {
        0.0
    }
}

impl<M: Matter + ?Sized> Matter for Box<M> {
    fn fields(&self) -> Vec<Field> {
        (**self).fields()
    }

    fn sources(&self, view: &PatchView<'_>, point: usize, frw: &BackgroundValues) -> SourceTerms {
        (**self).sources(view, point, frw)
    }

    fn rhs(&self, field: Field, bd: &BssnData, view: &PatchView<'_>) -> f64 {
        (**self).rhs(field, bd, view)
    }
}

/// Matter selection as it appears in run configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatterConfig {
    pub kind: String,
    /// Scalar field mass m.
    pub mass: f64,
    /// Cosmological constant term Λ of the scalar potential.
    pub lambda: f64,
}

impl Default for MatterConfig {
    fn default() -> Self {
        Self {
            kind: "vacuum".into(),
            mass: 0.0,
            lambda: 0.0,
        }
    }
}

impl MatterConfig {
    pub fn build(&self) -> Result<Box<dyn Matter>, SetupError> {
        match self.kind.as_str() {
            "vacuum" => Ok(Box::new(NoMatter)),
            "scalar" => Ok(Box::new(ScalarField {
                mass: self.mass,
                lambda: self.lambda,
            })),
            other => Err(SetupError::UnsupportedMatter(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matter_selection() {
        let config = MatterConfig {
            kind: "scalar".into(),
            mass: 0.5,
            ..Default::default()
        };
        let matter = config.build().unwrap();
        assert_eq!(matter.fields().len(), 5);
        assert!(matter.fields().contains(&Field::ScalarGradient(2)));

        assert!(MatterConfig::default().build().unwrap().fields().is_empty());

        let config = MatterConfig {
            kind: "dust".into(),
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(SetupError::UnsupportedMatter(kind)) if kind == "dust"));
    }
}

//! Outer boundary treatments.
//!
//! A periodic domain has no outer boundary at all. On an open domain the ghost region
//! beyond the physical edge is filled by zero-gradient extrapolation, and the outermost
//! `width()` cells of the interior replace the BSSN right-hand side with the value
//! returned by [`Boundary::rhs`].

use serde::{Deserialize, Serialize};

use crate::bssn::PatchView;
use crate::error::SetupError;
use crate::fd::{Order, Stencils};
use crate::fields::Field;

/// Parameters of an outgoing radiation condition for a single field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadiativeParams {
    /// Value the field approaches far from the source.
    pub target: f64,
    /// Wavespeed of the field at the boundary.
    pub speed: f64,
}

impl RadiativeParams {
    /// A wave asymptotically approaching `target`, travelling at the speed of light.
    pub fn lightlike(target: f64) -> Self {
        Self { target, speed: 1.0 }
    }
}

/// Treatment of the outer edge of the coarsest level.
pub trait Boundary: Sync {
    /// Does the domain wrap around along every axis?
    fn is_periodic(&self) -> bool;

    /// Number of interior cells adjacent to the domain edge whose right-hand side
    /// comes from [`Boundary::rhs`].
    fn width(&self) -> usize;

    /// Time derivative of `field` at a boundary point.
    fn rhs(&self, field: Field, view: &PatchView<'_>, point: usize) -> f64;
}

impl<B: Boundary + ?Sized> Boundary for Box<B> {
    fn is_periodic(&self) -> bool {
        (**self).is_periodic()
    }

    fn width(&self) -> usize {
        (**self).width()
    }

    fn rhs(&self, field: Field, view: &PatchView<'_>, point: usize) -> f64 {
        (**self).rhs(field, view, point)
    }
}

/// Periodic domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct Periodic;

impl Boundary for Periodic {
    fn is_periodic(&self) -> bool {
        true
    }

    fn width(&self) -> usize {
        0
    }

    fn rhs(&self, _field: Field, _view: &PatchView<'_>, _point: usize) -> f64 {
        0.0
    }
}

/// Sommerfeld radiation condition ∂ₜf = -v((f - f∞) + xⁱ∂ᵢf) / r about a centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sommerfeld {
    pub center: [f64; 3],
    pub width: usize,
}

impl Sommerfeld {
    pub fn new(center: [f64; 3]) -> Self {
        Self { center, width: 1 }
    }

    /// Every evolved quantity is a difference from the background and decays to zero.
    pub fn radiative(&self, _field: Field) -> RadiativeParams {
        RadiativeParams::lightlike(0.0)
    }
}

impl Boundary for Sommerfeld {
    fn is_periodic(&self) -> bool {
        false
    }

    fn width(&self) -> usize {
        self.width
    }

    fn rhs(&self, field: Field, view: &PatchView<'_>, point: usize) -> f64 {
        let params = self.radiative(field);
        let data = view.field(field);
        let position = view.position(point);

        let offset: [f64; 3] = std::array::from_fn(|axis| position[axis] - self.center[axis]);
        let r = offset.iter().map(|x| x * x).sum::<f64>().sqrt();
        if r == 0.0 {
            return 0.0;
        }

        let stencils = Stencils::new(Order::Second, view.stencils.spacing(), view.space.strides());
        let gradient = stencils.gradient(data, point);
        let radial = (0..3).map(|axis| offset[axis] * gradient[axis]).sum::<f64>();

        -params.speed * ((data[point] - params.target) + radial) / r
    }
}

/// Boundary selection as it appears in run configuration files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub kind: String,
    pub center: [f64; 3],
    pub width: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            kind: "periodic".into(),
            center: [0.0; 3],
            width: 1,
        }
    }
}

impl BoundaryConfig {
    pub fn build(&self) -> Result<Box<dyn Boundary>, SetupError> {
        match self.kind.as_str() {
            "periodic" => Ok(Box::new(Periodic)),
            "sommerfeld" => {
                if self.width == 0 {
                    return Err(SetupError::InvalidParameter(
                        "sommerfeld boundary width must be positive".into(),
                    ));
                }
                Ok(Box::new(Sommerfeld {
                    center: self.center,
                    width: self.width,
                }))
            }
            other => Err(SetupError::UnsupportedBoundary(other.to_string())),
        }
    }
}

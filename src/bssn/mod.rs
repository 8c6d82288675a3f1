//! The BSSN evolution system.
//!
//! Evolved variables are stored as differences from a reference background:
//! Δγ̄ᵢⱼ = γ̄ᵢⱼ - δᵢⱼ, Āᵢⱼ, ΔK = K - K_FRW, Δφ = φ - φ_FRW, Δα = α - 1 and Γ̄ⁱ, plus the
//! optional Z4c, shift, expansion and Gamma-driver fields enabled in [`Features`].
//!
//! [`Features`]: crate::config::Features

mod constraints;
mod data;
mod rhs;

use crate::background::{Background, Vacuum};
use crate::boundary::{Boundary, Periodic};
use crate::config::BssnConfig;
use crate::error::SetupError;
use crate::fd::Stencils;
use crate::fields::{Channels, Field, FieldLayout, Source};
use crate::gauge::Gauge;
use crate::geometry::IndexSpace;
use crate::matter::{Matter, NoMatter};

pub use constraints::Residual;
pub use data::BssnData;

/// Read-only view of the Active register of one patch at one stage.
#[derive(Clone, Copy)]
pub struct PatchView<'a> {
    pub layout: &'a FieldLayout,
    pub active: &'a Channels,
    pub sources: &'a Channels,
    pub stencils: Stencils,
    /// Ghost-inclusive index space of the patch storage.
    pub space: IndexSpace<3>,
    /// Position of the cell with local index zero.
    pub origin: [f64; 3],
    /// Time at which the Active register is valid.
    pub time: f64,
}

impl<'a> PatchView<'a> {
    pub fn field(&self, field: Field) -> &'a [f64] {
        self.active.channel(self.layout.channel(field))
    }

    /// The grid of `field`, if it is evolved.
    pub fn optional(&self, field: Field) -> Option<&'a [f64]> {
        self.layout
            .slot(field)
            .map(|slot| self.active.channel(slot))
    }

    pub fn source(&self, source: Source) -> &'a [f64] {
        self.sources.channel(source.channel())
    }

    /// Cell-centre position of a storage point.
    pub fn position(&self, point: usize) -> [f64; 3] {
        let index = self.space.cartesian_from_linear(point);
        let spacing = self.stencils.spacing();
        std::array::from_fn(|axis| self.origin[axis] + index[axis] as f64 * spacing[axis])
    }
}

/// The BSSN equations together with the strategies they are parameterised by.
pub struct BssnSystem {
    pub config: BssnConfig,
    pub gauge: Box<dyn Gauge>,
    pub background: Box<dyn Background>,
    pub matter: Box<dyn Matter>,
    pub boundary: Box<dyn Boundary>,
    layout: FieldLayout,
}

impl BssnSystem {
    /// A vacuum system on a periodic domain with the gauge described by `config`.
    pub fn new(config: BssnConfig) -> Result<Self, SetupError> {
        config.validate()?;

        let layout = config.layout(&[]);
        let gauge = Box::new(config.gauge);

        Ok(Self {
            config,
            gauge,
            background: Box::new(Vacuum),
            matter: Box::new(NoMatter),
            boundary: Box::new(Periodic),
            layout,
        })
    }

    pub fn with_gauge(mut self, gauge: impl Gauge + 'static) -> Self {
        self.gauge = Box::new(gauge);
        self
    }

    pub fn with_background(mut self, background: impl Background + 'static) -> Self {
        self.background = Box::new(background);
        self
    }

    pub fn with_matter(mut self, matter: impl Matter + 'static) -> Self {
        self.layout = self.config.layout(&matter.fields());
        self.matter = Box::new(matter);
        self
    }

    pub fn with_boundary(mut self, boundary: impl Boundary + 'static) -> Self {
        self.boundary = Box::new(boundary);
        self
    }

    /// Every field evolved by this system, gravitational fields first.
    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Runs the derived-quantity pipeline at one point.
    pub fn point(&self, view: &PatchView<'_>, point: usize) -> BssnData {
        BssnData::compute(view, point, &self.config, self.background.as_ref())
    }
}

//! BSSN evolution of the Einstein equations on block-structured mesh hierarchies.
//!
//! Evolved variables live in per-patch [`fields::FieldStore`]s, are advanced with a
//! classical RK4 integrator per level and subcycled in time between levels following
//! Berger and Oliger. See [`sim::Simulation`] for the top-level loop.

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod background;
pub mod boundary;
pub mod bssn;
pub mod comm;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod fd;
pub mod fields;
pub mod gauge;
pub mod geometry;
pub mod hierarchy;
pub mod initial;
pub mod matter;
pub mod normalize;
pub mod rk4;
pub mod sim;
pub mod tagging;
pub mod tensor;
pub mod transfer;
pub mod validity;

/// Provides the types most `strata` applications need.
pub mod prelude {
    pub use crate::background::{Background, BackgroundConfig, BackgroundValues, Constant, Vacuum};
    pub use crate::boundary::{Boundary, BoundaryConfig, Periodic, Sommerfeld};
    pub use crate::bssn::BssnSystem;
    pub use crate::config::{BssnConfig, Damping, Features};
    pub use crate::diagnostics::{ConstraintStatistics, Statistics};
    pub use crate::error::{EvolveError, SetupError};
    pub use crate::fd::Order;
    pub use crate::fields::{Field, Register};
    pub use crate::gauge::{GaugeConfig, LapseCondition, ShiftCondition};
    pub use crate::geometry::IndexBox;
    pub use crate::hierarchy::{DomainConfig, Hierarchy};
    pub use crate::initial::{InitialConfig, InitialData};
    pub use crate::matter::{Matter, MatterConfig, ScalarField};
    pub use crate::sim::Simulation;
}

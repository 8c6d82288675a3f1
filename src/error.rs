//! Error types surfaced by setup and evolution.

use thiserror::Error;

use crate::fields::Field;
pub use crate::tensor::InvalidAxis;

/// Problems detected while building a simulation. None of these are recoverable,
/// so no partial run is ever attempted.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("unsupported boundary type \"{0}\"")]
    UnsupportedBoundary(String),
    #[error("unsupported initial condition type \"{0}\"")]
    UnsupportedInitialData(String),
    #[error("unsupported matter type \"{0}\"")]
    UnsupportedMatter(String),
    #[error("no transfer operator registered for field {0}")]
    MissingTransferOperator(Field),
    #[error("level {level} is empty")]
    EmptyLevel { level: usize },
    #[error("patch {patch} of level {level} is not aligned to the refinement ratio {ratio}")]
    MisalignedPatch { level: usize, patch: usize, ratio: usize },
    #[error("patch {patch} of level {level} is not nested within the next coarser level")]
    UnnestedPatch { level: usize, patch: usize },
    #[error("patches {a} and {b} of level {level} overlap")]
    OverlappingPatches { level: usize, a: usize, b: usize },
    #[error("ghost width {ghost} is smaller than the {required} cells the stencils need")]
    GhostTooNarrow { ghost: usize, required: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Fatal failures during evolution.
#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("non-finite value in field {field} on level {level}, patch {patch} at t = {time}")]
    NonFinite {
        level: usize,
        patch: usize,
        field: Field,
        time: f64,
    },
    #[error(transparent)]
    Setup(#[from] SetupError),
}

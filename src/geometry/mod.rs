//! Index-space bookkeeping for block-structured grids.
//!
//! Every level of a hierarchy lives in its own integer index space. Cells are
//! addressed by signed global indices (so that ghost regions and periodic images
//! can extend past the domain), while patch-local storage is addressed by
//! unsigned, ghost-inclusive cartesian indices.

mod boxes;
mod index;

pub use boxes::IndexBox;
pub use index::{CartesianIter, IndexSpace};

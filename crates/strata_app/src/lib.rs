//! Common utilities used by strata-based applications.
//!
//! Includes utils for loading and saving toml config files, resolving paths
//! relative to the working directory, logging verbosity, and styles for
//! progress bars (to keep styling consistent).

pub mod file;
pub mod logging;
pub mod progress;

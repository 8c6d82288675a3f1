use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata::prelude::*;

/// Run configuration of an evolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_directory")]
    pub directory: String,

    #[serde(default)]
    pub domain: DomainConfig,
    /// Boxes of each refined level, in that level's index space.
    #[serde(default)]
    pub levels: Vec<Level>,
    pub evolve: Evolve,

    #[serde(default)]
    pub bssn: BssnConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub initial: InitialConfig,
    #[serde(default)]
    pub matter: MatterConfig,
    #[serde(default)]
    pub background: BackgroundConfig,

    #[serde(default)]
    pub diagnostic: Diagnostic,
    #[serde(default)]
    pub tagging: Option<Tagging>,
}

fn default_name() -> String {
    "evbssn".into()
}

fn default_directory() -> String {
    "output".into()
}

impl Config {
    /// Retrieves the output directory in absolute form.
    pub fn directory(&self) -> eyre::Result<PathBuf> {
        Ok(strata_app::file::abs_or_relative(Path::new(&self.directory))?)
    }

    /// Checks settings the library cannot check itself.
    pub fn validate(&self) -> eyre::Result<()> {
        eyre::ensure!(
            self.domain.cells.iter().all(|&c| c > 0),
            "domain must have at least one cell along every axis"
        );
        eyre::ensure!(
            self.domain.length.iter().all(|&l| l > 0.0),
            "domain must have positive length along every axis"
        );
        eyre::ensure!(
            self.evolve.dt_frac > 0.0 && self.evolve.dt_frac <= 0.5,
            "dt_frac must lie in (0, 0.5]"
        );
        eyre::ensure!(self.evolve.steps > 0, "number of steps must be positive");
        eyre::ensure!(
            self.levels.iter().all(|level| !level.boxes.is_empty()),
            "every refined level needs at least one box"
        );

        if let Some(tagging) = &self.tagging {
            eyre::ensure!(tagging.interval > 0, "tagging interval must be positive");
            eyre::ensure!(tagging.threshold > 0.0, "tagging threshold must be positive");
        }

        Ok(())
    }

    /// Path of an output file of this run with the given extension.
    pub fn output(&self, extension: &str) -> eyre::Result<PathBuf> {
        Ok(self.directory()?.join(format!("{}.{extension}", self.name)))
    }

    pub fn refinement(&self) -> Vec<Vec<IndexBox>> {
        self.levels.iter().map(|level| level.boxes.clone()).collect()
    }
}

/// A refined level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub boxes: Vec<IndexBox>,
}

/// Evolution settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evolve {
    /// Coarse time step as a fraction of the coarse spacing.
    pub dt_frac: f64,
    /// Number of coarse steps to take.
    pub steps: usize,
}

/// Constraint history output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostic {
    /// Should constraint statistics be written to `<directory>/<name>.dat`, alongside the
    /// resolved configuration in `<directory>/<name>.toml`?
    pub save: bool,
}

/// Periodic reporting of cells a gradient criterion would refine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tagging {
    /// Name of the field to differentiate, as printed in logs.
    pub field: String,
    pub threshold: f64,
    /// Number of coarse steps between reports.
    #[serde(default = "default_interval")]
    pub interval: usize,
}

fn default_interval() -> usize {
    10
}

impl Tagging {
    /// Finds the evolved field with the configured name.
    pub fn field(&self, fields: &[Field]) -> eyre::Result<Field> {
        fields
            .iter()
            .copied()
            .find(|field| field.to_string() == self.field)
            .ok_or_else(|| eyre::eyre!("no evolved field is named \"{}\"", self.field))
    }
}

//! Experiment configuration: which observables to load and how to name outputs
//!
//! The default configuration matches the square-lattice runs (L = 12,
//! w = 1, ld = 025) with the five standard observables. Other runs can
//! supply their own configuration as JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Measurement domain of a statistics file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Real-space measurements, indexed by separation
    Position,
    /// Reciprocal-space measurements, indexed by wavevector
    Momentum,
}

impl Domain {
    /// Both domains in processing order
    pub const ALL: [Domain; 2] = [Domain::Position, Domain::Momentum];

    /// Tag used in input and output file names
    pub fn tag(self) -> &'static str {
        match self {
            Domain::Position => "position",
            Domain::Momentum => "momentum",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "position" => Ok(Domain::Position),
            "momentum" => Ok(Domain::Momentum),
            other => Err(Error::InvalidConfig(format!("unknown domain '{}'", other))),
        }
    }
}

/// One measured observable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservableSpec {
    /// Value column name, also the prefix of the renamed error column
    pub name: String,
    /// File name prefix, e.g. "Greens" for "Greens_position_stats.out"
    pub file_stem: String,
}

impl ObservableSpec {
    /// Create an observable whose file stem equals its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            file_stem: name.clone(),
            name,
        }
    }

    /// Input file name for a domain
    pub fn file_name(&self, domain: Domain) -> String {
        format!("{}_{}_stats.out", self.file_stem, domain.tag())
    }

    /// Name the generic `error` column is renamed to
    pub fn error_column(&self) -> String {
        format!("{}_error", self.name)
    }
}

/// Observables and output naming for one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Observables in merge order; the first one anchors the merge
    pub observables: Vec<ObservableSpec>,
    /// Lattice geometry label
    pub lattice: String,
    /// Linear lattice size
    pub linear_size: u32,
    /// Phonon frequency label
    pub phonon_frequency: String,
    /// Disorder/coupling label
    pub disorder: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            observables: ["DenDen", "Greens", "PairGreens", "PhononGreens", "SpinSpin"]
                .into_iter()
                .map(ObservableSpec::new)
                .collect(),
            lattice: "square".to_string(),
            linear_size: 12,
            phonon_frequency: "1".to_string(),
            disorder: "025".to_string(),
        }
    }
}

impl ExperimentConfig {
    /// Load a configuration from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check that the configuration can drive a merge
    pub fn validate(&self) -> Result<()> {
        if self.observables.is_empty() {
            return Err(Error::InvalidConfig("no observables configured".to_string()));
        }

        let mut seen = HashSet::new();
        for obs in &self.observables {
            if obs.name.trim().is_empty() || obs.file_stem.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "observable name and file stem must not be empty".to_string(),
                ));
            }
            if !seen.insert(obs.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate observable '{}'",
                    obs.name
                )));
            }
        }

        Ok(())
    }

    /// The observable whose table anchors the merge
    pub fn anchor(&self) -> Option<&ObservableSpec> {
        self.observables.first()
    }

    /// Output file name for a domain at inverse temperature `beta`
    pub fn output_file_name(&self, beta: &str, domain: Domain) -> String {
        format!(
            "{}_L{}_beta{}_w{}_ld{}_{}_stats_data.csv",
            self.lattice,
            self.linear_size,
            beta,
            self.phonon_frequency,
            self.disorder,
            domain.tag()
        )
    }
}

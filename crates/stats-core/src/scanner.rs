//! Directory scanner for discovering simulation run directories

use crate::config::{Domain, ExperimentConfig};
use crate::error::{Error, Result};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Find run directories below `root`, sorted by path
///
/// A directory counts as a run when it contains the anchor observable's
/// position-space statistics file. Unreadable entries below the root are
/// skipped with a warning.
pub fn find_run_directories<P: AsRef<Path>>(root: P, config: &ExperimentConfig) -> Result<Vec<PathBuf>> {
    let marker = config
        .anchor()
        .map(|obs| obs.file_name(Domain::Position))
        .ok_or_else(|| Error::InvalidConfig("no observables configured".to_string()))?;

    let mut runs = Vec::new();
    for entry in WalkDir::new(root.as_ref()).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name().to_str() == Some(marker.as_str()) {
            if let Some(parent) = entry.path().parent() {
                runs.push(parent.to_path_buf());
            }
        }
    }

    runs.sort();
    runs.dedup();
    Ok(runs)
}

//! Summary records of completed aggregations

use crate::aggregate::Aggregation;
use crate::error::{Error, Result};
use crate::merger::MergedTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Shape of one merged table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
}

impl From<&MergedTable> for TableSummary {
    fn from(table: &MergedTable) -> Self {
        Self {
            rows: table.row_count(),
            columns: table.column_count(),
        }
    }
}

/// A record of one aggregated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// When the aggregation finished
    pub generated_at: DateTime<Utc>,
    /// Run directory that was read
    pub run_dir: PathBuf,
    /// Inverse temperature token from the run name
    pub beta: String,
    pub position: TableSummary,
    pub momentum: TableSummary,
    /// Files written, if any
    pub outputs: Vec<PathBuf>,
}

impl AggregationReport {
    /// Summarise an aggregation of `run_dir`
    pub fn new(run_dir: impl Into<PathBuf>, aggregation: &Aggregation) -> Self {
        Self {
            generated_at: Utc::now(),
            run_dir: run_dir.into(),
            beta: aggregation.run.beta.clone(),
            position: TableSummary::from(&aggregation.position),
            momentum: TableSummary::from(&aggregation.momentum),
            outputs: aggregation.outputs.clone(),
        }
    }

    /// Load reports from a JSON file, or an empty list if it does not exist
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save reports to a JSON file
    pub fn save_all<P: AsRef<Path>>(reports: &[Self], path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(reports)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Append reports to an existing JSON file
    pub fn append<P: AsRef<Path>>(reports: &[Self], path: P) -> Result<()> {
        let mut all = Self::load_all(path.as_ref())?;
        all.extend_from_slice(reports);
        Self::save_all(&all, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(beta: &str) -> AggregationReport {
        AggregationReport {
            generated_at: Utc::now(),
            run_dir: PathBuf::from(format!("/runs/square_L12_b{}_w1", beta)),
            beta: beta.to_string(),
            position: TableSummary { rows: 7, columns: 11 },
            momentum: TableSummary { rows: 12, columns: 12 },
            outputs: Vec::new(),
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reports = AggregationReport::load_all(dir.path().join("none.json")).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_append_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.json");

        AggregationReport::append(&[report("1")], &path).unwrap();
        AggregationReport::append(&[report("2"), report("4")], &path).unwrap();

        let loaded = AggregationReport::load_all(&path).unwrap();
        let betas: Vec<&str> = loaded.iter().map(|r| r.beta.as_str()).collect();
        assert_eq!(betas, vec!["1", "2", "4"]);
        assert_eq!(loaded[0].position.columns, 11);
    }
}

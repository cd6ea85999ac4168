//! Load, merge and persist the statistics of one simulation run

use crate::config::{Domain, ExperimentConfig};
use crate::error::{Error, Result};
use crate::export::{write_table, ExportFormat};
use crate::merger::{merge_domain, MergedTable, ObservableTable};
use crate::parser::parse_stats_file;
use crate::run_name::RunName;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Merged tables of one run, position domain first
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub run: RunName,
    pub position: MergedTable,
    pub momentum: MergedTable,
    /// Files written, empty when nothing was persisted
    pub outputs: Vec<PathBuf>,
}

impl Aggregation {
    /// The two merged tables as a pair
    pub fn into_tables(self) -> (MergedTable, MergedTable) {
        (self.position, self.momentum)
    }

    /// The merged table of a domain
    pub fn table(&self, domain: Domain) -> &MergedTable {
        match domain {
            Domain::Position => &self.position,
            Domain::Momentum => &self.momentum,
        }
    }
}

/// Result of aggregating several runs into one output directory
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Runs that merged and were written, in input order
    pub aggregations: Vec<(PathBuf, Aggregation)>,
    /// Runs that were skipped, with the reason
    pub failures: Vec<(PathBuf, Error)>,
}

impl BatchOutcome {
    /// Number of files written across all runs
    pub fn files_written(&self) -> usize {
        self.aggregations.iter().map(|(_, a)| a.outputs.len()).sum()
    }
}

/// Builds merged tables for runs of one experiment
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    config: ExperimentConfig,
    format: ExportFormat,
}

impl StatsAggregator {
    /// Create an aggregator for an experiment
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            format: ExportFormat::Csv,
        })
    }

    /// Use a different output format when persisting
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Merge a run's tables, writing them to the current directory if `persist`
    pub fn aggregate<P: AsRef<Path>>(
        &self,
        directory: P,
        persist: bool,
    ) -> Result<(MergedTable, MergedTable)> {
        let output_dir = if persist {
            Some(std::env::current_dir()?)
        } else {
            None
        };
        self.aggregate_into(directory, output_dir.as_deref())
            .map(Aggregation::into_tables)
    }

    /// Merge a run's tables, writing them into `output_dir` when given
    ///
    /// Nothing is written unless all input files load and merge cleanly.
    pub fn aggregate_into<P: AsRef<Path>>(
        &self,
        directory: P,
        output_dir: Option<&Path>,
    ) -> Result<Aggregation> {
        let directory = directory.as_ref();
        let run = RunName::from_dir(directory)?;
        debug!("aggregating {} (beta = {})", directory.display(), run.beta);

        let position = self.load_domain(directory, Domain::Position)?;
        let momentum = self.load_domain(directory, Domain::Momentum)?;

        let mut outputs = Vec::new();
        if let Some(output_dir) = output_dir {
            for table in [&position, &momentum] {
                let path = self.output_path(&run, table.domain, output_dir);
                if let Err(e) = write_table(table, &path, self.format) {
                    // Both tables or neither
                    for written in &outputs {
                        let _ = fs::remove_file(written);
                    }
                    return Err(e);
                }
                outputs.push(path);
            }
        }

        info!(
            "aggregated {}: {} position rows, {} momentum rows",
            run.name,
            position.row_count(),
            momentum.row_count()
        );

        Ok(Aggregation {
            run,
            position,
            momentum,
            outputs,
        })
    }

    /// Aggregate several runs into `output_dir`, continuing past failures
    ///
    /// A run whose output files were already written by an earlier run of
    /// the batch (same inverse temperature) is skipped, not overwritten.
    pub fn aggregate_batch(&self, runs: &[PathBuf], output_dir: &Path) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

        for run_dir in runs {
            let result = self
                .check_unclaimed(run_dir, output_dir, &claimed)
                .and_then(|()| self.aggregate_into(run_dir, Some(output_dir)));

            match result {
                Ok(aggregation) => {
                    for path in &aggregation.outputs {
                        claimed.insert(path.clone(), run_dir.clone());
                    }
                    outcome.aggregations.push((run_dir.clone(), aggregation));
                }
                Err(e) => {
                    warn!("skipping {}: {}", run_dir.display(), e);
                    outcome.failures.push((run_dir.clone(), e));
                }
            }
        }

        outcome
    }

    fn check_unclaimed(
        &self,
        run_dir: &Path,
        output_dir: &Path,
        claimed: &HashMap<PathBuf, PathBuf>,
    ) -> Result<()> {
        let run = RunName::from_dir(run_dir)?;
        for domain in Domain::ALL {
            let path = self.output_path(&run, domain, output_dir);
            if let Some(previous) = claimed.get(&path) {
                return Err(Error::OutputCollision {
                    path,
                    run: run_dir.to_path_buf(),
                    previous: previous.clone(),
                });
            }
        }
        Ok(())
    }

    /// Parse and merge every observable file of one domain
    pub fn load_domain(&self, directory: &Path, domain: Domain) -> Result<MergedTable> {
        let tables = self
            .input_paths(directory, domain)
            .into_iter()
            .zip(&self.config.observables)
            .map(|(path, spec)| ObservableTable::new(spec.clone(), parse_stats_file(path)?))
            .collect::<Result<Vec<_>>>()?;

        merge_domain(domain, &tables)
    }

    /// Expected input files of one domain, in observable order
    pub fn input_paths(&self, directory: &Path, domain: Domain) -> Vec<PathBuf> {
        self.config
            .observables
            .iter()
            .map(|obs| directory.join(obs.file_name(domain)))
            .collect()
    }

    fn output_path(&self, run: &RunName, domain: Domain, output_dir: &Path) -> PathBuf {
        output_dir.join(self.output_file_name(run, domain))
    }

    /// Output file name for a run and domain
    pub fn output_file_name(&self, run: &RunName, domain: Domain) -> String {
        let name = self.config.output_file_name(&run.beta, domain);
        match self.format {
            ExportFormat::Csv => name,
            format => Path::new(&name)
                .with_extension(format.extension())
                .to_string_lossy()
                .into_owned(),
        }
    }
}

/// Merge a run's tables with the default experiment configuration
pub fn aggregate<P: AsRef<Path>>(directory: P, persist: bool) -> Result<(MergedTable, MergedTable)> {
    StatsAggregator::default().aggregate(directory, persist)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVABLES: [&str; 5] = ["DenDen", "Greens", "PairGreens", "PhononGreens", "SpinSpin"];

    fn write_run(root: &Path, name: &str, rows: usize) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (n, obs) in OBSERVABLES.iter().enumerate() {
            let mut position = format!("r {} error\n", obs);
            let mut momentum = format!("k {} error\n", obs);
            for i in 0..rows {
                position.push_str(&format!("{} {} 0.0{}\n", i, n as f64 + 0.5 * i as f64, i + 1));
                momentum.push_str(&format!("k{} {} 0.0{}\n", i, n as f64 - 0.25 * i as f64, i + 1));
            }
            fs::write(dir.join(format!("{}_position_stats.out", obs)), position).unwrap();
            fs::write(dir.join(format!("{}_momentum_stats.out", obs)), momentum).unwrap();
        }
        dir
    }

    #[test]
    fn test_aggregate_without_persist() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_run(root.path(), "run_x_b0.25_extra", 3);

        let result = StatsAggregator::default().aggregate_into(&dir, None).unwrap();

        assert_eq!(result.run.beta, "0.25");
        assert_eq!(result.position.row_count(), 3);
        assert_eq!(result.position.column_count(), 11);
        assert_eq!(result.momentum.row_count(), 3);
        assert_eq!(result.momentum.domain, Domain::Momentum);
        assert!(result.outputs.is_empty());
    }

    #[test]
    fn test_aggregate_writes_named_outputs() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dir = write_run(root.path(), "run_x_b0.25_extra", 3);

        let result = StatsAggregator::default()
            .aggregate_into(&dir, Some(out.path()))
            .unwrap();

        let position = out
            .path()
            .join("square_L12_beta0.25_w1_ld025_position_stats_data.csv");
        let momentum = out
            .path()
            .join("square_L12_beta0.25_w1_ld025_momentum_stats_data.csv");
        assert_eq!(result.outputs, vec![position.clone(), momentum.clone()]);
        assert!(position.exists());
        assert!(momentum.exists());
    }

    #[test]
    fn test_missing_file_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dir = write_run(root.path(), "run_x_b1_extra", 2);
        fs::remove_file(dir.join("SpinSpin_momentum_stats.out")).unwrap();

        let err = StatsAggregator::default()
            .aggregate_into(&dir, Some(out.path()))
            .unwrap_err();

        assert!(matches!(err, Error::FileRead { .. }));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_bad_run_name_fails_before_reading() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_run(root.path(), "unlabelled", 2);

        let err = StatsAggregator::default().aggregate_into(&dir, None).unwrap_err();
        assert!(matches!(err, Error::InvalidRunName { .. }));
    }

    #[test]
    fn test_batch_skips_runs_with_same_beta() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let first = write_run(&root.path().join("a"), "square_L12_b1_w1", 2);
        let second = write_run(&root.path().join("b"), "square_L12_b1_w1", 3);
        let third = write_run(&root.path().join("b"), "square_L12_b2_w1", 2);

        let outcome = StatsAggregator::default()
            .aggregate_batch(&[first.clone(), second.clone(), third], out.path());

        assert_eq!(outcome.aggregations.len(), 2);
        assert_eq!(outcome.files_written(), 4);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 4);

        assert_eq!(outcome.failures.len(), 1);
        match &outcome.failures[0] {
            (run, Error::OutputCollision { previous, .. }) => {
                assert_eq!(run, &second);
                assert_eq!(previous, &first);
            }
            other => panic!("unexpected failure: {:?}", other),
        }

        // The first run's two-row table was not replaced
        let position = out
            .path()
            .join("square_L12_beta1_w1_ld025_position_stats_data.csv");
        assert_eq!(fs::read_to_string(position).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_batch_records_failed_runs() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let good = write_run(root.path(), "square_L12_b4_w1", 2);
        let bad = write_run(root.path(), "square_L12_b5_w1", 2);
        fs::remove_file(bad.join("Greens_position_stats.out")).unwrap();

        let outcome = StatsAggregator::default().aggregate_batch(&[bad, good], out.path());

        assert_eq!(outcome.aggregations.len(), 1);
        assert_eq!(outcome.aggregations[0].1.run.beta, "4");
        assert!(matches!(outcome.failures[0].1, Error::FileRead { .. }));
        assert_eq!(outcome.files_written(), 2);
    }

    #[test]
    fn test_json_output_name() {
        let aggregator = StatsAggregator::default().with_format(ExportFormat::Json);
        let run = RunName::parse("square_L12_b0.5_w1").unwrap();

        assert_eq!(
            aggregator.output_file_name(&run, Domain::Momentum),
            "square_L12_beta0.5_w1_ld025_momentum_stats_data.json"
        );
    }

    #[test]
    fn test_custom_observables() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_run(root.path(), "run_x_b2_extra", 4);

        let mut config = ExperimentConfig::default();
        config.observables.truncate(2);
        let aggregator = StatsAggregator::new(config).unwrap();

        let (position, momentum) = aggregator.aggregate(&dir, false).unwrap();
        assert_eq!(position.column_count(), 3 + 2);
        assert_eq!(momentum.row_count(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExperimentConfig {
            observables: Vec::new(),
            ..ExperimentConfig::default()
        };
        assert!(StatsAggregator::new(config).is_err());
    }

    #[test]
    fn test_input_paths() {
        let aggregator = StatsAggregator::default();
        let paths = aggregator.input_paths(Path::new("/runs/a_b_b1"), Domain::Position);
        assert_eq!(paths.len(), 5);
        assert_eq!(
            paths[3],
            PathBuf::from("/runs/a_b_b1/PhononGreens_position_stats.out")
        );
    }
}

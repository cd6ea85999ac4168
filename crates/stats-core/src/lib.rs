//! stats-core: Core library for merging HMC measurement statistics
//!
//! This library provides functionality to:
//! - Parse whitespace-separated `*_stats.out` measurement files
//! - Extract the inverse temperature from a run directory name
//! - Merge the per-observable tables of a domain column-wise, checking
//!   that index columns agree
//! - Persist merged position and momentum tables as CSV or JSON
//! - Discover run directories and record aggregation reports

pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod merger;
pub mod parser;
pub mod report;
pub mod run_name;
pub mod scanner;
pub mod table;

pub use aggregate::{aggregate, Aggregation, BatchOutcome, StatsAggregator};
pub use config::{Domain, ExperimentConfig, ObservableSpec};
pub use error::{Error, Result};
pub use export::{write_csv, write_json, write_table, ExportFormat};
pub use merger::{merge_domain, MergedTable, ObservableTable};
pub use parser::{parse_stats_file, parse_stats_str, parse_table, parse_table_str, Delimiter};
pub use report::{AggregationReport, TableSummary};
pub use run_name::{RunName, RunParameter};
pub use scanner::find_run_directories;
pub use table::{CellValue, Column, Row, Table};

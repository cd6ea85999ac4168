//! HMC Statistics CLI
//!
//! Command-line tool for merging the per-observable statistics files of
//! HMC simulation runs into position and momentum tables.

use clap::{Parser, Subcommand};
use stats_core::{
    find_run_directories, parse_stats_file, AggregationReport, Domain, ExperimentConfig,
    ExportFormat, StatsAggregator,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stats-cli")]
#[command(about = "HMC measurement statistics aggregator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the statistics files of one run directory
    Aggregate {
        /// Run directory (e.g. square_L12_b4_w1_ld025)
        #[arg(short, long)]
        dir: PathBuf,

        /// Directory for the merged tables (defaults to the current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Only report the merged shapes, write nothing
        #[arg(long)]
        no_save: bool,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Experiment configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Append a summary of this run to a JSON report file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Merge every run directory found below a root
    Batch {
        /// Root directory to search for runs
        #[arg(short, long)]
        root: PathBuf,

        /// Directory for the merged tables (defaults to the current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Experiment configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Append summaries of successful runs to a JSON report file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show a merged table without writing it
    Show {
        /// Run directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Domain to show (position or momentum)
        #[arg(long, default_value = "position")]
        domain: String,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,

        /// Columns to display (comma-separated)
        #[arg(long)]
        columns: Option<String>,

        /// Experiment configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse and display a single statistics file
    Parse {
        /// Path to a *_stats.out file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Write the default experiment configuration as a template
    InitConfig {
        /// Output path for the configuration file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> stats_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            dir,
            output_dir,
            no_save,
            format,
            config,
            report,
        } => cmd_aggregate(
            &dir,
            output_dir,
            no_save,
            &format,
            config.as_deref(),
            report.as_deref(),
        ),
        Commands::Batch {
            root,
            output_dir,
            config,
            report,
        } => cmd_batch(&root, output_dir, config.as_deref(), report.as_deref()),
        Commands::Show {
            dir,
            domain,
            limit,
            columns,
            config,
        } => cmd_show(&dir, &domain, limit, columns, config.as_deref()),
        Commands::Parse { file } => cmd_parse(&file),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

fn load_config(path: Option<&Path>) -> stats_core::Result<ExperimentConfig> {
    match path {
        Some(path) => ExperimentConfig::load(path),
        None => Ok(ExperimentConfig::default()),
    }
}

fn resolve_output_dir(output_dir: Option<PathBuf>) -> stats_core::Result<PathBuf> {
    match output_dir {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

fn cmd_aggregate(
    dir: &Path,
    output_dir: Option<PathBuf>,
    no_save: bool,
    format: &str,
    config: Option<&Path>,
    report: Option<&Path>,
) -> stats_core::Result<()> {
    let format: ExportFormat = format.parse()?;
    let aggregator = StatsAggregator::new(load_config(config)?)?.with_format(format);

    let output_dir = if no_save {
        None
    } else {
        Some(resolve_output_dir(output_dir)?)
    };

    let result = aggregator.aggregate_into(dir, output_dir.as_deref())?;

    println!("Run: {} (beta = {})", result.run.name, result.run.beta);
    for domain in Domain::ALL {
        let table = result.table(domain);
        println!(
            "  {}: {} rows x {} columns from {} files",
            domain,
            table.row_count(),
            table.column_count(),
            table.sources.len()
        );
    }
    for path in &result.outputs {
        println!("Wrote {}", path.display());
    }

    if let Some(report) = report {
        AggregationReport::append(&[AggregationReport::new(dir, &result)], report)?;
        println!("Report appended to {}", report.display());
    }

    Ok(())
}

fn cmd_batch(
    root: &Path,
    output_dir: Option<PathBuf>,
    config: Option<&Path>,
    report: Option<&Path>,
) -> stats_core::Result<()> {
    let config = load_config(config)?;
    let runs = find_run_directories(root, &config)?;
    let aggregator = StatsAggregator::new(config)?;
    let output_dir = resolve_output_dir(output_dir)?;

    println!("Found {} run(s) under {}", runs.len(), root.display());

    let outcome = aggregator.aggregate_batch(&runs, &output_dir);
    let reports: Vec<AggregationReport> = outcome
        .aggregations
        .iter()
        .map(|(run_dir, result)| {
            println!("  {} -> {} files", run_dir.display(), result.outputs.len());
            AggregationReport::new(run_dir, result)
        })
        .collect();

    println!();
    println!("Batch complete:");
    println!("  {} runs aggregated", reports.len());
    println!(
        "  {} files written to {}",
        outcome.files_written(),
        output_dir.display()
    );

    if let Some(report) = report {
        AggregationReport::append(&reports, report)?;
    }

    if !outcome.failures.is_empty() {
        println!("\nErrors ({}):", outcome.failures.len());
        for (path, err) in &outcome.failures {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}

fn cmd_show(
    dir: &Path,
    domain: &str,
    limit: Option<usize>,
    columns: Option<String>,
    config: Option<&Path>,
) -> stats_core::Result<()> {
    let domain: Domain = domain.parse()?;
    let aggregator = StatsAggregator::new(load_config(config)?)?;
    let merged = aggregator.load_domain(dir, domain)?;

    // Filter columns if specified
    let col_filter: Option<Vec<&str>> = columns.as_ref().map(|c| c.split(',').collect());

    let display_cols: Vec<&stats_core::Column> = if let Some(ref filter) = col_filter {
        merged
            .columns
            .iter()
            .filter(|c| filter.contains(&c.name.as_str()))
            .collect()
    } else {
        merged.columns.iter().collect()
    };

    // Print header
    let header: Vec<&str> = display_cols.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    // Print rows
    let row_limit = limit.unwrap_or(merged.rows.len());
    for row in merged.rows.iter().take(row_limit) {
        let values: Vec<String> = display_cols
            .iter()
            .map(|col| {
                row.get(col.index)
                    .map(|c| c.to_string_value())
                    .unwrap_or_default()
            })
            .collect();
        println!("{}", values.join("\t"));
    }

    if merged.rows.len() > row_limit {
        println!("... ({} more rows)", merged.rows.len() - row_limit);
    }

    Ok(())
}

fn cmd_parse(file: &Path) -> stats_core::Result<()> {
    let table = parse_stats_file(file)?;

    println!("File: {}", file.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();

    // Print header
    let header: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    // Print first 10 rows
    for row in table.rows.iter().take(10) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > 10 {
        println!("... ({} more rows)", table.row_count() - 10);
    }

    Ok(())
}

fn cmd_init_config(output: &Path) -> stats_core::Result<()> {
    let config = ExperimentConfig::default();
    config.save(output)?;

    println!("Created configuration file: {}", output.display());
    println!("Observables:");
    for obs in &config.observables {
        println!(
            "  {} ({}, {})",
            obs.name,
            obs.file_name(Domain::Position),
            obs.file_name(Domain::Momentum)
        );
    }
    println!();
    println!("Edit the file to match your run, then run:");
    println!(
        "  stats-cli aggregate --dir <run> --config {}",
        output.display()
    );

    Ok(())
}

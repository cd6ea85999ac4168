//! Persisting merged tables

use crate::error::{Error, Result};
use crate::merger::MergedTable;
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output format for merged tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated with a leading row-number column
    #[default]
    Csv,
    /// Pretty-printed JSON of the whole table
    Json,
}

impl ExportFormat {
    /// File extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::InvalidConfig(format!(
                "unknown format '{}', supported formats: csv, json",
                other
            ))),
        }
    }
}

/// Write a merged table in the given format
pub fn write_table<P: AsRef<Path>>(table: &MergedTable, path: P, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(table, path),
        ExportFormat::Json => write_json(table, path),
    }
}

/// Write a merged table as CSV
///
/// The first column is unnamed and holds the 0-based row number, followed
/// by the table's own columns.
pub fn write_csv<P: AsRef<Path>>(table: &MergedTable, path: P) -> Result<()> {
    let path = path.as_ref();
    write_atomic(path, |writer| {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let csv_err = |e: csv::Error| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        };

        let header = std::iter::once("").chain(table.columns.iter().map(|c| c.name.as_str()));
        csv_writer.write_record(header).map_err(csv_err)?;

        for (i, row) in table.rows.iter().enumerate() {
            let record = std::iter::once(i.to_string())
                .chain(row.cells.iter().map(|c| c.to_string_value()));
            csv_writer.write_record(record).map_err(csv_err)?;
        }

        csv_writer.flush()?;
        Ok(())
    })?;

    info!("wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

/// Write a merged table as JSON
pub fn write_json<P: AsRef<Path>>(table: &MergedTable, path: P) -> Result<()> {
    let path = path.as_ref();
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, table)?;
        writeln!(writer)?;
        Ok(())
    })?;

    info!("wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

/// Write through a sibling temporary file, then rename into place
fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp_path = temp_path(path);
    let result = File::create(&tmp_path)
        .map_err(Error::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        })
        .and_then(|()| fs::rename(&tmp_path, path).map_err(Error::from));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", file_name))
}

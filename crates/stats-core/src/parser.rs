//! Parser for measurement statistics files
//!
//! Simulation output (`*_stats.out`) is whitespace separated with a header
//! row. Persisted merge results are comma separated and can be read back
//! with [`Delimiter::Comma`].

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Field separator of a table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Any run of spaces or tabs
    Whitespace,
    /// A single comma, with CSV quoting
    Comma,
}

/// Parse a whitespace-separated statistics file into a Table
pub fn parse_stats_file<P: AsRef<Path>>(path: P) -> Result<Table> {
    parse_table(path, Delimiter::Whitespace)
}

/// Parse statistics text from a string (useful for testing)
pub fn parse_stats_str(content: &str, source_name: &str) -> Result<Table> {
    parse_table_str(content, source_name, Delimiter::Whitespace)
}

/// Parse a table file with the given delimiter
pub fn parse_table<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<Table> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let table = parse_content(&content, path.to_path_buf(), delimiter)?;
    debug!(
        "parsed {} ({} columns, {} rows)",
        path.display(),
        table.column_count(),
        table.row_count()
    );
    Ok(table)
}

/// Parse table text from a string with the given delimiter
pub fn parse_table_str(content: &str, source_name: &str, delimiter: Delimiter) -> Result<Table> {
    parse_content(content, PathBuf::from(source_name), delimiter)
}

fn parse_content(content: &str, path: PathBuf, delimiter: Delimiter) -> Result<Table> {
    let normalized;
    let (text, mut builder) = match delimiter {
        Delimiter::Whitespace => {
            normalized = normalize_whitespace(content);
            let mut builder = csv::ReaderBuilder::new();
            builder.delimiter(b' ').quoting(false);
            (normalized.as_str(), builder)
        }
        Delimiter::Comma => (content, csv::ReaderBuilder::new()),
    };

    // Every row must be exactly as wide as the header
    let mut csv_reader = builder
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    // Parse headers into columns
    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.clone(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.trim().to_string(), i))
        .collect();

    if columns.is_empty() || columns.iter().all(|c| c.name.is_empty()) {
        return Err(Error::Parse {
            path,
            message: "no header row found".to_string(),
        });
    }

    // Parse rows
    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        let cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();
        rows.push(Row::new(cells));
    }

    Ok(Table {
        columns,
        rows,
        source_path: path,
    })
}

/// Collapse runs of whitespace into single spaces and drop blank lines
fn normalize_whitespace(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        let mut fields = line.split_whitespace().peekable();
        if fields.peek().is_none() {
            continue;
        }
        for (i, field) in fields.enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(field);
        }
        out.push('\n');
    }
    out
}

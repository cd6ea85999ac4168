//! Column-wise merge of per-observable tables

use crate::config::{Domain, ObservableSpec};
use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All observables of one domain side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTable {
    /// Domain the measurements belong to
    pub domain: Domain,
    /// Anchor columns followed by value/error pairs
    pub columns: Vec<Column>,
    /// Merged rows, in anchor order
    pub rows: Vec<Row>,
    /// Files that contributed to this table, in merge order
    pub sources: Vec<PathBuf>,
}

impl MergedTable {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get a cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.find_column(column)?;
        self.rows.get(row).and_then(|r| r.get(col.index))
    }
}

/// A measurement table paired with the observable it holds
#[derive(Debug, Clone)]
pub struct ObservableTable {
    pub spec: ObservableSpec,
    pub table: Table,
}

impl ObservableTable {
    /// Rename the generic `error` column to `<name>_error`
    pub fn new(spec: ObservableSpec, mut table: Table) -> Result<Self> {
        table.rename_column("error", &spec.error_column())?;
        Ok(Self { spec, table })
    }
}

/// Merge the observables of one domain, anchored on the first table
///
/// The anchor contributes every column. Each further table contributes
/// only its value and error columns; its remaining columns are treated as
/// index columns and must match the anchor row for row.
pub fn merge_domain(domain: Domain, tables: &[ObservableTable]) -> Result<MergedTable> {
    let (anchor, rest) = tables
        .split_first()
        .ok_or_else(|| Error::EmptyDomain(domain.to_string()))?;

    anchor.table.require_column(&anchor.spec.error_column())?;

    let mut columns: Vec<Column> = anchor.table.columns.clone();
    let mut rows: Vec<Row> = anchor.table.rows.clone();
    let mut sources = vec![anchor.table.source_path.clone()];

    for other in rest {
        let value_idx = other.table.require_column(&other.spec.name)?.index;
        let error_idx = other.table.require_column(&other.spec.error_column())?.index;

        check_alignment(&anchor.table, &other.table, &[value_idx, error_idx])?;

        for (idx, name) in [
            (value_idx, other.spec.name.clone()),
            (error_idx, other.spec.error_column()),
        ] {
            if columns.iter().any(|c| c.name == name) {
                return Err(Error::DuplicateColumn {
                    column: name,
                    path: other.table.source_path.clone(),
                });
            }
            columns.push(Column::new(name, columns.len()));
            for (row, source) in rows.iter_mut().zip(&other.table.rows) {
                row.cells
                    .push(source.get(idx).cloned().unwrap_or(CellValue::Empty));
            }
        }

        sources.push(other.table.source_path.clone());
    }

    info!(
        "merged {} {} tables ({} columns, {} rows)",
        sources.len(),
        domain,
        columns.len(),
        rows.len()
    );

    Ok(MergedTable {
        domain,
        columns,
        rows,
        sources,
    })
}

/// Fail unless `other` has the anchor's row count and index values
fn check_alignment(anchor: &Table, other: &Table, data_columns: &[usize]) -> Result<()> {
    if other.row_count() != anchor.row_count() {
        return Err(Error::RowCountMismatch {
            expected: anchor.row_count(),
            found: other.row_count(),
            path: other.source_path.clone(),
        });
    }

    for column in other
        .columns
        .iter()
        .filter(|c| !data_columns.contains(&c.index))
    {
        let anchor_col = anchor
            .find_column(&column.name)
            .ok_or_else(|| Error::MissingColumn {
                column: column.name.clone(),
                path: anchor.source_path.clone(),
            })?;

        let pairs = anchor
            .column_values(anchor_col.index)
            .zip(other.column_values(column.index));
        for (row, (expected, found)) in pairs.enumerate() {
            if expected != found {
                return Err(Error::IndexMismatch {
                    column: column.name.clone(),
                    row,
                    expected: expected.to_string(),
                    found: found.to_string(),
                    path: other.source_path.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stats_str;

    fn observable(name: &str, text: &str) -> ObservableTable {
        let table = parse_stats_str(text, &format!("{}_position_stats.out", name)).unwrap();
        ObservableTable::new(ObservableSpec::new(name), table).unwrap()
    }

    fn five_tables() -> Vec<ObservableTable> {
        vec![
            observable("DenDen", "r DenDen error\n0 1.0 0.1\n1 0.5 0.2\n2 0.25 0.3\n"),
            observable("Greens", "r Greens error\n0 2.0 0.4\n1 1.5 0.5\n2 1.25 0.6\n"),
            observable("PairGreens", "r PairGreens error\n0 3.0 0.7\n1 2.5 0.8\n2 2.25 0.9\n"),
            observable("PhononGreens", "r PhononGreens error\n0 4.0 1.0\n1 3.5 1.1\n2 3.25 1.2\n"),
            observable("SpinSpin", "r SpinSpin error\n0 5.0 1.3\n1 4.5 1.4\n2 4.25 1.5\n"),
        ]
    }

    #[test]
    fn test_merge_column_layout() {
        let merged = merge_domain(Domain::Position, &five_tables()).unwrap();

        assert_eq!(merged.row_count(), 3);
        assert_eq!(merged.column_count(), 3 + 4 * 2);
        assert_eq!(
            merged.column_names(),
            vec![
                "r",
                "DenDen",
                "DenDen_error",
                "Greens",
                "Greens_error",
                "PairGreens",
                "PairGreens_error",
                "PhononGreens",
                "PhononGreens_error",
                "SpinSpin",
                "SpinSpin_error",
            ]
        );
        assert!(merged.find_column("error").is_none());
        for (i, col) in merged.columns.iter().enumerate() {
            assert_eq!(col.index, i);
        }
    }

    #[test]
    fn test_merge_values_follow_rows() {
        let merged = merge_domain(Domain::Position, &five_tables()).unwrap();

        assert_eq!(merged.get(1, "Greens"), Some(&CellValue::Float(1.5)));
        assert_eq!(merged.get(2, "SpinSpin_error"), Some(&CellValue::Float(1.5)));
        assert_eq!(merged.get(0, "r"), Some(&CellValue::Integer(0)));
        assert_eq!(merged.sources.len(), 5);
    }

    #[test]
    fn test_anchor_value_column_name_preserved() {
        let mut tables = five_tables();
        tables[0] = observable("DenDen", "r nn error\n0 1.0 0.1\n1 0.5 0.2\n2 0.25 0.3\n");

        let merged = merge_domain(Domain::Position, &tables).unwrap();
        assert_eq!(merged.columns[1].name, "nn");
        assert_eq!(merged.columns[2].name, "DenDen_error");
    }

    #[test]
    fn test_row_count_mismatch() {
        let mut tables = five_tables();
        tables[3] = observable("PhononGreens", "r PhononGreens error\n0 4.0 1.0\n1 3.5 1.1\n");

        let err = merge_domain(Domain::Position, &tables).unwrap_err();
        assert!(err.is_schema_error());
        assert!(matches!(
            err,
            Error::RowCountMismatch {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_index_mismatch() {
        let mut tables = five_tables();
        tables[2] = observable("PairGreens", "r PairGreens error\n0 3.0 0.7\n2 2.5 0.8\n1 2.25 0.9\n");

        match merge_domain(Domain::Position, &tables).unwrap_err() {
            Error::IndexMismatch { column, row, .. } => {
                assert_eq!(column, "r");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_value_column() {
        let mut tables = five_tables();
        tables[1] = observable("Greens", "r G error\n0 2.0 0.4\n1 1.5 0.5\n2 1.25 0.6\n");

        let err = merge_domain(Domain::Position, &tables).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "Greens"));
    }

    #[test]
    fn test_missing_error_column() {
        let table = parse_stats_str("r Greens err\n0 2.0 0.4\n", "Greens_position_stats.out").unwrap();
        let err = ObservableTable::new(ObservableSpec::new("Greens"), table).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_value_column_clashing_with_anchor() {
        let mut tables = five_tables();
        tables[0] = observable(
            "DenDen",
            "r DenDen Greens error\n0 1.0 9.0 0.1\n1 0.5 9.0 0.2\n2 0.25 9.0 0.3\n",
        );

        let err = merge_domain(Domain::Position, &tables).unwrap_err();
        assert!(err.is_schema_error());
        assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "Greens"));
    }

    #[test]
    fn test_repeated_observable_rejected() {
        let mut tables = five_tables();
        tables[4] = observable("Greens", "r Greens error\n0 2.0 0.4\n1 1.5 0.5\n2 1.25 0.6\n");

        let err = merge_domain(Domain::Position, &tables).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn { ref column, .. } if column == "Greens"));
    }

    #[test]
    fn test_empty_domain() {
        let err = merge_domain(Domain::Momentum, &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyDomain(ref d) if d == "momentum"));
    }

    #[test]
    fn test_single_table() {
        let tables = vec![observable("DenDen", "r DenDen error\n0 1.0 0.1\n")];
        let merged = merge_domain(Domain::Position, &tables).unwrap();

        assert_eq!(merged.column_names(), vec!["r", "DenDen", "DenDen_error"]);
        assert_eq!(merged.row_count(), 1);
    }
}

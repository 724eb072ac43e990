//! Immutable tabular dataset backing one analysis call.
//!
//! A `Dataset` is a set of named columns with 1:1 row correspondence, parsed
//! once from an uploaded CSV snapshot and never mutated afterwards. The engine
//! holds a read reference for the duration of one analysis; group samples are
//! derived per KPI per call and never cached.
//!
//! Column typing follows the ingestion rule of the upload endpoint: a column
//! is numeric when it has at least one non-empty cell and every non-empty cell
//! parses as a finite number. Empty cells are missing values; how a missing
//! KPI cell is handled is an engine policy (see `partition`), not a dataset
//! concern.

use std::collections::HashMap;

use crate::errors::ExperimentError;

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Text,
}

/// One named column. Cells are stored as raw strings; `None` marks a missing
/// (empty) cell.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    ty: ColumnType,
    cells: Vec<Option<String>>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw cell value; `None` for a missing cell.
    pub fn cell(&self, row: usize) -> Option<&str> {
        self.cells.get(row).and_then(|c| c.as_deref())
    }
}

/// Parse a cell the way the engines coerce KPI values: anything that does not
/// parse as a finite number counts as 0.
pub fn coerce_numeric(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Errors from building a dataset out of raw CSV text.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV parse error: {0}")]
    Csv(String),

    #[error("CSV has no columns")]
    NoColumns,

    #[error("Duplicate column name: '{0}'")]
    DuplicateColumn(String),
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// An immutable table of named columns.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl Dataset {
    /// Parse a CSV snapshot (header row required) into a typed dataset.
    pub fn from_csv_str(csv_text: &str) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(DatasetError::NoColumns);
        }

        let mut index = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut rows = 0usize;
        for record in reader.records() {
            let record = record?;
            for (i, col) in cells.iter_mut().enumerate() {
                let raw = record.get(i).unwrap_or("").trim();
                col.push(if raw.is_empty() {
                    None
                } else {
                    Some(raw.to_string())
                });
            }
            rows += 1;
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| {
                let ty = infer_type(&cells);
                Column { name, ty, cells }
            })
            .collect();

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Number of rows (identical across columns).
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Look up a column by name, erroring with the offending name.
    pub fn require_column(&self, name: &str) -> Result<&Column, ExperimentError> {
        self.column(name)
            .ok_or_else(|| ExperimentError::MissingColumn(name.to_string()))
    }

    /// Names of all columns, in file order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Names of the numeric columns, in file order. These are the KPI
    /// candidates offered to clients after an upload.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.ty == ColumnType::Numeric)
            .map(|c| c.name.clone())
            .collect()
    }
}

fn infer_type(cells: &[Option<String>]) -> ColumnType {
    let mut saw_value = false;
    for cell in cells.iter().flatten() {
        saw_value = true;
        match cell.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => {}
            _ => return ColumnType::Text,
        }
    }
    if saw_value {
        ColumnType::Numeric
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Variant,Revenue,Country,Sessions
Control,10.5,US,3
Variant A,12.0,DE,
Control,,US,5
Variant A,9.25,FR,2
";

    #[test]
    fn test_parse_shape() {
        let ds = Dataset::from_csv_str(CSV).unwrap();
        assert_eq!(ds.row_count(), 4);
        assert_eq!(ds.column_names().count(), 4);
        assert!(ds.column("Revenue").is_some());
        assert!(ds.column("revenue").is_none()); // names are case-sensitive
    }

    #[test]
    fn test_type_inference() {
        let ds = Dataset::from_csv_str(CSV).unwrap();
        assert_eq!(
            ds.column("Revenue").unwrap().column_type(),
            ColumnType::Numeric
        );
        // Missing cells do not break numeric inference
        assert_eq!(
            ds.column("Sessions").unwrap().column_type(),
            ColumnType::Numeric
        );
        assert_eq!(
            ds.column("Country").unwrap().column_type(),
            ColumnType::Text
        );
        assert_eq!(ds.numeric_columns(), vec!["Revenue", "Sessions"]);
    }

    #[test]
    fn test_single_bad_cell_disqualifies_kpi() {
        let ds = Dataset::from_csv_str("A,B\n1,2\nx,3\n").unwrap();
        assert_eq!(ds.numeric_columns(), vec!["B"]);
    }

    #[test]
    fn test_all_empty_column_is_text() {
        let ds = Dataset::from_csv_str("A,B\n1,\n2,\n").unwrap();
        assert_eq!(ds.numeric_columns(), vec!["A"]);
    }

    #[test]
    fn test_missing_cells() {
        let ds = Dataset::from_csv_str(CSV).unwrap();
        let revenue = ds.column("Revenue").unwrap();
        assert_eq!(revenue.cell(0), Some("10.5"));
        assert_eq!(revenue.cell(2), None);
        assert_eq!(revenue.cell(99), None);
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric("3.5"), 3.5);
        assert_eq!(coerce_numeric(" 7 "), 7.0);
        assert_eq!(coerce_numeric("n/a"), 0.0);
        // Non-finite parses coerce to zero as well
        assert_eq!(coerce_numeric("NaN"), 0.0);
        assert_eq!(coerce_numeric("inf"), 0.0);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Dataset::from_csv_str("A,A\n1,2\n").unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateColumn(name) if name == "A"));
    }

    #[test]
    fn test_missing_column_error_names_column() {
        let ds = Dataset::from_csv_str(CSV).unwrap();
        let err = ds.require_column("Clicks").unwrap_err();
        assert_eq!(err, ExperimentError::MissingColumn("Clicks".to_string()));
    }

    #[test]
    fn test_headers_only_is_valid_but_empty() {
        let ds = Dataset::from_csv_str("A,B\n").unwrap();
        assert_eq!(ds.row_count(), 0);
    }
}

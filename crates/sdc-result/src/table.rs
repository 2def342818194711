//! A protected table as written by the engine.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use polars::prelude::*;
use sdc_model::Table;
use tracing::debug;

use crate::error::{Result, ResultError};
use crate::status::{CellStatus, decode_status};

/// Numeric status column in engine output.
pub const STATUS_COLUMN: &str = "Status";
/// Replaces suppressed values unless another marker is given.
pub const DEFAULT_MARKER: &str = "x";

#[derive(Debug, Clone)]
pub struct TableResult {
    frame: DataFrame,
    index: Vec<String>,
    response: String,
}

impl TableResult {
    /// Wraps a frame holding the index columns, the response and `Status`.
    pub fn new(frame: DataFrame, index: Vec<String>, response: impl Into<String>) -> Result<Self> {
        let response = response.into();
        for column in index.iter().chain([&response]) {
            require(&frame, column)?;
        }
        require(&frame, STATUS_COLUMN)?;
        Ok(Self {
            frame,
            index,
            response,
        })
    }

    /// Reads engine output. Index columns are kept as text so codes such
    /// as `01` survive.
    pub fn read_csv<S: AsRef<str>>(path: &Path, index: &[S], response: &str) -> Result<Self> {
        let read_error = |source| ResultError::Read {
            path: path.to_path_buf(),
            source,
        };
        let schema: Schema = index
            .iter()
            .map(|name| (PlSmallStr::from(name.as_ref()), DataType::String))
            .collect();
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_schema_overwrite(Some(Arc::new(schema)))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(read_error)?
            .finish()
            .map_err(read_error)?;
        debug!(path = %path.display(), rows = frame.height(), "read table result");
        let index = index.iter().map(|name| name.as_ref().to_string()).collect();
        Self::new(frame, index, response)
    }

    /// Reads the output file of a table that has been through a job.
    pub fn for_table(table: &Table) -> Result<Self> {
        let path = table
            .output_path
            .as_deref()
            .ok_or(ResultError::NoOutputPath)?;
        Self::read_csv(path, table.explanatory.as_slice(), table.result_column())
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Decoded status per cell. Missing or non-numeric codes are unknown.
    pub fn statuses(&self) -> Result<Vec<CellStatus>> {
        let codes = self
            .frame
            .column(STATUS_COLUMN)?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        Ok(codes
            .i64()?
            .into_iter()
            .map(|code| code.map_or(CellStatus::Unknown, decode_status))
            .collect())
    }

    /// Status letters as a `status` series.
    pub fn status_series(&self) -> Result<Series> {
        let letters: Vec<&str> = self
            .statuses()?
            .into_iter()
            .map(CellStatus::letter)
            .collect();
        Ok(Series::new("status".into(), letters))
    }

    /// The response exactly as the engine wrote it.
    pub fn raw_values(&self) -> Result<Series> {
        Ok(self
            .frame
            .column(&self.response)?
            .as_materialized_series()
            .clone())
    }

    /// Response values as text with suppressed cells replaced by `marker`.
    /// The underlying frame is not touched.
    pub fn masked_values(&self, marker: &str) -> Result<Series> {
        let raw = self.raw_values()?;
        let statuses = self.statuses()?;
        let values: Vec<String> = statuses
            .iter()
            .enumerate()
            .map(|(row, status)| {
                if status.is_suppressed() {
                    marker.to_string()
                } else {
                    value_to_string(raw.get(row).unwrap_or(AnyValue::Null))
                }
            })
            .collect();
        Ok(Series::new(self.response.as_str().into(), values))
    }

    /// Number of cells per status, in [`CellStatus::ALL`] order.
    pub fn status_counts(&self) -> Result<Vec<(CellStatus, usize)>> {
        let statuses = self.statuses()?;
        Ok(CellStatus::ALL
            .iter()
            .map(|status| {
                let count = statuses.iter().filter(|s| *s == status).count();
                (*status, count)
            })
            .collect())
    }

    /// Index columns followed by `safe`, `status` and `unsafe`.
    pub fn to_dataframe(&self, marker: &str) -> Result<DataFrame> {
        let mut columns: Vec<Column> = self
            .index
            .iter()
            .map(|name| self.frame.column(name).cloned())
            .collect::<PolarsResult<_>>()?;
        columns.push(
            self.masked_values(marker)?
                .with_name("safe".into())
                .into_column(),
        );
        columns.push(self.status_series()?.into_column());
        columns.push(self.raw_values()?.with_name("unsafe".into()).into_column());
        Ok(DataFrame::new(columns)?)
    }
}

impl fmt::Display for TableResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response: {}", self.response)?;
        if let Ok(frame) = self.to_dataframe(DEFAULT_MARKER) {
            write!(f, "\n{frame}")?;
        }
        Ok(())
    }
}

fn require(frame: &DataFrame, column: &str) -> Result<()> {
    if frame.get_column_names().iter().any(|name| name.as_str() == column) {
        Ok(())
    } else {
        Err(ResultError::MissingColumn {
            column: column.to_string(),
        })
    }
}

fn value_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Float32(v) => format_float(f64::from(v)),
        AnyValue::Float64(v) => format_float(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> TableResult {
        let frame = df! {
            "region" => ["A", "B", "North", "Total"],
            "amount" => [40.0, 25.5, 65.5, 65.5],
            "Status" => [1, 9, 11, 10],
        }
        .unwrap();
        TableResult::new(frame, vec!["region".into()], "amount").unwrap()
    }

    #[test]
    fn missing_columns_are_reported() {
        let frame = df! { "region" => ["A"], "amount" => [1.0] }.unwrap();
        let err = TableResult::new(frame, vec!["region".into()], "amount").unwrap_err();
        assert!(matches!(err, ResultError::MissingColumn { column } if column == "Status"));
    }

    #[test]
    fn masks_unsafe_and_secondary_cells() {
        let masked = result().masked_values("x").unwrap();
        let values: Vec<Option<&str>> = masked.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("40"), Some("x"), Some("x"), Some("65.5")]);
    }

    #[test]
    fn counts_per_status() {
        let counts = result().status_counts().unwrap();
        assert_eq!(counts[0], (CellStatus::Safe, 1));
        assert_eq!(counts[1], (CellStatus::Unsafe, 1));
        assert_eq!(counts[2], (CellStatus::Protected, 1));
        assert_eq!(counts[3], (CellStatus::SecondaryUnsafe, 1));
        assert_eq!(counts[5], (CellStatus::Unknown, 0));
    }

    #[test]
    fn null_status_is_unknown() {
        let frame = df! {
            "region" => ["A", "B"],
            "amount" => [1.0, 2.0],
            "Status" => [Some(1), None],
        }
        .unwrap();
        let result = TableResult::new(frame, vec!["region".into()], "amount").unwrap();
        assert_eq!(
            result.statuses().unwrap(),
            vec![CellStatus::Safe, CellStatus::Unknown]
        );
    }
}

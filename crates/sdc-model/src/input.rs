//! Input data handed to the engine: a frame plus column metadata and roles.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use sdc_hierarchy::{CodeList, Hierarchy};
use tracing::debug;

use crate::column::InputColumn;
use crate::error::{ModelError, Result};
use crate::table::Table;

pub const DEFAULT_REQUEST_VALUES: [&str; 2] = ["1", "2"];

/// Role columns of individual-level records.
#[derive(Debug, Clone, PartialEq)]
pub struct MicrodataRoles {
    pub weight: Option<String>,
    pub request: Option<String>,
    pub request_values: Vec<String>,
    pub holding: Option<String>,
}

impl Default for MicrodataRoles {
    fn default() -> Self {
        Self {
            weight: None,
            request: None,
            request_values: DEFAULT_REQUEST_VALUES.map(str::to_string).to_vec(),
            holding: None,
        }
    }
}

/// Role columns of already aggregated data, plus the table it forms.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRoles {
    pub table: Table,
    pub frequency: Option<String>,
    pub top_contributors: Vec<String>,
    pub lower_protection_level: Option<String>,
    pub upper_protection_level: Option<String>,
    pub status_indicator: Option<String>,
    pub status_markers: Vec<(String, String)>,
}

impl TabularRoles {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            frequency: None,
            top_contributors: Vec::new(),
            lower_protection_level: None,
            upper_protection_level: None,
            status_indicator: None,
            status_markers: default_status_markers(),
        }
    }
}

pub fn default_status_markers() -> Vec<(String, String)> {
    [("SAFE", "S"), ("UNSAFE", "U"), ("PROTECT", "P")]
        .into_iter()
        .map(|(status, marker)| (status.to_string(), marker.to_string()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Microdata(MicrodataRoles),
    Tabular(Box<TabularRoles>),
}

#[derive(Debug, Clone)]
pub struct InputData {
    frame: DataFrame,
    columns: Vec<InputColumn>,
    kind: InputKind,
    pub separator: u8,
    data_path: Option<PathBuf>,
    metadata_path: Option<PathBuf>,
}

impl InputData {
    pub fn microdata(frame: DataFrame) -> Self {
        Self::from_frame(frame, InputKind::Microdata(MicrodataRoles::default()))
    }

    pub fn tabular(frame: DataFrame, table: Table) -> Self {
        Self::from_frame(frame, InputKind::Tabular(Box::new(TabularRoles::new(table))))
    }

    fn from_frame(frame: DataFrame, kind: InputKind) -> Self {
        let columns = frame
            .get_columns()
            .iter()
            .map(InputColumn::from_column)
            .collect();
        Self {
            frame,
            columns,
            kind,
            separator: b',',
            data_path: None,
            metadata_path: None,
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn kind(&self) -> &InputKind {
        &self.kind
    }

    pub fn is_microdata(&self) -> bool {
        matches!(self.kind, InputKind::Microdata(_))
    }

    /// Name used in default file names.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            InputKind::Microdata(_) => "microdata",
            InputKind::Tabular(_) => "tabledata",
        }
    }

    pub fn microdata_roles(&self) -> Option<&MicrodataRoles> {
        match &self.kind {
            InputKind::Microdata(roles) => Some(roles),
            InputKind::Tabular(_) => None,
        }
    }

    pub fn tabular_roles(&self) -> Option<&TabularRoles> {
        match &self.kind {
            InputKind::Tabular(roles) => Some(roles),
            InputKind::Microdata(_) => None,
        }
    }

    /// The table formed by aggregated input, if any.
    pub fn table(&self) -> Option<&Table> {
        self.tabular_roles().map(|roles| &roles.table)
    }

    pub fn table_mut(&mut self) -> Option<&mut Table> {
        match &mut self.kind {
            InputKind::Tabular(roles) => Some(&mut roles.table),
            InputKind::Microdata(_) => None,
        }
    }

    pub fn columns(&self) -> &[InputColumn] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [InputColumn] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&InputColumn> {
        self.columns.iter().find(|column| column.name() == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut InputColumn> {
        self.columns.iter_mut().find(|column| column.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    fn require(&mut self, name: &str) -> Result<&mut InputColumn> {
        self.column_mut(name)
            .ok_or_else(|| ModelError::unknown_column(name))
    }

    fn existing(&self, name: &str) -> Result<String> {
        if self.contains(name) {
            Ok(name.to_string())
        } else {
            Err(ModelError::unknown_column(name))
        }
    }

    pub fn set_hierarchy(&mut self, column: &str, hierarchy: Hierarchy) -> Result<()> {
        self.require(column)?.set_hierarchy(hierarchy);
        Ok(())
    }

    pub fn set_codelist(&mut self, column: &str, codelist: CodeList) -> Result<()> {
        self.require(column)?.set_codelist(Some(codelist));
        Ok(())
    }

    pub fn set_total_code(&mut self, column: &str, code: impl Into<String>) -> Result<()> {
        self.require(column)?.set_total_code(code);
        Ok(())
    }

    pub fn set_length(&mut self, column: &str, length: usize) -> Result<()> {
        self.require(column)?.set_length(Some(length));
        Ok(())
    }

    fn microdata_roles_mut(&mut self, role: &'static str) -> Result<&mut MicrodataRoles> {
        match &mut self.kind {
            InputKind::Microdata(roles) => Ok(roles),
            InputKind::Tabular(_) => Err(ModelError::RoleNotSupported {
                role,
                kind: "tabledata",
            }),
        }
    }

    fn tabular_roles_mut(&mut self, role: &'static str) -> Result<&mut TabularRoles> {
        match &mut self.kind {
            InputKind::Tabular(roles) => Ok(roles),
            InputKind::Microdata(_) => Err(ModelError::RoleNotSupported {
                role,
                kind: "microdata",
            }),
        }
    }

    pub fn set_weight(&mut self, column: &str) -> Result<()> {
        let column = self.existing(column)?;
        self.microdata_roles_mut("weight")?.weight = Some(column);
        Ok(())
    }

    /// Marks the column that holds protection requests. Empty `values`
    /// keeps the default `"1" "2"`.
    pub fn set_request(&mut self, column: &str, values: Vec<String>) -> Result<()> {
        let column = self.existing(column)?;
        let roles = self.microdata_roles_mut("request")?;
        roles.request = Some(column);
        if !values.is_empty() {
            roles.request_values = values;
        }
        Ok(())
    }

    pub fn set_holding(&mut self, column: &str) -> Result<()> {
        let column = self.existing(column)?;
        self.microdata_roles_mut("holding")?.holding = Some(column);
        Ok(())
    }

    pub fn set_frequency(&mut self, column: &str) -> Result<()> {
        let column = self.existing(column)?;
        self.tabular_roles_mut("frequency")?.frequency = Some(column);
        Ok(())
    }

    /// Top contributor columns, largest contribution first.
    pub fn set_top_contributors<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<()> {
        let columns = columns
            .iter()
            .map(|column| self.existing(column.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.tabular_roles_mut("top contributors")?.top_contributors = columns;
        Ok(())
    }

    pub fn set_lower_protection_level(&mut self, column: &str) -> Result<()> {
        let column = self.existing(column)?;
        self.tabular_roles_mut("lower protection level")?
            .lower_protection_level = Some(column);
        Ok(())
    }

    pub fn set_upper_protection_level(&mut self, column: &str) -> Result<()> {
        let column = self.existing(column)?;
        self.tabular_roles_mut("upper protection level")?
            .upper_protection_level = Some(column);
        Ok(())
    }

    /// Marks the status column. `markers` replaces the default vocabulary
    /// when given.
    pub fn set_status_indicator(
        &mut self,
        column: &str,
        markers: Option<Vec<(String, String)>>,
    ) -> Result<()> {
        let column = self.existing(column)?;
        let roles = self.tabular_roles_mut("status indicator")?;
        roles.status_indicator = Some(column);
        if let Some(markers) = markers {
            roles.status_markers = markers;
        }
        Ok(())
    }

    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    /// Points at an existing data file; setup will not write one.
    pub fn set_data_path(&mut self, path: impl Into<PathBuf>) {
        self.data_path = Some(path.into());
    }

    pub fn metadata_path(&self) -> Option<&Path> {
        self.metadata_path.as_deref()
    }

    /// Points at an existing metadata file; setup will not write one.
    pub fn set_metadata_path(&mut self, path: impl Into<PathBuf>) {
        self.metadata_path = Some(path.into());
    }

    /// Data in the engine's format: no header, empty nulls, booleans as 0/1.
    pub fn engine_frame(&self) -> Result<DataFrame> {
        let casts: Vec<Expr> = self
            .frame
            .get_columns()
            .iter()
            .filter(|column| column.dtype() == &DataType::Boolean)
            .map(|column| col(column.name().clone()).cast(DataType::Int32))
            .collect();
        if casts.is_empty() {
            return Ok(self.frame.clone());
        }
        Ok(self.frame.clone().lazy().with_columns(casts).collect()?)
    }

    pub fn write_data(&mut self, path: &Path) -> Result<()> {
        let mut frame = self.engine_frame()?;
        let file = File::create(path).map_err(|e| ModelError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        CsvWriter::new(&mut writer)
            .include_header(false)
            .with_separator(self.separator)
            .with_null_value(String::new())
            .finish(&mut frame)
            .map_err(|source| ModelError::Frame {
                path: path.to_path_buf(),
                source,
            })?;
        writer.flush().map_err(|e| ModelError::io(path, e))?;
        debug!(path = %path.display(), rows = frame.height(), "wrote input data");
        self.data_path = Some(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> DataFrame {
        df! {
            "region" => ["A", "B", "A"],
            "amount" => [10.5, 20.0, 7.25],
            "weight" => [1, 2, 1],
            "flag" => [true, false, true],
        }
        .unwrap()
    }

    #[test]
    fn columns_follow_frame_order() {
        let input = InputData::microdata(survey());
        let names: Vec<&str> = input.columns().iter().map(InputColumn::name).collect();
        assert_eq!(names, vec!["region", "amount", "weight", "flag"]);
        assert_eq!(input.kind_name(), "microdata");
    }

    #[test]
    fn role_columns_must_exist() {
        let mut input = InputData::microdata(survey());
        input.set_weight("weight").unwrap();
        let err = input.set_holding("company").unwrap_err();
        assert!(matches!(err, ModelError::UnknownColumn { column } if column == "company"));
        assert_eq!(
            input.microdata_roles().and_then(|roles| roles.weight.as_deref()),
            Some("weight")
        );
    }

    #[test]
    fn tabular_roles_rejected_for_microdata() {
        let mut input = InputData::microdata(survey());
        let err = input.set_frequency("weight").unwrap_err();
        assert!(matches!(err, ModelError::RoleNotSupported { .. }));
    }

    #[test]
    fn writes_headerless_csv_with_numeric_booleans() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.csv");
        let mut input = InputData::microdata(survey());
        input.write_data(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(first, "A,10.5,1,1");
        assert_eq!(text.lines().count(), 3);
        assert_eq!(input.data_path(), Some(path.as_path()));
    }
}

//! Per-column metadata.

use std::cell::Cell;

use polars::prelude::*;
use sdc_hierarchy::{CodeList, Hierarchy};

use crate::error::{ModelError, Result};

pub const DEFAULT_DECIMALS: u32 = 15;
pub const DEFAULT_CODE_LENGTH: usize = 20;

/// What kind of values a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Fractional,
    Boolean,
    Text,
}

impl ValueKind {
    pub fn from_dtype(dtype: &DataType) -> Self {
        match dtype {
            DataType::Boolean => Self::Boolean,
            DataType::Float32 | DataType::Float64 => Self::Fractional,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Self::Integer,
            _ => Self::Text,
        }
    }

    /// Booleans are written as 0/1 and count as numeric.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Text)
    }
}

#[derive(Debug, Clone)]
pub struct InputColumn {
    name: String,
    kind: ValueKind,
    decimals: u32,
    hierarchy: Hierarchy,
    codelist: Option<CodeList>,
    explicit_total: bool,
    length_override: Option<usize>,
    value_length: Option<usize>,
    resolved_length: Cell<Option<usize>>,
    missing: Vec<String>,
}

impl InputColumn {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            decimals: DEFAULT_DECIMALS,
            hierarchy: Hierarchy::default(),
            codelist: None,
            explicit_total: false,
            length_override: None,
            value_length: None,
            resolved_length: Cell::new(None),
            missing: Vec::new(),
        }
    }

    /// Describes a frame column, measuring the longest text value.
    pub fn from_column(column: &Column) -> Self {
        let mut input = Self::new(column.name().as_str(), ValueKind::from_dtype(column.dtype()));
        if let Ok(values) = column.as_materialized_series().str() {
            input.value_length = values
                .into_iter()
                .flatten()
                .map(|value| value.chars().count())
                .max();
        }
        input
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    /// Decimal places, only meaningful for fractional columns.
    pub fn decimals(&self) -> Option<u32> {
        (self.kind == ValueKind::Fractional).then_some(self.decimals)
    }

    pub fn set_decimals(&mut self, decimals: u32) -> Result<()> {
        if !self.is_numeric() {
            return Err(ModelError::NotNumeric {
                column: self.name.clone(),
            });
        }
        self.decimals = decimals;
        Ok(())
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Mutable access to the hierarchy; the cached length is dropped.
    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        self.invalidate_length();
        &mut self.hierarchy
    }

    pub fn set_hierarchy(&mut self, hierarchy: Hierarchy) {
        // An explicit total code survives a hierarchy change.
        let total = self.explicit_total.then(|| self.hierarchy.total_code().to_string());
        self.hierarchy = hierarchy;
        if let Some(total) = total {
            self.hierarchy.set_total_code(total);
        }
        self.invalidate_length();
    }

    pub fn total_code(&self) -> &str {
        self.hierarchy.total_code()
    }

    pub fn set_total_code(&mut self, code: impl Into<String>) {
        self.hierarchy.set_total_code(code);
        self.explicit_total = true;
    }

    /// A column can be recoded when it has a hierarchy or an explicit total.
    pub fn is_recodable(&self) -> bool {
        self.hierarchy.is_hierarchical() || self.explicit_total
    }

    pub fn codelist(&self) -> Option<&CodeList> {
        self.codelist.as_ref()
    }

    pub fn codelist_mut(&mut self) -> Option<&mut CodeList> {
        self.invalidate_length();
        self.codelist.as_mut()
    }

    pub fn set_codelist(&mut self, codelist: Option<CodeList>) {
        self.codelist = codelist;
        self.invalidate_length();
    }

    pub fn set_length(&mut self, length: Option<usize>) {
        self.length_override = length;
        self.invalidate_length();
    }

    pub fn explicit_length(&self) -> Option<usize> {
        self.length_override
    }

    /// Code width, resolved on first use and cached.
    pub fn length(&self) -> usize {
        if let Some(length) = self.resolved_length.get() {
            return length;
        }
        let length = self
            .length_override
            .or_else(|| self.hierarchy.code_length())
            .or_else(|| self.codelist.as_ref().map(CodeList::code_length))
            .or(self.value_length)
            .unwrap_or(match self.kind {
                ValueKind::Boolean => 1,
                _ => DEFAULT_CODE_LENGTH,
            });
        self.resolved_length.set(Some(length));
        length
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn add_missing(&mut self, marker: impl Into<String>) {
        let marker = marker.into();
        if !self.missing.contains(&marker) {
            self.missing.push(marker);
        }
    }

    pub fn set_missing<I, S>(&mut self, markers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.clear();
        for marker in markers {
            self.add_missing(marker);
        }
    }

    fn invalidate_length(&self) {
        self.resolved_length.set(None);
    }

    /// Header and property lines of this column; role markers are added by
    /// the owning input data.
    pub fn metadata_lines(&self, include_length: bool) -> Result<Vec<String>> {
        let mut header = vec![self.name.clone()];
        if include_length {
            header.push(self.length().to_string());
        }
        if !self.missing.is_empty() {
            header.push(self.missing.join(" "));
        }
        let mut lines = vec![header.join(" ")];

        if self.is_numeric() {
            lines.push("\t<NUMERIC>".to_string());
            if let Some(decimals) = self.decimals() {
                lines.push(format!("\t<DECIMALS> {decimals}"));
            }
        }

        if self.is_recodable() {
            lines.push("\t<RECODABLE>".to_string());
            lines.push(format!("\t<TOTCODE> {}", self.total_code()));
            match &self.hierarchy {
                Hierarchy::Flat(_) => {}
                Hierarchy::Level(level) => {
                    let widths: Vec<String> =
                        level.widths().iter().map(u32::to_string).collect();
                    lines.push("\t<HIERARCHICAL>".to_string());
                    lines.push(format!("\t<HIERLEVELS> {}", widths.join(" ")));
                }
                Hierarchy::Tree(tree) => {
                    let path = tree.filepath().ok_or_else(|| ModelError::HierarchyWithoutFile {
                        column: self.name.clone(),
                    })?;
                    lines.push("\t<HIERARCHICAL>".to_string());
                    lines.push(format!("\t<HIERCODELIST> {}", path.display()));
                    lines.push(format!("\t<HIERLEADSTRING> {}", tree.indent));
                }
            }
        }

        if let Some(codelist) = &self.codelist {
            let path = codelist.filepath().ok_or_else(|| ModelError::CodelistWithoutFile {
                column: self.name.clone(),
            })?;
            lines.push(format!("\t<CODELIST> {}", path.display()));
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use sdc_hierarchy::TreeHierarchy;

    use super::*;

    #[test]
    fn kind_follows_dtype() {
        assert_eq!(ValueKind::from_dtype(&DataType::Float64), ValueKind::Fractional);
        assert_eq!(ValueKind::from_dtype(&DataType::UInt8), ValueKind::Integer);
        assert_eq!(ValueKind::from_dtype(&DataType::Boolean), ValueKind::Boolean);
        assert_eq!(ValueKind::from_dtype(&DataType::String), ValueKind::Text);
    }

    #[test]
    fn text_length_comes_from_values() {
        let column = Column::new("region".into(), &["A", "North", "B"]);
        let input = InputColumn::from_column(&column);
        assert_eq!(input.kind(), ValueKind::Text);
        assert_eq!(input.length(), 5);
    }

    #[test]
    fn length_resolution_order() {
        let mut column = InputColumn::new("sbi", ValueKind::Integer);
        assert_eq!(column.length(), DEFAULT_CODE_LENGTH);

        column.set_codelist(Some([("1", "A"), ("123", "B")].into_iter().collect()));
        assert_eq!(column.length(), 3);

        column.set_hierarchy(Hierarchy::levels(vec![1, 2, 2]).unwrap());
        assert_eq!(column.length(), 5);

        column.set_length(Some(8));
        assert_eq!(column.length(), 8);

        assert_eq!(InputColumn::new("flag", ValueKind::Boolean).length(), 1);
    }

    #[test]
    fn hierarchy_mut_drops_cached_length() {
        let mut column = InputColumn::new("region", ValueKind::Text);
        column.set_hierarchy(Hierarchy::tree(TreeHierarchy::new()));
        assert_eq!(column.length(), 0);
        if let Some(tree) = column.hierarchy_mut().as_tree_mut() {
            tree.create_node(["North", "Amsterdam"]).unwrap();
        }
        assert_eq!(column.length(), 9);
    }

    #[test]
    fn recodable_needs_hierarchy_or_total() {
        let mut column = InputColumn::new("size", ValueKind::Text);
        assert!(!column.is_recodable());
        column.set_total_code("All");
        assert!(column.is_recodable());
        column.set_hierarchy(Hierarchy::flat());
        assert_eq!(column.total_code(), "All");
    }

    #[test]
    fn decimals_only_for_fractions() {
        let mut integer = InputColumn::new("count", ValueKind::Integer);
        assert_eq!(integer.decimals(), None);
        integer.set_decimals(2).unwrap();
        assert_eq!(integer.decimals(), None);

        let mut text = InputColumn::new("name", ValueKind::Text);
        assert!(text.set_decimals(2).is_err());

        let fraction = InputColumn::new("income", ValueKind::Fractional);
        assert_eq!(fraction.decimals(), Some(DEFAULT_DECIMALS));
    }

    #[test]
    fn tree_without_file_cannot_be_described() {
        let mut column = InputColumn::new("region", ValueKind::Text);
        column.set_hierarchy(Hierarchy::tree(TreeHierarchy::new()));
        let err = column.metadata_lines(true).unwrap_err();
        assert!(matches!(err, ModelError::HierarchyWithoutFile { column } if column == "region"));
    }

    #[test]
    fn metadata_lines_in_fixed_order() {
        let mut column = InputColumn::new("income", ValueKind::Fractional);
        column.set_missing(["9999", "9998"]);
        column.set_hierarchy(Hierarchy::levels(vec![2, 2]).unwrap());
        column.set_total_code("T");
        assert_eq!(
            column.metadata_lines(true).unwrap(),
            vec![
                "income 4 9999 9998",
                "\t<NUMERIC>",
                "\t<DECIMALS> 15",
                "\t<RECODABLE>",
                "\t<TOTCODE> T",
                "\t<HIERARCHICAL>",
                "\t<HIERLEVELS> 2 2",
            ]
        );
    }
}

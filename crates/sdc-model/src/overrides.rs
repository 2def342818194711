//! Manual per-cell changes applied before suppression (a priori `.hst` files).
//!
//! Each line names a cell by its explanatory codes followed by the change:
//!
//! ```text
//! A,3,s
//! A,3,c,5
//! A,3,pl,20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::rules::format_number;

pub const DEFAULT_SEPARATOR: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideStatus {
    Safe,
    Unsafe,
    Protected,
}

impl OverrideStatus {
    pub fn letter(self) -> &'static str {
        match self {
            Self::Safe => "s",
            Self::Unsafe => "u",
            Self::Protected => "p",
        }
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.to_ascii_lowercase().as_str() {
            "s" => Some(Self::Safe),
            "u" => Some(Self::Unsafe),
            "p" => Some(Self::Protected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellChange {
    Status(OverrideStatus),
    Cost(f64),
    ProtectionLevel(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellOverride {
    pub cell: Vec<String>,
    pub change: CellChange,
}

#[derive(Debug, Clone)]
pub struct CellOverrides {
    changes: Vec<CellOverride>,
    pub separator: String,
    pub ignore_error: bool,
    pub expand_trivial: bool,
    filepath: Option<PathBuf>,
}

impl Default for CellOverrides {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            ignore_error: false,
            expand_trivial: true,
            filepath: None,
        }
    }
}

impl CellOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change_status<I, S>(&mut self, cell: I, status: OverrideStatus)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(cell, CellChange::Status(status));
    }

    pub fn change_cost<I, S>(&mut self, cell: I, cost: f64)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(cell, CellChange::Cost(cost));
    }

    pub fn change_protection_level<I, S>(&mut self, cell: I, level: f64)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(cell, CellChange::ProtectionLevel(level));
    }

    fn push<I, S>(&mut self, cell: I, change: CellChange)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changes.push(CellOverride {
            cell: cell.into_iter().map(Into::into).collect(),
            change,
        });
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CellOverride> {
        self.changes.iter()
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn set_filepath(&mut self, path: impl Into<PathBuf>) {
        self.filepath = Some(path.into());
    }

    pub fn to_hst(&self) -> String {
        let sep = self.separator.as_str();
        let mut text = String::new();
        for CellOverride { cell, change } in &self.changes {
            let mut fields: Vec<String> = cell.clone();
            match change {
                CellChange::Status(status) => fields.push(status.letter().to_string()),
                CellChange::Cost(cost) => {
                    fields.push("c".to_string());
                    fields.push(format_number(*cost));
                }
                CellChange::ProtectionLevel(level) => {
                    fields.push("pl".to_string());
                    fields.push(format_number(*level));
                }
            }
            text.push_str(&fields.join(sep));
            text.push('\n');
        }
        text
    }

    pub fn write_hst(&mut self, path: &Path) -> Result<()> {
        fs::write(path, self.to_hst()).map_err(|e| ModelError::io(path, e))?;
        debug!(path = %path.display(), changes = self.len(), "wrote a priori file");
        self.filepath = Some(path.to_path_buf());
        Ok(())
    }

    /// Parses `.hst` text. Change keywords are case-insensitive and fields
    /// are trimmed, so `A,3, S` is accepted.
    pub fn parse_hst(text: &str, separator: &str) -> Result<Self> {
        let mut overrides = CellOverrides {
            separator: separator.to_string(),
            ..Self::default()
        };
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let invalid = |message: &str| ModelError::InvalidOverride {
                line: index + 1,
                text: line.to_string(),
                message: message.to_string(),
            };
            let fields: Vec<&str> = line.split(separator).map(str::trim).collect();
            let Some((last, rest)) = fields.split_last() else {
                continue;
            };
            let (cell, change) = if let Some(status) = OverrideStatus::from_letter(last) {
                (rest, CellChange::Status(status))
            } else {
                let Some((keyword, cell)) = rest.split_last() else {
                    return Err(invalid("missing change keyword"));
                };
                let value: f64 = last
                    .parse()
                    .map_err(|_| invalid("expected a numeric value"))?;
                match keyword.to_ascii_lowercase().as_str() {
                    "c" => (cell, CellChange::Cost(value)),
                    "pl" => (cell, CellChange::ProtectionLevel(value)),
                    _ => return Err(invalid("expected s, u, p, c or pl")),
                }
            };
            if cell.is_empty() {
                return Err(invalid("no cell codes"));
            }
            overrides.changes.push(CellOverride {
                cell: cell.iter().map(|code| (*code).to_string()).collect(),
                change,
            });
        }
        Ok(overrides)
    }

    pub fn read_hst(path: &Path, separator: &str) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        let mut overrides = Self::parse_hst(&text, separator)?;
        overrides.filepath = Some(path.to_path_buf());
        Ok(overrides)
    }
}

impl PartialEq for CellOverrides {
    fn eq(&self, other: &Self) -> bool {
        self.changes == other.changes
            && self.separator == other.separator
            && self.ignore_error == other.ignore_error
            && self.expand_trivial == other.expand_trivial
    }
}

impl<'a> IntoIterator for &'a CellOverrides {
    type Item = &'a CellOverride;
    type IntoIter = std::slice::Iter<'a, CellOverride>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

//! Code → label lists (`.cdl` files).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HierarchyError, Result};

/// Ordered code → label mapping with unique codes.
#[derive(Debug, Clone, Default)]
pub struct CodeList {
    entries: Vec<(String, String)>,
    filepath: Option<PathBuf>,
}

impl CodeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a label, keeping the original position of a
    /// replaced code. Returns the previous label.
    pub fn insert(&mut self, code: impl Into<String>, label: impl Into<String>) -> Option<String> {
        let code = code.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == code) {
            Some((_, current)) => Some(std::mem::replace(current, label)),
            None => {
                self.entries.push((code, label));
                None
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, label)| label.as_str())
    }

    pub fn remove(&mut self, code: &str) -> Option<String> {
        let position = self.entries.iter().position(|(existing, _)| existing == code)?;
        Some(self.entries.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(code, label)| (code.as_str(), label.as_str()))
    }

    /// Longest code, in characters.
    pub fn code_length(&self) -> usize {
        self.entries
            .iter()
            .map(|(code, _)| code.chars().count())
            .max()
            .unwrap_or(0)
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn set_filepath(&mut self, path: impl Into<PathBuf>) {
        self.filepath = Some(path.into());
    }

    pub fn to_cdl(&self, length: usize) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for (code, label) in &self.entries {
            writer.write_record([format!("{code:>length$}").as_str(), label.as_str()])?;
        }
        let bytes = writer.into_inner().map_err(csv::IntoInnerError::into_error)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes the `.cdl` file and remembers its location.
    pub fn write_cdl(&mut self, path: &Path, length: usize) -> Result<()> {
        let text = self.to_cdl(length)?;
        fs::write(path, text).map_err(|e| HierarchyError::io(path, e))?;
        debug!(path = %path.display(), codes = self.len(), "wrote codelist");
        self.filepath = Some(path.to_path_buf());
        Ok(())
    }

    pub fn read_cdl(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| HierarchyError::csv(path, e))?;
        let mut codelist = CodeList::new();
        for record in reader.records() {
            let record = record.map_err(|e| HierarchyError::csv(path, e))?;
            let Some(code) = record.get(0).map(str::trim) else {
                continue;
            };
            if code.is_empty() {
                continue;
            }
            codelist.insert(code, record.get(1).unwrap_or_default());
        }
        codelist.filepath = Some(path.to_path_buf());
        Ok(codelist)
    }
}

impl PartialEq for CodeList {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> FromIterator<(K, V)> for CodeList
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut codelist = CodeList::new();
        for (code, label) in iter {
            codelist.insert(code, label);
        }
        codelist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn municipalities() -> CodeList {
        [
            ("501", "Brielle"),
            ("502", "Capelle aan den IJssel"),
            ("503", "Delft"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn serializes_code_label_lines() {
        let codelist = municipalities();
        assert_eq!(
            codelist.to_cdl(3).unwrap(),
            "501,Brielle\n502,Capelle aan den IJssel\n503,Delft\n"
        );
        assert_eq!(codelist.to_cdl(5).unwrap().lines().next(), Some("  501,Brielle"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut codelist = municipalities();
        assert_eq!(codelist.insert("502", "Capelle"), Some("Capelle aan den IJssel".to_string()));
        assert_eq!(codelist.iter().nth(1), Some(("502", "Capelle")));
        assert_eq!(codelist.remove("501").as_deref(), Some("Brielle"));
        assert_eq!(codelist.len(), 2);
        assert_eq!(codelist.code_length(), 3);
    }

    #[test]
    fn reads_back_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("municipality.cdl");
        let mut codelist = municipalities();
        codelist.write_cdl(&path, 6).unwrap();
        assert_eq!(codelist.filepath(), Some(path.as_path()));

        let read = CodeList::read_cdl(&path).unwrap();
        assert_eq!(read, codelist);
        assert_eq!(read.get("503"), Some("Delft"));
    }
}

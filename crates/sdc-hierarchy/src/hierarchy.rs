//! The hierarchy union attached to categorical columns.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HierarchyError, Result};
use crate::hrc::{self, DEFAULT_INDENT};
use crate::tree::{CodeTree, NodeId};

pub const DEFAULT_TOTAL_CODE: &str = "Total";

/// How the codes of a categorical column are grouped.
#[derive(Debug, Clone, PartialEq)]
pub enum Hierarchy {
    Flat(FlatHierarchy),
    Level(LevelHierarchy),
    Tree(TreeHierarchy),
}

impl Hierarchy {
    pub fn flat() -> Self {
        Self::Flat(FlatHierarchy::default())
    }

    pub fn levels(widths: Vec<u32>) -> Result<Self> {
        LevelHierarchy::new(widths).map(Self::Level)
    }

    pub fn tree(tree: TreeHierarchy) -> Self {
        Self::Tree(tree)
    }

    pub fn is_hierarchical(&self) -> bool {
        !matches!(self, Self::Flat(_))
    }

    pub fn total_code(&self) -> &str {
        match self {
            Self::Flat(flat) => &flat.total_code,
            Self::Level(level) => &level.total_code,
            Self::Tree(tree) => tree.total_code(),
        }
    }

    pub fn set_total_code(&mut self, code: impl Into<String>) {
        match self {
            Self::Flat(flat) => flat.total_code = code.into(),
            Self::Level(level) => level.total_code = code.into(),
            Self::Tree(tree) => tree.set_total_code(code),
        }
    }

    /// Width implied by the hierarchy; flat hierarchies imply none.
    pub fn code_length(&self) -> Option<usize> {
        match self {
            Self::Flat(_) => None,
            Self::Level(level) => Some(level.code_length()),
            Self::Tree(tree) => Some(tree.code_length()),
        }
    }

    pub fn as_tree(&self) -> Option<&TreeHierarchy> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut TreeHierarchy> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::flat()
    }
}

impl From<TreeHierarchy> for Hierarchy {
    fn from(tree: TreeHierarchy) -> Self {
        Self::Tree(tree)
    }
}

impl From<LevelHierarchy> for Hierarchy {
    fn from(level: LevelHierarchy) -> Self {
        Self::Level(level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatHierarchy {
    pub total_code: String,
}

impl Default for FlatHierarchy {
    fn default() -> Self {
        Self {
            total_code: DEFAULT_TOTAL_CODE.to_string(),
        }
    }
}

/// Fixed-width digit groups of a composite code, e.g. `[1, 2, 1]` for
/// codes like `4015`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelHierarchy {
    widths: Vec<u32>,
    pub total_code: String,
}

impl LevelHierarchy {
    pub fn new(widths: Vec<u32>) -> Result<Self> {
        if widths.is_empty() {
            return Err(HierarchyError::InvalidLevels {
                widths,
                message: "at least one level is required".to_string(),
            });
        }
        if widths.contains(&0) {
            return Err(HierarchyError::InvalidLevels {
                widths,
                message: "widths must be positive".to_string(),
            });
        }
        Ok(Self {
            widths,
            total_code: DEFAULT_TOTAL_CODE.to_string(),
        })
    }

    #[must_use]
    pub fn with_total_code(mut self, code: impl Into<String>) -> Self {
        self.total_code = code.into();
        self
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    pub fn code_length(&self) -> usize {
        self.widths.iter().map(|width| *width as usize).sum()
    }

    /// Splits a code into its digit groups. Short codes yield fewer groups.
    pub fn split<'a>(&self, code: &'a str) -> Vec<&'a str> {
        let mut groups = Vec::with_capacity(self.widths.len());
        let mut rest = code;
        for width in &self.widths {
            if rest.is_empty() {
                break;
            }
            let cut = rest
                .char_indices()
                .nth(*width as usize)
                .map_or(rest.len(), |(index, _)| index);
            let (group, tail) = rest.split_at(cut);
            groups.push(group);
            rest = tail;
        }
        groups
    }
}

/// A code tree plus its `.hrc` presentation settings.
#[derive(Debug, Clone)]
pub struct TreeHierarchy {
    tree: CodeTree,
    pub indent: String,
    filepath: Option<PathBuf>,
}

impl TreeHierarchy {
    pub fn new() -> Self {
        Self::from_tree(CodeTree::default())
    }

    pub fn with_total_code(code: impl Into<String>) -> Self {
        Self::from_tree(CodeTree::new(code))
    }

    pub fn from_tree(tree: CodeTree) -> Self {
        Self {
            tree,
            indent: DEFAULT_INDENT.to_string(),
            filepath: None,
        }
    }

    pub fn from_rows<R, S>(rows: R, total_code: impl Into<String>) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CodeTree::from_rows(rows, total_code).map(Self::from_tree)
    }

    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.tree.to_rows()
    }

    pub fn tree(&self) -> &CodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut CodeTree {
        &mut self.tree
    }

    pub fn create_node<I, S>(&mut self, path: I) -> Result<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tree.create(path)
    }

    pub fn get_node<I, S>(&self, path: I) -> Option<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tree.get(path)
    }

    pub fn total_code(&self) -> &str {
        self.tree.total_code()
    }

    pub fn set_total_code(&mut self, code: impl Into<String>) {
        self.tree.set_total_code(code);
    }

    pub fn code_length(&self) -> usize {
        self.tree.code_length()
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn set_filepath(&mut self, path: impl Into<PathBuf>) {
        self.filepath = Some(path.into());
    }

    pub fn to_hrc(&self, length: usize) -> String {
        hrc::to_hrc(&self.tree, &self.indent, length)
    }

    /// Writes the `.hrc` file and remembers its location.
    pub fn write_hrc(&mut self, path: &Path, length: usize) -> Result<()> {
        let file = File::create(path).map_err(|e| HierarchyError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        hrc::write_hrc(&self.tree, &mut writer, &self.indent, length)
            .and_then(|()| writer.flush())
            .map_err(|e| HierarchyError::io(path, e))?;
        debug!(path = %path.display(), nodes = self.tree.len(), "wrote hierarchy");
        self.filepath = Some(path.to_path_buf());
        Ok(())
    }

    pub fn read_hrc(path: &Path, indent: &str, total_code: &str) -> Result<Self> {
        let file = File::open(path).map_err(|e| HierarchyError::io(path, e))?;
        let tree = hrc::parse_hrc(BufReader::new(file), indent, total_code).map_err(|e| match e {
            HierarchyError::Stream(source) => HierarchyError::io(path, source),
            other => other,
        })?;
        Ok(Self {
            tree,
            indent: indent.to_string(),
            filepath: Some(path.to_path_buf()),
        })
    }

    pub fn from_hrc_str(text: &str, indent: &str, total_code: &str) -> Result<Self> {
        let tree = hrc::parse_hrc_str(text, indent, total_code)?;
        Ok(Self {
            tree,
            indent: indent.to_string(),
            filepath: None,
        })
    }
}

impl Default for TreeHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TreeHierarchy {
    fn eq(&self, other: &Self) -> bool {
        self.tree == other.tree && self.indent == other.indent
    }
}

impl fmt::Display for TreeHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_widths_must_be_positive() {
        assert!(Hierarchy::levels(Vec::new()).is_err());
        assert!(Hierarchy::levels(vec![1, 0, 2]).is_err());
        let levels = Hierarchy::levels(vec![1, 2, 1]).unwrap();
        assert_eq!(levels.code_length(), Some(4));
        assert!(levels.is_hierarchical());
    }

    #[test]
    fn level_split_groups_digits() {
        let levels = LevelHierarchy::new(vec![1, 2, 1]).unwrap();
        assert_eq!(levels.split("4015"), vec!["4", "01", "5"]);
        assert_eq!(levels.split("40"), vec!["4", "0"]);
    }

    #[test]
    fn flat_is_default_and_not_hierarchical() {
        let mut flat = Hierarchy::default();
        assert!(!flat.is_hierarchical());
        assert_eq!(flat.total_code(), "Total");
        assert_eq!(flat.code_length(), None);
        flat.set_total_code("NL");
        assert_eq!(flat.total_code(), "NL");
    }

    #[test]
    fn tree_total_code_follows_root() {
        let mut tree = TreeHierarchy::new();
        tree.create_node(["North", "A"]).unwrap();
        let mut hierarchy = Hierarchy::from(tree);
        hierarchy.set_total_code("All");
        assert_eq!(hierarchy.total_code(), "All");
        assert_eq!(hierarchy.code_length(), Some(5));
        assert!(hierarchy.as_tree().is_some());
    }

    #[test]
    fn equality_ignores_filepath() {
        let mut a = TreeHierarchy::from_rows([["A", "A1"]], "Total").unwrap();
        let b = a.clone();
        a.set_filepath("a.hrc");
        assert_eq!(a, b);
    }
}

//! Recode files (`.grc`) and code recoding.
//!
//! A `.grc` file either lists the codes of a coarsened tree after a
//! `<TREERECODE>` header, or maps groups to code ranges:
//!
//! ```text
//! 1: 100-199
//! 23: 200-299, 300
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HierarchyError, Result};
use crate::tree::CodeTree;

pub const TREE_RECODE_HEADER: &str = "<TREERECODE>";

/// Codes kept after coarsening a tree hierarchy.
#[derive(Debug, Clone, Default)]
pub struct TreeRecode {
    codes: Vec<String>,
    filepath: Option<PathBuf>,
}

impl TreeRecode {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            filepath: None,
        }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }

    pub fn set_filepath(&mut self, path: impl Into<PathBuf>) {
        self.filepath = Some(path.into());
    }

    pub fn to_grc(&self, length: usize) -> String {
        let mut text = String::from(TREE_RECODE_HEADER);
        text.push('\n');
        for code in &self.codes {
            text.push_str(&format!("{code:>length$}\n"));
        }
        text
    }

    pub fn write_grc(&mut self, path: &Path, length: usize) -> Result<()> {
        fs::write(path, self.to_grc(length)).map_err(|e| HierarchyError::io(path, e))?;
        debug!(path = %path.display(), codes = self.codes.len(), "wrote tree recode");
        self.filepath = Some(path.to_path_buf());
        Ok(())
    }

    /// Reads a tree recode file; interval files are rejected.
    pub fn read_grc(path: &Path) -> Result<Self> {
        match read_recode_file(path)? {
            RecodeFile::Tree(recode) => Ok(recode),
            RecodeFile::Intervals(_) => Err(HierarchyError::InvalidRecode {
                line: 1,
                text: path.display().to_string(),
                message: format!("expected a {TREE_RECODE_HEADER} header"),
            }),
        }
    }
}

impl PartialEq for TreeRecode {
    fn eq(&self, other: &Self) -> bool {
        self.codes == other.codes
    }
}

/// Inclusive code range, compared lexically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInterval {
    pub start: String,
    pub stop: String,
}

impl CodeInterval {
    pub fn new(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
        }
    }

    pub fn single(code: impl Into<String>) -> Self {
        let code = code.into();
        Self::new(code.clone(), code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.start.as_str() <= code && code <= self.stop.as_str()
    }
}

/// Parsed content of a `.grc` file.
#[derive(Debug, Clone, PartialEq)]
pub enum RecodeFile {
    Tree(TreeRecode),
    Intervals(Vec<(String, Vec<CodeInterval>)>),
}

/// How codes are mapped onto coarser groups.
#[derive(Debug, Clone, PartialEq)]
pub enum Recoder {
    /// Group name with the ranges it absorbs.
    Intervals(Vec<(String, Vec<CodeInterval>)>),
    /// Collapse each code onto its ancestor at this depth; 0 is the total.
    Level(usize),
    /// Collapse each code onto its nearest listed ancestor-or-self.
    Leaves(Vec<String>),
}

pub fn parse_recode(text: &str) -> Result<RecodeFile> {
    let mut lines = text.lines().enumerate().peekable();
    while lines.peek().is_some_and(|(_, line)| line.trim().is_empty()) {
        lines.next();
    }
    if lines
        .peek()
        .is_some_and(|(_, line)| line.trim() == TREE_RECODE_HEADER)
    {
        lines.next();
        let codes = lines
            .map(|(_, line)| line.trim())
            .filter(|code| !code.is_empty());
        return Ok(RecodeFile::Tree(TreeRecode::new(codes)));
    }

    let mut groups = Vec::new();
    for (index, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let invalid = |message: &str| HierarchyError::InvalidRecode {
            line: index + 1,
            text: line.to_string(),
            message: message.to_string(),
        };
        let (group, ranges) = line
            .split_once(':')
            .ok_or_else(|| invalid("expected 'group: ranges'"))?;
        let group = group.trim();
        if group.is_empty() {
            return Err(invalid("group code is empty"));
        }
        let mut intervals = Vec::new();
        for range in ranges.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            let interval = match range.split_once('-') {
                Some((start, stop)) => CodeInterval::new(start.trim(), stop.trim()),
                None => CodeInterval::single(range),
            };
            intervals.push(interval);
        }
        if intervals.is_empty() {
            return Err(invalid("no codes listed"));
        }
        groups.push((group.to_string(), intervals));
    }
    Ok(RecodeFile::Intervals(groups))
}

pub fn read_recode_file(path: &Path) -> Result<RecodeFile> {
    let text = fs::read_to_string(path).map_err(|e| HierarchyError::io(path, e))?;
    match parse_recode(&text)? {
        RecodeFile::Tree(mut recode) => {
            recode.filepath = Some(path.to_path_buf());
            Ok(RecodeFile::Tree(recode))
        }
        intervals => Ok(intervals),
    }
}

/// Maps each code through `recoder`. Codes without a mapping are kept.
pub fn recode_codes<S: AsRef<str>>(
    codes: &[S],
    recoder: &Recoder,
    tree: Option<&CodeTree>,
) -> Result<Vec<String>> {
    let mapping = match recoder {
        Recoder::Intervals(groups) => {
            return Ok(codes
                .iter()
                .map(|code| {
                    let code = code.as_ref();
                    groups
                        .iter()
                        .find(|(_, ranges)| ranges.iter().any(|range| range.contains(code)))
                        .map_or_else(|| code.to_string(), |(group, _)| group.clone())
                })
                .collect());
        }
        Recoder::Level(level) => level_mapping(tree.ok_or(HierarchyError::RecodeNeedsTree)?, *level),
        Recoder::Leaves(leaves) => {
            leaves_mapping(tree.ok_or(HierarchyError::RecodeNeedsTree)?, leaves)
        }
    };
    Ok(codes
        .iter()
        .map(|code| {
            let code = code.as_ref();
            mapping
                .get(code)
                .map_or_else(|| code.to_string(), |mapped| (*mapped).to_string())
        })
        .collect())
}

fn level_mapping(tree: &CodeTree, level: usize) -> HashMap<&str, &str> {
    let mut mapping = HashMap::new();
    if level == 0 {
        for (id, _) in tree.descendants(tree.root()) {
            mapping.insert(tree.code(id), tree.total_code());
        }
        return mapping;
    }
    for (id, depth) in tree.descendants(tree.root()) {
        if depth != level {
            continue;
        }
        let target = tree.code(id);
        mapping.insert(target, target);
        for (below, _) in tree.descendants(id) {
            mapping.insert(tree.code(below), target);
        }
    }
    mapping
}

fn leaves_mapping<'a>(tree: &'a CodeTree, leaves: &'a [String]) -> HashMap<&'a str, &'a str> {
    let mut mapping: HashMap<&str, &str> = leaves
        .iter()
        .map(|leaf| (leaf.as_str(), leaf.as_str()))
        .collect();
    for (id, _) in tree.descendants(tree.root()) {
        let code = tree.code(id);
        if mapping.contains_key(code) {
            continue;
        }
        if let Some(parent) = tree.parent(id)
            && let Some(target) = mapping.get(tree.code(parent)).copied()
        {
            mapping.insert(code, target);
        }
    }
    mapping
}

//! Tabular exchange for code trees: level rows and child/parent relations.

use std::collections::HashMap;

use crate::error::Result;
use crate::tree::{CodeTree, NodeId};

impl CodeTree {
    /// Builds a tree from rows of `(level1, level2, …, leaf)` codes.
    ///
    /// Empty cells are skipped, so ragged rows can be padded with `""`.
    /// Siblings with the same code are shared between rows.
    pub fn from_rows<R, S>(rows: R, total_code: impl Into<String>) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = CodeTree::new(total_code);
        let mut seen: HashMap<(NodeId, String), NodeId> = HashMap::new();
        for row in rows {
            let mut current = tree.root();
            for cell in row {
                let code = cell.as_ref().trim();
                if code.is_empty() {
                    continue;
                }
                let key = (current, code.to_string());
                current = match seen.get(&key) {
                    Some(existing) => *existing,
                    None => {
                        let node = tree.create_under(current, [code])?;
                        seen.insert(key, node);
                        node
                    }
                };
            }
        }
        Ok(tree)
    }

    /// One row per leaf path, root excluded.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.leaves()
            .into_iter()
            .map(|leaf| self.path_of(leaf).into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Builds a tree from `(child, parent)` pairs listed parents first.
    ///
    /// A parent that is empty or equal to the total code places the child at
    /// the top level. Parents not seen yet are created at the top level.
    pub fn from_relations<R, C, P>(relations: R, total_code: impl Into<String>) -> Result<Self>
    where
        R: IntoIterator<Item = (C, P)>,
        C: AsRef<str>,
        P: AsRef<str>,
    {
        let mut tree = CodeTree::new(total_code);
        let mut by_code: HashMap<String, NodeId> = HashMap::new();
        for (child, parent) in relations {
            let child = child.as_ref().trim();
            let parent = parent.as_ref().trim();
            let parent_id = if parent.is_empty() || parent == tree.total_code() {
                tree.root()
            } else if let Some(existing) = by_code.get(parent) {
                *existing
            } else {
                let created = tree.create_under(tree.root(), [parent])?;
                by_code.insert(parent.to_string(), created);
                created
            };
            let node = tree.create_under(parent_id, [child])?;
            by_code.insert(child.to_string(), node);
        }
        Ok(tree)
    }

    /// `(child, parent)` pairs in pre-order; top-level nodes carry the total
    /// code as parent.
    pub fn to_relations(&self) -> Vec<(String, String)> {
        self.descendants(self.root())
            .filter_map(|(id, _)| {
                let parent = self.parent(id)?;
                Some((self.code(id).to_string(), self.code(parent).to_string()))
            })
            .collect()
    }
}

//! Arena-backed code tree.
//!
//! Nodes live in a flat `Vec` and refer to each other through [`NodeId`]s.
//! The root carries the total code, which is never part of serialized
//! content; every other node has exactly one parent and an ordered list of
//! children with unique codes.

use std::cell::Cell;
use std::fmt;

use crate::error::{HierarchyError, Result};

/// Stable handle to a node inside one [`CodeTree`].
///
/// Ids are only meaningful for the tree that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    code: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct CodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    code_length: Cell<Option<usize>>,
}

impl CodeTree {
    pub fn new(total_code: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                code: total_code.into(),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            code_length: Cell::new(None),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn total_code(&self) -> &str {
        self.code(self.root)
    }

    /// Relabels the root. The total code is not part of `code_length`.
    pub fn set_total_code(&mut self, code: impl Into<String>) {
        self.nodes[self.root.0].code = code.into();
    }

    pub fn code(&self, id: NodeId) -> &str {
        &self.nodes[id.0].code
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child of `id` with the given code.
    pub fn child(&self, id: NodeId, code: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.code(*child) == code)
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// Distance from the root; the root itself has depth 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Number of nodes below the root.
    pub fn len(&self) -> usize {
        self.descendants(self.root).count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    /// Walks from the root creating missing nodes and returns the last one.
    ///
    /// Existing nodes are reused, so creating the same path twice is a no-op.
    /// The empty path returns the root. A path whose first segment is the
    /// total code is rejected.
    pub fn create<I, S>(&mut self, path: I) -> Result<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = path.into_iter().peekable();
        if let Some(first) = segments.peek()
            && first.as_ref() == self.total_code()
        {
            return Err(HierarchyError::RootCodeInPath {
                code: first.as_ref().to_string(),
            });
        }
        self.create_under(self.root, segments)
    }

    /// Like [`CodeTree::create`], starting below an arbitrary node.
    pub fn create_under<I, S>(&mut self, parent: NodeId, path: I) -> Result<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = parent;
        for segment in path {
            let segment = segment.as_ref();
            current = match self.child(current, segment) {
                Some(existing) => existing,
                None => self.push_child(current, segment.to_string()),
            };
        }
        Ok(current)
    }

    pub fn get<I, S>(&self, path: I) -> Option<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self.root;
        for segment in path {
            current = self.child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Codes from the top level down to `id`, root excluded.
    pub fn path_of(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.code(current));
            current = parent;
        }
        path.reverse();
        path
    }

    /// Renames a node. Sibling codes must stay unique; renaming the root
    /// changes the total code.
    pub fn rename(&mut self, id: NodeId, code: impl Into<String>) -> Result<()> {
        let code = code.into();
        if let Some(parent) = self.parent(id)
            && let Some(existing) = self.child(parent, &code)
            && existing != id
        {
            return Err(HierarchyError::DuplicateChild {
                parent: self.code(parent).to_string(),
                code,
            });
        }
        self.nodes[id.0].code = code;
        self.invalidate();
        Ok(())
    }

    /// Removes `id` and its subtree, returning them as an independent tree
    /// rooted at `id`.
    pub fn detach(&mut self, id: NodeId) -> Result<CodeTree> {
        let Some(parent) = self.parent(id) else {
            return Err(HierarchyError::DetachRoot);
        };
        let mut detached = CodeTree::new(self.code(id));
        let detached_root = detached.root;
        detached.copy_children_from(self, id, detached_root);

        self.nodes[parent.0].children.retain(|child| *child != id);
        self.nodes[id.0].parent = None;
        self.invalidate();
        Ok(detached)
    }

    /// Grafts `subtree` below `parent`; the subtree's root becomes a child.
    pub fn append(&mut self, parent: NodeId, subtree: &CodeTree) -> Result<NodeId> {
        let code = subtree.total_code();
        if self.child(parent, code).is_some() {
            return Err(HierarchyError::DuplicateChild {
                parent: self.code(parent).to_string(),
                code: code.to_string(),
            });
        }
        let grafted = self.push_child(parent, code.to_string());
        self.copy_children_from(subtree, subtree.root, grafted);
        Ok(grafted)
    }

    /// Pre-order walk below `id`, yielding each node with its depth relative
    /// to `id` (direct children are at depth 1).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let stack = self
            .children(id)
            .iter()
            .rev()
            .map(|child| (*child, 1))
            .collect();
        Descendants { tree: self, stack }
    }

    /// Leaves below the root in pre-order. An empty tree has none.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .map(|(id, _)| id)
            .filter(|id| self.is_leaf(*id))
            .collect()
    }

    /// Longest code below the root, in characters.
    pub fn code_length(&self) -> usize {
        if let Some(length) = self.code_length.get() {
            return length;
        }
        let length = self
            .descendants(self.root)
            .map(|(id, _)| self.code(id).chars().count())
            .max()
            .unwrap_or(0);
        self.code_length.set(Some(length));
        length
    }

    fn push_child(&mut self, parent: NodeId, code: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            code,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        self.invalidate();
        id
    }

    fn copy_children_from(&mut self, source: &CodeTree, from: NodeId, to: NodeId) {
        for child in source.children(from) {
            let copied = self.push_child(to, source.code(*child).to_string());
            self.copy_children_from(source, *child, copied);
        }
    }

    fn invalidate(&self) {
        self.code_length.set(None);
    }

    fn same_subtree(&self, id: NodeId, other: &CodeTree, other_id: NodeId) -> bool {
        let children = self.children(id);
        let other_children = other.children(other_id);
        self.code(id) == other.code(other_id)
            && children.len() == other_children.len()
            && children
                .iter()
                .zip(other_children)
                .all(|(a, b)| self.same_subtree(*a, other, *b))
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, id: NodeId, prefix: &str) -> fmt::Result {
        let children = self.children(id);
        for (position, child) in children.iter().enumerate() {
            let last = position + 1 == children.len();
            let (branch, continuation) = if last {
                ("`-- ", "    ")
            } else {
                ("|-- ", "|   ")
            };
            writeln!(f, "{prefix}{branch}{}", self.code(*child))?;
            self.render(f, *child, &format!("{prefix}{continuation}"))?;
        }
        Ok(())
    }
}

impl Default for CodeTree {
    fn default() -> Self {
        Self::new(crate::DEFAULT_TOTAL_CODE)
    }
}

impl PartialEq for CodeTree {
    fn eq(&self, other: &Self) -> bool {
        self.same_subtree(self.root, other, other.root)
    }
}

impl Eq for CodeTree {}

impl fmt::Display for CodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.total_code())?;
        self.render(f, self.root, "")
    }
}

pub struct Descendants<'a> {
    tree: &'a CodeTree,
    stack: Vec<(NodeId, usize)>,
}

impl Iterator for Descendants<'_> {
    type Item = (NodeId, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        self.stack.extend(
            self.tree
                .children(id)
                .iter()
                .rev()
                .map(|child| (*child, depth + 1)),
        );
        Some((id, depth))
    }
}

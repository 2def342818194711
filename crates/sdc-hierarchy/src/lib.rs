//! Code hierarchies for categorical variables.
//!
//! This crate models how the codes of a categorical column roll up into
//! totals, and reads and writes the small text files a disclosure-control
//! engine expects next to the data:
//!
//! - [`CodeTree`]: arena-backed tree of codes with path based editing
//! - `.hrc` files: indented hierarchy text ([`hrc`])
//! - [`Hierarchy`]: flat, fixed-width level, or tree hierarchy
//! - [`CodeList`]: code labels (`.cdl`)
//! - [`TreeRecode`] and [`Recoder`]: coarsening of codes (`.grc`)
//!
//! # Example
//!
//! ```
//! use sdc_hierarchy::TreeHierarchy;
//!
//! let mut regions = TreeHierarchy::new();
//! regions.create_node(["North", "A"]).unwrap();
//! regions.create_node(["North", "B"]).unwrap();
//! assert_eq!(regions.to_hrc(5), "North\n@    A\n@    B\n");
//! ```

pub mod codelist;
pub mod error;
pub mod hierarchy;
pub mod hrc;
pub mod recode;
mod rows;
pub mod tree;

pub use codelist::CodeList;
pub use error::{HierarchyError, Result};
pub use hierarchy::{DEFAULT_TOTAL_CODE, FlatHierarchy, Hierarchy, LevelHierarchy, TreeHierarchy};
pub use hrc::DEFAULT_INDENT;
pub use recode::{
    CodeInterval, RecodeFile, Recoder, TREE_RECODE_HEADER, TreeRecode, read_recode_file,
    recode_codes,
};
pub use tree::{CodeTree, Descendants, NodeId};

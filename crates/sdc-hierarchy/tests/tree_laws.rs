//! Property tests for tree serialization and row export.

use std::collections::BTreeSet;

use proptest::prelude::*;
use sdc_hierarchy::{CodeTree, DEFAULT_INDENT, hrc};

fn arb_code() -> impl Strategy<Value = String> {
    // Never "Total", never starting with the indent character.
    "[A-S][a-z0-9]{0,5}"
}

fn arb_rows() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(arb_code(), 3), 0..24)
}

proptest! {
    #[test]
    fn hrc_round_trip(rows in arb_rows(), extra_width in 0usize..4) {
        let tree = CodeTree::from_rows(&rows, "Total").unwrap();
        let width = tree.code_length() + extra_width;
        let text = hrc::to_hrc(&tree, DEFAULT_INDENT, width);
        let parsed = hrc::parse_hrc_str(&text, DEFAULT_INDENT, "Total").unwrap();
        prop_assert_eq!(parsed, tree);
    }

    #[test]
    fn hrc_lines_are_padded_to_width(rows in arb_rows()) {
        let tree = CodeTree::from_rows(&rows, "Total").unwrap();
        let width = tree.code_length();
        let text = hrc::to_hrc(&tree, DEFAULT_INDENT, width);
        prop_assert_eq!(text.lines().count(), tree.len());
        for line in text.lines() {
            let code = line.trim_start_matches('@');
            prop_assert_eq!(code.chars().count(), width);
        }
    }

    #[test]
    fn rows_export_reproduces_input(rows in arb_rows()) {
        let tree = CodeTree::from_rows(&rows, "Total").unwrap();
        let exported = tree.to_rows();
        let expected: BTreeSet<Vec<String>> = rows.iter().cloned().collect();
        let actual: BTreeSet<Vec<String>> = exported.iter().cloned().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(exported.len(), tree.leaves().len());

        let rebuilt = CodeTree::from_rows(&exported, "Total").unwrap();
        prop_assert_eq!(rebuilt, tree);
    }

    #[test]
    fn relations_rebuild_the_tree(rows in arb_rows()) {
        let tree = CodeTree::from_rows(&rows, "Total").unwrap();
        let rebuilt = CodeTree::from_relations(tree.to_relations(), "Total").unwrap();
        // Codes repeated across branches collapse onto one parent.
        prop_assert!(rebuilt.len() <= tree.len());
    }
}

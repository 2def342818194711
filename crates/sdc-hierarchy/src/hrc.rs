//! Indented `.hrc` text format.
//!
//! One line per non-root node in pre-order. Each line starts with the indent
//! string repeated `depth - 1` times, followed by the code right-justified to
//! a fixed width.

use std::io::{BufRead, Write};

use regex::Regex;

use crate::error::{HierarchyError, Result};
use crate::tree::{CodeTree, NodeId};

pub const DEFAULT_INDENT: &str = "@";

pub fn write_hrc<W: Write>(
    tree: &CodeTree,
    writer: &mut W,
    indent: &str,
    length: usize,
) -> std::io::Result<()> {
    for (id, depth) in tree.descendants(tree.root()) {
        writeln!(
            writer,
            "{}{:>length$}",
            indent.repeat(depth - 1),
            tree.code(id)
        )?;
    }
    Ok(())
}

pub fn to_hrc(tree: &CodeTree, indent: &str, length: usize) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_hrc(tree, &mut buffer, indent, length);
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn parse_hrc<R: BufRead>(reader: R, indent: &str, total_code: &str) -> Result<CodeTree> {
    if indent.is_empty() {
        return Err(HierarchyError::EmptyIndent);
    }
    let pattern = Regex::new(&format!(
        r"^(?P<prefix>(?:{})*)(?P<code>.*)$",
        regex::escape(indent)
    ))?;

    let mut tree = CodeTree::new(total_code);
    let mut stack: Vec<NodeId> = vec![tree.root()];
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(captures) = pattern.captures(&line) else {
            continue;
        };
        let code = captures["code"].trim();
        if code.is_empty() {
            continue;
        }
        let depth = captures["prefix"].len() / indent.len();
        if depth >= stack.len() {
            return Err(HierarchyError::IndentJump {
                line: index + 1,
                depth: depth + 1,
                max: stack.len() - 1,
            });
        }
        stack.truncate(depth + 1);
        let parent = stack[depth];
        let node = tree.create_under(parent, [code])?;
        stack.push(node);
    }
    Ok(tree)
}

pub fn parse_hrc_str(text: &str, indent: &str, total_code: &str) -> Result<CodeTree> {
    parse_hrc(text.as_bytes(), indent, total_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVINCES: &str = "Zuid-Holland\n@Rotterdam\n@Den Haag\nNoord-Holland\n@Haarlem\n";

    #[test]
    fn parses_nested_lines() {
        let tree = parse_hrc_str(PROVINCES, "@", "Total").unwrap();
        assert!(tree.get(["Zuid-Holland", "Den Haag"]).is_some());
        assert!(tree.get(["Noord-Holland", "Haarlem"]).is_some());
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn writes_right_justified_codes() {
        let tree = parse_hrc_str(PROVINCES, "@", "Total").unwrap();
        let text = to_hrc(&tree, "@", 13);
        assert_eq!(
            text,
            " Zuid-Holland\n@    Rotterdam\n@     Den Haag\nNoord-Holland\n@      Haarlem\n"
        );
        assert_eq!(parse_hrc_str(&text, "@", "Total").unwrap(), tree);
    }

    #[test]
    fn skips_blank_lines_and_crlf() {
        let tree = parse_hrc_str("A\r\n\r\n@B\r\n", "@", "Total").unwrap();
        assert!(tree.get(["A", "B"]).is_some());
    }

    #[test]
    fn rejects_depth_jump() {
        let err = parse_hrc_str("A\n@@B\n", "@", "Total").unwrap_err();
        match err {
            HierarchyError::IndentJump { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn multi_character_indent() {
        let tree = parse_hrc_str("1\n..11\n....111\n", "..", "T").unwrap();
        assert!(tree.get(["1", "11", "111"]).is_some());
        assert_eq!(tree.total_code(), "T");
    }
}

// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::HashSet;
use std::fmt::Write;

use serde::Serialize;

/// A heredoc body attached to an instruction, e.g. `RUN <<EOF`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heredoc {
  /// The delimiter word, e.g. `EOF`.
  pub name: String,

  /// The collected body, one trailing newline per body line.
  pub content: String,

  /// Whether variable expansion applies to the body; false when the
  /// delimiter was quoted (`<<'EOF'`).
  pub expand: bool,

  /// Whether leading tabs were stripped from body lines (`<<-EOF`).
  pub chomp: bool
}

/// A single parsed instruction, or the root of a parsed Dockerfile.
///
/// The root node has an empty `value` and one child per logical
/// instruction; instruction nodes carry their arguments in `args`.
/// Argument chains are stored as a flat, owned sequence rather than the
/// linked list some parsers use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  /// The lowercased instruction keyword; empty for the root node.
  pub value: String,

  /// The raw logical line this node was parsed from.
  pub original: String,

  /// 1-based line number of the first physical line of the instruction.
  pub start_line: usize,

  /// Parsed arguments. For key/value instructions (`ENV`, `LABEL`) keys
  /// and values alternate; for `ARG` each element is `NAME` or
  /// `NAME=VALUE`.
  pub args: Vec<String>,

  /// Builder flags (`--from=stage`, `--chown=1:1`, ...) stripped from the
  /// front of the argument text.
  pub flags: Vec<String>,

  /// Parse attributes, e.g. `json` for exec-form arguments. The root node
  /// records a `syntax=...` token when that directive is present.
  pub attributes: HashSet<String>,

  /// Heredoc bodies referenced by the arguments, in order of appearance.
  pub heredocs: Vec<Heredoc>,

  /// Child instructions; only populated on root nodes.
  pub children: Vec<Node>,

  /// The escape character in effect when this node was parsed.
  pub(crate) escape: char
}

impl Default for Node {
  fn default() -> Node {
    Node {
      value: String::new(),
      original: String::new(),
      start_line: 0,
      args: Vec::new(),
      flags: Vec::new(),
      attributes: HashSet::new(),
      heredocs: Vec::new(),
      children: Vec::new(),
      escape: '\\'
    }
  }
}

impl Node {
  /// Creates a root node holding the given children.
  pub fn root(children: Vec<Node>) -> Node {
    Node {
      children,
      ..Node::default()
    }
  }

  /// Renders the node tree as one parenthesized s-expression per
  /// instruction, for debugging and test output.
  pub fn dump(&self) -> String {
    let mut out = String::new();

    for child in &self.children {
      let _ = write!(out, "({}", child.value);
      for flag in &child.flags {
        let _ = write!(out, " {}", flag);
      }
      for arg in &child.args {
        let _ = write!(out, " {:?}", arg);
      }
      out.push_str(")\n");
    }

    out
  }
}

/// Removes and returns all top-level children whose instruction equals the
/// given keyword (compared case-insensitively).
///
/// Useful for pulling out-of-band marker instructions out of a parsed tree
/// before evaluation.
pub fn split_children(node: &mut Node, value: &str) -> Vec<Node> {
  let mut matched = Vec::new();
  let mut rest = Vec::new();

  for child in node.children.drain(..) {
    if child.value.eq_ignore_ascii_case(value) {
      matched.push(child);
    } else {
      rest.push(child);
    }
  }

  node.children = rest;
  matched
}

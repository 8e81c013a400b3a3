// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::HashMap;
use std::ops::Index;

use lazy_static::lazy_static;
use regex::Regex;

use crate::builder::Builder;
use crate::error::*;
use crate::executor::NoopExecutor;
use crate::node::Node;

lazy_static! {
  static ref STAGE_NAME: Regex =
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").unwrap();
}

/// A single stage in a multi-stage build: a contiguous span of
/// instructions beginning at a `FROM`, with its own builder.
#[derive(Debug, Clone)]
pub struct Stage {
  /// 0-based position of the stage in the Dockerfile.
  pub position: usize,

  /// The `FROM ... AS <name>` alias, or the decimal position when the
  /// stage is unnamed.
  pub name: String,

  /// A root node holding the stage's instructions, `FROM` first.
  pub node: Node,

  pub builder: Builder
}

/// The ordered stages of a parsed Dockerfile.
///
/// # Example
/// ```
/// use dockerfile_builder::{parse_dockerfile, Builder, Stages};
///
/// let node = parse_dockerfile(r#"
///   FROM golang:1.24 AS builder
///   RUN go build -o /app ./...
///
///   FROM scratch
///   COPY --from=builder /app /app
/// "#.as_bytes()).unwrap();
///
/// let stages = Stages::new(&node, &Builder::default()).unwrap();
/// assert_eq!(stages.len(), 2);
/// assert_eq!(stages[0].name, "builder");
/// assert_eq!(stages[1].name, "1");
/// ```
#[derive(Debug)]
pub struct Stages {
  pub stages: Vec<Stage>
}

impl Stages {
  /// Splits a parsed Dockerfile into stages. Heading `ARG`s (those before
  /// the first `FROM`) are evaluated against the template builder and
  /// made inheritable by every stage; each stage receives a fresh builder
  /// sharing the template's user args and platform args.
  pub fn new(node: &Node, template: &Builder) -> Result<Stages> {
    let mut heading_count = 0;
    for child in &node.children {
      if child.value == "arg" {
        heading_count += 1;
      } else {
        break;
      }
    }

    let mut scratch = template.clone();
    for arg_node in &node.children[..heading_count] {
      let mut step = scratch.step();
      step.resolve(arg_node)?;
      scratch.run(&step, &mut NoopExecutor, false)?;
    }

    let mut heading_args: HashMap<String, String> = scratch.heading_args.clone();
    for (name, value) in scratch.args.drain() {
      heading_args.insert(name, value);
    }

    let mut stages: Vec<Stage> = Vec::new();

    for child in &node.children[heading_count..] {
      if child.value == "from" {
        let position = stages.len();
        let name = match stage_alias(child) {
          Some(alias) => {
            if !STAGE_NAME.is_match(&alias) {
              return instruction_error(format!(
                "invalid name for build stage: {:?}",
                alias
              ));
            }
            if stages.iter().any(|s| s.name == alias) {
              return instruction_error(format!(
                "duplicate name {:?} in multi-stage build",
                alias
              ));
            }
            alias
          },
          None => position.to_string()
        };

        stages.push(Stage {
          position,
          name,
          node: Node::root(vec![child.clone()]),
          builder: template.builder_for_stage(heading_args.clone())
        });
      } else {
        match stages.last_mut() {
          Some(stage) => stage.node.children.push(child.clone()),
          None => return instruction_error("no FROM statement found")
        }
      }
    }

    Ok(Stages { stages })
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
    self.stages.iter()
  }

  pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Stage> {
    self.stages.iter_mut()
  }

  /// Fetches a stage by alias.
  pub fn by_name(&self, name: &str) -> Option<&Stage> {
    let name = name.to_ascii_lowercase();
    self.stages.iter().find(|s| s.name == name)
  }

  /// Fetches the single stage whose name or decimal position matches the
  /// target.
  pub fn by_target(&self, target: &str) -> Option<&Stage> {
    self.target_index(target).map(|i| &self.stages[i])
  }

  /// Returns all stages up to and including the targeted one.
  pub fn through_target(&self, target: &str) -> Option<&[Stage]> {
    self.target_index(target).map(|i| &self.stages[..=i])
  }

  fn target_index(&self, target: &str) -> Option<usize> {
    let lowered = target.to_ascii_lowercase();
    self
      .stages
      .iter()
      .position(|s| s.name == lowered || s.position.to_string() == target)
  }
}

/// Extracts the `AS <name>` alias from an unresolved `FROM` node.
fn stage_alias(from: &Node) -> Option<String> {
  if from.args.len() == 3 && from.args[1].eq_ignore_ascii_case("as") {
    Some(from.args[2].to_ascii_lowercase())
  } else {
    None
  }
}

impl Index<usize> for Stages {
  type Output = Stage;

  fn index(&self, index: usize) -> &Self::Output {
    &self.stages[index]
  }
}

impl<'a> IntoIterator for &'a Stages {
  type Item = &'a Stage;
  type IntoIter = std::slice::Iter<'a, Stage>;

  fn into_iter(self) -> Self::IntoIter {
    self.stages.iter()
  }
}

impl IntoIterator for Stages {
  type Item = Stage;
  type IntoIter = std::vec::IntoIter<Stage>;

  fn into_iter(self) -> Self::IntoIter {
    self.stages.into_iter()
  }
}

// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::no_flags;

/// `ARG NAME[=DEFAULT] ...`
///
/// Declares the names for external override and records the effective
/// value: external user arg, then the line's default, then an inherited
/// heading value on bare redeclaration, then a predefined platform value.
pub(crate) fn dispatch_arg(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.is_empty() {
    return at_least_one_argument("ARG");
  }

  for token in &step.args {
    let (name, default) = match token.split_once('=') {
      Some((name, value)) => (name.to_string(), Some(value.to_string())),
      None => (token.clone(), None)
    };

    if name.is_empty() {
      return instruction_error("ARG names can not be blank");
    }

    builder.allowed_args.insert(name.clone());
    if !builder.declared_args.contains(&name) {
      builder.declared_args.push(name.clone());
    }

    let value = builder
      .user_args
      .get(&name)
      .cloned()
      .or(default)
      .or_else(|| builder.heading_args.get(&name).cloned())
      .or_else(|| builder.platform_args.get(&name).cloned());

    if let Some(value) = value {
      builder.args.insert(name, value);
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use pretty_assertions::assert_eq;

  use crate::builder::Builder;
  use crate::executor::NoopExecutor;
  use crate::node::Node;
  use crate::parser::parse_dockerfile;

  fn resolve_args(builder: &mut Builder, node: &Node) {
    for child in &node.children {
      if child.value != "arg" {
        continue;
      }
      let mut step = builder.step();
      step.resolve(child).unwrap();
      builder.run(&step, &mut NoopExecutor, false).unwrap();
    }
  }

  fn arguments_for(dockerfile: &str, user_args: &[(&str, &str)]) -> Vec<String> {
    let node = parse_dockerfile(dockerfile.as_bytes()).unwrap();
    let args: HashMap<String, String> = user_args
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();

    let mut builder = Builder::new(args);
    resolve_args(&mut builder, &node);
    builder.arguments()
  }

  #[test]
  fn later_default_wins() {
    let args = arguments_for("FROM centos\nARG FOO=stuff\nARG FOO=things\n", &[]);
    assert_eq!(args, vec!["FOO=things"]);
  }

  #[test]
  fn user_override_wins() {
    let args = arguments_for(
      "FROM centos\nARG FOO=stuff\nARG FOO=things\n",
      &[("FOO", "bar")]
    );
    assert_eq!(args, vec!["FOO=bar"]);
  }

  #[test]
  fn multiple_args_in_one_step() {
    let args = arguments_for("FROM centos\nARG FOO=stuff WORLD=hello\n", &[]);
    assert!(args.contains(&"FOO=stuff".to_string()));
    assert!(args.contains(&"WORLD=hello".to_string()));
  }

  #[test]
  fn undeclared_user_arg_is_ignored() {
    let args = arguments_for("FROM centos\nARG FOO=stuff\n", &[("OTHER", "x")]);
    assert_eq!(args, vec!["FOO=stuff"]);
  }

  #[test]
  fn platform_arg_redeclaration() {
    let args = arguments_for("FROM centos\nARG TARGETARCH\n", &[]);
    assert_eq!(args.len(), 1);
    assert!(args[0].starts_with("TARGETARCH="));

    let args = arguments_for("FROM centos\nARG TARGETARCH\n", &[("TARGETARCH", "wasm")]);
    assert_eq!(args, vec!["TARGETARCH=wasm"]);
  }
}

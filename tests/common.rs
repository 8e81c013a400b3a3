// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::collections::HashMap;

use dockerfile_builder::*;

/// One observed executor call, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  Preserve(String),
  Copy(Vec<Copy>),
  Run(Run),
  Unrecognized(String)
}

/// An executor that records every call for assertions.
#[derive(Default)]
pub struct RecordingExecutor {
  pub events: Vec<Event>,
  pub configs: Vec<ImageConfig>
}

impl RecordingExecutor {
  pub fn copies(&self) -> Vec<Copy> {
    self
      .events
      .iter()
      .filter_map(|e| match e {
        Event::Copy(copies) => Some(copies.clone()),
        _ => None
      })
      .flatten()
      .collect()
  }

  pub fn runs(&self) -> Vec<Run> {
    self
      .events
      .iter()
      .filter_map(|e| match e {
        Event::Run(run) => Some(run.clone()),
        _ => None
      })
      .collect()
  }

  pub fn preserved(&self) -> Vec<String> {
    self
      .events
      .iter()
      .filter_map(|e| match e {
        Event::Preserve(path) => Some(path.clone()),
        _ => None
      })
      .collect()
  }
}

impl Executor for RecordingExecutor {
  fn preserve(&mut self, path: &str) -> Result<()> {
    self.events.push(Event::Preserve(path.to_string()));
    Ok(())
  }

  fn copy(&mut self, _excludes: &[String], copies: &[Copy]) -> Result<()> {
    self.events.push(Event::Copy(copies.to_vec()));
    Ok(())
  }

  fn run(&mut self, run: &Run, config: &ImageConfig) -> Result<()> {
    self.configs.push(config.clone());
    self.events.push(Event::Run(run.clone()));
    Ok(())
  }

  fn unrecognized_instruction(&mut self, step: &Step) -> Result<()> {
    self.events.push(Event::Unrecognized(step.command.clone()));
    Ok(())
  }
}

pub fn user_args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
  pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Parses a Dockerfile, resolves its single stage and runs every
/// instruction against the given executor.
pub fn build(
  dockerfile: &str,
  args: HashMap<String, String>,
  exec: &mut dyn Executor
) -> Result<Builder> {
  let mut node = parse_dockerfile(dockerfile.as_bytes())?;
  let mut builder = Builder::new(args);
  builder.resolve_from(&mut node)?;

  for child in &node.children {
    let mut step = builder.step();
    step.resolve(child)?;
    builder.run(&step, exec, false)?;
  }

  Ok(builder)
}

/// Resolves only the `ARG` instructions of a stage node, the way a driver
/// primes argument scopes before deciding whether to build the stage.
pub fn resolve_node_args(builder: &mut Builder, node: &Node) -> Result<()> {
  for child in &node.children {
    if child.value != "arg" {
      continue;
    }
    let mut step = builder.step();
    step.resolve(child)?;
    builder.run(&step, &mut NoopExecutor, false)?;
  }
  Ok(())
}

pub fn strings(strs: &[&str]) -> Vec<String> {
  strs.iter().map(|s| String::from(*s)).collect()
}

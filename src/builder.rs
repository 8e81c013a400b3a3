// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::Serialize;

use crate::config::{ImageConfig, DEFAULT_PATH};
use crate::error::*;
use crate::executor::{Executor, NoopExecutor};
use crate::instructions::EVALUATE_TABLE;
use crate::node::{split_children, Heredoc, Node};
use crate::shell::{env_value, merge_env, process_word, process_words};
use crate::volume::VolumeSet;

/// Build args that may be supplied externally without an `ARG`
/// declaration.
const BUILTIN_ALLOWED_ARGS: &[&str] = &[
  "HTTP_PROXY", "http_proxy",
  "HTTPS_PROXY", "https_proxy",
  "FTP_PROXY", "ftp_proxy",
  "NO_PROXY", "no_proxy",
];

lazy_static! {
  /// Instructions whose arguments undergo variable expansion. Shell-form
  /// RUN/CMD/ENTRYPOINT are left for the shell to expand at runtime.
  static ref REPLACE_ENV_ALLOWED: HashSet<&'static str> = [
    "env", "label", "add", "copy", "workdir", "expose", "volume", "user",
    "stopsignal", "arg", "from",
  ].iter().copied().collect();

  /// Instructions whose expanded words may split into multiple arguments.
  static ref ALLOW_WORD_EXPANSION: HashSet<&'static str> =
    ["expose"].iter().copied().collect();
}

/// One copy operation requested by a `COPY` or `ADD` instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Copy {
  /// Stage name, stage ordinal, or image reference to copy from.
  pub from: Option<String>,

  pub src: Vec<String>,
  pub dest: String,

  /// True when a source is a URL that must be downloaded (`ADD`).
  pub download: bool,

  pub chown: Option<String>,
  pub chmod: Option<String>,
  pub link: bool,
  pub parents: bool,
  pub excludes: Vec<String>
}

/// One command execution requested by a `RUN` instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Run {
  /// True for shell form; `args` then holds the single command line.
  pub shell: bool,

  pub args: Vec<String>,
  pub mounts: Vec<String>,
  pub network: Option<String>,
  pub security: Option<String>,
  pub heredocs: Vec<Heredoc>
}

/// A work item: one instruction node with its words expanded against the
/// builder's current scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
  pub command: String,
  pub original: String,

  /// Display form, e.g. `RUN echo hi`.
  pub message: String,

  pub args: Vec<String>,
  pub flags: Vec<String>,
  pub attrs: HashSet<String>,

  /// The substitution scope this step was resolved against.
  pub env: Vec<String>,

  pub heredocs: Vec<Heredoc>,

  /// Extra low-precedence scope applied to `FROM` (platform and heading
  /// args).
  pub(crate) from_env: Vec<String>,

  pub(crate) escape: char
}

impl Default for Step {
  fn default() -> Step {
    Step {
      command: String::new(),
      original: String::new(),
      message: String::new(),
      args: Vec::new(),
      flags: Vec::new(),
      attrs: HashSet::new(),
      env: Vec::new(),
      heredocs: Vec::new(),
      from_env: Vec::new(),
      escape: '\\'
    }
  }
}

impl Step {
  /// Fills the step from an instruction node, expanding words against the
  /// scope captured when the step was created.
  pub fn resolve(&mut self, node: &Node) -> Result<()> {
    self.command = node.value.clone();
    self.original = node.original.clone();
    self.attrs = node.attributes.clone();
    self.flags = node.flags.clone();
    self.heredocs = node.heredocs.clone();
    self.escape = node.escape;
    self.args.clear();

    let scope = if self.command == "from" {
      merge_env(&self.from_env, &self.env)
    } else {
      self.env.clone()
    };

    let expand = REPLACE_ENV_ALLOWED.contains(self.command.as_str())
      && !self.attrs.contains("json");

    for arg in &node.args {
      if !expand {
        self.args.push(arg.clone());
      } else if ALLOW_WORD_EXPANSION.contains(self.command.as_str()) {
        self.args.extend(process_words(arg, &scope, self.escape)?);
      } else {
        self.args.push(process_word(arg, &scope, self.escape)?);
      }
    }

    let mut message = self.command.to_uppercase();
    for arg in &self.args {
      message.push(' ');
      message.push_str(arg);
    }
    self.message = message;

    Ok(())
  }
}

/// Per-stage evaluation state: the accumulated image configuration plus
/// the argument scopes used for substitution.
#[derive(Debug, Clone)]
pub struct Builder {
  pub(crate) run_config: ImageConfig,

  /// Substitution-only environment seeded from a base image; stage `ENV`
  /// writes land in `run_config.env` and win over these.
  pub(crate) env: Vec<String>,

  pub(crate) user_args: HashMap<String, String>,
  pub(crate) heading_args: HashMap<String, String>,
  pub(crate) args: HashMap<String, String>,
  pub(crate) allowed_args: HashSet<String>,
  pub(crate) declared_args: Vec<String>,
  pub(crate) platform_args: HashMap<String, String>,

  /// Exclusion patterns handed to the executor with each copy, typically
  /// from a dockerignore file.
  pub excludes: Vec<String>,

  /// When true, unrecognized instructions are routed to the executor's
  /// hook; when false they are errors.
  pub ignore_unrecognized: bool,

  pub(crate) author: Option<String>,
  pub(crate) platform: Option<String>,

  pub(crate) volumes: VolumeSet,
  pub(crate) pending_volumes: Vec<String>,
  pub(crate) pending_copies: Vec<Copy>,
  pub(crate) pending_runs: Vec<Run>,
  pub(crate) cmd_set: bool,
  pub(crate) image_seeded: bool
}

impl Default for Builder {
  fn default() -> Builder {
    Builder::new(HashMap::new())
  }
}

impl Builder {
  /// Creates a builder with the given externally supplied build args. An
  /// arg takes effect only once the Dockerfile declares it (proxy args
  /// excepted).
  pub fn new(user_args: HashMap<String, String>) -> Builder {
    let mut builder = Builder {
      run_config: ImageConfig::default(),
      env: Vec::new(),
      user_args,
      heading_args: HashMap::new(),
      args: HashMap::new(),
      allowed_args: HashSet::new(),
      declared_args: Vec::new(),
      platform_args: host_platform_args(),
      excludes: Vec::new(),
      ignore_unrecognized: true,
      author: None,
      platform: None,
      volumes: VolumeSet::new(),
      pending_volumes: Vec::new(),
      pending_copies: Vec::new(),
      pending_runs: Vec::new(),
      cmd_set: false,
      image_seeded: false
    };

    builder.seed_builtin_args();
    builder
  }

  /// A fresh builder for a new stage, sharing user args, platform args and
  /// policy, with the given heading-arg values available for bare `ARG`
  /// redeclaration.
  pub(crate) fn builder_for_stage(&self, heading_args: HashMap<String, String>) -> Builder {
    let mut builder = Builder::new(self.user_args.clone());
    builder.platform_args = self.platform_args.clone();
    builder.excludes = self.excludes.clone();
    builder.ignore_unrecognized = self.ignore_unrecognized;
    builder.heading_args = heading_args;
    builder
  }

  fn seed_builtin_args(&mut self) {
    for key in BUILTIN_ALLOWED_ARGS {
      if let Some(value) = self.user_args.get(*key) {
        self.allowed_args.insert(key.to_string());
        if !self.declared_args.iter().any(|d| d == key) {
          self.declared_args.push(key.to_string());
        }
        self.args.insert(key.to_string(), value.clone());
      }
    }
  }

  /// Resolves the stage's base image reference: heading `ARG`s are
  /// evaluated, then the single `FROM` child is expanded and dispatched.
  /// The heading args and the `FROM` node are removed from `node`.
  pub fn resolve_from(&mut self, node: &mut Node) -> Result<String> {
    self.extract_heading_args(node)?;

    match node.children.first() {
      Some(first) if first.value == "from" => (),
      _ => return instruction_error("no FROM statement found")
    }

    let from_nodes = split_children(node, "from");
    if from_nodes.len() > 1 {
      return instruction_error("multiple FROM statements are not supported");
    }

    let mut step = self.step();
    step.resolve(&from_nodes[0])?;
    self.run(&step, &mut NoopExecutor, false)?;

    Ok(self.run_config.image.clone())
  }

  /// Seeds the builder from a base image's configuration. The image's env
  /// joins the substitution scope without being re-emitted, and a default
  /// `PATH` is provided when the image has none.
  pub fn from_image(&mut self, image: &ImageConfig, node: &mut Node) -> Result<()> {
    split_children(node, "from");

    self.run_config = image.clone();
    let image_env = std::mem::take(&mut self.run_config.env);
    self.env = merge_env(&self.env, &image_env);
    self.image_seeded = true;

    if env_value(&self.env, "PATH").is_none() {
      self.run_config.env.push(format!("PATH={}", DEFAULT_PATH));
    }

    let volumes: Vec<String> = self.run_config.volumes.iter().cloned().collect();
    for volume in volumes {
      self.volumes.add(&volume);
    }

    Ok(())
  }

  fn extract_heading_args(&mut self, node: &mut Node) -> Result<()> {
    let mut heading = Vec::new();
    let mut rest = Vec::new();
    let mut extracting = true;

    for child in node.children.drain(..) {
      if extracting && child.value == "arg" {
        heading.push(child);
      } else {
        extracting = false;
        rest.push(child);
      }
    }
    node.children = rest;

    for arg_node in &heading {
      let mut step = self.step();
      step.resolve(arg_node)?;
      self.run(&step, &mut NoopExecutor, false)?;
    }

    // heading values become inheritable; the stage itself starts with a
    // clean arg scope
    for (name, value) in self.args.drain() {
      self.heading_args.insert(name, value);
    }
    self.allowed_args.clear();
    self.declared_args.clear();
    self.seed_builtin_args();

    Ok(())
  }

  /// Creates a step whose substitution scope snapshots the current args
  /// and environment, with environment values winning over arg values of
  /// the same name.
  pub fn step(&self) -> Step {
    let stage_env = merge_env(&self.env, &self.run_config.env);
    let env = merge_env(&self.arguments(), &stage_env);

    let mut platform: Vec<String> = self
      .platform_args
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();
    platform.sort();

    let mut heading: Vec<String> = self
      .heading_args
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();
    heading.sort();

    Step {
      env,
      from_env: merge_env(&platform, &heading),
      ..Step::default()
    }
  }

  /// Dispatches a resolved step, then flushes any resulting volume, copy
  /// and run work to the executor. `no_runs_only` suppresses the
  /// executor's run calls.
  pub fn run(
    &mut self,
    step: &Step,
    exec: &mut dyn Executor,
    no_runs_only: bool
  ) -> Result<()> {
    let handler = match EVALUATE_TABLE.get(step.command.as_str()) {
      Some(handler) => *handler,
      None => {
        if self.ignore_unrecognized {
          return exec.unrecognized_instruction(step);
        }
        return UnknownInstruction {
          instruction: step.command.clone()
        }.fail();
      }
    };

    handler(self, step)?;

    for path in std::mem::take(&mut self.pending_volumes) {
      self.volumes.add(&path);
    }

    let copies = std::mem::take(&mut self.pending_copies);
    let runs = std::mem::take(&mut self.pending_runs);

    // a copy landing inside a declared volume asks the executor to
    // preserve that volume first, once per covered volume
    let mut preserved: Vec<String> = Vec::new();
    for copy in &copies {
      let mut targets = vec![copy.dest.as_str()];
      if copy.from.is_some() {
        targets.extend(copy.src.iter().map(String::as_str));
      }

      for target in targets {
        if let Some(volume) = self.volumes.covering(target) {
          if !preserved.iter().any(|p| p == volume) {
            preserved.push(volume.to_string());
          }
        }
      }
    }
    for volume in &preserved {
      exec.preserve(volume)?;
    }

    if !copies.is_empty() {
      exec.copy(&self.excludes, &copies)?;
    }

    if !no_runs_only {
      for run in &runs {
        let mut config = self.run_config.clone();
        config.env = step.env.clone();
        exec.run(run, &config)?;
      }
    }

    Ok(())
  }

  /// Declared args with known values, as `KEY=VALUE` in declaration
  /// order. Declared-but-unset args are omitted.
  pub fn arguments(&self) -> Vec<String> {
    self
      .declared_args
      .iter()
      .filter_map(|name| {
        self.args.get(name).map(|value| format!("{}={}", name, value))
      })
      .collect()
  }

  /// The accumulated image configuration.
  pub fn config(&self) -> &ImageConfig {
    &self.run_config
  }

  /// The author recorded by `MAINTAINER`, if any.
  pub fn author(&self) -> Option<&str> {
    self.author.as_deref()
  }

  /// The `--platform` flag from this stage's `FROM`, if any.
  pub fn platform(&self) -> Option<&str> {
    self.platform.as_deref()
  }

  /// The declared volume prefixes tracked so far.
  pub fn volumes(&self) -> &VolumeSet {
    &self.volumes
  }
}

fn host_platform_args() -> HashMap<String, String> {
  let os = std::env::consts::OS;
  let arch = normalize_arch(std::env::consts::ARCH);
  let platform = format!("{}/{}", os, arch);

  let mut args = HashMap::new();
  for (key, value) in &[
    ("TARGETOS", os),
    ("TARGETARCH", arch),
    ("TARGETVARIANT", ""),
    ("TARGETPLATFORM", platform.as_str()),
    ("BUILDOS", os),
    ("BUILDARCH", arch),
    ("BUILDVARIANT", ""),
    ("BUILDPLATFORM", platform.as_str()),
  ] {
    args.insert(key.to_string(), value.to_string());
  }

  args
}

/// Maps Rust's architecture names onto the container platform convention.
pub(crate) fn normalize_arch(arch: &str) -> &str {
  match arch {
    "x86_64" => "amd64",
    "aarch64" => "arm64",
    "x86" => "386",
    "powerpc64" => "ppc64le",
    other => other
  }
}

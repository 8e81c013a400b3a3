// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use lazy_static::lazy_static;
use regex::Regex;

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::no_flags;

/// `USER <user>[:<group>]`
pub(crate) fn dispatch_user(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.len() != 1 {
    return instruction_error("USER requires exactly one argument");
  }

  builder.run_config.user = step.args[0].clone();
  Ok(())
}

/// `WORKDIR <path>`; a relative path joins onto the previous working
/// directory.
pub(crate) fn dispatch_workdir(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.len() != 1 {
    return instruction_error("WORKDIR requires exactly one argument");
  }

  let path = &step.args[0];
  builder.run_config.working_dir = if path.starts_with('/') {
    clean_path(path)
  } else {
    clean_path(&format!("{}/{}", builder.run_config.working_dir, path))
  };

  Ok(())
}

/// `VOLUME <path> ...`; each path lands in the config and the builder's
/// tracked volume set.
pub(crate) fn dispatch_volume(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.is_empty() {
    return at_least_one_argument("VOLUME");
  }

  for path in &step.args {
    let path = path.trim();
    if path.is_empty() {
      return instruction_error("VOLUME specified can not be an empty string");
    }

    builder.run_config.volumes.insert(path.to_string());
    builder.pending_volumes.push(path.to_string());
  }

  Ok(())
}

/// `STOPSIGNAL <signal>`
pub(crate) fn dispatch_stopsignal(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.len() != 1 {
    return instruction_error("STOPSIGNAL requires exactly one argument");
  }

  builder.run_config.stop_signal = step.args[0].clone();
  Ok(())
}

/// `ONBUILD <instruction>`; the trigger is recorded verbatim for
/// downstream builds.
pub(crate) fn dispatch_onbuild(builder: &mut Builder, step: &Step) -> Result<()> {
  lazy_static! {
    static ref ONBUILD_PREFIX: Regex = Regex::new(r"(?i)^\s*ONBUILD\s*").unwrap();
  }

  no_flags(step)?;
  let trigger = match step.args.first() {
    Some(trigger) => trigger.to_uppercase(),
    None => return at_least_one_argument("ONBUILD")
  };

  match trigger.as_str() {
    "ONBUILD" => {
      return instruction_error("chaining ONBUILD via `ONBUILD ONBUILD` isn't allowed")
    },
    "FROM" | "MAINTAINER" => {
      return instruction_error(format!(
        "{} isn't allowed as an ONBUILD trigger",
        trigger
      ))
    },
    _ => ()
  }

  let recorded = ONBUILD_PREFIX.replace(&step.original, "").into_owned();
  builder.run_config.on_build.push(recorded);
  Ok(())
}

/// Resolves `.` and `..` components and collapses slashes into an
/// absolute path.
fn clean_path(path: &str) -> String {
  let mut parts: Vec<&str> = Vec::new();

  for part in path.split('/') {
    match part {
      "" | "." => (),
      ".." => {
        parts.pop();
      },
      part => parts.push(part)
    }
  }

  format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::clean_path;
  use crate::builder::Builder;
  use crate::executor::NoopExecutor;
  use crate::parser::parse_dockerfile;

  fn build(dockerfile: &str) -> crate::error::Result<Builder> {
    let mut node = parse_dockerfile(dockerfile.as_bytes()).unwrap();
    let mut builder = Builder::default();
    builder.resolve_from(&mut node).unwrap();
    for child in &node.children {
      let mut step = builder.step();
      step.resolve(child)?;
      builder.run(&step, &mut NoopExecutor, false)?;
    }
    Ok(builder)
  }

  #[test]
  fn workdir_joins_relative_paths() {
    let builder = build("FROM busybox\nWORKDIR /test\nWORKDIR subdir\n").unwrap();
    assert_eq!(builder.config().working_dir, "/test/subdir");

    let builder = build("FROM busybox\nWORKDIR /a\nWORKDIR /b\n").unwrap();
    assert_eq!(builder.config().working_dir, "/b");
  }

  #[test]
  fn workdir_from_scratch_is_absolute() {
    let builder = build("FROM busybox\nWORKDIR relative\n").unwrap();
    assert_eq!(builder.config().working_dir, "/relative");
  }

  #[test]
  fn clean_path_handles_dots() {
    assert_eq!(clean_path("/a/./b//c/../d"), "/a/b/d");
    assert_eq!(clean_path("/"), "/");
    assert_eq!(clean_path("/a/.."), "/");
  }

  #[test]
  fn user_and_stopsignal_are_scalars() {
    let builder = build("FROM busybox\nUSER docker:root\nSTOPSIGNAL SIGTERM\n").unwrap();
    assert_eq!(builder.config().user, "docker:root");
    assert_eq!(builder.config().stop_signal, "SIGTERM");
  }

  #[test]
  fn volumes_land_in_config_and_set() {
    let builder = build("FROM busybox\nVOLUME /test /test2\nVOLUME [\"/test3/test\"]\n").unwrap();

    let volumes: Vec<&str> = builder
      .config()
      .volumes
      .iter()
      .map(String::as_str)
      .collect();
    assert_eq!(volumes, vec!["/test", "/test2", "/test3/test"]);

    assert!(builder.volumes().covers("/test2/sub"));
    assert!(!builder.volumes().covers("/test3"));
  }

  #[test]
  fn onbuild_records_verbatim() {
    let builder = build(
      "FROM busybox\nONBUILD RUN [\"echo\", \"test\"]\nONBUILD RUN echo test\nONBUILD COPY . /\n"
    ).unwrap();

    assert_eq!(
      builder.config().on_build,
      vec![
        "RUN [\"echo\", \"test\"]".to_string(),
        "RUN echo test".to_string(),
        "COPY . /".to_string()
      ]
    );
  }

  #[test]
  fn onbuild_rejects_forbidden_triggers() {
    assert!(build("FROM busybox\nONBUILD ONBUILD RUN echo\n").is_err());
    assert!(build("FROM busybox\nONBUILD FROM alpine\n").is_err());
    assert!(build("FROM busybox\nONBUILD MAINTAINER x\n").is_err());
  }
}

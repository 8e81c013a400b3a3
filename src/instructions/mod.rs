// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Per-instruction dispatch handlers.
//!
//! Each handler mutates the builder's image configuration and may queue
//! copy or run work; the builder flushes that work to the executor after
//! dispatch.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::builder::{Builder, Step};
use crate::error::*;

mod arg;
mod cmd;
mod copy;
mod entrypoint;
mod env;
mod expose;
mod from;
mod healthcheck;
mod label;
mod misc;
mod run;

pub(crate) type StepFn = fn(&mut Builder, &Step) -> Result<()>;

lazy_static! {
  /// Keyword to handler mapping; anything absent here is an unrecognized
  /// instruction.
  pub(crate) static ref EVALUATE_TABLE: HashMap<&'static str, StepFn> = {
    let mut table: HashMap<&'static str, StepFn> = HashMap::new();
    table.insert("from", from::dispatch_from);
    table.insert("arg", arg::dispatch_arg);
    table.insert("env", env::dispatch_env);
    table.insert("label", label::dispatch_label);
    table.insert("maintainer", label::dispatch_maintainer);
    table.insert("expose", expose::dispatch_expose);
    table.insert("run", run::dispatch_run);
    table.insert("cmd", cmd::dispatch_cmd);
    table.insert("entrypoint", entrypoint::dispatch_entrypoint);
    table.insert("shell", entrypoint::dispatch_shell);
    table.insert("copy", copy::dispatch_copy);
    table.insert("add", copy::dispatch_add);
    table.insert("healthcheck", healthcheck::dispatch_healthcheck);
    table.insert("user", misc::dispatch_user);
    table.insert("workdir", misc::dispatch_workdir);
    table.insert("volume", misc::dispatch_volume);
    table.insert("stopsignal", misc::dispatch_stopsignal);
    table.insert("onbuild", misc::dispatch_onbuild);
    table
  };
}

/// Exec-form args pass through unchanged; shell-form args collapse to a
/// single command line.
pub(crate) fn handle_json_args(step: &Step) -> Vec<String> {
  if step.attrs.contains("json") {
    step.args.clone()
  } else if step.args.is_empty() {
    Vec::new()
  } else {
    vec![step.args.join(" ")]
  }
}

/// Rejects builder flags on instructions that take none.
pub(crate) fn no_flags(step: &Step) -> Result<()> {
  match step.flags.first() {
    Some(flag) => instruction_error(format!(
      "{} does not support the {} flag",
      step.command.to_uppercase(),
      flag
    )),
    None => Ok(())
  }
}

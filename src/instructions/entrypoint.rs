// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::{handle_json_args, no_flags};

/// `ENTRYPOINT <command>` or `ENTRYPOINT ["exec", "form"]`.
///
/// Setting an entrypoint clears any `CMD` inherited from the base image,
/// but not one set earlier in this stage.
pub(crate) fn dispatch_entrypoint(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;

  let mut entrypoint = handle_json_args(step);
  if !step.attrs.contains("json") && !entrypoint.is_empty() {
    let mut wrapped = builder.run_config.shell_or_default();
    wrapped.append(&mut entrypoint);
    entrypoint = wrapped;
  }

  builder.run_config.entrypoint = if entrypoint.is_empty() {
    None
  } else {
    Some(entrypoint)
  };

  if !builder.cmd_set {
    builder.run_config.cmd = None;
  }

  Ok(())
}

/// `SHELL ["executable", "flags"]`; replaces the wrapper used for
/// shell-form commands. Only the JSON form is accepted.
pub(crate) fn dispatch_shell(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;

  if !step.attrs.contains("json") {
    return instruction_error("SHELL requires the arguments to be in JSON form");
  }
  if step.args.is_empty() {
    return at_least_one_argument("SHELL");
  }

  builder.run_config.shell = step.args.clone();
  Ok(())
}

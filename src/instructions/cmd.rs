// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::{handle_json_args, no_flags};

/// `CMD <command>` or `CMD ["exec", "form"]`.
///
/// Shell form is wrapped with the stage's `SHELL` at dispatch time.
pub(crate) fn dispatch_cmd(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;

  let mut cmd = handle_json_args(step);
  if !step.attrs.contains("json") {
    let mut wrapped = builder.run_config.shell_or_default();
    wrapped.append(&mut cmd);
    cmd = wrapped;
  }

  builder.run_config.cmd = Some(cmd);
  builder.cmd_set = true;

  Ok(())
}

// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Run, Step};
use crate::error::*;
use crate::instructions::handle_json_args;

/// `RUN <command>` or `RUN ["exec", "form"]`, with the `--mount=`,
/// `--network=` and `--security=` flags.
///
/// The command is queued; the builder hands it to the executor together
/// with a config snapshot after dispatch.
pub(crate) fn dispatch_run(builder: &mut Builder, step: &Step) -> Result<()> {
  if builder.run_config.image.is_empty() && !builder.image_seeded {
    return instruction_error("please provide a source image with `from` prior to run");
  }

  let mut mounts = Vec::new();
  let mut network = None;
  let mut security = None;

  for flag in &step.flags {
    if let Some(value) = flag.strip_prefix("--mount=") {
      mounts.push(value.to_string());
    } else if let Some(value) = flag.strip_prefix("--network=") {
      network = Some(value.to_string());
    } else if let Some(value) = flag.strip_prefix("--security=") {
      security = Some(value.to_string());
    } else {
      return instruction_error(format!(
        "RUN only supports the --mount, --network and --security flags, got {}",
        flag
      ));
    }
  }

  let shell = !step.attrs.contains("json");
  let args = handle_json_args(step);
  if args.is_empty() {
    return at_least_one_argument("RUN");
  }

  builder.pending_runs.push(Run {
    shell,
    args,
    mounts,
    network,
    security,
    heredocs: step.heredocs.clone()
  });

  Ok(())
}

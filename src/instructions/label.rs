// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::no_flags;

/// `LABEL KEY=VALUE ...`
pub(crate) fn dispatch_label(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.is_empty() {
    return at_least_one_argument("LABEL");
  }
  if step.args.len() % 2 != 0 {
    return instruction_error("bad input to LABEL, too many arguments");
  }

  for pair in step.args.chunks(2) {
    builder
      .run_config
      .labels
      .insert(pair[0].clone(), pair[1].clone());
  }

  Ok(())
}

/// `MAINTAINER <author>` is deprecated; the author is recorded on the
/// builder and nothing else happens.
pub(crate) fn dispatch_maintainer(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.is_empty() {
    return at_least_one_argument("MAINTAINER");
  }

  builder.author = Some(step.args[0].clone());
  Ok(())
}

// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::no_flags;

/// `ENV KEY=VALUE ...` (or the legacy `ENV KEY VALUE`).
///
/// Each key keeps the position of its first assignment; reassignment
/// updates the existing entry in place.
pub(crate) fn dispatch_env(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.is_empty() {
    return at_least_one_argument("ENV");
  }
  if step.args.len() % 2 != 0 {
    // the parser emits alternating keys and values
    return instruction_error("bad input to ENV, too many arguments");
  }

  for pair in step.args.chunks(2) {
    set_env(&mut builder.run_config.env, &pair[0], &pair[1]);
  }

  Ok(())
}

/// Sets or replaces `key` in an ordered `KEY=VALUE` list.
pub(crate) fn set_env(env: &mut Vec<String>, key: &str, value: &str) {
  let entry = format!("{}={}", key, value);

  for existing in env.iter_mut() {
    if existing.splitn(2, '=').next() == Some(key) {
      *existing = entry;
      return;
    }
  }

  env.push(entry);
}

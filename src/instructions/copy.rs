// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Copy, Step};
use crate::error::*;
use crate::shell::process_word;

/// `COPY [flags] <src>... <dest>`
pub(crate) fn dispatch_copy(builder: &mut Builder, step: &Step) -> Result<()> {
  let copy = parse_copy(step, "COPY")?;
  builder.pending_copies.push(copy);
  Ok(())
}

/// `ADD [flags] <src>... <dest>`; sources that look like URLs mark the
/// copy as a download.
pub(crate) fn dispatch_add(builder: &mut Builder, step: &Step) -> Result<()> {
  let mut copy = parse_copy(step, "ADD")?;
  copy.download = copy.src.iter().any(|src| is_url(src));
  builder.pending_copies.push(copy);
  Ok(())
}

fn is_url(src: &str) -> bool {
  src.starts_with("http://") || src.starts_with("https://")
}

fn parse_copy(step: &Step, instruction: &str) -> Result<Copy> {
  if step.args.len() < 2 {
    return at_least_two_arguments(instruction);
  }

  let mut copy = Copy {
    src: step.args[..step.args.len() - 1].to_vec(),
    dest: step.args[step.args.len() - 1].clone(),
    ..Copy::default()
  };

  for flag in &step.flags {
    // flag values participate in substitution like positional args
    let flag = process_word(flag, &step.env, step.escape)?;

    if let Some(value) = flag.strip_prefix("--from=") {
      copy.from = Some(value.to_string());
    } else if let Some(value) = flag.strip_prefix("--chown=") {
      copy.chown = Some(value.to_string());
    } else if let Some(value) = flag.strip_prefix("--chmod=") {
      copy.chmod = Some(value.to_string());
    } else if flag == "--link" {
      copy.link = true;
    } else if flag == "--parents" {
      copy.parents = true;
    } else if let Some(value) = flag.strip_prefix("--exclude=") {
      copy.excludes.push(value.to_string());
    } else {
      return instruction_error(format!(
        "{} only supports the --chmod=<permissions>, --chown=<uid:gid>, \
         --from=<image|stage>, --exclude=<pattern>, --link and --parents flags, got {}",
        instruction, flag
      ));
    }
  }

  Ok(copy)
}

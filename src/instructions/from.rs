// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::config::ImageConfig;
use crate::error::*;

/// `FROM <image> [AS <name>]`, optionally with `--platform=`.
///
/// Resets the stage configuration; args and environment declared before
/// this instruction survive only through the builder's heading scope.
pub(crate) fn dispatch_from(builder: &mut Builder, step: &Step) -> Result<()> {
  let image = match step.args.len() {
    1 => &step.args[0],
    3 if step.args[1].eq_ignore_ascii_case("as") => &step.args[0],
    _ => {
      return instruction_error(
        "FROM requires either one argument, or three: FROM <source> [AS <name>]"
      )
    }
  };

  for flag in &step.flags {
    match flag.strip_prefix("--platform=") {
      Some(platform) => builder.platform = Some(platform.to_string()),
      None => {
        return instruction_error(format!(
          "FROM only supports the --platform flag, got {}",
          flag
        ))
      }
    }
  }

  builder.run_config = ImageConfig {
    image: image.clone(),
    ..ImageConfig::default()
  };
  builder.cmd_set = false;
  builder.image_seeded = false;

  Ok(())
}

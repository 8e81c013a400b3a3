// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::config::{parse_duration, HealthConfig};
use crate::error::*;

/// `HEALTHCHECK NONE` or `HEALTHCHECK [flags] CMD <command>`.
///
/// Zero-valued durations and retries mean "inherit the runtime default".
pub(crate) fn dispatch_healthcheck(builder: &mut Builder, step: &Step) -> Result<()> {
  let kind = match step.args.first() {
    Some(kind) => kind.to_uppercase(),
    None => return at_least_one_argument("HEALTHCHECK")
  };

  match kind.as_str() {
    "NONE" => {
      if step.args.len() > 1 {
        return instruction_error("HEALTHCHECK NONE takes no arguments");
      }

      builder.run_config.healthcheck = Some(HealthConfig {
        test: vec!["NONE".to_string()],
        ..HealthConfig::default()
      });
    },

    "CMD" => {
      let cmd = &step.args[1..];
      if cmd.is_empty() || cmd[0].is_empty() {
        return instruction_error("HEALTHCHECK requires at least one argument");
      }

      let mut health = HealthConfig::default();
      for flag in &step.flags {
        if let Some(value) = flag.strip_prefix("--interval=") {
          health.interval = parse_duration(value)?;
        } else if let Some(value) = flag.strip_prefix("--timeout=") {
          health.timeout = parse_duration(value)?;
        } else if let Some(value) = flag.strip_prefix("--start-period=") {
          health.start_period = parse_duration(value)?;
        } else if let Some(value) = flag.strip_prefix("--start-interval=") {
          health.start_interval = parse_duration(value)?;
        } else if let Some(value) = flag.strip_prefix("--retries=") {
          health.retries = match value.parse() {
            Ok(retries) => retries,
            Err(_) => {
              return instruction_error(format!("invalid retry count {:?}", value))
            }
          };
        } else {
          return instruction_error(format!("unknown flag for HEALTHCHECK: {}", flag));
        }
      }

      health.test = if step.attrs.contains("json") {
        let mut test = vec!["CMD".to_string()];
        test.extend(cmd.iter().cloned());
        test
      } else {
        vec!["CMD-SHELL".to_string(), cmd[0].clone()]
      };

      builder.run_config.healthcheck = Some(health);
    },

    other => {
      return instruction_error(format!(
        "unknown type {:?} in HEALTHCHECK (try CMD)",
        other
      ))
    }
  }

  Ok(())
}

// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::*;

/// The default `PATH` seeded into stages built from a base image that does
/// not define one.
pub const DEFAULT_PATH: &str =
  "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Health check configuration set by `HEALTHCHECK`.
///
/// Zero durations and a zero retry count mean "inherit the runtime
/// default". The first element of `test` is `NONE`, `CMD` (exec form) or
/// `CMD-SHELL` (shell form).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
  #[serde(rename = "Test", default, skip_serializing_if = "Vec::is_empty")]
  pub test: Vec<String>,

  #[serde(rename = "Interval", default)]
  pub interval: Duration,

  #[serde(rename = "Timeout", default)]
  pub timeout: Duration,

  #[serde(rename = "StartPeriod", default)]
  pub start_period: Duration,

  #[serde(rename = "StartInterval", default)]
  pub start_interval: Duration,

  #[serde(rename = "Retries", default)]
  pub retries: u32
}

/// The mutable per-stage image configuration, mirroring a container
/// image's runtime config.
///
/// Scalar fields use the empty string for "unset" so a fresh config can be
/// compared structurally; `entrypoint` and `cmd` distinguish unset from an
/// explicit empty array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
  #[serde(rename = "Image", default, skip_serializing_if = "String::is_empty")]
  pub image: String,

  #[serde(rename = "User", default, skip_serializing_if = "String::is_empty")]
  pub user: String,

  #[serde(rename = "WorkingDir", default, skip_serializing_if = "String::is_empty")]
  pub working_dir: String,

  /// `KEY=VALUE` pairs ordered by first assignment; reassignment updates
  /// in place.
  #[serde(rename = "Env", default, skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<String>,

  #[serde(rename = "Labels", default, skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,

  /// `port/proto` specs, e.g. `8080/tcp`.
  #[serde(rename = "ExposedPorts", default, skip_serializing_if = "BTreeSet::is_empty")]
  pub exposed_ports: BTreeSet<String>,

  #[serde(rename = "Volumes", default, skip_serializing_if = "BTreeSet::is_empty")]
  pub volumes: BTreeSet<String>,

  #[serde(rename = "Entrypoint", default, skip_serializing_if = "Option::is_none")]
  pub entrypoint: Option<Vec<String>>,

  #[serde(rename = "Cmd", default, skip_serializing_if = "Option::is_none")]
  pub cmd: Option<Vec<String>>,

  /// The shell used to wrap shell-form commands; empty means the default
  /// `/bin/sh -c`.
  #[serde(rename = "Shell", default, skip_serializing_if = "Vec::is_empty")]
  pub shell: Vec<String>,

  #[serde(rename = "Healthcheck", default, skip_serializing_if = "Option::is_none")]
  pub healthcheck: Option<HealthConfig>,

  /// Raw instructions to be injected into downstream builds.
  #[serde(rename = "OnBuild", default, skip_serializing_if = "Vec::is_empty")]
  pub on_build: Vec<String>,

  #[serde(rename = "StopSignal", default, skip_serializing_if = "String::is_empty")]
  pub stop_signal: String
}

impl ImageConfig {
  /// The shell used to wrap shell-form commands, falling back to
  /// `/bin/sh -c`.
  pub fn shell_or_default(&self) -> Vec<String> {
    if self.shell.is_empty() {
      vec!["/bin/sh".to_string(), "-c".to_string()]
    } else {
      self.shell.clone()
    }
  }
}

/// Parses a duration flag value like `5s`, `300ms` or `1m30s`.
pub(crate) fn parse_duration(input: &str) -> Result<Duration> {
  lazy_static! {
    static ref SEGMENT: Regex =
      Regex::new(r"([0-9]+(?:\.[0-9]+)?)(ns|us|ms|s|m|h)").unwrap();
  }

  let mut total = 0.0_f64;
  let mut consumed = 0;

  for caps in SEGMENT.captures_iter(input) {
    let whole = caps.get(0).unwrap();
    if whole.start() != consumed {
      break;
    }
    consumed = whole.end();

    // the regex only admits digits and a dot here
    let value: f64 = caps[1].parse().unwrap();
    let scale = match &caps[2] {
      "ns" => 1e-9,
      "us" => 1e-6,
      "ms" => 1e-3,
      "s" => 1.0,
      "m" => 60.0,
      "h" => 3600.0,
      _ => unreachable!()
    };

    total += value * scale;
  }

  if consumed != input.len() || consumed == 0 {
    return instruction_error(format!("invalid duration {:?}", input));
  }

  Ok(Duration::from_secs_f64(total))
}

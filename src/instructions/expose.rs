// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Builder, Step};
use crate::error::*;
use crate::instructions::no_flags;

/// `EXPOSE <port>[/<proto>] ...`; the protocol defaults to tcp.
pub(crate) fn dispatch_expose(builder: &mut Builder, step: &Step) -> Result<()> {
  no_flags(step)?;
  if step.args.is_empty() {
    return at_least_one_argument("EXPOSE");
  }

  for port in &step.args {
    let spec = if port.contains('/') {
      port.clone()
    } else {
      format!("{}/tcp", port)
    };
    builder.run_config.exposed_ports.insert(spec);
  }

  Ok(())
}

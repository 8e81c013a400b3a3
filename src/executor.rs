// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use crate::builder::{Copy, Run, Step};
use crate::config::ImageConfig;
use crate::error::*;

/// The side-effect contract the builder drives.
///
/// The core never performs I/O itself: copies, command execution and
/// volume preservation are requested through this trait, one call per
/// piece of work, in instruction order. Every method defaults to a no-op
/// so implementations only override what they realize.
pub trait Executor {
  /// Called before a mutation that would land inside the declared volume
  /// at `path`.
  fn preserve(&mut self, path: &str) -> Result<()> {
    let _ = path;
    Ok(())
  }

  /// Ensures a destination directory exists inside the container.
  fn ensure_container_path(&mut self, path: &str) -> Result<()> {
    let _ = path;
    Ok(())
  }

  /// Like [`Executor::ensure_container_path`], with ownership and mode
  /// applied on creation.
  fn ensure_container_path_as(
    &mut self,
    path: &str,
    user: Option<&str>,
    mode: Option<u32>
  ) -> Result<()> {
    let _ = (path, user, mode);
    Ok(())
  }

  /// Performs one or more copy operations, honoring the exclusion
  /// patterns.
  fn copy(&mut self, excludes: &[String], copies: &[Copy]) -> Result<()> {
    let _ = (excludes, copies);
    Ok(())
  }

  /// Executes a command against a snapshot of the stage configuration.
  fn run(&mut self, run: &Run, config: &ImageConfig) -> Result<()> {
    let _ = (run, config);
    Ok(())
  }

  /// Policy hook for instructions the dispatch table does not know.
  fn unrecognized_instruction(&mut self, step: &Step) -> Result<()> {
    let _ = step;
    Ok(())
  }
}

/// An executor that records every call as a structured log event; useful
/// for dry runs.
pub struct LogExecutor;

impl Executor for LogExecutor {
  fn preserve(&mut self, path: &str) -> Result<()> {
    tracing::info!(path, "PRESERVE");
    Ok(())
  }

  fn ensure_container_path(&mut self, path: &str) -> Result<()> {
    tracing::info!(path, "ENSURE");
    Ok(())
  }

  fn ensure_container_path_as(
    &mut self,
    path: &str,
    user: Option<&str>,
    mode: Option<u32>
  ) -> Result<()> {
    tracing::info!(path, user, mode, "ENSURE");
    Ok(())
  }

  fn copy(&mut self, excludes: &[String], copies: &[Copy]) -> Result<()> {
    for copy in copies {
      tracing::info!(
        src = ?copy.src,
        dest = %copy.dest,
        download = copy.download,
        excludes = ?excludes,
        "COPY"
      );
    }
    Ok(())
  }

  fn run(&mut self, run: &Run, _config: &ImageConfig) -> Result<()> {
    tracing::info!(shell = run.shell, args = ?run.args, "RUN");
    Ok(())
  }

  fn unrecognized_instruction(&mut self, step: &Step) -> Result<()> {
    tracing::info!(instruction = %step.original, "SKIP");
    Ok(())
  }
}

/// An executor that accepts everything and does nothing.
pub struct NoopExecutor;

impl Executor for NoopExecutor {}

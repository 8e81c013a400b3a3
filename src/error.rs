// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

use std::path::PathBuf;

use snafu::Snafu;

/// An error raised while parsing or evaluating a Dockerfile.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
  #[snafu(display(
    "parse error on line {}: {}", line, message
  ))]
  ParseError {
    line: usize,
    message: String
  },

  #[snafu(display(
    "invalid JSON array on line {}: {}", line, source
  ))]
  JsonParseError {
    line: usize,
    source: serde_json::Error
  },

  #[snafu(display(
    "{}", message
  ))]
  InstructionError {
    message: String
  },

  #[snafu(display(
    "unknown instruction: {}", instruction
  ))]
  UnknownInstruction {
    instruction: String
  },

  #[snafu(display(
    "error unescaping string: {:?}", source
  ))]
  UnescapeError {
    source: enquote::Error
  },

  #[snafu(display(
    "could not read {}: {}", path.display(), source
  ))]
  ReadError {
    path: PathBuf,
    source: std::io::Error
  },

  #[snafu(display(
    "executor error: {}", message
  ))]
  ExecutorError {
    message: String
  }
}

/// A Dockerfile parsing and evaluation Result.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Helper to create an instruction error from a message.
pub(crate) fn instruction_error<T, S: Into<String>>(message: S) -> Result<T> {
  InstructionError { message: message.into() }.fail()
}

/// Helper for the common "X requires at least one argument" complaint.
pub(crate) fn at_least_one_argument<T>(instruction: &str) -> Result<T> {
  instruction_error(format!("{} requires at least one argument", instruction))
}

/// Helper for the common "X requires at least two arguments" complaint.
pub(crate) fn at_least_two_arguments<T>(instruction: &str) -> Result<T> {
  instruction_error(format!("{} requires at least two arguments", instruction))
}

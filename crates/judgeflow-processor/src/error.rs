//! Processor error types.

use std::path::PathBuf;

/// Errors raised while populating a [`crate::ProcessorRegistry`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
  /// A processor with this name is already registered.
  #[error("processor '{name}' is already registered")]
  AlreadyRegistered { name: String },
}

/// Errors from the sandbox collaborator itself (not from the program it ran).
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
  /// Opening a redirection target failed.
  #[error("failed to open '{path}': {source}")]
  Redirect {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The program could not be started.
  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Waiting for the program failed.
  #[error("failed to wait for '{program}': {source}")]
  Wait {
    program: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A resource limit line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitParseError {
  #[error("expected 7 limit values, found {found}")]
  MissingValues { found: usize },

  #[error("invalid limit value '{value}'")]
  InvalidValue { value: String },
}

/// A structured checker report could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
  #[error("failed to read report '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed checker report: {0}")]
  Malformed(#[from] quick_xml::DeError),
}

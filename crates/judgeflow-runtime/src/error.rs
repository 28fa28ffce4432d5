//! Runtime error types.

use judgeflow_config::DataGroup;

use crate::hash::ContentHash;

/// Errors raised by the content cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  /// A second value was stored under an existing key.
  #[error("cache entry {hash} is already set")]
  AlreadySet { hash: ContentHash },
}

/// Errors that abort a workflow run.
///
/// Processor failures are not errors: they are reported through the node's
/// [`judgeflow_processor::ExecutionResult`] and judged by the analyzer.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  /// An inbound field declared by the graph was not supplied.
  #[error("missing inbound field '{field}' in group '{group}'")]
  MissingInbound { group: DataGroup, field: String },

  /// The node graph has a cycle.
  #[error("graph is not a DAG, unresolved nodes: {}", nodes.join(", "))]
  NotADag { nodes: Vec<String> },

  /// A node became runnable with an unbound input slot.
  #[error("input '{label}' of node '{node}' is not fulfilled")]
  InputNotFulfilled { node: String, label: String },

  /// A node references a processor the runtime's registry does not have.
  #[error("node '{node}' uses unregistered processor '{processor}'")]
  UnknownProcessor { node: String, processor: String },

  /// An analyzer name did not resolve.
  #[error("analyzer not found: {0}")]
  UnknownAnalyzer(String),

  #[error(transparent)]
  Cache(#[from] CacheError),

  /// A node task panicked or was aborted.
  #[error("node task failed: {message}")]
  Join { message: String },

  /// Preparing the work directory failed.
  #[error("work directory error: {0}")]
  Io(#[from] std::io::Error),
}

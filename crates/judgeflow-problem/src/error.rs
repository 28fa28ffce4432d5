use std::path::PathBuf;

use judgeflow_config::DataGroup;
use judgeflow_runtime::RuntimeError;
use judgeflow_workflow::WorkflowError;

/// Errors from loading, validating or judging a problem.
#[derive(Debug, thiserror::Error)]
pub enum ProblemError {
  #[error("failed to read '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid problem manifest '{path}': {source}")]
  Manifest {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid workflow graph: {0}")]
  Workflow(#[from] WorkflowError),

  /// A test names a subtask that does not exist.
  #[error("test {test} refers to unknown subtask '{subtask}'")]
  UnknownSubtask { test: usize, subtask: String },

  /// A test in subtask mode has no `_subtaskid`.
  #[error("test {test} does not belong to any subtask")]
  MissingSubtaskId { test: usize },

  /// A test carries `_subtaskid` although the problem has no subtasks.
  #[error("test {test} has a subtask id but the problem has no subtasks")]
  UnexpectedSubtaskId { test: usize },

  #[error("subtask {index} has no '_subtaskid'")]
  UnnamedSubtask { index: usize },

  #[error("duplicate subtask id '{0}'")]
  DuplicateSubtask(String),

  #[error("invalid score '{value}'")]
  InvalidScore { value: String },

  /// The graph binds a field no table provides.
  #[error("graph binds unknown field '{field}' of group '{group}'")]
  UnknownField { group: DataGroup, field: String },

  #[error("submission field '{0}' was not supplied")]
  MissingSubmissionField(String),

  #[error("analyzer not found: {0}")]
  UnknownAnalyzer(String),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("node '{node}' uses unregistered processor '{processor}'")]
  UnknownProcessor { node: String, processor: String },

  #[error("processor '{processor}' of node '{node}' has no input labelled '{label}'")]
  UnknownInputLabel {
    node: String,
    processor: String,
    label: String,
  },

  #[error("processor '{processor}' of node '{node}' has no output labelled '{label}'")]
  UnknownOutputLabel {
    node: String,
    processor: String,
    label: String,
  },

  #[error("input '{label}' of node '{node}' is bound more than once")]
  MultiplyBound { node: String, label: String },

  #[error("input '{label}' of node '{node}' is not bound by any edge or inbound field")]
  Uncovered { node: String, label: String },

  #[error("graph contains a cycle through: {}", nodes.join(", "))]
  NotADag { nodes: Vec<String> },

  #[error("invalid graph definition: {0}")]
  InvalidDefinition(#[from] serde_json::Error),
}

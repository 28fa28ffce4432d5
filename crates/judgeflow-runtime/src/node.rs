use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use judgeflow_config::DataGroup;
use judgeflow_processor::{ExecutionResult, Status};

use crate::hash::ContentHash;

/// How a node's outputs came to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
  /// The processor ran in this run.
  Executed(ExecutionResult),
  /// Outputs were adopted from the cache; the result is the one recorded by
  /// the authoritative execution.
  Cached(ExecutionResult),
  /// Not run because an upstream node did not finish Ok.
  Skipped,
}

/// Per-run state of one graph node.
#[derive(Debug, Clone)]
pub struct RuntimeNode {
  pub name: String,
  pub processor: String,
  pub key: bool,
  pub inputs: Vec<Option<PathBuf>>,
  pub outputs: Vec<PathBuf>,
  pub hash: Option<ContentHash>,
  pub outcome: NodeOutcome,
}

impl RuntimeNode {
  /// Result of an execution performed in this run. `None` for cached and
  /// skipped nodes.
  pub fn result(&self) -> Option<&ExecutionResult> {
    match &self.outcome {
      NodeOutcome::Executed(result) => Some(result),
      _ => None,
    }
  }

  /// Status of the node, replayed from the cache for cached nodes.
  pub fn status(&self) -> Option<Status> {
    match &self.outcome {
      NodeOutcome::Executed(result) | NodeOutcome::Cached(result) => Some(result.status),
      NodeOutcome::Skipped => None,
    }
  }

  /// The authoritative result, fresh or cached.
  pub fn recorded_result(&self) -> Option<&ExecutionResult> {
    match &self.outcome {
      NodeOutcome::Executed(result) | NodeOutcome::Cached(result) => Some(result),
      NodeOutcome::Skipped => None,
    }
  }

  pub fn is_ok(&self) -> bool {
    self.status().is_some_and(|s| s.is_ok())
  }

  pub fn input(&self, slot: usize) -> Option<&Path> {
    self.inputs.get(slot).and_then(|p| p.as_deref())
  }

  pub fn output(&self, slot: usize) -> Option<&Path> {
    self.outputs.get(slot).map(PathBuf::as_path)
  }
}

/// Files supplied for a graph's inbound fields, by datagroup and field.
#[derive(Debug, Clone, Default)]
pub struct InboundPaths {
  groups: BTreeMap<DataGroup, BTreeMap<String, PathBuf>>,
}

impl InboundPaths {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, group: DataGroup, field: impl Into<String>, path: impl Into<PathBuf>) {
    self
      .groups
      .entry(group)
      .or_default()
      .insert(field.into(), path.into());
  }

  pub fn with(mut self, group: DataGroup, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    self.insert(group, field, path);
    self
  }

  pub fn get(&self, group: DataGroup, field: &str) -> Option<&Path> {
    self
      .groups
      .get(&group)
      .and_then(|fields| fields.get(field))
      .map(PathBuf::as_path)
  }
}

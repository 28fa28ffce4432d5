use std::path::{Path, PathBuf};

use judgeflow_config::{DataGroup, GraphDef};
use judgeflow_processor::ProcessorRegistry;
use judgeflow_workflow::WorkflowGraph;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::ProblemError;
use crate::score::{self, SubtaskPlan};
use crate::table::{Record, Table, is_private};

pub const MANIFEST_FILE: &str = "problem.json";
pub const GRAPH_FILE: &str = "workflow/graph.json";

/// Contents of `problem.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemManifest {
  pub full_score: f64,
  /// Analyzer name; the registry default when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analyzer: Option<String>,
  #[serde(default)]
  pub tests: Table,
  #[serde(default)]
  pub subtasks: Table,
  #[serde(default, rename = "static")]
  pub static_data: Record,
  /// Fields the contestant must supply.
  #[serde(default)]
  pub submission: Vec<String>,
}

impl ProblemManifest {
  pub fn is_subtask(&self) -> bool {
    !self.subtasks.fields.is_empty() && !self.subtasks.records.is_empty()
  }

  /// Whether `field` of `group` can be bound by a workflow graph.
  pub fn provides(&self, group: DataGroup, field: &str) -> bool {
    if is_private(field) {
      return false;
    }
    match group {
      DataGroup::Tests => self.tests.has_field(field),
      DataGroup::Subtask => self.is_subtask() && self.subtasks.has_field(field),
      DataGroup::Static => self.static_data.contains_key(field),
      DataGroup::Submission => self.submission.iter().any(|f| f == field),
    }
  }
}

/// A loaded and validated problem package.
#[derive(Debug)]
pub struct Problem {
  dir: PathBuf,
  manifest: ProblemManifest,
  graph: WorkflowGraph,
  plan: Vec<SubtaskPlan>,
}

impl Problem {
  /// Load `<dir>/problem.json` and `<dir>/workflow/graph.json`, resolving the
  /// graph against `registry`.
  #[instrument(name = "problem_load", skip(dir, registry), fields(dir = %dir.display()))]
  pub async fn load(dir: &Path, registry: &ProcessorRegistry) -> Result<Self, ProblemError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest: ProblemManifest = serde_json::from_str(&read(&manifest_path).await?)
      .map_err(|source| ProblemError::Manifest {
        path: manifest_path,
        source,
      })?;

    let graph_path = dir.join(GRAPH_FILE);
    let def = GraphDef::from_json(&read(&graph_path).await?)
      .map_err(judgeflow_workflow::WorkflowError::from)?;

    let problem = Self::from_parts(dir, manifest, &def, registry)?;
    debug!(
      tests = problem.manifest.tests.len(),
      subtasks = problem.plan.len(),
      "problem_loaded"
    );
    Ok(problem)
  }

  /// Build a problem from an in-memory manifest and graph definition.
  pub fn from_parts(
    dir: impl Into<PathBuf>,
    manifest: ProblemManifest,
    def: &GraphDef,
    registry: &ProcessorRegistry,
  ) -> Result<Self, ProblemError> {
    let graph = WorkflowGraph::resolve(def, registry)?;

    for (group, fields) in graph.inbound() {
      for field in fields.keys() {
        if !manifest.provides(*group, field) {
          return Err(ProblemError::UnknownField {
            group: *group,
            field: field.clone(),
          });
        }
      }
    }

    let plan = score::plan(&manifest)?;

    Ok(Self {
      dir: dir.into(),
      manifest,
      graph,
      plan,
    })
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn manifest(&self) -> &ProblemManifest {
    &self.manifest
  }

  pub fn graph(&self) -> &WorkflowGraph {
    &self.graph
  }

  /// Testcases grouped by subtask, in table order.
  pub fn plan(&self) -> &[SubtaskPlan] {
    &self.plan
  }

  pub fn is_subtask(&self) -> bool {
    self.manifest.is_subtask()
  }
}

async fn read(path: &Path) -> Result<String, ProblemError> {
  tokio::fs::read_to_string(path)
    .await
    .map_err(|source| ProblemError::Read {
      path: path.to_path_buf(),
      source,
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_manifest_json() {
    let manifest: ProblemManifest = serde_json::from_str(
      r#"{
        "full_score": 100,
        "tests": {
          "fields": ["input", "answer", "_score"],
          "records": [{"input": "1.in", "answer": "1.ans", "_score": "average"}]
        },
        "static": {"limit": "limit"},
        "submission": ["source"]
      }"#,
    )
    .unwrap();

    assert_eq!(manifest.full_score, 100.0);
    assert!(manifest.analyzer.is_none());
    assert!(!manifest.is_subtask());
    assert!(manifest.provides(DataGroup::Tests, "input"));
    assert!(manifest.provides(DataGroup::Static, "limit"));
    assert!(manifest.provides(DataGroup::Submission, "source"));
    assert!(!manifest.provides(DataGroup::Tests, "_score"));
    assert!(!manifest.provides(DataGroup::Subtask, "input"));
  }

  #[test]
  fn test_subtask_mode_needs_records() {
    let mut manifest: ProblemManifest =
      serde_json::from_str(r#"{"full_score": 100, "subtasks": {"fields": ["_subtaskid", "_score"]}}"#).unwrap();
    assert!(!manifest.is_subtask());

    manifest.subtasks.push([("_subtaskid", "a"), ("_score", "100")]);
    assert!(manifest.is_subtask());
  }
}

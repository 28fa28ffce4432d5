use judgeflow_config::{DataGroup, EdgeDef, GraphDef, InboundDef, NodeDef};
use judgeflow_processor::ProcessorRegistry;

use crate::error::WorkflowError;
use crate::workflow::WorkflowGraph;

/// Declarative graph construction.
///
/// Nothing is checked until [`Builder::build`], which resolves every
/// reference against the registry.
///
/// ```ignore
/// let graph = Builder::new()
///   .set_node("compile", "compiler", false)
///   .set_node("run", "runner:stdio", true)
///   .add_edge("compile", "result", "run", "executable")
///   .add_inbound(DataGroup::Submission, "source", "compile", "source")
///   .build(&registry)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
  def: GraphDef,
}

impl Builder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start from an existing definition.
  pub fn from_def(def: GraphDef) -> Self {
    Self { def }
  }

  /// Add a node, replacing any node of the same name.
  pub fn set_node(mut self, name: impl Into<String>, processor: impl Into<String>, key: bool) -> Self {
    self.def.nodes.insert(
      name.into(),
      NodeDef {
        processor: processor.into(),
        key,
      },
    );
    self
  }

  pub fn add_edge(
    mut self,
    from: impl Into<String>,
    from_label: impl Into<String>,
    to: impl Into<String>,
    to_label: impl Into<String>,
  ) -> Self {
    self.def.edges.push(EdgeDef {
      from: from.into(),
      from_label: from_label.into(),
      to: to.into(),
      to_label: to_label.into(),
    });
    self
  }

  pub fn add_inbound(
    mut self,
    group: DataGroup,
    field: impl Into<String>,
    to: impl Into<String>,
    to_label: impl Into<String>,
  ) -> Self {
    self.def.inbound.push(InboundDef {
      group,
      field: field.into(),
      to: to.into(),
      to_label: to_label.into(),
    });
    self
  }

  /// The definition built so far.
  pub fn def(&self) -> &GraphDef {
    &self.def
  }

  pub fn build(&self, registry: &ProcessorRegistry) -> Result<WorkflowGraph, WorkflowError> {
    WorkflowGraph::resolve(&self.def, registry)
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use async_trait::async_trait;
  use judgeflow_processor::{ExecutionResult, Labels, Processor};

  use super::*;

  struct Pass;

  #[async_trait]
  impl Processor for Pass {
    fn labels(&self) -> Labels {
      Labels::new(&["in"], &["out"])
    }

    async fn run(&self, _inputs: &[PathBuf], _outputs: &[PathBuf]) -> ExecutionResult {
      ExecutionResult::ok()
    }
  }

  struct Join;

  #[async_trait]
  impl Processor for Join {
    fn labels(&self) -> Labels {
      Labels::new(&["left", "right"], &["out"])
    }

    async fn run(&self, _inputs: &[PathBuf], _outputs: &[PathBuf]) -> ExecutionResult {
      ExecutionResult::ok()
    }
  }

  fn registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    registry.register("pass", Pass).unwrap();
    registry.register("join", Join).unwrap();
    registry
  }

  fn chain() -> Builder {
    Builder::new()
      .set_node("a", "pass", false)
      .set_node("b", "pass", true)
      .add_inbound(DataGroup::Submission, "source", "a", "in")
      .add_edge("a", "out", "b", "in")
  }

  #[test]
  fn test_build_chain() {
    let graph = chain().build(&registry()).unwrap();

    assert_eq!(graph.topological_order(), &["a".to_string(), "b".to_string()]);
    assert!(graph.node("b").unwrap().key);
    assert_eq!(graph.outgoing("a").count(), 1);
    assert_eq!(graph.inbound_nodes(DataGroup::Submission), vec!["a"]);
    assert!(graph.inbound_nodes(DataGroup::Tests).is_empty());
  }

  #[test]
  fn test_unregistered_processor() {
    let err = Builder::new()
      .set_node("a", "missing", false)
      .build(&registry())
      .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownProcessor { processor, .. } if processor == "missing"));
  }

  #[test]
  fn test_unknown_label() {
    let err = chain()
      .add_edge("a", "stdout", "b", "in")
      .build(&registry())
      .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownOutputLabel { label, .. } if label == "stdout"));

    let err = Builder::new()
      .set_node("a", "pass", false)
      .add_inbound(DataGroup::Static, "x", "a", "input")
      .build(&registry())
      .unwrap_err();
    assert!(matches!(err, WorkflowError::UnknownInputLabel { label, .. } if label == "input"));
  }

  #[test]
  fn test_unknown_node() {
    let err = chain()
      .add_edge("a", "out", "ghost", "in")
      .build(&registry())
      .unwrap_err();
    assert!(matches!(err, WorkflowError::NodeNotFound(name) if name == "ghost"));
  }

  #[test]
  fn test_uncovered_slot_rejected() {
    let err = Builder::new()
      .set_node("a", "pass", false)
      .set_node("j", "join", true)
      .add_inbound(DataGroup::Tests, "input", "a", "in")
      .add_edge("a", "out", "j", "left")
      .build(&registry())
      .unwrap_err();
    assert!(
      matches!(err, WorkflowError::Uncovered { node, label } if node == "j" && label == "right")
    );
  }

  #[test]
  fn test_doubly_covered_slot_rejected() {
    let err = chain()
      .add_inbound(DataGroup::Tests, "input", "b", "in")
      .build(&registry())
      .unwrap_err();
    assert!(
      matches!(err, WorkflowError::MultiplyBound { node, label } if node == "b" && label == "in")
    );
  }

  #[test]
  fn test_cycle_rejected() {
    let err = Builder::new()
      .set_node("a", "pass", false)
      .set_node("b", "pass", false)
      .add_edge("a", "out", "b", "in")
      .add_edge("b", "out", "a", "in")
      .build(&registry())
      .unwrap_err();
    assert!(matches!(err, WorkflowError::NotADag { nodes } if nodes == vec!["a", "b"]));
  }

  #[test]
  fn test_def_round_trip() {
    let graph = chain().build(&registry()).unwrap();
    assert_eq!(&graph.to_def(), chain().def());

    let json = graph.to_def().to_json().unwrap();
    let reparsed = WorkflowGraph::from_json(&json, &registry()).unwrap();
    assert_eq!(reparsed.topological_order(), graph.topological_order());
  }
}

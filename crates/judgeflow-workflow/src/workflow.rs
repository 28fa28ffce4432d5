use std::collections::BTreeMap;

use judgeflow_config::{DataGroup, EdgeDef, GraphDef, InboundDef, NodeDef};
use judgeflow_processor::{Labels, ProcessorRegistry};

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::resolver::resolve;

/// A graph node: the processor it runs, with labels resolved from the
/// registry at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  pub processor: String,
  pub key: bool,
  pub labels: Labels,
}

/// One slot of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef {
  pub node: String,
  pub slot: usize,
}

impl SlotRef {
  pub fn new(node: impl Into<String>, slot: usize) -> Self {
    Self {
      node: node.into(),
      slot,
    }
  }
}

/// Output slot `from` feeds input slot `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
  pub from: SlotRef,
  pub to: SlotRef,
}

/// Inbound bindings: datagroup -> field -> bound input slots.
pub type Inbound = BTreeMap<DataGroup, BTreeMap<String, Vec<SlotRef>>>;

/// A validated, immutable workflow graph.
///
/// Every input slot of every node is bound exactly once, every reference
/// resolves against the registry, and the node graph is acyclic.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
  pub(crate) nodes: BTreeMap<String, Node>,
  pub(crate) edges: Vec<Edge>,
  pub(crate) inbound: Inbound,
  pub(crate) graph: Graph,
  pub(crate) order: Vec<String>,
}

impl WorkflowGraph {
  /// Validate a definition against `registry`.
  pub fn resolve(def: &GraphDef, registry: &ProcessorRegistry) -> Result<Self, WorkflowError> {
    resolve(def, registry)
  }

  /// Parse and validate a JSON graph definition.
  pub fn from_json(json: &str, registry: &ProcessorRegistry) -> Result<Self, WorkflowError> {
    let def = GraphDef::from_json(json)?;
    resolve(&def, registry)
  }

  pub fn nodes(&self) -> &BTreeMap<String, Node> {
    &self.nodes
  }

  pub fn node(&self, name: &str) -> Option<&Node> {
    self.nodes.get(name)
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  /// Edges leaving `node`.
  pub fn outgoing<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
    self.edges.iter().filter(move |e| e.from.node == node)
  }

  pub fn inbound(&self) -> &Inbound {
    &self.inbound
  }

  /// Node names whose inputs are fed directly from `group`.
  pub fn inbound_nodes(&self, group: DataGroup) -> Vec<&str> {
    let mut nodes: Vec<&str> = self
      .inbound
      .get(&group)
      .into_iter()
      .flat_map(|fields| fields.values().flatten())
      .map(|slot| slot.node.as_str())
      .collect();
    nodes.sort_unstable();
    nodes.dedup();
    nodes
  }

  /// Node-level adjacency.
  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// A stable topological order of node names.
  pub fn topological_order(&self) -> &[String] {
    &self.order
  }

  /// Convert back to a serializable definition.
  pub fn to_def(&self) -> GraphDef {
    let input_label = |slot: &SlotRef| {
      self
        .nodes
        .get(&slot.node)
        .and_then(|n| n.labels.inputs.get(slot.slot))
        .map(|l| l.to_string())
        .unwrap_or_default()
    };
    let output_label = |slot: &SlotRef| {
      self
        .nodes
        .get(&slot.node)
        .and_then(|n| n.labels.outputs.get(slot.slot))
        .map(|l| l.to_string())
        .unwrap_or_default()
    };

    GraphDef {
      nodes: self
        .nodes
        .iter()
        .map(|(name, node)| {
          (
            name.clone(),
            NodeDef {
              processor: node.processor.clone(),
              key: node.key,
            },
          )
        })
        .collect(),
      edges: self
        .edges
        .iter()
        .map(|edge| EdgeDef {
          from: edge.from.node.clone(),
          from_label: output_label(&edge.from),
          to: edge.to.node.clone(),
          to_label: input_label(&edge.to),
        })
        .collect(),
      inbound: self
        .inbound
        .iter()
        .flat_map(|(group, fields)| {
          fields.iter().flat_map(move |(field, slots)| {
            slots.iter().map(move |slot| (*group, field, slot))
          })
        })
        .map(|(group, field, slot)| InboundDef {
          group,
          field: field.clone(),
          to: slot.node.clone(),
          to_label: input_label(slot),
        })
        .collect(),
    }
  }
}

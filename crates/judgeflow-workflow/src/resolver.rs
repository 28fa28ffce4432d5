use std::collections::{BTreeMap, HashSet};

use judgeflow_config::GraphDef;
use judgeflow_processor::ProcessorRegistry;

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::workflow::{Edge, Inbound, Node, SlotRef, WorkflowGraph};

/// Validate a graph definition against the registry and lock it.
pub(crate) fn resolve(
  def: &GraphDef,
  registry: &ProcessorRegistry,
) -> Result<WorkflowGraph, WorkflowError> {
  let mut nodes = BTreeMap::new();
  for (name, node) in &def.nodes {
    let labels = registry
      .labels(&node.processor)
      .ok_or_else(|| WorkflowError::UnknownProcessor {
        node: name.clone(),
        processor: node.processor.clone(),
      })?;
    nodes.insert(
      name.clone(),
      Node {
        processor: node.processor.clone(),
        key: node.key,
        labels,
      },
    );
  }

  let mut bound: HashSet<SlotRef> = HashSet::new();

  let mut edges = Vec::with_capacity(def.edges.len());
  for edge in &def.edges {
    let from = output_slot(&nodes, &edge.from, &edge.from_label)?;
    let to = input_slot(&nodes, &edge.to, &edge.to_label)?;
    bind(&mut bound, &to, &edge.to_label)?;
    edges.push(Edge { from, to });
  }

  let mut inbound: Inbound = BTreeMap::new();
  for binding in &def.inbound {
    let to = input_slot(&nodes, &binding.to, &binding.to_label)?;
    bind(&mut bound, &to, &binding.to_label)?;
    inbound
      .entry(binding.group)
      .or_default()
      .entry(binding.field.clone())
      .or_default()
      .push(to);
  }

  for (name, node) in &nodes {
    for (slot, label) in node.labels.inputs.iter().enumerate() {
      if !bound.contains(&SlotRef::new(name.clone(), slot)) {
        return Err(WorkflowError::Uncovered {
          node: name.clone(),
          label: label.to_string(),
        });
      }
    }
  }

  let graph = Graph::new(
    nodes.keys(),
    edges
      .iter()
      .map(|e| (e.from.node.as_str(), e.to.node.as_str())),
  );
  let order = graph
    .topological_order()
    .map_err(|nodes| WorkflowError::NotADag { nodes })?;

  Ok(WorkflowGraph {
    nodes,
    edges,
    inbound,
    graph,
    order,
  })
}

fn output_slot(
  nodes: &BTreeMap<String, Node>,
  name: &str,
  label: &str,
) -> Result<SlotRef, WorkflowError> {
  let node = nodes
    .get(name)
    .ok_or_else(|| WorkflowError::NodeNotFound(name.to_string()))?;
  let slot = node
    .labels
    .output_index(label)
    .ok_or_else(|| WorkflowError::UnknownOutputLabel {
      node: name.to_string(),
      processor: node.processor.clone(),
      label: label.to_string(),
    })?;
  Ok(SlotRef::new(name, slot))
}

fn input_slot(
  nodes: &BTreeMap<String, Node>,
  name: &str,
  label: &str,
) -> Result<SlotRef, WorkflowError> {
  let node = nodes
    .get(name)
    .ok_or_else(|| WorkflowError::NodeNotFound(name.to_string()))?;
  let slot = node
    .labels
    .input_index(label)
    .ok_or_else(|| WorkflowError::UnknownInputLabel {
      node: name.to_string(),
      processor: node.processor.clone(),
      label: label.to_string(),
    })?;
  Ok(SlotRef::new(name, slot))
}

fn bind(bound: &mut HashSet<SlotRef>, slot: &SlotRef, label: &str) -> Result<(), WorkflowError> {
  if !bound.insert(slot.clone()) {
    return Err(WorkflowError::MultiplyBound {
      node: slot.node.clone(),
      label: label.to_string(),
    });
  }
  Ok(())
}

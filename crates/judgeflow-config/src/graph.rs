use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::group::DataGroup;

/// A node definition: which processor the node runs and whether it is a key
/// node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDef {
  /// Registered processor name, e.g. `"runner:stdio"`.
  pub processor: String,
  /// Key nodes contribute time/memory totals and primary evidence.
  #[serde(default)]
  pub key: bool,
}

/// An edge from an output slot of one node to an input slot of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDef {
  pub from: String,
  pub from_label: String,
  pub to: String,
  pub to_label: String,
}

/// A binding from a datagroup field to a node's input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundDef {
  pub group: DataGroup,
  pub field: String,
  pub to: String,
  pub to_label: String,
}

/// Serializable workflow graph definition.
///
/// ```json
/// {
///   "nodes": {
///     "compile": { "processor": "compiler" },
///     "run": { "processor": "runner:stdio", "key": true }
///   },
///   "edges": [
///     { "from": "compile", "from_label": "result", "to": "run", "to_label": "executable" }
///   ],
///   "inbound": [
///     { "group": "submission", "field": "source", "to": "compile", "to_label": "source" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDef {
  #[serde(default)]
  pub nodes: BTreeMap<String, NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
  #[serde(default)]
  pub inbound: Vec<InboundDef>,
}

impl GraphDef {
  /// Parse a definition from JSON.
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Serialize the definition as pretty JSON.
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_key_defaults_to_false() {
    let def = GraphDef::from_json(
      r#"{
        "nodes": { "check": { "processor": "checker:hcmp" } },
        "inbound": [
          { "group": "tests", "field": "answer", "to": "check", "to_label": "ans" }
        ]
      }"#,
    )
    .unwrap();

    assert!(!def.nodes["check"].key);
    assert!(def.edges.is_empty());
    assert_eq!(def.inbound[0].group, DataGroup::Tests);
  }

  #[test]
  fn test_unknown_group_is_rejected() {
    let result = GraphDef::from_json(
      r#"{ "inbound": [ { "group": "testcase", "field": "input", "to": "run", "to_label": "stdin" } ] }"#,
    );
    assert!(result.is_err());
  }
}

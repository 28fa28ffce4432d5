//! Judgeflow Config
//!
//! This crate contains the serializable workflow configuration types for judgeflow.
//! These types describe a judging pipeline before it is checked against a
//! processor registry and turned into a validated `WorkflowGraph`.
//!
//! Definitions can be loaded from:
//! - `workflow/graph.json` inside a problem package
//! - the CLI (`judgeflow graph validate <file>`)
//!
//! Slots are referenced by label here. Label-to-index resolution happens when
//! the definition is validated, so a definition stays readable when a
//! processor's slot order changes.

mod graph;
mod group;

pub use graph::{EdgeDef, GraphDef, InboundDef, NodeDef};
pub use group::{DataGroup, ParseDataGroupError};

//! Judgeflow Workflow
//!
//! This crate provides the validated workflow graph. A [`WorkflowGraph`] is
//! built from a [`judgeflow_config::GraphDef`] (directly or through the
//! [`Builder`]) by resolving it against a
//! [`judgeflow_processor::ProcessorRegistry`].
//!
//! Guarantees of a built graph:
//! - Every node runs a registered processor, with labels resolved to slots
//! - Every input slot is bound by exactly one edge or inbound field
//! - The node graph is acyclic, with a stable topological order

mod builder;
mod error;
mod graph;
mod resolver;
mod workflow;

pub use builder::Builder;
pub use error::WorkflowError;
pub use graph::Graph;
pub use workflow::{Edge, Inbound, Node, SlotRef, WorkflowGraph};

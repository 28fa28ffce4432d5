//! Execution events and notifiers for observability.
//!
//! Events are emitted while a workflow runs so consumers can follow progress,
//! stream it to a UI or record it.

use judgeflow_processor::Status;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::hash::ContentHash;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, Serialize)]
pub enum ExecutionEvent {
  /// A run has started.
  RunStarted { run_id: String },

  /// A node has been dispatched.
  NodeStarted { run_id: String, node: String },

  /// A node's outputs were taken from the cache.
  NodeCached {
    run_id: String,
    node: String,
    hash: ContentHash,
  },

  /// A node was not run because an upstream node did not finish Ok.
  NodeSkipped { run_id: String, node: String },

  /// A node has been executed.
  NodeCompleted {
    run_id: String,
    node: String,
    status: Status,
  },

  /// Every node has completed or been skipped.
  RunCompleted { run_id: String },

  /// The run was aborted.
  RunFailed { run_id: String, error: String },
}

/// Trait for receiving execution events.
///
/// The runtime calls `notify` for each event; implementations decide what to
/// do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the scheduler. Volume is a few
  // events per node.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}

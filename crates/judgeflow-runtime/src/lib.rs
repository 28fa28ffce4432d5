//! Judgeflow Runtime
//!
//! Executes validated workflow graphs and judges the outcome.
//!
//! - [`Runtime`] schedules nodes as their dependencies finish, bounded by a
//!   shared worker pool, and wires outputs to downstream inputs
//! - [`ContentCache`] memoizes executions by [`ContentHash`] of their inputs,
//!   single-flight, so each (processor, input contents) pair runs once
//! - [`Analyzer`] implementations reduce the executed nodes to a
//!   [`JudgeResult`]; [`DefaultAnalyzer`] is registered as `"default"`

mod analyzer;
mod cache;
mod error;
mod events;
mod hash;
mod node;
mod result;
mod runtime;

pub use analyzer::{AnalysisInput, Analyzer, AnalyzerRegistry, DefaultAnalyzer};
pub use cache::{CacheEntry, ContentCache};
pub use error::{CacheError, RuntimeError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use hash::ContentHash;
pub use node::{InboundPaths, NodeOutcome, RuntimeNode};
pub use result::{FileDisplay, JudgeResult, Verdict};
pub use runtime::{Runtime, RuntimeConfig};

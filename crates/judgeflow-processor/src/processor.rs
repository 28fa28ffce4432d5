use std::path::PathBuf;

use async_trait::async_trait;

use crate::result::ExecutionResult;

/// Declared input and output slot names of a processor, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
  pub inputs: &'static [&'static str],
  pub outputs: &'static [&'static str],
}

impl Labels {
  pub const fn new(inputs: &'static [&'static str], outputs: &'static [&'static str]) -> Self {
    Self { inputs, outputs }
  }

  /// Index of an input slot by exact label match.
  pub fn input_index(&self, label: &str) -> Option<usize> {
    self.inputs.iter().position(|l| *l == label)
  }

  /// Index of an output slot by exact label match.
  pub fn output_index(&self, label: &str) -> Option<usize> {
    self.outputs.iter().position(|l| *l == label)
  }
}

/// How a checker reports its accept/reject decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerReport {
  /// The status code is the decision: `ExitError` means wrong answer.
  ExitStatus,
  /// A testlib XML report is written to the given output slot.
  TestlibXml { slot: usize },
}

/// Coarse role of a processor, used by analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
  Compiler,
  Runner,
  Checker(CheckerReport),
  Generator,
  Other,
}

/// A processing step with a fixed number of file inputs and outputs.
///
/// `run` must only depend on the contents of `inputs`: the runtime memoizes
/// executions by input content, so hidden state breaks caching.
#[async_trait]
pub trait Processor: Send + Sync {
  /// Input and output slot names.
  fn labels(&self) -> Labels;

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Other
  }

  /// Run the processor. `inputs` and `outputs` have exactly as many entries
  /// as the declared labels.
  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult;
}

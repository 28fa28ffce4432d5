//! Reduction of executed nodes into a verdict and score.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use judgeflow_config::DataGroup;
use judgeflow_processor::{
  CheckerReport, ProcessorKind, ProcessorRegistry, Status, TestlibReport,
};
use judgeflow_workflow::WorkflowGraph;
use tracing::debug;

use crate::node::RuntimeNode;
use crate::result::{FileDisplay, JudgeResult, Verdict};

/// Everything an analyzer may look at.
pub struct AnalysisInput<'a> {
  pub graph: &'a WorkflowGraph,
  /// Nodes in completion order, which varies between runs.
  pub nodes: &'a [RuntimeNode],
  pub full_score: f64,
  pub registry: &'a ProcessorRegistry,
  /// Maximum bytes shown per evidence file.
  pub excerpt_len: usize,
}

/// Turns a finished run into a [`JudgeResult`].
#[async_trait]
pub trait Analyzer: Send + Sync {
  async fn analyze(&self, input: &AnalysisInput<'_>) -> JudgeResult;
}

/// Analyzers by name. `"default"` is always present.
#[derive(Clone)]
pub struct AnalyzerRegistry {
  analyzers: HashMap<String, Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
  pub const DEFAULT: &'static str = "default";

  pub fn new() -> Self {
    let mut analyzers: HashMap<String, Arc<dyn Analyzer>> = HashMap::new();
    analyzers.insert(Self::DEFAULT.to_string(), Arc::new(DefaultAnalyzer));
    Self { analyzers }
  }

  /// Register an analyzer, replacing any previous one of the same name.
  pub fn register(&mut self, name: impl Into<String>, analyzer: impl Analyzer + 'static) {
    self.analyzers.insert(name.into(), Arc::new(analyzer));
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
    self.analyzers.get(name).cloned()
  }
}

impl Default for AnalyzerRegistry {
  fn default() -> Self {
    Self::new()
  }
}

/// The stock analyzer.
///
/// The first failing node in topological order decides the verdict. Failures
/// reachable from the submission are blamed on the contestant; anything else
/// is a system error. Checkers that reject (by exit status or by testlib
/// report) give Wrong Answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAnalyzer;

impl DefaultAnalyzer {
  fn kind(input: &AnalysisInput<'_>, node: &RuntimeNode) -> ProcessorKind {
    input
      .registry
      .get(&node.processor)
      .map(|p| p.kind())
      .unwrap_or(ProcessorKind::Other)
  }

  async fn node_files(input: &AnalysisInput<'_>, node: &RuntimeNode) -> Vec<FileDisplay> {
    let labels = input.graph.node(&node.name).map(|n| n.labels);
    let mut files = Vec::with_capacity(node.outputs.len());
    for (slot, path) in node.outputs.iter().enumerate() {
      let label = labels
        .and_then(|l| l.outputs.get(slot).copied())
        .unwrap_or("output");
      files.push(FileDisplay::read(format!("{}.{}", node.name, label), path, input.excerpt_len).await);
    }
    files
  }

  async fn answer_file(input: &AnalysisInput<'_>, node: &RuntimeNode) -> Option<FileDisplay> {
    let labels = input.graph.node(&node.name)?.labels;
    let slot = labels
      .input_index("answer")
      .or_else(|| labels.input_index("ans"))?;
    let path = node.input(slot)?;
    Some(FileDisplay::read(format!("{}.{}", node.name, labels.inputs[slot]), path, input.excerpt_len).await)
  }

  fn message(node: &RuntimeNode) -> Option<FileDisplay> {
    let result = node.recorded_result()?;
    if result.message.is_empty() {
      return None;
    }
    Some(FileDisplay::new("message", format!("{}: {}", node.name, result.message)))
  }

  async fn reject(
    input: &AnalysisInput<'_>,
    node: &RuntimeNode,
    verdict: Verdict,
    totals: &Totals,
  ) -> JudgeResult {
    let mut result = JudgeResult::new(verdict.clone(), 0.0, input.full_score);
    totals.apply(&mut result);
    result.files = Self::node_files(input, node).await;
    if verdict == Verdict::WrongAnswer {
      if let Some(answer) = Self::answer_file(input, node).await {
        result.files.push(answer);
      }
    }
    result.files.extend(Self::message(node));
    result
  }
}

#[derive(Default)]
struct Totals {
  time: Duration,
  memory: u64,
}

impl Totals {
  fn collect(nodes: &[RuntimeNode]) -> Self {
    let mut totals = Totals::default();
    for result in nodes.iter().filter(|n| n.key).filter_map(|n| n.result()) {
      totals.time += result.cpu_time.or(result.real_time).unwrap_or_default();
      totals.memory += result.memory.unwrap_or_default();
    }
    totals
  }

  fn apply(&self, result: &mut JudgeResult) {
    result.time_ms = u64::try_from(self.time.as_millis()).unwrap_or(u64::MAX);
    result.memory = self.memory;
  }
}

#[async_trait]
impl Analyzer for DefaultAnalyzer {
  async fn analyze(&self, input: &AnalysisInput<'_>) -> JudgeResult {
    let critical: BTreeSet<String> = input
      .graph
      .graph()
      .forward_closure(input.graph.inbound_nodes(DataGroup::Submission));
    let totals = Totals::collect(input.nodes);

    let by_name: HashMap<&str, &RuntimeNode> =
      input.nodes.iter().map(|n| (n.name.as_str(), n)).collect();
    let walk = input
      .graph
      .topological_order()
      .iter()
      .filter_map(|name| by_name.get(name.as_str()).copied());

    for node in walk {
      let Some(status) = node.status() else {
        continue;
      };
      let kind = Self::kind(input, node);
      let on_critical_path = critical.contains(&node.name);

      // A testlib checker writes its report and exits non-zero on rejection,
      // so the report decides before the exit status does.
      if let ProcessorKind::Checker(CheckerReport::TestlibXml { slot }) = kind {
        let report = match node.output(slot) {
          Some(path) => TestlibReport::read(path).await.map_err(|e| e.to_string()),
          None => Err(format!("no report in output slot {slot}")),
        };
        match report {
          Ok(report) if report.is_accepted() => {}
          Ok(report) => {
            debug!(node = %node.name, outcome = %report.outcome, %status, "analyzer_rejected");
            return Self::reject(input, node, Verdict::WrongAnswer, &totals).await;
          }
          Err(e) if status.is_ok() => {
            let mut result = Self::reject(input, node, Verdict::SystemError, &totals).await;
            result.files.push(FileDisplay::new("message", format!("{}: {e}", node.name)));
            return result;
          }
          Err(e) => {
            debug!(node = %node.name, error = %e, "analyzer_report_unreadable");
          }
        }
      }

      if !status.is_ok() {
        let verdict = match (on_critical_path, kind) {
          (false, _) => Verdict::SystemError,
          (true, ProcessorKind::Checker(CheckerReport::ExitStatus)) if status == Status::ExitError => {
            Verdict::WrongAnswer
          }
          (true, _) => Verdict::from_status(status),
        };
        debug!(node = %node.name, %status, verdict = %verdict, "analyzer_rejected");
        return Self::reject(input, node, verdict, &totals).await;
      }
    }

    let mut result = JudgeResult::new(Verdict::Accepted, input.full_score, input.full_score);
    totals.apply(&mut result);
    for node in input.nodes.iter().filter(|n| n.key) {
      result.files.extend(Self::node_files(input, node).await);
    }
    result
  }
}

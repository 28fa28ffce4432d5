//! Testcase driver: one workflow run per testcase, aggregated per subtask.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use judgeflow_config::DataGroup;
use judgeflow_runtime::{
  Analyzer, AnalyzerRegistry, ExecutionNotifier, InboundPaths, JudgeResult, NoopNotifier, Runtime,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::ProblemError;
use crate::problem::Problem;
use crate::score::TestcasePlan;
use crate::table::{Record, public_fields};

/// Contestant files by submission field.
pub type Submission = BTreeMap<String, PathBuf>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestcaseResult {
  /// Row index into the tests table.
  pub test: usize,
  /// Score this testcase is worth.
  pub weight: f64,
  pub result: JudgeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskResult {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub full_score: f64,
  pub testcases: Vec<TestcaseResult>,
}

impl SubtaskResult {
  pub fn score(&self) -> f64 {
    self.testcases.iter().map(|t| t.result.score).sum()
  }
}

/// Judgement of a whole submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemResult {
  pub is_subtask: bool,
  pub subtasks: Vec<SubtaskResult>,
}

impl ProblemResult {
  pub fn score(&self) -> f64 {
    self.subtasks.iter().map(SubtaskResult::score).sum()
  }

  pub fn full_score(&self) -> f64 {
    self.subtasks.iter().map(|s| s.full_score).sum()
  }

  /// All testcase results in table order within each subtask.
  pub fn testcases(&self) -> impl Iterator<Item = &TestcaseResult> {
    self.subtasks.iter().flat_map(|s| s.testcases.iter())
  }
}

/// Judges submissions against problems.
///
/// Every testcase runs through the same [`Runtime`], so testcases share its
/// cache and worker pool: a compile step common to all testcases executes
/// once.
pub struct ProblemRunner<N: ExecutionNotifier = NoopNotifier> {
  runtime: Runtime<N>,
  analyzers: AnalyzerRegistry,
}

impl<N: ExecutionNotifier> ProblemRunner<N> {
  pub fn new(runtime: Runtime<N>) -> Self {
    Self::with_analyzers(runtime, AnalyzerRegistry::new())
  }

  pub fn with_analyzers(runtime: Runtime<N>, analyzers: AnalyzerRegistry) -> Self {
    Self { runtime, analyzers }
  }

  pub fn runtime(&self) -> &Runtime<N> {
    &self.runtime
  }

  /// Judge `submission` on every testcase of `problem`.
  ///
  /// Testcases run concurrently. Any scheduler error fails the whole
  /// judgement and cancels the testcases still running.
  #[instrument(
    name = "problem_run",
    skip(self, problem, submission, work_dir, cancel),
    fields(problem = %problem.dir().display())
  )]
  pub async fn run(
    &self,
    problem: &Problem,
    submission: &Submission,
    work_dir: &Path,
    cancel: CancellationToken,
  ) -> Result<ProblemResult, ProblemError> {
    let manifest = problem.manifest();
    for field in &manifest.submission {
      if !submission.contains_key(field) {
        return Err(ProblemError::MissingSubmissionField(field.clone()));
      }
    }

    let analyzer_name = manifest
      .analyzer
      .as_deref()
      .unwrap_or(AnalyzerRegistry::DEFAULT);
    let analyzer = self
      .analyzers
      .get(analyzer_name)
      .ok_or_else(|| ProblemError::UnknownAnalyzer(analyzer_name.to_string()))?;

    let mut base = InboundPaths::new();
    insert_record(&mut base, problem.dir(), DataGroup::Static, &manifest.static_data);
    for (field, path) in submission {
      base.insert(DataGroup::Submission, field.clone(), path.clone());
    }

    let analyzer = analyzer.as_ref();
    let cancel = cancel.child_token();
    let subtasks = problem.plan().iter().map(|plan| {
      let mut inbound = base.clone();
      if let Some(record) = plan.subtask.and_then(|i| manifest.subtasks.records.get(i)) {
        insert_record(&mut inbound, problem.dir(), DataGroup::Subtask, record);
      }
      let cancel = cancel.clone();
      async move {
        let testcases = try_join_all(plan.testcases.iter().map(|testcase| {
          self.run_testcase(problem, analyzer, &inbound, testcase, work_dir, cancel.clone())
        }))
        .await?;
        Ok::<_, ProblemError>(SubtaskResult {
          id: plan.id.clone(),
          full_score: plan.full_score,
          testcases,
        })
      }
    });

    let subtasks = match try_join_all(subtasks).await {
      Ok(subtasks) => subtasks,
      Err(e) => {
        cancel.cancel();
        error!(error = %e, "problem_failed");
        return Err(e);
      }
    };

    let result = ProblemResult {
      is_subtask: problem.is_subtask(),
      subtasks,
    };
    info!(
      score = result.score(),
      full_score = result.full_score(),
      "problem_judged"
    );
    Ok(result)
  }

  async fn run_testcase(
    &self,
    problem: &Problem,
    analyzer: &dyn Analyzer,
    inbound: &InboundPaths,
    testcase: &TestcasePlan,
    work_dir: &Path,
    cancel: CancellationToken,
  ) -> Result<TestcaseResult, ProblemError> {
    let mut inbound = inbound.clone();
    if let Some(record) = problem.manifest().tests.records.get(testcase.test) {
      insert_record(&mut inbound, problem.dir(), DataGroup::Tests, record);
    }

    let result = self
      .runtime
      .run(
        problem.graph(),
        analyzer,
        work_dir,
        &inbound,
        testcase.score,
        cancel,
      )
      .await?;

    info!(
      test = testcase.test,
      verdict = %result.verdict,
      score = result.score,
      "testcase_judged"
    );
    Ok(TestcaseResult {
      test: testcase.test,
      weight: testcase.score,
      result,
    })
  }
}

/// Bind the public fields of `record` as paths relative to the problem dir.
fn insert_record(inbound: &mut InboundPaths, dir: &Path, group: DataGroup, record: &Record) {
  for (field, value) in public_fields(record) {
    inbound.insert(group, field.clone(), dir.join(value));
  }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{execute, touch};
use crate::error::ReportError;
use crate::processor::{CheckerReport, Labels, Processor, ProcessorKind};
use crate::result::{ExecutionResult, Status};
use crate::sandbox::{Sandbox, SandboxRequest};

const HCMP_LABELS: Labels = Labels::new(&["out", "ans"], &["result"]);
const TESTLIB_LABELS: Labels = Labels::new(
  &["checker", "input", "output", "answer"],
  &["xmlreport", "stderr", "judgerlog"],
);

/// Compares the first whitespace separated token of the contestant output
/// against the answer.
///
/// A mismatch is reported as `ExitError`, the same status an external
/// checker produces when it rejects.
pub struct CheckerHcmp;

#[async_trait]
impl Processor for CheckerHcmp {
  fn labels(&self) -> Labels {
    HCMP_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Checker(CheckerReport::ExitStatus)
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let found = match first_token(&inputs[0]).await {
      Ok(token) => token,
      Err(e) => return ExecutionResult::runtime_error(format!("open out: {e}")),
    };
    let expected = match first_token(&inputs[1]).await {
      Ok(token) => token,
      Err(e) => return ExecutionResult::runtime_error(format!("open ans: {e}")),
    };

    let (report, result) = if found == expected {
      (format!("ok: answer is '{found}'"), ExecutionResult::ok())
    } else {
      (
        format!("wa: expected '{expected}', found '{found}'"),
        ExecutionResult::new(Status::ExitError, "exit with code 1"),
      )
    };

    if let Err(e) = tokio::fs::write(&outputs[0], report).await {
      return ExecutionResult::system_error(format!("write result: {e}"));
    }
    result
  }
}

async fn first_token(path: &Path) -> std::io::Result<String> {
  let bytes = tokio::fs::read(path).await?;
  let text = String::from_utf8_lossy(&bytes);
  Ok(text.split_whitespace().next().unwrap_or_default().to_string())
}

/// Runs a testlib checker: `checker <input> <output> <answer> <report> -appes`.
pub struct CheckerTestlib {
  sandbox: Arc<dyn Sandbox>,
}

impl CheckerTestlib {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox }
  }
}

#[async_trait]
impl Processor for CheckerTestlib {
  fn labels(&self) -> Labels {
    TESTLIB_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Checker(CheckerReport::TestlibXml { slot: 0 })
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let request = SandboxRequest::new(&inputs[0])
      .arg(&inputs[1])
      .arg(&inputs[2])
      .arg(&inputs[3])
      .arg(&outputs[0])
      .arg("-appes")
      .stderr(&outputs[1])
      .log(&outputs[2])
      .limits(self.sandbox.toolchain_limits());

    let result = execute(self.sandbox.as_ref(), request).await;
    if let Err(e) = touch(&outputs[0]).await {
      return ExecutionResult::system_error(format!("create report: {e}"));
    }
    result
  }
}

/// The `<result>` element a testlib checker writes in `-appes` mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename = "result")]
pub struct TestlibReport {
  #[serde(rename = "@outcome")]
  pub outcome: String,
  #[serde(rename = "@points", default)]
  pub points: Option<f64>,
  #[serde(rename = "$text", default)]
  pub comment: String,
}

impl TestlibReport {
  pub fn parse(xml: &str) -> Result<Self, ReportError> {
    Ok(quick_xml::de::from_str(xml)?)
  }

  pub async fn read(path: &Path) -> Result<Self, ReportError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ReportError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&String::from_utf8_lossy(&bytes))
  }

  pub fn is_accepted(&self) -> bool {
    self.outcome == "accepted"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_accepted_report() {
    let report = TestlibReport::parse(
      r#"<?xml version="1.0" encoding="windows-1251"?><result outcome="accepted">1 number(s): "5"</result>"#,
    )
    .unwrap();

    assert!(report.is_accepted());
    assert_eq!(report.comment, "1 number(s): \"5\"");
  }

  #[test]
  fn test_parse_wrong_answer_report() {
    let report = TestlibReport::parse(
      r#"<result outcome="wrong-answer">1st numbers differ - expected: '5', found: '6'</result>"#,
    )
    .unwrap();

    assert!(!report.is_accepted());
    assert_eq!(report.outcome, "wrong-answer");
  }

  #[test]
  fn test_parse_missing_outcome_fails() {
    assert!(TestlibReport::parse("<result>nothing</result>").is_err());
  }

  #[tokio::test]
  async fn test_hcmp_accepts_matching_token() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let ans = dir.path().join("ans");
    let result_path = dir.path().join("result");
    std::fs::write(&out, "5\n").unwrap();
    std::fs::write(&ans, "  5  \n\n").unwrap();

    let result = CheckerHcmp.run(&[out, ans], &[result_path.clone()]).await;

    assert_eq!(result.status, Status::Ok);
    assert!(result_path.exists());
  }

  #[tokio::test]
  async fn test_hcmp_rejects_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let ans = dir.path().join("ans");
    let result_path = dir.path().join("result");
    std::fs::write(&out, "5\n").unwrap();
    std::fs::write(&ans, "6\n").unwrap();

    let result = CheckerHcmp.run(&[out, ans], &[result_path.clone()]).await;

    assert_eq!(result.status, Status::ExitError);
    assert_eq!(result.message, "exit with code 1");
    assert_eq!(
      std::fs::read_to_string(&result_path).unwrap(),
      "wa: expected '6', found '5'"
    );
  }

  #[tokio::test]
  async fn test_hcmp_missing_output_is_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let ans = dir.path().join("ans");
    std::fs::write(&ans, "6").unwrap();

    let result = CheckerHcmp
      .run(&[dir.path().join("missing"), ans], &[dir.path().join("result")])
      .await;

    assert_eq!(result.status, Status::RuntimeError);
  }
}

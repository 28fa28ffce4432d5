//! Judgement result types.

use std::fmt;
use std::path::Path;

use judgeflow_processor::Status;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;

/// Final verdict of a judged run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Accepted,
  WrongAnswer,
  TimeLimitExceeded,
  MemoryLimitExceeded,
  OutputLimitExceeded,
  RuntimeError,
  DangerousSystemCall,
  ExitCodeError,
  Unaccepted,
  SystemError,
  /// Verdict from a custom analyzer.
  Custom(String),
}

impl Verdict {
  /// Verdict for a contestant-side node that finished with `status`.
  pub fn from_status(status: Status) -> Self {
    match status {
      Status::Ok => Verdict::Accepted,
      Status::TimeExceed => Verdict::TimeLimitExceeded,
      Status::RuntimeError => Verdict::RuntimeError,
      Status::DangerousSyscall => Verdict::DangerousSystemCall,
      Status::ExitError => Verdict::ExitCodeError,
      Status::OutputExceed => Verdict::OutputLimitExceeded,
      Status::MemoryExceed => Verdict::MemoryLimitExceeded,
      Status::SystemError => Verdict::Unaccepted,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      Verdict::Accepted => "Accepted",
      Verdict::WrongAnswer => "Wrong Answer",
      Verdict::TimeLimitExceeded => "Time Limit Exceeded",
      Verdict::MemoryLimitExceeded => "Memory Limit Exceeded",
      Verdict::OutputLimitExceeded => "Output Limit Exceeded",
      Verdict::RuntimeError => "Runtime Error",
      Verdict::DangerousSystemCall => "Dangerous System Call",
      Verdict::ExitCodeError => "Exit Code Error",
      Verdict::Unaccepted => "Unaccepted",
      Verdict::SystemError => "System Error",
      Verdict::Custom(title) => title,
    }
  }

  pub fn is_accepted(&self) -> bool {
    matches!(self, Verdict::Accepted)
  }
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.title())
  }
}

/// A titled excerpt shown as evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDisplay {
  pub title: String,
  pub content: String,
}

impl FileDisplay {
  pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      content: content.into(),
    }
  }

  /// Read up to `limit` bytes of `path`, trimming trailing NUL and
  /// whitespace. Read failures become an `[error]` line.
  pub async fn read(title: impl Into<String>, path: &Path, limit: usize) -> Self {
    let content = match read_prefix(path, limit).await {
      Ok(bytes) => String::from_utf8_lossy(&bytes)
        .trim_end_matches(['\0', ' ', '\n', '\t', '\r'])
        .to_string(),
      Err(e) => format!("[error] {e}"),
    };
    Self::new(title, content)
  }
}

async fn read_prefix(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
  let file = tokio::fs::File::open(path).await?;
  let mut bytes = Vec::new();
  file.take(limit as u64).read_to_end(&mut bytes).await?;
  Ok(bytes)
}

/// Result of analyzing one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
  pub verdict: Verdict,
  /// Human readable verdict.
  pub title: String,
  pub score: f64,
  pub full_score: f64,
  /// Total time of key nodes executed in this run, in milliseconds.
  pub time_ms: u64,
  /// Total peak memory of key nodes executed in this run, in bytes.
  pub memory: u64,
  pub files: Vec<FileDisplay>,
}

impl JudgeResult {
  pub fn new(verdict: Verdict, score: f64, full_score: f64) -> Self {
    Self {
      title: verdict.title().to_string(),
      verdict,
      score,
      full_score,
      time_ms: 0,
      memory: 0,
      files: Vec::new(),
    }
  }
}

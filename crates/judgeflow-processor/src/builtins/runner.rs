use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{execute, touch};
use crate::limits::ResourceLimits;
use crate::processor::{Labels, Processor, ProcessorKind};
use crate::result::ExecutionResult;
use crate::sandbox::{Sandbox, SandboxRequest};

const STDIO_LABELS: Labels = Labels::new(
  &["executable", "stdin", "limit"],
  &["stdout", "stderr", "judgerlog"],
);
const FILEIO_LABELS: Labels = Labels::new(
  &["executable", "fin", "config"],
  &["fout", "stderr", "judgerlog"],
);

async fn read_limits(path: &Path) -> Result<ResourceLimits, ExecutionResult> {
  let text = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| ExecutionResult::runtime_error(format!("open limit: {e}")))?;
  text
    .parse()
    .map_err(|e| ExecutionResult::runtime_error(format!("parse limit: {e}")))
}

/// Runs an executable with standard input and output bound to files.
pub struct RunnerStdio {
  sandbox: Arc<dyn Sandbox>,
}

impl RunnerStdio {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox }
  }
}

#[async_trait]
impl Processor for RunnerStdio {
  fn labels(&self) -> Labels {
    STDIO_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Runner
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let limits = match read_limits(&inputs[2]).await {
      Ok(limits) => limits,
      Err(result) => return result,
    };

    let request = SandboxRequest::new(&inputs[0])
      .stdin(&inputs[1])
      .stdout(&outputs[0])
      .stderr(&outputs[1])
      .log(&outputs[2])
      .limits(limits);

    execute(self.sandbox.as_ref(), request).await
  }
}

/// Runs an executable that reads and writes named files in its working
/// directory.
///
/// The `config` input holds the limit line followed by a line naming the
/// input and output files, e.g. `aplusb.in aplusb.out`.
pub struct RunnerFileio {
  sandbox: Arc<dyn Sandbox>,
}

impl RunnerFileio {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox }
  }
}

#[derive(Debug, PartialEq)]
struct FileioConfig {
  limits: ResourceLimits,
  input_name: String,
  output_name: String,
}

fn parse_config(text: &str) -> Result<FileioConfig, String> {
  let mut lines = text.lines();
  let (Some(limit_line), Some(io_line)) = (lines.next(), lines.next()) else {
    return Err("expected a limit line and a file name line".to_string());
  };

  let limits = limit_line.parse().map_err(|e| format!("parse limit: {e}"))?;

  let mut names = io_line.split_whitespace();
  let (Some(input_name), Some(output_name)) = (names.next(), names.next()) else {
    return Err("expected input and output file names".to_string());
  };

  for name in [input_name, output_name] {
    if name.contains('/') || name == "." || name == ".." {
      return Err(format!("invalid file name '{name}'"));
    }
  }

  Ok(FileioConfig {
    limits,
    input_name: input_name.to_string(),
    output_name: output_name.to_string(),
  })
}

impl RunnerFileio {
  async fn run_in(&self, scratch: &Path, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let text = match tokio::fs::read_to_string(&inputs[2]).await {
      Ok(text) => text,
      Err(e) => return ExecutionResult::runtime_error(format!("open config: {e}")),
    };
    let config = match parse_config(&text) {
      Ok(config) => config,
      Err(message) => return ExecutionResult::runtime_error(format!("invalid config: {message}")),
    };

    if let Err(e) = tokio::fs::copy(&inputs[1], scratch.join(&config.input_name)).await {
      return ExecutionResult::system_error(format!("copy input: {e}"));
    }

    let executable = match std::path::absolute(&inputs[0]) {
      Ok(path) => path,
      Err(e) => return ExecutionResult::system_error(format!("resolve executable: {e}")),
    };

    let request = SandboxRequest::new(executable)
      .working_dir(scratch)
      .stderr(&outputs[1])
      .log(&outputs[2])
      .limits(config.limits);

    let result = execute(self.sandbox.as_ref(), request).await;

    // A missing output file is left for the checker to reject.
    let copied = tokio::fs::copy(scratch.join(&config.output_name), &outputs[0]).await;
    if copied.is_err() {
      if let Err(e) = touch(&outputs[0]).await {
        return ExecutionResult::system_error(format!("create output: {e}"));
      }
    }

    result
  }
}

#[async_trait]
impl Processor for RunnerFileio {
  fn labels(&self) -> Labels {
    FILEIO_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Runner
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let parent = outputs[0].parent().unwrap_or_else(|| Path::new("."));
    let scratch = parent.join(format!("fileio-{}", uuid::Uuid::new_v4().simple()));
    if let Err(e) = tokio::fs::create_dir_all(&scratch).await {
      return ExecutionResult::system_error(format!("create scratch dir: {e}"));
    }

    let result = self.run_in(&scratch, inputs, outputs).await;

    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
      warn!(path = %scratch.display(), error = %e, "scratch_cleanup_failed");
    }
    result
  }
}


#[cfg(all(test, unix))]
mod sandbox_tests {
  use std::os::unix::fs::PermissionsExt;

  use super::*;
  use crate::result::Status;
  use crate::sandbox::LocalSandbox;

  fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  #[tokio::test]
  async fn test_stdio_runner() {
    let dir = tempfile::tempdir().unwrap();
    let exe = script(dir.path(), "exe", "read a b; echo $((a + b))");
    let stdin = dir.path().join("stdin");
    let limit = dir.path().join("limit");
    std::fs::write(&stdin, "2 3\n").unwrap();
    std::fs::write(&limit, "1000 1000 0 0 0 0 0").unwrap();
    let outputs = ["stdout", "stderr", "judgerlog"].map(|n| dir.path().join(n));

    let result = RunnerStdio::new(Arc::new(LocalSandbox::default()))
      .run(&[exe, stdin, limit], &outputs)
      .await;

    assert_eq!(result.status, Status::Ok);
    assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "5\n");
  }

  #[tokio::test]
  async fn test_stdio_runner_bad_limit() {
    let dir = tempfile::tempdir().unwrap();
    let exe = script(dir.path(), "exe", "true");
    let stdin = dir.path().join("stdin");
    let limit = dir.path().join("limit");
    std::fs::write(&stdin, "").unwrap();
    std::fs::write(&limit, "soon").unwrap();
    let outputs = ["stdout", "stderr", "judgerlog"].map(|n| dir.path().join(n));

    let result = RunnerStdio::new(Arc::new(LocalSandbox::default()))
      .run(&[exe, stdin, limit], &outputs)
      .await;

    assert_eq!(result.status, Status::RuntimeError);
  }

  #[tokio::test]
  async fn test_fileio_runner() {
    let dir = tempfile::tempdir().unwrap();
    let exe = script(
      dir.path(),
      "exe",
      "read a b < aplusb.in; echo $((a + b)) > aplusb.out",
    );
    let fin = dir.path().join("fin");
    let config = dir.path().join("config");
    std::fs::write(&fin, "20 22\n").unwrap();
    std::fs::write(&config, "1000 1000 0 0 0 0 0\naplusb.in aplusb.out\n").unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    let outputs = ["fout", "stderr", "judgerlog"].map(|n| out_dir.join(n));

    let result = RunnerFileio::new(Arc::new(LocalSandbox::default()))
      .run(&[exe, fin, config], &outputs)
      .await;

    assert_eq!(result.status, Status::Ok);
    assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "42\n");
    // Scratch directory is removed.
    let leftover: Vec<_> = std::fs::read_dir(&out_dir)
      .unwrap()
      .filter_map(|e| e.ok())
      .filter(|e| e.path().is_dir())
      .collect();
    assert!(leftover.is_empty());
  }
}

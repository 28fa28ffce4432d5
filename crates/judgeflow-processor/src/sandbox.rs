//! Sandboxed program execution.
//!
//! [`Sandbox`] is the seam between processors and whatever actually runs
//! untrusted programs. [`LocalSandbox`] is the unprivileged reference
//! executor: it enforces wall time and output size, and records the other
//! limits in the judger log without enforcing them.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::SandboxError;
use crate::limits::ResourceLimits;
use crate::result::{ExecutionResult, Status};

/// A single program execution request.
///
/// Unset redirections are bound to the null device.
#[derive(Debug, Clone, Default)]
pub struct SandboxRequest {
  pub program: PathBuf,
  pub args: Vec<String>,
  pub env: Vec<(String, String)>,
  pub stdin: Option<PathBuf>,
  pub stdout: Option<PathBuf>,
  pub stderr: Option<PathBuf>,
  pub working_dir: Option<PathBuf>,
  pub limits: ResourceLimits,
  /// Where to write the judger log line.
  pub log: Option<PathBuf>,
}

impl SandboxRequest {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      ..Self::default()
    }
  }

  pub fn arg(mut self, arg: impl AsRef<Path>) -> Self {
    self.args.push(arg.as_ref().to_string_lossy().into_owned());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn stdin(mut self, path: impl Into<PathBuf>) -> Self {
    self.stdin = Some(path.into());
    self
  }

  pub fn stdout(mut self, path: impl Into<PathBuf>) -> Self {
    self.stdout = Some(path.into());
    self
  }

  pub fn stderr(mut self, path: impl Into<PathBuf>) -> Self {
    self.stderr = Some(path.into());
    self
  }

  pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
    self.working_dir = Some(path.into());
    self
  }

  pub fn limits(mut self, limits: ResourceLimits) -> Self {
    self.limits = limits;
    self
  }

  pub fn log(mut self, path: impl Into<PathBuf>) -> Self {
    self.log = Some(path.into());
    self
  }
}

/// Executes programs under resource limits.
#[async_trait]
pub trait Sandbox: Send + Sync {
  /// Run a program to completion.
  ///
  /// Program failures (non-zero exit, limits exceeded) are reported in the
  /// returned [`ExecutionResult`]; `Err` is reserved for failures of the
  /// sandbox itself.
  async fn execute(&self, request: SandboxRequest) -> Result<ExecutionResult, SandboxError>;

  /// Limits applied to toolchain steps (compilers, checkers, generators).
  fn toolchain_limits(&self) -> ResourceLimits {
    ResourceLimits::toolchain()
  }
}

/// Configuration for [`LocalSandbox`].
#[derive(Debug, Clone)]
pub struct SandboxConfig {
  /// `PATH` exposed to executed programs. The rest of the environment is
  /// cleared.
  pub path: String,
  /// Wall time for toolchain steps.
  pub toolchain_time: Duration,
  /// Output cap for toolchain steps, in bytes.
  pub toolchain_output: u64,
}

impl Default for SandboxConfig {
  fn default() -> Self {
    let defaults = ResourceLimits::toolchain();
    Self {
      path: "/usr/local/bin:/usr/bin:/bin".to_string(),
      toolchain_time: defaults.real_time.unwrap_or(Duration::from_secs(60)),
      toolchain_output: defaults.output.unwrap_or(10 * 1024 * 1024),
    }
  }
}

/// Reference executor built on `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct LocalSandbox {
  config: SandboxConfig,
}

impl LocalSandbox {
  pub fn new(config: SandboxConfig) -> Self {
    Self { config }
  }
}

#[derive(Serialize)]
struct JudgerLog<'a> {
  program: &'a Path,
  args: &'a [String],
  limits: &'a ResourceLimits,
  status: Status,
  real_time_ms: u128,
  message: &'a str,
}

#[async_trait]
impl Sandbox for LocalSandbox {
  async fn execute(&self, request: SandboxRequest) -> Result<ExecutionResult, SandboxError> {
    let mut command = tokio::process::Command::new(&request.program);
    command
      .args(&request.args)
      .env_clear()
      .env("PATH", &self.config.path)
      .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .stdin(open_input(request.stdin.as_deref()).await?)
      .stdout(open_output(request.stdout.as_deref()).await?)
      .stderr(open_output(request.stderr.as_deref()).await?)
      .kill_on_drop(true);

    if let Some(dir) = &request.working_dir {
      command.current_dir(dir);
    }

    debug!(program = %request.program.display(), args = ?request.args, "sandbox_spawn");

    let started = Instant::now();
    let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
      program: request.program.clone(),
      source,
    })?;

    let exit = match request.limits.real_time {
      Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => Ok(status),
        Err(_) => {
          if let Err(e) = child.kill().await {
            warn!(program = %request.program.display(), error = %e, "sandbox_kill_failed");
          }
          Err(limit)
        }
      },
      None => Ok(child.wait().await),
    };
    let elapsed = started.elapsed();

    let result = match exit {
      Err(limit) => ExecutionResult::new(
        Status::TimeExceed,
        format!("real time limit of {}ms exceeded", limit.as_millis()),
      ),
      Ok(status) => {
        let status = status.map_err(|source| SandboxError::Wait {
          program: request.program.clone(),
          source,
        })?;
        classify(status, &request).await
      }
    }
    .with_real_time(elapsed);

    if let Some(log) = &request.log {
      write_log(log, &request, &result).await;
    }

    Ok(result)
  }

  fn toolchain_limits(&self) -> ResourceLimits {
    ResourceLimits {
      real_time: Some(self.config.toolchain_time),
      output: Some(self.config.toolchain_output),
      ..ResourceLimits::default()
    }
  }
}

async fn classify(status: ExitStatus, request: &SandboxRequest) -> ExecutionResult {
  if let (Some(cap), Some(stdout)) = (request.limits.output, &request.stdout) {
    let written = tokio::fs::metadata(stdout)
      .await
      .map(|m| m.len())
      .unwrap_or(0);
    if written > cap {
      return ExecutionResult::new(
        Status::OutputExceed,
        format!("output of {written} bytes exceeds limit of {cap} bytes"),
      );
    }
  }

  if status.success() {
    return ExecutionResult::ok();
  }

  if let Some(code) = status.code() {
    return ExecutionResult::new(Status::ExitError, format!("exit with code {code}"));
  }

  #[cfg(unix)]
  {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = status.signal() {
      return ExecutionResult::runtime_error(format!("killed by signal {signal}"));
    }
  }

  ExecutionResult::runtime_error(format!("abnormal termination: {status}"))
}

async fn open_input(path: Option<&Path>) -> Result<Stdio, SandboxError> {
  match path {
    Some(path) => {
      let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| SandboxError::Redirect {
          path: path.to_path_buf(),
          source,
        })?;
      Ok(Stdio::from(file.into_std().await))
    }
    None => Ok(Stdio::null()),
  }
}

async fn open_output(path: Option<&Path>) -> Result<Stdio, SandboxError> {
  match path {
    Some(path) => {
      let file = tokio::fs::File::create(path)
        .await
        .map_err(|source| SandboxError::Redirect {
          path: path.to_path_buf(),
          source,
        })?;
      Ok(Stdio::from(file.into_std().await))
    }
    None => Ok(Stdio::null()),
  }
}

async fn write_log(path: &Path, request: &SandboxRequest, result: &ExecutionResult) {
  let entry = JudgerLog {
    program: &request.program,
    args: &request.args,
    limits: &request.limits,
    status: result.status,
    real_time_ms: result.real_time.map(|d| d.as_millis()).unwrap_or_default(),
    message: &result.message,
  };

  let line = match serde_json::to_string(&entry) {
    Ok(line) => line,
    Err(e) => {
      warn!(error = %e, "judger_log_serialize_failed");
      return;
    }
  };

  if let Err(e) = tokio::fs::write(path, line + "\n").await {
    warn!(path = %path.display(), error = %e, "judger_log_write_failed");
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn shell(script: &str) -> SandboxRequest {
    SandboxRequest::new("/bin/sh").args(["-c", script])
  }

  #[tokio::test]
  async fn test_success_redirects_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let result = LocalSandbox::default()
      .execute(shell("echo hello").stdout(&out))
      .await
      .unwrap();

    assert_eq!(result.status, Status::Ok);
    assert!(result.real_time.is_some());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
  }

  #[tokio::test]
  async fn test_nonzero_exit_is_exit_error() {
    let result = LocalSandbox::default()
      .execute(shell("exit 3"))
      .await
      .unwrap();

    assert_eq!(result.status, Status::ExitError);
    assert_eq!(result.message, "exit with code 3");
  }

  #[tokio::test]
  async fn test_wall_time_limit_kills() {
    let limits = ResourceLimits {
      real_time: Some(Duration::from_millis(100)),
      ..ResourceLimits::default()
    };

    let result = LocalSandbox::default()
      .execute(shell("sleep 5").limits(limits))
      .await
      .unwrap();

    assert_eq!(result.status, Status::TimeExceed);
    assert_eq!(result.message, "real time limit of 100ms exceeded");
    assert!(result.real_time.is_some_and(|t| t >= Duration::from_millis(100)));
  }

  #[tokio::test]
  async fn test_output_cap() {
    let dir = tempfile::tempdir().unwrap();
    let limits = ResourceLimits {
      output: Some(4),
      ..ResourceLimits::default()
    };

    let result = LocalSandbox::default()
      .execute(
        shell("echo 'way more than four bytes'")
          .stdout(dir.path().join("out"))
          .limits(limits),
      )
      .await
      .unwrap();

    assert_eq!(result.status, Status::OutputExceed);
  }

  #[tokio::test]
  async fn test_environment_is_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    LocalSandbox::default()
      .execute(shell("echo \"[$HOME]\"").stdout(&out))
      .await
      .unwrap();

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "[]\n");
  }

  #[tokio::test]
  async fn test_judger_log_written() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("judgerlog");

    LocalSandbox::default()
      .execute(shell("true").log(&log))
      .await
      .unwrap();

    let line: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&log).unwrap()).unwrap();
    assert_eq!(line["status"], "ok");
    assert_eq!(line["program"], "/bin/sh");
  }

  #[tokio::test]
  async fn test_missing_stdin_is_redirect_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = LocalSandbox::default()
      .execute(shell("cat").stdin(dir.path().join("absent.in")))
      .await
      .unwrap_err();

    assert!(matches!(err, SandboxError::Redirect { .. }));
  }

  #[tokio::test]
  async fn test_missing_program_is_sandbox_error() {
    let err = LocalSandbox::default()
      .execute(SandboxRequest::new("/nonexistent/judgeflow-binary"))
      .await
      .unwrap_err();

    assert!(matches!(err, SandboxError::Spawn { .. }));
  }
}

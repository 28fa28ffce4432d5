//! Execution result types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Status of a processor execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  Ok,
  RuntimeError,
  MemoryExceed,
  TimeExceed,
  OutputExceed,
  SystemError,
  DangerousSyscall,
  ExitError,
}

impl Status {
  pub fn is_ok(&self) -> bool {
    matches!(self, Status::Ok)
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Status::Ok => "ok",
      Status::RuntimeError => "runtime_error",
      Status::MemoryExceed => "memory_exceed",
      Status::TimeExceed => "time_exceed",
      Status::OutputExceed => "output_exceed",
      Status::SystemError => "system_error",
      Status::DangerousSyscall => "dangerous_syscall",
      Status::ExitError => "exit_error",
    };
    f.write_str(name)
  }
}

/// Outcome of running a processor.
///
/// `status` is mandatory; the telemetry fields are advisory and may be absent
/// when the executor could not measure them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
  pub status: Status,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub real_time: Option<Duration>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cpu_time: Option<Duration>,
  /// Peak memory in bytes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub memory: Option<u64>,
  #[serde(default)]
  pub message: String,
}

impl ExecutionResult {
  pub fn new(status: Status, message: impl Into<String>) -> Self {
    Self {
      status,
      real_time: None,
      cpu_time: None,
      memory: None,
      message: message.into(),
    }
  }

  pub fn ok() -> Self {
    Self::new(Status::Ok, "")
  }

  pub fn runtime_error(message: impl Into<String>) -> Self {
    Self::new(Status::RuntimeError, message)
  }

  pub fn system_error(message: impl Into<String>) -> Self {
    Self::new(Status::SystemError, message)
  }

  pub fn with_real_time(mut self, real_time: Duration) -> Self {
    self.real_time = Some(real_time);
    self
  }

  pub fn is_ok(&self) -> bool {
    self.status.is_ok()
  }
}

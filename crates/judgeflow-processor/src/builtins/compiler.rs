use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::{execute, touch};
use crate::processor::{Labels, Processor, ProcessorKind};
use crate::result::ExecutionResult;
use crate::sandbox::{Sandbox, SandboxRequest};

const LABELS: Labels = Labels::new(&["source", "script"], &["result", "log", "judgerlog"]);
const AUTO_LABELS: Labels = Labels::new(&["source"], &["result", "log", "judgerlog"]);

const SHELL: &str = "/bin/sh";

/// Compiles `source` by running the user supplied shell `script` with the
/// source and result paths as its two arguments.
pub struct Compiler {
  sandbox: Arc<dyn Sandbox>,
}

impl Compiler {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox }
  }
}

#[async_trait]
impl Processor for Compiler {
  fn labels(&self) -> Labels {
    LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Compiler
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let request = SandboxRequest::new(SHELL)
      .arg(&inputs[1])
      .arg(&inputs[0])
      .arg(&outputs[0])
      .stderr(&outputs[1])
      .log(&outputs[2])
      .limits(self.sandbox.toolchain_limits());

    let result = execute(self.sandbox.as_ref(), request).await;
    if let Err(e) = touch(&outputs[0]).await {
      return ExecutionResult::system_error(format!("create result: {e}"));
    }
    result
  }
}

/// Compiles C and C++ sources with the system toolchain, picking the
/// compiler from the file extension.
pub struct CompilerAuto {
  sandbox: Arc<dyn Sandbox>,
}

impl CompilerAuto {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox }
  }
}

fn toolchain_for(source: &std::path::Path) -> Option<&'static str> {
  match source.extension()?.to_str()? {
    "c" => Some("gcc"),
    "cpp" | "cc" | "cxx" => Some("g++"),
    _ => None,
  }
}

#[async_trait]
impl Processor for CompilerAuto {
  fn labels(&self) -> Labels {
    AUTO_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Compiler
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let source = &inputs[0];
    let Some(compiler) = toolchain_for(source) else {
      return ExecutionResult::system_error(format!(
        "unsupported source extension: {}",
        source.display()
      ));
    };

    let request = SandboxRequest::new(compiler)
      .arg(source)
      .arg("-o")
      .arg(&outputs[0])
      .args(["-O2", "-lm", "-DONLINE_JUDGE"])
      .stderr(&outputs[1])
      .log(&outputs[2])
      .limits(self.sandbox.toolchain_limits());

    let result = execute(self.sandbox.as_ref(), request).await;
    if let Err(e) = touch(&outputs[0]).await {
      return ExecutionResult::system_error(format!("create result: {e}"));
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::result::Status;
  use crate::sandbox::LocalSandbox;

  #[test]
  fn test_toolchain_by_extension() {
    assert_eq!(toolchain_for("a.c".as_ref()), Some("gcc"));
    assert_eq!(toolchain_for("a.cpp".as_ref()), Some("g++"));
    assert_eq!(toolchain_for("a.cc".as_ref()), Some("g++"));
    assert_eq!(toolchain_for("a.py".as_ref()), None);
    assert_eq!(toolchain_for("Makefile".as_ref()), None);
  }

  #[tokio::test]
  async fn test_unknown_extension_is_system_error() {
    let dir = tempfile::tempdir().unwrap();
    let outputs = ["result", "log", "judgerlog"].map(|n| dir.path().join(n));

    let result = CompilerAuto::new(Arc::new(LocalSandbox::default()))
      .run(&[dir.path().join("main.rs")], &outputs)
      .await;

    assert_eq!(result.status, Status::SystemError);
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_script_compiler_copies_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source");
    let script = dir.path().join("script");
    std::fs::write(&source, "payload").unwrap();
    std::fs::write(&script, "cp \"$1\" \"$2\"\n").unwrap();
    let outputs = ["result", "log", "judgerlog"].map(|n| dir.path().join(n));

    let result = Compiler::new(Arc::new(LocalSandbox::default()))
      .run(&[source, script], &outputs)
      .await;

    assert_eq!(result.status, Status::Ok);
    assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "payload");
    assert!(outputs[2].exists());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_failing_script_keeps_log() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source");
    let script = dir.path().join("script");
    std::fs::write(&source, "").unwrap();
    std::fs::write(&script, "echo 'syntax error' >&2\nexit 1\n").unwrap();
    let outputs = ["result", "log", "judgerlog"].map(|n| dir.path().join(n));

    let result = Compiler::new(Arc::new(LocalSandbox::default()))
      .run(&[source, script], &outputs)
      .await;

    assert_eq!(result.status, Status::ExitError);
    assert_eq!(std::fs::read_to_string(&outputs[1]).unwrap(), "syntax error\n");
    assert!(outputs[0].exists());
  }
}

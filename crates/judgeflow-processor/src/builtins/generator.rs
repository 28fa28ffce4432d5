use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::{execute, touch};
use crate::processor::{Labels, Processor, ProcessorKind};
use crate::result::ExecutionResult;
use crate::sandbox::{Sandbox, SandboxRequest};

const GENERATOR_LABELS: Labels = Labels::new(
  &["generator", "arguments"],
  &["output", "stderr", "judgerlog"],
);
const INPUTMAKER_LABELS: Labels = Labels::new(
  &["source", "option", "generator"],
  &["result", "stderr", "judgerlog"],
);

/// Runs a testlib generator with the whitespace separated arguments from the
/// `arguments` input, capturing its standard output.
pub struct GeneratorTestlib {
  sandbox: Arc<dyn Sandbox>,
}

impl GeneratorTestlib {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self { sandbox }
  }
}

#[async_trait]
impl Processor for GeneratorTestlib {
  fn labels(&self) -> Labels {
    GENERATOR_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Generator
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let arguments = match tokio::fs::read_to_string(&inputs[1]).await {
      Ok(text) => text,
      Err(e) => return ExecutionResult::runtime_error(format!("open arguments: {e}")),
    };

    let request = SandboxRequest::new(&inputs[0])
      .args(arguments.split_whitespace())
      .stdout(&outputs[0])
      .stderr(&outputs[1])
      .log(&outputs[2])
      .limits(self.sandbox.toolchain_limits());

    execute(self.sandbox.as_ref(), request).await
  }
}

/// Produces a test input either by copying `source` verbatim (when `option`
/// contains `raw`) or by running `generator` with `source` as its arguments.
pub struct Inputmaker {
  generator: GeneratorTestlib,
}

impl Inputmaker {
  pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
    Self {
      generator: GeneratorTestlib::new(sandbox),
    }
  }
}

#[async_trait]
impl Processor for Inputmaker {
  fn labels(&self) -> Labels {
    INPUTMAKER_LABELS
  }

  fn kind(&self) -> ProcessorKind {
    ProcessorKind::Generator
  }

  async fn run(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> ExecutionResult {
    let option = match tokio::fs::read_to_string(&inputs[1]).await {
      Ok(text) => text,
      Err(e) => return ExecutionResult::runtime_error(format!("open option: {e}")),
    };

    if !option.contains("raw") {
      let delegated = [inputs[2].clone(), inputs[0].clone()];
      return self.generator.run(&delegated, outputs).await;
    }

    if let Err(e) = tokio::fs::copy(&inputs[0], &outputs[0]).await {
      return ExecutionResult::runtime_error(format!("copy source: {e}"));
    }
    for output in &outputs[1..] {
      if let Err(e) = touch(output).await {
        return ExecutionResult::system_error(format!("create output: {e}"));
      }
    }
    ExecutionResult::ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::result::Status;
  use crate::sandbox::LocalSandbox;

  #[tokio::test]
  async fn test_inputmaker_raw_copies_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source");
    let option = dir.path().join("option");
    std::fs::write(&source, "1 2\n").unwrap();
    std::fs::write(&option, "raw\n").unwrap();
    let outputs = ["result", "stderr", "judgerlog"].map(|n| dir.path().join(n));

    let result = Inputmaker::new(Arc::new(LocalSandbox::default()))
      .run(&[source, option, dir.path().join("no-generator")], &outputs)
      .await;

    assert_eq!(result.status, Status::Ok);
    assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "1 2\n");
    assert!(outputs[1].exists() && outputs[2].exists());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_inputmaker_runs_generator() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let generator = dir.path().join("gen");
    std::fs::write(&generator, "#!/bin/sh\necho \"$2 $1\"\n").unwrap();
    std::fs::set_permissions(&generator, std::fs::Permissions::from_mode(0o755)).unwrap();
    let source = dir.path().join("source");
    let option = dir.path().join("option");
    std::fs::write(&source, "first second\n").unwrap();
    std::fs::write(&option, "generate").unwrap();
    let outputs = ["result", "stderr", "judgerlog"].map(|n| dir.path().join(n));

    let result = Inputmaker::new(Arc::new(LocalSandbox::default()))
      .run(&[source, option, generator], &outputs)
      .await;

    assert_eq!(result.status, Status::Ok);
    assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "second first\n");
  }
}

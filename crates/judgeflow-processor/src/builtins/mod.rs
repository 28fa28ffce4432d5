//! Stock processors backed by a [`Sandbox`].

mod checker;
mod compiler;
mod generator;
mod runner;

use std::path::Path;
use std::sync::Arc;

use crate::processor::Processor;
use crate::result::ExecutionResult;
use crate::sandbox::{Sandbox, SandboxRequest};

pub use checker::{CheckerHcmp, CheckerTestlib, TestlibReport};
pub use compiler::{Compiler, CompilerAuto};
pub use generator::{GeneratorTestlib, Inputmaker};
pub use runner::{RunnerFileio, RunnerStdio};

/// Every built-in processor under its registry name.
pub(crate) fn all(sandbox: Arc<dyn Sandbox>) -> Vec<(&'static str, Arc<dyn Processor>)> {
  vec![
    ("compiler", Arc::new(Compiler::new(sandbox.clone())) as Arc<dyn Processor>),
    ("compiler:auto", Arc::new(CompilerAuto::new(sandbox.clone()))),
    ("runner:stdio", Arc::new(RunnerStdio::new(sandbox.clone()))),
    ("runner:fileio", Arc::new(RunnerFileio::new(sandbox.clone()))),
    ("checker:hcmp", Arc::new(CheckerHcmp)),
    ("checker:testlib", Arc::new(CheckerTestlib::new(sandbox.clone()))),
    ("generator:testlib", Arc::new(GeneratorTestlib::new(sandbox.clone()))),
    ("inputmaker", Arc::new(Inputmaker::new(sandbox))),
  ]
}

/// Run a request, folding sandbox failures into a `SystemError` result.
async fn execute(sandbox: &dyn Sandbox, request: SandboxRequest) -> ExecutionResult {
  match sandbox.execute(request).await {
    Ok(result) => result,
    Err(e) => ExecutionResult::system_error(e.to_string()),
  }
}

/// Make sure an output slot exists even when the program never wrote it.
async fn touch(path: &Path) -> std::io::Result<()> {
  tokio::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .await
    .map(|_| ())
}

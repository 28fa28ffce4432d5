//! Judgeflow Processor
//!
//! A processor is one step of a judging pipeline: it consumes a fixed number of
//! input files and writes a fixed number of output files, reporting an
//! [`ExecutionResult`]. Slot names are declared up front through
//! [`Processor::labels`] so graphs can be validated without running anything.
//!
//! Processors are looked up by name in an explicit [`ProcessorRegistry`]
//! that is built once at startup and handed to the graph builder and the
//! runtime. [`ProcessorRegistry::with_builtins`] registers the stock
//! compile/run/check processors on top of a [`Sandbox`].
//!
//! ```text
//! ProcessorRegistry
//! ├── "compiler"          source, script            -> result, log, judgerlog
//! ├── "compiler:auto"     source                    -> result, log, judgerlog
//! ├── "runner:stdio"      executable, stdin, limit  -> stdout, stderr, judgerlog
//! ├── "runner:fileio"     executable, fin, config   -> fout, stderr, judgerlog
//! ├── "checker:hcmp"      out, ans                  -> result
//! ├── "checker:testlib"   checker, input, output, answer -> xmlreport, stderr, judgerlog
//! ├── "generator:testlib" generator, arguments      -> output, stderr, judgerlog
//! └── "inputmaker"        source, option, generator -> result, stderr, judgerlog
//! ```

mod builtins;
mod error;
mod limits;
mod processor;
mod registry;
mod result;
mod sandbox;

pub use builtins::{
  CheckerHcmp, CheckerTestlib, Compiler, CompilerAuto, GeneratorTestlib, Inputmaker, RunnerFileio,
  RunnerStdio, TestlibReport,
};
pub use error::{LimitParseError, RegistryError, ReportError, SandboxError};
pub use limits::ResourceLimits;
pub use processor::{CheckerReport, Labels, Processor, ProcessorKind};
pub use registry::ProcessorRegistry;
pub use result::{ExecutionResult, Status};
pub use sandbox::{LocalSandbox, Sandbox, SandboxConfig, SandboxRequest};

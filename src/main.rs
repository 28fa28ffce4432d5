use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use judgeflow_config::GraphDef;
use judgeflow_problem::{Problem, ProblemRunner, Submission};
use judgeflow_processor::{LocalSandbox, ProcessorRegistry};
use judgeflow_runtime::{Runtime, RuntimeConfig};
use judgeflow_workflow::WorkflowGraph;

/// Judgeflow - a dataflow judge for programming problems
#[derive(Parser)]
#[command(name = "judgeflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.judgeflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Maximum number of processors running at once
  #[arg(long, global = true)]
  workers: Option<usize>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Judge a submission against a problem package
  Judge {
    /// Problem directory containing problem.json and workflow/graph.json
    #[arg(long)]
    problem: PathBuf,

    /// Submission file as field=PATH; repeat for each field
    #[arg(long = "submission", value_parser = parse_submission, required = true)]
    submission: Vec<(String, PathBuf)>,

    /// Directory for intermediate files (default: <data-dir>/work)
    #[arg(long)]
    work_dir: Option<PathBuf>,
  },

  /// Inspect workflow graphs
  Graph {
    #[command(subcommand)]
    target: GraphTarget,
  },
}

#[derive(Subcommand)]
enum GraphTarget {
  /// Check a graph definition against the built-in processors
  Validate {
    /// Path to the graph file (JSON)
    graph_file: PathBuf,
  },
}

fn parse_submission(value: &str) -> Result<(String, PathBuf), String> {
  match value.split_once('=') {
    Some((field, path)) if !field.is_empty() && !path.is_empty() => {
      Ok((field.to_string(), PathBuf::from(path)))
    }
    _ => Err(format!("expected field=PATH, got '{value}'")),
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".judgeflow"),
  };

  let mut config = RuntimeConfig::default();
  if let Some(workers) = cli.workers {
    config.workers = workers;
  }

  match cli.command {
    Some(Commands::Judge {
      problem,
      submission,
      work_dir,
    }) => {
      let work_dir = work_dir.unwrap_or_else(|| data_dir.join("work"));
      let submission = submission.into_iter().collect();
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { judge(&problem, submission, &work_dir, config).await })?;
    }
    Some(Commands::Graph { target }) => match target {
      GraphTarget::Validate { graph_file } => {
        validate_graph(&graph_file)?;
      }
    },
    None => {
      println!("judgeflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn builtin_registry() -> ProcessorRegistry {
  ProcessorRegistry::with_builtins(Arc::new(LocalSandbox::default()))
}

async fn judge(problem_dir: &Path, submission: Submission, work_dir: &Path, config: RuntimeConfig) -> Result<()> {
  let registry = Arc::new(builtin_registry());

  let problem = Problem::load(problem_dir, &registry)
    .await
    .with_context(|| format!("failed to load problem: {}", problem_dir.display()))?;

  info!(
    tests = problem.manifest().tests.len(),
    subtask = problem.is_subtask(),
    "problem_ready"
  );

  // Resolve submission paths before the working directory of processors
  // comes into play.
  let submission = submission
    .into_iter()
    .map(|(field, path)| {
      std::path::absolute(&path)
        .with_context(|| format!("invalid submission path: {}", path.display()))
        .map(|path| (field, path))
    })
    .collect::<Result<Submission>>()?;

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling judgement");
      on_interrupt.cancel();
    }
  });

  let runner = ProblemRunner::new(Runtime::new(registry, config));
  let result = runner
    .run(&problem, &submission, work_dir, cancel)
    .await
    .context("judgement failed")?;

  eprintln!("Score: {} / {}", result.score(), result.full_score());
  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}

fn validate_graph(graph_file: &Path) -> Result<()> {
  let content = std::fs::read_to_string(graph_file)
    .with_context(|| format!("failed to read graph file: {}", graph_file.display()))?;

  let def = GraphDef::from_json(&content)
    .with_context(|| format!("failed to parse graph file: {}", graph_file.display()))?;

  let graph = WorkflowGraph::resolve(&def, &builtin_registry()).context("invalid workflow graph")?;

  eprintln!("Graph is valid: {} nodes", graph.nodes().len());
  println!("{}", graph.topological_order().join(" -> "));

  Ok(())
}

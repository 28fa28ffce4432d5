//! Workflow runtime.
//!
//! The [`Runtime`] owns the processor registry, the content cache and the
//! worker pool. [`Runtime::execute`] walks a graph in dependency order and
//! returns the per-node state; [`Runtime::run`] additionally hands that state
//! to an analyzer.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use judgeflow_processor::{ExecutionResult, Processor, ProcessorRegistry};
use judgeflow_workflow::WorkflowGraph;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::analyzer::{AnalysisInput, Analyzer};
use crate::cache::{CacheEntry, ContentCache};
use crate::error::RuntimeError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::hash::ContentHash;
use crate::node::{InboundPaths, NodeOutcome, RuntimeNode};
use crate::result::JudgeResult;

/// Configuration for the runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Maximum number of processors running at once, across all runs.
  pub workers: usize,
  /// Maximum bytes of each evidence file shown in results.
  pub excerpt_len: usize,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      workers: std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4),
      excerpt_len: 5000,
    }
  }
}

/// A node that has finished on a worker.
struct NodeRun {
  name: String,
  inputs: Vec<PathBuf>,
  hash: ContentHash,
  entry: CacheEntry,
  fresh: bool,
}

/// Pending per-node state while a run is in flight.
struct Pending {
  processor: String,
  key: bool,
  inputs: Vec<Option<PathBuf>>,
}

/// The workflow runtime.
///
/// Generic over `N: ExecutionNotifier` so callers can observe progress. Use
/// [`Runtime::new`] for a runtime that discards events.
pub struct Runtime<N: ExecutionNotifier = NoopNotifier> {
  registry: Arc<ProcessorRegistry>,
  cache: Arc<ContentCache>,
  workers: Arc<Semaphore>,
  config: RuntimeConfig,
  notifier: N,
}

impl Runtime<NoopNotifier> {
  pub fn new(registry: Arc<ProcessorRegistry>, config: RuntimeConfig) -> Self {
    Self::with_notifier(registry, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> Runtime<N> {
  pub fn with_notifier(registry: Arc<ProcessorRegistry>, config: RuntimeConfig, notifier: N) -> Self {
    Self {
      registry,
      cache: Arc::new(ContentCache::new()),
      workers: Arc::new(Semaphore::new(config.workers.max(1))),
      config,
      notifier,
    }
  }

  /// Share an existing cache instead of starting empty.
  pub fn with_cache(mut self, cache: Arc<ContentCache>) -> Self {
    self.cache = cache;
    self
  }

  pub fn registry(&self) -> &ProcessorRegistry {
    &self.registry
  }

  pub fn cache(&self) -> &Arc<ContentCache> {
    &self.cache
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  /// Execute `graph` and judge it with `analyzer`.
  pub async fn run(
    &self,
    graph: &WorkflowGraph,
    analyzer: &dyn Analyzer,
    work_dir: &Path,
    inbound: &InboundPaths,
    full_score: f64,
    cancel: CancellationToken,
  ) -> Result<JudgeResult, RuntimeError> {
    let nodes = self.execute(graph, work_dir, inbound, cancel).await?;
    let input = AnalysisInput {
      graph,
      nodes: &nodes,
      full_score,
      registry: &self.registry,
      excerpt_len: self.config.excerpt_len,
    };
    Ok(analyzer.analyze(&input).await)
  }

  /// Execute every node of `graph`, writing outputs under `work_dir`.
  ///
  /// Returns nodes in completion order. Processor failures are recorded on
  /// the nodes; only scheduler failures are errors, and they abort the whole
  /// run. Cached outputs from an earlier, since removed `work_dir` are
  /// recomputed here.
  #[instrument(
    name = "runtime_execute",
    skip(self, graph, work_dir, inbound, cancel),
    fields(work_dir = %work_dir.display())
  )]
  pub async fn execute(
    &self,
    graph: &WorkflowGraph,
    work_dir: &Path,
    inbound: &InboundPaths,
    cancel: CancellationToken,
  ) -> Result<Vec<RuntimeNode>, RuntimeError> {
    let run_id = uuid::Uuid::new_v4().to_string();

    info!(run_id = %run_id, nodes = graph.nodes().len(), "workflow_started");
    self.notifier.notify(ExecutionEvent::RunStarted {
      run_id: run_id.clone(),
    });

    let result = self
      .execute_inner(graph, work_dir, inbound, &run_id, &cancel)
      .await;

    match &result {
      Ok(_) => {
        info!(run_id = %run_id, "workflow_completed");
        self.notifier.notify(ExecutionEvent::RunCompleted { run_id });
      }
      Err(e) => {
        error!(run_id = %run_id, error = %e, "workflow_failed");
        self.notifier.notify(ExecutionEvent::RunFailed {
          run_id,
          error: e.to_string(),
        });
      }
    }

    result
  }

  async fn execute_inner(
    &self,
    graph: &WorkflowGraph,
    work_dir: &Path,
    inbound: &InboundPaths,
    run_id: &str,
    cancel: &CancellationToken,
  ) -> Result<Vec<RuntimeNode>, RuntimeError> {
    let mut pending: HashMap<String, Pending> = graph
      .nodes()
      .iter()
      .map(|(name, node)| {
        (
          name.clone(),
          Pending {
            processor: node.processor.clone(),
            key: node.key,
            inputs: vec![None; node.labels.inputs.len()],
          },
        )
      })
      .collect();

    for (group, fields) in graph.inbound() {
      for (field, slots) in fields {
        let path = inbound
          .get(*group, field)
          .ok_or_else(|| RuntimeError::MissingInbound {
            group: *group,
            field: field.clone(),
          })?;
        for slot in slots {
          if let Some(state) = pending.get_mut(&slot.node) {
            state.inputs[slot.slot] = Some(path.to_path_buf());
          }
        }
      }
    }

    let adjacency = graph.graph();
    adjacency
      .topological_order()
      .map_err(|nodes| RuntimeError::NotADag { nodes })?;

    tokio::fs::create_dir_all(work_dir).await?;

    let mut indegree: HashMap<String, usize> = adjacency
      .indegrees()
      .into_iter()
      .map(|(name, count)| (name.to_string(), count))
      .collect();
    let mut ready: Vec<String> = adjacency.entry_points().to_vec();
    let mut not_ok: HashSet<String> = HashSet::new();
    let mut finished: Vec<RuntimeNode> = Vec::with_capacity(pending.len());
    let mut tasks: JoinSet<Result<NodeRun, RuntimeError>> = JoinSet::new();

    loop {
      while let Some(name) = ready.pop() {
        let Some(state) = pending.remove(&name) else {
          continue;
        };

        if adjacency.upstream(&name).iter().any(|up| not_ok.contains(up)) {
          warn!(run_id = %run_id, node = %name, "node_skipped");
          self.notifier.notify(ExecutionEvent::NodeSkipped {
            run_id: run_id.to_string(),
            node: name.clone(),
          });
          not_ok.insert(name.clone());
          unlock(adjacency.downstream(&name), &mut indegree, &mut ready);
          finished.push(RuntimeNode {
            name,
            processor: state.processor,
            key: state.key,
            inputs: state.inputs,
            outputs: Vec::new(),
            hash: None,
            outcome: NodeOutcome::Skipped,
          });
          continue;
        }

        let task = self.prepare(graph, &name, state, work_dir)?;
        self.notifier.notify(ExecutionEvent::NodeStarted {
          run_id: run_id.to_string(),
          node: name.clone(),
        });
        tasks.spawn(task);
      }

      if tasks.is_empty() {
        break;
      }

      let joined = tokio::select! {
        joined = tasks.join_next() => joined,
        _ = cancel.cancelled() => {
          warn!(run_id = %run_id, "workflow_cancelled");
          tasks.abort_all();
          return Err(RuntimeError::Cancelled);
        }
      };
      let Some(joined) = joined else {
        break;
      };

      let run = match joined {
        Ok(Ok(run)) => run,
        Ok(Err(e)) => {
          tasks.abort_all();
          return Err(e);
        }
        Err(e) => {
          tasks.abort_all();
          return Err(RuntimeError::Join {
            message: e.to_string(),
          });
        }
      };

      let node = graph
        .node(&run.name)
        .ok_or_else(|| RuntimeError::Join {
          message: format!("finished node '{}' is not in the graph", run.name),
        })?;

      let outcome = if run.fresh {
        info!(
          run_id = %run_id,
          node = %run.name,
          status = %run.entry.result.status,
          hash = %run.hash,
          "node_completed"
        );
        self.notifier.notify(ExecutionEvent::NodeCompleted {
          run_id: run_id.to_string(),
          node: run.name.clone(),
          status: run.entry.result.status,
        });
        NodeOutcome::Executed(run.entry.result.clone())
      } else {
        info!(run_id = %run_id, node = %run.name, hash = %run.hash, "node_cached");
        self.notifier.notify(ExecutionEvent::NodeCached {
          run_id: run_id.to_string(),
          node: run.name.clone(),
          hash: run.hash,
        });
        NodeOutcome::Cached(run.entry.result.clone())
      };

      if !run.entry.result.is_ok() {
        not_ok.insert(run.name.clone());
      }

      for edge in graph.outgoing(&run.name) {
        let Some(target) = pending.get_mut(&edge.to.node) else {
          continue;
        };
        if let Some(output) = run.entry.outputs.get(edge.from.slot) {
          target.inputs[edge.to.slot] = Some(output.clone());
        }
      }
      unlock(adjacency.downstream(&run.name), &mut indegree, &mut ready);

      finished.push(RuntimeNode {
        name: run.name,
        processor: node.processor.clone(),
        key: node.key,
        inputs: run.inputs.into_iter().map(Some).collect(),
        outputs: run.entry.outputs,
        hash: Some(run.hash),
        outcome,
      });
    }

    if !pending.is_empty() {
      let mut nodes: Vec<String> = pending.into_keys().collect();
      nodes.sort();
      return Err(RuntimeError::NotADag { nodes });
    }

    Ok(finished)
  }

  /// Build the worker future for a runnable node.
  fn prepare(
    &self,
    graph: &WorkflowGraph,
    name: &str,
    state: Pending,
    work_dir: &Path,
  ) -> Result<impl Future<Output = Result<NodeRun, RuntimeError>> + Send + 'static, RuntimeError> {
    let labels = graph
      .node(name)
      .map(|n| n.labels)
      .ok_or_else(|| RuntimeError::Join {
        message: format!("node '{name}' is not in the graph"),
      })?;

    let inputs = state
      .inputs
      .into_iter()
      .enumerate()
      .map(|(slot, path)| {
        path.ok_or_else(|| RuntimeError::InputNotFulfilled {
          node: name.to_string(),
          label: labels.inputs.get(slot).copied().unwrap_or_default().to_string(),
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    let processor = self
      .registry
      .get(&state.processor)
      .ok_or_else(|| RuntimeError::UnknownProcessor {
        node: name.to_string(),
        processor: state.processor.clone(),
      })?;

    let name = name.to_string();
    let processor_name = state.processor;
    let output_count = labels.outputs.len();
    let cache = self.cache.clone();
    let workers = self.workers.clone();
    let work_dir = work_dir.to_path_buf();

    Ok(async move {
      let hash = {
        let inputs = inputs.clone();
        tokio::task::spawn_blocking(move || ContentHash::of_inputs(&processor_name, &inputs))
          .await
          .map_err(|e| RuntimeError::Join {
            message: format!("hashing inputs of '{name}': {e}"),
          })?
      };

      let (entry, fresh) = cache
        .get_or_try_compute(hash, || {
          execute_processor(processor, &inputs, output_count, &work_dir, workers)
        })
        .await?;

      Ok(NodeRun {
        name,
        inputs,
        hash,
        entry,
        fresh,
      })
    })
  }
}

/// Run a processor on fresh output paths, holding a worker permit.
async fn execute_processor(
  processor: Arc<dyn Processor>,
  inputs: &[PathBuf],
  output_count: usize,
  work_dir: &Path,
  workers: Arc<Semaphore>,
) -> Result<CacheEntry, RuntimeError> {
  let _permit = workers
    .acquire_owned()
    .await
    .map_err(|_| RuntimeError::Cancelled)?;

  let outputs: Vec<PathBuf> = (0..output_count)
    .map(|_| work_dir.join(uuid::Uuid::new_v4().simple().to_string()))
    .collect();

  let result: ExecutionResult = processor.run(inputs, &outputs).await;

  // Outputs the processor left unwritten exist empty, so an entry goes stale
  // only when its files are removed.
  for output in &outputs {
    tokio::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(output)
      .await?;
  }

  Ok(CacheEntry { outputs, result })
}

/// Decrement the indegree of each downstream node, queueing those that
/// reach zero.
fn unlock(downstream: &[String], indegree: &mut HashMap<String, usize>, ready: &mut Vec<String>) {
  for next in downstream {
    if let Some(count) = indegree.get_mut(next) {
      *count = count.saturating_sub(1);
      if *count == 0 {
        ready.push(next.clone());
      }
    }
  }
}

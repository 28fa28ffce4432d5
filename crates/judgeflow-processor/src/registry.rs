use std::collections::HashMap;
use std::sync::Arc;

use crate::builtins;
use crate::error::RegistryError;
use crate::processor::{Labels, Processor};
use crate::sandbox::Sandbox;

/// Named processors available to graphs.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
  processors: HashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry holding every built-in processor, executing through
  /// `sandbox`.
  pub fn with_builtins(sandbox: Arc<dyn Sandbox>) -> Self {
    let processors = builtins::all(sandbox)
      .into_iter()
      .map(|(name, processor)| (name.to_string(), processor))
      .collect();
    Self { processors }
  }

  pub fn register(
    &mut self,
    name: impl Into<String>,
    processor: impl Processor + 'static,
  ) -> Result<(), RegistryError> {
    self.register_arc(name, Arc::new(processor))
  }

  pub fn register_arc(
    &mut self,
    name: impl Into<String>,
    processor: Arc<dyn Processor>,
  ) -> Result<(), RegistryError> {
    let name = name.into();
    if self.processors.contains_key(&name) {
      return Err(RegistryError::AlreadyRegistered { name });
    }
    self.processors.insert(name, processor);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn Processor>> {
    self.processors.get(name).cloned()
  }

  pub fn labels(&self, name: &str) -> Option<Labels> {
    self.processors.get(name).map(|p| p.labels())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.processors.contains_key(name)
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.processors.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}

impl std::fmt::Debug for ProcessorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProcessorRegistry")
      .field("processors", &self.names())
      .finish()
  }
}

//! Content-addressed memoization of node executions.
//!
//! Entries are keyed by [`ContentHash`] and written once. Concurrent requests
//! for the same key are single-flight: the first caller computes, the rest
//! wait and observe the same entry. An entry whose output files have been
//! removed is stale: the next lookup evicts it and computes again.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use judgeflow_processor::ExecutionResult;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::error::CacheError;
use crate::hash::ContentHash;

/// Outputs of the one authoritative execution for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
  pub outputs: Vec<PathBuf>,
  pub result: ExecutionResult,
}

impl CacheEntry {
  /// Whether every output file still exists.
  pub async fn outputs_exist(&self) -> bool {
    for output in &self.outputs {
      if !tokio::fs::try_exists(output).await.unwrap_or(false) {
        return false;
      }
    }
    true
  }
}

/// Write-once map from input content to execution outputs.
#[derive(Debug, Default)]
pub struct ContentCache {
  entries: Mutex<HashMap<ContentHash, Arc<OnceCell<CacheEntry>>>>,
}

impl ContentCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn cell(&self, hash: &ContentHash) -> Arc<OnceCell<CacheEntry>> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.entry(*hash).or_default().clone()
  }

  /// The cell for `hash`, replacing it first if its entry is stale.
  async fn live_cell(&self, hash: &ContentHash) -> Arc<OnceCell<CacheEntry>> {
    let cell = self.cell(hash);
    let stale = match cell.get() {
      Some(entry) => !entry.outputs_exist().await,
      None => false,
    };
    if !stale {
      return cell;
    }

    warn!(hash = %hash, "cache_entry_stale");
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    let current = entries.entry(*hash).or_default();
    if Arc::ptr_eq(current, &cell) {
      *current = Arc::new(OnceCell::new());
    }
    current.clone()
  }

  pub fn get(&self, hash: &ContentHash) -> Option<CacheEntry> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.get(hash).and_then(|cell| cell.get().cloned())
  }

  /// Store an entry. Setting a key twice is an error.
  pub fn set(&self, hash: ContentHash, entry: CacheEntry) -> Result<(), CacheError> {
    self
      .cell(&hash)
      .set(entry)
      .map_err(|_| CacheError::AlreadySet { hash })
  }

  /// Return the entry for `hash`, computing it with `compute` if absent.
  ///
  /// The flag is `true` only for the caller whose `compute` produced the
  /// entry. If `compute` fails (or the computing task is dropped), the key
  /// stays empty and the next waiter computes instead. A stale entry is
  /// evicted and computed again.
  pub async fn get_or_try_compute<F, Fut, E>(
    &self,
    hash: ContentHash,
    compute: F,
  ) -> Result<(CacheEntry, bool), E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CacheEntry, E>>,
  {
    let cell = self.live_cell(&hash).await;
    let mut fresh = false;
    let flag = &mut fresh;
    let entry = cell
      .get_or_try_init(move || async move {
        *flag = true;
        compute().await
      })
      .await?
      .clone();
    Ok((entry, fresh))
  }

  /// Number of populated entries.
  pub fn len(&self) -> usize {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.values().filter(|cell| cell.initialized()).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use std::convert::Infallible;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  use super::*;

  fn entry(name: &str) -> CacheEntry {
    CacheEntry {
      outputs: vec![PathBuf::from(name)],
      result: ExecutionResult::ok(),
    }
  }

  #[test]
  fn test_set_then_get() {
    let cache = ContentCache::new();
    let hash = ContentHash::from_bytes([1; 32]);

    assert!(cache.get(&hash).is_none());
    cache.set(hash, entry("out")).unwrap();
    assert_eq!(cache.get(&hash), Some(entry("out")));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_double_set_is_detected() {
    let cache = ContentCache::new();
    let hash = ContentHash::from_bytes([2; 32]);

    cache.set(hash, entry("first")).unwrap();
    let err = cache.set(hash, entry("second")).unwrap_err();

    assert!(matches!(err, CacheError::AlreadySet { .. }));
    assert_eq!(cache.get(&hash), Some(entry("first")));
  }

  #[tokio::test]
  async fn test_single_flight() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("shared");
    std::fs::write(&shared, "").unwrap();
    let cache = Arc::new(ContentCache::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let hash = ContentHash::from_bytes([3; 32]);

    let mut handles = Vec::new();
    for _ in 0..8 {
      let cache = cache.clone();
      let calls = calls.clone();
      let shared = shared.clone();
      handles.push(tokio::spawn(async move {
        cache
          .get_or_try_compute(hash, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, Infallible>(CacheEntry {
              outputs: vec![shared],
              result: ExecutionResult::ok(),
            })
          })
          .await
          .unwrap()
      }));
    }

    let mut fresh_count = 0;
    for handle in handles {
      let (value, fresh) = handle.await.unwrap();
      assert_eq!(value.outputs, vec![shared.clone()]);
      fresh_count += usize::from(fresh);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fresh_count, 1);
  }

  #[tokio::test]
  async fn test_failed_compute_leaves_key_empty() {
    let cache = ContentCache::new();
    let hash = ContentHash::from_bytes([4; 32]);

    let err = cache
      .get_or_try_compute(hash, || async { Err::<CacheEntry, _>("boom") })
      .await
      .unwrap_err();
    assert_eq!(err, "boom");
    assert!(cache.get(&hash).is_none());

    let (value, fresh) = cache
      .get_or_try_compute(hash, || async { Ok::<_, &str>(entry("retry")) })
      .await
      .unwrap();
    assert!(fresh);
    assert_eq!(value, entry("retry"));
  }

  #[tokio::test]
  async fn test_stale_entry_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out");
    std::fs::write(&output, "").unwrap();
    let cache = ContentCache::new();
    let hash = ContentHash::from_bytes([5; 32]);
    let live = CacheEntry {
      outputs: vec![output.clone()],
      result: ExecutionResult::ok(),
    };
    cache.set(hash, live.clone()).unwrap();

    let (value, fresh) = cache
      .get_or_try_compute(hash, || async { Ok::<_, Infallible>(entry("unused")) })
      .await
      .unwrap();
    assert!(!fresh);
    assert_eq!(value, live);

    std::fs::remove_file(&output).unwrap();
    let (value, fresh) = cache
      .get_or_try_compute(hash, || async { Ok::<_, Infallible>(entry("recomputed")) })
      .await
      .unwrap();
    assert!(fresh);
    assert_eq!(value, entry("recomputed"));
    assert_eq!(cache.len(), 1);
  }
}

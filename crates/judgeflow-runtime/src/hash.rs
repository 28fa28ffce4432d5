//! Content hashing of node inputs.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use tracing::warn;

/// SHA-256 identifying one (processor, input contents) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
  pub fn from_bytes(bytes: [u8; 32]) -> Self {
    Self(bytes)
  }

  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }

  /// Hash a processor name and the contents of its inputs, in slot order.
  ///
  /// The key is SHA-256 over the processor name, a NUL separator and, for
  /// every input file, its SHA-256 digest followed by its NUL-terminated
  /// extension. The extension is part of the key because processors such as
  /// `compiler:auto` pick their behavior from it. An unreadable file
  /// contributes the all-zero digest. Reads files synchronously; call from a
  /// blocking context.
  pub fn of_inputs(processor: &str, inputs: &[PathBuf]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(processor.as_bytes());
    hasher.update([0u8]);
    for input in inputs {
      hasher.update(file_digest(input));
      if let Some(ext) = input.extension() {
        hasher.update(ext.as_encoded_bytes());
      }
      hasher.update([0u8]);
    }
    Self(to_array(&hasher.finalize()))
  }
}

fn file_digest(path: &Path) -> [u8; 32] {
  let digest = File::open(path).and_then(|mut file| {
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize())
  });

  match digest {
    Ok(digest) => to_array(&digest),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "input_hash_failed");
      [0u8; 32]
    }
  }
}

fn to_array(digest: &[u8]) -> [u8; 32] {
  let mut bytes = [0u8; 32];
  bytes.copy_from_slice(digest);
  bytes
}

impl fmt::Display for ContentHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in &self.0 {
      write!(f, "{byte:02x}")?;
    }
    Ok(())
  }
}

impl Serialize for ContentHash {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

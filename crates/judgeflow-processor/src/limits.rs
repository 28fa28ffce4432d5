//! Resource limit sets handed to the sandbox.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LimitParseError;

const MIB: u64 = 1024 * 1024;

/// Resource ceilings for one sandboxed execution. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
  pub real_time: Option<Duration>,
  pub cpu_time: Option<Duration>,
  pub virtual_memory: Option<u64>,
  pub resident_memory: Option<u64>,
  pub stack: Option<u64>,
  pub output: Option<u64>,
  pub fileno: Option<u64>,
}

impl ResourceLimits {
  /// Limits for toolchain steps (compilers, checkers, generators): one
  /// minute of wall time and 10 MiB of output.
  pub fn toolchain() -> Self {
    Self {
      real_time: Some(Duration::from_secs(60)),
      output: Some(10 * MIB),
      ..Self::default()
    }
  }
}

/// Parses a limit line: real time (ms), CPU time (ms), virtual memory (bytes),
/// resident memory (bytes), stack (bytes), output (bytes) and file
/// descriptor count, separated by whitespace. Non-positive values mean
/// unlimited. Anything after the seventh value is ignored.
impl FromStr for ResourceLimits {
  type Err = LimitParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let values = s
      .split_whitespace()
      .take(7)
      .map(|token| {
        token
          .parse::<i64>()
          .map_err(|_| LimitParseError::InvalidValue {
            value: token.to_string(),
          })
      })
      .collect::<Result<Vec<_>, _>>()?;

    if values.len() < 7 {
      return Err(LimitParseError::MissingValues {
        found: values.len(),
      });
    }

    let positive = |v: i64| u64::try_from(v).ok().filter(|v| *v > 0);
    let millis = |v: i64| positive(v).map(Duration::from_millis);

    Ok(Self {
      real_time: millis(values[0]),
      cpu_time: millis(values[1]),
      virtual_memory: positive(values[2]),
      resident_memory: positive(values[3]),
      stack: positive(values[4]),
      output: positive(values[5]),
      fileno: positive(values[6]),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_line() {
    let limits: ResourceLimits = "1000 1000 268435456 268435456 67108864 65536 32"
      .parse()
      .unwrap();

    assert_eq!(limits.real_time, Some(Duration::from_secs(1)));
    assert_eq!(limits.cpu_time, Some(Duration::from_secs(1)));
    assert_eq!(limits.virtual_memory, Some(256 * MIB));
    assert_eq!(limits.stack, Some(64 * MIB));
    assert_eq!(limits.output, Some(65536));
    assert_eq!(limits.fileno, Some(32));
  }

  #[test]
  fn test_non_positive_means_unlimited() {
    let limits: ResourceLimits = "2000 0 -1 0 0 0 0\n".parse().unwrap();

    assert_eq!(limits.real_time, Some(Duration::from_secs(2)));
    assert_eq!(limits.cpu_time, None);
    assert_eq!(limits.virtual_memory, None);
    assert_eq!(limits.fileno, None);
  }

  #[test]
  fn test_short_line_is_rejected() {
    let err = "1000 1000".parse::<ResourceLimits>().unwrap_err();
    assert_eq!(err, LimitParseError::MissingValues { found: 2 });
  }

  #[test]
  fn test_garbage_is_rejected() {
    let err = "1000 fast 0 0 0 0 0".parse::<ResourceLimits>().unwrap_err();
    assert_eq!(
      err,
      LimitParseError::InvalidValue {
        value: "fast".to_string()
      }
    );
  }
}

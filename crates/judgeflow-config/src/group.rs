use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named source of testcase-external data.
///
/// Inbound bindings pull files out of one of these groups into a node's
/// input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataGroup {
  /// Per-testcase files (input, answer, ...).
  Tests,
  /// Per-subtask files.
  Subtask,
  /// Problem-wide files (limits, compile scripts, checkers).
  Static,
  /// Files handed in by the contestant.
  Submission,
}

impl DataGroup {
  pub const ALL: [DataGroup; 4] = [
    DataGroup::Tests,
    DataGroup::Subtask,
    DataGroup::Static,
    DataGroup::Submission,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DataGroup::Tests => "tests",
      DataGroup::Subtask => "subtask",
      DataGroup::Static => "static",
      DataGroup::Submission => "submission",
    }
  }
}

impl fmt::Display for DataGroup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data group '{0}' (expected tests, subtask, static or submission)")]
pub struct ParseDataGroupError(pub String);

impl FromStr for DataGroup {
  type Err = ParseDataGroupError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DataGroup::ALL
      .into_iter()
      .find(|group| group.as_str() == s)
      .ok_or_else(|| ParseDataGroupError(s.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_round_trips_names() {
    for group in DataGroup::ALL {
      assert_eq!(group.as_str().parse::<DataGroup>(), Ok(group));
    }
  }

  #[test]
  fn test_parse_rejects_unknown_group() {
    let err = "testcase".parse::<DataGroup>().unwrap_err();
    assert_eq!(err, ParseDataGroupError("testcase".to_string()));
  }

  #[test]
  fn test_serde_uses_lowercase_names() {
    let json = serde_json::to_string(&DataGroup::Submission).unwrap();
    assert_eq!(json, "\"submission\"");
  }
}

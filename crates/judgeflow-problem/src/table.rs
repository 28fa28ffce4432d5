use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of a data table: field name to value.
///
/// Fields starting with `_` are private (scoring metadata); the rest name
/// files relative to the problem directory.
pub type Record = BTreeMap<String, String>;

/// Private field holding a score (number or `"average"`).
pub const SCORE_FIELD: &str = "_score";
/// Private field linking a test to its subtask, and naming a subtask.
pub const SUBTASK_ID_FIELD: &str = "_subtaskid";

pub fn is_private(field: &str) -> bool {
  field.starts_with('_')
}

/// Public (file) fields of a record, in field order.
pub fn public_fields(record: &Record) -> impl Iterator<Item = (&String, &String)> {
  record.iter().filter(|(field, _)| !is_private(field))
}

/// Records sharing a field schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
  #[serde(default)]
  pub fields: Vec<String>,
  #[serde(default)]
  pub records: Vec<Record>,
}

impl Table {
  pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      fields: fields.into_iter().map(Into::into).collect(),
      records: Vec::new(),
    }
  }

  /// Append a record built from `(field, value)` pairs.
  pub fn push<K, V>(&mut self, record: impl IntoIterator<Item = (K, V)>)
  where
    K: Into<String>,
    V: Into<String>,
  {
    self
      .records
      .push(record.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
  }

  pub fn has_field(&self, field: &str) -> bool {
    self.fields.iter().any(|f| f == field)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_public_fields_skip_private() {
    let mut table = Table::new(["input", "answer", "_score"]);
    table.push([("input", "1.in"), ("answer", "1.ans"), ("_score", "average")]);

    let public: Vec<&str> = public_fields(&table.records[0])
      .map(|(field, _)| field.as_str())
      .collect();
    assert_eq!(public, vec!["answer", "input"]);
    assert!(table.has_field("_score"));
    assert_eq!(table.len(), 1);
  }
}

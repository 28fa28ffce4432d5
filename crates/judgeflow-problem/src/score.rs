//! Score weights per testcase.

use std::collections::HashMap;

use crate::error::ProblemError;
use crate::problem::ProblemManifest;
use crate::table::{SCORE_FIELD, SUBTASK_ID_FIELD};

const AVERAGE: &str = "average";

/// One testcase to judge, by row index into the tests table.
#[derive(Debug, Clone, PartialEq)]
pub struct TestcasePlan {
  pub test: usize,
  pub score: f64,
}

/// A group of testcases. Without subtasks there is exactly one group with no
/// subtask index.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtaskPlan {
  /// Row index into the subtasks table.
  pub subtask: Option<usize>,
  pub id: Option<String>,
  pub full_score: f64,
  pub testcases: Vec<TestcasePlan>,
}

/// Parse a `_score` value: a number, or `None` for `"average"`.
fn parse_score(value: &str) -> Result<Option<f64>, ProblemError> {
  if value == AVERAGE {
    return Ok(None);
  }
  value
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|score| score.is_finite() && *score >= 0.0)
    .map(Some)
    .ok_or_else(|| ProblemError::InvalidScore {
      value: value.to_string(),
    })
}

/// Compute the per-testcase weights, validating the tables on the way.
///
/// In subtask mode every test belongs to exactly one subtask and a subtask's
/// score is split evenly among its tests. Otherwise each test carries a
/// numeric `_score`, or `"average"` (also the default) for an even share of
/// the full score.
pub fn plan(manifest: &ProblemManifest) -> Result<Vec<SubtaskPlan>, ProblemError> {
  if manifest.is_subtask() {
    plan_subtasks(manifest)
  } else {
    plan_flat(manifest).map(|plan| vec![plan])
  }
}

fn plan_subtasks(manifest: &ProblemManifest) -> Result<Vec<SubtaskPlan>, ProblemError> {
  let mut plans = Vec::with_capacity(manifest.subtasks.len());
  let mut by_id: HashMap<&str, usize> = HashMap::new();

  for (index, record) in manifest.subtasks.records.iter().enumerate() {
    let id = record
      .get(SUBTASK_ID_FIELD)
      .ok_or(ProblemError::UnnamedSubtask { index })?;
    if by_id.insert(id.as_str(), index).is_some() {
      return Err(ProblemError::DuplicateSubtask(id.clone()));
    }
    let score = record
      .get(SCORE_FIELD)
      .map(|value| parse_score(value))
      .transpose()?
      .flatten()
      .ok_or_else(|| ProblemError::InvalidScore {
        value: record.get(SCORE_FIELD).cloned().unwrap_or_default(),
      })?;
    plans.push(SubtaskPlan {
      subtask: Some(index),
      id: Some(id.clone()),
      full_score: score,
      testcases: Vec::new(),
    });
  }

  for (test, record) in manifest.tests.records.iter().enumerate() {
    let id = record
      .get(SUBTASK_ID_FIELD)
      .ok_or(ProblemError::MissingSubtaskId { test })?;
    let index = by_id
      .get(id.as_str())
      .copied()
      .ok_or_else(|| ProblemError::UnknownSubtask {
        test,
        subtask: id.clone(),
      })?;
    plans[index].testcases.push(TestcasePlan { test, score: 0.0 });
  }

  for plan in &mut plans {
    let count = plan.testcases.len() as f64;
    for testcase in &mut plan.testcases {
      testcase.score = plan.full_score / count;
    }
  }

  Ok(plans)
}

fn plan_flat(manifest: &ProblemManifest) -> Result<SubtaskPlan, ProblemError> {
  let count = manifest.tests.len() as f64;
  let testcases = manifest
    .tests
    .records
    .iter()
    .enumerate()
    .map(|(test, record)| {
      if record.contains_key(SUBTASK_ID_FIELD) {
        return Err(ProblemError::UnexpectedSubtaskId { test });
      }
      let explicit = match record.get(SCORE_FIELD) {
        Some(value) => parse_score(value)?,
        None => None,
      };
      Ok(TestcasePlan {
        test,
        score: explicit.unwrap_or(manifest.full_score / count),
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  Ok(SubtaskPlan {
    subtask: None,
    id: None,
    full_score: manifest.full_score,
    testcases,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::Table;

  fn manifest(full_score: f64, tests: Table, subtasks: Table) -> ProblemManifest {
    ProblemManifest {
      full_score,
      analyzer: None,
      tests,
      subtasks,
      static_data: Default::default(),
      submission: vec!["source".to_string()],
    }
  }

  #[test]
  fn test_subtask_weights() {
    let mut subtasks = Table::new(["_subtaskid", "_score"]);
    subtasks.push([("_subtaskid", "small"), ("_score", "60")]);
    subtasks.push([("_subtaskid", "large"), ("_score", "40")]);
    let mut tests = Table::new(["input", "_subtaskid"]);
    for (input, id) in [("1", "small"), ("2", "small"), ("3", "large"), ("4", "small")] {
      tests.push([("input", input), ("_subtaskid", id)]);
    }

    let plans = plan(&manifest(100.0, tests, subtasks)).unwrap();

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].id.as_deref(), Some("small"));
    assert_eq!(
      plans[0].testcases,
      vec![
        TestcasePlan { test: 0, score: 20.0 },
        TestcasePlan { test: 1, score: 20.0 },
        TestcasePlan { test: 3, score: 20.0 },
      ]
    );
    assert_eq!(plans[1].testcases, vec![TestcasePlan { test: 2, score: 40.0 }]);
  }

  #[test]
  fn test_average_weights() {
    let mut tests = Table::new(["input", "_score"]);
    for input in ["1", "2", "3"] {
      tests.push([("input", input), ("_score", "average")]);
    }
    tests.push([("input", "4")]);

    let plans = plan(&manifest(100.0, tests, Table::default())).unwrap();

    assert_eq!(plans.len(), 1);
    assert!(plans[0].subtask.is_none());
    assert!(plans[0].testcases.iter().all(|t| t.score == 25.0));
  }

  #[test]
  fn test_explicit_scores() {
    let mut tests = Table::new(["input", "_score"]);
    tests.push([("input", "1"), ("_score", "30")]);
    tests.push([("input", "2"), ("_score", "70")]);

    let plans = plan(&manifest(100.0, tests, Table::default())).unwrap();
    let scores: Vec<f64> = plans[0].testcases.iter().map(|t| t.score).collect();
    assert_eq!(scores, vec![30.0, 70.0]);
  }

  #[test]
  fn test_invalid_score_rejected() {
    let mut tests = Table::new(["input", "_score"]);
    tests.push([("input", "1"), ("_score", "lots")]);

    let err = plan(&manifest(100.0, tests, Table::default())).unwrap_err();
    assert!(matches!(err, ProblemError::InvalidScore { value } if value == "lots"));
  }

  #[test]
  fn test_unknown_subtask_rejected() {
    let mut subtasks = Table::new(["_subtaskid", "_score"]);
    subtasks.push([("_subtaskid", "a"), ("_score", "100")]);
    let mut tests = Table::new(["input", "_subtaskid"]);
    tests.push([("input", "1"), ("_subtaskid", "b")]);

    let err = plan(&manifest(100.0, tests, subtasks)).unwrap_err();
    assert!(matches!(err, ProblemError::UnknownSubtask { test: 0, subtask } if subtask == "b"));
  }

  #[test]
  fn test_independent_test_rejected_in_subtask_mode() {
    let mut subtasks = Table::new(["_subtaskid", "_score"]);
    subtasks.push([("_subtaskid", "a"), ("_score", "100")]);
    let mut tests = Table::new(["input"]);
    tests.push([("input", "1")]);

    let err = plan(&manifest(100.0, tests, subtasks)).unwrap_err();
    assert!(matches!(err, ProblemError::MissingSubtaskId { test: 0 }));
  }

  #[test]
  fn test_subtask_id_rejected_without_subtasks() {
    let mut tests = Table::new(["input", "_subtaskid"]);
    tests.push([("input", "1"), ("_subtaskid", "a")]);

    let err = plan(&manifest(100.0, tests, Table::default())).unwrap_err();
    assert!(matches!(err, ProblemError::UnexpectedSubtaskId { test: 0 }));
  }

  #[test]
  fn test_subtask_requires_numeric_score() {
    let mut subtasks = Table::new(["_subtaskid", "_score"]);
    subtasks.push([("_subtaskid", "a"), ("_score", "average")]);
    let mut tests = Table::new(["input", "_subtaskid"]);
    tests.push([("input", "1"), ("_subtaskid", "a")]);

    assert!(plan(&manifest(100.0, tests, subtasks)).is_err());
  }
}

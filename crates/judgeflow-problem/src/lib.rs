//! Judgeflow Problem
//!
//! Problem packages and the testcase driver.
//!
//! A problem is a directory holding `problem.json` (data tables, scoring and
//! submission fields) and `workflow/graph.json` (the judging graph). The
//! [`ProblemRunner`] runs the graph once per testcase, binding the table
//! fields of that testcase as inbound files, and aggregates the verdicts per
//! subtask.

mod driver;
mod error;
mod problem;
mod score;
mod table;

pub use driver::{ProblemResult, ProblemRunner, Submission, SubtaskResult, TestcaseResult};
pub use error::ProblemError;
pub use problem::{GRAPH_FILE, MANIFEST_FILE, Problem, ProblemManifest};
pub use score::{SubtaskPlan, TestcasePlan, plan};
pub use table::{Record, SCORE_FIELD, SUBTASK_ID_FIELD, Table, is_private, public_fields};

//! Step Ledger
//!
//! A ledger session accumulates the intermediate states of a single reduction run
//! and finalizes them into an immutable [`HistoryEntry`].
//!
//! Every matrix handed to the ledger is cloned on the way in, so the reducer can keep
//! mutating its working copy without touching anything already recorded.
//!

use crate::chrono::{SecondsFormat, Utc};
use crate::diff::*;
use crate::serde::{Deserialize, Serialize};
use crate::util::*;
use derivative::Derivative;

/// one row operation and the full matrix right after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub description: String,
    #[serde(with = "matrix_serde")]
    pub after: Matrix,
}

/// a finished reduction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// ISO-8601 UTC time of [`LedgerSession::finish`]
    pub timestamp: String,
    #[serde(with = "matrix_serde")]
    pub before: Matrix,
    #[serde(with = "matrix_serde")]
    pub after: Matrix,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

impl HistoryEntry {
    /// cell level changes between `before` and `after`, computed on demand
    pub fn diff(&self) -> DiffResult {
        diff_matrices(&self.before, &self.after)
    }
}

/// the only interface a reducer sees of the ledger
pub trait StepRecorder {
    /// record a step; the recorder takes its own copy of `matrix`
    fn push_step(&mut self, description: String, matrix: &Matrix);
}

#[derive(Debug, Clone, Derivative)]
#[derivative(Default(new = "true"))]
pub struct LedgerSession {
    before: Option<Matrix>,
    steps: Vec<StepRecord>,
}

impl LedgerSession {
    /// capture the starting matrix and drop any unfinished steps
    pub fn start(&mut self, before: &Matrix) {
        self.steps.clear();
        self.before = Some(before.clone());
    }

    /// build the history entry and reset the session for reuse;
    /// must follow [`Self::start`], otherwise `before` is recorded as an empty matrix
    pub fn finish(&mut self, final_matrix: &Matrix) -> HistoryEntry {
        let entry = HistoryEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            before: self.before.take().unwrap_or_default(),
            after: final_matrix.clone(),
            steps: std::mem::take(&mut self.steps),
        };
        tracing::debug!(steps = entry.steps.len(), "ledger session finished");
        entry
    }
}

impl StepRecorder for LedgerSession {
    fn push_step(&mut self, description: String, matrix: &Matrix) {
        tracing::debug!(step = self.steps.len() + 1, %description, "record step");
        self.steps.push(StepRecord {
            description,
            after: matrix.clone(),
        });
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::chrono::DateTime;

    #[test]
    fn ledger_session_snapshots_are_independent() {
        // cargo test ledger_session_snapshots_are_independent -- --nocapture
        let mut working = vec![vec![1., 2.], vec![3., 4.]];
        let mut session = LedgerSession::new();
        session.start(&working);
        working[0][0] = 10.;
        session.push_step("first".to_string(), &working);
        working[1][1] = 40.;
        session.push_step("second".to_string(), &working);
        working[0][1] = 20.;
        let entry = session.finish(&working);
        working[1][0] = 30.;
        assert_eq!(entry.before, vec![vec![1., 2.], vec![3., 4.]]);
        assert_eq!(entry.steps[0].after, vec![vec![10., 2.], vec![3., 4.]]);
        assert_eq!(entry.steps[1].after, vec![vec![10., 2.], vec![3., 40.]]);
        assert_eq!(entry.after, vec![vec![10., 20.], vec![3., 40.]]);
        assert_eq!(entry.steps[0].description, "first");
        assert!(DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
        assert!(entry.timestamp.ends_with('Z'));
    }

    #[test]
    fn ledger_session_is_reusable() {
        // cargo test ledger_session_is_reusable -- --nocapture
        let mut session = LedgerSession::new();
        session.start(&vec![vec![1.]]);
        session.push_step("left over".to_string(), &vec![vec![2.]]);
        // starting again drops unfinished steps
        session.start(&vec![vec![5.]]);
        let entry = session.finish(&vec![vec![5.]]);
        assert!(entry.steps.is_empty());
        assert_eq!(entry.before, vec![vec![5.]]);
        // finishing without a start records an empty `before`
        let entry = session.finish(&vec![vec![7.]]);
        assert!(entry.before.is_empty());
        assert_eq!(entry.after, vec![vec![7.]]);
    }

    #[test]
    fn ledger_entry_json_layout() {
        // cargo test ledger_entry_json_layout -- --nocapture
        let entry = HistoryEntry {
            timestamp: "2024-01-02T03:04:05.678Z".to_string(),
            before: vec![vec![0., 2.], vec![2., 4.]],
            after: vec![vec![2., 4.], vec![0., 2.]],
            steps: vec![StepRecord {
                description: "Sort".to_string(),
                after: vec![vec![2., 4.], vec![0., 2.]],
            }],
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": "2024-01-02T03:04:05.678Z",
                "before": [[0.0, 2.0], [2.0, 4.0]],
                "after": [[2.0, 4.0], [0.0, 2.0]],
                "steps": [{ "description": "Sort", "after": [[2.0, 4.0], [0.0, 2.0]] }],
            })
        );
        // non-finite cells are stored as null and come back as NaN
        let overflowed = HistoryEntry {
            after: vec![vec![1e308, f64::INFINITY]],
            ..entry.clone()
        };
        let value = serde_json::to_value(&overflowed).unwrap();
        assert_eq!(value["after"], json!([[1e308, null]]));
        let loaded: HistoryEntry = serde_json::from_value(value).unwrap();
        assert!(loaded.after[0][1].is_nan());
        // integers written by other tools load as cells, missing steps are allowed
        let loaded: HistoryEntry =
            serde_json::from_str(r#"{"timestamp":"t","before":[[1,2]],"after":[[1,2]]}"#).unwrap();
        assert_eq!(loaded.before, vec![vec![1., 2.]]);
        assert!(loaded.steps.is_empty());
        assert_eq!(loaded.diff().count, 0);
    }
}

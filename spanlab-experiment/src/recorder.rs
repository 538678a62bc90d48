//! Append-only trial log and the hand-off point to persistence.

use serde::{Deserialize, Serialize};
use spanlab_core::{TerminationReason, TrialRecord};
use std::convert::Infallible;

/// Insertion-ordered record of completed trials.
///
/// `append` is the only mutator. Readers get shared slices or owned
/// snapshots, never a handle that could rewrite history.
#[derive(Debug, Clone, Default)]
pub struct TrialLog {
    records: Vec<TrialRecord>,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and returns its position in the log.
    pub fn append(&mut self, record: TrialRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrialRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn snapshot(&self) -> Vec<TrialRecord> {
        self.records.clone()
    }

    pub fn last(&self) -> Option<&TrialRecord> {
        self.records.last()
    }

    /// First record logged for `level` at `attempt`.
    pub fn find_attempt(&self, level: u32, attempt: u8) -> Option<&TrialRecord> {
        self.records
            .iter()
            .find(|r| r.level == level && r.attempt == attempt)
    }

    pub fn attempts_at(&self, level: u32) -> Vec<&TrialRecord> {
        self.records.iter().filter(|r| r.level == level).collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_records(&self.records)
    }
}

/// Derived figures appended to exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub trials: usize,
    pub correct_trials: usize,
    pub accuracy: f64,
    pub max_level_reached: u32,
    pub total_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
}

impl SessionSummary {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        let trials = records.len();
        let correct_trials = records.iter().filter(|r| r.correct).count();
        let accuracy = if trials == 0 {
            0.0
        } else {
            correct_trials as f64 / trials as f64
        };
        Self {
            trials,
            correct_trials,
            accuracy,
            max_level_reached: records
                .iter()
                .filter(|r| r.correct)
                .map(|r| r.level)
                .max()
                .unwrap_or(0),
            total_score: records.iter().map(|r| i64::from(r.score_delta)).sum(),
            termination: None,
        }
    }

    pub fn with_termination(mut self, termination: Option<TerminationReason>) -> Self {
        self.termination = termination;
        self
    }
}

/// Receives the full, ordered record list of a finished run.
pub trait RecordSink {
    type Error;

    fn persist(&mut self, task_id: &str, records: &[TrialRecord]) -> Result<(), Self::Error>;
}

/// Keeps handed-off runs in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub runs: Vec<(String, Vec<TrialRecord>)>,
}

impl RecordSink for MemorySink {
    type Error = Infallible;

    fn persist(&mut self, task_id: &str, records: &[TrialRecord]) -> Result<(), Infallible> {
        self.runs.push((task_id.to_string(), records.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(index: usize, level: u32, attempt: u8, correct: bool) -> TrialRecord {
        TrialRecord {
            trial_index: index,
            level,
            attempt,
            presented_sequence: "1 2 3".into(),
            expected_response: "1 2 3".into(),
            submitted_response: if correct { "1 2 3" } else { "1 3 2" }.into(),
            correct,
            score_delta: i32::from(correct),
            timestamp_utc: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn append_preserves_order() {
        let mut log = TrialLog::new();
        assert_eq!(log.append(record(0, 3, 1, true)), 0);
        assert_eq!(log.append(record(1, 4, 1, false)), 1);
        assert_eq!(log.append(record(2, 4, 2, true)), 2);
        let levels: Vec<_> = log.iter().map(|r| (r.level, r.attempt)).collect();
        assert_eq!(levels, vec![(3, 1), (4, 1), (4, 2)]);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut log = TrialLog::new();
        log.append(record(0, 3, 1, true));
        let mut snap = log.snapshot();
        snap[0].correct = false;
        snap.clear();
        assert_eq!(log.len(), 1);
        assert!(log.as_slice()[0].correct);
    }

    #[test]
    fn find_attempt_by_level() {
        let mut log = TrialLog::new();
        log.append(record(0, 3, 1, true));
        log.append(record(1, 4, 1, false));
        log.append(record(2, 4, 2, true));
        assert_eq!(log.find_attempt(4, 2).map(|r| r.trial_index), Some(2));
        assert!(log.find_attempt(5, 1).is_none());
        assert_eq!(log.attempts_at(4).len(), 2);
    }

    #[test]
    fn summary_figures() {
        let mut log = TrialLog::new();
        log.append(record(0, 3, 1, true));
        log.append(record(1, 4, 1, false));
        log.append(record(2, 4, 2, true));
        log.append(record(3, 5, 1, false));
        let summary = log.summary();
        assert_eq!(summary.trials, 4);
        assert_eq!(summary.correct_trials, 2);
        assert_eq!(summary.accuracy, 0.5);
        assert_eq!(summary.max_level_reached, 4);
        assert_eq!(summary.total_score, 2);
    }

    #[test]
    fn empty_summary() {
        let summary = TrialLog::new().summary();
        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.max_level_reached, 0);
    }

    #[test]
    fn memory_sink_keeps_runs() {
        let mut log = TrialLog::new();
        log.append(record(0, 3, 1, true));
        let mut sink = MemorySink::default();
        sink.persist("digit-span-forward", log.as_slice()).unwrap();
        assert_eq!(sink.runs.len(), 1);
        assert_eq!(sink.runs[0].0, "digit-span-forward");
        assert_eq!(sink.runs[0].1, log.snapshot());
    }
}

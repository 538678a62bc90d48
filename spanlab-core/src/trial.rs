use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What the participant submitted for one trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Response {
    /// Typed recall of a sequence.
    Text(String),
    /// Per-category counts.
    Counts(BTreeMap<String, u32>),
    /// Positions believed to have changed.
    Selection(BTreeSet<usize>),
    /// Card indices, in the order they were picked.
    Cards(Vec<usize>),
}

impl Response {
    pub fn render(&self) -> String {
        match self {
            Response::Text(text) => text.clone(),
            Response::Counts(counts) => render_counts(counts),
            Response::Selection(positions) => join_indices(positions.iter()),
            Response::Cards(indices) => join_indices(indices.iter()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Response::Text(text) => text.trim().is_empty(),
            Response::Counts(counts) => counts.is_empty(),
            Response::Selection(positions) => positions.is_empty(),
            Response::Cards(indices) => indices.is_empty(),
        }
    }
}

/// The answer a trial is scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExpectedAnswer {
    /// Token labels in presentation order.
    Sequence(Vec<String>),
    Counts(BTreeMap<String, u32>),
    Positions(BTreeSet<usize>),
    CardPair([usize; 2]),
}

impl ExpectedAnswer {
    pub fn render(&self) -> String {
        match self {
            ExpectedAnswer::Sequence(labels) => labels.join(" "),
            ExpectedAnswer::Counts(counts) => render_counts(counts),
            ExpectedAnswer::Positions(positions) => join_indices(positions.iter()),
            ExpectedAnswer::CardPair(pair) => join_indices(pair.iter()),
        }
    }
}

fn render_counts(counts: &BTreeMap<String, u32>) -> String {
    counts
        .iter()
        .map(|(category, n)| format!("{category}={n}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_indices<'a>(indices: impl Iterator<Item = &'a usize>) -> String {
    indices
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Selection breakdown for change-detection trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTally {
    pub correct_selections: u32,
    pub incorrect_selections: u32,
    /// Every changed position found with no false positives.
    pub fully_correct: bool,
}

/// Outcome of comparing one response to its expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub correct: bool,
    pub score_delta: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tally: Option<ChangeTally>,
}

impl EvaluationResult {
    pub fn pass_fail(correct: bool) -> Self {
        Self {
            correct,
            score_delta: i32::from(correct),
            tally: None,
        }
    }

    pub fn incorrect() -> Self {
        Self::pass_fail(false)
    }
}

/// Why a staircase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    CeilingReached,
    ConsecutiveFailures,
    RoundBudgetExhausted,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CeilingReached => "ceiling_reached",
            Self::ConsecutiveFailures => "consecutive_failures",
            Self::RoundBudgetExhausted => "round_budget_exhausted",
        }
    }
}

/// One completed trial. Never modified after it is logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub level: u32,
    pub attempt: u8,
    pub presented_sequence: String,
    pub expected_response: String,
    pub submitted_response: String,
    pub correct: bool,
    pub score_delta: i32,
    pub timestamp_utc: DateTime<Utc>,
}

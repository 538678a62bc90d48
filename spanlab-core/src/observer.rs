use crate::phase::PresentationPhase;
use crate::stimulus::{Arrangement, Card, Stimulus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the presentation layer should currently display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StimulusView {
    Token(Stimulus),
    Arrangement(Arrangement),
    Cards(Vec<Card>),
}

/// A phase change delivered to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub phase: PresentationPhase,
    pub stimulus: Option<StimulusView>,
    /// Position of the shown item within its sequence.
    pub item_index: Option<usize>,
    /// Time left in a study countdown.
    pub remaining_ms: Option<u64>,
    pub early_exit_available: bool,
}

impl Transition {
    pub fn new(phase: PresentationPhase) -> Self {
        Self {
            phase,
            stimulus: None,
            item_index: None,
            remaining_ms: None,
            early_exit_available: false,
        }
    }

    pub fn with_stimulus(mut self, stimulus: StimulusView) -> Self {
        self.stimulus = Some(stimulus);
        self
    }

    pub fn with_item(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }

    pub fn with_countdown(mut self, remaining_ms: u64, early_exit_available: bool) -> Self {
        self.remaining_ms = Some(remaining_ms);
        self.early_exit_available = early_exit_available;
        self
    }
}

/// Non-fatal conditions surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineWarning {
    /// Fewer distinguishable swap pairs were found than the level asks for.
    SwapPairsReduced { requested: usize, swapped: usize },
    /// An empty response was scored as incorrect.
    EmptyResponse { trial_index: usize },
}

impl fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineWarning::SwapPairsReduced { requested, swapped } => {
                write!(f, "swapped {swapped} of {requested} requested pairs")
            }
            EngineWarning::EmptyResponse { trial_index } => {
                write!(f, "empty response for trial {trial_index} scored as incorrect")
            }
        }
    }
}

/// Receives phase transitions from the engine.
pub trait PresentationObserver {
    fn on_transition(&mut self, transition: &Transition);

    fn on_warning(&mut self, _warning: &EngineWarning) {}
}

/// Observer that keeps everything it is told. Used by tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub transitions: Vec<Transition>,
    pub warnings: Vec<EngineWarning>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phases(&self) -> Vec<PresentationPhase> {
        self.transitions.iter().map(|t| t.phase).collect()
    }

    pub fn last(&self) -> Option<&Transition> {
        self.transitions.last()
    }

    /// Items shown so far, in order.
    pub fn shown_tokens(&self) -> Vec<Stimulus> {
        self.transitions
            .iter()
            .filter_map(|t| match (&t.phase, &t.stimulus) {
                (PresentationPhase::Presenting, Some(StimulusView::Token(s))) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
        self.warnings.clear();
    }
}

impl PresentationObserver for RecordingObserver {
    fn on_transition(&mut self, transition: &Transition) {
        self.transitions.push(transition.clone());
    }

    fn on_warning(&mut self, warning: &EngineWarning) {
        self.warnings.push(warning.clone());
    }
}

use spanlab_core::{ExpectedAnswer, PresentationPhase, TrialStimulus};

/// Where the running trial is. Every transition goes through
/// [`ActiveTrial::enter`], so there is exactly one source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Presenting { item: usize },
    Blank { item: usize },
    Studying { early_exit_available: bool },
    AwaitingResponse,
}

impl TrialPhase {
    /// The phase as reported to the presentation layer.
    pub fn presentation(&self) -> PresentationPhase {
        match self {
            TrialPhase::Presenting { .. } | TrialPhase::Studying { .. } => {
                PresentationPhase::Presenting
            }
            TrialPhase::Blank { .. } => PresentationPhase::Blank,
            TrialPhase::AwaitingResponse => PresentationPhase::AwaitingResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialTimestamps {
    pub started_ms: u64,
    /// When the response window opened.
    pub response_window_ms: Option<u64>,
    pub responded_ms: Option<u64>,
}

impl TrialTimestamps {
    pub fn response_latency_ms(&self) -> Option<u64> {
        Some(self.responded_ms?.saturating_sub(self.response_window_ms?))
    }
}

/// The trial currently owned by the engine.
#[derive(Debug, Clone)]
pub struct ActiveTrial {
    pub index: usize,
    pub level: u32,
    pub attempt: u8,
    pub stimulus: TrialStimulus,
    pub expected: ExpectedAnswer,
    pub phase: TrialPhase,
    pub timestamps: TrialTimestamps,
}

impl ActiveTrial {
    pub fn enter(&mut self, phase: TrialPhase, now_ms: u64) {
        if phase == TrialPhase::AwaitingResponse && self.timestamps.response_window_ms.is_none() {
            self.timestamps.response_window_ms = Some(now_ms);
        }
        self.phase = phase;
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.phase == TrialPhase::AwaitingResponse
    }

    pub fn is_studying(&self) -> bool {
        matches!(self.phase, TrialPhase::Studying { .. })
    }
}

//! Error types for task configuration and engine control.

use spanlab_core::{ComparisonMode, PresentationPhase};
use thiserror::Error;

/// Problems with a task configuration. Raised at construction, never mid-run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("min_level must be at least 1")]
    ZeroMinLevel,

    #[error("invalid level bounds: min_level {min} > max_level {max}")]
    InvalidLevelBounds { min: u32, max: u32 },

    #[error("no sequence size configured for level {0}")]
    MissingLevelSize(u32),

    #[error("sequence size for level {0} must be positive")]
    ZeroLevelSize(u32),

    #[error("{0} list must not be empty")]
    EmptyStimulusSet(&'static str),

    #[error("{mode} tasks need a positive display_ms")]
    ZeroDisplayDuration { mode: ComparisonMode },

    #[error("{mode} tasks need a positive study_ms")]
    MissingStudyTiming { mode: ComparisonMode },

    #[error("min_ready_ms ({min_ready_ms}) exceeds study_ms ({study_ms})")]
    ReadyAfterStudy { min_ready_ms: u64, study_ms: u64 },

    #[error("countdown_step_ms must be positive")]
    ZeroCountdownStep,

    #[error("change detection needs at least 2 slots, got {0}")]
    TooFewSlots(usize),

    #[error("no card problem defined at or below level {0}")]
    MissingCardProblem(u32),

    #[error("card problem at level {level} has an invalid correct pair {pair:?}")]
    InvalidCardPair { level: u32, pair: [usize; 2] },

    #[error("max_rounds must be at least 1")]
    ZeroRoundBudget,

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Misuse of the engine by its caller. None of these change engine state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("a trial is already in progress")]
    TrialInProgress,

    #[error("the run has already terminated")]
    RunTerminated,

    #[error("not awaiting a response (phase: {})", .phase.as_str())]
    NotAwaitingResponse { phase: PresentationPhase },

    #[error("early exit not available for another {remaining_ms}ms")]
    EarlyExitUnavailable { remaining_ms: u64 },

    #[error("no study phase in progress")]
    NoStudyInProgress,
}

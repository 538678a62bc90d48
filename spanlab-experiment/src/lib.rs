pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod presentation;
pub mod recorder;
pub mod staircase;
pub mod trial;

pub use config::{
    Alphabet, LevelCardProblem, LevelSize, LevelSizes, StimulusSettings, TaskConfig, TimingPlan,
};
pub use engine::{TrialEngine, TrialOutcome};
pub use error::{ConfigError, EngineError};
pub use evaluator::{evaluate, evaluate_selection, normalize_recall, required_answer};
pub use generator::{GeneratedTrial, Generator, SwapShortfall, find_swap_pairs};
pub use presentation::{Cue, PresentationScheduler};
pub use recorder::{MemorySink, RecordSink, SessionSummary, TrialLog};
pub use staircase::{Staircase, StaircaseDecision, StaircaseState};
pub use trial::{ActiveTrial, TrialPhase, TrialTimestamps};

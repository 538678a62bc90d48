pub mod mode;
pub mod observer;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use mode::ComparisonMode;
pub use observer::{EngineWarning, PresentationObserver, RecordingObserver, StimulusView, Transition};
pub use phase::PresentationPhase;
pub use stimulus::{
    Arrangement, Card, CardProblem, ChangeDetectionStimulus, SlotItem, Stimulus,
    StimulusSequence, TrialStimulus,
};
pub use trial::{
    ChangeTally, EvaluationResult, ExpectedAnswer, Response, TerminationReason, TrialRecord,
};

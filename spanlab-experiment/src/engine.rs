//! The trial engine: one instance runs one task from first trial to
//! termination.
//!
//! Flow per trial: generate → present (timed cues) → await response →
//! evaluate → staircase step → append to log. The engine is driven by the
//! caller, either by polling [`TrialEngine::update`] or by blocking in
//! [`TrialEngine::run_until_input`]; it never spawns anything.

use rand::Rng;
use spanlab_core::{
    EngineWarning, EvaluationResult, PresentationObserver, PresentationPhase, Response,
    StimulusView, TrialRecord, TrialStimulus, Transition,
};
use spanlab_timing::Timer;
use tracing::{debug, info, warn};

use crate::config::TaskConfig;
use crate::error::{ConfigError, EngineError};
use crate::evaluator::{evaluate, required_answer};
use crate::generator::Generator;
use crate::presentation::{Cue, PresentationScheduler};
use crate::recorder::{RecordSink, SessionSummary, TrialLog};
use crate::staircase::{Staircase, StaircaseDecision, StaircaseState};
use crate::trial::{ActiveTrial, TrialPhase, TrialTimestamps};

/// Everything produced by scoring one response.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub record: TrialRecord,
    pub evaluation: EvaluationResult,
    pub decision: StaircaseDecision,
}

pub struct TrialEngine<T: Timer, R: Rng, O: PresentationObserver> {
    config: TaskConfig,
    generator: Generator,
    staircase: Staircase,
    presentation: PresentationScheduler,
    log: TrialLog,
    current: Option<ActiveTrial>,
    phase: PresentationPhase,
    trials_started: usize,
    auto_advance: bool,
    timer: T,
    rng: R,
    observer: O,
}

impl<T: Timer, R: Rng, O: PresentationObserver> TrialEngine<T, R, O> {
    pub fn new(config: TaskConfig, timer: T, rng: R, observer: O) -> Result<Self, ConfigError> {
        let generator = Generator::new(&config)?;
        let staircase = Staircase::from_config(&config)?;
        let presentation = PresentationScheduler::new(config.timing.clone());
        info!(
            task = %config.task_id,
            mode = %config.mode,
            min_level = config.min_level,
            max_level = config.max_level,
            "engine ready"
        );
        Ok(Self {
            config,
            generator,
            staircase,
            presentation,
            log: TrialLog::new(),
            current: None,
            phase: PresentationPhase::Idle,
            trials_started: 0,
            auto_advance: false,
            timer,
            rng,
            observer,
        })
    }

    /// When set, each scored trial schedules the next one after
    /// `inter_trial_ms`.
    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    /// Generates the next stimulus at the staircase's current level and
    /// starts presenting it.
    pub fn start_trial(&mut self) -> Result<(), EngineError> {
        if self.staircase.is_terminal() {
            return Err(EngineError::RunTerminated);
        }
        if self.current.is_some() {
            return Err(EngineError::TrialInProgress);
        }

        let now = self.timer.now_ms();
        let level = self.staircase.level();
        let attempt = self.staircase.attempt();
        let generated = self.generator.generate(level, &mut self.rng);
        if let Some(shortfall) = generated.shortfall {
            self.warn(EngineWarning::SwapPairsReduced {
                requested: shortfall.requested,
                swapped: shortfall.swapped,
            });
        }

        let index = self.trials_started;
        self.trials_started += 1;
        info!(task = %self.config.task_id, trial = index, level, attempt, "trial started");

        let mut trial = ActiveTrial {
            index,
            level,
            attempt,
            stimulus: generated.stimulus,
            expected: generated.expected,
            phase: TrialPhase::Presenting { item: 0 },
            timestamps: TrialTimestamps {
                started_ms: now,
                ..TrialTimestamps::default()
            },
        };

        // sequences make their first visible transition from the Show(0) cue
        let opening = match &trial.stimulus {
            TrialStimulus::Sequence(seq) => {
                self.presentation.start_sequence(now, seq.len());
                None
            }
            TrialStimulus::ChangeDetection(cd) => {
                self.presentation.start_study(now);
                let study_ms = self.config.timing.study_ms.unwrap_or(0);
                let phase = TrialPhase::Studying {
                    early_exit_available: false,
                };
                let transition = Transition::new(PresentationPhase::Presenting)
                    .with_stimulus(StimulusView::Arrangement(cd.base.clone()))
                    .with_countdown(study_ms, false);
                Some((phase, transition))
            }
            TrialStimulus::Cards(problem) => {
                self.presentation.cancel_all();
                let transition = Transition::new(PresentationPhase::AwaitingResponse)
                    .with_stimulus(StimulusView::Cards(problem.cards.clone()));
                Some((TrialPhase::AwaitingResponse, transition))
            }
        };

        match opening {
            Some((phase, transition)) => {
                trial.enter(phase, now);
                self.current = Some(trial);
                self.emit(transition);
            }
            None => self.current = Some(trial),
        }
        Ok(())
    }

    /// Fires every cue due by now and returns them in firing order.
    pub fn update(&mut self) -> Vec<Cue> {
        let now = self.timer.now_ms();
        let mut fired = Vec::new();
        while let Some(cue) = self.presentation.pop_due(now) {
            debug!(cue = ?cue.event, due_ms = cue.due_ms, generation = cue.generation, "cue");
            self.apply(cue.event, now);
            fired.push(cue.event);
        }
        fired
    }

    /// Runs due cues, sleeping on the timer in between, until a response is
    /// expected, the run is over, or nothing is scheduled.
    pub fn run_until_input(&mut self) -> PresentationPhase {
        loop {
            self.update();
            if self.phase.allows_input() || self.phase.is_terminal() {
                return self.phase;
            }
            match self.presentation.next_due() {
                Some(due) => self.timer.sleep_until(due),
                None => return self.phase,
            }
        }
    }

    /// Ends a study window before it expires.
    ///
    /// Due cues are applied first, so a request arriving after expiry finds
    /// the study already over.
    pub fn request_early_exit(&mut self) -> Result<(), EngineError> {
        self.update();
        if !self.current.as_ref().is_some_and(ActiveTrial::is_studying) {
            return Err(EngineError::NoStudyInProgress);
        }
        let now = self.timer.now_ms();
        self.presentation.request_early_exit(now)?;
        self.finish_study(now);
        Ok(())
    }

    /// Scores the participant's response. Valid once per trial, while
    /// awaiting a response.
    pub fn submit_response(&mut self, response: Response) -> Result<TrialOutcome, EngineError> {
        let mut trial = match self.current.take() {
            Some(trial) if trial.is_awaiting_response() => trial,
            other => {
                self.current = other;
                return Err(EngineError::NotAwaitingResponse { phase: self.phase });
            }
        };

        let now = self.timer.now_ms();
        trial.timestamps.responded_ms = Some(now);
        if response.is_empty() {
            self.warn(EngineWarning::EmptyResponse {
                trial_index: trial.index,
            });
        }

        let mode = self.config.mode;
        let evaluation = evaluate(mode, &trial.expected, &response);
        let record = TrialRecord {
            trial_index: trial.index,
            level: trial.level,
            attempt: trial.attempt,
            presented_sequence: trial.stimulus.describe(),
            expected_response: required_answer(mode, &trial.expected),
            submitted_response: response.render(),
            correct: evaluation.correct,
            score_delta: evaluation.score_delta,
            timestamp_utc: self.timer.utc_now(),
        };
        self.log.append(record.clone());
        info!(
            trial = trial.index,
            level = trial.level,
            attempt = trial.attempt,
            correct = evaluation.correct,
            score_delta = evaluation.score_delta,
            latency_ms = ?trial.timestamps.response_latency_ms(),
            "trial scored"
        );

        let decision = self.staircase.step(&evaluation);
        match decision {
            StaircaseDecision::Terminal(_) => {
                self.presentation.cancel_all();
                self.emit(Transition::new(PresentationPhase::Complete));
            }
            StaircaseDecision::Advance { .. } | StaircaseDecision::Retry { .. } => {
                self.emit(Transition::new(PresentationPhase::Idle));
                if self.auto_advance {
                    self.presentation.schedule_next_trial(now);
                }
            }
        }

        Ok(TrialOutcome {
            record,
            evaluation,
            decision,
        })
    }

    /// Drops the running trial and every pending cue.
    pub fn teardown(&mut self) {
        self.presentation.cancel_all();
        if let Some(trial) = self.current.take() {
            debug!(trial = trial.index, "trial abandoned");
        }
        if !self.phase.is_terminal() && self.phase != PresentationPhase::Idle {
            self.emit(Transition::new(PresentationPhase::Idle));
        }
    }

    /// Passes the full ordered log to `sink`. The log itself is kept.
    pub fn hand_off<S: RecordSink>(&self, sink: &mut S) -> Result<(), S::Error> {
        debug!(task = %self.config.task_id, records = self.log.len(), "handing off trial log");
        sink.persist(&self.config.task_id, self.log.as_slice())
    }

    pub fn phase(&self) -> PresentationPhase {
        self.phase
    }

    pub fn staircase_state(&self) -> StaircaseState {
        self.staircase.state()
    }

    pub fn is_terminal(&self) -> bool {
        self.staircase.is_terminal()
    }

    pub fn log(&self) -> &TrialLog {
        &self.log
    }

    pub fn summary(&self) -> SessionSummary {
        self.log
            .summary()
            .with_termination(self.staircase.termination())
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn current_trial(&self) -> Option<&ActiveTrial> {
        self.current.as_ref()
    }

    pub fn current_stimulus(&self) -> Option<&TrialStimulus> {
        self.current.as_ref().map(|t| &t.stimulus)
    }

    pub fn study_remaining_ms(&self) -> Option<u64> {
        self.presentation.study_remaining_ms(self.timer.now_ms())
    }

    pub fn next_due(&self) -> Option<u64> {
        self.presentation.next_due()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    fn apply(&mut self, cue: Cue, now: u64) {
        if cue == Cue::NextTrial {
            if let Err(err) = self.start_trial() {
                debug!(%err, "next trial not started");
            }
            return;
        }
        if cue == Cue::StudyExpired {
            self.finish_study(now);
            return;
        }

        let Some(trial) = self.current.as_mut() else {
            return;
        };
        let transition = match cue {
            Cue::Show(item) => {
                trial.enter(TrialPhase::Presenting { item }, now);
                let token = match &trial.stimulus {
                    TrialStimulus::Sequence(seq) => seq.get(item).cloned(),
                    _ => None,
                };
                let mut t = Transition::new(PresentationPhase::Presenting).with_item(item);
                if let Some(token) = token {
                    t = t.with_stimulus(StimulusView::Token(token));
                }
                t
            }
            Cue::Clear(item) => {
                trial.enter(TrialPhase::Blank { item }, now);
                Transition::new(PresentationPhase::Blank).with_item(item)
            }
            Cue::SequenceFinished => {
                trial.enter(TrialPhase::AwaitingResponse, now);
                Transition::new(PresentationPhase::AwaitingResponse)
            }
            Cue::CountdownTick { remaining_ms } => {
                let TrialPhase::Studying {
                    early_exit_available,
                } = trial.phase
                else {
                    return;
                };
                Transition::new(PresentationPhase::Presenting)
                    .with_countdown(remaining_ms, early_exit_available)
            }
            Cue::EarlyExitAvailable => {
                if !trial.is_studying() {
                    return;
                }
                trial.enter(
                    TrialPhase::Studying {
                        early_exit_available: true,
                    },
                    now,
                );
                let remaining = self.presentation.study_remaining_ms(now).unwrap_or(0);
                Transition::new(PresentationPhase::Presenting).with_countdown(remaining, true)
            }
            Cue::StudyExpired | Cue::NextTrial => return,
        };
        self.emit(transition);
    }

    fn finish_study(&mut self, now: u64) {
        let Some(trial) = self.current.as_mut().filter(|t| t.is_studying()) else {
            return;
        };
        trial.enter(TrialPhase::AwaitingResponse, now);
        let changed = match &trial.stimulus {
            TrialStimulus::ChangeDetection(cd) => Some(cd.changed.clone()),
            _ => None,
        };
        let mut transition = Transition::new(PresentationPhase::AwaitingResponse);
        if let Some(changed) = changed {
            transition = transition.with_stimulus(StimulusView::Arrangement(changed));
        }
        self.emit(transition);
    }

    fn emit(&mut self, transition: Transition) {
        self.phase = transition.phase;
        self.observer.on_transition(&transition);
    }

    fn warn(&mut self, warning: EngineWarning) {
        warn!(%warning, "engine warning");
        self.observer.on_warning(&warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use spanlab_core::RecordingObserver;
    use spanlab_timing::ManualTimer;

    type Engine = TrialEngine<ManualTimer, StdRng, RecordingObserver>;

    fn engine(config: TaskConfig) -> (Engine, ManualTimer) {
        let timer = ManualTimer::new();
        let engine = TrialEngine::new(
            config,
            timer.clone(),
            StdRng::seed_from_u64(11),
            RecordingObserver::new(),
        )
        .unwrap();
        (engine, timer)
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = TaskConfig::digit_span_forward();
        config.min_level = 0;
        let result = TrialEngine::new(
            config,
            ManualTimer::new(),
            StdRng::seed_from_u64(1),
            RecordingObserver::new(),
        );
        assert!(matches!(result, Err(ConfigError::ZeroMinLevel)));
    }

    #[test]
    fn card_trial_awaits_response_immediately() {
        let (mut engine, _) = engine(TaskConfig::card_selection());
        engine.start_trial().unwrap();
        assert_eq!(engine.phase(), PresentationPhase::AwaitingResponse);
        let last = engine.observer().last().unwrap();
        assert!(matches!(&last.stimulus, Some(StimulusView::Cards(cards)) if cards.len() == 4));

        let outcome = engine.submit_response(Response::Cards(vec![3, 0])).unwrap();
        assert!(outcome.evaluation.correct);
        assert_eq!(outcome.decision, StaircaseDecision::Advance { level: 2 });
        assert_eq!(outcome.record.expected_response, "0 3");
    }

    #[test]
    fn second_submit_is_rejected_and_changes_nothing() {
        let (mut engine, _) = engine(TaskConfig::card_selection());
        engine.start_trial().unwrap();
        engine.submit_response(Response::Cards(vec![0, 3])).unwrap();
        let state = engine.staircase_state();
        assert_eq!(
            engine.submit_response(Response::Cards(vec![0, 3])),
            Err(EngineError::NotAwaitingResponse {
                phase: PresentationPhase::Idle
            })
        );
        assert_eq!(engine.staircase_state(), state);
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn teardown_discards_pending_cues() {
        let (mut engine, timer) = engine(TaskConfig::digit_span_forward());
        engine.start_trial().unwrap();
        engine.update();
        engine.teardown();
        assert_eq!(engine.next_due(), None);
        timer.advance(60_000);
        assert!(engine.update().is_empty());
        assert!(engine.current_trial().is_none());
        assert_eq!(engine.observer().last().unwrap().phase, PresentationPhase::Idle);
        assert_eq!(engine.phase(), PresentationPhase::Idle);
        // an idle engine tells the observer nothing new
        let seen = engine.observer().transitions.len();
        engine.teardown();
        assert_eq!(engine.observer().transitions.len(), seen);
        // a fresh trial can start after teardown
        engine.start_trial().unwrap();
    }

    #[test]
    fn empty_response_warns_and_fails() {
        let (mut engine, _) = engine(TaskConfig::digit_span_forward());
        engine.start_trial().unwrap();
        engine.run_until_input();
        let outcome = engine.submit_response(Response::Text("  ".into())).unwrap();
        assert!(!outcome.record.correct);
        assert_eq!(
            engine.observer().warnings,
            vec![EngineWarning::EmptyResponse { trial_index: 0 }]
        );
    }
}

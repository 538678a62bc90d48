//! Headless runs with a scripted participant on a virtual clock.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spanlab_core::{ComparisonMode, ExpectedAnswer, RecordingObserver, Response};
use spanlab_experiment::{TaskConfig, TrialEngine};
use spanlab_timing::ManualTimer;
use std::collections::BTreeSet;
use tracing::debug;

pub type SimulatedEngine = TrialEngine<ManualTimer, StdRng, RecordingObserver>;

/// Answers correctly with probability `accuracy`.
#[derive(Debug)]
pub struct ScriptedParticipant {
    accuracy: f64,
    rng: StdRng,
}

impl ScriptedParticipant {
    pub fn new(accuracy: f64, seed: u64) -> Self {
        Self {
            accuracy: accuracy.clamp(0.0, 1.0),
            // separate stream from the stimulus rng
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    pub fn respond(&mut self, config: &TaskConfig, expected: &ExpectedAnswer) -> Response {
        let correct = self.rng.random_bool(self.accuracy);
        scripted_response(config.mode, expected, correct, config.stimuli.slots)
    }
}

/// A response that is right, or deliberately wrong, for `expected`.
pub fn scripted_response(
    mode: ComparisonMode,
    expected: &ExpectedAnswer,
    correct: bool,
    slots: usize,
) -> Response {
    match expected {
        ExpectedAnswer::Sequence(labels) => {
            let mut labels = labels.clone();
            if mode == ComparisonMode::Backward {
                labels.reverse();
            }
            if !correct {
                labels.pop();
            }
            Response::Text(labels.join(" "))
        }
        ExpectedAnswer::Counts(counts) => {
            let mut counts = counts.clone();
            if !correct {
                if let Some(n) = counts.values_mut().next() {
                    *n += 1;
                }
            }
            Response::Counts(counts)
        }
        ExpectedAnswer::Positions(changed) => {
            if correct {
                return Response::Selection(changed.clone());
            }
            let wrong: BTreeSet<usize> = (0..slots).filter(|p| !changed.contains(p)).collect();
            Response::Selection(wrong)
        }
        ExpectedAnswer::CardPair(pair) => {
            if correct {
                Response::Cards(pair.to_vec())
            } else {
                Response::Cards(vec![pair[0]])
            }
        }
    }
}

pub fn run_simulation(config: TaskConfig, seed: u64, accuracy: f64) -> Result<SimulatedEngine> {
    let mut engine = TrialEngine::new(
        config,
        ManualTimer::new(),
        StdRng::seed_from_u64(seed),
        RecordingObserver::new(),
    )?
    .with_auto_advance(true);
    let mut participant = ScriptedParticipant::new(accuracy, seed);

    engine.start_trial()?;
    while !engine.is_terminal() {
        engine.run_until_input();
        let Some(trial) = engine.current_trial() else {
            break;
        };
        let response = participant.respond(engine.config(), &trial.expected);
        let outcome = engine.submit_response(response)?;
        debug!(
            trial = outcome.record.trial_index,
            correct = outcome.record.correct,
            "simulated response"
        );
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanlab_core::TerminationReason;
    use spanlab_experiment::evaluate;

    #[test]
    fn scripted_answers_score_as_intended() {
        let cases = [
            (
                ComparisonMode::Backward,
                ExpectedAnswer::Sequence(vec!["3".into(), "8".into(), "5".into()]),
            ),
            (
                ComparisonMode::Count,
                ExpectedAnswer::Counts([("bills".to_string(), 2), ("faces".to_string(), 0)].into()),
            ),
            (
                ComparisonMode::ChangeDetection,
                ExpectedAnswer::Positions(BTreeSet::from([0, 2])),
            ),
            (ComparisonMode::CardSelection, ExpectedAnswer::CardPair([1, 2])),
        ];
        for (mode, expected) in cases {
            for correct in [true, false] {
                let response = scripted_response(mode, &expected, correct, 5);
                assert_eq!(evaluate(mode, &expected, &response).correct, correct, "{mode}");
            }
        }
    }

    #[test]
    fn perfect_participant_reaches_ceiling() {
        let engine = run_simulation(TaskConfig::digit_span_backward(), 3, 1.0).unwrap();
        assert_eq!(
            engine.summary().termination,
            Some(TerminationReason::CeilingReached)
        );
        assert_eq!(engine.staircase_state().max_level_reached, 8);
        assert_eq!(engine.log().len(), 7);
    }

    #[test]
    fn hopeless_participant_stops_after_two_trials() {
        let engine = run_simulation(TaskConfig::change_detection(), 9, 0.0).unwrap();
        assert_eq!(engine.log().len(), 2);
        assert_eq!(
            engine.summary().termination,
            Some(TerminationReason::ConsecutiveFailures)
        );
    }
}

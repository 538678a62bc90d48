//! Adaptive difficulty: rise on success, one retry on failure, stop on a
//! second consecutive failure, the level ceiling, or an optional round budget.
//!
//! Only the sequence of evaluation results drives the state. There is no
//! notion of time here.

use serde::{Deserialize, Serialize};
use spanlab_core::{EvaluationResult, TerminationReason};
use tracing::{debug, info};

use crate::config::TaskConfig;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaircaseState {
    pub level: u32,
    pub attempt: u8,
    /// Highest level passed so far; 0 until the first pass.
    pub max_level_reached: u32,
    pub rounds_completed: u32,
    pub terminal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaircaseDecision {
    Advance { level: u32 },
    Retry { level: u32 },
    Terminal(TerminationReason),
}

#[derive(Debug, Clone)]
pub struct Staircase {
    min_level: u32,
    max_level: u32,
    max_rounds: Option<u32>,
    state: StaircaseState,
    termination: Option<TerminationReason>,
}

impl Staircase {
    pub fn new(min_level: u32, max_level: u32, max_rounds: Option<u32>) -> Result<Self, ConfigError> {
        if min_level == 0 {
            return Err(ConfigError::ZeroMinLevel);
        }
        if min_level > max_level {
            return Err(ConfigError::InvalidLevelBounds {
                min: min_level,
                max: max_level,
            });
        }
        if max_rounds == Some(0) {
            return Err(ConfigError::ZeroRoundBudget);
        }
        Ok(Self {
            min_level,
            max_level,
            max_rounds,
            state: StaircaseState {
                level: min_level,
                attempt: 1,
                max_level_reached: 0,
                rounds_completed: 0,
                terminal: false,
            },
            termination: None,
        })
    }

    pub fn from_config(config: &TaskConfig) -> Result<Self, ConfigError> {
        Self::new(config.min_level, config.max_level, config.max_rounds)
    }

    pub fn state(&self) -> StaircaseState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.state.level
    }

    pub fn attempt(&self) -> u8 {
        self.state.attempt
    }

    pub fn is_terminal(&self) -> bool {
        self.state.terminal
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn bounds(&self) -> (u32, u32) {
        (self.min_level, self.max_level)
    }

    /// Applies one trial's result and returns what happens next.
    ///
    /// Stepping a terminated staircase changes nothing and repeats the
    /// terminal decision.
    pub fn step(&mut self, result: &EvaluationResult) -> StaircaseDecision {
        if let Some(reason) = self.termination {
            return StaircaseDecision::Terminal(reason);
        }

        let level = self.state.level;
        let mut next = self.state;
        let mut decision = if result.correct {
            next.max_level_reached = next.max_level_reached.max(level);
            next.rounds_completed += 1;
            if level >= self.max_level {
                StaircaseDecision::Terminal(TerminationReason::CeilingReached)
            } else {
                next.level = level + 1;
                next.attempt = 1;
                StaircaseDecision::Advance { level: level + 1 }
            }
        } else if self.state.attempt == 1 {
            next.attempt = 2;
            StaircaseDecision::Retry { level }
        } else {
            next.rounds_completed += 1;
            StaircaseDecision::Terminal(TerminationReason::ConsecutiveFailures)
        };

        // checked independently of the ceiling, after every trial
        if let Some(budget) = self.max_rounds {
            let already_terminal = matches!(decision, StaircaseDecision::Terminal(_));
            if !already_terminal && next.rounds_completed >= budget {
                decision = StaircaseDecision::Terminal(TerminationReason::RoundBudgetExhausted);
            }
        }

        match decision {
            StaircaseDecision::Terminal(reason) => {
                // level stays where the final trial was played
                next.level = level;
                next.attempt = self.state.attempt;
                next.terminal = true;
                self.termination = Some(reason);
                info!(
                    level,
                    max_level_reached = next.max_level_reached,
                    rounds = next.rounds_completed,
                    reason = reason.as_str(),
                    "staircase terminated"
                );
            }
            StaircaseDecision::Advance { level } => debug!(level, "staircase advanced"),
            StaircaseDecision::Retry { level } => debug!(level, "staircase retry"),
        }

        self.state = next;
        decision
    }
}

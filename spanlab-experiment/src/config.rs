//! Task configuration: level bounds, sequence sizes, timing, stimulus sets.
//!
//! A [`TaskConfig`] is plain data (serde, loadable from TOML). It is checked
//! once with [`TaskConfig::validate`]; the engine refuses to start otherwise.

use serde::{Deserialize, Serialize};
use spanlab_core::{Card, CardProblem, ComparisonMode};
use std::path::Path;

use crate::error::ConfigError;

/// Per-task presentation timing. Configuration, not state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPlan {
    pub display_ms: u64,
    pub blank_ms: u64,
    /// Extra wait between the last item and "sequence finished".
    pub finish_buffer_ms: u64,
    pub study_ms: Option<u64>,
    /// Earliest point in a study window at which the participant may move on.
    pub min_ready_ms: Option<u64>,
    pub countdown_step_ms: u64,
    pub inter_trial_ms: u64,
}

impl Default for TimingPlan {
    fn default() -> Self {
        Self {
            display_ms: 1000,
            blank_ms: 250,
            finish_buffer_ms: 0,
            study_ms: None,
            min_ready_ms: None,
            countdown_step_ms: 1000,
            inter_trial_ms: 1000,
        }
    }
}

impl TimingPlan {
    /// Time from one item's onset to the next.
    pub fn item_period_ms(&self) -> u64 {
        self.display_ms + self.blank_ms
    }

    /// Total presentation time of an item-by-item sequence of `len` items.
    pub fn sequence_duration_ms(&self, len: usize) -> u64 {
        len as u64 * self.item_period_ms() + self.finish_buffer_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSize {
    pub level: u32,
    pub size: usize,
}

/// Maps a difficulty level to the number of items shown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSizes {
    /// Span tasks: length equals level.
    #[default]
    Identity,
    Table(Vec<LevelSize>),
}

impl LevelSizes {
    pub fn size_for(&self, level: u32) -> Option<usize> {
        match self {
            LevelSizes::Identity => Some(level as usize),
            LevelSizes::Table(entries) => entries.iter().find(|e| e.level == level).map(|e| e.size),
        }
    }
}

/// Token pool for span tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    #[default]
    Digits,
    Objects,
    Shapes(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCardProblem {
    pub level: u32,
    #[serde(flatten)]
    pub problem: CardProblem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSettings {
    pub alphabet: Alphabet,
    /// Counting categories.
    pub categories: Vec<String>,
    /// Change-detection item kinds and colors.
    pub kinds: Vec<String>,
    pub colors: Vec<String>,
    pub slots: usize,
    /// Draws allowed when searching for one distinguishable swap pair.
    pub max_swap_attempts: u32,
    pub card_problems: Vec<LevelCardProblem>,
}

impl Default for StimulusSettings {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::Digits,
            categories: Vec::new(),
            kinds: Vec::new(),
            colors: Vec::new(),
            slots: 5,
            max_swap_attempts: 64,
            card_problems: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub task_id: String,
    pub mode: ComparisonMode,
    pub min_level: u32,
    pub max_level: u32,
    #[serde(default)]
    pub level_sizes: LevelSizes,
    #[serde(default)]
    pub timing: TimingPlan,
    #[serde(default)]
    pub max_rounds: Option<u32>,
    #[serde(default)]
    pub stimuli: StimulusSettings,
}

impl TaskConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: TaskConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Clamps `level` into the configured bounds.
    pub fn clamp_level(&self, level: u32) -> u32 {
        level.clamp(self.min_level, self.max_level.max(self.min_level))
    }

    pub fn size_for(&self, level: u32) -> Option<usize> {
        self.level_sizes.size_for(level)
    }

    /// Card problem for `level`, falling back to the nearest defined level below.
    pub fn card_problem_for(&self, level: u32) -> Option<&CardProblem> {
        self.stimuli
            .card_problems
            .iter()
            .filter(|p| p.level <= level)
            .max_by_key(|p| p.level)
            .map(|p| &p.problem)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_level == 0 {
            return Err(ConfigError::ZeroMinLevel);
        }
        if self.min_level > self.max_level {
            return Err(ConfigError::InvalidLevelBounds {
                min: self.min_level,
                max: self.max_level,
            });
        }
        if self.max_rounds == Some(0) {
            return Err(ConfigError::ZeroRoundBudget);
        }

        match self.mode {
            ComparisonMode::Forward | ComparisonMode::Backward | ComparisonMode::Count => {
                self.validate_sequential()
            }
            ComparisonMode::ChangeDetection => self.validate_change_detection(),
            ComparisonMode::CardSelection => self.validate_cards(),
        }
    }

    fn validate_sequential(&self) -> Result<(), ConfigError> {
        if self.timing.display_ms == 0 {
            return Err(ConfigError::ZeroDisplayDuration { mode: self.mode });
        }
        for level in self.min_level..=self.max_level {
            match self.size_for(level) {
                None => return Err(ConfigError::MissingLevelSize(level)),
                Some(0) => return Err(ConfigError::ZeroLevelSize(level)),
                Some(_) => {}
            }
        }
        if self.mode == ComparisonMode::Count {
            if self.stimuli.categories.is_empty() {
                return Err(ConfigError::EmptyStimulusSet("categories"));
            }
        } else if let Alphabet::Shapes(shapes) = &self.stimuli.alphabet {
            if shapes.is_empty() {
                return Err(ConfigError::EmptyStimulusSet("shapes"));
            }
        }
        Ok(())
    }

    fn validate_change_detection(&self) -> Result<(), ConfigError> {
        let study_ms = match self.timing.study_ms {
            Some(ms) if ms > 0 => ms,
            _ => return Err(ConfigError::MissingStudyTiming { mode: self.mode }),
        };
        if let Some(min_ready_ms) = self.timing.min_ready_ms {
            if min_ready_ms > study_ms {
                return Err(ConfigError::ReadyAfterStudy {
                    min_ready_ms,
                    study_ms,
                });
            }
        }
        if self.timing.countdown_step_ms == 0 {
            return Err(ConfigError::ZeroCountdownStep);
        }
        if self.stimuli.slots < 2 {
            return Err(ConfigError::TooFewSlots(self.stimuli.slots));
        }
        if self.stimuli.kinds.is_empty() {
            return Err(ConfigError::EmptyStimulusSet("kinds"));
        }
        if self.stimuli.colors.is_empty() {
            return Err(ConfigError::EmptyStimulusSet("colors"));
        }
        Ok(())
    }

    fn validate_cards(&self) -> Result<(), ConfigError> {
        if self.card_problem_for(self.min_level).is_none() {
            return Err(ConfigError::MissingCardProblem(self.min_level));
        }
        for entry in &self.stimuli.card_problems {
            let [a, b] = entry.problem.correct_pair;
            let n = entry.problem.cards.len();
            if a == b || a >= n || b >= n {
                return Err(ConfigError::InvalidCardPair {
                    level: entry.level,
                    pair: entry.problem.correct_pair,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

impl TaskConfig {
    pub fn digit_span_forward() -> Self {
        Self {
            task_id: "digit-span-forward".into(),
            mode: ComparisonMode::Forward,
            min_level: 3,
            max_level: 9,
            level_sizes: LevelSizes::Identity,
            timing: TimingPlan::default(),
            max_rounds: None,
            stimuli: StimulusSettings::default(),
        }
    }

    pub fn digit_span_backward() -> Self {
        Self {
            task_id: "digit-span-backward".into(),
            mode: ComparisonMode::Backward,
            min_level: 2,
            max_level: 8,
            ..Self::digit_span_forward()
        }
    }

    /// Object span counts rounds as well as levels.
    pub fn object_span() -> Self {
        Self {
            task_id: "object-span".into(),
            mode: ComparisonMode::Forward,
            min_level: 2,
            max_level: 9,
            level_sizes: LevelSizes::Identity,
            timing: TimingPlan {
                display_ms: 1500,
                blank_ms: 500,
                ..TimingPlan::default()
            },
            max_rounds: Some(6),
            stimuli: StimulusSettings {
                alphabet: Alphabet::Objects,
                ..StimulusSettings::default()
            },
        }
    }

    pub fn visual_counting() -> Self {
        let table = [(1, 4), (2, 6), (3, 8), (4, 10), (5, 12)]
            .into_iter()
            .map(|(level, size)| LevelSize { level, size })
            .collect();
        Self {
            task_id: "visual-counting".into(),
            mode: ComparisonMode::Count,
            min_level: 1,
            max_level: 5,
            level_sizes: LevelSizes::Table(table),
            timing: TimingPlan {
                display_ms: 1000,
                blank_ms: 500,
                finish_buffer_ms: 500,
                ..TimingPlan::default()
            },
            max_rounds: None,
            stimuli: StimulusSettings {
                categories: vec!["bills".into(), "buses".into(), "faces".into()],
                ..StimulusSettings::default()
            },
        }
    }

    pub fn change_detection() -> Self {
        Self {
            task_id: "change-detection".into(),
            mode: ComparisonMode::ChangeDetection,
            min_level: 1,
            max_level: 4,
            level_sizes: LevelSizes::Identity,
            timing: TimingPlan {
                study_ms: Some(30_000),
                min_ready_ms: Some(10_000),
                countdown_step_ms: 1000,
                inter_trial_ms: 1500,
                ..TimingPlan::default()
            },
            max_rounds: None,
            stimuli: StimulusSettings {
                kinds: ["circle", "square", "triangle", "star"].map(String::from).to_vec(),
                colors: ["red", "blue", "green", "yellow"].map(String::from).to_vec(),
                slots: 5,
                ..StimulusSettings::default()
            },
        }
    }

    pub fn card_selection() -> Self {
        let problem = |level: u32, rule: &str, cards: [&str; 4], correct_pair: [usize; 2]| {
            LevelCardProblem {
                level,
                problem: CardProblem {
                    rule: rule.into(),
                    cards: cards.into_iter().map(Card::new).collect(),
                    correct_pair,
                },
            }
        };
        Self {
            task_id: "card-selection".into(),
            mode: ComparisonMode::CardSelection,
            min_level: 1,
            max_level: 3,
            level_sizes: LevelSizes::Identity,
            timing: TimingPlan::default(),
            max_rounds: None,
            stimuli: StimulusSettings {
                card_problems: vec![
                    problem(
                        1,
                        "If a card has a vowel on one side, it has an even number on the other",
                        ["E", "K", "4", "7"],
                        [0, 3],
                    ),
                    problem(
                        2,
                        "If a person is drinking beer, they must be over 18",
                        ["beer", "coke", "25", "16"],
                        [0, 3],
                    ),
                    problem(
                        3,
                        "If a letter is sealed, it carries a 50c stamp",
                        ["40c", "sealed", "50c", "unsealed"],
                        [0, 1],
                    ),
                ],
                ..StimulusSettings::default()
            },
        }
    }

    /// All built-in presets, keyed by task id.
    pub fn presets() -> Vec<TaskConfig> {
        vec![
            Self::digit_span_forward(),
            Self::digit_span_backward(),
            Self::object_span(),
            Self::visual_counting(),
            Self::change_detection(),
            Self::card_selection(),
        ]
    }

    pub fn preset(task_id: &str) -> Option<TaskConfig> {
        Self::presets().into_iter().find(|p| p.task_id == task_id)
    }
}

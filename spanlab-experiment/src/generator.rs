//! Stimulus generation for each task family.

use rand::Rng;
use spanlab_core::{
    Arrangement, ChangeDetectionStimulus, ComparisonMode, ExpectedAnswer, SlotItem, Stimulus,
    StimulusSequence, TrialStimulus,
};
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::{Alphabet, TaskConfig};
use crate::error::ConfigError;

/// Fewer swap pairs were produced than the level asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapShortfall {
    pub requested: usize,
    pub swapped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTrial {
    pub stimulus: TrialStimulus,
    pub expected: ExpectedAnswer,
    pub shortfall: Option<SwapShortfall>,
}

/// Produces fresh stimuli from a validated configuration.
#[derive(Debug, Clone)]
pub struct Generator {
    config: TaskConfig,
}

impl Generator {
    pub fn new(config: &TaskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    /// Generates the stimulus for `level` (clamped into the configured bounds).
    pub fn generate<R: Rng + ?Sized>(&self, level: u32, rng: &mut R) -> GeneratedTrial {
        let level = self.config.clamp_level(level);
        match self.config.mode {
            ComparisonMode::Forward | ComparisonMode::Backward => self.span_sequence(level, rng),
            ComparisonMode::Count => self.counting_sequence(level, rng),
            ComparisonMode::ChangeDetection => self.change_detection(level, rng),
            ComparisonMode::CardSelection => self.card_problem(level),
        }
    }

    fn sequence_len(&self, level: u32) -> usize {
        // validated: every level in bounds has a positive size
        self.config.size_for(level).unwrap_or(level as usize).max(1)
    }

    fn span_sequence<R: Rng + ?Sized>(&self, level: u32, rng: &mut R) -> GeneratedTrial {
        let len = self.sequence_len(level);
        let tokens: Vec<Stimulus> = (0..len)
            .map(|_| match &self.config.stimuli.alphabet {
                Alphabet::Digits => Stimulus::Digit(rng.random_range(1..=9)),
                Alphabet::Objects => Stimulus::Object(rng.random_range(1..=9)),
                Alphabet::Shapes(shapes) => Stimulus::Shape(pick(shapes, rng).to_string()),
            })
            .collect();
        let sequence = StimulusSequence::new(tokens);
        GeneratedTrial {
            expected: ExpectedAnswer::Sequence(sequence.labels()),
            stimulus: TrialStimulus::Sequence(sequence),
            shortfall: None,
        }
    }

    fn counting_sequence<R: Rng + ?Sized>(&self, level: u32, rng: &mut R) -> GeneratedTrial {
        let categories = &self.config.stimuli.categories;
        let len = self.sequence_len(level);
        let tokens: Vec<Stimulus> = (0..len)
            .map(|_| Stimulus::Category(pick(categories, rng).to_string()))
            .collect();

        let mut counts: BTreeMap<String, u32> =
            categories.iter().map(|c| (c.clone(), 0)).collect();
        for token in &tokens {
            *counts.entry(token.label()).or_insert(0) += 1;
        }

        GeneratedTrial {
            stimulus: TrialStimulus::Sequence(StimulusSequence::new(tokens)),
            expected: ExpectedAnswer::Counts(counts),
            shortfall: None,
        }
    }

    fn change_detection<R: Rng + ?Sized>(&self, level: u32, rng: &mut R) -> GeneratedTrial {
        let settings = &self.config.stimuli;
        let base = Arrangement::new(
            (0..settings.slots)
                .map(|_| SlotItem::new(pick(&settings.kinds, rng), pick(&settings.colors, rng)))
                .collect(),
        );

        let requested = level.div_ceil(2) as usize;
        let swapped_pairs = find_swap_pairs(&base, requested, settings.max_swap_attempts, rng);
        let shortfall = (swapped_pairs.len() < requested).then(|| {
            warn!(
                level,
                requested,
                swapped = swapped_pairs.len(),
                "could not find enough distinguishable swap pairs"
            );
            SwapShortfall {
                requested,
                swapped: swapped_pairs.len(),
            }
        });

        let changed = swapped_pairs
            .iter()
            .fold(base.clone(), |arr, &(a, b)| arr.swapped(a, b));
        let stimulus = ChangeDetectionStimulus {
            base,
            changed,
            swapped_pairs,
        };
        GeneratedTrial {
            expected: ExpectedAnswer::Positions(stimulus.changed_positions()),
            stimulus: TrialStimulus::ChangeDetection(stimulus),
            shortfall,
        }
    }

    fn card_problem(&self, level: u32) -> GeneratedTrial {
        // validated: a problem exists at or below min_level
        let problem = self
            .config
            .card_problem_for(level)
            .cloned()
            .unwrap_or_else(|| self.config.stimuli.card_problems[0].problem.clone());
        GeneratedTrial {
            expected: ExpectedAnswer::CardPair(problem.correct_pair),
            stimulus: TrialStimulus::Cards(problem),
            shortfall: None,
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(items: &'a [String], rng: &mut R) -> &'a str {
    &items[rng.random_range(0..items.len())]
}

/// Picks up to `requested` disjoint position pairs whose items differ.
///
/// Each pair gets at most `max_attempts` random draws. When a draw budget runs
/// out, or fewer than two positions are still free, the search stops and the
/// pairs found so far are returned.
pub fn find_swap_pairs<R: Rng + ?Sized>(
    base: &Arrangement,
    requested: usize,
    max_attempts: u32,
    rng: &mut R,
) -> Vec<(usize, usize)> {
    let mut free: Vec<usize> = (0..base.len()).collect();
    let mut pairs = Vec::with_capacity(requested);

    while pairs.len() < requested && free.len() >= 2 {
        let mut found = None;
        for _ in 0..max_attempts {
            let i = rng.random_range(0..free.len());
            let mut j = rng.random_range(0..free.len() - 1);
            if j >= i {
                j += 1;
            }
            let (a, b) = (free[i], free[j]);
            let distinguishable = match (base.slot(a), base.slot(b)) {
                (Some(x), Some(y)) => x.differs_from(y),
                _ => false,
            };
            if distinguishable {
                found = Some((i, j));
                break;
            }
        }
        let Some((i, j)) = found else {
            break;
        };
        let (a, b) = (free[i], free[j]);
        pairs.push((a.min(b), a.max(b)));
        free.remove(i.max(j));
        free.remove(i.min(j));
    }

    pairs
}

//! Response scoring.
//!
//! No mode awards partial credit beyond what is stated here, because the
//! result drives staircase progression directly. Responses of the wrong shape
//! or with nothing in them are scored as incorrect; evaluation never fails.

use spanlab_core::{ChangeTally, ComparisonMode, EvaluationResult, ExpectedAnswer, Response};
use std::collections::{BTreeMap, BTreeSet};

pub fn evaluate(
    mode: ComparisonMode,
    expected: &ExpectedAnswer,
    submitted: &Response,
) -> EvaluationResult {
    match (mode, expected, submitted) {
        (ComparisonMode::Forward, ExpectedAnswer::Sequence(labels), Response::Text(text)) => {
            EvaluationResult::pass_fail(sequence_matches(labels.iter(), text))
        }
        (ComparisonMode::Backward, ExpectedAnswer::Sequence(labels), Response::Text(text)) => {
            EvaluationResult::pass_fail(sequence_matches(labels.iter().rev(), text))
        }
        (ComparisonMode::Count, ExpectedAnswer::Counts(truth), Response::Counts(counts)) => {
            EvaluationResult::pass_fail(counts_match(truth, counts))
        }
        (ComparisonMode::ChangeDetection, ExpectedAnswer::Positions(changed), response) => {
            let empty = BTreeSet::new();
            let selected = match response {
                Response::Selection(selected) => selected,
                _ => &empty,
            };
            evaluate_selection(changed, selected)
        }
        (ComparisonMode::CardSelection, ExpectedAnswer::CardPair(pair), Response::Cards(picked)) => {
            EvaluationResult::pass_fail(card_pair_matches(*pair, picked))
        }
        _ => EvaluationResult::incorrect(),
    }
}

/// The answer the participant has to give, rendered the way it is logged.
pub fn required_answer(mode: ComparisonMode, expected: &ExpectedAnswer) -> String {
    match (mode, expected) {
        (ComparisonMode::Backward, ExpectedAnswer::Sequence(labels)) => labels
            .iter()
            .rev()
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
        _ => expected.render(),
    }
}

/// Splits typed recall into lowercase tokens.
///
/// Commas count as separators and whitespace runs collapse. Input without any
/// separator is split per character when every expected label is a single
/// character, so `"385"` reads as `3 8 5` for digit tasks.
pub fn normalize_recall(input: &str, single_char_labels: bool) -> Vec<String> {
    let lowered = input.trim().to_lowercase().replace(',', " ");
    let tokens: Vec<String> = lowered.split_whitespace().map(str::to_string).collect();
    if single_char_labels && tokens.len() == 1 {
        return tokens[0].chars().map(String::from).collect();
    }
    tokens
}

fn sequence_matches<'a>(expected: impl ExactSizeIterator<Item = &'a String> + Clone, text: &str) -> bool {
    if expected.len() == 0 {
        return false;
    }
    let single_char = expected.clone().all(|label| label.chars().count() == 1);
    let submitted = normalize_recall(text, single_char);
    submitted.len() == expected.len()
        && expected
            .zip(submitted.iter())
            .all(|(want, got)| want.to_lowercase() == *got)
}

fn counts_match(truth: &BTreeMap<String, u32>, submitted: &BTreeMap<String, u32>) -> bool {
    if submitted.is_empty() {
        return false;
    }
    truth
        .keys()
        .chain(submitted.keys())
        .all(|category| truth.get(category).copied().unwrap_or(0) == submitted.get(category).copied().unwrap_or(0))
}

/// Signed scoring for change detection.
///
/// `correct` is the pass gate (`correct_selections > incorrect_selections`);
/// `tally.fully_correct` is the stricter all-found-no-errors gate. They are
/// separate on purpose and either may hold without the other.
pub fn evaluate_selection(changed: &BTreeSet<usize>, selected: &BTreeSet<usize>) -> EvaluationResult {
    let correct_selections = selected.intersection(changed).count() as u32;
    let incorrect_selections = selected.difference(changed).count() as u32;
    let fully_correct = correct_selections as usize == changed.len() && incorrect_selections == 0;
    EvaluationResult {
        correct: correct_selections > incorrect_selections,
        score_delta: correct_selections as i32 - incorrect_selections as i32,
        tally: Some(ChangeTally {
            correct_selections,
            incorrect_selections,
            fully_correct,
        }),
    }
}

fn card_pair_matches(pair: [usize; 2], picked: &[usize]) -> bool {
    if picked.len() != 2 || picked[0] == picked[1] {
        return false;
    }
    let picked: BTreeSet<usize> = picked.iter().copied().collect();
    picked == BTreeSet::from(pair)
}

//! Typed terminal input to engine responses.
//!
//! Parsing is lenient: anything that cannot be read is dropped, and the
//! evaluator scores what is left. Slot and card numbers are typed 1-based.

use spanlab_core::{ComparisonMode, Response};
use std::collections::{BTreeMap, BTreeSet};

pub fn parse_response(mode: ComparisonMode, input: &str, categories: &[String]) -> Response {
    match mode {
        ComparisonMode::Forward | ComparisonMode::Backward => Response::Text(input.to_string()),
        ComparisonMode::Count => Response::Counts(parse_counts(input, categories)),
        ComparisonMode::ChangeDetection => {
            Response::Selection(one_based(input).collect::<BTreeSet<_>>())
        }
        ComparisonMode::CardSelection => Response::Cards(one_based(input).collect()),
    }
}

/// Accepts `bills=2 buses=1` or bare numbers in category order (`2 1 0`).
fn parse_counts(input: &str, categories: &[String]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    let mut position = 0;
    for token in tokens(input) {
        match token.split_once('=') {
            Some((name, n)) => {
                if let Ok(n) = n.trim().parse() {
                    counts.insert(category_key(name.trim(), categories), n);
                }
            }
            None => {
                if let (Some(category), Ok(n)) = (categories.get(position), token.parse()) {
                    counts.insert(category.clone(), n);
                }
                position += 1;
            }
        }
    }
    counts
}

/// Typed names match configured categories regardless of case and take
/// their configured spelling.
fn category_key(name: &str, categories: &[String]) -> String {
    categories
        .iter()
        .find(|c| c.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_lowercase())
}

fn one_based(input: &str) -> impl Iterator<Item = usize> + '_ {
    tokens(input)
        .filter_map(|t| t.parse::<usize>().ok())
        .filter_map(|n| n.checked_sub(1))
}

fn tokens(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// What the participant is asked to type.
pub fn prompt(mode: ComparisonMode, categories: &[String]) -> String {
    match mode {
        ComparisonMode::Forward => "Type the sequence in order:".into(),
        ComparisonMode::Backward => "Type the sequence in reverse order:".into(),
        ComparisonMode::Count => format!("How many of each? ({})", categories.join(", ")),
        ComparisonMode::ChangeDetection => "Which positions changed? (numbers)".into(),
        ComparisonMode::CardSelection => "Which two cards must be turned over?".into(),
    }
}

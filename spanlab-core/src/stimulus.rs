use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A single to-be-remembered (or to-be-counted) token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Stimulus {
    Digit(u8),
    Object(u8),
    Shape(String),
    Category(String),
}

impl Stimulus {
    /// Label the participant is expected to type back.
    pub fn label(&self) -> String {
        match self {
            Stimulus::Digit(d) | Stimulus::Object(d) => d.to_string(),
            Stimulus::Shape(name) | Stimulus::Category(name) => name.clone(),
        }
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Ordered, immutable stimulus list for one trial.
///
/// There is no mutable access after construction; transformations such as
/// [`StimulusSequence::reversed`] produce a new sequence. Clones share the
/// token storage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StimulusSequence {
    tokens: Arc<[Stimulus]>,
}

impl StimulusSequence {
    pub fn new(tokens: Vec<Stimulus>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stimulus> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stimulus> {
        self.tokens.iter()
    }

    pub fn as_slice(&self) -> &[Stimulus] {
        &self.tokens
    }

    pub fn labels(&self) -> Vec<String> {
        self.tokens.iter().map(Stimulus::label).collect()
    }

    pub fn reversed(&self) -> Self {
        Self {
            tokens: self.tokens.iter().rev().cloned().collect(),
        }
    }

    /// Space-joined labels, the canonical typed form of the sequence.
    pub fn joined(&self) -> String {
        self.labels().join(" ")
    }
}

impl<'a> IntoIterator for &'a StimulusSequence {
    type Item = &'a Stimulus;
    type IntoIter = std::slice::Iter<'a, Stimulus>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// One occupied slot of a change-detection arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotItem {
    pub kind: String,
    pub color: String,
}

impl SlotItem {
    pub fn new(kind: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            color: color.into(),
        }
    }

    /// Two items are distinguishable when they differ in kind or color.
    pub fn differs_from(&self, other: &SlotItem) -> bool {
        self.kind != other.kind || self.color != other.color
    }
}

impl fmt::Display for SlotItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.color, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrangement {
    slots: Vec<SlotItem>,
}

impl Arrangement {
    pub fn new(slots: Vec<SlotItem>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&SlotItem> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[SlotItem] {
        &self.slots
    }

    /// Returns a copy with the items at `a` and `b` exchanged.
    pub fn swapped(&self, a: usize, b: usize) -> Self {
        let mut slots = self.slots.clone();
        slots.swap(a, b);
        Self { slots }
    }

    pub fn describe(&self) -> String {
        self.slots
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Study arrangement, test arrangement, and which positions were swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetectionStimulus {
    pub base: Arrangement,
    pub changed: Arrangement,
    pub swapped_pairs: Vec<(usize, usize)>,
}

impl ChangeDetectionStimulus {
    pub fn changed_positions(&self) -> BTreeSet<usize> {
        self.swapped_pairs
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub label: String,
}

impl Card {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// A rule-inference problem: cards on the table and the pair that must be turned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardProblem {
    pub rule: String,
    pub cards: Vec<Card>,
    pub correct_pair: [usize; 2],
}

impl CardProblem {
    pub fn describe(&self) -> String {
        self.cards
            .iter()
            .map(|c| c.label.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything generated for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TrialStimulus {
    Sequence(StimulusSequence),
    ChangeDetection(ChangeDetectionStimulus),
    Cards(CardProblem),
}

impl TrialStimulus {
    /// Rendered form stored in the trial log.
    pub fn describe(&self) -> String {
        match self {
            TrialStimulus::Sequence(seq) => seq.joined(),
            TrialStimulus::ChangeDetection(cd) => {
                format!("{} | {}", cd.base.describe(), cd.changed.describe())
            }
            TrialStimulus::Cards(problem) => problem.describe(),
        }
    }

    pub fn as_sequence(&self) -> Option<&StimulusSequence> {
        match self {
            TrialStimulus::Sequence(seq) => Some(seq),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_leaves_original_untouched() {
        let seq = StimulusSequence::new(vec![
            Stimulus::Digit(3),
            Stimulus::Digit(8),
            Stimulus::Digit(5),
        ]);
        let rev = seq.reversed();
        assert_eq!(seq.joined(), "3 8 5");
        assert_eq!(rev.joined(), "5 8 3");
    }

    #[test]
    fn clones_share_tokens() {
        let seq = StimulusSequence::new(vec![Stimulus::Digit(1), Stimulus::Digit(2)]);
        let copy = seq.clone();
        assert!(std::ptr::eq(seq.as_slice(), copy.as_slice()));
    }

    #[test]
    fn changed_positions_flatten_pairs() {
        let base = Arrangement::new(vec![
            SlotItem::new("circle", "red"),
            SlotItem::new("square", "blue"),
            SlotItem::new("star", "green"),
            SlotItem::new("circle", "blue"),
            SlotItem::new("square", "red"),
        ]);
        let changed = base.swapped(1, 3);
        let cd = ChangeDetectionStimulus {
            base: base.clone(),
            changed: changed.clone(),
            swapped_pairs: vec![(1, 3)],
        };
        assert_eq!(cd.changed_positions(), BTreeSet::from([1, 3]));
        assert_eq!(changed.slot(1), base.slot(3));
        assert_eq!(base.slot(1).unwrap().to_string(), "blue/square");
    }

    #[test]
    fn sequence_serializes_as_plain_list() {
        let seq = StimulusSequence::new(vec![Stimulus::Shape("star".into())]);
        let json = serde_json::to_string(&seq).unwrap();
        assert_eq!(json, r#"[{"type":"shape","value":"star"}]"#);
    }
}

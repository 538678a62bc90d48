use serde::{Deserialize, Serialize};
use std::fmt;

/// How a submitted response is compared against the expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMode {
    /// Recall the sequence in presentation order.
    Forward,
    /// Recall the sequence in reverse order.
    Backward,
    /// Report how many items of each category were shown.
    Count,
    /// Select the positions that changed between two arrangements.
    ChangeDetection,
    /// Pick the two cards that test the rule.
    CardSelection,
}

impl ComparisonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Count => "count",
            Self::ChangeDetection => "change-detection",
            Self::CardSelection => "card-selection",
        }
    }

    /// Modes whose stimulus is shown one item at a time.
    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Forward | Self::Backward | Self::Count)
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

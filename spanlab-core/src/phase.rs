use serde::{Deserialize, Serialize};

/// Presentation phases as seen by the observer.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationPhase {
    #[default]
    Idle,
    Presenting,
    Blank,
    AwaitingResponse,
    Complete,
}

impl PresentationPhase {
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::AwaitingResponse)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// True while stimuli are on screen or between items.
    pub fn is_presenting(&self) -> bool {
        matches!(self, Self::Presenting | Self::Blank)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Presenting => "presenting",
            Self::Blank => "blank",
            Self::AwaitingResponse => "awaiting-response",
            Self::Complete => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_awaiting_response_allows_input() {
        assert!(PresentationPhase::AwaitingResponse.allows_input());
        assert!(!PresentationPhase::Presenting.allows_input());
        assert!(!PresentationPhase::Blank.allows_input());
        assert!(!PresentationPhase::Complete.allows_input());
    }

    #[test]
    fn phase_names_are_kebab_case() {
        let json = serde_json::to_string(&PresentationPhase::AwaitingResponse).unwrap();
        assert_eq!(json, "\"awaiting-response\"");
        assert_eq!(PresentationPhase::AwaitingResponse.as_str(), "awaiting-response");
    }
}

//! Interview phases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The set of interview states.
///
/// Every interview starts at `Intro` and terminates at `Summary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewState {
    /// Greeting and background question.
    Intro,
    /// One basic formula question to gauge the starting level.
    Calibrate,
    /// Coverage-driven questions over foundations, functions and data ops.
    CoreQ,
    /// Advanced analysis questions for strong candidates.
    DeepDive,
    /// Multi-part scenario question.
    Case,
    /// Closing clarification prompt.
    Review,
    /// Interview over. Terminal.
    Summary,
}

impl InterviewState {
    pub fn all() -> &'static [InterviewState] {
        &[
            Self::Intro,
            Self::Calibrate,
            Self::CoreQ,
            Self::DeepDive,
            Self::Case,
            Self::Review,
            Self::Summary,
        ]
    }

    /// Whether this is the terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Summary)
    }

    /// Whether answers given in this state are graded as skill answers.
    pub fn is_graded(self) -> bool {
        matches!(
            self,
            Self::Calibrate | Self::CoreQ | Self::DeepDive | Self::Case
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intro => "INTRO",
            Self::Calibrate => "CALIBRATE",
            Self::CoreQ => "CORE_Q",
            Self::DeepDive => "DEEP_DIVE",
            Self::Case => "CASE",
            Self::Review => "REVIEW",
            Self::Summary => "SUMMARY",
        }
    }
}

impl fmt::Display for InterviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown state name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown interview state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for InterviewState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_upper_snake_names() {
        let json = serde_json::to_string(&InterviewState::CoreQ).unwrap();
        assert_eq!(json, "\"CORE_Q\"");
        let restored: InterviewState = serde_json::from_str("\"DEEP_DIVE\"").unwrap();
        assert_eq!(restored, InterviewState::DeepDive);
    }

    #[test]
    fn parse_round_trips_display() {
        for state in InterviewState::all() {
            assert_eq!(state.to_string().parse::<InterviewState>().unwrap(), *state);
        }
        assert_eq!(
            "core_q".parse::<InterviewState>().unwrap(),
            InterviewState::CoreQ
        );
        assert!("LOBBY".parse::<InterviewState>().is_err());
    }

    #[test]
    fn only_summary_is_terminal() {
        let terminal: Vec<_> = InterviewState::all()
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&InterviewState::Summary]);
    }

    #[test]
    fn intro_review_summary_are_not_graded() {
        assert!(!InterviewState::Intro.is_graded());
        assert!(!InterviewState::Review.is_graded());
        assert!(!InterviewState::Summary.is_graded());
        assert!(InterviewState::Case.is_graded());
    }
}

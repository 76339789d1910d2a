//! Interview session and turn records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageVector;
use crate::grading::HybridGradingResult;
use crate::interview::InterviewState;

pub type InterviewId = u64;
pub type TurnId = u64;

/// One interview, as persisted between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: InterviewId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_name: Option<String>,
    pub state: InterviewState,
    /// Number of turns recorded so far. Maintained by the store.
    pub turn_count: u32,
    pub coverage: CoverageVector,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
}

impl InterviewSession {
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Minutes between creation and `ended_at` (or `now` while running).
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> f64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.created_at).num_seconds().max(0) as f64 / 60.0
    }

    /// Whether the interview has run past its wall-clock budget.
    pub fn time_limit_exceeded(&self, limit_minutes: i64, now: DateTime<Utc>) -> bool {
        self.duration_minutes(now) > limit_minutes as f64
    }
}

/// Partial update of a session. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterviewUpdate {
    pub state: Option<InterviewState>,
    pub coverage: Option<CoverageVector>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<String>,
    pub total_score: Option<f64>,
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub interview_id: InterviewId,
    /// 1-based and contiguous within an interview.
    pub turn_number: u32,
    pub question: String,
    pub target_skill: String,
    pub difficulty: u8,
    /// State that issued the question.
    pub phase: InterviewState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<HybridGradingResult>,
    pub asked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }

    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }
}

/// A question about to be issued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTurn {
    pub interview_id: InterviewId,
    pub turn_number: u32,
    pub question: String,
    pub target_skill: String,
    pub difficulty: u8,
    pub phase: InterviewState,
    pub expected_answer: Option<String>,
}

/// The two write-once updates a turn accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnUpdate {
    Answer(String),
    Grade(HybridGradingResult),
}

//! Persistence contract for interviews, turns, question templates and rubrics.
//!
//! The orchestrator only talks to [`InterviewStore`]; durable backends live
//! outside this crate. [`MemoryStore`] is the in-process implementation used
//! by the console driver and tests.

mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;

use crate::coverage::SkillCategory;
use crate::session::{
    InterviewId, InterviewSession, InterviewUpdate, NewTurn, Turn, TurnId, TurnUpdate,
};

/// A pre-authored question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub skill: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SkillCategory>,
    pub difficulty: u8,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub validation_rules: Vec<String>,
}

/// Grading criteria for a skill at one difficulty tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricEntry {
    pub skill: String,
    pub difficulty: u8,
    /// Dimension name → what a good answer shows.
    pub criteria: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("interview {interview_id}: expected turn {expected}, got {got}")]
    NonContiguousTurn {
        interview_id: InterviewId,
        expected: u32,
        got: u32,
    },

    #[error("turn {0} already has an answer")]
    AnswerAlreadyRecorded(TurnId),

    #[error("turn {0} is already graded")]
    TurnAlreadyGraded(TurnId),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Storage operations the interview engine depends on.
///
/// Implementations must keep turn numbers contiguous per interview and treat
/// a turn's answer and grade as write-once.
pub trait InterviewStore: Send + Sync {
    fn create_interview(
        &self,
        candidate_name: Option<String>,
    ) -> Result<InterviewSession, StoreError>;

    fn get_interview(&self, id: InterviewId) -> Result<Option<InterviewSession>, StoreError>;

    fn update_interview(
        &self,
        id: InterviewId,
        update: InterviewUpdate,
    ) -> Result<InterviewSession, StoreError>;

    /// Append a turn. Its number must be `turn_count + 1`.
    fn add_turn(&self, turn: NewTurn) -> Result<Turn, StoreError>;

    fn update_turn(&self, turn_id: TurnId, update: TurnUpdate) -> Result<Turn, StoreError>;

    /// All turns of an interview, ordered by turn number.
    fn turns(&self, interview_id: InterviewId) -> Result<Vec<Turn>, StoreError>;

    fn find_question(
        &self,
        skill: &str,
        difficulty: u8,
        category: Option<SkillCategory>,
    ) -> Result<Option<QuestionTemplate>, StoreError>;

    fn find_rubric(&self, skill: &str, difficulty: u8) -> Result<Option<RubricEntry>, StoreError>;
}

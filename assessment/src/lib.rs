//! Assessment core for adaptive technical interviews.
//!
//! This crate is deterministic and synchronous. It provides:
//! - [`coverage`]: the skill catalog and per-interview exposure levels
//! - [`interview`]: the phase transition table, turn guards and the
//!   coverage-driven question planner
//! - [`grading`]: the rule-based grader and the hybrid combination and
//!   escalation policy
//! - [`store`]: the persistence contract plus an in-memory implementation
//! - [`report`]: end-of-interview scoring and feedback
//!
//! Anything that talks to a language model lives in the `interview-agents`
//! crate, which drives these pieces turn by turn.

pub mod coverage;
pub mod grading;
pub mod interview;
pub mod report;
pub mod session;
pub mod store;

pub use coverage::{CoverageVector, SkillCatalog, SkillCategory, MAX_LEVEL};
pub use grading::{
    GradingMethod, HybridGradingResult, HybridPolicy, LlmGradeSource, LlmGradingResult,
    RuleBasedGrader, RuleResult,
};
pub use interview::{
    InterviewPolicy, InterviewState, InterviewStateMachine, QuestionPlan, TransitionDecision,
};
pub use report::{build_report, InterviewReport, PerformanceLevel};
pub use session::{
    InterviewId, InterviewSession, InterviewUpdate, NewTurn, Turn, TurnId, TurnUpdate,
};
pub use store::{InterviewStore, MemoryStore, QuestionTemplate, RubricEntry, StoreError};

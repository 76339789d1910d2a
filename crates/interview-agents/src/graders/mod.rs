//! Async graders built on the deterministic policies in `assessment::grading`.

pub mod hybrid;
pub mod llm;

use serde::{Deserialize, Serialize};

pub use hybrid::HybridGrader;
pub use llm::{builtin_rubric, fallback_grade, LlmError, LlmGrader};

/// Everything needed to grade one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRequest {
    pub question: String,
    pub answer: String,
    pub skill: String,
    pub difficulty: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
}

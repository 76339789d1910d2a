//! Structured model response contracts.
//!
//! Grading and calibration prompts ask the model for a JSON object. The
//! response is parsed into one of the typed contracts below; anything that
//! does not parse, or parses with out-of-range values, is rejected so the
//! caller can fall back.
//!
//! ```text
//! GradeResponse {
//!     scores_by_dimension: { dimension: 0..=100 },
//!     total_score:         0..=100,
//!     confidence:          0..=1   (default 0.5),
//!     error_tags:          [string],
//!     feedback_short:      string,
//! }
//!
//! CalibrationResponse {
//!     question, target_skill, difficulty, expected_approach
//! }
//! ```

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("malformed response JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    Invalid(String),
}

fn default_confidence() -> f64 {
    0.5
}

/// Grading verdict from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GradeResponse {
    /// Score per rubric dimension, each 0-100.
    #[serde(default)]
    pub scores_by_dimension: BTreeMap<String, f64>,
    /// Overall score, 0-100.
    pub total_score: f64,
    /// Grader confidence, 0-1.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Short snake_case labels for mistakes found.
    #[serde(default)]
    pub error_tags: Vec<String>,
    /// One to three sentences of feedback for the candidate.
    #[serde(default)]
    pub feedback_short: String,
}

/// A generated calibration question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationResponse {
    pub question: String,
    /// Skill the question targets, e.g. `basic_formulas` or `references`.
    pub target_skill: String,
    #[serde(default)]
    pub difficulty: Option<u8>,
    /// Brief description of the expected answer.
    #[serde(default)]
    pub expected_approach: Option<String>,
}

/// Pretty-printed JSON schema of a contract, for embedding in prompts.
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Parse and range-check a grading response.
pub fn parse_grade_response(raw: &str) -> Result<GradeResponse, ContractError> {
    let json = extract_json_block(raw).ok_or(ContractError::NoJson)?;
    let mut grade: GradeResponse = serde_json::from_str(json)?;

    if !grade.total_score.is_finite() {
        return Err(ContractError::Invalid("total_score is not a number".into()));
    }
    grade.total_score = grade.total_score.clamp(0.0, 100.0);
    grade.confidence = if grade.confidence.is_finite() {
        grade.confidence.clamp(0.0, 1.0)
    } else {
        default_confidence()
    };
    grade.scores_by_dimension.retain(|_, v| v.is_finite());
    for score in grade.scores_by_dimension.values_mut() {
        *score = score.clamp(0.0, 100.0);
    }
    Ok(grade)
}

/// Parse a calibration question. An empty question is rejected.
pub fn parse_calibration_response(raw: &str) -> Result<CalibrationResponse, ContractError> {
    let json = extract_json_block(raw).ok_or(ContractError::NoJson)?;
    let response: CalibrationResponse = serde_json::from_str(json)?;
    if response.question.trim().is_empty() {
        return Err(ContractError::Invalid("empty question".into()));
    }
    Ok(response)
}

/// Try to extract a JSON block from a response that may contain surrounding text.
fn extract_json_block(text: &str) -> Option<&str> {
    // Look for ```json ... ``` fenced blocks
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return Some(text[json_start..json_start + end].trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

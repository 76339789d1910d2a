//! Grading result types shared by the rule, LLM and hybrid graders.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const TAG_SCORING_DISAGREEMENT: &str = "scoring_disagreement";
pub const TAG_GRADING_ERROR: &str = "grading_error";
pub const TAG_ESCALATION_FAILED: &str = "escalation_failed";
pub const TAG_GRADING_INCOMPLETE: &str = "grading_incomplete";
pub const TAG_LLM_GRADING_FAILED: &str = "llm_grading_failed";

/// Score a rule validator needs to count as passed.
pub const RULE_PASS_THRESHOLD: f64 = 0.6;

/// Outcome of the deterministic rule grader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub passed: bool,
    /// In `[0, 1]`.
    pub score: f64,
    pub error_tags: Vec<String>,
    pub feedback: String,
}

impl RuleResult {
    /// Build from a raw score, clamping into `[0, 1]` and deriving `passed`.
    pub fn from_score(score: f64, error_tags: Vec<String>, feedback_parts: &[String]) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            passed: score >= RULE_PASS_THRESHOLD,
            score,
            error_tags,
            feedback: feedback_parts.join("; "),
        }
    }

    /// Score on the 0–100 scale used by the hybrid grader.
    pub fn percent(&self) -> f64 {
        self.score * 100.0
    }
}

/// Where an LLM grading result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmGradeSource {
    Model,
    Fallback,
}

/// Multi-dimension score produced by the LLM grader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmGradingResult {
    pub scores_by_dimension: BTreeMap<String, f64>,
    /// In `[0, 100]`.
    pub total_score: f64,
    /// In `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub error_tags: Vec<String>,
    #[serde(default)]
    pub feedback_short: String,
    pub source: LlmGradeSource,
}

impl LlmGradingResult {
    pub fn is_fallback(&self) -> bool {
        self.source == LlmGradeSource::Fallback
    }
}

/// How a hybrid score was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMethod {
    RuleOnly,
    LlmOnly,
    Hybrid,
    Disagreement,
    Escalated,
    EscalationFailed,
    Fallback,
}

impl GradingMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RuleOnly => "rule_only",
            Self::LlmOnly => "llm_only",
            Self::Hybrid => "hybrid",
            Self::Disagreement => "disagreement",
            Self::Escalated => "escalated",
            Self::EscalationFailed => "escalation_failed",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for GradingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final grade of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridGradingResult {
    /// Rule score on the 0–100 scale, when the rule grader ran.
    pub rule_score: Option<f64>,
    pub llm_score: Option<f64>,
    pub hybrid_score: f64,
    pub confidence: f64,
    pub error_tags: Vec<String>,
    pub feedback: String,
    pub grading_method: GradingMethod,
}

impl HybridGradingResult {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.error_tags.iter().any(|t| t == tag)
    }
}

/// Union of tag lists, keeping first-seen order.
pub fn merge_tags<'a>(lists: impl IntoIterator<Item = &'a [String]>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for tag in lists.into_iter().flatten() {
        if !merged.contains(tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

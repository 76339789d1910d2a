//! Answer grading: deterministic rules plus the hybrid combination policy.

pub mod hybrid;
pub mod rule;
pub mod types;

pub use hybrid::{
    contains_formula, escalated_result, escalation_failed_result, HybridPolicy,
    FORMULA_INDICATORS,
};
pub use rule::{split_arguments, RuleBasedGrader};
pub use types::{
    merge_tags, GradingMethod, HybridGradingResult, LlmGradeSource, LlmGradingResult,
    RuleResult, RULE_PASS_THRESHOLD, TAG_ESCALATION_FAILED, TAG_GRADING_ERROR,
    TAG_GRADING_INCOMPLETE, TAG_LLM_GRADING_FAILED, TAG_SCORING_DISAGREEMENT,
};

//! Hybrid grading policy: routing, combination and escalation decisions.
//!
//! This module is pure. The async orchestration that actually calls the LLM
//! lives in the agents crate and asks this policy what to do at each step.

use serde::{Deserialize, Serialize};

use super::types::{
    merge_tags, GradingMethod, HybridGradingResult, LlmGradingResult, RuleResult,
    TAG_ESCALATION_FAILED, TAG_GRADING_ERROR, TAG_GRADING_INCOMPLETE, TAG_SCORING_DISAGREEMENT,
};

/// Substrings (upper-cased comparison) that mark an answer as containing a formula.
pub const FORMULA_INDICATORS: &[&str] = &[
    "=", "SUM(", "VLOOKUP(", "IF(", "COUNTIF(", "INDEX(", "MATCH(",
];

/// Whether an answer contains formula syntax.
pub fn contains_formula(answer: &str) -> bool {
    let upper = answer.to_uppercase();
    FORMULA_INDICATORS.iter().any(|i| upper.contains(i))
}

/// Thresholds and skill classes for hybrid grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridPolicy {
    /// Skills where syntax is what matters; the rule grader always runs.
    pub rule_heavy_skills: Vec<String>,
    /// Skills that always need LLM judgement.
    pub llm_heavy_skills: Vec<String>,
    /// Point gap (0–100 scale) above which rule and LLM disagree.
    pub disagreement_threshold: f64,
    /// Confidence below which a result is escalated.
    pub escalation_threshold: f64,
    /// Rule weight on agreement for rule-heavy skills.
    pub rule_heavy_weight: f64,
    /// Rule weight on agreement for all other skills.
    pub default_rule_weight: f64,
    /// Rule score (0–1) below which the LLM is consulted.
    pub low_rule_score: f64,
    /// Word count above which the LLM is consulted.
    pub long_answer_words: usize,
    /// Character count above which flagged rule errors trigger the LLM.
    pub detailed_answer_chars: usize,
}

impl Default for HybridPolicy {
    fn default() -> Self {
        fn owned(skills: &[&str]) -> Vec<String> {
            skills.iter().map(|s| s.to_string()).collect()
        }
        Self {
            rule_heavy_skills: owned(&["references", "basic_formulas", "vlookup", "if_functions"]),
            llm_heavy_skills: owned(&["pivot_tables", "case_analysis", "charts", "best_practices"]),
            disagreement_threshold: 20.0,
            escalation_threshold: 0.5,
            rule_heavy_weight: 0.7,
            default_rule_weight: 0.3,
            low_rule_score: 0.3,
            long_answer_words: 50,
            detailed_answer_chars: 100,
        }
    }
}

impl HybridPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.disagreement_threshold < 0.0 || self.disagreement_threshold > 100.0 {
            return Err(format!(
                "disagreement_threshold must be in [0, 100], got {}",
                self.disagreement_threshold
            ));
        }
        for (name, value) in [
            ("escalation_threshold", self.escalation_threshold),
            ("rule_heavy_weight", self.rule_heavy_weight),
            ("default_rule_weight", self.default_rule_weight),
            ("low_rule_score", self.low_rule_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        Ok(())
    }

    pub fn is_rule_heavy(&self, skill: &str) -> bool {
        self.rule_heavy_skills.iter().any(|s| s == skill)
    }

    pub fn is_llm_heavy(&self, skill: &str) -> bool {
        self.llm_heavy_skills.iter().any(|s| s == skill)
    }

    /// Whether the rule grader should run for this answer.
    pub fn should_run_rules(&self, skill: &str, answer: &str) -> bool {
        self.is_rule_heavy(skill) || contains_formula(answer)
    }

    /// Whether the LLM grader should run, given the rule outcome (if any).
    pub fn needs_llm(
        &self,
        rule: Option<&RuleResult>,
        skill: &str,
        difficulty: u8,
        answer: &str,
    ) -> bool {
        if self.is_llm_heavy(skill) || difficulty >= 3 {
            return true;
        }
        if rule.is_some_and(|r| r.score < self.low_rule_score) {
            return true;
        }
        if answer.split_whitespace().count() > self.long_answer_words {
            return true;
        }
        rule.is_some_and(|r| !r.error_tags.is_empty())
            && answer.chars().count() > self.detailed_answer_chars
    }

    /// Merge whichever grader outputs are available into one result.
    pub fn combine(
        &self,
        rule: Option<&RuleResult>,
        llm: Option<&LlmGradingResult>,
        skill: &str,
    ) -> HybridGradingResult {
        match (rule, llm) {
            (Some(rule), None) => HybridGradingResult {
                rule_score: Some(rule.percent()),
                llm_score: None,
                hybrid_score: rule.percent(),
                confidence: if rule.passed { 0.8 } else { 0.6 },
                error_tags: rule.error_tags.clone(),
                feedback: rule.feedback.clone(),
                grading_method: GradingMethod::RuleOnly,
            },
            (None, Some(llm)) => HybridGradingResult {
                rule_score: None,
                llm_score: Some(llm.total_score),
                hybrid_score: llm.total_score,
                confidence: llm.confidence,
                error_tags: llm.error_tags.clone(),
                feedback: llm.feedback_short.clone(),
                grading_method: GradingMethod::LlmOnly,
            },
            (Some(rule), Some(llm)) => self.combine_both(rule, llm, skill),
            (None, None) => HybridGradingResult {
                rule_score: None,
                llm_score: None,
                hybrid_score: 50.0,
                confidence: 0.3,
                error_tags: vec![TAG_GRADING_ERROR.to_string()],
                feedback: "Unable to grade properly".to_string(),
                grading_method: GradingMethod::Fallback,
            },
        }
    }

    fn combine_both(
        &self,
        rule: &RuleResult,
        llm: &LlmGradingResult,
        skill: &str,
    ) -> HybridGradingResult {
        let rule_score = rule.percent();
        let llm_score = llm.total_score;
        let diff = (rule_score - llm_score).abs();
        let rule_heavy = self.is_rule_heavy(skill);

        if diff <= self.disagreement_threshold {
            let rule_weight = if rule_heavy {
                self.rule_heavy_weight
            } else {
                self.default_rule_weight
            };
            return HybridGradingResult {
                rule_score: Some(rule_score),
                llm_score: Some(llm_score),
                hybrid_score: rule_score * rule_weight + llm_score * (1.0 - rule_weight),
                confidence: ((0.8 + llm.confidence) / 2.0).min(0.9),
                error_tags: merge_tags([rule.error_tags.as_slice(), llm.error_tags.as_slice()]),
                feedback: format!(
                    "Rule-based: {}. LLM analysis: {}",
                    rule.feedback, llm.feedback_short
                ),
                grading_method: GradingMethod::Hybrid,
            };
        }

        let (primary_score, primary) = if rule_heavy && rule.passed {
            (rule_score, "rule_primary")
        } else {
            (llm_score, "llm_primary")
        };
        let mut error_tags = merge_tags([rule.error_tags.as_slice(), llm.error_tags.as_slice()]);
        error_tags.push(TAG_SCORING_DISAGREEMENT.to_string());

        HybridGradingResult {
            rule_score: Some(rule_score),
            llm_score: Some(llm_score),
            hybrid_score: primary_score,
            confidence: 0.6,
            error_tags,
            feedback: format!("Rule vs LLM disagreement ({diff:.1} points). Primary: {primary}"),
            grading_method: GradingMethod::Disagreement,
        }
    }

    /// Whether a combined result should be re-graded by the stronger model.
    pub fn needs_escalation(&self, result: &HybridGradingResult) -> bool {
        result.confidence < self.escalation_threshold
            || result.has_tag(TAG_SCORING_DISAGREEMENT)
            || result.grading_method == GradingMethod::Fallback
    }
}

/// Result after a successful escalated re-grade.
pub fn escalated_result(
    rule: Option<&RuleResult>,
    escalated: &LlmGradingResult,
) -> HybridGradingResult {
    HybridGradingResult {
        rule_score: rule.map(RuleResult::percent),
        llm_score: Some(escalated.total_score),
        hybrid_score: escalated.total_score,
        confidence: (escalated.confidence + 0.1).min(0.9),
        error_tags: escalated.error_tags.clone(),
        feedback: format!("Escalated to premium model. {}", escalated.feedback_short),
        grading_method: GradingMethod::Escalated,
    }
}

/// Result when escalation was needed but could not be completed.
pub fn escalation_failed_result(
    base: &HybridGradingResult,
    rule: Option<&RuleResult>,
) -> HybridGradingResult {
    if base.grading_method == GradingMethod::Fallback {
        return HybridGradingResult {
            rule_score: rule.map(RuleResult::percent),
            llm_score: None,
            hybrid_score: rule.map(RuleResult::percent).unwrap_or(50.0),
            confidence: 0.4,
            error_tags: vec![
                TAG_ESCALATION_FAILED.to_string(),
                TAG_GRADING_INCOMPLETE.to_string(),
            ],
            feedback: "Unable to complete escalated grading".to_string(),
            grading_method: GradingMethod::EscalationFailed,
        };
    }

    let mut result = base.clone();
    if !result.has_tag(TAG_ESCALATION_FAILED) {
        result.error_tags.push(TAG_ESCALATION_FAILED.to_string());
    }
    result.feedback = format!("Escalation failed. {}", base.feedback);
    result.grading_method = GradingMethod::EscalationFailed;
    result
}

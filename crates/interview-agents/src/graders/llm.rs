//! LLM-based grader: rubric prompt, structured verdict, heuristic fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use assessment::grading::{LlmGradeSource, LlmGradingResult, RuleResult, TAG_LLM_GRADING_FAILED};
use assessment::store::InterviewStore;
use thiserror::Error;
use tracing::{debug, warn};

use super::GradingRequest;
use crate::contracts::{parse_grade_response, ContractError};
use crate::providers::{GenerateRequest, ProviderError, ProviderManager, ProviderSelection};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

const GRADING_INSTRUCTIONS: &str = r#"GRADING INSTRUCTIONS:
- Score each dimension 0-100 for quality and correctness
- Grade more strictly at higher difficulty levels
- Name specific error types and areas for improvement as snake_case tags
- Weigh technical correctness and practical understanding together

Respond with a single JSON object in exactly this format:
{
    "scores_by_dimension": {
        "technical_accuracy": 85,
        "completeness": 75,
        "clarity": 90
    },
    "total_score": 80,
    "error_tags": ["minor_syntax_error", "missing_error_handling"],
    "confidence": 0.85,
    "feedback_short": "Correct syntax. Consider IFERROR for missing matches."
}"#;

/// Built-in rubric for a skill, or the general one.
pub fn builtin_rubric(skill: &str) -> BTreeMap<String, String> {
    let entries: &[(&str, &str)] = match skill {
        "vlookup" => &[
            ("technical_accuracy", "Correct VLOOKUP syntax and parameters"),
            ("completeness", "All required parameters included"),
            ("efficiency", "Appropriate use vs alternatives"),
            ("best_practices", "Proper error handling and match type"),
        ],
        "if_functions" => &[
            ("technical_accuracy", "Correct IF syntax and logical operators"),
            ("completeness", "Handles all conditions mentioned"),
            ("efficiency", "Optimal nesting/structure"),
            ("best_practices", "Readable formula construction"),
        ],
        "pivot_tables" => &[
            ("technical_accuracy", "Correct understanding of pivot components"),
            ("completeness", "All required steps mentioned"),
            ("clarity", "Clear explanation of process"),
            ("efficiency", "Efficient data organization approach"),
        ],
        _ => &[
            ("technical_accuracy", "Correctness of Excel knowledge"),
            ("completeness", "Addresses all parts of question"),
            ("clarity", "Clear explanation and reasoning"),
        ],
    };
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Heuristic score used when the model cannot be reached or answers badly.
pub fn fallback_grade(answer: &str, error: &str) -> LlmGradingResult {
    let mut base = 60.0;
    if answer.trim().chars().count() < 20 {
        base -= 20.0;
    }
    if answer.contains('=') {
        base += 10.0;
    }
    if answer.split_whitespace().count() > 50 {
        base += 10.0;
    }

    let reason: String = error.chars().take(100).collect();
    LlmGradingResult {
        scores_by_dimension: BTreeMap::from([
            ("technical_accuracy".to_string(), base),
            ("completeness".to_string(), base - 5.0),
            ("clarity".to_string(), base + 5.0),
        ]),
        total_score: base,
        confidence: 0.3,
        error_tags: vec![TAG_LLM_GRADING_FAILED.to_string()],
        feedback_short: format!("Fallback grading used due to error: {reason}"),
        source: LlmGradeSource::Fallback,
    }
}

/// Grades answers with the configured model.
pub struct LlmGrader {
    providers: Arc<ProviderManager>,
    store: Option<Arc<dyn InterviewStore>>,
}

impl LlmGrader {
    pub fn new(providers: Arc<ProviderManager>) -> Self {
        Self {
            providers,
            store: None,
        }
    }

    /// Consult the store for rubrics before the built-in table.
    pub fn with_store(mut self, store: Arc<dyn InterviewStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn providers(&self) -> &Arc<ProviderManager> {
        &self.providers
    }

    pub fn rubric(&self, skill: &str, difficulty: u8) -> BTreeMap<String, String> {
        let stored = self.store.as_ref().and_then(|store| {
            store
                .find_rubric(skill, difficulty)
                .map_err(|e| warn!(skill, error = %e, "rubric lookup failed"))
                .ok()
                .flatten()
        });
        match stored {
            Some(entry) if !entry.criteria.is_empty() => entry.criteria,
            _ => builtin_rubric(skill),
        }
    }

    pub fn build_prompt(&self, request: &GradingRequest, rule: Option<&RuleResult>) -> String {
        let rubric = self.rubric(&request.skill, request.difficulty);
        let rubric_json = serde_json::to_string_pretty(&rubric).unwrap_or_default();

        let mut prompt = format!(
            "You are an expert Excel interviewer evaluating a candidate's response. \
             Grade this answer thoroughly.\n\n\
             QUESTION: {}\n\n\
             CANDIDATE ANSWER: {}\n\n\
             TARGET SKILL: {}\n\
             DIFFICULTY LEVEL: {}/3\n\n\
             GRADING RUBRIC:\n{rubric_json}",
            request.question, request.answer, request.skill, request.difficulty,
        );
        if let Some(expected) = &request.expected_answer {
            prompt.push_str(&format!("\n\nEXPECTED APPROACH: {expected}"));
        }
        if let Some(rule) = rule {
            let analysis = serde_json::to_string_pretty(rule).unwrap_or_default();
            prompt.push_str(&format!("\n\nRULE-BASED ANALYSIS: {analysis}"));
        }
        prompt.push_str("\n\n");
        prompt.push_str(GRADING_INSTRUCTIONS);
        prompt
    }

    /// Grade with the model and surface any failure.
    ///
    /// `selection` overrides the active provider for this call only.
    pub async fn evaluate(
        &self,
        request: &GradingRequest,
        rule: Option<&RuleResult>,
        selection: Option<&ProviderSelection>,
    ) -> Result<LlmGradingResult, LlmError> {
        let call = GenerateRequest::grading(self.build_prompt(request, rule));
        let raw = match selection {
            Some(selection) => self.providers.generate_with(selection, &call).await?,
            None => self.providers.generate(&call).await?,
        };
        let verdict = parse_grade_response(&raw)?;
        debug!(
            skill = %request.skill,
            total = verdict.total_score,
            confidence = verdict.confidence,
            "LLM grade parsed"
        );
        Ok(LlmGradingResult {
            scores_by_dimension: verdict.scores_by_dimension,
            total_score: verdict.total_score,
            confidence: verdict.confidence,
            error_tags: verdict.error_tags,
            feedback_short: verdict.feedback_short,
            source: LlmGradeSource::Model,
        })
    }

    /// Grade with `selection`, or the active provider when `None`. Never
    /// fails: errors produce the heuristic fallback result.
    pub async fn grade(
        &self,
        request: &GradingRequest,
        rule: Option<&RuleResult>,
        selection: Option<&ProviderSelection>,
    ) -> LlmGradingResult {
        match self.evaluate(request, rule, selection).await {
            Ok(result) => result,
            Err(e) => {
                warn!(skill = %request.skill, error = %e, "LLM grading failed, using fallback");
                fallback_grade(&request.answer, &e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_for_short_answer() {
        let r = fallback_grade("dunno", "timeout");
        assert_eq!(r.total_score, 40.0);
        assert_eq!(r.confidence, 0.3);
        assert_eq!(r.scores_by_dimension["completeness"], 35.0);
        assert_eq!(r.scores_by_dimension["clarity"], 45.0);
        assert_eq!(r.error_tags, vec![TAG_LLM_GRADING_FAILED]);
        assert!(r.is_fallback());
        assert_eq!(r.feedback_short, "Fallback grading used due to error: timeout");
    }

    #[test]
    fn fallback_rewards_formula_and_detail() {
        let long = format!("=SUM(A1:A10) {}", "word ".repeat(60));
        assert_eq!(fallback_grade(&long, "x").total_score, 80.0);
        assert_eq!(fallback_grade("I would type =A1+B1 in C1", "x").total_score, 70.0);
    }

    #[test]
    fn fallback_truncates_error_text() {
        let r = fallback_grade("answer", &"e".repeat(500));
        let prefix = "Fallback grading used due to error: ";
        assert_eq!(r.feedback_short.len(), prefix.len() + 100);
    }

    #[test]
    fn builtin_rubrics() {
        assert!(builtin_rubric("vlookup").contains_key("best_practices"));
        assert!(builtin_rubric("pivot_tables").contains_key("clarity"));
        let general = builtin_rubric("goal_seek");
        assert_eq!(general.len(), 3);
        assert_eq!(general["completeness"], "Addresses all parts of question");
    }
}

//! Hybrid grader: rules, then LLM, then optional escalation.

use std::sync::Arc;

use assessment::grading::{
    escalated_result, escalation_failed_result, HybridGradingResult, HybridPolicy,
    RuleBasedGrader,
};
use tracing::{info, warn};

use super::llm::LlmGrader;
use super::GradingRequest;

/// Runs the grading pipeline for one answer.
pub struct HybridGrader {
    rules: RuleBasedGrader,
    llm: Arc<LlmGrader>,
    policy: HybridPolicy,
}

impl HybridGrader {
    pub fn new(llm: Arc<LlmGrader>, policy: HybridPolicy) -> Self {
        Self {
            rules: RuleBasedGrader::new(),
            llm,
            policy,
        }
    }

    pub fn policy(&self) -> &HybridPolicy {
        &self.policy
    }

    /// Grade an answer. Never fails; degraded paths are tagged in the result.
    pub async fn grade(&self, request: &GradingRequest) -> HybridGradingResult {
        let skill = request.skill.as_str();

        let rule = self
            .policy
            .should_run_rules(skill, &request.answer)
            .then(|| {
                self.rules
                    .grade(&request.question, &request.answer, skill, request.difficulty)
            });

        let providers = self.llm.providers();
        let first_pass = providers.active_selection();
        let llm = if self
            .policy
            .needs_llm(rule.as_ref(), skill, request.difficulty, &request.answer)
        {
            Some(
                self.llm
                    .grade(request, rule.as_ref(), Some(&first_pass))
                    .await,
            )
        } else {
            None
        };

        let combined = self.policy.combine(rule.as_ref(), llm.as_ref(), skill);
        if !self.policy.needs_escalation(&combined) {
            info!(
                skill,
                method = %combined.grading_method,
                score = combined.hybrid_score,
                "answer graded"
            );
            return combined;
        }

        let escalation = providers.escalation_selection().clone();
        if llm.is_some() && first_pass == escalation {
            warn!(
                skill,
                provider = %escalation,
                "escalation needed but first pass already used the escalation model"
            );
            return escalation_failed_result(&combined, rule.as_ref());
        }

        info!(
            skill,
            method = %combined.grading_method,
            confidence = combined.confidence,
            provider = %escalation,
            "escalating grade"
        );
        match self
            .llm
            .evaluate(request, rule.as_ref(), Some(&escalation))
            .await
        {
            Ok(escalated) => escalated_result(rule.as_ref(), &escalated),
            Err(e) => {
                warn!(skill, provider = %escalation, error = %e, "escalated grading failed");
                escalation_failed_result(&combined, rule.as_ref())
            }
        }
    }
}

//! Hybrid grading against scripted providers: combination, disagreement and
//! escalation, including that escalation never moves the active provider.

mod common;

use std::sync::Arc;

use assessment::grading::{
    GradingMethod, HybridPolicy, TAG_ESCALATION_FAILED, TAG_LLM_GRADING_FAILED,
    TAG_SCORING_DISAGREEMENT,
};
use common::{grade_json, manager, Script};
use interview_agents::{GradingRequest, HybridGrader, LlmGrader, ProviderKind};

fn grader(script: &Arc<Script>) -> (HybridGrader, Arc<interview_agents::ProviderManager>) {
    let providers = manager(script);
    let llm = Arc::new(LlmGrader::new(providers.clone()));
    (HybridGrader::new(llm, HybridPolicy::default()), providers)
}

fn request(skill: &str, difficulty: u8, question: &str, answer: &str) -> GradingRequest {
    GradingRequest {
        question: question.to_string(),
        answer: answer.to_string(),
        skill: skill.to_string(),
        difficulty,
        expected_answer: None,
    }
}

#[tokio::test]
async fn agreeing_graders_are_weighted_toward_rules() {
    let script = Script::new();
    script.reply(ProviderKind::Gemini, &grade_json(85.0, 0.9));
    let (grader, _) = grader(&script);

    // rule score 0.8: call, three arguments, range, numeric column, no flag
    let result = grader
        .grade(&request(
            "vlookup",
            3,
            "Look up the product name for an ID on another sheet.",
            "=VLOOKUP(A2,Sheet2!A:B,2)",
        ))
        .await;

    assert_eq!(result.grading_method, GradingMethod::Hybrid);
    assert!((result.hybrid_score - 81.5).abs() < 1e-6, "{}", result.hybrid_score);
    assert!((result.confidence - 0.85).abs() < 1e-9);
    assert!(result.feedback.starts_with("Rule-based: "));
    assert_eq!(script.calls_to(ProviderKind::Claude), 0);
}

#[tokio::test]
async fn rule_only_for_short_reference_answer() {
    let script = Script::new();
    let (grader, _) = grader(&script);

    let result = grader
        .grade(&request("references", 1, "What is an absolute reference?", "=$A$1"))
        .await;

    assert_eq!(result.grading_method, GradingMethod::RuleOnly);
    assert_eq!(result.hybrid_score, 50.0);
    assert_eq!(result.llm_score, None);
    assert!(script.calls().is_empty());
}

#[tokio::test]
async fn disagreement_keeps_llm_score_when_escalation_fails() {
    let script = Script::new();
    script.reply(ProviderKind::Gemini, &grade_json(90.0, 0.8));
    script.fail(ProviderKind::Claude, "401 Unauthorized");
    let (grader, providers) = grader(&script);

    // rule score 0.3: alternative lookup mentioned, no VLOOKUP call
    let result = grader
        .grade(&request(
            "vlookup",
            3,
            "How would you find a product name by ID?",
            "I would combine INDEX with MATCH for this lookup",
        ))
        .await;

    assert_eq!(result.grading_method, GradingMethod::EscalationFailed);
    assert_eq!(result.hybrid_score, 90.0);
    assert!(result.has_tag(TAG_SCORING_DISAGREEMENT));
    assert!(result.has_tag(TAG_ESCALATION_FAILED));
    assert!(result.feedback.starts_with("Escalation failed."));

    assert_eq!(script.calls_to(ProviderKind::Claude), 1);
    assert_eq!(providers.provider_info().provider, ProviderKind::Gemini);
    assert_eq!(providers.active_selection().kind, ProviderKind::Gemini);
}

#[tokio::test]
async fn failed_llm_grade_escalates_to_stronger_model() {
    let script = Script::new();
    script.reply(ProviderKind::Gemini, "I think this answer is fine.");
    script.reply(ProviderKind::Claude, &grade_json(88.0, 0.85));
    let (grader, providers) = grader(&script);

    let result = grader
        .grade(&request(
            "pivot_tables",
            2,
            "Describe the steps to create a basic pivot table.",
            "Select the data, insert a pivot table, drag Region to rows and Sales to values",
        ))
        .await;

    assert_eq!(result.grading_method, GradingMethod::Escalated);
    assert_eq!(result.hybrid_score, 88.0);
    assert!((result.confidence - 0.9).abs() < 1e-9);
    assert!(!result.has_tag(TAG_LLM_GRADING_FAILED));

    let calls = script.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].selection.kind, ProviderKind::Claude);
    assert_eq!(calls[1].request.temperature, 0.1);
    assert!(calls[1].request.structured_output);
    assert!(calls[1].request.prompt.contains("GRADING RUBRIC"));
    assert_eq!(providers.provider_info().provider, ProviderKind::Gemini);
}

#[tokio::test]
async fn no_regrade_when_already_on_escalation_model() {
    let script = Script::new();
    let (grader, providers) = grader(&script);
    providers
        .switch_provider(ProviderKind::Claude, None)
        .unwrap();
    script.reply(ProviderKind::Claude, "not json");

    let result = grader
        .grade(&request(
            "pivot_tables",
            2,
            "Describe the steps to create a basic pivot table.",
            "Insert a pivot table",
        ))
        .await;

    assert_eq!(result.grading_method, GradingMethod::EscalationFailed);
    assert!(result.has_tag(TAG_ESCALATION_FAILED));
    assert_eq!(script.calls_to(ProviderKind::Claude), 1);
}

#[tokio::test]
async fn grading_prompt_carries_rule_analysis_and_rubric() {
    let script = Script::new();
    script.reply(ProviderKind::Gemini, &grade_json(85.0, 0.9));
    let (grader, _) = grader(&script);

    grader
        .grade(&GradingRequest {
            expected_answer: Some("=VLOOKUP(A2,Sheet2!A:B,2,FALSE)".into()),
            ..request(
                "vlookup",
                3,
                "Look up the product name for an ID on another sheet.",
                "=VLOOKUP(A2,Sheet2!A:B,2)",
            )
        })
        .await;

    let prompt = &script.calls()[0].request.prompt;
    assert!(prompt.contains("TARGET SKILL: vlookup"));
    assert!(prompt.contains("DIFFICULTY LEVEL: 3/3"));
    assert!(prompt.contains("Correct VLOOKUP syntax and parameters"));
    assert!(prompt.contains("EXPECTED APPROACH: =VLOOKUP(A2,Sheet2!A:B,2,FALSE)"));
    assert!(prompt.contains("RULE-BASED ANALYSIS"));
}

#[tokio::test]
async fn switch_during_first_pass_does_not_block_escalation() {
    let script = Script::new();
    script.reply(ProviderKind::Gemini, "not json");
    script.reply(ProviderKind::Claude, &grade_json(77.0, 0.8));
    let (grader, providers) = grader(&script);
    script.switch_during_next_call(ProviderKind::Claude);

    let result = grader
        .grade(&request(
            "pivot_tables",
            2,
            "Describe the steps to create a basic pivot table.",
            "Select the data, insert a pivot table, drag Region to rows and Sales to values",
        ))
        .await;

    // the first pass ran on Gemini, so the Claude regrade still happens
    assert_eq!(result.grading_method, GradingMethod::Escalated);
    assert_eq!(result.hybrid_score, 77.0);
    let calls = script.calls();
    assert_eq!(calls[0].selection.kind, ProviderKind::Gemini);
    assert_eq!(calls[1].selection.kind, ProviderKind::Claude);
    assert_eq!(providers.active_selection().kind, ProviderKind::Claude);
}

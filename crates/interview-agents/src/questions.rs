//! Question generation for each interview phase.
//!
//! Skill questions come from store templates, then the built-in table, then
//! a generic prompt. Calibration asks the model for a question and falls
//! back to a fixed one. Every question that targets a skill records its tier
//! in the coverage vector before it is returned.

use std::sync::Arc;

use assessment::coverage::{CoverageVector, SkillCatalog};
use assessment::interview::planner::{
    CALIBRATION_DIFFICULTY, CALIBRATION_SKILL, CASE_DIFFICULTY, CASE_SKILL,
};
use assessment::interview::{InterviewState, QuestionPlan, COMPLETED_REASON};
use assessment::store::InterviewStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::contracts::{parse_calibration_response, schema_json, CalibrationResponse};
use crate::providers::{GenerateRequest, ProviderManager};

pub const INTRO_SKILL: &str = "introduction";
pub const REVIEW_SKILL: &str = "review";
pub const CLOSING_SKILL: &str = "conclusion";

const INTRO_QUESTION: &str = "Hello! I'm your Excel interviewer today. I'll be conducting a comprehensive assessment of your Excel skills across various areas including formulas, data analysis, and chart creation.\n\nThe interview will take approximately 30-45 minutes and will progressively increase in difficulty based on your responses. Please answer as thoroughly as possible and feel free to explain your reasoning.\n\nLet's start with a brief introduction: Could you tell me about your experience with Excel and what you consider your strongest Excel skills?";

const CALIBRATION_FALLBACK: &str =
    "How would you create a formula to sum all values in column A from row 1 to row 100?";

const CASE_QUESTION: &str = "Now I'd like you to work through a practical scenario. Imagine you have a dataset with the following columns in Excel:

A: Employee Name
B: Department
C: Hire Date
D: Salary
E: Performance Rating (1-5)

The data spans rows 2-101 (100 employees, with headers in row 1).

Please provide Excel formulas or approaches for the following:
1. Calculate the average salary by department
2. Count how many employees have a performance rating of 4 or 5
3. Find the employee with the highest salary in the Sales department
4. Calculate the percentage of employees hired in the last 2 years

Explain your formulas and reasoning for each solution.";

const REVIEW_QUESTION: &str = "Thank you for working through that case study. Before we conclude, do you have any questions about Excel functionality, or would you like to clarify any of your previous answers?";

const CLOSING_TEXT: &str = "That concludes our Excel interview. Thank you for your time and responses. I'll now prepare your detailed feedback report.";

/// (skill, difficulty, question)
const BUILTIN_TEMPLATES: &[(&str, u8, &str)] = &[
    (
        "vlookup",
        2,
        "You have a table with Product IDs in column A and Product Names in column B. How would you use VLOOKUP to find the product name for a specific ID in another worksheet?",
    ),
    (
        "vlookup",
        3,
        "Explain how to use VLOOKUP with approximate match and why you might choose this over exact match. Provide an example formula.",
    ),
    (
        "if_functions",
        2,
        "How would you create a formula that displays 'Pass' if a score in cell B2 is 70 or above, and 'Fail' if below 70?",
    ),
    (
        "if_functions",
        3,
        "Create a nested IF formula that assigns grades: A (90+), B (80-89), C (70-79), D (60-69), F (<60) based on a score in cell B2.",
    ),
    (
        "pivot_tables",
        2,
        "Describe the steps to create a basic pivot table from a dataset with Sales Rep, Region, and Sales Amount columns.",
    ),
    (
        "pivot_tables",
        3,
        "How would you modify a pivot table to show both count and percentage of total sales by region, and add a filter for specific time periods?",
    ),
];

/// Where a question's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// Generated by the model.
    Model,
    /// Store template or built-in text.
    Template,
    /// The "explain how you would approach ..." prompt.
    Generic,
    /// The model failed and a fixed question was used instead.
    Fallback,
}

/// A question ready to be issued as a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub phase: InterviewState,
    pub question: String,
    pub target_skill: String,
    pub difficulty: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
    pub source: QuestionSource,
}

impl GeneratedQuestion {
    fn fixed(
        phase: InterviewState,
        question: impl Into<String>,
        skill: &str,
        difficulty: u8,
    ) -> Self {
        Self {
            phase,
            question: question.into(),
            target_skill: skill.to_string(),
            difficulty,
            expected_answer: None,
            source: QuestionSource::Template,
        }
    }
}

/// The built-in question for a skill tier, if there is one.
pub fn builtin_template(skill: &str, difficulty: u8) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(s, d, _)| *s == skill && *d == difficulty)
        .map(|(_, _, q)| *q)
}

/// "explain how you would approach ..." for skills without a template.
pub fn generic_question(skill: &str) -> String {
    format!(
        "Please explain how you would approach {} in Excel.",
        skill.replace('_', " ")
    )
}

/// Closing text for an interview that reached SUMMARY.
pub fn closing_text(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if reason != COMPLETED_REASON => format!(
            "Interview completed: {reason}. Generating your detailed feedback report now."
        ),
        _ => CLOSING_TEXT.to_string(),
    }
}

/// Turns question plans into question text.
pub struct QuestionGenerator {
    providers: Arc<ProviderManager>,
    store: Arc<dyn InterviewStore>,
    catalog: SkillCatalog,
}

impl QuestionGenerator {
    pub fn new(
        providers: Arc<ProviderManager>,
        store: Arc<dyn InterviewStore>,
        catalog: SkillCatalog,
    ) -> Self {
        Self {
            providers,
            store,
            catalog,
        }
    }

    pub fn intro() -> GeneratedQuestion {
        GeneratedQuestion::fixed(InterviewState::Intro, INTRO_QUESTION, INTRO_SKILL, 1)
    }

    /// Produce the question for `plan`, recording skill exposure in `coverage`.
    pub async fn generate(
        &self,
        plan: &QuestionPlan,
        coverage: &mut CoverageVector,
    ) -> GeneratedQuestion {
        let question = match plan {
            QuestionPlan::Intro => Self::intro(),
            QuestionPlan::Calibration => self.calibration().await,
            QuestionPlan::Skill {
                phase,
                skill,
                difficulty,
            } => self.skill_question(*phase, skill, *difficulty),
            QuestionPlan::Case => GeneratedQuestion::fixed(
                InterviewState::Case,
                CASE_QUESTION,
                CASE_SKILL,
                CASE_DIFFICULTY,
            ),
            QuestionPlan::Review => {
                GeneratedQuestion::fixed(InterviewState::Review, REVIEW_QUESTION, REVIEW_SKILL, 1)
            }
            QuestionPlan::Closing { reason } => GeneratedQuestion::fixed(
                InterviewState::Summary,
                closing_text(reason.as_deref()),
                CLOSING_SKILL,
                1,
            ),
        };

        if question.phase.is_graded() {
            coverage.record(&question.target_skill, question.difficulty);
        }
        debug!(
            phase = %question.phase,
            skill = %question.target_skill,
            difficulty = question.difficulty,
            source = ?question.source,
            "question generated"
        );
        question
    }

    /// Template lookup: store, then built-in table, then the generic prompt.
    pub fn skill_question(
        &self,
        phase: InterviewState,
        skill: &str,
        difficulty: u8,
    ) -> GeneratedQuestion {
        let category = self.catalog.category_of(skill);
        let stored = self
            .store
            .find_question(skill, difficulty, category)
            .unwrap_or_else(|e| {
                warn!(skill, difficulty, error = %e, "template lookup failed");
                None
            });

        let (question, expected_answer, source) = match stored {
            Some(template) => (
                template.question_text,
                template.expected_answer,
                QuestionSource::Template,
            ),
            None => match builtin_template(skill, difficulty) {
                Some(text) => (text.to_string(), None, QuestionSource::Template),
                None => (generic_question(skill), None, QuestionSource::Generic),
            },
        };

        GeneratedQuestion {
            phase,
            question,
            target_skill: skill.to_string(),
            difficulty,
            expected_answer,
            source,
        }
    }

    /// Ask the model for a basic calibration question.
    async fn calibration(&self) -> GeneratedQuestion {
        let prompt = format!(
            "Generate a calibration question for an Excel interview. It should be a basic \
             question about Excel formulas or functions that gauges the candidate's \
             fundamental skill level.\n\n\
             Examples of good calibration questions:\n\
             - How would you create a formula to sum values in cells A1 through A10?\n\
             - What's the difference between relative and absolute cell references?\n\
             - How would you use the VLOOKUP function to find data?\n\n\
             Respond with a JSON object matching this schema:\n{}",
            schema_json::<CalibrationResponse>()
        );

        let parsed = match self.providers.generate(&GenerateRequest::question(prompt)).await {
            Ok(raw) => parse_calibration_response(&raw).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(response) => {
                let skill = if self.catalog.contains(&response.target_skill)
                    || response.target_skill == CALIBRATION_SKILL
                {
                    response.target_skill
                } else {
                    debug!(
                        proposed = %response.target_skill,
                        "calibration skill outside catalog, recording as {CALIBRATION_SKILL}"
                    );
                    CALIBRATION_SKILL.to_string()
                };
                GeneratedQuestion {
                    phase: InterviewState::Calibrate,
                    question: response.question,
                    target_skill: skill,
                    difficulty: CALIBRATION_DIFFICULTY,
                    expected_answer: response.expected_approach,
                    source: QuestionSource::Model,
                }
            }
            Err(error) => {
                warn!(%error, "calibration question generation failed, using fallback");
                GeneratedQuestion {
                    phase: InterviewState::Calibrate,
                    question: CALIBRATION_FALLBACK.to_string(),
                    target_skill: CALIBRATION_SKILL.to_string(),
                    difficulty: CALIBRATION_DIFFICULTY,
                    expected_answer: Some("=SUM(A1:A100)".to_string()),
                    source: QuestionSource::Fallback,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_by_tier() {
        assert!(builtin_template("vlookup", 2).unwrap().contains("Product IDs"));
        assert!(builtin_template("if_functions", 3).unwrap().contains("nested IF"));
        assert!(builtin_template("vlookup", 1).is_none());
        assert!(builtin_template("goal_seek", 3).is_none());
    }

    #[test]
    fn generic_question_spells_out_skill() {
        assert_eq!(
            generic_question("conditional_formatting"),
            "Please explain how you would approach conditional formatting in Excel."
        );
    }

    #[test]
    fn closing_text_by_reason() {
        assert_eq!(closing_text(None), CLOSING_TEXT);
        assert_eq!(closing_text(Some(COMPLETED_REASON)), CLOSING_TEXT);
        assert_eq!(
            closing_text(Some("Maximum turns reached")),
            "Interview completed: Maximum turns reached. Generating your detailed feedback report now."
        );
    }

    #[test]
    fn intro_is_fixed() {
        let intro = QuestionGenerator::intro();
        assert_eq!(intro.phase, InterviewState::Intro);
        assert_eq!(intro.target_skill, INTRO_SKILL);
        assert!(intro.question.starts_with("Hello! I'm your Excel interviewer today."));
    }
}

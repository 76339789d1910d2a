//! Narrative feedback for a finished interview.

use std::sync::Arc;

use assessment::report::InterviewReport;
use tracing::{debug, warn};

use crate::providers::{GenerateRequest, ProviderManager};

/// Writes the detailed analysis section of a report.
pub struct ReportAnalyst {
    providers: Arc<ProviderManager>,
}

impl ReportAnalyst {
    pub fn new(providers: Arc<ProviderManager>) -> Self {
        Self { providers }
    }

    pub fn build_prompt(report: &InterviewReport) -> String {
        let bullets = |items: &[String]| {
            items
                .iter()
                .map(|i| format!("- {i}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let categories =
            serde_json::to_string_pretty(&report.scores_by_category).unwrap_or_default();
        let excerpts =
            serde_json::to_string_pretty(&report.transcript_excerpts).unwrap_or_default();

        format!(
            "Generate a detailed narrative analysis of this Excel interview performance:\n\n\
             CANDIDATE: {}\n\
             TOTAL SCORE: {:.1}/100\n\
             PERFORMANCE LEVEL: {:?}\n\n\
             CATEGORY SCORES:\n{categories}\n\n\
             STRENGTHS:\n{}\n\n\
             GAPS:\n{}\n\n\
             SAMPLE RESPONSES:\n{excerpts}\n\n\
             Write a 300-400 word analysis covering overall performance, technical skill, \
             reasoning and problem-solving approach, readiness for Excel-dependent roles, \
             and specific next steps. Use a professional but encouraging tone suitable for \
             candidate feedback.",
            report.candidate_name.as_deref().unwrap_or("Anonymous"),
            report.total_score,
            report.performance_level,
            bullets(&report.strengths),
            bullets(&report.gaps),
        )
    }

    /// Model-written analysis, or the report's plain summary when the model
    /// fails or returns nothing.
    pub async fn analyse(&self, report: &InterviewReport) -> String {
        let request = GenerateRequest::summary(Self::build_prompt(report));
        match self.providers.generate(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(interview_id = report.interview_id, "detailed analysis generated");
                text.trim().to_string()
            }
            Ok(_) => {
                warn!(interview_id = report.interview_id, "empty analysis, using plain summary");
                report.plain_analysis()
            }
            Err(e) => {
                warn!(
                    interview_id = report.interview_id,
                    error = %e,
                    "analysis generation failed, using plain summary"
                );
                report.plain_analysis()
            }
        }
    }
}

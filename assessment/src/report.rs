//! End-of-interview report: per-skill and per-category scores, a weighted
//! total, strengths, gaps, recommendations and a few transcript excerpts.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coverage::{SkillCatalog, SkillCategory};
use crate::session::{InterviewId, InterviewSession, Turn};

const MAX_STRENGTHS: usize = 5;
const MAX_GAPS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 6;
const MAX_EXCERPTS: usize = 4;
const EXCERPT_FUNCTIONS: &[&str] = &["SUM", "VLOOKUP", "IF", "INDEX"];

/// Skills whose absence or weakness is always called out.
const CRITICAL_SKILLS: &[&str] = &["vlookup", "if_functions", "pivot_tables"];

/// Coarse proficiency band for a total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceLevel {
    Expert,
    Advanced,
    Intermediate,
    Basic,
    Novice,
}

impl PerformanceLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => Self::Expert,
            s if s >= 80.0 => Self::Advanced,
            s if s >= 70.0 => Self::Intermediate,
            s if s >= 60.0 => Self::Basic,
            _ => Self::Novice,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Expert => "Exceptional Excel proficiency",
            Self::Advanced => "Strong Excel skills with minor gaps",
            Self::Intermediate => "Good foundation with areas to improve",
            Self::Basic => "Fundamental skills present, needs development",
            Self::Novice => "Requires significant Excel training",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptExcerpt {
    pub question: String,
    pub answer: String,
    pub skill: String,
    pub score: Option<f64>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub duration_minutes: i64,
    pub total_turns: usize,
    /// Share of catalog skills with at least one graded answer, in percent.
    pub coverage_completeness: f64,
    /// Mean grading confidence, in percent.
    pub grading_confidence: f64,
    /// Recency-weighted grading confidence in `[0, 1]`.
    pub overall_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewReport {
    pub interview_id: InterviewId,
    pub candidate_name: Option<String>,
    pub total_score: f64,
    pub performance_level: PerformanceLevel,
    pub scores_by_skill: BTreeMap<String, f64>,
    pub scores_by_category: BTreeMap<SkillCategory, f64>,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
    pub transcript_excerpts: Vec<TranscriptExcerpt>,
    pub metadata: ReportMetadata,
    /// Narrative feedback written by a model, or the plain summary when the
    /// model was unavailable. Unset until the report is finalised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<String>,
}

/// Build the report for an interview from its graded turns.
pub fn build_report(
    session: &InterviewSession,
    turns: &[Turn],
    catalog: &SkillCatalog,
    now: DateTime<Utc>,
) -> InterviewReport {
    let scores_by_skill = skill_scores(turns);
    let scores_by_category = category_scores(&scores_by_skill, catalog);
    let total_score = weighted_total(&scores_by_category);
    let confidences: Vec<f64> = turns
        .iter()
        .filter_map(|t| t.grade.as_ref().map(|g| g.confidence))
        .collect();

    InterviewReport {
        interview_id: session.id,
        candidate_name: session.candidate_name.clone(),
        total_score: round1(total_score),
        performance_level: PerformanceLevel::from_score(total_score),
        strengths: strengths(&scores_by_skill, &scores_by_category),
        gaps: gaps(&scores_by_skill, &scores_by_category),
        recommendations: recommendations(total_score, &scores_by_category, &confidences),
        transcript_excerpts: excerpts(turns),
        metadata: ReportMetadata {
            duration_minutes: session.duration_minutes(now) as i64,
            total_turns: turns.len(),
            coverage_completeness: coverage_completeness(&scores_by_skill, catalog),
            grading_confidence: match mean(&confidences) {
                Some(m) => round1(m * 100.0),
                None => 50.0,
            },
            overall_confidence: overall_confidence(&confidences),
        },
        detailed_analysis: None,
        scores_by_skill,
        scores_by_category,
    }
}

/// Best hybrid score per skill.
fn skill_scores(turns: &[Turn]) -> BTreeMap<String, f64> {
    let mut scores: BTreeMap<String, f64> = BTreeMap::new();
    for turn in turns {
        let Some(grade) = &turn.grade else { continue };
        scores
            .entry(turn.target_skill.clone())
            .and_modify(|best| *best = best.max(grade.hybrid_score))
            .or_insert(grade.hybrid_score);
    }
    scores
}

/// Mean of the graded skills in each category (0 when none were graded).
fn category_scores(
    scores_by_skill: &BTreeMap<String, f64>,
    catalog: &SkillCatalog,
) -> BTreeMap<SkillCategory, f64> {
    SkillCategory::all()
        .iter()
        .map(|category| {
            let graded: Vec<f64> = catalog
                .skills(*category)
                .iter()
                .filter_map(|s| scores_by_skill.get(s).copied())
                .collect();
            (*category, mean(&graded).unwrap_or(0.0))
        })
        .collect()
}

fn weighted_total(scores_by_category: &BTreeMap<SkillCategory, f64>) -> f64 {
    let (sum, weight) = scores_by_category
        .iter()
        .fold((0.0, 0.0), |(sum, weight), (category, score)| {
            let w = category.report_weight();
            (sum + score * w, weight + w)
        });
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

fn strengths(
    scores_by_skill: &BTreeMap<String, f64>,
    scores_by_category: &BTreeMap<SkillCategory, f64>,
) -> Vec<String> {
    let mut out = Vec::new();
    for (category, score) in scores_by_category {
        if *score >= 80.0 {
            out.push(format!(
                "Strong {} (Score: {score:.0})",
                category.description().to_lowercase()
            ));
        }
    }
    for (skill, score) in scores_by_skill {
        if *score >= 85.0 {
            out.push(format!(
                "Excellent {} knowledge (Score: {score:.0})",
                display_name(skill)
            ));
        }
    }
    if scores_by_category
        .get(&SkillCategory::Functions)
        .is_some_and(|s| *s >= 75.0)
    {
        out.push("Demonstrates solid understanding of Excel formulas".to_string());
    }
    if scores_by_skill.values().filter(|s| **s >= 70.0).count() >= 5 {
        out.push("Consistent performance across multiple skill areas".to_string());
    }
    out.truncate(MAX_STRENGTHS);
    out
}

fn gaps(
    scores_by_skill: &BTreeMap<String, f64>,
    scores_by_category: &BTreeMap<SkillCategory, f64>,
) -> Vec<String> {
    let mut out = Vec::new();
    for (category, score) in scores_by_category {
        if *score < 60.0 {
            out.push(format!(
                "Needs development in {} (Score: {score:.0})",
                category.description().to_lowercase()
            ));
        }
    }
    for skill in CRITICAL_SKILLS {
        let score = scores_by_skill.get(*skill).copied().unwrap_or(0.0);
        if score < 65.0 {
            if score == 0.0 {
                out.push(format!("No demonstration of {} skills", display_name(skill)));
            } else {
                out.push(format!(
                    "Weak {} understanding (Score: {score:.0})",
                    display_name(skill)
                ));
            }
        }
    }
    if scores_by_category
        .get(&SkillCategory::Analysis)
        .map_or(true, |s| *s < 50.0)
    {
        out.push("Limited analytical and problem-solving capabilities".to_string());
    }
    out.truncate(MAX_GAPS);
    out
}

fn recommendations(
    total_score: f64,
    scores_by_category: &BTreeMap<SkillCategory, f64>,
    confidences: &[f64],
) -> Vec<String> {
    let category = |c: SkillCategory| scores_by_category.get(&c).copied().unwrap_or(0.0);
    let mut out: Vec<&str> = Vec::new();

    if total_score < 60.0 {
        out.push(
            "Focus on Excel fundamentals: basic formulas, cell references, and simple functions",
        );
        out.push("Complete a comprehensive Excel basics course");
    } else if total_score < 80.0 {
        out.push("Strengthen intermediate Excel skills through practice with real datasets");
        out.push("Focus on areas with lowest scores for targeted improvement");
    }
    if category(SkillCategory::Functions) < 70.0 {
        out.push("Practice VLOOKUP, INDEX/MATCH, and nested IF statements");
        out.push("Learn COUNTIF, SUMIF, and other conditional functions");
    }
    if category(SkillCategory::DataOps) < 70.0 {
        out.push("Master pivot tables for data analysis and reporting");
        out.push("Practice data validation and conditional formatting");
    }
    if category(SkillCategory::Analysis) < 70.0 {
        out.push("Develop analytical thinking with what-if analysis and goal seek");
    }
    if mean(confidences).is_some_and(|m| m < 0.7) {
        out.push("Build confidence through regular practice with varied Excel scenarios");
    }
    out.push("Create a personal Excel reference sheet with commonly used formulas");
    out.push("Practice with real-world datasets relevant to your work domain");

    out.into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(str::to_string)
        .collect()
}

fn excerpts(turns: &[Turn]) -> Vec<TranscriptExcerpt> {
    let mut out = Vec::new();
    for turn in turns {
        if out.len() >= MAX_EXCERPTS {
            break;
        }
        let Some(answer) = &turn.answer else { continue };
        let score = turn.grade.as_ref().map(|g| g.hybrid_score);

        let mut reasons = Vec::new();
        if score.is_some_and(|s| s >= 85.0) {
            reasons.push("Excellent response");
        }
        if matches!(&turn.grade, Some(g) if !g.error_tags.is_empty()) {
            reasons.push("Learning opportunity");
        }
        if answer.split_whitespace().count() > 50 {
            reasons.push("Detailed explanation");
        }
        if demonstrates_formula(answer) {
            reasons.push("Technical demonstration");
        }
        if reasons.is_empty() {
            continue;
        }

        out.push(TranscriptExcerpt {
            question: ellipsize(&turn.question, 100),
            answer: ellipsize(answer, 200),
            skill: display_name(&turn.target_skill),
            score,
            reason: reasons.join(", "),
        });
    }
    out
}

fn demonstrates_formula(answer: &str) -> bool {
    let upper = answer.to_uppercase();
    answer.contains('=') || EXCERPT_FUNCTIONS.iter().any(|f| upper.contains(f))
}

fn coverage_completeness(scores_by_skill: &BTreeMap<String, f64>, catalog: &SkillCatalog) -> f64 {
    if catalog.is_empty() {
        return 0.0;
    }
    let covered = scores_by_skill
        .keys()
        .filter(|s| catalog.contains(s))
        .count();
    round1(covered as f64 / catalog.len() as f64 * 100.0)
}

/// Confidence averaged with later turns weighted up to twice the first.
pub fn overall_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.5;
    }
    let (sum, weight) = confidences
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum, weight), (i, c)| {
            let w = (0.5 + i as f64 * 0.1).min(1.0);
            (sum + c * w, weight + w)
        });
    sum / weight
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `if_functions` → `If Functions`.
pub fn display_name(skill: &str) -> String {
    skill
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

impl InterviewReport {
    /// Plain-text rendering for the console.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let name = self.candidate_name.as_deref().unwrap_or("Anonymous");
        let _ = writeln!(out, "Interview report for {name}");
        let _ = writeln!(
            out,
            "Total score: {:.1}/100 ({:?}: {})",
            self.total_score,
            self.performance_level,
            self.performance_level.description()
        );
        let _ = writeln!(out, "\nCategory scores:");
        for (category, score) in &self.scores_by_category {
            let _ = writeln!(out, "  {category:<12} {score:>5.1}");
        }
        if !self.scores_by_skill.is_empty() {
            let _ = writeln!(out, "\nSkill scores:");
            for (skill, score) in &self.scores_by_skill {
                let _ = writeln!(out, "  {:<24} {score:>5.1}", display_name(skill));
            }
        }
        for (title, items) in [
            ("Strengths", &self.strengths),
            ("Gaps", &self.gaps),
            ("Recommendations", &self.recommendations),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{title}:");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
        if let Some(analysis) = &self.detailed_analysis {
            let _ = writeln!(out, "\nAnalysis:\n{}", analysis.trim());
        }
        let m = &self.metadata;
        let _ = writeln!(
            out,
            "\n{} turns over {} min, coverage {:.1}%, grading confidence {:.1}%",
            m.total_turns, m.duration_minutes, m.coverage_completeness, m.grading_confidence
        );
        out
    }

    /// Deterministic narrative built from the report's own fields.
    pub fn plain_analysis(&self) -> String {
        let name = self.candidate_name.as_deref().unwrap_or("The candidate");
        let mut out = format!(
            "{name} scored {:.1}/100 ({:?}): {}.",
            self.total_score,
            self.performance_level,
            self.performance_level.description()
        );
        if let Some(strength) = self.strengths.first() {
            let _ = write!(out, " Main strength: {strength}.");
        }
        if let Some(gap) = self.gaps.first() {
            let _ = write!(out, " Main gap: {gap}.");
        }
        if let Some(next) = self.recommendations.first() {
            let _ = write!(out, " Suggested next step: {next}.");
        }
        out
    }
}

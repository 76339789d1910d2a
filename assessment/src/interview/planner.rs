//! Coverage-driven question planning.
//!
//! After the state machine picks the next phase, the planner decides what
//! kind of question to ask and, for skill phases, which skill at which
//! difficulty. Randomness only breaks ties; pass a seeded RNG for
//! reproducible interviews.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::machine::TransitionDecision;
use super::state::InterviewState;
use crate::coverage::{CoverageVector, SkillCatalog, SkillCategory, MAX_LEVEL};

/// Skill tag of the calibration question.
pub const CALIBRATION_SKILL: &str = "basic_formulas";
/// Skill tag of the case-study question.
pub const CASE_SKILL: &str = "case_analysis";

pub const CALIBRATION_DIFFICULTY: u8 = 1;
pub const DEEP_DIVE_DIFFICULTY: u8 = 3;
pub const CASE_DIFFICULTY: u8 = 3;

/// What the next question should be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionPlan {
    Intro,
    Calibration,
    Skill {
        phase: InterviewState,
        skill: String,
        difficulty: u8,
    },
    Case,
    Review,
    Closing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl QuestionPlan {
    /// Phase the planned question belongs to.
    pub fn phase(&self) -> InterviewState {
        match self {
            Self::Intro => InterviewState::Intro,
            Self::Calibration => InterviewState::Calibrate,
            Self::Skill { phase, .. } => *phase,
            Self::Case => InterviewState::Case,
            Self::Review => InterviewState::Review,
            Self::Closing { .. } => InterviewState::Summary,
        }
    }
}

/// Plan the question that follows a transition decision.
pub fn plan_next<R: Rng + ?Sized>(
    decision: &TransitionDecision,
    catalog: &SkillCatalog,
    coverage: &CoverageVector,
    rng: &mut R,
) -> QuestionPlan {
    match decision.to {
        InterviewState::Intro => QuestionPlan::Intro,
        InterviewState::Calibrate => QuestionPlan::Calibration,
        InterviewState::CoreQ => {
            // Entering CORE_Q (from CALIBRATE or via the minimum-length
            // override) asks from foundations and functions only.
            let categories: &[SkillCategory] = if decision.from == InterviewState::CoreQ {
                &[
                    SkillCategory::Foundations,
                    SkillCategory::Functions,
                    SkillCategory::DataOps,
                ]
            } else {
                &[SkillCategory::Foundations, SkillCategory::Functions]
            };
            skill_plan(
                InterviewState::CoreQ,
                &catalog.skills_in(categories),
                coverage,
                rng,
                core_difficulty,
            )
        }
        InterviewState::DeepDive => skill_plan(
            InterviewState::DeepDive,
            catalog.skills(SkillCategory::Analysis),
            coverage,
            rng,
            |_| DEEP_DIVE_DIFFICULTY,
        ),
        InterviewState::Case => QuestionPlan::Case,
        InterviewState::Review => QuestionPlan::Review,
        InterviewState::Summary => QuestionPlan::Closing {
            reason: decision.end_reason.clone(),
        },
    }
}

fn skill_plan<R: Rng + ?Sized>(
    phase: InterviewState,
    candidates: &[String],
    coverage: &CoverageVector,
    rng: &mut R,
    difficulty: impl Fn(u8) -> u8,
) -> QuestionPlan {
    match select_skill(candidates, coverage, rng) {
        Some(skill) => {
            let level = coverage.level(&skill);
            QuestionPlan::Skill {
                phase,
                skill,
                difficulty: difficulty(level),
            }
        }
        // Only reachable with a catalog that has no skills for the phase.
        None => QuestionPlan::Case,
    }
}

/// Pick the next skill from `candidates`.
///
/// Untested skills (level 0) come first; otherwise the least-covered skill
/// wins. Ties are broken with `rng`.
pub fn select_skill<R: Rng + ?Sized>(
    candidates: &[String],
    coverage: &CoverageVector,
    rng: &mut R,
) -> Option<String> {
    let min_level = candidates.iter().map(|s| coverage.level(s)).min()?;
    let tied: Vec<&String> = candidates
        .iter()
        .filter(|s| coverage.level(s) == min_level)
        .collect();
    tied.choose(rng).map(|s| (*s).clone())
}

/// Difficulty for a CORE_Q question given the skill's current level.
pub fn core_difficulty(level: u8) -> u8 {
    if level < 2 {
        2
    } else {
        (level + 1).min(MAX_LEVEL)
    }
}

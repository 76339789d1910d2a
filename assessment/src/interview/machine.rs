//! Interview State Machine: table-driven phase transitions with turn guards.
//!
//! Transitions are pure functions of (current state, turn count, coverage).
//! The edges live in [`TRANSITION_TABLE`]; the first row whose `from` matches
//! and whose guard holds wins. Two overrides sit on top of the table:
//!
//! ```text
//! turn_count >= max_turns                      → SUMMARY ("Maximum turns reached")
//! table says SUMMARY and turn_count < min_turns → CORE_Q
//! ```

use serde::{Deserialize, Serialize};

use super::policy::InterviewPolicy;
use super::state::InterviewState;
use crate::coverage::{CoverageVector, SkillCatalog, SkillCategory};

/// End reason recorded when the turn ceiling forces SUMMARY.
pub const MAX_TURNS_REASON: &str = "Maximum turns reached";
/// End reason recorded when the interview reaches SUMMARY normally.
pub const COMPLETED_REASON: &str = "Interview complete";

/// Condition attached to a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    Always,
    /// Mean foundations+functions level and total exposure are both high.
    DeepDiveReady,
    /// Enough foundations+functions skills covered at the case level.
    CaseReady,
    /// Enough analysis skills covered at the deep-dive exit level.
    AnalysisComplete,
}

/// One edge of the state graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: InterviewState,
    pub guard: Guard,
    pub to: InterviewState,
}

const fn rule(from: InterviewState, guard: Guard, to: InterviewState) -> TransitionRule {
    TransitionRule { from, guard, to }
}

/// The interview state graph, evaluated top to bottom per source state.
pub const TRANSITION_TABLE: &[TransitionRule] = &[
    rule(InterviewState::Intro, Guard::Always, InterviewState::Calibrate),
    rule(InterviewState::Calibrate, Guard::Always, InterviewState::CoreQ),
    rule(InterviewState::CoreQ, Guard::DeepDiveReady, InterviewState::DeepDive),
    rule(InterviewState::CoreQ, Guard::CaseReady, InterviewState::Case),
    rule(InterviewState::CoreQ, Guard::Always, InterviewState::CoreQ),
    rule(InterviewState::DeepDive, Guard::AnalysisComplete, InterviewState::Case),
    rule(InterviewState::DeepDive, Guard::Always, InterviewState::DeepDive),
    rule(InterviewState::Case, Guard::Always, InterviewState::Review),
    rule(InterviewState::Review, Guard::Always, InterviewState::Summary),
    rule(InterviewState::Summary, Guard::Always, InterviewState::Summary),
];

/// Which override, if any, replaced the table's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOverride {
    MaxTurns,
    MinimumLength,
}

/// Result of one transition decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDecision {
    pub from: InterviewState,
    pub to: InterviewState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_applied: Option<TransitionOverride>,
}

impl TransitionDecision {
    pub fn ends_interview(&self) -> bool {
        self.to.is_terminal()
    }
}

/// Deterministic transition oracle over a fixed policy and catalog.
#[derive(Debug, Clone)]
pub struct InterviewStateMachine {
    policy: InterviewPolicy,
    catalog: SkillCatalog,
}

impl InterviewStateMachine {
    pub fn new(policy: InterviewPolicy, catalog: SkillCatalog) -> Self {
        Self { policy, catalog }
    }

    pub fn policy(&self) -> &InterviewPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    /// Evaluate a guard against a coverage vector.
    pub fn guard_holds(&self, guard: Guard, coverage: &CoverageVector) -> bool {
        match guard {
            Guard::Always => true,
            Guard::DeepDiveReady => {
                let core = self.core_skills();
                coverage.average(&core) >= self.policy.deep_dive_min_average
                    && coverage.total(&core) >= self.policy.deep_dive_min_total
            }
            Guard::CaseReady => {
                let core = self.core_skills();
                coverage.count_at_least(&core, self.policy.case_min_level)
                    >= self.policy.case_min_covered
                    && coverage.total(&core) >= self.policy.case_min_total
            }
            Guard::AnalysisComplete => {
                let analysis = self.catalog.skills(SkillCategory::Analysis);
                coverage.count_at_least(analysis, self.policy.deep_dive_exit_level)
                    >= self.policy.deep_dive_exit_covered
            }
        }
    }

    /// The table's answer, without turn-count overrides.
    pub fn table_next(&self, from: InterviewState, coverage: &CoverageVector) -> InterviewState {
        TRANSITION_TABLE
            .iter()
            .filter(|row| row.from == from)
            .find(|row| self.guard_holds(row.guard, coverage))
            .map(|row| row.to)
            .unwrap_or(from)
    }

    /// Decide the next state.
    ///
    /// `turn_count` is the number of turns already recorded for the interview.
    pub fn decide(
        &self,
        from: InterviewState,
        turn_count: u32,
        coverage: &CoverageVector,
    ) -> TransitionDecision {
        if turn_count >= self.policy.max_turns {
            return TransitionDecision {
                from,
                to: InterviewState::Summary,
                end_reason: Some(MAX_TURNS_REASON.to_string()),
                override_applied: Some(TransitionOverride::MaxTurns),
            };
        }

        let next = self.table_next(from, coverage);
        if next == InterviewState::Summary && turn_count < self.policy.min_turns {
            return TransitionDecision {
                from,
                to: InterviewState::CoreQ,
                end_reason: None,
                override_applied: Some(TransitionOverride::MinimumLength),
            };
        }

        TransitionDecision {
            from,
            to: next,
            end_reason: (next == InterviewState::Summary).then(|| COMPLETED_REASON.to_string()),
            override_applied: None,
        }
    }

    fn core_skills(&self) -> Vec<String> {
        self.catalog
            .skills_in(&[SkillCategory::Foundations, SkillCategory::Functions])
    }
}

impl Default for InterviewStateMachine {
    fn default() -> Self {
        Self::new(InterviewPolicy::default(), SkillCatalog::excel())
    }
}

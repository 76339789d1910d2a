//! Termination and phase-change thresholds.

use serde::{Deserialize, Serialize};

/// Knobs for the interview state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewPolicy {
    /// Turn count at which the interview is forced to SUMMARY.
    pub max_turns: u32,
    /// SUMMARY is never reached below this turn count (except via `max_turns`).
    pub min_turns: u32,
    /// Wall-clock budget. Recorded on the session, not enforced by transitions.
    pub time_limit_minutes: i64,
    /// CORE_Q → DEEP_DIVE: minimum mean level over foundations+functions.
    pub deep_dive_min_average: f64,
    /// CORE_Q → DEEP_DIVE: minimum total exposure over foundations+functions.
    pub deep_dive_min_total: u32,
    /// CORE_Q → CASE: how many foundations+functions skills must be covered.
    pub case_min_covered: usize,
    /// CORE_Q → CASE: level a skill needs to count as covered.
    pub case_min_level: u8,
    /// CORE_Q → CASE: minimum total exposure over foundations+functions.
    pub case_min_total: u32,
    /// DEEP_DIVE → CASE: how many analysis skills must reach `deep_dive_exit_level`.
    pub deep_dive_exit_covered: usize,
    pub deep_dive_exit_level: u8,
}

impl Default for InterviewPolicy {
    fn default() -> Self {
        Self {
            max_turns: 25,
            min_turns: 8,
            time_limit_minutes: 45,
            deep_dive_min_average: 3.0,
            deep_dive_min_total: 15,
            case_min_covered: 8,
            case_min_level: 2,
            case_min_total: 12,
            deep_dive_exit_covered: 2,
            deep_dive_exit_level: 3,
        }
    }
}

impl InterviewPolicy {
    /// Validate the policy; return an error string if inconsistent.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_turns == 0 {
            return Err("max_turns must be > 0".to_string());
        }
        if self.min_turns > self.max_turns {
            return Err(format!(
                "min_turns ({}) must not exceed max_turns ({})",
                self.min_turns, self.max_turns
            ));
        }
        if self.time_limit_minutes <= 0 {
            return Err("time_limit_minutes must be > 0".to_string());
        }
        if !(0.0..=3.0).contains(&self.deep_dive_min_average) {
            return Err(format!(
                "deep_dive_min_average must be in [0, 3], got {}",
                self.deep_dive_min_average
            ));
        }
        if self.case_min_level == 0 || self.case_min_level > 3 {
            return Err("case_min_level must be in 1..=3".to_string());
        }
        if self.deep_dive_exit_level == 0 || self.deep_dive_exit_level > 3 {
            return Err("deep_dive_exit_level must be in 1..=3".to_string());
        }
        Ok(())
    }
}

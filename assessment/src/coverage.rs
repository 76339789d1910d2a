//! Coverage Tracker: per-skill exposure levels driving question selection
//!
//! A coverage vector maps every skill in the catalog to the highest
//! difficulty tier asked so far (0 = untested, 1–3 = tier asked). Levels only
//! ever go up within one interview; a new interview starts from a fresh
//! vector.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest difficulty tier a question can carry.
pub const MAX_LEVEL: u8 = 3;

/// Topic groups of the skill catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Foundations,
    Functions,
    DataOps,
    Analysis,
    Charts,
}

impl SkillCategory {
    pub fn all() -> &'static [SkillCategory] {
        &[
            Self::Foundations,
            Self::Functions,
            Self::DataOps,
            Self::Analysis,
            Self::Charts,
        ]
    }

    /// Weight of the category in the overall report score.
    pub fn report_weight(self) -> f64 {
        match self {
            Self::Foundations => 0.15,
            Self::Functions => 0.35,
            Self::DataOps => 0.25,
            Self::Analysis => 0.15,
            Self::Charts => 0.10,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Foundations => "Basic Excel fundamentals",
            Self::Functions => "Excel formulas and functions",
            Self::DataOps => "Data manipulation and organization",
            Self::Analysis => "Data analysis and problem solving",
            Self::Charts => "Data visualization",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Foundations => "foundations",
            Self::Functions => "functions",
            Self::DataOps => "data_ops",
            Self::Analysis => "analysis",
            Self::Charts => "charts",
        })
    }
}

/// The set of skills an interview can cover, grouped by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillCatalog {
    categories: BTreeMap<SkillCategory, Vec<String>>,
}

impl SkillCatalog {
    /// Build a catalog from explicit category lists.
    pub fn new(categories: impl IntoIterator<Item = (SkillCategory, Vec<String>)>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
        }
    }

    /// The Excel interview catalog: twenty skills across five categories.
    pub fn excel() -> Self {
        fn owned(skills: &[&str]) -> Vec<String> {
            skills.iter().map(|s| s.to_string()).collect()
        }

        Self::new([
            (
                SkillCategory::Foundations,
                owned(&["references", "ranges", "formatting"]),
            ),
            (
                SkillCategory::Functions,
                owned(&[
                    "if_functions",
                    "vlookup",
                    "index_match",
                    "countif",
                    "sumif",
                    "text_functions",
                    "date_functions",
                ]),
            ),
            (
                SkillCategory::DataOps,
                owned(&[
                    "sorting",
                    "filtering",
                    "pivot_tables",
                    "validation",
                    "conditional_formatting",
                ]),
            ),
            (
                SkillCategory::Analysis,
                owned(&["whatif_analysis", "goal_seek", "statistics", "error_tracing"]),
            ),
            (SkillCategory::Charts, owned(&["charts"])),
        ])
    }

    /// Skills in one category (empty when the category is absent).
    pub fn skills(&self, category: SkillCategory) -> &[String] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Concatenated skills of several categories, in the given order.
    pub fn skills_in(&self, categories: &[SkillCategory]) -> Vec<String> {
        categories
            .iter()
            .flat_map(|c| self.skills(*c).iter().cloned())
            .collect()
    }

    /// Every skill in the catalog.
    pub fn all_skills(&self) -> Vec<String> {
        self.categories.values().flatten().cloned().collect()
    }

    /// Which category a skill belongs to, if any.
    pub fn category_of(&self, skill: &str) -> Option<SkillCategory> {
        self.categories
            .iter()
            .find(|(_, skills)| skills.iter().any(|s| s == skill))
            .map(|(category, _)| *category)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.category_of(skill).is_some()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self::excel()
    }
}

/// Per-skill exposure levels for one interview.
///
/// The only mutator is [`CoverageVector::record`], which keeps the maximum
/// of the old and new level, so levels are non-decreasing by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageVector {
    levels: BTreeMap<String, u8>,
}

impl CoverageVector {
    /// A fresh vector with every catalog skill at 0.
    pub fn for_catalog(catalog: &SkillCatalog) -> Self {
        Self {
            levels: catalog.all_skills().into_iter().map(|s| (s, 0)).collect(),
        }
    }

    /// Exposure level of a skill (0 when never seen).
    pub fn level(&self, skill: &str) -> u8 {
        self.levels.get(skill).copied().unwrap_or(0)
    }

    /// Record that `skill` was asked at `level`. Returns the stored level.
    pub fn record(&mut self, skill: &str, level: u8) -> u8 {
        let level = level.min(MAX_LEVEL);
        let entry = self.levels.entry(skill.to_string()).or_insert(0);
        *entry = (*entry).max(level);
        *entry
    }

    /// Sum of levels over the given skills.
    pub fn total(&self, skills: &[String]) -> u32 {
        skills.iter().map(|s| u32::from(self.level(s))).sum()
    }

    /// Mean level over the given skills (0.0 for an empty set).
    pub fn average(&self, skills: &[String]) -> f64 {
        if skills.is_empty() {
            return 0.0;
        }
        f64::from(self.total(skills)) / skills.len() as f64
    }

    /// How many of the given skills sit at or above `min_level`.
    pub fn count_at_least(&self, skills: &[String], min_level: u8) -> usize {
        skills.iter().filter(|s| self.level(s) >= min_level).count()
    }

    /// Whether `self` dominates `earlier` (no skill went down).
    pub fn is_monotonic_from(&self, earlier: &CoverageVector) -> bool {
        earlier
            .levels
            .iter()
            .all(|(skill, level)| self.level(skill) >= *level)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.levels.iter().map(|(s, l)| (s.as_str(), *l))
    }

    /// Skills with a non-zero level.
    pub fn covered_skills(&self) -> Vec<&str> {
        self.levels
            .iter()
            .filter(|(_, l)| **l > 0)
            .map(|(s, _)| s.as_str())
            .collect()
    }
}

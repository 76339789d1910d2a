use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{InterviewStore, QuestionTemplate, RubricEntry, StoreError};
use crate::coverage::{CoverageVector, SkillCatalog, SkillCategory};
use crate::interview::InterviewState;
use crate::session::{
    InterviewId, InterviewSession, InterviewUpdate, NewTurn, Turn, TurnId, TurnUpdate,
};

#[derive(Debug, Default)]
struct Tables {
    interviews: HashMap<InterviewId, InterviewSession>,
    turns: BTreeMap<TurnId, Turn>,
    next_interview_id: InterviewId,
    next_turn_id: TurnId,
}

/// In-memory [`InterviewStore`].
#[derive(Debug)]
pub struct MemoryStore {
    catalog: SkillCatalog,
    tables: RwLock<Tables>,
    templates: Vec<QuestionTemplate>,
    rubrics: Vec<RubricEntry>,
}

impl MemoryStore {
    pub fn new(catalog: SkillCatalog) -> Self {
        Self {
            catalog,
            tables: RwLock::new(Tables::default()),
            templates: Vec::new(),
            rubrics: Vec::new(),
        }
    }

    pub fn with_templates(mut self, templates: Vec<QuestionTemplate>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_rubrics(mut self, rubrics: Vec<RubricEntry>) -> Self {
        self.rubrics = rubrics;
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(SkillCatalog::excel())
    }
}

impl InterviewStore for MemoryStore {
    fn create_interview(
        &self,
        candidate_name: Option<String>,
    ) -> Result<InterviewSession, StoreError> {
        let mut tables = self.write()?;
        tables.next_interview_id += 1;
        let session = InterviewSession {
            id: tables.next_interview_id,
            candidate_name,
            state: InterviewState::Intro,
            turn_count: 0,
            coverage: CoverageVector::for_catalog(&self.catalog),
            created_at: Utc::now(),
            ended_at: None,
            end_reason: None,
            total_score: None,
        };
        tables.interviews.insert(session.id, session.clone());
        tracing::debug!(interview_id = session.id, "interview created");
        Ok(session)
    }

    fn get_interview(&self, id: InterviewId) -> Result<Option<InterviewSession>, StoreError> {
        Ok(self.read()?.interviews.get(&id).cloned())
    }

    fn update_interview(
        &self,
        id: InterviewId,
        update: InterviewUpdate,
    ) -> Result<InterviewSession, StoreError> {
        let mut tables = self.write()?;
        let session = tables
            .interviews
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "interview", id })?;

        if let Some(state) = update.state {
            session.state = state;
        }
        if let Some(coverage) = update.coverage {
            session.coverage = coverage;
        }
        if update.ended_at.is_some() {
            session.ended_at = update.ended_at;
        }
        if update.end_reason.is_some() {
            session.end_reason = update.end_reason;
        }
        if update.total_score.is_some() {
            session.total_score = update.total_score;
        }
        Ok(session.clone())
    }

    fn add_turn(&self, turn: NewTurn) -> Result<Turn, StoreError> {
        let mut tables = self.write()?;
        let session = tables
            .interviews
            .get_mut(&turn.interview_id)
            .ok_or(StoreError::NotFound {
                kind: "interview",
                id: turn.interview_id,
            })?;

        let expected = session.turn_count + 1;
        if turn.turn_number != expected {
            return Err(StoreError::NonContiguousTurn {
                interview_id: turn.interview_id,
                expected,
                got: turn.turn_number,
            });
        }
        session.turn_count = expected;

        tables.next_turn_id += 1;
        let stored = Turn {
            id: tables.next_turn_id,
            interview_id: turn.interview_id,
            turn_number: turn.turn_number,
            question: turn.question,
            target_skill: turn.target_skill,
            difficulty: turn.difficulty,
            phase: turn.phase,
            expected_answer: turn.expected_answer,
            answer: None,
            grade: None,
            asked_at: Utc::now(),
            answered_at: None,
        };
        tables.turns.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_turn(&self, turn_id: TurnId, update: TurnUpdate) -> Result<Turn, StoreError> {
        let mut tables = self.write()?;
        let turn = tables
            .turns
            .get_mut(&turn_id)
            .ok_or(StoreError::NotFound { kind: "turn", id: turn_id })?;

        match update {
            TurnUpdate::Answer(answer) => {
                if turn.answer.is_some() {
                    return Err(StoreError::AnswerAlreadyRecorded(turn_id));
                }
                turn.answer = Some(answer);
                turn.answered_at = Some(Utc::now());
            }
            TurnUpdate::Grade(grade) => {
                if turn.grade.is_some() {
                    return Err(StoreError::TurnAlreadyGraded(turn_id));
                }
                turn.grade = Some(grade);
            }
        }
        Ok(turn.clone())
    }

    fn turns(&self, interview_id: InterviewId) -> Result<Vec<Turn>, StoreError> {
        let tables = self.read()?;
        let mut turns: Vec<Turn> = tables
            .turns
            .values()
            .filter(|t| t.interview_id == interview_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.turn_number);
        Ok(turns)
    }

    fn find_question(
        &self,
        skill: &str,
        difficulty: u8,
        category: Option<SkillCategory>,
    ) -> Result<Option<QuestionTemplate>, StoreError> {
        Ok(self
            .templates
            .iter()
            .find(|t| {
                t.skill == skill
                    && t.difficulty == difficulty
                    && (category.is_none() || t.category.is_none() || t.category == category)
            })
            .cloned())
    }

    fn find_rubric(&self, skill: &str, difficulty: u8) -> Result<Option<RubricEntry>, StoreError> {
        let exact = self
            .rubrics
            .iter()
            .find(|r| r.skill == skill && r.difficulty == difficulty);
        let any_tier = || self.rubrics.iter().find(|r| r.skill == skill);
        Ok(exact.or_else(any_tier).cloned())
    }
}

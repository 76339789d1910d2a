//! Turn orchestration.
//!
//! One call to [`Interviewer::process_turn`] records the candidate's answer,
//! grades it, decides the next phase, generates the next question and
//! persists it. Calls for the same interview are serialised; different
//! interviews proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use assessment::coverage::{CoverageVector, SkillCatalog};
use assessment::grading::HybridGradingResult;
use assessment::interview::{plan_next, InterviewState, InterviewStateMachine};
use assessment::report::{build_report, InterviewReport};
use assessment::session::{InterviewId, InterviewSession, InterviewUpdate, NewTurn, TurnUpdate};
use assessment::store::{InterviewStore, StoreError};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::ReportAnalyst;
use crate::config::InterviewConfig;
use crate::graders::{GradingRequest, HybridGrader, LlmGrader};
use crate::providers::ProviderManager;
use crate::questions::{GeneratedQuestion, QuestionGenerator};

#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("interview {0} not found")]
    NotFound(InterviewId),

    #[error("interview {interview_id} has no turn {turn_number}")]
    TurnNotFound {
        interview_id: InterviewId,
        turn_number: u32,
    },

    #[error("answer is empty")]
    EmptyAnswer,

    #[error("interview {0} has already started")]
    AlreadyStarted(InterviewId),

    #[error("interview {0} is complete")]
    InterviewComplete(InterviewId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the caller should do after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    AwaitAnswer,
    EndInterview,
}

/// The question to show next, plus interview progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub state: InterviewState,
    pub question: String,
    pub target_skill: String,
    pub difficulty: u8,
    pub next_action: NextAction,
    pub coverage_vector: CoverageVector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
}

impl TurnResponse {
    fn new(
        question: GeneratedQuestion,
        coverage: CoverageVector,
        end_reason: Option<String>,
    ) -> Self {
        let next_action = if question.phase.is_terminal() {
            NextAction::EndInterview
        } else {
            NextAction::AwaitAnswer
        };
        Self {
            state: question.phase,
            question: question.question,
            target_skill: question.target_skill,
            difficulty: question.difficulty,
            next_action,
            coverage_vector: coverage,
            end_reason,
        }
    }

    pub fn is_final(&self) -> bool {
        self.next_action == NextAction::EndInterview
    }
}

/// Drives interviews turn by turn.
pub struct Interviewer {
    store: Arc<dyn InterviewStore>,
    grader: HybridGrader,
    questions: QuestionGenerator,
    analyst: ReportAnalyst,
    machine: InterviewStateMachine,
    seed: Option<u64>,
    locks: Mutex<HashMap<InterviewId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Interviewer {
    pub fn new(
        store: Arc<dyn InterviewStore>,
        providers: Arc<ProviderManager>,
        config: &InterviewConfig,
    ) -> Self {
        let catalog = SkillCatalog::excel();
        let llm = Arc::new(LlmGrader::new(providers.clone()).with_store(store.clone()));
        Self {
            grader: HybridGrader::new(llm, config.grading.clone()),
            questions: QuestionGenerator::new(providers.clone(), store.clone(), catalog.clone()),
            analyst: ReportAnalyst::new(providers),
            machine: InterviewStateMachine::new(config.policy.clone(), catalog),
            store,
            seed: config.seed,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn machine(&self) -> &InterviewStateMachine {
        &self.machine
    }

    pub fn create_interview(
        &self,
        candidate_name: Option<String>,
    ) -> Result<InterviewSession, InterviewError> {
        Ok(self.store.create_interview(candidate_name)?)
    }

    /// Issue the fixed introduction as turn 1.
    pub async fn start_interview(
        &self,
        interview_id: InterviewId,
    ) -> Result<TurnResponse, InterviewError> {
        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;

        let session = self.session(interview_id)?;
        if session.turn_count > 0 {
            return Err(InterviewError::AlreadyStarted(interview_id));
        }

        let intro = QuestionGenerator::intro();
        self.store.add_turn(NewTurn {
            interview_id,
            turn_number: 1,
            question: intro.question.clone(),
            target_skill: intro.target_skill.clone(),
            difficulty: intro.difficulty,
            phase: intro.phase,
            expected_answer: None,
        })?;
        info!(interview_id, "interview started");
        Ok(TurnResponse::new(intro, session.coverage, None))
    }

    /// Record an answer to the latest question and issue the next one.
    ///
    /// `current_state` is the caller's view of the phase. The stored state
    /// wins when they differ.
    pub async fn process_turn(
        &self,
        interview_id: InterviewId,
        answer: &str,
        current_state: Option<InterviewState>,
    ) -> Result<TurnResponse, InterviewError> {
        if answer.trim().is_empty() {
            return Err(InterviewError::EmptyAnswer);
        }

        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;

        let session = self.session(interview_id)?;
        if session.is_complete() {
            return Err(InterviewError::InterviewComplete(interview_id));
        }
        if let Some(claimed) = current_state.filter(|s| *s != session.state) {
            warn!(
                interview_id,
                claimed = %claimed,
                stored = %session.state,
                "caller state differs from stored state, using stored"
            );
        }

        let turn = self
            .store
            .turns(interview_id)?
            .pop()
            .ok_or(InterviewError::TurnNotFound {
                interview_id,
                turn_number: session.turn_count,
            })?;
        self.store
            .update_turn(turn.id, TurnUpdate::Answer(answer.to_string()))?;

        if turn.phase.is_graded() {
            let grade = self
                .grader
                .grade(&GradingRequest {
                    question: turn.question.clone(),
                    answer: answer.to_string(),
                    skill: turn.target_skill.clone(),
                    difficulty: turn.difficulty,
                    expected_answer: turn.expected_answer.clone(),
                })
                .await;
            self.store.update_turn(turn.id, TurnUpdate::Grade(grade))?;
        }

        let mut coverage = session.coverage.clone();
        let decision = self.machine.decide(session.state, session.turn_count, &coverage);
        let mut rng = self.turn_rng(interview_id, session.turn_count);
        let plan = plan_next(&decision, self.machine.catalog(), &coverage, &mut rng);
        let question = self.questions.generate(&plan, &mut coverage).await;

        let turn_number = session.turn_count + 1;
        self.store.add_turn(NewTurn {
            interview_id,
            turn_number,
            question: question.question.clone(),
            target_skill: question.target_skill.clone(),
            difficulty: question.difficulty,
            phase: question.phase,
            expected_answer: question.expected_answer.clone(),
        })?;

        let now = Utc::now();
        let ends = decision.ends_interview();
        self.store.update_interview(
            interview_id,
            InterviewUpdate {
                state: Some(decision.to),
                coverage: Some(coverage.clone()),
                ended_at: ends.then_some(now),
                end_reason: decision.end_reason.clone(),
                total_score: None,
            },
        )?;

        info!(
            interview_id,
            turn = turn_number,
            from = %decision.from,
            to = %decision.to,
            skill = %question.target_skill,
            override_applied = ?decision.override_applied,
            "turn processed"
        );
        let limit = self.machine.policy().time_limit_minutes;
        if !ends && session.time_limit_exceeded(limit, now) {
            warn!(
                interview_id,
                minutes = session.duration_minutes(now),
                limit,
                "interview is over its time limit"
            );
        }

        Ok(TurnResponse::new(question, coverage, decision.end_reason))
    }

    /// Grade an answer outside the turn flow.
    pub async fn grade_answer(&self, request: &GradingRequest) -> HybridGradingResult {
        self.grader.grade(request).await
    }

    /// Build the report and persist the total score and end time.
    pub async fn generate_report(
        &self,
        interview_id: InterviewId,
    ) -> Result<InterviewReport, InterviewError> {
        let lock = self.lock_for(interview_id);
        let _guard = lock.lock().await;

        let session = self.session(interview_id)?;
        let turns = self.store.turns(interview_id)?;
        let now = Utc::now();
        let mut report = build_report(&session, &turns, self.machine.catalog(), now);
        report.detailed_analysis = Some(self.analyst.analyse(&report).await);

        self.store.update_interview(
            interview_id,
            InterviewUpdate {
                ended_at: session.ended_at.is_none().then_some(now),
                total_score: Some(report.total_score),
                ..Default::default()
            },
        )?;
        info!(
            interview_id,
            total = report.total_score,
            level = ?report.performance_level,
            "report generated"
        );
        if session.is_complete() {
            self.locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&interview_id);
        }
        Ok(report)
    }

    fn session(&self, interview_id: InterviewId) -> Result<InterviewSession, InterviewError> {
        self.store
            .get_interview(interview_id)?
            .ok_or(InterviewError::NotFound(interview_id))
    }

    /// Question-selection RNG for one turn. Seeded runs depend only on the
    /// seed, the interview and the turn, never on other interviews.
    fn turn_rng(&self, interview_id: InterviewId, turn_count: u32) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(
                seed ^ interview_id.rotate_left(32) ^ u64::from(turn_count),
            ),
            None => StdRng::from_entropy(),
        }
    }

    fn lock_for(&self, interview_id: InterviewId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(interview_id)
            .or_default()
            .clone()
    }
}

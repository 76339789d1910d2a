//! Interview flow: states, transition table, policy and question planning.

pub mod machine;
pub mod planner;
pub mod policy;
pub mod state;

pub use machine::{
    Guard, InterviewStateMachine, TransitionDecision, TransitionOverride, TransitionRule,
    COMPLETED_REASON, MAX_TURNS_REASON, TRANSITION_TABLE,
};
pub use planner::{plan_next, select_skill, QuestionPlan};
pub use policy::InterviewPolicy;
pub use state::{InterviewState, UnknownState};

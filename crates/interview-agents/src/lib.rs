//! Adaptive interviewer on top of the `assessment` core.
//!
//! - [`providers`]: LLM backends behind rig-core, with a default and an
//!   escalation selection
//! - [`graders`]: LLM grading and the async hybrid pipeline
//! - [`questions`]: per-phase question generation
//! - [`interviewer`]: the turn loop
//! - [`analysis`]: narrative feedback for finished reports
//! - [`config`]: TOML plus environment configuration

pub mod analysis;
pub mod config;
pub mod contracts;
pub mod graders;
pub mod interviewer;
pub mod providers;
pub mod questions;

pub use analysis::ReportAnalyst;
pub use config::InterviewConfig;
pub use graders::{GradingRequest, HybridGrader, LlmGrader};
pub use interviewer::{InterviewError, Interviewer, NextAction, TurnResponse};
pub use providers::{
    GenerateRequest, LlmProvider, ProviderError, ProviderFactory, ProviderInfo, ProviderKind,
    ProviderManager, ProviderSelection,
};
pub use questions::{GeneratedQuestion, QuestionGenerator, QuestionSource};

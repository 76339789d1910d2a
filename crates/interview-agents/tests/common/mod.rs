//! Scripted provider doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use assessment::store::{InterviewStore, MemoryStore};
use async_trait::async_trait;
use interview_agents::{
    GenerateRequest, InterviewConfig, Interviewer, LlmProvider, ProviderError, ProviderFactory,
    ProviderInfo, ProviderKind, ProviderManager, ProviderSelection,
};

/// One recorded provider call.
#[derive(Debug, Clone)]
pub struct Call {
    pub selection: ProviderSelection,
    pub request: GenerateRequest,
}

/// Queued replies per backend plus a log of every call.
///
/// A backend with no queued reply fails the call.
#[derive(Default)]
pub struct Script {
    replies: Mutex<HashMap<ProviderKind, VecDeque<Result<String, String>>>>,
    calls: Mutex<Vec<Call>>,
    manager: Mutex<Weak<ProviderManager>>,
    switch_on_next_call: Mutex<Option<ProviderKind>>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, kind: ProviderKind, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(Ok(text.to_string()));
    }

    pub fn fail(&self, kind: ProviderKind, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Switch the manager's active provider while the next call is in flight.
    pub fn switch_during_next_call(&self, kind: ProviderKind) {
        *self.switch_on_next_call.lock().unwrap() = Some(kind);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, kind: ProviderKind) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.selection.kind == kind)
            .count()
    }
}

pub struct ScriptedProvider {
    selection: ProviderSelection,
    script: Arc<Script>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        self.script.calls.lock().unwrap().push(Call {
            selection: self.selection.clone(),
            request: request.clone(),
        });
        let switch = self.script.switch_on_next_call.lock().unwrap().take();
        if let Some(kind) = switch {
            let manager = self.script.manager.lock().unwrap().upgrade();
            if let Some(manager) = manager {
                manager.switch_provider(kind, None).unwrap();
            }
        }
        let next = self
            .script
            .replies
            .lock()
            .unwrap()
            .get_mut(&self.selection.kind)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ProviderError::Inference {
                provider: self.selection.kind,
                message,
                retriable: false,
            }),
            None => Err(ProviderError::Inference {
                provider: self.selection.kind,
                message: "503 no scripted reply".to_string(),
                retriable: true,
            }),
        }
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::for_selection(&self.selection, "scripted://local")
    }
}

pub struct ScriptedFactory {
    pub script: Arc<Script>,
}

impl ProviderFactory for ScriptedFactory {
    fn build(&self, selection: &ProviderSelection) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(ScriptedProvider {
            selection: selection.clone(),
            script: self.script.clone(),
        }))
    }
}

/// Gemini by default, Claude for escalation.
pub fn manager(script: &Arc<Script>) -> Arc<ProviderManager> {
    let manager = Arc::new(
        ProviderManager::new(
            Arc::new(ScriptedFactory {
                script: script.clone(),
            }),
            ProviderSelection::new(ProviderKind::Gemini, None),
            ProviderSelection::new(ProviderKind::Claude, None),
        )
        .unwrap(),
    );
    *script.manager.lock().unwrap() = Arc::downgrade(&manager);
    manager
}

/// An interviewer over a fresh in-memory store, returned for inspection.
pub fn interviewer(script: &Arc<Script>, seed: u64) -> (Interviewer, Arc<MemoryStore>) {
    let config = InterviewConfig {
        seed: Some(seed),
        ..Default::default()
    };
    let store = Arc::new(MemoryStore::default());
    let shared: Arc<dyn InterviewStore> = store.clone();
    (Interviewer::new(shared, manager(script), &config), store)
}

pub fn grade_json(total: f64, confidence: f64) -> String {
    format!(
        r#"{{"scores_by_dimension":{{"technical_accuracy":{total}}},"total_score":{total},"confidence":{confidence},"error_tags":[],"feedback_short":"scripted"}}"#
    )
}

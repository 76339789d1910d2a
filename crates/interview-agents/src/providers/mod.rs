//! LLM provider abstraction.
//!
//! A [`ProviderSelection`] names a backend and model. The [`ProviderManager`]
//! holds the default selection for ordinary calls plus the stronger
//! selection used for grading escalation, and builds clients through a
//! [`ProviderFactory`]. Escalation passes its selection per call; the
//! default selection only changes through [`ProviderManager::switch_provider`].

pub mod client;
pub mod errors;
pub mod mock;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use client::{check_endpoint, RigProvider, RigProviderFactory};
pub use errors::ProviderError;
pub use mock::MockProvider;

/// Supported backends. All real backends speak the OpenAI chat protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Groq,
    Claude,
    Mock,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash-exp",
            Self::Groq => "llama-3.1-70b-versatile",
            Self::Claude => "claude-3-5-sonnet-20241022",
            Self::Mock => "mock-model",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Claude => "https://api.anthropic.com/v1",
            Self::Mock => "mock://local",
        }
    }

    /// Environment variable holding the API key (`None` for the mock).
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Claude => Some("ANTHROPIC_API_KEY"),
            Self::Mock => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Google Gemini",
            Self::Groq => "Groq",
            Self::Claude => "Anthropic Claude",
            Self::Mock => "Mock",
        }
    }

    /// Whether the endpoint honours `response_format = json_object`.
    /// Anthropic's OpenAI-compatible endpoint ignores it, so Claude gets the
    /// JSON requirement through the prompt only.
    pub fn supports_json_mode(self) -> bool {
        !matches!(self, Self::Claude)
    }

    fn context_window(self, model: &str) -> u64 {
        match self {
            Self::Gemini if model.contains("gemini-2.0") => 1_000_000,
            Self::Gemini => 128_000,
            Self::Groq => 32_768,
            Self::Claude => 200_000,
            Self::Mock => 1_000,
        }
    }

    fn cost_tier(self) -> CostTier {
        match self {
            Self::Claude => CostTier::High,
            Self::Gemini | Self::Groq => CostTier::Low,
            Self::Mock => CostTier::Free,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Groq => write!(f, "groq"),
            Self::Claude => write!(f, "claude"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            "claude" | "anthropic" => Ok(Self::Claude),
            "mock" => Ok(Self::Mock),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Relative price of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Free,
    Low,
    High,
}

/// A backend plus the model to call on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderSelection {
    pub kind: ProviderKind,
    pub model: String,
}

impl ProviderSelection {
    pub fn new(kind: ProviderKind, model: Option<String>) -> Self {
        Self {
            kind,
            model: model.unwrap_or_else(|| kind.default_model().to_string()),
        }
    }
}

impl fmt::Display for ProviderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.model)
    }
}

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u64,
    /// Ask the backend for a bare JSON object.
    pub structured_output: bool,
}

impl GenerateRequest {
    /// Question generation: creative, JSON.
    pub fn question(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 800,
            structured_output: true,
        }
    }

    /// Grading: near-deterministic, JSON.
    pub fn grading(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: 500,
            structured_output: true,
        }
    }

    /// Free-text summaries and explanations.
    pub fn summary(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 1200,
            structured_output: false,
        }
    }
}

/// What a built provider reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider: ProviderKind,
    pub display_name: String,
    pub model: String,
    pub base_url: String,
    pub context_window: u64,
    pub cost_tier: CostTier,
    pub supports_json: bool,
}

impl ProviderInfo {
    pub fn for_selection(selection: &ProviderSelection, base_url: &str) -> Self {
        let kind = selection.kind;
        Self {
            provider: kind,
            display_name: kind.display_name().to_string(),
            model: selection.model.clone(),
            base_url: base_url.to_string(),
            context_window: kind.context_window(&selection.model),
            cost_tier: kind.cost_tier(),
            supports_json: kind.supports_json_mode(),
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError>;

    fn info(&self) -> ProviderInfo;
}

/// Builds providers for selections. Construction fails fast on missing
/// credentials.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, selection: &ProviderSelection) -> Result<Arc<dyn LlmProvider>, ProviderError>;
}

struct Active {
    selection: ProviderSelection,
    provider: Arc<dyn LlmProvider>,
}

/// Default and escalation provider selections plus a client cache.
pub struct ProviderManager {
    factory: Arc<dyn ProviderFactory>,
    active: RwLock<Active>,
    escalation: ProviderSelection,
    cache: Mutex<HashMap<ProviderSelection, Arc<dyn LlmProvider>>>,
}

impl ProviderManager {
    /// Build the default and escalation providers eagerly so missing
    /// credentials for either surface at startup.
    pub fn new(
        factory: Arc<dyn ProviderFactory>,
        default: ProviderSelection,
        escalation: ProviderSelection,
    ) -> Result<Self, ProviderError> {
        let provider = factory.build(&default)?;
        let mut cache = HashMap::from([(default.clone(), provider.clone())]);
        if !cache.contains_key(&escalation) {
            cache.insert(escalation.clone(), factory.build(&escalation)?);
        }
        info!(provider = %default, escalation = %escalation, "provider manager ready");
        Ok(Self {
            factory,
            active: RwLock::new(Active {
                selection: default,
                provider,
            }),
            escalation,
            cache: Mutex::new(cache),
        })
    }

    pub fn active_selection(&self) -> ProviderSelection {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selection
            .clone()
    }

    pub fn escalation_selection(&self) -> &ProviderSelection {
        &self.escalation
    }

    /// Info for the active provider.
    pub fn provider_info(&self) -> ProviderInfo {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .provider
            .info()
    }

    /// Change the default provider. The new client is built first; on error
    /// the previous selection stays active.
    pub fn switch_provider(
        &self,
        kind: ProviderKind,
        model: Option<String>,
    ) -> Result<ProviderInfo, ProviderError> {
        let selection = ProviderSelection::new(kind, model);
        let provider = self.provider_for(&selection)?;
        let info = provider.info();
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        info!(from = %active.selection, to = %selection, "switching provider");
        *active = Active {
            selection,
            provider,
        };
        Ok(info)
    }

    /// Generate with the active provider.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let provider = self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .provider
            .clone();
        provider.generate(request).await
    }

    /// Generate with an explicit selection without touching the active one.
    pub async fn generate_with(
        &self,
        selection: &ProviderSelection,
        request: &GenerateRequest,
    ) -> Result<String, ProviderError> {
        let provider = self.provider_for(selection)?;
        debug!(provider = %selection, "explicit provider call");
        provider.generate(request).await
    }

    fn provider_for(
        &self,
        selection: &ProviderSelection,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(provider) = cache.get(selection) {
            return Ok(provider.clone());
        }
        let provider = self.factory.build(selection)?;
        cache.insert(selection.clone(), provider.clone());
        Ok(provider)
    }
}

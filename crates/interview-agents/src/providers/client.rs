//! Rig-backed providers for OpenAI-compatible chat endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::{debug, warn};

use super::{
    GenerateRequest, LlmProvider, MockProvider, ProviderError, ProviderFactory, ProviderInfo,
    ProviderKind, ProviderSelection,
};

const JSON_PREAMBLE: &str = "You are a helpful assistant. Always respond with valid JSON.";
const TEXT_PREAMBLE: &str = "You are a helpful assistant.";

/// Builds [`RigProvider`]s from configured credentials.
#[derive(Debug, Clone, Default)]
pub struct RigProviderFactory {
    api_keys: BTreeMap<ProviderKind, String>,
    base_urls: BTreeMap<ProviderKind, String>,
    allow_mock: bool,
    max_retries: u32,
}

impl RigProviderFactory {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.api_keys.insert(kind, key.into());
        self
    }

    pub fn with_base_url(mut self, kind: ProviderKind, url: impl Into<String>) -> Self {
        self.base_urls.insert(kind, url.into());
        self
    }

    pub fn allow_mock(mut self, allow: bool) -> Self {
        self.allow_mock = allow;
        self
    }

    pub fn base_url(&self, kind: ProviderKind) -> &str {
        self.base_urls
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_base_url())
    }
}

impl ProviderFactory for RigProviderFactory {
    fn build(&self, selection: &ProviderSelection) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let kind = selection.kind;
        let Some(env_var) = kind.api_key_env() else {
            if !self.allow_mock {
                return Err(ProviderError::MockDisabled);
            }
            warn!(model = %selection.model, "using mock LLM provider; responses are canned");
            return Ok(Arc::new(MockProvider::new(selection.model.clone())));
        };

        let api_key = self
            .api_keys
            .get(&kind)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingCredentials {
                provider: kind,
                env_var,
            })?;

        let base_url = self.base_url(kind).to_string();
        let client = openai::CompletionsClient::builder()
            .api_key(api_key)
            .base_url(&base_url)
            .build()
            .map_err(|e| ProviderError::ClientBuild {
                provider: kind,
                message: e.to_string(),
            })?;

        debug!(provider = %selection, base_url = %base_url, "built provider client");
        Ok(Arc::new(RigProvider {
            selection: selection.clone(),
            base_url,
            client,
            max_retries: self.max_retries,
        }))
    }
}

/// One backend/model pair behind a rig completions client.
pub struct RigProvider {
    selection: ProviderSelection,
    base_url: String,
    client: openai::CompletionsClient,
    max_retries: u32,
}

#[async_trait]
impl LlmProvider for RigProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let kind = self.selection.kind;
        let json_mode = request.structured_output && kind.supports_json_mode();
        let preamble = if request.structured_output {
            JSON_PREAMBLE
        } else {
            TEXT_PREAMBLE
        };

        let mut builder = self
            .client
            .agent(&self.selection.model)
            .preamble(preamble)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);
        if json_mode {
            builder = builder.additional_params(serde_json::json!({
                "response_format": { "type": "json_object" }
            }));
        }
        let agent = builder.build();

        let response = prompt_with_retry(&agent, &request.prompt, self.max_retries)
            .await
            .map_err(|e| {
                let message = e.to_string();
                let retriable = is_transient_error(&message, &message.to_ascii_lowercase());
                ProviderError::Inference {
                    provider: kind,
                    message,
                    retriable,
                }
            })?;

        if response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(kind));
        }
        Ok(response)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::for_selection(&self.selection, &self.base_url)
    }
}

/// Prompt with exponential backoff (2s, 4s, 8s, ...) on transient errors.
async fn prompt_with_retry(
    agent: &impl Prompt,
    prompt: &str,
    max_retries: u32,
) -> Result<String, rig::completion::PromptError> {
    let mut attempt = 0;
    loop {
        match agent.prompt(prompt).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                let err_str = format!("{e}");
                let err_lower = err_str.to_ascii_lowercase();
                if !is_transient_error(&err_str, &err_lower) || attempt >= max_retries {
                    return Err(e);
                }

                let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                warn!(
                    attempt = attempt + 1,
                    max_retries,
                    backoff_secs = backoff.as_secs(),
                    error = %err_str,
                    "Transient provider error, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

fn is_transient_error(err_str: &str, err_lower: &str) -> bool {
    // HTTP status codes
    err_str.contains("502")
        || err_str.contains("503")
        || err_str.contains("429")
        // Connection-level failures (reqwest)
        || err_lower.contains("connection")
        || err_lower.contains("timed out")
        || err_lower.contains("timeout")
        || err_lower.contains("error sending request")
        || err_lower.contains("broken pipe")
        || err_lower.contains("reset by peer")
        || err_lower.contains("response contained no message or tool call")
        || err_lower.contains("jsonerror")
}

/// Probe an OpenAI-compatible endpoint by listing its models.
///
/// Returns the HTTP status; any status means the host is reachable.
pub async fn check_endpoint(base_url: &str, api_key: Option<&str>) -> Result<u16, ProviderError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| ProviderError::Probe(e.to_string()))?;

    let url = format!("{}/models", base_url.trim_end_matches('/'));
    let mut request = client.get(&url);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Probe(format!("{url}: {e}")))?;
    Ok(response.status().as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient(msg: &str) -> bool {
        is_transient_error(msg, &msg.to_ascii_lowercase())
    }

    #[test]
    fn classifies_transient_errors() {
        assert!(transient("HTTP 503 Service Unavailable"));
        assert!(transient("429 Too Many Requests"));
        assert!(transient("error sending request for url"));
        assert!(transient("Connection reset by peer"));
        assert!(transient("operation Timed Out"));
        assert!(!transient("401 Unauthorized"));
        assert!(!transient("model not found"));
    }

    #[test]
    fn missing_key_fails_fast() {
        let factory = RigProviderFactory::new(0);
        let err = factory
            .build(&ProviderSelection::new(ProviderKind::Gemini, None))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ProviderError::MissingCredentials {
                provider: ProviderKind::Gemini,
                env_var: "GEMINI_API_KEY"
            }
        ));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let factory = RigProviderFactory::new(0).with_api_key(ProviderKind::Groq, "  ");
        assert!(factory
            .build(&ProviderSelection::new(ProviderKind::Groq, None))
            .is_err());
    }

    #[test]
    fn mock_requires_opt_in() {
        let selection = ProviderSelection::new(ProviderKind::Mock, None);
        assert!(matches!(
            RigProviderFactory::new(0).build(&selection).err(),
            Some(ProviderError::MockDisabled)
        ));
        let provider = RigProviderFactory::new(0)
            .allow_mock(true)
            .build(&selection)
            .unwrap();
        assert_eq!(provider.info().provider, ProviderKind::Mock);
    }

    #[test]
    fn configured_key_builds_client_with_base_url() {
        let factory = RigProviderFactory::new(2)
            .with_api_key(ProviderKind::Claude, "sk-test")
            .with_base_url(ProviderKind::Claude, "http://localhost:9999/v1");
        let provider = factory
            .build(&ProviderSelection::new(ProviderKind::Claude, None))
            .unwrap();
        let info = provider.info();
        assert_eq!(info.base_url, "http://localhost:9999/v1");
        assert_eq!(info.model, "claude-3-5-sonnet-20241022");
    }
}

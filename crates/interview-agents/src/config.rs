//! Interviewer configuration: TOML file, then environment overrides.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use assessment::grading::HybridPolicy;
use assessment::interview::InterviewPolicy;
use serde::{Deserialize, Serialize};

use crate::providers::{ProviderKind, ProviderSelection, RigProviderFactory};

/// Default retry budget for transient provider errors.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Provider selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Backend for ordinary calls.
    pub default: ProviderKind,
    /// Model override for `default`; the backend's default model when unset.
    pub model: Option<String>,
    /// Stronger backend used to re-grade low-confidence answers.
    pub escalation: ProviderKind,
    pub escalation_model: Option<String>,
    /// API keys by backend. Read from the environment, never written out.
    #[serde(skip_serializing)]
    pub api_keys: BTreeMap<ProviderKind, String>,
    /// Base URL overrides by backend.
    pub base_urls: BTreeMap<ProviderKind, String>,
    pub max_retries: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default: ProviderKind::Gemini,
            model: None,
            escalation: ProviderKind::Claude,
            escalation_model: None,
            api_keys: BTreeMap::new(),
            base_urls: BTreeMap::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ProvidersConfig {
    pub fn default_selection(&self) -> ProviderSelection {
        ProviderSelection::new(self.default, self.model.clone())
    }

    pub fn escalation_selection(&self) -> ProviderSelection {
        ProviderSelection::new(self.escalation, self.escalation_model.clone())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub providers: ProvidersConfig,
    pub policy: InterviewPolicy,
    pub grading: HybridPolicy,
    /// Seed for skill tie-breaking. Random when unset.
    pub seed: Option<u64>,
    /// Permit the canned mock provider.
    pub allow_mock_provider: bool,
}

impl InterviewConfig {
    /// Load from an optional TOML file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Apply `PROVIDER`, `MODEL_NAME`, `ESCALATION_PROVIDER`,
    /// `ESCALATION_MODEL`, the per-backend API key variables,
    /// `INTERVIEW_SEED` and `INTERVIEW_ALLOW_MOCK`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PROVIDER") {
            self.providers.default = v.parse().context("PROVIDER")?;
        }
        if let Some(v) = get("MODEL_NAME") {
            self.providers.model = Some(v);
        }
        if let Some(v) = get("ESCALATION_PROVIDER") {
            self.providers.escalation = v.parse().context("ESCALATION_PROVIDER")?;
        }
        if let Some(v) = get("ESCALATION_MODEL") {
            self.providers.escalation_model = Some(v);
        }
        for kind in [ProviderKind::Gemini, ProviderKind::Groq, ProviderKind::Claude] {
            if let Some(key) = kind.api_key_env().and_then(&get) {
                self.providers.api_keys.insert(kind, key);
            }
        }
        if let Some(v) = get("INTERVIEW_SEED") {
            self.seed = Some(
                v.trim()
                    .parse()
                    .with_context(|| format!("INTERVIEW_SEED is not a u64: {v}"))?,
            );
        }
        if let Some(v) = get("INTERVIEW_ALLOW_MOCK") {
            self.allow_mock_provider = matches!(v.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        self.policy.validate()?;
        self.grading.validate()?;
        let uses_mock = self.providers.default == ProviderKind::Mock
            || self.providers.escalation == ProviderKind::Mock;
        if uses_mock && !self.allow_mock_provider {
            return Err("mock provider selected but allow_mock_provider is false".to_string());
        }
        if self.providers.max_retries > 6 {
            return Err(format!(
                "max_retries must be <= 6, got {}",
                self.providers.max_retries
            ));
        }
        Ok(())
    }

    /// Provider factory carrying this config's credentials and URLs.
    pub fn provider_factory(&self) -> RigProviderFactory {
        let mut factory = RigProviderFactory::new(self.providers.max_retries)
            .allow_mock(self.allow_mock_provider);
        for (kind, key) in &self.providers.api_keys {
            factory = factory.with_api_key(*kind, key.clone());
        }
        for (kind, url) in &self.providers.base_urls {
            factory = factory.with_base_url(*kind, url.clone());
        }
        factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_validates() {
        let config = InterviewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.providers.default, ProviderKind::Gemini);
        assert_eq!(config.providers.escalation, ProviderKind::Claude);
        assert_eq!(config.policy.max_turns, 25);
    }

    #[test]
    fn env_overrides_providers_and_keys() {
        let mut config = InterviewConfig::default();
        config
            .apply_overrides(env(&[
                ("PROVIDER", "groq"),
                ("MODEL_NAME", "llama-3.3-70b-versatile"),
                ("GROQ_API_KEY", "gsk-test"),
                ("ANTHROPIC_API_KEY", "sk-ant"),
                ("INTERVIEW_SEED", "42"),
            ]))
            .unwrap();
        assert_eq!(config.providers.default_selection().kind, ProviderKind::Groq);
        assert_eq!(
            config.providers.default_selection().model,
            "llama-3.3-70b-versatile"
        );
        assert_eq!(config.providers.api_keys[&ProviderKind::Groq], "gsk-test");
        assert_eq!(config.providers.api_keys[&ProviderKind::Claude], "sk-ant");
        assert!(!config.providers.api_keys.contains_key(&ProviderKind::Gemini));
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn bad_env_values_are_errors() {
        let mut config = InterviewConfig::default();
        assert!(config.apply_overrides(env(&[("PROVIDER", "openai")])).is_err());
        assert!(config.apply_overrides(env(&[("INTERVIEW_SEED", "abc")])).is_err());
    }

    #[test]
    fn mock_needs_opt_in() {
        let mut config = InterviewConfig::default();
        config
            .apply_overrides(env(&[("PROVIDER", "mock")]))
            .unwrap();
        assert!(config.validate().is_err());
        config
            .apply_overrides(env(&[("INTERVIEW_ALLOW_MOCK", "1")]))
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_keys_are_not_serialized() {
        let mut config = InterviewConfig::default();
        config
            .providers
            .api_keys
            .insert(ProviderKind::Gemini, "secret".into());
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("secret"));
    }
}

//! Provider error taxonomy.
//!
//! Callers branch on [`ProviderError::is_retriable`] instead of matching on
//! message text.

use thiserror::Error;

use super::ProviderKind;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider's API key was not configured.
    #[error("{provider} requires {env_var} to be set")]
    MissingCredentials {
        provider: ProviderKind,
        env_var: &'static str,
    },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// The mock provider exists for offline runs and must be enabled explicitly.
    #[error("mock provider is disabled (set allow_mock_provider or INTERVIEW_ALLOW_MOCK=1)")]
    MockDisabled,

    #[error("failed to build {provider} client: {message}")]
    ClientBuild {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider} inference failed: {message}")]
    Inference {
        provider: ProviderKind,
        message: String,
        retriable: bool,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(ProviderKind),

    #[error("endpoint probe failed: {0}")]
    Probe(String),
}

impl ProviderError {
    /// Whether a later attempt against the same provider could succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Inference { retriable, .. } => *retriable,
            Self::EmptyResponse(_) => true,
            _ => false,
        }
    }
}

//! Offline provider returning canned responses keyed on prompt content.

use async_trait::async_trait;

use super::{
    GenerateRequest, LlmProvider, ProviderError, ProviderInfo, ProviderKind, ProviderSelection,
};

const MOCK_GRADE: &str = r#"{"scores_by_dimension":{"technical_accuracy":75,"completeness":70,"clarity":80},"total_score":75,"confidence":0.7,"error_tags":[],"feedback_short":"Good understanding with room for improvement"}"#;

const MOCK_QUESTION: &str = r#"{"question":"How would you add up the values in cells A1 through A10?","target_skill":"basic_formulas","difficulty":1,"expected_approach":"=SUM(A1:A10)"}"#;

const MOCK_TEXT: &str = "This is a mock response for development purposes.";

/// Development-only provider. Built only when mock use is enabled.
#[derive(Debug, Clone)]
pub struct MockProvider {
    selection: ProviderSelection,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            selection: ProviderSelection::new(ProviderKind::Mock, Some(model.into())),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, ProviderError> {
        let prompt = request.prompt.to_ascii_lowercase();
        let response = if prompt.contains("grading rubric") {
            MOCK_GRADE
        } else if request.structured_output && prompt.contains("question") {
            MOCK_QUESTION
        } else {
            MOCK_TEXT
        };
        Ok(response.to_string())
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::for_selection(&self.selection, ProviderKind::Mock.default_base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_by_prompt_kind() {
        let mock = MockProvider::new("mock-model");
        let grade = mock
            .generate(&GenerateRequest::grading("GRADING RUBRIC: ..."))
            .await
            .unwrap();
        assert!(grade.contains("total_score"));

        let question = mock
            .generate(&GenerateRequest::question("Generate a calibration question"))
            .await
            .unwrap();
        assert!(question.contains("target_skill"));

        let text = mock
            .generate(&GenerateRequest::summary("hello"))
            .await
            .unwrap();
        assert_eq!(text, MOCK_TEXT);
    }
}

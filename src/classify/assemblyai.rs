//! AssemblyAI sentiment provider implementation.

use super::{ClassifyError, EmotionProvider};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to availability probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// AssemblyAI text sentiment provider
pub struct AssemblyAiSentiment {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
}

#[derive(Debug, Serialize)]
struct SentimentRequest<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    sentiment: String,
}

impl AssemblyAiSentiment {
    /// Create a new sentiment provider
    pub fn new(settings: &ProviderSettings, language: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            language,
        }
    }

    /// Create a new provider with a custom HTTP client
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_client(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        language: String,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language,
        }
    }
}

#[async_trait]
impl EmotionProvider for AssemblyAiSentiment {
    async fn classify(&self, text: &str) -> Result<String, ClassifyError> {
        let request = SentimentRequest {
            text,
            language_code: &self.language,
        };

        let response = self
            .client
            .post(format!("{}/sentiment", self.base_url))
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { ClassifyError::Timeout } else { ClassifyError::Network(e) })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClassifyError::Api(format!(
                "AssemblyAI sentiment error ({}): {}",
                status, error_text
            )));
        }

        let result: SentimentResponse = response.json().await?;
        Ok(result.sentiment)
    }

    async fn check_availability(&self) -> bool {
        let request = SentimentRequest {
            text: "ping",
            language_code: &self.language,
        };

        let result = self
            .client
            .post(format!("{}/sentiment", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        "assemblyai-sentiment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: String) -> AssemblyAiSentiment {
        let settings = ProviderSettings {
            enabled: true,
            api_key: "test-key".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        };
        AssemblyAiSentiment::new(&settings, "en".to_string())
    }

    #[test]
    fn test_provider_creation() {
        let provider = test_provider("https://api.assemblyai.com/v2/".to_string());
        assert_eq!(provider.name(), "assemblyai-sentiment");
        assert_eq!(provider.base_url, "https://api.assemblyai.com/v2");
    }

    #[tokio::test]
    async fn test_classify_returns_raw_label() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sentiment"))
            .and(header("Authorization", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sentiment": "positive"
            })))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let label = provider.classify("a sunny meadow").await.unwrap();
        assert_eq!(label, "positive");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sentiment"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let err = provider.classify("anything").await.unwrap_err();
        assert!(matches!(err, ClassifyError::Api(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sentiment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sentiment": "neutral"
            })))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        assert!(provider.check_availability().await);
    }
}

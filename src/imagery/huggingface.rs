//! Hugging Face inference API image provider.

use super::{ImageData, ImageError, ImageProvider};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Timeout applied to availability probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Hugging Face text-to-image provider
///
/// One instance drives one model; the stage stacks two instances when a
/// fallback model is configured.
pub struct HuggingFaceImageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    num_inference_steps: u32,
    guidance_scale: f32,
    width: u32,
    height: u32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            num_inference_steps: 30,
            guidance_scale: 7.5,
            width: 512,
            height: 512,
        }
    }
}

impl HuggingFaceImageProvider {
    /// Create a new provider for a specific model
    pub fn new(settings: &ProviderSettings, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Create a new provider with a custom HTTP client
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_client(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        model: String,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceImageProvider {
    async fn generate(&self, prompt: &str) -> Result<ImageData, ImageError> {
        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters::default(),
        };

        let response = self
            .client
            .post(self.model_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { ImageError::Timeout } else { ImageError::Network(e) })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ImageError::Api(format!(
                "Hugging Face API error ({}): {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ImageError::Api(
                "Hugging Face returned an empty image payload".to_string(),
            ));
        }

        Ok(ImageData { bytes, content_type })
    }

    async fn check_availability(&self) -> bool {
        let result = self
            .client
            .get(self.model_url())
            .timeout(PROBE_TIMEOUT)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: String) -> HuggingFaceImageProvider {
        let settings = ProviderSettings {
            enabled: true,
            api_key: "test-key".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        };
        HuggingFaceImageProvider::new(&settings, "test-model".to_string())
    }

    #[test]
    fn test_provider_creation() {
        let provider = test_provider("https://api-inference.huggingface.co/".to_string());
        assert_eq!(provider.name(), "huggingface");
        assert_eq!(
            provider.model_url(),
            "https://api-inference.huggingface.co/models/test-model"
        );
    }

    #[tokio::test]
    async fn test_generate_returns_image_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {
                    "num_inference_steps": 30,
                    "width": 512,
                    "height": 512
                }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3, 4], "image/jpeg"),
            )
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let image = provider.generate("a tower of glass").await.unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3, 4]);
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let err = provider.generate("anything").await.unwrap_err();
        assert!(matches!(err, ImageError::Api(_)));
        assert!(err.to_string().contains("model loading"));
    }

    #[tokio::test]
    async fn test_empty_payload_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "image/png"))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let err = provider.generate("anything").await.unwrap_err();
        assert!(matches!(err, ImageError::Api(_)));
    }

    #[tokio::test]
    async fn test_probe() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models/test-model"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        assert!(provider.check_availability().await);
    }
}

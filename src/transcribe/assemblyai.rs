//! AssemblyAI transcription provider implementation.
//!
//! Upload-then-poll protocol: raw audio bytes go to `/upload`, a transcript
//! job is created from the returned URL, and `/transcript/{id}` is polled
//! until the job reaches a terminal status.

use super::{TranscribeError, TranscriptionProvider};
use crate::audio::AudioSource;
use crate::config::ProviderSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to availability probes
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// AssemblyAI speech-to-text provider
pub struct AssemblyAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
    poll_interval: Duration,
    poll_attempts: u32,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptStatus {
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AssemblyAiTranscriber {
    /// Create a new AssemblyAI provider
    ///
    /// # Arguments
    /// * `settings` - Provider connection settings (key, base URL, timeout)
    /// * `language` - Language code sent with transcript requests
    /// * `poll_interval` - Delay between status polls
    /// * `poll_attempts` - Maximum status polls before giving up
    pub fn new(
        settings: &ProviderSettings,
        language: String,
        poll_interval: Duration,
        poll_attempts: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            language,
            poll_interval,
            poll_attempts,
        }
    }

    /// Create a new provider with a custom HTTP client
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_client(
        client: reqwest::Client,
        api_key: String,
        base_url: String,
        language: String,
        poll_interval: Duration,
        poll_attempts: u32,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            language,
            poll_interval,
            poll_attempts,
        }
    }

    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, TranscribeError> {
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header("Authorization", &self.api_key)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { TranscribeError::Timeout } else { TranscribeError::Network(e) })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranscribeError::Api(format!(
                "AssemblyAI upload error ({}): {}",
                status, error_text
            )));
        }

        let result: UploadResponse = response.json().await?;
        Ok(result.upload_url)
    }

    async fn create_transcript(&self, audio_url: &str) -> Result<String, TranscribeError> {
        let request = TranscriptRequest {
            audio_url,
            language_code: &self.language,
        };

        let response = self
            .client
            .post(format!("{}/transcript", self.base_url))
            .header("Authorization", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { TranscribeError::Timeout } else { TranscribeError::Network(e) })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TranscribeError::Api(format!(
                "AssemblyAI transcript error ({}): {}",
                status, error_text
            )));
        }

        let result: CreateResponse = response.json().await?;
        Ok(result.id)
    }

    async fn poll_transcript(&self, id: &str) -> Result<String, TranscribeError> {
        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let response = self
                .client
                .get(format!("{}/transcript/{}", self.base_url, id))
                .header("Authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| if e.is_timeout() { TranscribeError::Timeout } else { TranscribeError::Network(e) })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(TranscribeError::Api(format!(
                    "AssemblyAI status error ({}): {}",
                    status, error_text
                )));
            }

            let result: TranscriptStatus = response.json().await?;
            match result.status.as_str() {
                "completed" => return Ok(result.text.unwrap_or_default()),
                "error" => {
                    return Err(TranscribeError::Api(format!(
                        "AssemblyAI transcription failed: {}",
                        result.error.unwrap_or_else(|| "unknown".to_string())
                    )))
                }
                other => {
                    log::debug!(
                        "Transcription: status '{}' (poll {}/{})",
                        other,
                        attempt,
                        self.poll_attempts
                    );
                }
            }
        }

        Err(TranscribeError::PollExhausted(self.poll_attempts))
    }
}

#[async_trait]
impl TranscriptionProvider for AssemblyAiTranscriber {
    async fn transcribe(&self, audio: &AudioSource) -> Result<String, TranscribeError> {
        let bytes = audio
            .read_bytes()
            .map_err(|e| TranscribeError::Audio(e.to_string()))?;

        let upload_url = self.upload(bytes, audio.content_type()).await?;
        let transcript_id = self.create_transcript(&upload_url).await?;
        self.poll_transcript(&transcript_id).await
    }

    async fn check_availability(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/transcript?limit=1", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .header("Authorization", &self.api_key)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        "assemblyai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: String) -> AssemblyAiTranscriber {
        let settings = ProviderSettings {
            enabled: true,
            api_key: "test-key".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        };
        AssemblyAiTranscriber::new(&settings, "en".to_string(), Duration::ZERO, 3)
    }

    #[test]
    fn test_provider_creation() {
        let provider = test_provider("https://api.assemblyai.com/v2/".to_string());
        assert_eq!(provider.name(), "assemblyai");
        assert_eq!(provider.base_url, "https://api.assemblyai.com/v2");
    }

    #[tokio::test]
    async fn test_upload_create_poll_flow() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("Authorization", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upload_url": "https://cdn.example/audio/1"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "t-1"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/transcript/t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "completed",
                "text": "I dreamed of a quiet sea"
            })))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let audio = AudioSource::from_capture(vec![0u8; 32]);
        let text = provider.transcribe(&audio).await.unwrap();
        assert_eq!(text, "I dreamed of a quiet sea");
    }

    #[tokio::test]
    async fn test_terminal_error_status_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upload_url": "https://cdn.example/audio/2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "t-2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/transcript/t-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "error",
                "error": "audio too short"
            })))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let audio = AudioSource::from_capture(vec![0u8; 32]);
        let err = provider.transcribe(&audio).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Api(_)));
        assert!(err.to_string().contains("audio too short"));
    }

    #[tokio::test]
    async fn test_poll_exhaustion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "upload_url": "https://cdn.example/audio/3"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "t-3"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/transcript/t-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "processing"
            })))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        let audio = AudioSource::from_capture(vec![0u8; 32]);
        let err = provider.transcribe(&audio).await.unwrap_err();
        assert!(matches!(err, TranscribeError::PollExhausted(3)));
    }

    #[tokio::test]
    async fn test_probe_reports_unreachable_as_false() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/transcript"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = test_provider(server.uri());
        assert!(!provider.check_availability().await);
    }
}

//! Transcription stage: audio narration to text.
//!
//! The stage tries the configured speech-to-text provider first and falls
//! back to a pseudo-random sample narrative, so a dream submission always
//! produces text even with no provider configured.

mod assemblyai;

pub use assemblyai::AssemblyAiTranscriber;

use crate::audio::AudioSource;
use crate::config::Settings;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed pool of fallback dream narratives.
///
/// The mock path only ever returns one of these.
pub const SAMPLE_NARRATIVES: [&str; 5] = [
    "I was walking through a mysterious forest where the trees seemed alive. A soft wind carried distant voices that kept calling my name.",
    "I was flying over a futuristic city with towers that reached into the clouds. Lights glowed in every color imaginable below me.",
    "I found myself in a house I had never seen, yet every room felt familiar. Each door I opened led me toward a new discovery.",
    "I was alone on a deserted beach at sunset. The waves were calm and I felt like the only person in the world.",
    "I was running through an endless maze whose walls kept shifting around me. I knew something important was waiting at the center.",
];

/// Errors that can occur during transcription
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Audio input error: {0}")]
    Audio(String),

    #[error("Timeout: transcription took too long")]
    Timeout,

    #[error("Transcription still pending after {0} status checks")]
    PollExhausted(u32),

    #[error("Lock error: {0}")]
    Lock(String),
}

/// Trait for transcription providers
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe an audio submission to text
    async fn transcribe(&self, audio: &AudioSource) -> Result<String, TranscribeError>;

    /// Lightweight reachability check for the capability probe
    async fn check_availability(&self) -> bool;

    /// Get the name of this provider
    fn name(&self) -> &'static str;
}

/// Fallback transcriber returning narratives from [`SAMPLE_NARRATIVES`].
///
/// Selection is pseudo-random through an injected rng so tests can pin the
/// seed. The simulated delay exists purely for perceived responsiveness and
/// is zero in tests.
pub struct MockTranscriber {
    rng: Mutex<StdRng>,
    delay: Duration,
}

impl MockTranscriber {
    pub fn new(delay: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            delay,
        }
    }

    /// Create a mock with a pinned seed (deterministic selection)
    pub fn with_seed(seed: u64, delay: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            delay,
        }
    }

    pub async fn transcribe(&self) -> Result<String, TranscribeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let index = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|e| TranscribeError::Lock(e.to_string()))?;
            rng.random_range(0..SAMPLE_NARRATIVES.len())
        };

        Ok(SAMPLE_NARRATIVES[index].to_string())
    }
}

/// Transcription stage with the provider-then-fallback contract.
pub struct TranscriptionStage {
    provider: Option<Arc<dyn TranscriptionProvider>>,
    mock: MockTranscriber,
}

impl TranscriptionStage {
    pub fn new(provider: Option<Arc<dyn TranscriptionProvider>>, mock: MockTranscriber) -> Self {
        Self { provider, mock }
    }

    /// Build the stage from settings, wiring the stock provider when its
    /// key is present.
    pub fn from_settings(settings: &Settings) -> Self {
        let provider: Option<Arc<dyn TranscriptionProvider>> =
            if settings.transcription.is_configured() {
                Some(Arc::new(AssemblyAiTranscriber::new(
                    &settings.transcription,
                    settings.language.clone(),
                    settings.poll_interval,
                    settings.poll_attempts,
                )))
            } else {
                None
            };

        Self::new(provider, MockTranscriber::new(settings.mock_delay))
    }

    /// Transcribe audio, absorbing provider failures into the mock path.
    ///
    /// An error here means even the fallback could not run; the returned
    /// text is never empty.
    pub async fn transcribe(&self, audio: &AudioSource) -> Result<String, TranscribeError> {
        if let Some(provider) = &self.provider {
            log::info!("Transcription: trying provider '{}'", provider.name());
            match provider.transcribe(audio).await {
                Ok(text) if !text.trim().is_empty() => {
                    let text = text.trim().to_string();
                    log::info!(
                        "Transcription: provider '{}' returned {} chars",
                        provider.name(),
                        text.len()
                    );
                    return Ok(text);
                }
                Ok(_) => {
                    log::warn!(
                        "Transcription: provider '{}' returned empty text, using sample narrative",
                        provider.name()
                    );
                }
                Err(e) => {
                    log::warn!(
                        "Transcription: provider '{}' failed ({}), using sample narrative",
                        provider.name(),
                        e
                    );
                }
            }
        } else {
            log::info!("Transcription: no provider configured, using sample narrative");
        }

        self.mock.transcribe().await
    }

    /// Probe the configured provider; `false` when none is configured.
    pub async fn probe_provider(&self) -> bool {
        match &self.provider {
            Some(provider) => provider.check_availability().await,
            None => false,
        }
    }
}

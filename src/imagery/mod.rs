//! Dream imagery synthesis stage.
//!
//! The transcription is turned into a generation prompt enriched with a
//! per-emotion visual style, then offered to the configured providers in
//! priority order. Provider output is persisted to the local media directory;
//! when every provider is out of reach the stage hands back a deterministic
//! placeholder reference keyed by emotion, so a run always ends with an image.

mod huggingface;

pub use huggingface::HuggingFaceImageProvider;

use crate::config::Settings;
use crate::emotion::Emotion;
use crate::media::{MediaError, MediaStore};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Generic style descriptors appended to every prompt
const QUALITY_SUFFIX: &str =
    "high quality, detailed, artistic, dreamlike, surreal, beautiful composition";

/// Errors that can occur during image generation
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timed out")]
    Timeout,
}

/// Raw image payload returned by a provider
#[derive(Debug)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Trait for text-to-image providers
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate an image from a prompt
    async fn generate(&self, prompt: &str) -> Result<ImageData, ImageError>;

    /// Check if the provider is reachable and authorized
    async fn check_availability(&self) -> bool;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

fn style_descriptor(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Joyful => "vibrant colors, bright lighting, cheerful atmosphere, dreamy, magical",
        Emotion::Stressful => {
            "dark atmosphere, dramatic lighting, intense shadows, surreal, nightmarish"
        }
        Emotion::Neutral => "balanced composition, natural lighting, calm atmosphere, realistic",
        Emotion::Mysterious => "mysterious atmosphere, fog, shadows, enigmatic, ethereal",
        Emotion::Peaceful => "soft lighting, gentle colors, serene atmosphere, peaceful, tranquil",
        Emotion::Intense => "dynamic composition, bold colors, powerful atmosphere, dramatic",
    }
}

fn default_prompt(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Joyful => "a colorful garden with dancing flowers",
        Emotion::Stressful => "a dark hallway with looming shadows",
        Emotion::Neutral => "an urban landscape at dusk",
        Emotion::Mysterious => "an ancient house full of hidden secrets",
        Emotion::Peaceful => "a calm lake reflecting the mountains",
        Emotion::Intense => "an explosion of color and energy",
    }
}

/// Build the generation prompt for a transcription
///
/// Blank text is replaced with a fixed per-emotion default so providers are
/// never asked to render an empty prompt.
pub fn enhance_prompt(text: &str, emotion: Emotion) -> String {
    let trimmed = text.trim();
    let prompt = if trimmed.is_empty() {
        default_prompt(emotion)
    } else {
        trimmed
    };
    format!("{}, {}, {}", prompt, style_descriptor(emotion), QUALITY_SUFFIX)
}

/// Deterministic placeholder image reference for an emotion
pub fn placeholder_reference(emotion: Emotion) -> String {
    let n = match emotion {
        Emotion::Joyful => 1,
        Emotion::Stressful => 2,
        Emotion::Neutral => 3,
        Emotion::Mysterious => 4,
        Emotion::Peaceful => 5,
        Emotion::Intense => 6,
    };
    format!("https://picsum.photos/512/512?random={}&blur=2", n)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// Image synthesis stage with provider priority order and placeholder fallback
pub struct ImageStage {
    providers: Vec<Arc<dyn ImageProvider>>,
    media: Arc<MediaStore>,
}

impl ImageStage {
    /// Create a stage with an explicit provider list
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>, media: Arc<MediaStore>) -> Self {
        Self { providers, media }
    }

    /// Build the stage from runtime settings
    ///
    /// The primary model and the optional fallback model share the provider
    /// credentials; the fallback is only attempted after the primary fails.
    pub fn from_settings(settings: &Settings, media: Arc<MediaStore>) -> Self {
        let mut providers: Vec<Arc<dyn ImageProvider>> = Vec::new();
        if settings.image.provider.is_configured() {
            providers.push(Arc::new(HuggingFaceImageProvider::new(
                &settings.image.provider,
                settings.image.model.clone(),
            )));
            if let Some(fallback) = &settings.image.fallback_model {
                providers.push(Arc::new(HuggingFaceImageProvider::new(
                    &settings.image.provider,
                    fallback.clone(),
                )));
            }
        }
        Self { providers, media }
    }

    /// Synthesize an image for a transcription and its emotion
    ///
    /// Returns a local file path when a provider delivered, otherwise the
    /// per-emotion placeholder reference.
    pub async fn synthesize(&self, text: &str, emotion: Emotion) -> String {
        let prompt = enhance_prompt(text, emotion);

        for provider in &self.providers {
            match provider.generate(&prompt).await {
                Ok(image) => match self.persist(&image) {
                    Ok(reference) => {
                        log::info!("Imagery: image generated via {}", provider.name());
                        return reference;
                    }
                    Err(e) => {
                        log::warn!(
                            "Imagery: failed to persist image from {}: {}",
                            provider.name(),
                            e
                        );
                    }
                },
                Err(e) => {
                    log::warn!("Imagery: provider {} failed: {}", provider.name(), e);
                }
            }
        }

        log::info!("Imagery: using placeholder image for {}", emotion);
        placeholder_reference(emotion)
    }

    fn persist(&self, image: &ImageData) -> Result<String, MediaError> {
        let id = Uuid::new_v4().to_string();
        let path = self
            .media
            .save_image(&id, extension_for(&image.content_type), &image.bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Check whether any configured provider is reachable
    pub async fn probe_providers(&self) -> bool {
        for provider in &self.providers {
            if provider.check_availability().await {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct StaticProvider;

    #[async_trait]
    impl ImageProvider for StaticProvider {
        async fn generate(&self, _prompt: &str) -> Result<ImageData, ImageError> {
            Ok(ImageData {
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
                content_type: "image/png".to_string(),
            })
        }

        async fn check_availability(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ImageProvider for FailingProvider {
        async fn generate(&self, _prompt: &str) -> Result<ImageData, ImageError> {
            Err(ImageError::Api("simulated outage".to_string()))
        }

        async fn check_availability(&self) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn test_stage(providers: Vec<Arc<dyn ImageProvider>>) -> (ImageStage, TempDir) {
        let dir = TempDir::new().unwrap();
        let media = Arc::new(MediaStore::new(dir.path()));
        (ImageStage::new(providers, media), dir)
    }

    #[test]
    fn test_blank_text_uses_default_prompt() {
        for emotion in Emotion::ALL {
            let prompt = enhance_prompt("   ", emotion);
            assert!(prompt.starts_with(default_prompt(emotion)));
            assert!(prompt.ends_with(QUALITY_SUFFIX));
        }
    }

    #[test]
    fn test_prompt_enhancement_format() {
        let prompt = enhance_prompt("a silver river under two moons", Emotion::Joyful);
        assert_eq!(
            prompt,
            "a silver river under two moons, vibrant colors, bright lighting, \
             cheerful atmosphere, dreamy, magical, high quality, detailed, \
             artistic, dreamlike, surreal, beautiful composition"
        );
    }

    #[test]
    fn test_placeholder_references_are_distinct() {
        let refs: Vec<String> = Emotion::ALL.iter().map(|e| placeholder_reference(*e)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert!(r.contains(&format!("random={}", i + 1)));
        }
        assert!(placeholder_reference(Emotion::Neutral).contains("random=3"));
    }

    #[tokio::test]
    async fn test_no_providers_yields_placeholder() {
        let (stage, _dir) = test_stage(vec![]);
        let reference = stage.synthesize("a tower of glass", Emotion::Mysterious).await;
        assert_eq!(reference, placeholder_reference(Emotion::Mysterious));
        assert!(!stage.probe_providers().await);
    }

    #[tokio::test]
    async fn test_failing_provider_falls_back_to_placeholder() {
        let (stage, _dir) = test_stage(vec![Arc::new(FailingProvider)]);
        let reference = stage.synthesize("a tower of glass", Emotion::Intense).await;
        assert_eq!(reference, placeholder_reference(Emotion::Intense));
    }

    #[tokio::test]
    async fn test_provider_bytes_are_persisted() {
        let (stage, dir) = test_stage(vec![Arc::new(FailingProvider), Arc::new(StaticProvider)]);
        let reference = stage.synthesize("a tower of glass", Emotion::Joyful).await;
        assert!(reference.ends_with(".png"));
        assert!(reference.starts_with(dir.path().to_str().unwrap()));
        let saved = std::fs::read(&reference).unwrap();
        assert_eq!(saved, vec![0x89, 0x50, 0x4e, 0x47]);
    }
}

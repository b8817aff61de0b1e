//! Emotion classification stage.
//!
//! A remote sentiment provider supplies the first opinion when one is
//! configured. Provider labels map onto the journal's fixed emotion set; a
//! neutral or unrecognized answer is refined with keyword scans over the
//! transcription and otherwise stays neutral. The positive/negative tone
//! count backs only the local path, when no provider answered at all.

mod assemblyai;

pub use assemblyai::AssemblyAiSentiment;

use crate::config::Settings;
use crate::emotion::Emotion;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// Keyword sets scanned in priority order when refining a neutral or
/// unmapped result. The first set with a hit wins.
const MYSTERIOUS_KEYWORDS: [&str; 7] = [
    "mysterious",
    "strange",
    "unknown",
    "secret",
    "hidden",
    "obscure",
    "enigmatic",
];

const PEACEFUL_KEYWORDS: [&str; 7] = [
    "calm", "quiet", "serene", "peaceful", "gentle", "soothing", "zen",
];

const INTENSE_KEYWORDS: [&str; 7] = [
    "intense",
    "powerful",
    "vivid",
    "dramatic",
    "passionate",
    "energetic",
    "dynamic",
];

const POSITIVE_WORDS: [&str; 8] = [
    "good", "beautiful", "happy", "joy", "love", "smile", "light", "color",
];

const NEGATIVE_WORDS: [&str; 8] = [
    "bad", "fear", "dread", "dark", "danger", "running", "lost", "stress",
];

/// Errors that can occur during emotion classification
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timed out")]
    Timeout,
}

/// Trait for remote emotion/sentiment providers
///
/// Implementations return their own label vocabulary; mapping onto the
/// journal's emotion set happens in the stage.
#[async_trait]
pub trait EmotionProvider: Send + Sync {
    /// Classify the emotional tone of a piece of text
    async fn classify(&self, text: &str) -> Result<String, ClassifyError>;

    /// Check if the provider is reachable and authorized
    async fn check_availability(&self) -> bool;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Translate a provider label into the journal's emotion vocabulary
fn map_label(label: &str) -> Option<Emotion> {
    match label.trim().to_lowercase().as_str() {
        "happy" | "excited" | "joyful" | "positive" => Some(Emotion::Joyful),
        "sad" | "angry" | "fearful" | "anxious" | "negative" => Some(Emotion::Stressful),
        "neutral" => Some(Emotion::Neutral),
        "calm" | "peaceful" => Some(Emotion::Peaceful),
        "mysterious" => Some(Emotion::Mysterious),
        "intense" | "passionate" => Some(Emotion::Intense),
        _ => None,
    }
}

/// Scan the keyword sets in priority order, first match wins
fn refine_keywords(text: &str) -> Option<Emotion> {
    let lowered = text.to_lowercase();
    for (keywords, emotion) in [
        (&MYSTERIOUS_KEYWORDS[..], Emotion::Mysterious),
        (&PEACEFUL_KEYWORDS[..], Emotion::Peaceful),
        (&INTENSE_KEYWORDS[..], Emotion::Intense),
    ] {
        if keywords.iter().any(|k| lowered.contains(k)) {
            return Some(emotion);
        }
    }
    None
}

/// Count positive and negative tone words; ties stay neutral
fn tone_heuristic(text: &str) -> Emotion {
    let lowered = text.to_lowercase();
    let positive = POSITIVE_WORDS
        .iter()
        .filter(|w| lowered.contains(*w))
        .count();
    let negative = NEGATIVE_WORDS
        .iter()
        .filter(|w| lowered.contains(*w))
        .count();

    match positive.cmp(&negative) {
        Ordering::Greater => Emotion::Joyful,
        Ordering::Less => Emotion::Stressful,
        Ordering::Equal => Emotion::Neutral,
    }
}

/// Local analysis for the no-provider and failed-call paths
fn analyze_text(text: &str) -> Emotion {
    if let Some(emotion) = refine_keywords(text) {
        return emotion;
    }
    tone_heuristic(text)
}

/// Emotion classification stage with provider and local fallback
///
/// A confident non-neutral provider answer is kept as-is. A neutral answer or
/// an unrecognized label is refined against the keyword sets and otherwise
/// stays neutral. Only a provider error, or no provider at all, falls through
/// to full local analysis. The stage always yields an emotion.
pub struct EmotionStage {
    provider: Option<Arc<dyn EmotionProvider>>,
}

impl EmotionStage {
    /// Create a stage with an explicit provider (or none)
    pub fn new(provider: Option<Arc<dyn EmotionProvider>>) -> Self {
        Self { provider }
    }

    /// Build the stage from runtime settings
    pub fn from_settings(settings: &Settings) -> Self {
        let provider: Option<Arc<dyn EmotionProvider>> = if settings.emotion.is_configured() {
            Some(Arc::new(AssemblyAiSentiment::new(
                &settings.emotion,
                settings.language.clone(),
            )))
        } else {
            None
        };
        Self { provider }
    }

    /// Classify the emotional tone of a transcription
    pub async fn classify(&self, text: &str) -> Emotion {
        if let Some(provider) = &self.provider {
            match provider.classify(text).await {
                Ok(label) => match map_label(&label) {
                    Some(Emotion::Neutral) => {
                        log::debug!("Classification: provider reported neutral, refining keywords");
                        return refine_keywords(text).unwrap_or(Emotion::Neutral);
                    }
                    Some(emotion) => return emotion,
                    None => {
                        log::warn!(
                            "Classification: unrecognized label '{}' from {}",
                            label,
                            provider.name()
                        );
                        return refine_keywords(text).unwrap_or(Emotion::Neutral);
                    }
                },
                Err(e) => {
                    log::warn!(
                        "Classification: provider {} failed ({}), analyzing locally",
                        provider.name(),
                        e
                    );
                }
            }
        }
        analyze_text(text)
    }

    /// Check whether the remote provider is reachable
    pub async fn probe_provider(&self) -> bool {
        match &self.provider {
            Some(provider) => provider.check_availability().await,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLabel(&'static str);

    #[async_trait]
    impl EmotionProvider for FixedLabel {
        async fn classify(&self, _text: &str) -> Result<String, ClassifyError> {
            Ok(self.0.to_string())
        }

        async fn check_availability(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmotionProvider for FailingProvider {
        async fn classify(&self, _text: &str) -> Result<String, ClassifyError> {
            Err(ClassifyError::Api("simulated outage".to_string()))
        }

        async fn check_availability(&self) -> bool {
            false
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(map_label("happy"), Some(Emotion::Joyful));
        assert_eq!(map_label("FEARFUL"), Some(Emotion::Stressful));
        assert_eq!(map_label(" positive "), Some(Emotion::Joyful));
        assert_eq!(map_label("passionate"), Some(Emotion::Intense));
        assert_eq!(map_label("neutral"), Some(Emotion::Neutral));
        assert_eq!(map_label("bewildered"), None);
    }

    #[test]
    fn test_keyword_order_prefers_mysterious() {
        assert_eq!(
            analyze_text("a strange and vivid corridor"),
            Emotion::Mysterious
        );
    }

    #[test]
    fn test_keywords_beat_tone_words() {
        assert_eq!(
            analyze_text("a calm morning full of love and light"),
            Emotion::Peaceful
        );
    }

    #[test]
    fn test_tone_counts_decide_when_no_keywords_match() {
        assert_eq!(analyze_text("love and light everywhere"), Emotion::Joyful);
        assert_eq!(analyze_text("running from danger"), Emotion::Stressful);
        assert_eq!(analyze_text("the good dark"), Emotion::Neutral);
    }

    #[test]
    fn test_empty_and_non_latin_text_default_neutral() {
        assert_eq!(analyze_text(""), Emotion::Neutral);
        assert_eq!(analyze_text("夢の中で空を飛んだ"), Emotion::Neutral);
    }

    #[tokio::test]
    async fn test_confident_provider_answer_is_kept() {
        let stage = EmotionStage::new(Some(Arc::new(FixedLabel("happy"))));
        assert_eq!(stage.classify("a strange place").await, Emotion::Joyful);
    }

    #[tokio::test]
    async fn test_provider_neutral_is_refined() {
        let stage = EmotionStage::new(Some(Arc::new(FixedLabel("neutral"))));
        assert_eq!(stage.classify("a strange place").await, Emotion::Mysterious);
    }

    #[tokio::test]
    async fn test_provider_neutral_without_keyword_match_stays_neutral() {
        let stage = EmotionStage::new(Some(Arc::new(FixedLabel("neutral"))));
        assert_eq!(
            stage.classify("love and light everywhere").await,
            Emotion::Neutral
        );
    }

    #[tokio::test]
    async fn test_unknown_label_is_refined_by_keywords() {
        let stage = EmotionStage::new(Some(Arc::new(FixedLabel("bewildered"))));
        assert_eq!(stage.classify("quiet and serene").await, Emotion::Peaceful);
    }

    #[tokio::test]
    async fn test_unmapped_label_without_keyword_match_stays_neutral() {
        let stage = EmotionStage::new(Some(Arc::new(FixedLabel("bewildered"))));
        assert_eq!(
            stage.classify("love and light everywhere").await,
            Emotion::Neutral
        );
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_local_analysis() {
        let stage = EmotionStage::new(Some(Arc::new(FailingProvider)));
        assert_eq!(stage.classify("running from danger").await, Emotion::Stressful);
    }

    #[tokio::test]
    async fn test_no_provider_uses_local_analysis() {
        let stage = EmotionStage::new(None);
        assert_eq!(
            stage.classify("love and light everywhere").await,
            Emotion::Joyful
        );
        assert!(!stage.probe_provider().await);
    }
}

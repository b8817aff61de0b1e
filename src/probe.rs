//! Startup capability probe.

use crate::classify::EmotionStage;
use crate::imagery::ImageStage;
use crate::transcribe::TranscriptionStage;

/// Availability snapshot across all provider-backed stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityStatus {
    pub transcription: bool,
    pub emotion: bool,
    pub image: bool,
    pub mock: bool,
}

impl CapabilityStatus {
    pub fn available_count(&self) -> usize {
        self.as_entries().iter().filter(|(_, up)| *up).count()
    }

    pub fn as_entries(&self) -> [(&'static str, bool); 4] {
        [
            ("transcription", self.transcription),
            ("emotion", self.emotion),
            ("image", self.image),
            ("mock", self.mock),
        ]
    }
}

/// Probe every configured provider concurrently
///
/// Each probe is bounded by a short per-request timeout inside the provider;
/// an unreachable or unconfigured provider reports `false`, never an error.
/// The mock fallback needs no network and is always available, so a probe can
/// not leave the pipeline without a working path.
pub async fn probe_capabilities(
    transcription: &TranscriptionStage,
    emotion: &EmotionStage,
    imagery: &ImageStage,
) -> CapabilityStatus {
    let (transcription, emotion, image) = tokio::join!(
        transcription.probe_provider(),
        emotion.probe_provider(),
        imagery.probe_providers(),
    );

    let status = CapabilityStatus {
        transcription,
        emotion,
        image,
        mock: true,
    };
    log::info!(
        "Probe: {}/4 capabilities available",
        status.available_count()
    );
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaStore;
    use crate::transcribe::MockTranscriber;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unconfigured_stages_probe_false_except_mock() {
        let dir = TempDir::new().unwrap();
        let transcription = TranscriptionStage::new(None, MockTranscriber::with_seed(1, Duration::ZERO));
        let emotion = EmotionStage::new(None);
        let imagery = ImageStage::new(vec![], Arc::new(MediaStore::new(dir.path())));

        let status = probe_capabilities(&transcription, &emotion, &imagery).await;
        assert!(!status.transcription);
        assert!(!status.emotion);
        assert!(!status.image);
        assert!(status.mock);
        assert_eq!(status.available_count(), 1);
    }

    #[test]
    fn test_entries_cover_all_capabilities() {
        let status = CapabilityStatus {
            transcription: true,
            emotion: false,
            image: true,
            mock: true,
        };
        let names: Vec<&str> = status.as_entries().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["transcription", "emotion", "image", "mock"]);
        assert_eq!(status.available_count(), 3);
    }
}

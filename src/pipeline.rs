//! Dream capture pipeline.
//!
//! Drives one audio submission through transcription, emotion analysis, and
//! imagery in strict sequence, publishing every state transition on a watch
//! channel. Exactly one run is in flight at a time; a finished run holds its
//! draft until it is saved into the journal or discarded.

use crate::audio::{AudioError, AudioSource};
use crate::classify::EmotionStage;
use crate::config::Settings;
use crate::emotion::Emotion;
use crate::imagery::ImageStage;
use crate::journal::{DreamJournal, DreamRecord, JournalError};
use crate::media::{MediaError, MediaStore};
use crate::transcribe::TranscriptionStage;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Largest accepted audio payload
pub const MAX_AUDIO_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Processing steps reported to progress consumers
const TOTAL_STEPS: u32 = 3;

/// Errors surfaced by the pipeline
///
/// Stage internals are absorbed behind their fallbacks; what escapes here is
/// either a submission problem the user can fix or a terminal run failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    /// Detail is logged; the display form stays generic for the user.
    #[error("an error occurred during processing")]
    Stage(String),

    #[error("A dream is already being processed")]
    AlreadyProcessing,

    #[error("No completed dream to save")]
    NothingToSave,

    #[error("Processing was cancelled")]
    Cancelled,

    #[error("Audio is too large ({0} bytes, limit {1})")]
    AudioTooLarge(u64, u64),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl From<AudioError> for PipelineError {
    fn from(e: AudioError) -> Self {
        PipelineError::Validation(e.to_string())
    }
}

/// Pipeline lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Transcribing,
    Analyzing,
    Generating,
    Complete,
    Failed,
}

impl PipelineState {
    /// Whether a new submission is accepted in this state
    pub fn can_submit(self) -> bool {
        matches!(
            self,
            PipelineState::Idle | PipelineState::Complete | PipelineState::Failed
        )
    }

    pub fn is_processing(self) -> bool {
        matches!(
            self,
            PipelineState::Transcribing | PipelineState::Analyzing | PipelineState::Generating
        )
    }

    pub fn can_cancel(self) -> bool {
        self.is_processing()
    }

    /// Steps already finished when this state is reached
    pub fn completed_steps(self) -> u32 {
        match self {
            PipelineState::Idle | PipelineState::Transcribing | PipelineState::Failed => 0,
            PipelineState::Analyzing => 1,
            PipelineState::Generating => 2,
            PipelineState::Complete => TOTAL_STEPS,
        }
    }

    /// Fraction of the run completed, 0.0 to 1.0
    pub fn progress(self) -> f32 {
        self.completed_steps() as f32 / TOTAL_STEPS as f32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Transcribing => "transcribing",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Generating => "generating",
            PipelineState::Complete => "complete",
            PipelineState::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a completed run, held until saved or discarded
#[derive(Debug, Clone)]
pub struct DreamDraft {
    pub transcription: String,
    pub emotion: Emotion,
    pub image_reference: String,
    pub audio: AudioSource,
}

struct PipelineInner {
    state: PipelineState,
    draft: Option<DreamDraft>,
    cancel: Option<CancellationToken>,
}

/// Sequential three-stage dream pipeline
pub struct DreamPipeline {
    transcription: TranscriptionStage,
    emotion: EmotionStage,
    imagery: ImageStage,
    journal: Arc<DreamJournal>,
    media: Arc<MediaStore>,
    inner: Arc<Mutex<PipelineInner>>,
    state_tx: watch::Sender<PipelineState>,
}

impl DreamPipeline {
    /// Assemble a pipeline from explicit stages
    pub fn new(
        transcription: TranscriptionStage,
        emotion: EmotionStage,
        imagery: ImageStage,
        journal: Arc<DreamJournal>,
        media: Arc<MediaStore>,
    ) -> Self {
        let (state_tx, _) = watch::channel(PipelineState::Idle);
        Self {
            transcription,
            emotion,
            imagery,
            journal,
            media,
            inner: Arc::new(Mutex::new(PipelineInner {
                state: PipelineState::Idle,
                draft: None,
                cancel: None,
            })),
            state_tx,
        }
    }

    /// Build a pipeline, its stages, and its media store from settings
    pub fn from_settings(settings: &Settings, journal: Arc<DreamJournal>) -> Self {
        let media = Arc::new(MediaStore::new(settings.data_dir.clone()));
        let transcription = TranscriptionStage::from_settings(settings);
        let emotion = EmotionStage::from_settings(settings);
        let imagery = ImageStage::from_settings(settings, Arc::clone(&media));
        Self::new(transcription, emotion, imagery, journal, media)
    }

    /// Validate a file path and run it through the pipeline
    pub async fn submit_file(&self, path: impl AsRef<Path>) -> Result<DreamDraft, PipelineError> {
        let audio = AudioSource::from_file(path.as_ref())?;
        self.submit(audio).await
    }

    /// Run one audio submission through all three stages
    ///
    /// Returns the draft on success; the same draft stays available through
    /// [`DreamPipeline::draft`] until it is saved or discarded.
    pub async fn submit(&self, audio: AudioSource) -> Result<DreamDraft, PipelineError> {
        let size = audio.size_bytes()?;
        if size > MAX_AUDIO_SIZE_BYTES {
            return Err(PipelineError::AudioTooLarge(size, MAX_AUDIO_SIZE_BYTES));
        }

        let cancel_token = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| PipelineError::Lock(e.to_string()))?;
            if !inner.state.can_submit() {
                return Err(PipelineError::AlreadyProcessing);
            }
            let token = CancellationToken::new();
            inner.cancel = Some(token.clone());
            inner.draft = None;
            inner.state = PipelineState::Transcribing;
            token
        };
        self.publish(PipelineState::Transcribing);

        let transcription = self
            .run_stage(&cancel_token, async {
                self.transcription
                    .transcribe(&audio)
                    .await
                    .map_err(|e| self.fail_stage("transcription", e.to_string()))
            })
            .await?;

        self.update(PipelineState::Analyzing)?;
        let emotion = self
            .run_stage(&cancel_token, async {
                Ok(self.emotion.classify(&transcription).await)
            })
            .await?;

        self.update(PipelineState::Generating)?;
        let image_reference = self
            .run_stage(&cancel_token, async {
                Ok(self.imagery.synthesize(&transcription, emotion).await)
            })
            .await?;

        let draft = DreamDraft {
            transcription,
            emotion,
            image_reference,
            audio,
        };

        {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| PipelineError::Lock(e.to_string()))?;
            inner.state = PipelineState::Complete;
            inner.draft = Some(draft.clone());
            inner.cancel = None;
        }
        self.publish(PipelineState::Complete);

        Ok(draft)
    }

    /// Persist the completed draft as a journal record
    ///
    /// Captured audio is written to the media directory only here, so a
    /// discarded dream leaves nothing behind.
    pub fn save(&self, title: Option<String>) -> Result<DreamRecord, PipelineError> {
        // The lock is held across the writes so a concurrent submit cannot
        // start from Complete mid-save; on error the draft stays available.
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| PipelineError::Lock(e.to_string()))?;
        let draft = match (&inner.state, &inner.draft) {
            (PipelineState::Complete, Some(draft)) => draft.clone(),
            _ => return Err(PipelineError::NothingToSave),
        };

        let audio_source = match &draft.audio {
            AudioSource::File(path) => Some(path.display().to_string()),
            AudioSource::Capture(bytes) => {
                let id = Uuid::new_v4().to_string();
                let path = self.media.save_audio(&id, bytes)?;
                Some(path.to_string_lossy().into_owned())
            }
        };

        let record = self.journal.add(
            draft.transcription,
            draft.emotion,
            draft.image_reference,
            audio_source,
            title,
        )?;

        inner.draft = None;
        inner.state = PipelineState::Idle;
        drop(inner);

        self.publish(PipelineState::Idle);
        log::info!("Pipeline: dream {} saved", record.id);

        Ok(record)
    }

    /// Drop the completed (or failed) run without saving
    pub fn discard(&self) -> Result<(), PipelineError> {
        let changed = {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| PipelineError::Lock(e.to_string()))?;
            if inner.state.is_processing() {
                return Err(PipelineError::AlreadyProcessing);
            }
            inner.draft = None;
            let previous = inner.state;
            inner.state = PipelineState::Idle;
            previous != PipelineState::Idle
        };

        if changed {
            self.publish(PipelineState::Idle);
        }
        Ok(())
    }

    /// Cancel the in-flight run, if any; returns whether one was signalled
    pub fn cancel(&self) -> Result<bool, PipelineError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| PipelineError::Lock(e.to_string()))?;
        if inner.state.can_cancel() {
            if let Some(token) = &inner.cancel {
                token.cancel();
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        match self.inner.lock() {
            Ok(inner) => inner.state,
            Err(poisoned) => poisoned.into_inner().state,
        }
    }

    /// Completed draft awaiting save or discard, if any
    pub fn draft(&self) -> Option<DreamDraft> {
        match self.inner.lock() {
            Ok(inner) => inner.draft.clone(),
            Err(poisoned) => poisoned.into_inner().draft.clone(),
        }
    }

    /// Watch channel carrying every state transition
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn transcription_stage(&self) -> &TranscriptionStage {
        &self.transcription
    }

    pub fn emotion_stage(&self) -> &EmotionStage {
        &self.emotion
    }

    pub fn image_stage(&self) -> &ImageStage {
        &self.imagery
    }

    async fn run_stage<F, T>(
        &self,
        cancel: &CancellationToken,
        stage: F,
    ) -> Result<T, PipelineError>
    where
        F: std::future::Future<Output = Result<T, PipelineError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("Pipeline: run cancelled");
                self.update(PipelineState::Idle)?;
                Err(PipelineError::Cancelled)
            }
            result = stage => result,
        }
    }

    fn update(&self, state: PipelineState) -> Result<(), PipelineError> {
        {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| PipelineError::Lock(e.to_string()))?;
            inner.state = state;
            if !state.is_processing() {
                inner.cancel = None;
            }
        }
        self.publish(state);
        Ok(())
    }

    fn fail_stage(&self, stage: &str, detail: String) -> PipelineError {
        log::error!("Pipeline: {} stage failed: {}", stage, detail);
        if let Ok(mut inner) = self.inner.lock() {
            inner.state = PipelineState::Failed;
            inner.cancel = None;
        }
        self.publish(PipelineState::Failed);
        PipelineError::Stage(detail)
    }

    fn publish(&self, state: PipelineState) {
        log::info!("Pipeline: state -> {}", state);
        let _ = self.state_tx.send(state);
    }
}

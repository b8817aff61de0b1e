pub mod audio;
#[cfg(feature = "capture")]
pub mod capture;
pub mod classify;
pub mod config;
pub mod emotion;
pub mod imagery;
pub mod journal;
pub mod media;
pub mod pipeline;
pub mod probe;
pub mod transcribe;


pub use audio::{AudioError, AudioSource};
pub use config::Settings;
pub use emotion::Emotion;
pub use journal::{DreamJournal, DreamRecord};
pub use pipeline::{DreamDraft, DreamPipeline, PipelineError, PipelineState};
pub use probe::{probe_capabilities, CapabilityStatus};

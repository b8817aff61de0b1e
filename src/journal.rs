//! Persistent dream journal.
//!
//! Records live in a single pretty-printed JSON file under the data
//! directory, newest first. An in-memory mode backs tests and one-shot runs
//! that should leave no trace on disk.

use crate::emotion::Emotion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

const JOURNAL_FILE: &str = "dreams.json";

/// Errors that can occur while reading or writing the journal
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Failed to access journal file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize journal: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// A single saved dream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamRecord {
    pub id: String,
    pub transcription: String,
    pub emotion: Emotion,
    pub generated_image: String,
    #[serde(default)]
    pub audio_source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DreamRecord {
    /// User-facing title, derived from the date when none was given
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("Dream of {}", self.created_at.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JournalData {
    dreams: Vec<DreamRecord>,
}

/// Dream record store backed by a JSON file
pub struct DreamJournal {
    data: RwLock<JournalData>,
    file_path: Option<PathBuf>,
}

impl DreamJournal {
    /// Open (or create) the journal under a data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        let file_path = data_dir.join(JOURNAL_FILE);

        let data = if file_path.exists() {
            let content = fs::read_to_string(&file_path)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "Journal: could not parse {}, starting empty: {}",
                    file_path.display(),
                    e
                );
                JournalData::default()
            })
        } else {
            JournalData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            file_path: Some(file_path),
        })
    }

    /// Journal that lives only in memory and never touches disk
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(JournalData::default()),
            file_path: None,
        }
    }

    /// Append a new dream record, newest first
    pub fn add(
        &self,
        transcription: String,
        emotion: Emotion,
        generated_image: String,
        audio_source: Option<String>,
        title: Option<String>,
    ) -> Result<DreamRecord, JournalError> {
        if transcription.trim().is_empty() {
            return Err(JournalError::InvalidRecord(
                "transcription is empty".to_string(),
            ));
        }
        if generated_image.trim().is_empty() {
            return Err(JournalError::InvalidRecord(
                "image reference is empty".to_string(),
            ));
        }

        let record = DreamRecord {
            id: Uuid::new_v4().to_string(),
            transcription,
            emotion,
            generated_image,
            audio_source,
            title: title.filter(|t| !t.trim().is_empty()),
            created_at: Utc::now(),
        };

        let mut data = self
            .data
            .write()
            .map_err(|e| JournalError::Lock(e.to_string()))?;
        data.dreams.insert(0, record.clone());
        self.save(&data)?;

        Ok(record)
    }

    /// List records, newest first, optionally capped
    pub fn get_all(&self, limit: Option<usize>) -> Result<Vec<DreamRecord>, JournalError> {
        let data = self
            .data
            .read()
            .map_err(|e| JournalError::Lock(e.to_string()))?;
        let mut dreams = data.dreams.clone();
        if let Some(limit) = limit {
            dreams.truncate(limit);
        }
        Ok(dreams)
    }

    /// Remove a record by id; returns whether anything was removed
    pub fn delete(&self, id: &str) -> Result<bool, JournalError> {
        let mut data = self
            .data
            .write()
            .map_err(|e| JournalError::Lock(e.to_string()))?;
        let before = data.dreams.len();
        data.dreams.retain(|d| d.id != id);

        if data.dreams.len() < before {
            self.save(&data)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn len(&self) -> Result<usize, JournalError> {
        let data = self
            .data
            .read()
            .map_err(|e| JournalError::Lock(e.to_string()))?;
        Ok(data.dreams.len())
    }

    pub fn is_empty(&self) -> Result<bool, JournalError> {
        Ok(self.len()? == 0)
    }

    fn save(&self, data: &JournalData) -> Result<(), JournalError> {
        if let Some(path) = &self.file_path {
            let json = serde_json::to_string_pretty(data)?;
            fs::write(path, json)?;
        }
        Ok(())
    }
}

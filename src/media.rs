use std::fs;
use std::path::{Path, PathBuf};

/// Errors from the on-disk media store
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Invalid media id")]
    InvalidId,

    #[error("Cannot save empty media payload")]
    Empty,

    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Simple on-disk store for pipeline media keyed by record id.
///
/// Generated images land under `<data_dir>/images/<id>.<ext>`, captured audio
/// under `<data_dir>/audio/<id>.wav`.
#[derive(Debug)]
pub struct MediaStore {
    images_dir: PathBuf,
    audio_dir: PathBuf,
}

impl MediaStore {
    /// Directories are created on first write, so constructing a store never
    /// touches the filesystem.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            images_dir: data_dir.join("images"),
            audio_dir: data_dir.join("audio"),
        }
    }

    fn is_safe_component(s: &str) -> bool {
        // Ids are UUID-like and extensions are short alphanumerics. Keep this
        // conservative to prevent path traversal / weird filenames.
        !s.trim().is_empty()
            && s.bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_'))
    }

    /// Persist generated image bytes, returning the written path.
    pub fn save_image(&self, id: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf, MediaError> {
        if !Self::is_safe_component(id) || !Self::is_safe_component(ext) {
            return Err(MediaError::InvalidId);
        }
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        fs::create_dir_all(&self.images_dir)?;
        let path = self.images_dir.join(format!("{}.{}", id, ext));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Persist a captured WAV buffer, returning the written path.
    pub fn save_audio(&self, id: &str, wav_bytes: &[u8]) -> Result<PathBuf, MediaError> {
        if !Self::is_safe_component(id) {
            return Err(MediaError::InvalidId);
        }
        if wav_bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        fs::create_dir_all(&self.audio_dir)?;
        let path = self.audio_dir.join(format!("{}.wav", id));
        fs::write(&path, wav_bytes)?;
        Ok(path)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }
}

//! Audio input handling for dream submissions.

use std::fs;
use std::path::PathBuf;

/// Errors raised while accepting or reading audio input
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("select a valid audio file (.wav or .mp3)")]
    UnsupportedType,

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),
}

/// One audio submission: an on-disk file or an in-memory capture buffer.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Audio file accepted by [`AudioSource::from_file`]
    File(PathBuf),
    /// WAV bytes produced by live microphone capture
    Capture(Vec<u8>),
}

impl AudioSource {
    /// Accept an audio file, validating its type by extension.
    ///
    /// Anything other than `.wav` or `.mp3` (case-insensitive) is rejected
    /// before the pipeline starts.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let path = path.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("mp3") => Ok(AudioSource::File(path)),
            _ => Err(AudioError::UnsupportedType),
        }
    }

    /// Wrap a live-capture WAV buffer.
    pub fn from_capture(wav_bytes: Vec<u8>) -> Self {
        AudioSource::Capture(wav_bytes)
    }

    /// MIME type advertised when uploading this audio.
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioSource::File(path) => {
                let is_mp3 = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false);
                if is_mp3 {
                    "audio/mpeg"
                } else {
                    "audio/wav"
                }
            }
            AudioSource::Capture(_) => "audio/wav",
        }
    }

    /// Payload size in bytes. File size comes from metadata, not a read.
    pub fn size_bytes(&self) -> Result<u64, AudioError> {
        match self {
            AudioSource::File(path) => Ok(fs::metadata(path)?.len()),
            AudioSource::Capture(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Raw bytes for upload to a transcription provider.
    pub fn read_bytes(&self) -> Result<Vec<u8>, AudioError> {
        match self {
            AudioSource::File(path) => Ok(fs::read(path)?),
            AudioSource::Capture(bytes) => Ok(bytes.clone()),
        }
    }

    /// Reference recorded on a saved dream, when the source has one.
    ///
    /// Capture buffers have no reference here; the pipeline persists them to
    /// the media store at save time and uses that path instead.
    pub fn reference(&self) -> Option<String> {
        match self {
            AudioSource::File(path) => Some(path.display().to_string()),
            AudioSource::Capture(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_wav_and_mp3() {
        assert!(AudioSource::from_file("dream.wav").is_ok());
        assert!(AudioSource::from_file("dream.mp3").is_ok());
        assert!(AudioSource::from_file("DREAM.WAV").is_ok());
    }

    #[test]
    fn test_rejects_other_types_with_fixed_message() {
        let err = AudioSource::from_file("notes.txt").unwrap_err();
        assert_eq!(err.to_string(), "select a valid audio file (.wav or .mp3)");

        assert!(AudioSource::from_file("dream").is_err());
        assert!(AudioSource::from_file("dream.ogg").is_err());
    }

    #[test]
    fn test_content_type_follows_extension() {
        let wav = AudioSource::from_file("dream.wav").unwrap();
        assert_eq!(wav.content_type(), "audio/wav");

        let mp3 = AudioSource::from_file("dream.mp3").unwrap();
        assert_eq!(mp3.content_type(), "audio/mpeg");

        let capture = AudioSource::from_capture(vec![0u8; 4]);
        assert_eq!(capture.content_type(), "audio/wav");
    }

    #[test]
    fn test_capture_has_no_file_reference() {
        let capture = AudioSource::from_capture(vec![1, 2, 3]);
        assert!(capture.reference().is_none());
        assert_eq!(capture.read_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_size_bytes_matches_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dream.wav");
        std::fs::write(&path, vec![0u8; 1024]).unwrap();

        let file = AudioSource::from_file(&path).unwrap();
        assert_eq!(file.size_bytes().unwrap(), 1024);

        let capture = AudioSource::from_capture(vec![0u8; 64]);
        assert_eq!(capture.size_bytes().unwrap(), 64);
    }
}

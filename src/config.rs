use std::env;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// PROVIDER DEFAULTS - Single source of truth for stock endpoints and timeouts
// ============================================================================

/// Default base URL for the transcription provider (upload + poll endpoints)
pub const DEFAULT_TRANSCRIPTION_BASE_URL: &str = "https://api.assemblyai.com/v2";

/// Default base URL for the emotion provider (sentiment endpoint)
pub const DEFAULT_EMOTION_BASE_URL: &str = "https://api.assemblyai.com/v2";

/// Default base URL for the image provider (model inference endpoints)
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Default image model served by the image provider
pub const DEFAULT_IMAGE_MODEL: &str = "stabilityai/stable-diffusion-2-1";

/// Default per-call timeout for transcription provider requests
pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-call timeout for emotion provider requests
pub const DEFAULT_EMOTION_TIMEOUT: Duration = Duration::from_secs(15);

/// Default per-call timeout for image provider requests
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between transcription status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Maximum transcription status polls before giving up (~90s ceiling)
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

/// Simulated latency of the mock transcription path
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_secs(1);

/// Language code sent to providers that accept one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Data directory for the journal and saved media, relative to the cwd
pub const DEFAULT_DATA_DIR: &str = ".reverie";

// ============================================================================

/// Connection settings for one external provider.
///
/// A provider with `enabled == false` or an empty key is treated as
/// unconfigured: the owning stage goes straight to its fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub api_key: String,
    pub base_url: String,
    /// Request timeout applied to every call against this provider
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.api_key.is_empty()
    }
}

/// Image stage settings: one provider endpoint plus a model priority list.
#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub provider: ProviderSettings,
    pub model: String,
    /// Secondary model tried when the primary fails; none unless configured
    pub fallback_model: Option<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            provider: ProviderSettings {
                enabled: true,
                api_key: String::new(),
                base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
                timeout: DEFAULT_IMAGE_TIMEOUT,
            },
            model: DEFAULT_IMAGE_MODEL.to_string(),
            fallback_model: None,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub transcription: ProviderSettings,
    pub emotion: ProviderSettings,
    pub image: ImageSettings,
    /// Language code for transcription requests
    pub language: String,
    /// Delay between transcription status polls
    pub poll_interval: Duration,
    /// Maximum number of status polls per transcription
    pub poll_attempts: u32,
    /// Simulated latency of the mock transcription path
    pub mock_delay: Duration,
    /// Where the journal file and saved media live
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transcription: ProviderSettings {
                enabled: true,
                api_key: String::new(),
                base_url: DEFAULT_TRANSCRIPTION_BASE_URL.to_string(),
                timeout: DEFAULT_TRANSCRIPTION_TIMEOUT,
            },
            emotion: ProviderSettings {
                enabled: true,
                api_key: String::new(),
                base_url: DEFAULT_EMOTION_BASE_URL.to_string(),
                timeout: DEFAULT_EMOTION_TIMEOUT,
            },
            image: ImageSettings::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            mock_delay: DEFAULT_MOCK_DELAY,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Settings {
    /// Build settings from `REVERIE_*` environment variables.
    ///
    /// Missing keys leave a provider unconfigured rather than erroring; keys
    /// never live in source or in any checked-in file.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        settings.transcription.enabled = env_flag("REVERIE_TRANSCRIPTION_ENABLED", true);
        if let Some(key) = env_string("REVERIE_TRANSCRIPTION_API_KEY") {
            settings.transcription.api_key = key;
        }
        if let Some(url) = env_string("REVERIE_TRANSCRIPTION_BASE_URL") {
            settings.transcription.base_url = url;
        }
        settings.transcription.timeout = env_duration_ms(
            "REVERIE_TRANSCRIPTION_TIMEOUT_MS",
            DEFAULT_TRANSCRIPTION_TIMEOUT,
        );

        settings.emotion.enabled = env_flag("REVERIE_EMOTION_ENABLED", true);
        if let Some(key) = env_string("REVERIE_EMOTION_API_KEY") {
            settings.emotion.api_key = key;
        }
        if let Some(url) = env_string("REVERIE_EMOTION_BASE_URL") {
            settings.emotion.base_url = url;
        }
        settings.emotion.timeout = env_duration_ms("REVERIE_EMOTION_TIMEOUT_MS", DEFAULT_EMOTION_TIMEOUT);

        settings.image.provider.enabled = env_flag("REVERIE_IMAGE_ENABLED", true);
        if let Some(key) = env_string("REVERIE_IMAGE_API_KEY") {
            settings.image.provider.api_key = key;
        }
        if let Some(url) = env_string("REVERIE_IMAGE_BASE_URL") {
            settings.image.provider.base_url = url;
        }
        settings.image.provider.timeout = env_duration_ms("REVERIE_IMAGE_TIMEOUT_MS", DEFAULT_IMAGE_TIMEOUT);
        if let Some(model) = env_string("REVERIE_IMAGE_MODEL") {
            settings.image.model = model;
        }
        settings.image.fallback_model = env_string("REVERIE_IMAGE_FALLBACK_MODEL");

        if let Some(language) = env_string("REVERIE_LANGUAGE") {
            settings.language = language;
        }
        settings.poll_interval = env_duration_ms("REVERIE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL);
        if let Some(attempts) = env_string("REVERIE_POLL_ATTEMPTS").and_then(|s| s.parse().ok()) {
            settings.poll_attempts = attempts;
        }
        settings.mock_delay = env_duration_ms("REVERIE_MOCK_DELAY_MS", DEFAULT_MOCK_DELAY);
        if let Some(dir) = env_string("REVERIE_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }

        settings
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_string(key).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    env_string(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

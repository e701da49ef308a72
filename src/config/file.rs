//! TOML configuration file loading
//!
//! Supports `~/.config/campus-voice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CampusConfigFile {
    /// Gateway server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Upstream chat completion and TTS services
    #[serde(default)]
    pub upstream: UpstreamFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Client-side voice settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Position source for navigation answers
    #[serde(default)]
    pub geolocation: GeolocationFileConfig,
}

/// Gateway server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port to listen on
    pub port: Option<u16>,

    /// Requests per minute across both endpoints
    pub rate_limit_per_minute: Option<u32>,

    /// Gateway URL used by the `chat` and `ask` commands
    pub gateway_url: Option<String>,
}

/// Upstream service configuration
#[derive(Debug, Default, Deserialize)]
pub struct UpstreamFileConfig {
    /// OpenAI-compatible chat completions endpoint
    pub chat_url: Option<String>,

    /// Model identifier (e.g. "google/gemini-2.5-flash")
    pub chat_model: Option<String>,

    /// Sarvam text-to-speech endpoint
    pub tts_url: Option<String>,

    /// Sarvam voice (e.g. "anushka")
    pub tts_speaker: Option<String>,

    /// Sarvam model (e.g. "bulbul:v2")
    pub tts_model: Option<String>,

    /// Upper bound on each upstream request
    pub request_timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub chat: Option<String>,
    pub sarvam: Option<String>,
    pub openai: Option<String>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// "persistent", "fresh" or "auto"
    pub playback: Option<String>,

    /// Pause between tearing down one clip and starting the next
    pub teardown_grace_ms: Option<u64>,

    /// How long a reused output may take to load a clip
    pub load_timeout_ms: Option<u64>,

    /// Settle delay for freshly opened outputs
    pub settle_delay_ms: Option<u64>,

    /// Recognition locale (e.g. "ml-IN")
    pub capture_locale: Option<String>,

    /// Whisper model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Upper bound on gateway and transcription requests
    pub request_timeout_secs: Option<u64>,
}

/// Geolocation configuration
#[derive(Debug, Default, Deserialize)]
pub struct GeolocationFileConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub max_age_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `CampusConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> CampusConfigFile {
    config_file_path().map_or_else(CampusConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults with a warning.
pub fn load_config_from(path: &Path) -> CampusConfigFile {
    if !path.exists() {
        return CampusConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                CampusConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            CampusConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/campus-voice/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("campus-voice").join("config.toml"))
}

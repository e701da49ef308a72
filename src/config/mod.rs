//! Configuration management for the campus assistant

pub mod file;

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::gazetteer::Coordinates;
use crate::voice::PlaybackMode;

use file::CampusConfigFile;

/// Default gateway port
pub const DEFAULT_PORT: u16 = 8787;

const DEFAULT_CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_CHAT_MODEL: &str = "google/gemini-2.5-flash";
const DEFAULT_TTS_URL: &str = "https://api.sarvam.ai/text-to-speech";
const DEFAULT_TTS_SPEAKER: &str = "anushka";
const DEFAULT_TTS_MODEL: &str = "bulbul:v2";

/// Default upper bound on a single HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Campus assistant configuration
#[derive(Debug)]
pub struct Config {
    /// Gateway server configuration
    pub server: ServerConfig,

    /// Upstream services used by the gateway
    pub upstream: UpstreamConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Voice client configuration
    pub voice: VoiceConfig,

    /// Geolocation configuration
    pub geolocation: GeolocationConfig,
}

/// Gateway server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Global request quota, if any
    pub rate_limit_per_minute: Option<u32>,

    /// Where clients reach the gateway
    pub gateway_url: String,
}

/// Upstream service configuration
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub chat_url: String,
    pub chat_model: String,
    pub tts_url: String,
    pub tts_speaker: String,
    pub tts_model: String,
    pub request_timeout: Duration,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Chat completion upstream key
    pub chat: Option<SecretString>,

    /// Sarvam subscription key
    pub sarvam: Option<SecretString>,

    /// `OpenAI` key, used for Whisper transcription
    pub openai: Option<SecretString>,
}

/// Voice client configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub playback: PlaybackMode,
    pub teardown_grace: Duration,
    pub load_timeout: Duration,
    pub settle_delay: Duration,
    pub capture_locale: String,
    pub stt_model: String,

    /// Upper bound on gateway and transcription requests
    pub request_timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackMode::Auto,
            teardown_grace: Duration::from_millis(100),
            load_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_millis(150),
            capture_locale: "ml-IN".to_string(),
            stt_model: "whisper-1".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Geolocation configuration
#[derive(Debug, Clone)]
pub struct GeolocationConfig {
    /// Fixed position reported by the desktop geolocator
    pub fixed: Option<Coordinates>,
    pub timeout: Duration,
    pub max_age: Duration,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            fixed: None,
            timeout: Duration::from_secs(10),
            max_age: Duration::from_secs(60),
        }
    }
}

/// Look up and parse an environment value, ignoring unparsable input
fn parsed<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration (env > toml > default)
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    #[must_use]
    pub fn from_sources(fc: CampusConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let port = parsed(&env, "CAMPUS_VOICE_PORT")
            .or_else(|| parsed(&env, "PORT"))
            .or(fc.server.port)
            .unwrap_or(DEFAULT_PORT);

        let server = ServerConfig {
            port,
            rate_limit_per_minute: parsed(&env, "CAMPUS_VOICE_RATE_LIMIT")
                .or(fc.server.rate_limit_per_minute)
                .filter(|n| *n > 0),
            gateway_url: env("CAMPUS_VOICE_GATEWAY_URL")
                .or(fc.server.gateway_url)
                .unwrap_or_else(|| format!("http://127.0.0.1:{port}")),
        };

        let upstream = UpstreamConfig {
            chat_url: env("CHAT_API_URL")
                .or(fc.upstream.chat_url)
                .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
            chat_model: env("CHAT_MODEL")
                .or(fc.upstream.chat_model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            tts_url: env("SARVAM_TTS_URL")
                .or(fc.upstream.tts_url)
                .unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
            tts_speaker: env("SARVAM_SPEAKER")
                .or(fc.upstream.tts_speaker)
                .unwrap_or_else(|| DEFAULT_TTS_SPEAKER.to_string()),
            tts_model: env("SARVAM_MODEL")
                .or(fc.upstream.tts_model)
                .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
            request_timeout: parsed(&env, "CAMPUS_VOICE_UPSTREAM_TIMEOUT")
                .or(fc.upstream.request_timeout_secs)
                .filter(|n| *n > 0)
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
        };

        let api_keys = ApiKeys {
            chat: env("CHAT_API_KEY")
                .or(fc.api_keys.chat)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            sarvam: env("SARVAM_API_KEY")
                .or(fc.api_keys.sarvam)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
        };

        let defaults = VoiceConfig::default();
        let playback = env("CAMPUS_VOICE_PLAYBACK")
            .or(fc.voice.playback)
            .and_then(|s| match s.parse() {
                Ok(mode) => Some(mode),
                Err(e) => {
                    tracing::warn!(value = %s, error = %e, "ignoring playback mode");
                    None
                }
            })
            .unwrap_or(defaults.playback);
        let voice = VoiceConfig {
            playback,
            teardown_grace: fc
                .voice
                .teardown_grace_ms
                .map_or(defaults.teardown_grace, Duration::from_millis),
            load_timeout: fc
                .voice
                .load_timeout_ms
                .map_or(defaults.load_timeout, Duration::from_millis),
            settle_delay: fc
                .voice
                .settle_delay_ms
                .map_or(defaults.settle_delay, Duration::from_millis),
            capture_locale: env("CAMPUS_VOICE_LOCALE")
                .or(fc.voice.capture_locale)
                .unwrap_or(defaults.capture_locale),
            stt_model: env("CAMPUS_VOICE_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.stt_model),
            request_timeout: parsed(&env, "CAMPUS_VOICE_REQUEST_TIMEOUT")
                .or(fc.voice.request_timeout_secs)
                .filter(|n| *n > 0)
                .map_or(defaults.request_timeout, Duration::from_secs),
        };

        let geo_defaults = GeolocationConfig::default();
        let latitude = parsed(&env, "CAMPUS_VOICE_LATITUDE").or(fc.geolocation.latitude);
        let longitude = parsed(&env, "CAMPUS_VOICE_LONGITUDE").or(fc.geolocation.longitude);
        let geolocation = GeolocationConfig {
            fixed: latitude
                .zip(longitude)
                .map(|(lat, lon)| Coordinates::new(lat, lon)),
            timeout: fc
                .geolocation
                .timeout_secs
                .map_or(geo_defaults.timeout, Duration::from_secs),
            max_age: fc
                .geolocation
                .max_age_secs
                .map_or(geo_defaults.max_age, Duration::from_secs),
        };

        Self {
            server,
            upstream,
            api_keys,
            voice,
            geolocation,
        }
    }
}

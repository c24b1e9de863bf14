//! Layered settings: defaults, optional YAML file, environment overrides

use crate::constants::{animation, audio, timing};
use crate::persona::PersonaConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level settings. Every section has serde defaults so an empty file
/// (or no file at all) yields a runnable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Log filter directive, e.g. "info" or "seance=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum conversation turns per session (0 = unlimited)
    #[serde(default)]
    pub max_session_turns: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_session_turns: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture and synthesis sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,

    /// Capture frame length in milliseconds
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
            frame_ms: default_frame_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Energy threshold (dBFS) above which a frame counts as speech
    #[serde(default = "default_vad_threshold_db")]
    pub vad_threshold_db: f32,

    /// Trailing silence that ends an utterance (milliseconds)
    #[serde(default = "default_endpoint_silence_ms")]
    pub endpoint_silence_ms: u64,

    /// Listening gives up after this much total silence (milliseconds)
    #[serde(default = "default_silence_timeout_ms")]
    pub silence_timeout_ms: u64,

    /// Longest utterance accepted before forced finalization (seconds)
    #[serde(default = "default_max_utterance_secs")]
    pub max_utterance_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            vad_threshold_db: default_vad_threshold_db(),
            endpoint_silence_ms: default_endpoint_silence_ms(),
            silence_timeout_ms: default_silence_timeout_ms(),
            max_utterance_secs: default_max_utterance_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Chat completions endpoint. Empty string selects the built-in
    /// template responder.
    #[serde(default)]
    pub endpoint: String,

    /// Model identifier passed to the endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_generate_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on retryable failures before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Conversation turns of context sent with each request
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            model: default_model(),
            timeout_secs: default_generate_timeout_secs(),
            max_retries: default_max_retries(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            history_turns: default_history_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Transcription endpoint. Empty string disables network STT and
    /// treats every captured utterance as empty.
    #[serde(default)]
    pub stt_endpoint: String,

    /// STT request timeout in seconds
    #[serde(default = "default_stt_timeout_secs")]
    pub stt_timeout_secs: u64,

    /// Speaking rate multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Output volume, 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            stt_endpoint: String::new(),
            stt_timeout_secs: default_stt_timeout_secs(),
            speed: default_speed(),
            volume: default_volume(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Render tick rate in frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Path to a frame index file; empty selects the built-in index
    #[serde(default)]
    pub frame_index_path: String,

    /// Talk-loop frame cadence when no viseme track is available (ms)
    #[serde(default = "default_talk_interval_ms")]
    pub talk_frame_interval_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            frame_index_path: String::new(),
            talk_frame_interval_ms: default_talk_interval_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_rate() -> u32 {
    audio::SAMPLE_RATE_HZ
}

fn default_frame_ms() -> u32 {
    audio::FRAME_MS
}

fn default_vad_threshold_db() -> f32 {
    -40.0
}

fn default_endpoint_silence_ms() -> u64 {
    800
}

fn default_silence_timeout_ms() -> u64 {
    timing::SILENCE_TIMEOUT_MS
}

fn default_max_utterance_secs() -> u64 {
    audio::MAX_UTTERANCE_SECS
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_generate_timeout_secs() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.8
}

fn default_history_turns() -> usize {
    timing::MAX_HISTORY_TURNS
}

fn default_stt_timeout_secs() -> u64 {
    10
}

fn default_speed() -> f32 {
    0.9
}

fn default_volume() -> f32 {
    0.8
}

fn default_fps() -> u32 {
    animation::DEFAULT_FPS
}

fn default_talk_interval_ms() -> u64 {
    animation::TALK_FRAME_INTERVAL_MS
}

impl Settings {
    /// Load settings: built-in defaults, overlaid with an optional YAML
    /// file, overlaid with `SEANCE_`-prefixed environment variables
    /// (`SEANCE_GENERATOR__MODEL=...`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if path.exists() {
                info!(path = %path.display(), "loading configuration file");
                builder = builder.add_source(File::from(path));
            } else {
                warn!(
                    path = %path.display(),
                    "configuration file not found, using defaults"
                );
            }
        }

        let loaded = builder
            .add_source(
                Environment::with_prefix("SEANCE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = loaded.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid("sample_rate_hz must be nonzero".into()));
        }
        if self.animation.fps == 0 {
            return Err(ConfigError::Invalid("animation fps must be nonzero".into()));
        }
        if !(0.0..=1.0).contains(&self.speech.volume) {
            return Err(ConfigError::Invalid(
                "speech volume must be between 0.0 and 1.0".into(),
            ));
        }
        if self.capture.endpoint_silence_ms == 0 {
            return Err(ConfigError::Invalid(
                "endpoint_silence_ms must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.audio.sample_rate_hz, 16_000);
        assert_eq!(settings.animation.fps, 30);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let settings = Settings::load(None).expect("defaults should load");
        assert_eq!(settings.generator.max_tokens, 150);
        assert!(settings.generator.endpoint.is_empty());
    }

    #[test]
    fn test_load_yaml_overrides() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").expect("temp file");
        writeln!(
            file,
            "generator:\n  model: test-model\n  temperature: 0.5\nanimation:\n  fps: 24\n"
        )
        .expect("write");

        let settings = Settings::load(Some(file.path())).expect("load");
        assert_eq!(settings.generator.model, "test-model");
        assert_eq!(settings.generator.temperature, 0.5);
        assert_eq!(settings.animation.fps, 24);
        // untouched sections keep defaults
        assert_eq!(settings.capture.silence_timeout_ms, 5_000);
    }

    #[test]
    fn test_invalid_volume_rejected() {
        let mut settings = Settings::default();
        settings.speech.volume = 1.5;
        assert!(settings.validate().is_err());
    }
}

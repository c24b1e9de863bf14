//! Text-to-speech wiring: the silent placeholder engine

use async_trait::async_trait;
use seance_core::{
    AudioTrack, Result, SampleRate, SpeechAudio, TextToSpeech, VisemeTrack, VoiceConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Milliseconds of audio per character at normal speaking rate
const MS_PER_CHAR: u64 = 100;

/// Placeholder synthesizer used when no real TTS engine is wired in:
/// produces a silent track whose duration approximates natural speech, so
/// state timing and animation still behave. No viseme data, which selects
/// the talk-loop fallback downstream.
pub struct SilenceTts {
    sample_rate: SampleRate,
}

impl SilenceTts {
    pub fn new(sample_rate: SampleRate) -> Self {
        Self { sample_rate }
    }

    fn estimate_duration(text: &str, speed: f32) -> Duration {
        let base_ms = text.chars().count() as u64 * MS_PER_CHAR;
        let speed = if speed > 0.0 { speed } else { 1.0 };
        Duration::from_millis((base_ms as f32 / speed) as u64).max(Duration::from_millis(200))
    }
}

#[async_trait]
impl TextToSpeech for SilenceTts {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<SpeechAudio> {
        let duration = Self::estimate_duration(text, voice.speed);
        debug!(chars = text.chars().count(), ?duration, "synthesizing silent placeholder");
        Ok(SpeechAudio {
            track: AudioTrack::silence(duration, self.sample_rate),
            visemes: VisemeTrack::empty(),
        })
    }

    fn engine_name(&self) -> &str {
        "silence"
    }
}

/// Pick the synthesizer. Only the placeholder engine is built in; real
/// engines implement `TextToSpeech` and get wired by the application.
pub fn create_text_to_speech(sample_rate: SampleRate) -> Arc<dyn TextToSpeech> {
    info!("using silent placeholder synthesizer");
    Arc::new(SilenceTts::new(sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duration_scales_with_text_and_speed() {
        let tts = SilenceTts::new(SampleRate::Hz16000);
        let voice = VoiceConfig {
            speed: 1.0,
            volume: 0.8,
        };

        let short = tts.synthesize("hello", &voice).await.unwrap();
        let long = tts.synthesize("hello there seeker", &voice).await.unwrap();
        assert!(long.track.duration > short.track.duration);
        assert_eq!(short.track.duration, Duration::from_millis(500));

        // slower speech is longer
        let slow_voice = VoiceConfig {
            speed: 0.5,
            volume: 0.8,
        };
        let slow = tts.synthesize("hello", &slow_voice).await.unwrap();
        assert_eq!(slow.track.duration, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_no_visemes_from_placeholder() {
        let tts = SilenceTts::new(SampleRate::Hz16000);
        let audio = tts
            .synthesize("anything", &VoiceConfig::default())
            .await
            .unwrap();
        assert!(audio.visemes.is_empty());
    }
}

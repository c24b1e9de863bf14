//! Speech boundary traits: recognition and synthesis

use crate::audio::{AudioTrack, SampleRate};
use crate::error::Result;
use crate::utterance::VisemeTrack;
use async_trait::async_trait;

/// A recognized transcript with confidence
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Recognized text, possibly empty when nothing intelligible was heard
    pub text: String,
    /// Recognizer confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// Whether there is any usable text
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Voice rendering parameters carried to the TTS backend
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Speaking rate multiplier (1.0 = normal)
    pub speed: f32,
    /// Output volume (0.0 - 1.0)
    pub volume: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speed: 0.9,
            volume: 0.8,
        }
    }
}

/// Synthesized speech: the waveform plus whatever viseme data the backend
/// could produce (possibly none).
#[derive(Debug, Clone)]
pub struct SpeechAudio {
    pub track: AudioTrack,
    pub visemes: VisemeTrack,
}

/// Speech-to-text boundary.
///
/// Accepts one finalized utterance buffer and returns the transcript. The
/// acoustic engine behind it is a black box; implementations here only wire
/// the call (HTTP service, in-process engine, test mock).
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe a buffered utterance
    async fn transcribe(&self, samples: &[f32], sample_rate: SampleRate) -> Result<Transcript>;

    /// Engine name for logging
    fn engine_name(&self) -> &str;
}

/// Text-to-speech boundary.
///
/// Produces the full audio track for a response, with a viseme track where
/// the engine supports it. Cancellation happens at the playback layer (the
/// renderer stops the sink and invalidates the clock), not here.
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text into an audio track
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<SpeechAudio>;

    /// Engine name for logging
    fn engine_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct MockTts;

    #[async_trait]
    impl TextToSpeech for MockTts {
        async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<SpeechAudio> {
            let duration = Duration::from_millis(text.len() as u64 * 10);
            Ok(SpeechAudio {
                track: AudioTrack::silence(duration, SampleRate::Hz16000),
                visemes: VisemeTrack::empty(),
            })
        }

        fn engine_name(&self) -> &str {
            "mock-tts"
        }
    }

    #[tokio::test]
    async fn test_mock_tts_duration_scales_with_text() {
        let tts = MockTts;
        let audio = tts
            .synthesize("hello there", &VoiceConfig::default())
            .await
            .unwrap();
        assert_eq!(audio.track.duration, Duration::from_millis(110));
        assert!(audio.visemes.is_empty());
    }

    #[test]
    fn test_transcript_empty() {
        assert!(Transcript::new("   ", 0.9).is_empty());
        assert!(!Transcript::new("what is my future", 0.9).is_empty());
    }
}

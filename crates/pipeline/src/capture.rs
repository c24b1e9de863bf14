//! Utterance capture: voice activity detection and utterance buffering

use seance_config::CaptureConfig;
use seance_core::{AudioBuffer, AudioSource, Error, Result, SampleRate, SpeechToText, Transcript};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Consecutive speech frames required before voice activity is reported
/// (one frame of noise must not trigger a barge-in)
const VOICE_ONSET_FRAMES: u32 = 3;

/// Listens on the audio source, detects one utterance by energy-based
/// voice activity, and hands the buffered samples to the recognizer.
pub struct UtteranceCapture {
    source: Arc<dyn AudioSource>,
    stt: Arc<dyn SpeechToText>,
    config: CaptureConfig,
    sample_rate: SampleRate,
}

impl UtteranceCapture {
    pub fn new(
        source: Arc<dyn AudioSource>,
        stt: Arc<dyn SpeechToText>,
        config: CaptureConfig,
        sample_rate: SampleRate,
    ) -> Self {
        Self {
            source,
            stt,
            config,
            sample_rate,
        }
    }

    /// Capture one utterance and transcribe it.
    ///
    /// Returns `Error::CaptureTimeout` when the silence window elapses
    /// before any speech; device errors propagate. An utterance ends after
    /// the configured trailing silence, or is force-finalized at the
    /// maximum utterance length.
    pub async fn capture_utterance(&self) -> Result<Transcript> {
        let silence_timeout = Duration::from_millis(self.config.silence_timeout_ms);
        let endpoint_silence = Duration::from_millis(self.config.endpoint_silence_ms);
        let max_utterance = Duration::from_secs(self.config.max_utterance_secs);

        let mut buffer = AudioBuffer::new(self.sample_rate, max_utterance);
        let mut speech_started = false;
        let mut leading_silence = Duration::ZERO;
        let mut trailing_silence = Duration::ZERO;

        loop {
            let frame = self.source.next_frame().await?;
            let silent = frame.is_likely_silence(self.config.vad_threshold_db);

            if !speech_started {
                if silent {
                    leading_silence += frame.duration;
                    if leading_silence >= silence_timeout {
                        return Err(Error::CaptureTimeout(silence_timeout));
                    }
                    continue;
                }
                debug!(energy_db = frame.energy_db, "speech onset");
                speech_started = true;
            }

            buffer.push(&frame);

            if silent {
                trailing_silence += frame.duration;
                if trailing_silence >= endpoint_silence {
                    break;
                }
            } else {
                trailing_silence = Duration::ZERO;
            }

            if buffer.has_duration(max_utterance) {
                warn!(
                    duration = ?buffer.duration(),
                    "utterance hit maximum length, finalizing"
                );
                break;
            }
        }

        debug!(duration = ?buffer.duration(), "utterance captured, transcribing");
        self.stt.transcribe(buffer.samples(), self.sample_rate).await
    }

    /// Block until sustained voice activity is heard. Used while speaking
    /// to detect a barge-in; returns on device error as well so the caller
    /// can decide.
    pub async fn wait_for_voice(&self) -> Result<()> {
        let mut run = 0u32;
        loop {
            let frame = self.source.next_frame().await?;
            if frame.is_likely_silence(self.config.vad_threshold_db) {
                run = 0;
            } else {
                run += 1;
                if run >= VOICE_ONSET_FRAMES {
                    debug!(energy_db = frame.energy_db, "voice activity while speaking");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use seance_core::AudioFrame;
    use std::collections::VecDeque;

    /// Replays a scripted frame sequence, then silence forever
    struct ScriptedSource {
        frames: Mutex<VecDeque<AudioFrame>>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<AudioFrame>) -> Arc<Self> {
            Arc::new(Self {
                frames: Mutex::new(frames.into()),
            })
        }
    }

    #[async_trait]
    impl AudioSource for ScriptedSource {
        async fn next_frame(&self) -> Result<AudioFrame> {
            let next = self.frames.lock().pop_front();
            Ok(next.unwrap_or_else(|| AudioFrame::new(vec![0.0; 320], SampleRate::Hz16000, 0)))
        }
    }

    struct EchoStt;

    #[async_trait]
    impl SpeechToText for EchoStt {
        async fn transcribe(
            &self,
            samples: &[f32],
            _sample_rate: SampleRate,
        ) -> Result<Transcript> {
            Ok(Transcript::new(format!("{} samples", samples.len()), 1.0))
        }

        fn engine_name(&self) -> &str {
            "echo"
        }
    }

    fn speech_frame(seq: u64) -> AudioFrame {
        AudioFrame::new(vec![0.5; 320], SampleRate::Hz16000, seq)
    }

    fn silent_frame(seq: u64) -> AudioFrame {
        AudioFrame::new(vec![0.0; 320], SampleRate::Hz16000, seq)
    }

    fn capture(frames: Vec<AudioFrame>, config: CaptureConfig) -> UtteranceCapture {
        UtteranceCapture::new(
            ScriptedSource::new(frames),
            Arc::new(EchoStt),
            config,
            SampleRate::Hz16000,
        )
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            vad_threshold_db: -40.0,
            endpoint_silence_ms: 40,
            silence_timeout_ms: 200,
            max_utterance_secs: 2,
        }
    }

    #[tokio::test]
    async fn test_silence_times_out() {
        let cap = capture(vec![], fast_config());
        let err = cap.capture_utterance().await.unwrap_err();
        assert!(matches!(err, Error::CaptureTimeout(_)));
    }

    #[tokio::test]
    async fn test_utterance_ends_on_trailing_silence() {
        // 3 speech frames (60ms), then trailing silence ends the utterance
        let frames = vec![speech_frame(0), speech_frame(1), speech_frame(2)];
        let cap = capture(frames, fast_config());

        let transcript = cap.capture_utterance().await.unwrap();
        assert!(!transcript.is_empty());
    }

    #[tokio::test]
    async fn test_leading_silence_does_not_end_utterance() {
        let mut frames: Vec<AudioFrame> = (0..5).map(silent_frame).collect();
        frames.push(speech_frame(5));
        frames.push(speech_frame(6));
        let cap = capture(frames, fast_config());

        let transcript = cap.capture_utterance().await.unwrap();
        // only the speech frames (plus endpoint silence) are buffered
        assert!(transcript.text.contains("samples"));
    }

    #[tokio::test]
    async fn test_wait_for_voice_needs_sustained_speech() {
        // one speech frame surrounded by silence must not trigger; a run
        // of three does
        let frames = vec![
            silent_frame(0),
            speech_frame(1),
            silent_frame(2),
            speech_frame(3),
            speech_frame(4),
            speech_frame(5),
        ];
        let cap = capture(frames, fast_config());
        cap.wait_for_voice().await.unwrap();
        // frames 3..=5 were consumed as the onset run
        assert!(cap.source.next_frame().await.unwrap().is_likely_silence(-40.0));
    }
}

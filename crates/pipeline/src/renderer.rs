//! Speech renderer: synthesis, playback, and the utterance clock

use parking_lot::Mutex;
use seance_core::{
    AudioSink, AudioTrack, Error, PlaybackClock, Result, SpeechAudio, TextToSpeech, VisemeSample,
    VisemeTrack, VoiceConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Amplitude analysis window for derived visemes
const VISEME_WINDOW: Duration = Duration::from_millis(80);

/// One rendered utterance ready for playback tracking
#[derive(Debug)]
pub struct RenderedSpeech {
    pub clock: Arc<PlaybackClock>,
    pub track: AudioTrack,
    pub visemes: VisemeTrack,
}

/// Drives the TTS engine and the audio sink, and owns the playback clock
/// for the in-flight utterance.
///
/// `cancel` is synchronous and idempotent: it stops the sink and freezes
/// the clock before returning, so callers can order it ahead of their own
/// state changes.
pub struct SpeechRenderer {
    tts: Arc<dyn TextToSpeech>,
    sink: Arc<dyn AudioSink>,
    voice: VoiceConfig,
    active_clock: Mutex<Option<Arc<PlaybackClock>>>,
}

impl SpeechRenderer {
    pub fn new(tts: Arc<dyn TextToSpeech>, sink: Arc<dyn AudioSink>, voice: VoiceConfig) -> Self {
        Self {
            tts,
            sink,
            voice,
            active_clock: Mutex::new(None),
        }
    }

    /// Synthesize `text` and start playing it. Returns the live clock and
    /// the track with its viseme data; any previously active utterance is
    /// cancelled first.
    pub async fn begin_utterance(&self, text: &str) -> Result<RenderedSpeech> {
        self.cancel();

        let SpeechAudio { track, visemes } = self
            .tts
            .synthesize(text, &self.voice)
            .await
            .map_err(|e| Error::synthesis(e.to_string()))?;

        let visemes = if visemes.is_well_formed() {
            visemes
        } else {
            derive_amplitude_visemes(&track, VISEME_WINDOW)
        };

        self.sink.play(&track)?;
        let clock = PlaybackClock::started();
        *self.active_clock.lock() = Some(clock.clone());

        debug!(
            engine = self.tts.engine_name(),
            duration = ?track.duration,
            viseme_samples = visemes.len(),
            "utterance playback started"
        );

        Ok(RenderedSpeech {
            clock,
            track,
            visemes,
        })
    }

    /// Stop playback immediately and freeze the clock. Safe to call with
    /// nothing playing.
    pub fn cancel(&self) {
        self.sink.stop();
        if let Some(clock) = self.active_clock.lock().take() {
            clock.invalidate();
        }
    }

    /// Cancel a specific utterance's playback. Stops the sink only while
    /// `clock` is still the active one, so a completion that lost a race
    /// to a newer utterance cannot kill the newer playback.
    pub fn cancel_stale(&self, clock: &Arc<PlaybackClock>) {
        {
            let mut active = self.active_clock.lock();
            if active.as_ref().is_some_and(|c| Arc::ptr_eq(c, clock)) {
                self.sink.stop();
                active.take();
            }
        }
        clock.invalidate();
    }

    pub fn is_playing(&self) -> bool {
        self.sink.is_playing()
    }
}

/// Derive a viseme track from the waveform itself: RMS amplitude per
/// analysis window, normalized against the loudest window. A silent track
/// yields no samples, which selects the talk-loop fallback downstream.
fn derive_amplitude_visemes(track: &AudioTrack, window: Duration) -> VisemeTrack {
    let window_samples =
        (track.sample_rate.as_u32() as f64 * window.as_secs_f64()).round() as usize;
    if window_samples == 0 || track.samples.is_empty() {
        return VisemeTrack::empty();
    }

    let rms_per_window: Vec<f32> = track
        .samples
        .chunks(window_samples)
        .map(|chunk| {
            let sum: f32 = chunk.iter().map(|s| s * s).sum();
            (sum / chunk.len() as f32).sqrt()
        })
        .collect();

    let peak = rms_per_window.iter().cloned().fold(0.0_f32, f32::max);
    if peak <= f32::EPSILON {
        return VisemeTrack::empty();
    }

    let samples = rms_per_window
        .iter()
        .enumerate()
        .map(|(i, rms)| VisemeSample::new(window.mul_f64(i as f64), rms / peak))
        .collect();
    VisemeTrack::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seance_core::SampleRate;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RecordingSink {
        playing: AtomicBool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                playing: AtomicBool::new(false),
            })
        }
    }

    impl AudioSink for RecordingSink {
        fn play(&self, _track: &AudioTrack) -> Result<()> {
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    struct FixedTts {
        audio: SpeechAudio,
    }

    #[async_trait]
    impl TextToSpeech for FixedTts {
        async fn synthesize(&self, _text: &str, _voice: &VoiceConfig) -> Result<SpeechAudio> {
            Ok(self.audio.clone())
        }

        fn engine_name(&self) -> &str {
            "fixed"
        }
    }

    fn renderer_with(audio: SpeechAudio) -> (SpeechRenderer, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let renderer = SpeechRenderer::new(
            Arc::new(FixedTts { audio }),
            sink.clone(),
            VoiceConfig::default(),
        );
        (renderer, sink)
    }

    #[tokio::test]
    async fn test_begin_starts_playback_with_live_clock() {
        let audio = SpeechAudio {
            track: AudioTrack::silence(Duration::from_millis(500), SampleRate::Hz16000),
            visemes: VisemeTrack::empty(),
        };
        let (renderer, sink) = renderer_with(audio);

        let rendered = renderer.begin_utterance("greetings").await.unwrap();
        assert!(sink.is_playing());
        assert!(rendered.clock.is_valid());
        assert_eq!(rendered.track.duration, Duration::from_millis(500));
        // rendered speech travels inside debug-logged events
        assert!(format!("{rendered:?}").contains("RenderedSpeech"));
    }

    #[tokio::test]
    async fn test_cancel_stops_sink_and_freezes_clock() {
        let audio = SpeechAudio {
            track: AudioTrack::silence(Duration::from_millis(500), SampleRate::Hz16000),
            visemes: VisemeTrack::empty(),
        };
        let (renderer, sink) = renderer_with(audio);
        let rendered = renderer.begin_utterance("greetings").await.unwrap();

        renderer.cancel();
        assert!(!sink.is_playing());
        assert!(!rendered.clock.is_valid());
        let frozen = rendered.clock.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(rendered.clock.elapsed(), frozen);
    }

    #[tokio::test]
    async fn test_cancel_stale_leaves_newer_playback_alone() {
        let audio = SpeechAudio {
            track: AudioTrack::silence(Duration::from_millis(500), SampleRate::Hz16000),
            visemes: VisemeTrack::empty(),
        };
        let (renderer, sink) = renderer_with(audio);

        let old = renderer.begin_utterance("first").await.unwrap();
        let new = renderer.begin_utterance("second").await.unwrap();

        // a completion that lost the race cancels only its own playback
        renderer.cancel_stale(&old.clock);
        assert!(sink.is_playing());
        assert!(new.clock.is_valid());
        assert!(!old.clock.is_valid());

        renderer.cancel_stale(&new.clock);
        assert!(!sink.is_playing());
        assert!(!new.clock.is_valid());
    }

    #[tokio::test]
    async fn test_cancel_without_playback_is_noop() {
        let audio = SpeechAudio {
            track: AudioTrack::silence(Duration::from_millis(100), SampleRate::Hz16000),
            visemes: VisemeTrack::empty(),
        };
        let (renderer, _sink) = renderer_with(audio);
        renderer.cancel();
        renderer.cancel();
    }

    #[test]
    fn test_amplitude_visemes_normalized() {
        // 160ms of quiet then 160ms of loud at 16kHz
        let mut samples = vec![0.1_f32; 2560];
        samples.extend(vec![0.8_f32; 2560]);
        let track = AudioTrack::new(samples, SampleRate::Hz16000);

        let visemes = derive_amplitude_visemes(&track, Duration::from_millis(80));
        assert!(visemes.is_well_formed());
        let s = visemes.samples();
        assert_eq!(s.len(), 4);
        assert!(s[0].intensity < 0.2);
        assert!((s[3].intensity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_track_yields_no_visemes() {
        let track = AudioTrack::silence(Duration::from_millis(400), SampleRate::Hz16000);
        let visemes = derive_amplitude_visemes(&track, Duration::from_millis(80));
        assert!(visemes.is_empty());
    }

    #[tokio::test]
    async fn test_backend_visemes_pass_through() {
        let provided = VisemeTrack::new(vec![
            VisemeSample::new(Duration::ZERO, 0.2),
            VisemeSample::new(Duration::from_millis(300), 0.9),
        ]);
        let audio = SpeechAudio {
            track: AudioTrack::new(vec![0.3; 8000], SampleRate::Hz16000),
            visemes: provided.clone(),
        };
        let (renderer, _sink) = renderer_with(audio);

        let rendered = renderer.begin_utterance("hello").await.unwrap();
        assert_eq!(rendered.visemes.len(), provided.len());
    }
}

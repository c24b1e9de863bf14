//! Stand-in device backends
//!
//! Real deployments replace these with microphone, speaker, and projector
//! drivers; these keep the engine runnable (and its timing honest) on a
//! machine with no audio or display hardware.

use async_trait::async_trait;
use parking_lot::Mutex;
use seance_core::{
    AudioFrame, AudioSink, AudioSource, AudioTrack, FrameSelector, FrameSink, Result, SampleRate,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Microphone stand-in: silent frames delivered at the real capture
/// cadence, so silence timeouts behave as they would with hardware.
pub struct SilentMicrophone {
    sample_rate: SampleRate,
    frame: Duration,
    sequence: AtomicU64,
}

impl SilentMicrophone {
    pub fn new(sample_rate: SampleRate, frame_ms: u32) -> Self {
        Self {
            sample_rate,
            frame: Duration::from_millis(frame_ms as u64),
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl AudioSource for SilentMicrophone {
    async fn next_frame(&self) -> Result<AudioFrame> {
        tokio::time::sleep(self.frame).await;
        let samples = self.sample_rate.samples_per_ms() * self.frame.as_millis() as usize;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(AudioFrame::new(vec![0.0; samples], self.sample_rate, sequence))
    }
}

/// Speaker stand-in: pretends to play a track for exactly its duration
pub struct NullSpeaker {
    playing_until: Mutex<Option<Instant>>,
}

impl NullSpeaker {
    pub fn new() -> Self {
        Self {
            playing_until: Mutex::new(None),
        }
    }
}

impl Default for NullSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for NullSpeaker {
    fn play(&self, track: &AudioTrack) -> Result<()> {
        debug!(duration = ?track.duration, "playback started (null speaker)");
        *self.playing_until.lock() = Some(Instant::now() + track.duration);
        Ok(())
    }

    fn stop(&self) {
        self.playing_until.lock().take();
    }

    fn is_playing(&self) -> bool {
        self.playing_until
            .lock()
            .is_some_and(|until| Instant::now() < until)
    }
}

/// Display stand-in: traces each frame selection change
pub struct LogFrameSink {
    last: Mutex<Option<FrameSelector>>,
}

impl LogFrameSink {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }
}

impl Default for LogFrameSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for LogFrameSink {
    fn present(&self, frame: &FrameSelector) {
        let mut last = self.last.lock();
        if last.as_ref() != Some(frame) {
            trace!(%frame, "frame change");
            *last = Some(frame.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_speaker_plays_for_track_duration() {
        let speaker = NullSpeaker::new();
        assert!(!speaker.is_playing());

        let track = AudioTrack::silence(Duration::from_millis(50), SampleRate::Hz16000);
        speaker.play(&track).unwrap();
        assert!(speaker.is_playing());

        speaker.stop();
        assert!(!speaker.is_playing());
    }

    #[tokio::test]
    async fn test_silent_microphone_paces_frames() {
        let mic = SilentMicrophone::new(SampleRate::Hz16000, 20);
        let start = Instant::now();
        let frame = mic.next_frame().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(frame.samples.len(), 320);
        assert!(frame.is_likely_silence(-40.0));
    }
}

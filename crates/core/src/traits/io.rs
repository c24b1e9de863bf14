//! Device boundaries: microphone input, speaker output, frame display

use crate::audio::{AudioFrame, AudioTrack};
use crate::error::Result;
use crate::frame::FrameSelector;
use async_trait::async_trait;

/// Microphone boundary: a continuous stream of capture frames.
///
/// The capture component owns the interpretation (voice activity, utterance
/// boundaries); the source just delivers frames at its native cadence.
#[async_trait]
pub trait AudioSource: Send + Sync + 'static {
    /// Wait for the next capture frame. Returns an error on device failure.
    async fn next_frame(&self) -> Result<AudioFrame>;
}

/// Speaker boundary. At most one track plays at a time; `play` on a busy
/// sink implicitly replaces the current track.
pub trait AudioSink: Send + Sync + 'static {
    /// Start playing a track. Returns once playback has started, not when
    /// it finishes.
    fn play(&self, track: &AudioTrack) -> Result<()>;

    /// Stop playback immediately
    fn stop(&self);

    /// Whether audio is currently playing
    fn is_playing(&self) -> bool;
}

/// Display boundary: receives one frame selection per render tick. The
/// backend rasterizes and presents at the projector's native rate.
pub trait FrameSink: Send + Sync + 'static {
    fn present(&self, frame: &FrameSelector);
}

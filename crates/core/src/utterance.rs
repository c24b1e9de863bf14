//! Utterance and viseme track types

use crate::audio::AudioTrack;
use std::time::Duration;

/// Monotonic per-process utterance identifier
pub type UtteranceId = u64;

/// One viseme observation: mouth intensity at an offset into the audio track.
///
/// Intensity is normalized to [0.0, 1.0]; bucketing into mouth shapes is the
/// animation layer's concern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisemeSample {
    /// Offset from the start of the utterance's audio
    pub offset: Duration,
    /// Mouth openness / speech intensity, 0.0 (closed) to 1.0 (wide)
    pub intensity: f32,
}

impl VisemeSample {
    pub fn new(offset: Duration, intensity: f32) -> Self {
        Self { offset, intensity }
    }
}

/// Ordered sequence of viseme samples for one utterance.
///
/// May be empty: not every TTS backend reports visemes. Consumers must
/// treat an empty or malformed track as "no viseme data" and fall back.
#[derive(Debug, Clone, Default)]
pub struct VisemeTrack {
    samples: Vec<VisemeSample>,
}

impl VisemeTrack {
    /// Build a track from samples. Samples are sorted by offset; NaN or
    /// out-of-range intensities make the track malformed.
    pub fn new(mut samples: Vec<VisemeSample>) -> Self {
        samples.sort_by(|a, b| a.offset.cmp(&b.offset));
        Self { samples }
    }

    /// An empty track (no viseme data)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[VisemeSample] {
        &self.samples
    }

    /// A track is well-formed when every intensity is a finite value in
    /// [0.0, 1.0] and offsets are non-decreasing (guaranteed by `new`).
    pub fn is_well_formed(&self) -> bool {
        !self.samples.is_empty()
            && self
                .samples
                .iter()
                .all(|s| s.intensity.is_finite() && (0.0..=1.0).contains(&s.intensity))
    }
}

/// One user-prompt-to-spoken-response cycle, immutable once finalized.
///
/// Created by the generator + renderer per turn, bound to the live playback
/// clock for the duration of playback, and discarded when the turn ends.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Monotonic counter assigned by the orchestrator
    pub id: UtteranceId,
    /// What the user said
    pub transcript: String,
    /// What the system replies
    pub response_text: String,
    /// Synthesized speech audio
    pub audio: AudioTrack,
    /// Viseme track, possibly empty
    pub visemes: VisemeTrack,
}

impl Utterance {
    /// Total playback duration of the audio track
    pub fn duration(&self) -> Duration {
        self.audio.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleRate;

    #[test]
    fn test_viseme_track_sorts_samples() {
        let track = VisemeTrack::new(vec![
            VisemeSample::new(Duration::from_millis(800), 0.7),
            VisemeSample::new(Duration::ZERO, 0.1),
        ]);
        assert_eq!(track.samples()[0].offset, Duration::ZERO);
        assert!(track.is_well_formed());
    }

    #[test]
    fn test_malformed_viseme_track() {
        let empty = VisemeTrack::empty();
        assert!(!empty.is_well_formed());

        let nan = VisemeTrack::new(vec![VisemeSample::new(Duration::ZERO, f32::NAN)]);
        assert!(!nan.is_well_formed());

        let out_of_range = VisemeTrack::new(vec![VisemeSample::new(Duration::ZERO, 1.5)]);
        assert!(!out_of_range.is_well_formed());
    }

    #[test]
    fn test_utterance_duration() {
        let utterance = Utterance {
            id: 1,
            transcript: "what is my future".into(),
            response_text: "the stars align".into(),
            audio: AudioTrack::silence(Duration::from_millis(3200), SampleRate::Hz16000),
            visemes: VisemeTrack::empty(),
        };
        assert_eq!(utterance.duration(), Duration::from_millis(3200));
    }
}

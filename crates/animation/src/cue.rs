//! Animation cues: mapping playback time to frame selections

use crate::assets::FrameIndex;
use seance_core::{FrameSelector, VisemeTrack};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Mouth shape bucket derived from viseme intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouthShape {
    Closed,
    Narrow,
    Wide,
}

impl MouthShape {
    /// Bucket a normalized intensity. Callers must have validated the
    /// intensity (finite, in [0, 1]); values are clamped regardless.
    pub fn from_intensity(intensity: f32) -> Self {
        let intensity = intensity.clamp(0.0, 1.0);
        if intensity < seance_config::constants::animation::BUCKET_NARROW_THRESHOLD {
            MouthShape::Closed
        } else if intensity < seance_config::constants::animation::BUCKET_WIDE_THRESHOLD {
            MouthShape::Narrow
        } else {
            MouthShape::Wide
        }
    }
}

/// One cue: from `start` until the next cue's start, show `frame`
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCue {
    pub start: Duration,
    pub frame: FrameSelector,
}

/// The per-utterance mapping from elapsed playback time to a frame.
///
/// Built once per turn and read-only afterward. Either derived from the
/// utterance's viseme track, or a deterministic talk loop when no usable
/// viseme data exists.
#[derive(Debug, Clone)]
pub enum CueTrack {
    /// Ordered cues covering [first.start, end); past `end` the last cue
    /// holds.
    Cues {
        cues: Vec<AnimationCue>,
        end: Duration,
    },
    /// Fixed-cadence cycle through mouth frames
    TalkLoop {
        frames: Vec<FrameSelector>,
        interval: Duration,
    },
}

impl CueTrack {
    /// Derive a cue track for one utterance.
    ///
    /// A missing or malformed viseme track selects the talk-loop fallback
    /// rather than failing the turn.
    pub fn build(
        visemes: &VisemeTrack,
        audio_duration: Duration,
        index: &FrameIndex,
        talk_interval: Duration,
    ) -> Self {
        if !visemes.is_well_formed() {
            debug!(
                samples = visemes.len(),
                "no usable viseme track, using talk loop"
            );
            return Self::talk_loop(index, talk_interval);
        }

        let cues = visemes
            .samples()
            .iter()
            .map(|sample| AnimationCue {
                start: sample.offset,
                frame: index.mouth_frame(MouthShape::from_intensity(sample.intensity)),
            })
            .collect();

        CueTrack::Cues {
            cues,
            end: audio_duration,
        }
    }

    /// The talk-loop fallback on its own
    pub fn talk_loop(index: &FrameIndex, interval: Duration) -> Self {
        CueTrack::TalkLoop {
            frames: index.talk_frames().to_vec(),
            interval,
        }
    }

    /// Select the frame for an elapsed playback offset.
    ///
    /// For cue tables this is a binary search for the nearest cue at or
    /// below the offset; offsets past the end hold the last cue. Offsets
    /// before the first cue show the first cue's frame.
    pub fn lookup(&self, elapsed: Duration) -> FrameSelector {
        match self {
            // `build` only produces non-empty tables, but lookup must
            // never panic on a hand-built one
            CueTrack::Cues { cues, .. } if cues.is_empty() => FrameSelector::index(0),
            CueTrack::TalkLoop { frames, .. } if frames.is_empty() => FrameSelector::index(0),
            CueTrack::Cues { cues, .. } => {
                let idx = match cues.binary_search_by(|cue| cue.start.cmp(&elapsed)) {
                    Ok(i) => i,
                    Err(0) => 0,
                    Err(i) => i - 1,
                };
                cues[idx].frame.clone()
            },
            CueTrack::TalkLoop { frames, interval } => {
                let step = (elapsed.as_millis() / interval.as_millis().max(1)) as usize;
                frames[step % frames.len()].clone()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seance_core::VisemeSample;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_intensity_bucketing() {
        assert_eq!(MouthShape::from_intensity(0.0), MouthShape::Closed);
        assert_eq!(MouthShape::from_intensity(0.19), MouthShape::Closed);
        assert_eq!(MouthShape::from_intensity(0.2), MouthShape::Narrow);
        assert_eq!(MouthShape::from_intensity(0.54), MouthShape::Narrow);
        assert_eq!(MouthShape::from_intensity(0.55), MouthShape::Wide);
        assert_eq!(MouthShape::from_intensity(1.0), MouthShape::Wide);
    }

    #[test]
    fn test_lookup_nearest_below() {
        let visemes = VisemeTrack::new(vec![
            VisemeSample::new(ms(0), 0.1),
            VisemeSample::new(ms(800), 0.7),
            VisemeSample::new(ms(1900), 0.3),
        ]);
        let index = FrameIndex::default();
        let track = CueTrack::build(&visemes, ms(3200), &index, ms(120));

        // between cues: the cue below wins
        assert_eq!(track.lookup(ms(1000)), index.mouth_frame(MouthShape::Wide));
        // exact hit: prefer the later start
        assert_eq!(track.lookup(ms(800)), index.mouth_frame(MouthShape::Wide));
        assert_eq!(track.lookup(ms(0)), index.mouth_frame(MouthShape::Closed));
    }

    #[test]
    fn test_lookup_holds_past_end() {
        let visemes = VisemeTrack::new(vec![
            VisemeSample::new(ms(0), 0.1),
            VisemeSample::new(ms(3000), 0.9),
        ]);
        let index = FrameIndex::default();
        let track = CueTrack::build(&visemes, ms(3200), &index, ms(120));

        // trailing silence past the track end keeps the last cue
        assert_eq!(track.lookup(ms(3500)), index.mouth_frame(MouthShape::Wide));
    }

    #[test]
    fn test_empty_viseme_track_falls_back_to_talk_loop() {
        let index = FrameIndex::default();
        let track = CueTrack::build(&VisemeTrack::empty(), ms(2000), &index, ms(120));
        assert!(matches!(track, CueTrack::TalkLoop { .. }));
    }

    #[test]
    fn test_malformed_viseme_track_falls_back_to_talk_loop() {
        let index = FrameIndex::default();
        let visemes = VisemeTrack::new(vec![VisemeSample::new(ms(0), f32::NAN)]);
        let track = CueTrack::build(&visemes, ms(2000), &index, ms(120));
        assert!(matches!(track, CueTrack::TalkLoop { .. }));
    }

    #[test]
    fn test_talk_loop_cycles_at_cadence() {
        let index = FrameIndex::default();
        let track = CueTrack::talk_loop(&index, ms(120));
        let n = index.talk_frames().len();
        assert!(n >= 2);

        let first = track.lookup(ms(0));
        assert_eq!(track.lookup(ms(119)), first);
        assert_ne!(track.lookup(ms(120)), first);
        // wraps around after a full cycle
        assert_eq!(track.lookup(ms(120 * n as u64)), first);
    }
}

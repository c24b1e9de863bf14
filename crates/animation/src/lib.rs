//! Animation layer for the seance projected-face engine
//!
//! Maps conversation activity to frame selections: viseme-driven cue
//! tables while speaking, a deterministic talk loop when viseme data is
//! missing, and an idle breathing loop otherwise. The synchronizer is the
//! single producer of frame selections, driven by the render tick.

pub mod assets;
pub mod cue;
pub mod idle;
pub mod synchronizer;

pub use assets::FrameIndex;
pub use cue::{AnimationCue, CueTrack, MouthShape};
pub use idle::IdleLoop;
pub use synchronizer::AnimationSynchronizer;

//! Idle breathing loop: the frame cycle shown outside of speech

use seance_core::FrameSelector;

/// An infinite, restartable cycle over the idle frames.
///
/// Always resolves a frame: the constructor guarantees at least one entry,
/// so `next()` can never fail. Shown whenever the conversation is idle or
/// recovering from an error.
#[derive(Debug, Clone)]
pub struct IdleLoop {
    frames: Vec<FrameSelector>,
    cursor: usize,
}

impl IdleLoop {
    pub fn new(frames: &[FrameSelector]) -> Self {
        let frames = if frames.is_empty() {
            vec![FrameSelector::segment("idle", 0)]
        } else {
            frames.to_vec()
        };
        Self { frames, cursor: 0 }
    }

    /// The next frame in the cycle, wrapping around indefinitely
    pub fn next(&mut self) -> FrameSelector {
        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        frame
    }

    /// Restart the cycle from its first frame
    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

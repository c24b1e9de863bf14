//! The tick-driven animation synchronizer
//!
//! Every render tick produces exactly one frame selection. While an
//! utterance is armed, selections come from its cue track indexed by the
//! playback clock; otherwise the idle loop runs. Arming and disarming are
//! synchronous so the caller controls their ordering relative to state
//! transitions: disarm before publishing `Speaking -> Idle` and no tick can
//! observe a stale cue.

use crate::cue::CueTrack;
use crate::idle::IdleLoop;
use parking_lot::Mutex;
use seance_core::{FrameSelector, PlaybackClock, UtteranceId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The cue binding for one live utterance
struct ArmedUtterance {
    utterance_id: UtteranceId,
    cues: CueTrack,
    clock: Arc<PlaybackClock>,
}

/// Previous tick's selection, kept for backward-jitter absorption
struct LastSelection {
    offset: Duration,
    frame: FrameSelector,
}

struct SyncState {
    idle: IdleLoop,
    armed: Option<ArmedUtterance>,
    last: Option<LastSelection>,
}

pub struct AnimationSynchronizer {
    state: Mutex<SyncState>,
    /// Backward clock jitter absorbed without reseeking cues
    backward_tolerance: Duration,
}

impl AnimationSynchronizer {
    pub fn new(idle: IdleLoop) -> Self {
        Self {
            state: Mutex::new(SyncState {
                idle,
                armed: None,
                last: None,
            }),
            backward_tolerance: Duration::from_millis(
                seance_config::constants::animation::BACKWARD_JUMP_TOLERANCE_MS,
            ),
        }
    }

    pub fn with_backward_tolerance(mut self, tolerance: Duration) -> Self {
        self.backward_tolerance = tolerance;
        self
    }

    /// Bind an utterance's cues and clock. Replaces any previous binding;
    /// the old utterance's cues can never be selected again.
    pub fn arm(&self, utterance_id: UtteranceId, cues: CueTrack, clock: Arc<PlaybackClock>) {
        let mut state = self.state.lock();
        state.armed = Some(ArmedUtterance {
            utterance_id,
            cues,
            clock,
        });
        state.last = None;
        debug!(utterance_id, "synchronizer armed");
    }

    /// Drop the current binding. Every subsequent tick yields idle frames
    /// until `arm` is called again. Idempotent.
    pub fn disarm(&self) {
        let mut state = self.state.lock();
        if let Some(armed) = state.armed.take() {
            debug!(utterance_id = armed.utterance_id, "synchronizer disarmed");
        }
        state.last = None;
        state.idle.restart();
    }

    /// The utterance currently bound, if any
    pub fn armed_utterance(&self) -> Option<UtteranceId> {
        self.state.lock().armed.as_ref().map(|a| a.utterance_id)
    }

    /// Produce the frame selection for this render tick. Never fails: with
    /// no armed utterance the idle loop answers.
    pub fn tick(&self) -> FrameSelector {
        let mut state = self.state.lock();
        let SyncState { idle, armed, last } = &mut *state;

        let Some(armed) = armed.as_ref() else {
            return idle.next();
        };

        let elapsed = armed.clock.elapsed();

        // A small backward jump is device jitter: repeat the previous
        // selection instead of seeking cues backward.
        if let Some(prev) = last.as_ref() {
            if elapsed < prev.offset && prev.offset - elapsed <= self.backward_tolerance {
                return prev.frame.clone();
            }
        }

        let frame = armed.cues.lookup(elapsed);
        *last = Some(LastSelection {
            offset: elapsed,
            frame: frame.clone(),
        });
        frame
    }
}

//! Shared tuning constants

/// Audio constants
pub mod audio {
    /// Capture and synthesis sample rate (Hz). Single fixed rate end to
    /// end; the capture buffer and TTS output must agree.
    pub const SAMPLE_RATE_HZ: u32 = 16_000;

    /// Capture frame length in milliseconds
    pub const FRAME_MS: u32 = 20;

    /// Longest utterance the capture buffer will hold (seconds)
    pub const MAX_UTTERANCE_SECS: u64 = 30;
}

/// Animation constants
pub mod animation {
    /// Default render tick rate (frames per second)
    pub const DEFAULT_FPS: u32 = 30;

    /// Default talk-loop frame cadence when no viseme track is available
    pub const TALK_FRAME_INTERVAL_MS: u64 = 120;

    /// Backward clock jitter absorbed without reseeking cues
    pub const BACKWARD_JUMP_TOLERANCE_MS: u64 = 40;

    /// Intensity below this is a closed mouth
    pub const BUCKET_NARROW_THRESHOLD: f32 = 0.2;

    /// Intensity below this (and above narrow) is a narrow mouth
    pub const BUCKET_WIDE_THRESHOLD: f32 = 0.55;
}

/// Conversation timing constants
pub mod timing {
    /// Silence window before listening gives up (milliseconds)
    pub const SILENCE_TIMEOUT_MS: u64 = 5_000;

    /// Cooldown in the error state before auto-recovery to idle
    pub const ERROR_COOLDOWN_MS: u64 = 2_000;

    /// Rolling history window fed to the generator
    pub const MAX_HISTORY_TURNS: usize = 16;
}

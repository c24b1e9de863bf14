//! Conversation state machine types

use crate::utterance::UtteranceId;
use std::time::Instant;

/// Which subsystem faulted, for the `Error` state and recovery logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// Microphone / recognizer device failure
    Capture,
    /// Language model backend failure
    Generation,
    /// TTS or audio output failure
    Synthesis,
}

impl std::fmt::Display for FaultReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultReason::Capture => write!(f, "capture"),
            FaultReason::Generation => write!(f, "generation"),
            FaultReason::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// The conversation lifecycle. Exactly one variant is active at a time and
/// the orchestrator is the only mutator; everyone else reads clones.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// Waiting for a wake condition; the face runs its idle loop
    #[default]
    Idle,
    /// Microphone open, waiting for an utterance or a silence timeout
    Listening {
        /// When listening began
        since: Instant,
    },
    /// Transcript captured, response generation in flight
    Thinking {
        /// The transcript being answered
        transcript: String,
    },
    /// Response audio playing with the synchronizer armed
    Speaking {
        /// The bound utterance
        utterance_id: UtteranceId,
        /// When playback began
        started_at: Instant,
    },
    /// A subsystem faulted; the face idles until auto-recovery
    Error {
        /// What went wrong
        reason: FaultReason,
    },
}

impl ConversationState {
    /// Short name for logging and metrics labels
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::Listening { .. } => "listening",
            ConversationState::Thinking { .. } => "thinking",
            ConversationState::Speaking { .. } => "speaking",
            ConversationState::Error { .. } => "error",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, ConversationState::Speaking { .. })
    }

    /// States in which the synchronizer must show the idle loop
    pub fn shows_idle_loop(&self) -> bool {
        matches!(
            self,
            ConversationState::Idle | ConversationState::Error { .. }
        )
    }

    /// The utterance bound in `Speaking`, if any
    pub fn speaking_utterance(&self) -> Option<UtteranceId> {
        match self {
            ConversationState::Speaking { utterance_id, .. } => Some(*utterance_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(ConversationState::Idle.name(), "idle");
        assert_eq!(
            ConversationState::Thinking {
                transcript: "hello".into()
            }
            .name(),
            "thinking"
        );
    }

    #[test]
    fn test_shows_idle_loop() {
        assert!(ConversationState::Idle.shows_idle_loop());
        assert!(ConversationState::Error {
            reason: FaultReason::Generation
        }
        .shows_idle_loop());
        assert!(!ConversationState::Speaking {
            utterance_id: 3,
            started_at: Instant::now()
        }
        .shows_idle_loop());
    }

    #[test]
    fn test_speaking_utterance() {
        let state = ConversationState::Speaking {
            utterance_id: 7,
            started_at: Instant::now(),
        };
        assert_eq!(state.speaking_utterance(), Some(7));
        assert_eq!(ConversationState::Idle.speaking_utterance(), None);
    }
}

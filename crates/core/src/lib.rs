//! Core traits and types for the seance projected-face engine
//!
//! This crate provides foundational types used across all other crates:
//! - Audio frame and track types
//! - Utterance, viseme track, and conversation state types
//! - The playback clock shared between the speech renderer and the
//!   animation synchronizer
//! - Boundary traits for pluggable backends (STT, TTS, LLM, devices)
//! - Error types

pub mod audio;
pub mod clock;
pub mod error;
pub mod frame;
pub mod history;
pub mod state;
pub mod traits;
pub mod utterance;

pub use audio::{AudioBuffer, AudioFrame, AudioTrack, SampleRate};
pub use clock::PlaybackClock;
pub use error::{Error, GenerationError, GenerationErrorKind, Result};
pub use frame::FrameSelector;
pub use history::{ConversationHistory, Turn, TurnRole};
pub use state::{ConversationState, FaultReason};
pub use utterance::{Utterance, UtteranceId, VisemeSample, VisemeTrack};

pub use traits::{
    AudioSink, AudioSource, FrameSink, GenerateRequest, LanguageModel, Message, SpeechAudio,
    SpeechToText, TextToSpeech, Transcript, VoiceConfig,
};

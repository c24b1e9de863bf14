//! Conversation pipeline for the seance projected-face engine
//!
//! Wires capture, recognition, generation, synthesis, and animation into
//! one session loop. The `ConversationOrchestrator` owns the state machine
//! (idle, listening, thinking, speaking, error) and is the single mutator
//! of conversation state; everything slow runs as cancellable tasks whose
//! completions post events back into it.

pub mod capture;
pub mod orchestrator;
pub mod renderer;
pub mod stt;
pub mod tts;

pub use capture::UtteranceCapture;
pub use orchestrator::{ConversationOrchestrator, OrchestratorConfig, OrchestratorEvent};
pub use renderer::{RenderedSpeech, SpeechRenderer};
pub use stt::{create_speech_to_text, HttpStt, NullStt};
pub use tts::{create_text_to_speech, SilenceTts};

//! Boundary traits for pluggable backends

mod io;
mod llm;
mod speech;

pub use io::{AudioSink, AudioSource, FrameSink};
pub use llm::{GenerateRequest, LanguageModel, Message};
pub use speech::{SpeechAudio, SpeechToText, TextToSpeech, Transcript, VoiceConfig};

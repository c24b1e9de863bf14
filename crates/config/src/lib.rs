//! Configuration for the seance projected-face engine
//!
//! Settings are layered: built-in defaults, then an optional YAML file,
//! then `SEANCE_`-prefixed environment variables.

pub mod constants;
pub mod persona;
pub mod settings;

pub use persona::{FortuneKind, PersonaConfig};
pub use settings::{
    AnimationConfig, AudioConfig, CaptureConfig, ConfigError, GeneratorConfig, Settings,
    SpeechConfig, SystemConfig,
};

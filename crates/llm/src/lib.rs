//! Response generation for the seance projected-face engine
//!
//! Two interchangeable generators behind the `LanguageModel` boundary: an
//! OpenAI-compatible chat backend and an offline template responder. The
//! factory probes the configured endpoint at startup and falls back so a
//! missing model never prevents the face from speaking.

pub mod backend;
pub mod factory;
pub mod prompt;
pub mod template;

pub use backend::HttpChatBackend;
pub use factory::create_language_model;
pub use prompt::{build_request, stylize_response};
pub use template::TemplateResponder;

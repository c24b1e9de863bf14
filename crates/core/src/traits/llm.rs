//! Language-model boundary

use crate::error::GenerationError;
use crate::history::{Turn, TurnRole};
use async_trait::async_trait;

/// One message in a chat-completion request
#[derive(Debug, Clone)]
pub struct Message {
    pub role: TurnRole,
    pub content: String,
}

impl Message {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(TurnRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Message::new(turn.role, turn.content.clone())
    }
}

/// A generation request: system prompt, rolling history, then the user turn
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerateRequest {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            max_tokens: 150,
            temperature: 0.8,
            top_p: 0.9,
        }
    }

    /// Append the rolling history before the current user turn
    pub fn with_history(mut self, turns: &[Turn]) -> Self {
        self.messages.extend(turns.iter().map(Message::from));
        self
    }

    pub fn with_user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// The latest user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == TurnRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Language-model boundary.
///
/// Implementations may buffer internally-streamed tokens; the contract here
/// is a complete response text or a typed failure.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate a complete response for the request
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError>;

    /// Cheap reachability probe, used at startup for backend selection
    async fn is_available(&self) -> bool;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerateRequest::new("you are an oracle")
            .with_user_message("what is my future")
            .with_max_tokens(64)
            .with_temperature(0.5);

        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.last_user_message(), Some("what is my future"));
    }

    #[test]
    fn test_request_history_ordering() {
        let turns = vec![Turn::user("hello"), Turn::assistant("greetings, seeker")];
        let request = GenerateRequest::new("sys")
            .with_history(&turns)
            .with_user_message("tell me more");

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].role, TurnRole::Assistant);
        assert_eq!(request.last_user_message(), Some("tell me more"));
    }
}

//! Chat-completions backend over HTTP

use crate::prompt::stylize_response;
use async_trait::async_trait;
use seance_config::{GeneratorConfig, PersonaConfig};
use seance_core::{GenerateRequest, GenerationError, LanguageModel, TurnRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// OpenAI-compatible chat-completions client (works against Ollama,
/// llama.cpp server, vLLM, and the hosted APIs).
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_retries: u32,
    /// Persona prefixes prepended to answers that arrive unstyled
    prefixes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatPayload {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn wire_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::System => "system",
        TurnRole::User => "user",
        TurnRole::Assistant => "assistant",
    }
}

impl HttpChatBackend {
    pub fn new(config: &GeneratorConfig, persona: &PersonaConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::unavailable(format!("http client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            prefixes: persona.mystical_prefixes.clone(),
        })
    }

    fn build_payload(&self, request: &GenerateRequest) -> ChatPayload {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: request.system_prompt.clone(),
        });
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: wire_role(m.role),
            content: m.content.clone(),
        }));

        ChatPayload {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stream: false,
        }
    }

    async fn request_once(&self, payload: &ChatPayload) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GenerationError::unavailable(format!(
                "backend returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(GenerationError::malformed(format!(
                "backend returned {status}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::malformed(format!("response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::empty());
        }
        Ok(text)
    }
}

fn classify_transport_error(error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::timeout(error.to_string())
    } else {
        GenerationError::unavailable(error.to_string())
    }
}

#[async_trait]
impl LanguageModel for HttpChatBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError> {
        let payload = self.build_payload(&request);
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            match self.request_once(&payload).await {
                Ok(text) => {
                    debug!(model = %self.model, chars = text.len(), "generation complete");
                    return Ok(stylize_response(&self.prefixes, text));
                },
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        %err,
                        attempt,
                        max = self.max_retries,
                        "generation failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn is_available(&self) -> bool {
        // Any HTTP answer proves the backend is reachable; only transport
        // errors count as unavailable.
        self.client.get(&self.endpoint).send().await.is_ok()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpChatBackend {
        HttpChatBackend::new(
            &GeneratorConfig {
                endpoint: "http://localhost:11434/v1/chat/completions".into(),
                ..GeneratorConfig::default()
            },
            &PersonaConfig::default(),
        )
        .expect("client")
    }

    #[test]
    fn test_payload_layout() {
        let request = GenerateRequest::new("you are an oracle")
            .with_user_message("what does my future hold")
            .with_max_tokens(64);
        let payload = backend().build_payload(&request);

        assert_eq!(payload.messages[0].role, "system");
        assert_eq!(payload.messages[0].content, "you are an oracle");
        assert_eq!(payload.messages[1].role, "user");
        assert_eq!(payload.max_tokens, 64);
        assert!(!payload.stream);
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"The mists reveal much."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("The mists reveal much.")
        );
    }

    #[test]
    fn test_missing_content_treated_as_empty() {
        let body = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}

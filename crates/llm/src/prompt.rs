//! Building generation requests and styling responses in the persona's voice

use rand::seq::SliceRandom;
use seance_config::{GeneratorConfig, PersonaConfig};
use seance_core::{GenerateRequest, Turn};

/// Assemble one turn's generation request: persona system prompt, the
/// rolling history window, then the fresh transcript as the user message.
pub fn build_request(
    persona: &PersonaConfig,
    config: &GeneratorConfig,
    history: &[Turn],
    transcript: &str,
) -> GenerateRequest {
    let window_start = history.len().saturating_sub(config.history_turns);

    GenerateRequest::new(persona.system_prompt())
        .with_history(&history[window_start..])
        .with_user_message(transcript)
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature)
}

/// Open a response in the persona's voice: when none of the mystical
/// prefixes is already present, prepend one at random.
pub fn stylize_response(prefixes: &[String], text: String) -> String {
    if prefixes.is_empty() || prefixes.iter().any(|p| text.starts_with(p.as_str())) {
        return text;
    }
    match prefixes.choose(&mut rand::thread_rng()) {
        Some(prefix) => format!("{prefix} {text}"),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_persona_and_transcript() {
        let persona = PersonaConfig::default();
        let config = GeneratorConfig::default();
        let request = build_request(&persona, &config, &[], "will I find love");

        assert!(request.system_prompt.contains("fortune teller"));
        assert_eq!(request.last_user_message(), Some("will I find love"));
        assert_eq!(request.max_tokens, config.max_tokens);
    }

    #[test]
    fn test_history_window_trims_oldest() {
        let persona = PersonaConfig::default();
        let config = GeneratorConfig {
            history_turns: 2,
            ..GeneratorConfig::default()
        };
        let history = vec![
            Turn::user("first"),
            Turn::assistant("a"),
            Turn::user("second"),
        ];
        let request = build_request(&persona, &config, &history, "third");

        // 2 history turns + the fresh user message
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].content, "a");
    }

    #[test]
    fn test_stylize_prepends_missing_prefix() {
        let prefixes = vec!["The spirits tell me...".to_string()];

        let styled = stylize_response(&prefixes, "you will prosper".into());
        assert_eq!(styled, "The spirits tell me... you will prosper");

        // already-styled output is left alone
        assert_eq!(stylize_response(&prefixes, styled.clone()), styled);
        // no prefixes configured means no styling
        assert_eq!(stylize_response(&[], "plain".into()), "plain");
    }
}

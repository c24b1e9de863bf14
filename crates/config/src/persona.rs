//! Persona tables: who the face is and how it speaks

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fortune template families for the no-model responder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortuneKind {
    Love,
    Career,
    Wealth,
    General,
}

impl FortuneKind {
    pub const ALL: [FortuneKind; 4] = [
        FortuneKind::Love,
        FortuneKind::Career,
        FortuneKind::Wealth,
        FortuneKind::General,
    ];
}

/// Persona configuration: spoken phrases and style
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name of the character
    #[serde(default = "default_name")]
    pub name: String,

    /// One-line character description used in the system prompt
    #[serde(default = "default_style")]
    pub style: String,

    /// Tone directive used in the system prompt
    #[serde(default = "default_tone")]
    pub tone: String,

    /// Session-opening phrases, one chosen at random
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,

    /// Session-closing phrases
    #[serde(default = "default_farewells")]
    pub farewells: Vec<String>,

    /// Spoken when generation fails and `speak_apology` is set
    #[serde(default = "default_fallback_phrases")]
    pub fallback_phrases: Vec<String>,

    /// Style prefixes prepended to model output when none is present
    #[serde(default = "default_mystical_prefixes")]
    pub mystical_prefixes: Vec<String>,

    /// Fortune templates with a `{details}` placeholder, by family
    #[serde(default = "default_fortune_templates")]
    pub fortune_templates: HashMap<FortuneKind, String>,

    /// Speak a canned apology on generation failure instead of silently
    /// returning to idle
    #[serde(default)]
    pub speak_apology: bool,

    /// Transcript phrases that end the session
    #[serde(default = "default_exit_phrases")]
    pub exit_phrases: Vec<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            style: default_style(),
            tone: default_tone(),
            greetings: default_greetings(),
            farewells: default_farewells(),
            fallback_phrases: default_fallback_phrases(),
            mystical_prefixes: default_mystical_prefixes(),
            fortune_templates: default_fortune_templates(),
            speak_apology: false,
            exit_phrases: default_exit_phrases(),
        }
    }
}

impl PersonaConfig {
    /// Whether a transcript asks to end the session. Recognizers punctuate,
    /// so each word is stripped of non-alphanumeric characters before the
    /// whole-word comparison.
    pub fn is_exit_phrase(&self, transcript: &str) -> bool {
        let lower = transcript.to_lowercase();
        self.exit_phrases.iter().any(|phrase| {
            lower
                .split_whitespace()
                .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
                .any(|word| word == phrase)
        })
    }

    /// Build the system prompt for the language model
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}, a {}. You speak in a {} manner. Respond concisely: \
             your words are spoken aloud by a projected face, so keep answers \
             to a few sentences.",
            self.name, self.style, self.tone
        )
    }
}

fn default_name() -> String {
    "the Oracle".to_string()
}

fn default_style() -> String {
    "mystical fortune teller".to_string()
}

fn default_tone() -> String {
    "mysterious, wise, slightly dramatic".to_string()
}

fn default_greetings() -> Vec<String> {
    vec![
        "Welcome, seeker of the unknown... I sense you have questions about your future."
            .to_string(),
        "Ah, the crystal ball reveals a visitor... Come closer, let me read your destiny."
            .to_string(),
        "Greetings, child of fate... I shall peer into the mists of time for you.".to_string(),
    ]
}

fn default_farewells() -> Vec<String> {
    vec![
        "The mists are clearing... Your fortune has been revealed. Return when you seek more answers."
            .to_string(),
        "The crystal ball grows dim... Your destiny awaits. Farewell, seeker of truth.".to_string(),
        "The spirits bid you farewell... Remember, the future is not set in stone.".to_string(),
    ]
}

fn default_fallback_phrases() -> Vec<String> {
    vec![
        "The crystal ball is cloudy today... Let me try again.".to_string(),
        "The spirits are quiet... Please, ask me something else.".to_string(),
        "I sense interference in the mystical realm... Can you rephrase that?".to_string(),
        "The mists of time are unclear... Tell me more about what you seek.".to_string(),
    ]
}

fn default_mystical_prefixes() -> Vec<String> {
    vec![
        "The crystal ball reveals...".to_string(),
        "I see in the mists...".to_string(),
        "The spirits tell me...".to_string(),
        "My mystical senses detect...".to_string(),
        "The stars align to show...".to_string(),
    ]
}

fn default_fortune_templates() -> HashMap<FortuneKind, String> {
    let mut templates = HashMap::new();
    templates.insert(
        FortuneKind::Love,
        "I see love in your future... {details}".to_string(),
    );
    templates.insert(
        FortuneKind::Career,
        "The stars align for your career... {details}".to_string(),
    );
    templates.insert(
        FortuneKind::Wealth,
        "Fortune smiles upon your financial path... {details}".to_string(),
    );
    templates.insert(
        FortuneKind::General,
        "The crystal ball shows... {details}".to_string(),
    );
    templates
}

fn default_exit_phrases() -> Vec<String> {
    vec![
        "goodbye".to_string(),
        "bye".to_string(),
        "exit".to_string(),
        "quit".to_string(),
        "stop".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_cover_all_kinds() {
        let persona = PersonaConfig::default();
        for kind in FortuneKind::ALL {
            assert!(persona.fortune_templates.contains_key(&kind));
        }
    }

    #[test]
    fn test_exit_phrase_matching() {
        let persona = PersonaConfig::default();
        assert!(persona.is_exit_phrase("Goodbye, oracle"));
        assert!(persona.is_exit_phrase("ok stop now"));
        assert!(persona.is_exit_phrase("Stop!"));
        assert!(!persona.is_exit_phrase("tell me about my stopwatch"));
    }

    #[test]
    fn test_system_prompt_mentions_name() {
        let persona = PersonaConfig::default();
        assert!(persona.system_prompt().contains("the Oracle"));
    }
}

//! Template responder: canned fortunes when no model backend is reachable

use async_trait::async_trait;
use rand::seq::SliceRandom;
use seance_config::{FortuneKind, PersonaConfig};
use seance_core::{GenerateRequest, GenerationError, LanguageModel};

const LOVE_KEYWORDS: &[&str] = &["love", "relationship", "romance", "partner", "marriage", "heart"];
const CAREER_KEYWORDS: &[&str] = &["job", "work", "career", "business", "promotion", "profession"];
const WEALTH_KEYWORDS: &[&str] = &["money", "wealth", "rich", "financial", "gold", "fortune"];

const LOVE_DETAILS: &[&str] = &[
    "A meaningful connection approaches when the moon is next full.",
    "Someone from your past thinks of you more than you know.",
    "Open your heart, for it will soon be answered in kind.",
];
const CAREER_DETAILS: &[&str] = &[
    "An opportunity you once dismissed will return in a new form.",
    "Your patience at work will soon bear unexpected fruit.",
    "A door closes, but a far grander one is already ajar.",
];
const WEALTH_DETAILS: &[&str] = &[
    "Prosperity flows toward those who share what little they have.",
    "An overlooked talent of yours holds the key to abundance.",
    "Guard your coin this season, and it will multiply in the next.",
];
const GENERAL_DETAILS: &[&str] = &[
    "A journey, whether of miles or of the mind, awaits you.",
    "Trust the instinct you have been ignoring.",
    "Change circles you like a raven, and it lands before the season turns.",
];

/// Fortune responder driven entirely by persona templates. Used when the
/// generator endpoint is unset or unreachable, so the face always has
/// something to say.
pub struct TemplateResponder {
    persona: PersonaConfig,
}

impl TemplateResponder {
    pub fn new(persona: PersonaConfig) -> Self {
        Self { persona }
    }

    /// Route a prompt to a fortune family by keyword
    fn classify(prompt: &str) -> FortuneKind {
        let lower = prompt.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if contains_any(LOVE_KEYWORDS) {
            FortuneKind::Love
        } else if contains_any(CAREER_KEYWORDS) {
            FortuneKind::Career
        } else if contains_any(WEALTH_KEYWORDS) {
            FortuneKind::Wealth
        } else {
            FortuneKind::General
        }
    }

    fn details_for(kind: FortuneKind) -> &'static [&'static str] {
        match kind {
            FortuneKind::Love => LOVE_DETAILS,
            FortuneKind::Career => CAREER_DETAILS,
            FortuneKind::Wealth => WEALTH_DETAILS,
            FortuneKind::General => GENERAL_DETAILS,
        }
    }

    fn compose(&self, kind: FortuneKind) -> String {
        let mut rng = rand::thread_rng();
        let detail = Self::details_for(kind)
            .choose(&mut rng)
            .copied()
            .unwrap_or("The future holds more than the present reveals.");

        match self.persona.fortune_templates.get(&kind) {
            Some(template) => template.replace("{details}", detail),
            None => {
                let prefix = self
                    .persona
                    .mystical_prefixes
                    .choose(&mut rng)
                    .map(String::as_str)
                    .unwrap_or("The crystal ball reveals...");
                format!("{prefix} {detail}")
            },
        }
    }
}

#[async_trait]
impl LanguageModel for TemplateResponder {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GenerationError> {
        let prompt = request.last_user_message().unwrap_or_default();
        let kind = Self::classify(prompt);
        Ok(self.compose(kind))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "template"
    }
}

//! Backend selection at startup

use crate::backend::HttpChatBackend;
use crate::template::TemplateResponder;
use seance_config::{GeneratorConfig, PersonaConfig};
use seance_core::LanguageModel;
use std::sync::Arc;
use tracing::{info, warn};

/// Pick the generation backend: the HTTP chat backend when an endpoint is
/// configured and reachable, the template responder otherwise. The engine
/// must come up with a working generator either way.
pub async fn create_language_model(
    config: &GeneratorConfig,
    persona: &PersonaConfig,
) -> Arc<dyn LanguageModel> {
    if config.endpoint.is_empty() {
        info!("no generator endpoint configured, using template responder");
        return Arc::new(TemplateResponder::new(persona.clone()));
    }

    match HttpChatBackend::new(config, persona) {
        Ok(backend) => {
            if backend.is_available().await {
                info!(endpoint = %config.endpoint, model = %config.model, "using chat backend");
                Arc::new(backend)
            } else {
                warn!(
                    endpoint = %config.endpoint,
                    "generator endpoint unreachable, falling back to template responder"
                );
                Arc::new(TemplateResponder::new(persona.clone()))
            }
        },
        Err(err) => {
            warn!(%err, "failed to build chat backend, falling back to template responder");
            Arc::new(TemplateResponder::new(persona.clone()))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_endpoint_selects_template() {
        let model =
            create_language_model(&GeneratorConfig::default(), &PersonaConfig::default()).await;
        assert_eq!(model.model_name(), "template");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        let config = GeneratorConfig {
            endpoint: "http://127.0.0.1:1/v1/chat/completions".into(),
            timeout_secs: 1,
            ..GeneratorConfig::default()
        };
        let model = create_language_model(&config, &PersonaConfig::default()).await;
        assert_eq!(model.model_name(), "template");
    }
}

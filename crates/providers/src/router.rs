//! Provider selection: builds the configured default provider.

use std::sync::Arc;

use ragchat_config::{AppConfig, ConfigError};
use ragchat_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the default provider from configuration.
///
/// `[providers.<default_provider>]` may override the API key and base URL.
/// The provider needs an API key: without one this fails with
/// [`ConfigError::MissingApiKey`], which callers treat as fatal at startup.
/// Ollama is exempt because it runs locally without credentials.
///
/// The model is not chosen here; see [`AppConfig::active_model`].
pub fn default_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let name = config.default_provider.as_str();
    let section = config.providers.get(name);

    let api_key = if name == "ollama" {
        config.require_api_key().unwrap_or_else(|_| "ollama".into())
    } else {
        config.require_api_key()?
    };

    let base_url = section
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let provider = OpenAiCompatProvider::new(name, &base_url, &api_key)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    tracing::debug!(provider = name, base_url = %base_url, "Provider configured");
    Ok(Arc::new(provider))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn missing_key_fails_construction() {
        let config = AppConfig::default();
        assert!(matches!(
            default_from_config(&config),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn build_with_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = default_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = AppConfig {
            default_provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert!(default_from_config(&config).is_ok());
    }

    #[test]
    fn provider_section_supplies_key_and_url() {
        let mut config = AppConfig {
            default_provider: "local".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "local".into(),
            ProviderConfig {
                api_key: Some("sk-local".into()),
                api_url: Some("http://localhost:9999/v1".into()),
                default_model: Some("llama3".into()),
            },
        );
        let provider = default_from_config(&config).unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(config.active_model(), "llama3");
    }

    #[test]
    fn other_provider_sections_are_ignored() {
        let mut config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "groq".into(),
            ProviderConfig {
                api_url: Some("not a url".into()),
                ..ProviderConfig::default()
            },
        );
        let provider = default_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(config.active_model(), "gpt-4o-mini");
    }
}

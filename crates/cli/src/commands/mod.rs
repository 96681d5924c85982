pub mod ask;
pub mod chat;
pub mod doctor;
pub mod onboard;
pub mod serve;

use ragchat_config::AppConfig;

/// Load config, apply a `--knowledge` override, and make sure a key exists.
pub fn load_config(knowledge: Option<String>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if knowledge.is_some() {
        config.retrieval.knowledge_path = knowledge;
    }

    if config.default_provider != "ollama" && !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY  = 'sk-...'");
        eprintln!("    RAGCHAT_API_KEY = 'sk-...'   (takes precedence)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    tracing::debug!(
        provider = %config.default_provider,
        model = %config.active_model(),
        knowledge = ?config.retrieval.knowledge_path,
        "Config loaded"
    );
    Ok(config)
}

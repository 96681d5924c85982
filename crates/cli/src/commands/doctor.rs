//! `ragchat doctor`: Diagnose configuration and knowledge base.

use std::path::Path;

use ragchat_config::AppConfig;
use ragchat_retrieval::{KnowledgeBase, TextSplitter};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("ragchat Doctor — System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file — run `ragchat onboard` (defaults are used)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  {} issue(s) found. See above for details.", issues + 1);
            return Ok(());
        }
    };

    println!(
        "  ✅ Provider: {} / model: {}",
        config.default_provider,
        config.active_model()
    );

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else if config.default_provider == "ollama" {
        println!("  ✅ Local provider, no API key needed");
    } else {
        println!("  ❌ No API key — set OPENAI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    match &config.retrieval.knowledge_path {
        Some(path) => {
            let splitter = TextSplitter::new(config.retrieval.chunk_size, config.retrieval.chunk_overlap);
            match KnowledgeBase::load(Path::new(path), &splitter).await {
                Ok(kb) => println!("  ✅ Knowledge base: {} chunks from {path}", kb.len()),
                Err(e) => {
                    println!("  ❌ Knowledge base: {e}");
                    issues += 1;
                }
            }
        }
        None => {
            println!("  ⚠️  No knowledge_path — answers will have no context");
            issues += 1;
        }
    }

    if config.assistant.history_aware {
        println!("  ℹ️  History-aware prompting enabled");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

//! `ragchat serve`: Start the browser chat server.

pub async fn run(port_override: Option<u16>, knowledge: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(knowledge)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ragchat server");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.active_model());
    println!(
        "   Knowledge: {}",
        config.retrieval.knowledge_path.as_deref().unwrap_or("(none)")
    );

    ragchat_gateway::start(config).await?;

    Ok(())
}

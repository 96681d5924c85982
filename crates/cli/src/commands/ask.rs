//! `ragchat ask`: Answer a single question.

use ragchat_chain::ChatController;
use ragchat_gateway::AppState;

pub async fn run(question: String, knowledge: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(knowledge)?;
    let state = AppState::from_config(&config).await?;
    let controller = ChatController::new(state.orchestrator().clone());

    eprint!("  Thinking...");
    let result = controller.submit(&question).await;
    eprint!("\r              \r");

    let answer = result?;
    println!("{answer}");

    Ok(())
}

//! `ragchat chat`: Interactive chat in the terminal.
//!
//! Same controller as the browser client: one question at a time, history
//! kept for the session, errors shown and then cleared.

use std::io::Write;

use ragchat_chain::ChatController;
use ragchat_core::message::Role;
use ragchat_gateway::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

pub async fn run(knowledge: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(knowledge)?;
    let state = AppState::from_config(&config).await?;
    let controller = ChatController::new(state.orchestrator().clone());

    println!();
    println!("  ragchat — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", state.model);
    println!("  Documents: {} chunks", state.documents);
    println!("  Assistant: {} support", config.assistant.product_name);
    println!();
    println!("  Type your question and press Enter.");
    println!("  /history shows the conversation, 'exit' or Ctrl+C quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if EXIT_COMMANDS.contains(&line) {
            break;
        }
        if line == "/history" {
            print_history(&controller);
            prompt()?;
            continue;
        }

        eprint!("  ...");
        let result = controller.submit(line).await;
        eprint!("\r     \r");

        match result {
            Ok(answer) => {
                println!("\n  AI > {answer}\n");
            }
            Err(e) => {
                eprintln!("\n  ERROR: {e}\n");
                controller.acknowledge_error();
            }
        }
        prompt()?;
    }

    println!("\n  Goodbye! ({} turns)", controller.turns());
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_history(controller: &ChatController) {
    let history = controller.history();
    if history.is_empty() {
        println!("  (no turns yet)");
        return;
    }
    for entry in history {
        let label = match entry.role {
            Role::User => "You",
            _ => "AI ",
        };
        println!(
            "  [{}] {label} > {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.content
        );
    }
}

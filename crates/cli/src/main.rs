//! ragchat CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the browser chat server
//! - `ask`: Ask a single question
//! - `chat`: Interactive chat in the terminal
//! - `doctor`: Diagnose configuration and knowledge base
//! - `onboard`: Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ragchat",
    about = "ragchat — retrieval-augmented support chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server with the browser chat client
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Knowledge file to answer from
        #[arg(short, long)]
        knowledge: Option<String>,
    },

    /// Ask one question and print the answer
    Ask {
        /// The question
        question: String,

        /// Knowledge file to answer from
        #[arg(short, long)]
        knowledge: Option<String>,
    },

    /// Chat interactively in the terminal
    Chat {
        /// Knowledge file to answer from
        #[arg(short, long)]
        knowledge: Option<String>,
    },

    /// Diagnose configuration and knowledge base
    Doctor,

    /// Write a default config file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port, knowledge } => commands::serve::run(port, knowledge).await?,
        Commands::Ask { question, knowledge } => commands::ask::run(question, knowledge).await?,
        Commands::Chat { knowledge } => commands::chat::run(knowledge).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}

//! kfupm-chat - terminal client for the KFUPM assistant
//!
#![doc = "kfupm-chat - terminal client for the KFUPM assistant"]
#![doc = "Main entry point for the kfupm-chat application."]

use anyhow::Result;

use kfupm_chat::cli::{Cli, Commands};
use kfupm_chat::commands;
use kfupm_chat::config::Config;
use kfupm_chat::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_logging(cli.verbose, cli.json_logs)?;

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat {
            search,
            session,
            new,
        } => {
            if let Some(id) = &session {
                tracing::debug!("Resuming session: {}", id);
            }
            commands::chat::run_chat(config, search, session, new).await?;
            Ok(())
        }
        Commands::Ask {
            message,
            search,
            session,
        } => {
            tracing::info!("Sending one-shot question");
            commands::ask::run_ask(config, message, search, session).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::debug!("Starting sessions command");
            commands::sessions::handle_sessions(&config, command)?;
            Ok(())
        }
        Commands::Render { path } => {
            commands::render::run_render(path.as_deref())?;
            Ok(())
        }
    }
}

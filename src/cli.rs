//! Command-line interface definition for kfupm-chat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions, session
//! management, and markdown rendering.

use crate::config::Environment;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kfupm-chat - terminal client for the KFUPM assistant
///
/// Chat with the assistant backend; conversations are kept as sessions
/// in local storage.
#[derive(Parser, Debug, Clone)]
#[command(name = "kfupm-chat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Override the session storage file
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Backend environment (local, deployed)
    #[arg(long, value_parser = Environment::parse_str)]
    pub env: Option<Environment>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for kfupm-chat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Start with web search enabled
        #[arg(short, long)]
        search: bool,

        /// Resume a specific session
        #[arg(long, conflicts_with = "new")]
        session: Option<String>,

        /// Start in a new session
        #[arg(short, long)]
        new: bool,
    },

    /// Ask a single question and print the answer
    Ask {
        /// The question
        message: String,

        /// Enable web search for this question
        #[arg(short, long)]
        search: bool,

        /// Session to record the exchange in (defaults to the most recent)
        #[arg(long)]
        session: Option<String>,
    },

    /// Manage stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Render markdown to HTML
    Render {
        /// Input file (stdin when omitted)
        path: Option<PathBuf>,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// List sessions, most recent first
    List,

    /// Print the messages of a session
    Show {
        /// Session ID
        id: String,
    },

    /// Create an empty session
    New,

    /// Delete a session
    Delete {
        /// Session ID
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove all messages from a session
    Clear {
        /// Session ID
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

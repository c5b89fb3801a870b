//! `sessions` subcommand: inspect and manage stored conversations

use crate::cli::SessionCommand;
use crate::commands::{open_store, prompt_confirm};
use crate::config::Config;
use crate::conversation::{number_sources, summarize_sessions, SessionSummary};
use crate::error::{ChatError, Result};
use crate::markdown;
use crate::session::{truncate_title, AssumeYes, Confirm, DeleteOutcome, Role, Session};
use crate::storage::open_backend;
use chrono::Utc;
use colored::Colorize;
use prettytable::{format, Table};

/// Handle session management commands
///
/// `list` and `show` read the backend directly, so inspecting an empty
/// store does not create a session.
pub fn handle_sessions(config: &Config, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::List => {
            let sessions = open_backend(&config.storage)?.load_all()?;
            // The session a chat would resume, as picked when the store opens
            let active = config
                .storage
                .fallback_order
                .most_recent(&sessions)
                .map(|s| s.id.as_str());
            let summaries = summarize_sessions(sessions.iter(), active, Utc::now());
            print_session_table(&summaries);
        }
        SessionCommand::Show { id } => {
            let sessions = open_backend(&config.storage)?.load_all()?;
            let session = sessions
                .get(&id)
                .ok_or_else(|| ChatError::Command(format!("Unknown session: {}", id)))?;
            print_session(session);
        }
        SessionCommand::New => {
            let was_empty = open_backend(&config.storage)?.load_all()?.is_empty();
            let mut store = open_store(config)?;
            // Opening an empty store already created a fresh session
            let id = match store.active_id().map(str::to_string) {
                Some(id) if was_empty => id,
                _ => store.create(),
            };
            println!("{}", format!("Created session {}", id).green());
        }
        SessionCommand::Delete { id, yes } => {
            let mut store = open_store(config)?;
            match store.delete(&id, confirmer(yes)) {
                DeleteOutcome::Deleted { .. } => {
                    println!("{}", format!("Deleted session {}", id).green());
                }
                DeleteOutcome::Declined => println!("{}", "Cancelled.".yellow()),
                DeleteOutcome::NotFound => {
                    return Err(ChatError::Command(format!("Unknown session: {}", id)).into());
                }
            }
        }
        SessionCommand::Clear { id, yes } => {
            let mut store = open_store(config)?;
            if store.get(&id).is_none() {
                return Err(ChatError::Command(format!("Unknown session: {}", id)).into());
            }
            if store.clear(&id, confirmer(yes)) {
                println!("{}", format!("Cleared session {}", id).green());
            } else {
                println!("{}", "Cancelled.".yellow());
            }
        }
    }

    Ok(())
}

fn confirmer(yes: bool) -> &'static dyn Confirm {
    if yes {
        &AssumeYes
    } else {
        &prompt_confirm
    }
}

/// Print sessions as a table, most recent first
pub fn print_session_table(sessions: &[SessionSummary]) {
    if sessions.is_empty() {
        println!("{}", "No conversations found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Updated".bold()
    ]);

    for summary in sessions {
        let id = if summary.active {
            format!("{} *", summary.id).cyan().bold()
        } else {
            summary.id.cyan()
        };
        let title = if summary.title.chars().count() > 40 {
            format!("{}...", truncate_title(&summary.title, 37))
        } else {
            summary.title.clone()
        };
        table.add_row(prettytable::row![
            id,
            title,
            summary.message_count,
            summary.time_label
        ]);
    }

    println!("\nConversations:");
    table.printstd();
    println!();
    println!(
        "Use {} to resume a conversation.",
        "kfupm-chat chat --session <ID>".cyan()
    );
    println!();
}

fn print_session(session: &Session) {
    println!("\n{} {}", session.title.bold(), format!("({})", session.id).dimmed());
    println!(
        "{}\n",
        format!(
            "created {} / updated {}",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.updated_at.format("%Y-%m-%d %H:%M")
        )
        .dimmed()
    );

    if session.messages.is_empty() {
        println!("{}", "(no messages)".dimmed());
        return;
    }

    for message in &session.messages {
        match message.role {
            Role::User => println!("{} {}\n", "You:".cyan().bold(), message.content),
            Role::Assistant => {
                println!("{}", "Assistant:".green().bold());
                println!("{}", markdown::render_terminal(&message.content));
                for source in number_sources(&message.sources) {
                    println!("  [{}] {} {}", source.number, source.title, source.url.blue());
                }
                println!();
            }
        }
    }
}

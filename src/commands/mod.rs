/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`     - Interactive chat loop
- `ask`      - One-shot question
- `sessions` - Session listing and management
- `render`   - Markdown to HTML

The chat and ask handlers build a [`Conversation`] over the configured
session store and the HTTP chat service, with a [`TerminalView`] on top.
*/

use crate::client::{ChatService, HttpChatClient};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::error::{ChatError, Result};
use crate::session::SessionStore;
use crate::storage::open_backend;
use std::io::{BufRead, Write};
use std::sync::Arc;

use terminal_view::TerminalView;

pub mod render;
pub mod sessions;
pub mod special_commands;
pub mod terminal_view;

/// Open the session store selected by the configuration
pub fn open_store(config: &Config) -> Result<SessionStore> {
    let backend = open_backend(&config.storage)?;
    Ok(SessionStore::open(backend, config.storage.fallback_order))
}

/// Ask a yes/no question on stdin; anything but "y"/"yes" declines
pub fn prompt_confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            tracing::warn!("Failed to read confirmation: {}", e);
            false
        }
    }
}

fn build_conversation(
    config: &Config,
    store: SessionStore,
    view: Arc<TerminalView>,
) -> Result<Arc<Conversation>> {
    let service: Arc<dyn ChatService> = Arc::new(HttpChatClient::new(&config.api)?);
    Ok(Arc::new(Conversation::new(
        store,
        service,
        view,
        &config.chat,
    )))
}

// Interactive chat handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop: special commands act on the sessions or the
    //! view, everything else is sent to the assistant. Replies are revealed
    //! with the typing effect; Ctrl-C while typing skips to the end.

    use super::*;
    use crate::commands::sessions::print_session_table;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::commands::terminal_view::print_assistant_header;
    use crate::conversation::{ChatView, FeedbackOutcome, SendOutcome};
    use crate::session::DeleteOutcome;
    use crate::typing::{TypingEffect, TypingOutcome};
    use chrono::Utc;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio_util::sync::CancellationToken;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `search` - Start with web search enabled
    /// * `session` - Resume this session instead of the most recent one
    /// * `new` - Start in a fresh session
    ///
    /// # Errors
    ///
    /// Returns error if the store or the HTTP client cannot be set up, or
    /// if `session` names an unknown session
    pub async fn run_chat(
        mut config: Config,
        search: bool,
        session: Option<String>,
        new: bool,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        if search {
            config.chat.search_enabled = true;
        }

        let store = open_store(&config)?;
        let view = Arc::new(TerminalView::new(false));
        let conversation = build_conversation(&config, store, Arc::clone(&view))?;
        let typing = TypingEffect::new(config.chat.typing_delay_ms);

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner();

        if new {
            conversation.new_session();
            view.show_search_state(conversation.search_enabled());
        } else if let Some(id) = session {
            if !conversation.switch_session(&id) {
                return Err(ChatError::Command(format!("Unknown session: {}", id)).into());
            }
            view.show_search_state(conversation.search_enabled());
        } else {
            conversation.restore_view();
        }

        loop {
            let prompt = format_prompt(conversation.search_enabled());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::NewSession => {
                            conversation.new_session();
                        }
                        SpecialCommand::ListSessions => {
                            print_session_table(&conversation.session_summaries(Utc::now()));
                        }
                        SpecialCommand::SwitchSession(id) => {
                            if !conversation.switch_session(&id) {
                                eprintln!("{}", format!("Unknown session: {}", id).red());
                            }
                        }
                        SpecialCommand::DeleteSession(id) => {
                            handle_delete(&conversation, id);
                        }
                        SpecialCommand::ClearSession => {
                            if conversation.clear_session(&prompt_confirm) {
                                println!("{}", "Conversation cleared.".green());
                            }
                        }
                        SpecialCommand::Search(None) => {
                            conversation.toggle_search();
                        }
                        SpecialCommand::Search(Some(enabled)) => {
                            conversation.set_search(enabled);
                        }
                        SpecialCommand::Rate { rating, message_id } => {
                            match message_id.or_else(|| view.last_message_id()) {
                                Some(id) => {
                                    let handle = conversation.spawn_feedback(id, rating);
                                    tokio::spawn(async move {
                                        match handle.await {
                                            Ok(FeedbackOutcome::AlreadyRated) => {
                                                println!("{}", "Already rated.".yellow())
                                            }
                                            Ok(FeedbackOutcome::UnknownMessage) => println!(
                                                "{}",
                                                "No such answer in this conversation.".yellow()
                                            ),
                                            Ok(_) => {}
                                            Err(e) => {
                                                tracing::error!("Feedback task failed: {}", e)
                                            }
                                        }
                                    });
                                }
                                None => println!("{}", "No answer to rate yet.".yellow()),
                            }
                        }
                        SpecialCommand::ShowStatus => {
                            print_status_display(&conversation);
                        }
                        SpecialCommand::Help => {
                            print_help();
                        }
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {
                            if let Err(e) =
                                send_and_reveal(&conversation, &view, &typing, trimmed).await
                            {
                                tracing::error!("Failed to display reply: {:#}", e);
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Send one message and reveal the reply with the typing effect
    async fn send_and_reveal(
        conversation: &Conversation,
        view: &TerminalView,
        typing: &TypingEffect,
        text: &str,
    ) -> Result<SendOutcome> {
        view.arm_typing();
        let outcome = conversation.send(text).await;
        let Some(pending) = view.take_pending() else {
            return Ok(outcome);
        };

        print_assistant_header();

        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            })
        };

        let mut stdout = std::io::stdout();
        let played = typing.play(&pending.body, &mut stdout, &token).await;
        watcher.abort();

        if played? == TypingOutcome::Skipped {
            tracing::debug!("Typing effect skipped for {}", pending.message_id);
        }
        println!();
        pending.print_footer();

        Ok(outcome)
    }

    fn handle_delete(conversation: &Conversation, id: Option<String>) {
        let Some(id) = id.or_else(|| conversation.active_session_id()) else {
            println!("{}", "No conversation to delete.".yellow());
            return;
        };

        match conversation.delete_session(&id, &prompt_confirm) {
            DeleteOutcome::Deleted { .. } => {
                println!("{}", format!("Deleted conversation {}", id).green());
            }
            DeleteOutcome::Declined => {}
            DeleteOutcome::NotFound => {
                eprintln!("{}", format!("Unknown session: {}", id).red());
            }
        }
    }

    /// Prompt showing whether web search is on
    pub(crate) fn format_prompt(search_enabled: bool) -> String {
        if search_enabled {
            format!("{} >> ", "[SEARCH]".green())
        } else {
            ">> ".to_string()
        }
    }

    fn print_welcome_banner() {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║             KFUPM Assistant Chat - Welcome!                  ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    /// Display the active session and search state (`/status`)
    fn print_status_display(conversation: &Conversation) {
        let (title, messages, total) = conversation.with_store(|store| {
            let active = store.active();
            (
                active.map(|s| s.title.clone()).unwrap_or_default(),
                active.map(|s| s.messages.len()).unwrap_or(0),
                store.len(),
            )
        });
        let search = if conversation.search_enabled() {
            "ON".green()
        } else {
            "OFF".yellow()
        };

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    KFUPM Assistant Status                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "Session:           {} ({})",
            conversation.active_session_id().unwrap_or_default().cyan(),
            title
        );
        println!("Conversation Size: {} messages", messages);
        println!("Stored Sessions:   {}", total);
        println!("Web Search:        {}", search);
        println!();
    }

}

// One-shot question handler
pub mod ask {
    //! `ask` command handler: send one message and print the reply.

    use super::*;
    use crate::conversation::SendOutcome;

    /// Send `message` and print the answer
    ///
    /// The exchange is recorded in `session` (or the most recent session)
    /// exactly as in interactive mode.
    ///
    /// # Errors
    ///
    /// Returns error if the message is empty or too long, if `session` is
    /// unknown, or if the request fails
    pub async fn run_ask(
        mut config: Config,
        message: String,
        search: bool,
        session: Option<String>,
    ) -> Result<()> {
        if search {
            config.chat.search_enabled = true;
        }

        let mut store = open_store(&config)?;
        if let Some(id) = &session {
            if !store.switch_to(id) {
                return Err(ChatError::Command(format!("Unknown session: {}", id)).into());
            }
        }

        let view = Arc::new(TerminalView::new(false));
        let conversation = build_conversation(&config, store, Arc::clone(&view))?;

        view.arm_typing();
        let outcome = conversation.send(&message).await;
        let pending = view.take_pending();

        match outcome {
            SendOutcome::Replied { .. } => {
                if let Some(pending) = pending {
                    println!("{}", pending.body);
                    print!("{}", pending.sources);
                }
                Ok(())
            }
            SendOutcome::Rejected(reason) => Err(ChatError::Validation(reason).into()),
            SendOutcome::Ignored => {
                Err(ChatError::Validation("Message is empty".to_string()).into())
            }
            SendOutcome::Failed(reason) => {
                Err(ChatError::Command(format!("Request failed: {}", reason)).into())
            }
        }
    }
}

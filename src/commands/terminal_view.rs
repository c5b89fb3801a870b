//! Terminal rendering of the conversation
//!
//! [`TerminalView`] implements [`ChatView`] on top of stdout/stderr with
//! `colored` styling. Live replies can be held back so the chat loop can
//! reveal them with the typing effect; replayed history prints at once.

use crate::conversation::{ChatView, Rating, RenderedReply, SessionSummary, StatusKind};
use crate::markdown;
use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::sync::{Mutex, MutexGuard};

/// A reply waiting for the typing effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub message_id: String,
    /// Rendered markdown
    pub body: String,
    /// Numbered source list; empty when the reply has none
    pub sources: String,
    /// How to rate this reply
    pub rating_hint: String,
}

impl PendingReply {
    /// Print everything after the body
    pub fn print_footer(&self) {
        print!("{}", self.sources);
        println!("{}", self.rating_hint);
        println!();
    }
}

#[derive(Debug, Default)]
struct ViewState {
    armed: bool,
    pending: Option<PendingReply>,
    last_message_id: Option<String>,
    loading: bool,
}

/// [`ChatView`] that draws to the terminal
#[derive(Debug)]
pub struct TerminalView {
    echo_user: bool,
    state: Mutex<ViewState>,
}

impl TerminalView {
    /// Create a view
    ///
    /// # Arguments
    ///
    /// * `echo_user` - Print user messages as they are sent. Interactive
    ///   mode leaves this off since readline already shows the input;
    ///   replayed history is always printed.
    pub fn new(echo_user: bool) -> Self {
        Self {
            echo_user,
            state: Mutex::new(ViewState::default()),
        }
    }

    /// Hold back the next assistant reply instead of printing it
    pub fn arm_typing(&self) {
        self.state().armed = true;
    }

    /// Take the held-back reply, if any, and stop holding back
    pub fn take_pending(&self) -> Option<PendingReply> {
        let mut state = self.state();
        state.armed = false;
        state.pending.take()
    }

    /// Display id of the most recently shown reply (target of `/up`)
    pub fn last_message_id(&self) -> Option<String> {
        self.state().last_message_id.clone()
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Split a reply into its rendered parts
pub fn format_reply(reply: &RenderedReply) -> PendingReply {
    let mut sources = String::new();
    if !reply.sources.is_empty() {
        sources.push_str(&format!("\n{}\n", "Sources:".bold()));
        for source in &reply.sources {
            sources.push_str(&format!(
                "  [{}] {} {}\n",
                source.number,
                source.title,
                source.url.blue().underline()
            ));
        }
    }

    PendingReply {
        message_id: reply.message_id.clone(),
        body: markdown::blocks_to_terminal(&reply.blocks),
        sources,
        rating_hint: format!("[{}] rate with /up or /down", reply.message_id)
            .dimmed()
            .to_string(),
    }
}

/// Print the header line shown above every assistant reply
pub fn print_assistant_header() {
    println!("\n{}", "Assistant:".green().bold());
}

fn clear_loading_line() {
    print!("\r\x1b[2K");
    let _ = std::io::stdout().flush();
}

impl ChatView for TerminalView {
    fn clear_messages(&self) {
        self.state().last_message_id = None;
        println!("{}", "─".repeat(64).dimmed());
    }

    fn show_welcome(&self) {
        println!(
            "{}",
            "Hello! I can answer questions about KFUPM: admissions, programs, \
             registration, campus services and more. How can I help?"
                .green()
        );
        println!();
    }

    fn show_user_message(&self, text: &str) {
        if !self.echo_user && self.state().armed {
            return;
        }
        println!("{} {}", "You:".cyan().bold(), text);
    }

    fn show_assistant_message(&self, reply: &RenderedReply) {
        let formatted = format_reply(reply);
        let mut state = self.state();
        state.last_message_id = Some(reply.message_id.clone());
        if state.armed {
            state.pending = Some(formatted);
            return;
        }
        drop(state);

        print_assistant_header();
        println!("{}", formatted.body);
        formatted.print_footer();
    }

    fn show_loading(&self) {
        if !std::io::stdout().is_terminal() {
            return;
        }
        self.state().loading = true;
        print!("{}", "Assistant is thinking...".dimmed());
        let _ = std::io::stdout().flush();
    }

    fn hide_loading(&self) {
        let mut state = self.state();
        if state.loading {
            state.loading = false;
            clear_loading_line();
        }
    }

    fn show_error(&self, reason: &str) {
        eprintln!("{} {}", "Error:".red().bold(), reason.red());
    }

    fn set_status(&self, text: &str, kind: StatusKind) {
        match kind {
            StatusKind::Error if !text.is_empty() => eprintln!("{}", text.red()),
            // Progress is already shown by the loading line
            _ => tracing::debug!("Status: {:?}", text),
        }
    }

    fn set_input_enabled(&self, enabled: bool) {
        tracing::trace!("Input enabled: {}", enabled);
    }

    fn clear_input(&self) {}

    fn disable_rating(&self, message_id: &str, chosen: Rating) {
        let label = match chosen {
            Rating::Up => "👍 Thanks for the feedback!",
            Rating::Down => "👎 Thanks, we'll use this to improve.",
        };
        println!("{} {}", label.green(), format!("({})", message_id).dimmed());
    }

    fn show_sessions(&self, sessions: &[SessionSummary]) {
        tracing::debug!("{} sessions available", sessions.len());
    }

    fn show_search_state(&self, enabled: bool) {
        let state = if enabled { "ON".green() } else { "OFF".yellow() };
        println!("Web search: {}", state);
    }
}

//! kfupm-chat - Terminal client library for the KFUPM assistant
//!
//! This library provides the pieces behind the `kfupm-chat` binary: a
//! persisted session store, the conversation controller that talks to the
//! assistant backend, and a small markdown renderer.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session store, message and session types
//! - `storage`: Persistence backends for the session store
//! - `conversation`: Send/reply flow, feedback, and the view seam
//! - `client`: HTTP client for the `/chat` and `/feedback` endpoints
//! - `markdown`: Line-based markdown to HTML and terminal text
//! - `typing`: Cancellable typing effect for replies
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use kfupm_chat::config::Config;
//! use kfupm_chat::session::SessionStore;
//! use kfupm_chat::storage::open_backend;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let store = SessionStore::open(open_backend(&config.storage)?, config.storage.fallback_order);
//!     println!("{} sessions", store.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod markdown;
pub mod session;
pub mod storage;
pub mod typing;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{ChatView, Conversation};
pub use error::{ChatError, Result};
pub use session::SessionStore;

#[cfg(test)]
pub mod test_utils;

//! `render` subcommand: markdown to HTML

use crate::error::{ChatError, Result};
use crate::markdown;
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Convert a markdown file (or stdin) to HTML on stdout
pub fn run_render(path: Option<&Path>) -> Result<()> {
    let input = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .map_err(|e| ChatError::Command(format!("{:#}", e)))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    tracing::debug!("Rendering {} bytes of markdown", input.len());
    println!("{}", markdown::render_html(&input));
    Ok(())
}

//! Character-by-character reveal of assistant replies
//!
//! Purely presentational: the reply is already recorded in the session
//! before the effect starts, so skipping or cancelling it loses nothing.

use crate::error::Result;
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a [`TypingEffect::play`] call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingOutcome {
    /// Every character was revealed at the configured pace
    Completed,
    /// Cancelled part-way; the rest was written at once
    Skipped,
}

/// Timer-driven text reveal
#[derive(Debug, Clone, Copy)]
pub struct TypingEffect {
    delay: Duration,
}

impl TypingEffect {
    /// Create an effect with the given per-character delay; 0 disables it
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Write `text` to `out` one character at a time
    ///
    /// When `token` is cancelled the remaining text is flushed immediately.
    /// A disabled effect writes everything in one go.
    ///
    /// # Examples
    ///
    /// ```
    /// use kfupm_chat::typing::{TypingEffect, TypingOutcome};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # tokio_test::block_on(async {
    /// let mut out = Vec::new();
    /// let outcome = TypingEffect::new(0)
    ///     .play("hello", &mut out, &CancellationToken::new())
    ///     .await
    ///     .unwrap();
    /// assert_eq!(outcome, TypingOutcome::Completed);
    /// assert_eq!(out, b"hello");
    /// # });
    /// ```
    pub async fn play<W: Write + Send>(
        &self,
        text: &str,
        out: &mut W,
        token: &CancellationToken,
    ) -> Result<TypingOutcome> {
        if !self.is_enabled() {
            out.write_all(text.as_bytes())?;
            out.flush()?;
            return Ok(TypingOutcome::Completed);
        }

        let mut buf = [0u8; 4];
        for (index, c) in text.char_indices() {
            if token.is_cancelled() {
                out.write_all(text[index..].as_bytes())?;
                out.flush()?;
                return Ok(TypingOutcome::Skipped);
            }

            out.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            out.flush()?;

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    let rest = index + c.len_utf8();
                    out.write_all(text[rest..].as_bytes())?;
                    out.flush()?;
                    return Ok(TypingOutcome::Skipped);
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        Ok(TypingOutcome::Completed)
    }
}

impl Default for TypingEffect {
    fn default() -> Self {
        Self::new(8)
    }
}

//! Logging setup
//!
//! Human-readable or JSON events on stderr, filtered by `RUST_LOG` when
//! set. Stdout is left to the conversation itself.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive
pub const DEFAULT_FILTER: &str = "kfupm_chat=info";
/// Filter directive with `--verbose`
pub const VERBOSE_FILTER: &str = "kfupm_chat=debug";

/// Filter used when `RUST_LOG` is not set
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber
///
/// # Arguments
///
/// * `verbose` - Log at debug level unless `RUST_LOG` says otherwise
/// * `json` - Emit one JSON object per event
///
/// # Errors
///
/// Returns error if the filter cannot be parsed or a subscriber is
/// already installed
///
/// # Examples
///
/// ```no_run
/// use kfupm_chat::logging::init_logging;
///
/// init_logging(false, true).unwrap();
/// tracing::info!("ready");
/// ```
pub fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    }

    Ok(())
}

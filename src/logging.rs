//! Logging setup using the `tracing` crate.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the level picked by the `verbose` flag.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialize logger: {e}")))?;

    Ok(())
}
